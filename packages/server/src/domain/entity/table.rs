//! カードテーブルの状態機械
//!
//! ```text
//! lobby ──(start: validator ok)──> started ──(finish)──> finished
//! ```
//!
//! `finished` は終端で、前の状態には戻らない。座席数はテーブル生成時に決まり、
//! 以降変化しない。同じプレイヤーが 2 つの座席を同時に占有することはない。

use serde_json::Value;

use crate::domain::{game_catalog::StartValidator, value_object::PlayerId};

/// 新しいテーブルの既定の座席数
pub const DEFAULT_SEAT_COUNT: usize = 4;

/// 1 つのテーブルに置ける座席数の上限
pub const MAX_SEAT_COUNT: usize = 16;

/// テーブルのライフサイクル
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableStatus {
    #[default]
    Lobby,
    Started,
    Finished,
}

impl TableStatus {
    /// ワイヤ上の表記から変換（未知の値は `None`）
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "lobby" => Some(Self::Lobby),
            "started" => Some(Self::Started),
            "finished" => Some(Self::Finished),
            _ => None,
        }
    }
}

/// 座席
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub index: usize,
    pub player_id: Option<PlayerId>,
}

/// `attempt_start` の検証結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartVerdict {
    pub ok: bool,
    pub reason: Option<String>,
}

impl StartVerdict {
    pub fn accept() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.into()),
        }
    }
}

/// 座席操作の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeatOutcome {
    /// 変更が適用された
    Applied,
    /// 変更は拒否され、テーブルは変わっていない
    Rejected,
}

/// ルームで選択されたカードゲームの権威的な状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableState {
    pub game_id: Option<String>,
    seats: Vec<Seat>,
    pub status: TableStatus,
    pub host_id: Option<String>,
}

impl TableState {
    /// 空席のみのロビー状態のテーブルを作成（座席数は `MAX_SEAT_COUNT` まで）
    pub fn new(game_id: Option<String>, players: usize) -> Self {
        let seats = (0..players.min(MAX_SEAT_COUNT))
            .map(|index| Seat {
                index,
                player_id: None,
            })
            .collect();

        Self {
            game_id,
            seats,
            status: TableStatus::Lobby,
            host_id: None,
        }
    }

    /// 各フィールドから組み立てる（座席の index は位置で振り直す）
    pub fn from_parts(
        game_id: Option<String>,
        occupants: Vec<Option<PlayerId>>,
        status: TableStatus,
        host_id: Option<String>,
    ) -> Self {
        let seats = occupants
            .into_iter()
            .enumerate()
            .map(|(index, player_id)| Seat { index, player_id })
            .collect();

        Self {
            game_id,
            seats,
            status,
            host_id,
        }
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    /// 全座席が埋まっているか
    pub fn is_full(&self) -> bool {
        !self.seats.is_empty() && self.seats.iter().all(|seat| seat.player_id.is_some())
    }

    /// 座席を確保する
    ///
    /// 座席が空いている場合のみ成功する（先着優先）。プレイヤーが別の座席に
    /// 座っていた場合はその座席を空けてから移動する。範囲外の index や埋まっている
    /// 座席は拒否され、テーブルは変更されない。
    pub fn claim_seat(&mut self, seat_index: usize, player_id: &PlayerId) -> SeatOutcome {
        match self.seats.get(seat_index) {
            Some(seat) if seat.player_id.is_none() => {}
            _ => return SeatOutcome::Rejected,
        }

        for seat in self.seats.iter_mut() {
            if seat.player_id.as_ref() == Some(player_id) {
                seat.player_id = None;
            }
        }
        self.seats[seat_index].player_id = Some(player_id.clone());

        SeatOutcome::Applied
    }

    /// 座席を解放する（同じプレイヤーが座っている場合のみ）
    pub fn release_seat(&mut self, seat_index: usize, player_id: &PlayerId) -> SeatOutcome {
        match self.seats.get_mut(seat_index) {
            Some(seat) if seat.player_id.as_ref() == Some(player_id) => {
                seat.player_id = None;
                SeatOutcome::Applied
            }
            _ => SeatOutcome::Rejected,
        }
    }

    /// ゲームを開始する
    ///
    /// ロビー状態で validator が通った場合のみ `started` に遷移する。拒否された場合、
    /// テーブルは変更されない。開始済みのテーブルに対しては変更なしで成功を返す。
    pub fn attempt_start(&mut self, validator: StartValidator) -> StartVerdict {
        match self.status {
            TableStatus::Started => StartVerdict::accept(),
            TableStatus::Finished => StartVerdict::reject("Table already finished"),
            TableStatus::Lobby => {
                let verdict = validator(self);
                if verdict.ok {
                    self.status = TableStatus::Started;
                }
                verdict
            }
        }
    }

    /// ゲームを終了する（`started` の場合のみ遷移）
    pub fn finish(&mut self) -> bool {
        if self.status == TableStatus::Started {
            self.status = TableStatus::Finished;
            true
        } else {
            false
        }
    }

    /// クライアントが送ってきたテーブル全体を正規化する
    ///
    /// 競合保護のない上書き経路（管理者・ローカルフォールバック用）で使う。
    /// 座席は位置で振り直し、欠けている・不正なフィールドは `null` / `lobby` にする。
    /// 座席配列がなければ既定数の空席になる。正規化済みの値に再度適用しても変化しない。
    pub fn normalize(raw: &Value) -> Self {
        let game_id = non_empty_string(raw.get("gameId"));
        let host_id = non_empty_string(raw.get("hostId"));
        let status = raw
            .get("status")
            .and_then(Value::as_str)
            .and_then(TableStatus::parse)
            .unwrap_or_default();

        let occupants = match raw.get("seats").and_then(Value::as_array) {
            Some(seats) => seats
                .iter()
                .take(MAX_SEAT_COUNT)
                .map(|seat| {
                    non_empty_string(seat.get("playerId")).and_then(|id| PlayerId::new(id).ok())
                })
                .collect(),
            None => vec![None; DEFAULT_SEAT_COUNT],
        };

        Self::from_parts(game_id, occupants, status, host_id)
    }
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
