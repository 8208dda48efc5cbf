//! Room エンティティ
//!
//! このプロセスが保持するルームの一部分（このプロセスに接続しているメンバーと、
//! ルーム全体で共有されるゲーム・アクティビティ・テーブルの状態）。
//! 他プロセスとの整合は Cross-Instance Sync が取る。

use std::collections::BTreeSet;

use crate::domain::{
    game_catalog::{seat_count_for, validator_for},
    value_object::{ConnectionId, PlayerId, RoomId},
};

use super::{
    snapshot::RoomSnapshot,
    table::{DEFAULT_SEAT_COUNT, SeatOutcome, StartVerdict, TableState, TableStatus},
};

/// テーブルへの操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableCommand {
    Claim {
        seat_index: usize,
        player_id: PlayerId,
        table_id: Option<String>,
    },
    Release {
        seat_index: usize,
        player_id: PlayerId,
        table_id: Option<String>,
    },
    /// 正規化済みのテーブルで無条件に上書きする
    Overwrite(TableState),
    /// テーブルがなければ `fallback`（なければ既定の空テーブル）で開始を試みる
    Start { fallback: Option<TableState> },
    Finish,
}

/// テーブル操作の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOutcome {
    Seat(SeatOutcome),
    Overwritten,
    Start(StartVerdict),
    Finish { changed: bool },
}

/// 他プロセスから届いた変更
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteUpdate {
    GameSelected {
        game: String,
        table: Option<TableState>,
    },
    ActivitySelected(String),
    Table(TableState),
}

/// `ready` の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyOutcome {
    /// ゲーム未選択のため無視された
    NoGameSelected,
    Marked { all_ready: bool },
}

/// メンバーがいなくなったルームの後始末
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomCleanup {
    /// まだメンバーが残っている
    Occupied,
    /// ゲーム中なのでローカルの状態を保持する
    KeepStarted,
    /// ローカルの状態を破棄する（スナップショットは TTL で消える）
    DropLocal,
    /// ゲームが終了しているのでスナップショットも削除する
    DeleteSnapshot,
}

/// メンバー削除の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRemoved {
    pub room_id: RoomId,
    pub remaining: Vec<ConnectionId>,
    pub cleanup: RoomCleanup,
}

/// Room エンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    members: BTreeSet<ConnectionId>,
    pub game: Option<String>,
    pub activity: Option<String>,
    ready: BTreeSet<ConnectionId>,
    pub table: Option<TableState>,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            members: BTreeSet::new(),
            game: None,
            activity: None,
            ready: BTreeSet::new(),
            table: None,
        }
    }

    pub fn add_member(&mut self, connection_id: ConnectionId) {
        self.members.insert(connection_id);
    }

    pub fn remove_member(&mut self, connection_id: ConnectionId) {
        self.members.remove(&connection_id);
        self.ready.remove(&connection_id);
    }

    /// メンバー一覧（接続 ID 順）
    pub fn members(&self) -> Vec<ConnectionId> {
        self.members.iter().copied().collect()
    }

    /// ゲーム・アクティビティ・テーブルのいずれかを保持しているか
    pub fn has_shared_state(&self) -> bool {
        self.game.is_some() || self.activity.is_some() || self.table.is_some()
    }

    /// ゲームを選択し、新しいテーブルを作る（以前のテーブルは破棄される）
    pub fn select_game(&mut self, game: String, players: Option<usize>) -> TableState {
        let table = TableState::new(Some(game.clone()), seat_count_for(&game, players));
        self.game = Some(game);
        self.ready.clear();
        self.table = Some(table.clone());
        table
    }

    pub fn mark_ready(&mut self, connection_id: ConnectionId) -> ReadyOutcome {
        if self.game.is_none() {
            return ReadyOutcome::NoGameSelected;
        }
        self.ready.insert(connection_id);
        let all_ready = self.members.iter().all(|id| self.ready.contains(id));
        ReadyOutcome::Marked { all_ready }
    }

    /// テーブル操作を適用し、結果と適用後のテーブルを返す
    ///
    /// テーブルがない状態での `Finish` だけは `None` を返す。
    pub fn apply_table_command(
        &mut self,
        command: TableCommand,
    ) -> Option<(TableOutcome, TableState)> {
        match command {
            TableCommand::Claim {
                seat_index,
                player_id,
                table_id,
            } => {
                let table = self.table_or_lobby(table_id);
                let outcome = table.claim_seat(seat_index, &player_id);
                Some((TableOutcome::Seat(outcome), table.clone()))
            }
            TableCommand::Release {
                seat_index,
                player_id,
                table_id,
            } => {
                let table = self.table_or_lobby(table_id);
                let outcome = table.release_seat(seat_index, &player_id);
                Some((TableOutcome::Seat(outcome), table.clone()))
            }
            TableCommand::Overwrite(table) => {
                self.table = Some(table.clone());
                Some((TableOutcome::Overwritten, table))
            }
            TableCommand::Start { fallback } => {
                let mut candidate = match (&self.table, fallback) {
                    (Some(table), _) => table.clone(),
                    (None, Some(fallback)) => fallback,
                    (None, None) => TableState::new(None, DEFAULT_SEAT_COUNT),
                };
                let verdict = candidate.attempt_start(validator_for(candidate.game_id.as_deref()));
                if verdict.ok {
                    self.table = Some(candidate.clone());
                }
                Some((TableOutcome::Start(verdict), candidate))
            }
            TableCommand::Finish => {
                let table = self.table.as_mut()?;
                let changed = table.finish();
                Some((TableOutcome::Finish { changed }, table.clone()))
            }
        }
    }

    /// 他プロセスからの変更を無条件に適用する（後勝ち）
    pub fn apply_remote(&mut self, update: RemoteUpdate) {
        match update {
            RemoteUpdate::GameSelected { game, table } => {
                self.game = Some(game);
                self.ready.clear();
                if table.is_some() {
                    self.table = table;
                }
            }
            RemoteUpdate::ActivitySelected(activity) => {
                self.activity = Some(activity);
            }
            RemoteUpdate::Table(table) => {
                self.table = Some(table);
            }
        }
    }

    /// 永続化するスナップショット
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            game: self.game.clone(),
            activity: self.activity.clone(),
            table: self.table.clone(),
        }
    }

    /// スナップショットから状態を復元する
    ///
    /// ローカルにまだ値がないフィールドだけを埋める。復元までの間に
    /// このプロセスで行われた変更の方が新しいため、上書きはしない。
    pub fn hydrate(&mut self, snapshot: RoomSnapshot) {
        if self.game.is_none() {
            self.game = snapshot.game;
        }
        if self.activity.is_none() {
            self.activity = snapshot.activity;
        }
        if self.table.is_none() {
            self.table = snapshot.table;
        }
    }

    /// メンバーがいなくなったときの後始末の方針
    pub fn cleanup_policy(&self) -> RoomCleanup {
        if !self.members.is_empty() {
            return RoomCleanup::Occupied;
        }
        match self.table.as_ref().map(|table| table.status) {
            Some(TableStatus::Finished) => RoomCleanup::DeleteSnapshot,
            Some(TableStatus::Started) => RoomCleanup::KeepStarted,
            _ => RoomCleanup::DropLocal,
        }
    }

    fn table_or_lobby(&mut self, table_id: Option<String>) -> &mut TableState {
        self.table
            .get_or_insert_with(|| TableState::new(table_id, DEFAULT_SEAT_COUNT))
    }
}
