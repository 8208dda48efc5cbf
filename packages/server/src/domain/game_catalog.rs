//! 既知のカードゲームの定義（座席数と開始条件）

use super::entity::{DEFAULT_SEAT_COUNT, StartVerdict, TableState};

/// ゲーム固有の開始条件
pub type StartValidator = fn(&TableState) -> StartVerdict;

/// ゲーム定義
#[derive(Debug, Clone, Copy)]
pub struct GameDefinition {
    pub id: &'static str,
    pub players: usize,
    pub validator: Option<StartValidator>,
}

static CATALOG: [GameDefinition; 4] = [
    GameDefinition {
        id: "spades",
        players: 4,
        validator: Some(spades_validator),
    },
    GameDefinition {
        id: "hearts",
        players: 4,
        validator: None,
    },
    GameDefinition {
        id: "bridge",
        players: 4,
        validator: None,
    },
    GameDefinition {
        id: "custom",
        players: 2,
        validator: None,
    },
];

pub fn find_game(id: &str) -> Option<&'static GameDefinition> {
    CATALOG.iter().find(|game| game.id == id)
}

/// 新しいテーブルの座席数
///
/// 明示的な指定（1 以上）を優先し、次にカタログの人数、どちらもなければ既定値。
pub fn seat_count_for(game_id: &str, requested: Option<usize>) -> usize {
    requested
        .filter(|players| *players > 0)
        .or_else(|| find_game(game_id).map(|game| game.players))
        .unwrap_or(DEFAULT_SEAT_COUNT)
}

/// テーブルの `gameId` に対応する開始条件（なければ全席着席の既定条件）
pub fn validator_for(game_id: Option<&str>) -> StartValidator {
    game_id
        .and_then(find_game)
        .and_then(|game| game.validator)
        .unwrap_or(default_validator)
}

fn default_validator(table: &TableState) -> StartVerdict {
    if table.is_full() {
        StartVerdict::accept()
    } else {
        StartVerdict::reject("Seats not full")
    }
}

fn spades_validator(table: &TableState) -> StartVerdict {
    if table.seats().len() == 4 && table.is_full() {
        StartVerdict::accept()
    } else {
        StartVerdict::reject("All 4 seats must be filled to start Spades")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PlayerId;

    #[test]
    fn test_seat_count_precedence() {
        // テスト項目: 座席数は明示指定 > カタログ > 既定値の順で決まる
        // given (前提条件):
        let explicit = seat_count_for("hearts", Some(6));
        let zero = seat_count_for("custom", Some(0));
        let catalogued = seat_count_for("custom", None);
        let unknown = seat_count_for("poker", None);

        // when (操作) / then (期待する結果):
        assert_eq!(explicit, 6);
        assert_eq!(zero, 2);
        assert_eq!(catalogued, 2);
        assert_eq!(unknown, DEFAULT_SEAT_COUNT);
    }

    #[test]
    fn test_spades_validator_reason() {
        // テスト項目: spades は専用の拒否理由を返す
        // given (前提条件):
        let mut table = TableState::new(Some("spades".to_string()), 4);
        table.claim_seat(0, &PlayerId::new("alice".to_string()).unwrap());

        // when (操作):
        let verdict = validator_for(table.game_id.as_deref())(&table);

        // then (期待する結果):
        assert_eq!(
            verdict,
            StartVerdict::reject("All 4 seats must be filled to start Spades")
        );
    }

    #[test]
    fn test_unknown_game_uses_default_validator() {
        // テスト項目: カタログにないゲームは既定の開始条件を使う
        // given (前提条件):
        let table = TableState::new(Some("poker".to_string()), 3);

        // when (操作):
        let verdict = validator_for(Some("poker"))(&table);

        // then (期待する結果):
        assert_eq!(verdict, StartVerdict::reject("Seats not full"));
    }
}
