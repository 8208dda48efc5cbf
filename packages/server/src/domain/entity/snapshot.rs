//! ルームの永続化スナップショット

use super::table::TableState;

/// TTL 付きで外部ストアに保存されるルームの正規の状態
///
/// 遅れて参加したメンバーや再起動したプロセスが、この値から状態を復元する。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub game: Option<String>,
    pub activity: Option<String>,
    pub table: Option<TableState>,
}

impl RoomSnapshot {
    pub fn is_empty(&self) -> bool {
        self.game.is_none() && self.activity.is_none() && self.table.is_none()
    }
}
