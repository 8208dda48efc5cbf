//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! 各メソッドは 1 回の呼び出しで読み取り・変更・結果の取得までを行います。
//! 並行に届いたメッセージ同士（例えば同じ座席への確保要求）が互いの途中状態を
//! 観測しないよう、呼び出しの単位でアトミックに実装する必要があります。

use async_trait::async_trait;

use super::{
    ConnectionId, MemberRemoved, ReadyOutcome, RemoteUpdate, RepositoryError, Room, RoomId,
    RoomSnapshot, TableCommand, TableOutcome, TableState,
};

/// メンバー追加の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberAdded {
    /// 追加したメンバー以外のメンバー
    pub others: Vec<ConnectionId>,
    /// このプロセスがルームの共有状態を持っていないため、スナップショットから復元すべきか
    pub needs_recovery: bool,
}

/// テーブル操作の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableUpdate {
    pub outcome: TableOutcome,
    /// 操作後のテーブル（拒否された場合は変更前のまま）
    pub table: TableState,
    /// 操作時点のルームのメンバー
    pub members: Vec<ConnectionId>,
}

/// Room Repository trait
///
/// UseCase 層はこの trait に依存し、Infrastructure 層の具体的な実装には依存しない。
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// 接続が所属しているルーム
    async fn room_of(&self, connection_id: ConnectionId) -> Option<RoomId>;

    /// ルームにメンバーを追加（ルームがなければ作成）
    ///
    /// 接続がすでに別のルームに所属している場合はエラー。
    async fn add_member(
        &self,
        room_id: &RoomId,
        connection_id: ConnectionId,
    ) -> Result<MemberAdded, RepositoryError>;

    /// 接続を所属しているルームから外し、空になったルームの後始末を行う
    async fn remove_member(&self, connection_id: ConnectionId) -> Option<MemberRemoved>;

    /// Room エンティティを取得
    async fn get_room(&self, room_id: &RoomId) -> Option<Room>;

    /// ルームのメンバー
    async fn members(&self, room_id: &RoomId) -> Vec<ConnectionId>;

    /// スナップショットからルームの状態を復元
    async fn hydrate(&self, room_id: &RoomId, snapshot: RoomSnapshot)
    -> Result<(), RepositoryError>;

    /// ゲームを選択し、新しいテーブルとメンバーを返す
    async fn select_game(
        &self,
        room_id: &RoomId,
        game: String,
        players: Option<usize>,
    ) -> Result<(TableState, Vec<ConnectionId>), RepositoryError>;

    /// アクティビティを選択し、メンバーを返す
    async fn select_activity(
        &self,
        room_id: &RoomId,
        activity: String,
    ) -> Result<Vec<ConnectionId>, RepositoryError>;

    /// テーブル操作を適用（テーブルがなく何もできなかった場合は `None`）
    async fn update_table(
        &self,
        room_id: &RoomId,
        command: TableCommand,
    ) -> Result<Option<TableUpdate>, RepositoryError>;

    /// ready を記録し、結果とメンバーを返す
    async fn mark_ready(
        &self,
        room_id: &RoomId,
        connection_id: ConnectionId,
    ) -> Result<(ReadyOutcome, Vec<ConnectionId>), RepositoryError>;

    /// 他プロセスからの変更を適用し、メンバーを返す
    ///
    /// このプロセスがそのルームを保持していない場合は何もせず `None` を返す。
    async fn apply_remote(&self, room_id: &RoomId, update: RemoteUpdate)
    -> Option<Vec<ConnectionId>>;

    /// 永続化用のスナップショット
    async fn snapshot(&self, room_id: &RoomId) -> Option<RoomSnapshot>;
}
