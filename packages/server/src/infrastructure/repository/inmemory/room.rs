//! InMemory Room Repository 実装
//!
//! ドメイン層が定義する RoomRepository trait の具体的な実装。
//! このプロセスに接続しているメンバーのルームだけを HashMap に保持します。
//!
//! 1 つの Mutex でルームと接続の対応表をまとめて守ることで、
//! 各メソッドの読み取りから変更までをアトミックにしています。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ConnectionId, MemberAdded, MemberRemoved, ReadyOutcome, RemoteUpdate, RepositoryError, Room,
    RoomCleanup, RoomId, RoomRepository, RoomSnapshot, TableCommand, TableState, TableUpdate,
};

#[derive(Debug, Default)]
struct Registry {
    rooms: HashMap<RoomId, Room>,
    /// 接続 → 所属ルーム
    connection_rooms: HashMap<ConnectionId, RoomId>,
}

impl Registry {
    fn room_mut(&mut self, room_id: &RoomId) -> Result<&mut Room, RepositoryError> {
        self.rooms
            .get_mut(room_id)
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.to_string()))
    }
}

/// インメモリ Room Repository 実装
#[derive(Debug, Default)]
pub struct InMemoryRoomRepository {
    registry: Mutex<Registry>,
}

impl InMemoryRoomRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn room_of(&self, connection_id: ConnectionId) -> Option<RoomId> {
        let registry = self.registry.lock().await;
        registry.connection_rooms.get(&connection_id).cloned()
    }

    async fn add_member(
        &self,
        room_id: &RoomId,
        connection_id: ConnectionId,
    ) -> Result<MemberAdded, RepositoryError> {
        let mut registry = self.registry.lock().await;

        if let Some(current) = registry.connection_rooms.get(&connection_id) {
            return Err(RepositoryError::AlreadyInRoom(
                connection_id.to_string(),
                current.to_string(),
            ));
        }

        let room = registry
            .rooms
            .entry(room_id.clone())
            .or_insert_with(|| Room::new(room_id.clone()));
        let others = room.members();
        let needs_recovery = !room.has_shared_state();
        room.add_member(connection_id);

        registry
            .connection_rooms
            .insert(connection_id, room_id.clone());

        tracing::debug!(
            "Connection '{}' joined room '{}' (members: {})",
            connection_id,
            room_id,
            others.len() + 1
        );

        Ok(MemberAdded {
            others,
            needs_recovery,
        })
    }

    async fn remove_member(&self, connection_id: ConnectionId) -> Option<MemberRemoved> {
        let mut registry = self.registry.lock().await;

        let room_id = registry.connection_rooms.remove(&connection_id)?;
        let room = registry.rooms.get_mut(&room_id)?;
        room.remove_member(connection_id);

        let remaining = room.members();
        let cleanup = room.cleanup_policy();
        match cleanup {
            RoomCleanup::DropLocal | RoomCleanup::DeleteSnapshot => {
                registry.rooms.remove(&room_id);
                tracing::debug!("Room '{}' dropped from local registry", room_id);
            }
            RoomCleanup::KeepStarted => {
                tracing::debug!("Room '{}' is empty but kept (game in progress)", room_id);
            }
            RoomCleanup::Occupied => {}
        }

        Some(MemberRemoved {
            room_id,
            remaining,
            cleanup,
        })
    }

    async fn get_room(&self, room_id: &RoomId) -> Option<Room> {
        let registry = self.registry.lock().await;
        registry.rooms.get(room_id).cloned()
    }

    async fn members(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        let registry = self.registry.lock().await;
        registry
            .rooms
            .get(room_id)
            .map(Room::members)
            .unwrap_or_default()
    }

    async fn hydrate(
        &self,
        room_id: &RoomId,
        snapshot: RoomSnapshot,
    ) -> Result<(), RepositoryError> {
        let mut registry = self.registry.lock().await;
        registry.room_mut(room_id)?.hydrate(snapshot);
        Ok(())
    }

    async fn select_game(
        &self,
        room_id: &RoomId,
        game: String,
        players: Option<usize>,
    ) -> Result<(TableState, Vec<ConnectionId>), RepositoryError> {
        let mut registry = self.registry.lock().await;
        let room = registry.room_mut(room_id)?;
        let table = room.select_game(game, players);
        Ok((table, room.members()))
    }

    async fn select_activity(
        &self,
        room_id: &RoomId,
        activity: String,
    ) -> Result<Vec<ConnectionId>, RepositoryError> {
        let mut registry = self.registry.lock().await;
        let room = registry.room_mut(room_id)?;
        room.activity = Some(activity);
        Ok(room.members())
    }

    async fn update_table(
        &self,
        room_id: &RoomId,
        command: TableCommand,
    ) -> Result<Option<TableUpdate>, RepositoryError> {
        let mut registry = self.registry.lock().await;
        let room = registry.room_mut(room_id)?;
        let members = room.members();
        Ok(room
            .apply_table_command(command)
            .map(|(outcome, table)| TableUpdate {
                outcome,
                table,
                members,
            }))
    }

    async fn mark_ready(
        &self,
        room_id: &RoomId,
        connection_id: ConnectionId,
    ) -> Result<(ReadyOutcome, Vec<ConnectionId>), RepositoryError> {
        let mut registry = self.registry.lock().await;
        let room = registry.room_mut(room_id)?;
        let outcome = room.mark_ready(connection_id);
        Ok((outcome, room.members()))
    }

    async fn apply_remote(
        &self,
        room_id: &RoomId,
        update: RemoteUpdate,
    ) -> Option<Vec<ConnectionId>> {
        let mut registry = self.registry.lock().await;
        let room = registry.rooms.get_mut(room_id)?;
        room.apply_remote(update);
        Some(room.members())
    }

    async fn snapshot(&self, room_id: &RoomId) -> Option<RoomSnapshot> {
        let registry = self.registry.lock().await;
        registry.rooms.get(room_id).map(Room::snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PlayerId, SeatOutcome, TableOutcome, TableStatus};

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - InMemoryRoomRepository のメンバー管理と、ルーム単位の状態変更
    // - 空になったルームの後始末（テーブルの状態による分岐）
    //
    // 【なぜこのテストが必要か】
    // - Repository は UseCase から呼ばれるデータアクセス層の中核
    // - 接続 → ルームの対応表とルームのメンバー集合がずれないことを保証する
    // ========================================

    fn room_id(value: &str) -> RoomId {
        RoomId::new(value.to_string()).unwrap()
    }

    fn player(value: &str) -> PlayerId {
        PlayerId::new(value.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_add_member_reports_other_members() {
        // テスト項目: メンバー追加時に既存のメンバーが返され、新しいルームは復元が必要とされる
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        let r1 = room_id("r1");
        let first = repo.add_member(&r1, ConnectionId::new(1)).await.unwrap();

        // when (操作):
        let second = repo.add_member(&r1, ConnectionId::new(2)).await.unwrap();

        // then (期待する結果):
        assert!(first.others.is_empty());
        assert!(first.needs_recovery);
        assert_eq!(second.others, vec![ConnectionId::new(1)]);
        assert_eq!(repo.room_of(ConnectionId::new(2)).await, Some(r1.clone()));
        assert_eq!(
            repo.members(&r1).await,
            vec![ConnectionId::new(1), ConnectionId::new(2)]
        );
    }

    #[tokio::test]
    async fn test_add_member_twice_is_error() {
        // テスト項目: すでにルームに所属している接続は追加できない
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        repo.add_member(&room_id("r1"), ConnectionId::new(1))
            .await
            .unwrap();

        // when (操作):
        let result = repo.add_member(&room_id("r2"), ConnectionId::new(1)).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(RepositoryError::AlreadyInRoom(
                "1".to_string(),
                "r1".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_remove_last_member_drops_lobby_room() {
        // テスト項目: ロビー状態のルームは最後のメンバーが抜けるとローカルから消える
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        let r1 = room_id("r1");
        repo.add_member(&r1, ConnectionId::new(1)).await.unwrap();
        repo.select_game(&r1, "hearts".to_string(), None)
            .await
            .unwrap();

        // when (操作):
        let removed = repo.remove_member(ConnectionId::new(1)).await.unwrap();

        // then (期待する結果):
        assert_eq!(removed.cleanup, RoomCleanup::DropLocal);
        assert!(removed.remaining.is_empty());
        assert_eq!(repo.get_room(&r1).await, None);
        assert_eq!(repo.room_of(ConnectionId::new(1)).await, None);
    }

    #[tokio::test]
    async fn test_remove_last_member_keeps_started_room() {
        // テスト項目: ゲーム中のルームは空になってもローカルに残る
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        let r1 = room_id("r1");
        repo.add_member(&r1, ConnectionId::new(1)).await.unwrap();
        repo.select_game(&r1, "custom".to_string(), None)
            .await
            .unwrap();
        for (index, id) in ["alice", "bob"].iter().enumerate() {
            repo.update_table(
                &r1,
                TableCommand::Claim {
                    seat_index: index,
                    player_id: player(id),
                    table_id: None,
                },
            )
            .await
            .unwrap();
        }
        repo.update_table(&r1, TableCommand::Start { fallback: None })
            .await
            .unwrap();

        // when (操作):
        let removed = repo.remove_member(ConnectionId::new(1)).await.unwrap();

        // then (期待する結果):
        assert_eq!(removed.cleanup, RoomCleanup::KeepStarted);
        let room = repo.get_room(&r1).await.unwrap();
        assert_eq!(room.table.map(|t| t.status), Some(TableStatus::Started));
    }

    #[tokio::test]
    async fn test_remove_unknown_connection() {
        // テスト項目: どのルームにも所属していない接続の削除は何もしない（冪等性）
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();

        // when (操作):
        let removed = repo.remove_member(ConnectionId::new(42)).await;

        // then (期待する結果):
        assert_eq!(removed, None);
    }

    #[tokio::test]
    async fn test_update_table_returns_members_and_outcome() {
        // テスト項目: テーブル操作は結果・操作後のテーブル・メンバーをまとめて返す
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        let r1 = room_id("r1");
        repo.add_member(&r1, ConnectionId::new(1)).await.unwrap();
        repo.add_member(&r1, ConnectionId::new(2)).await.unwrap();

        // when (操作):
        let update = repo
            .update_table(
                &r1,
                TableCommand::Claim {
                    seat_index: 0,
                    player_id: player("alice"),
                    table_id: None,
                },
            )
            .await
            .unwrap()
            .unwrap();

        // then (期待する結果):
        assert_eq!(update.outcome, TableOutcome::Seat(SeatOutcome::Applied));
        assert_eq!(update.members.len(), 2);
        assert_eq!(
            update.table.seats()[0].player_id.as_ref().map(PlayerId::as_str),
            Some("alice")
        );
    }

    #[tokio::test]
    async fn test_apply_remote_ignores_unknown_room() {
        // テスト項目: このプロセスが保持していないルームへのリモート変更は無視される
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();

        // when (操作):
        let result = repo
            .apply_remote(
                &room_id("elsewhere"),
                RemoteUpdate::ActivitySelected("cards".to_string()),
            )
            .await;

        // then (期待する結果):
        assert_eq!(result, None);
        assert_eq!(repo.get_room(&room_id("elsewhere")).await, None);
    }
}
