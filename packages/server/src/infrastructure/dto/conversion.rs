//! Conversion logic between DTOs and domain entities.

use gameface_shared::protocol::{SeatDto, TableStateDto, TableStatusDto};

use crate::domain::{PlayerId, RoomSnapshot, TableState, TableStatus};

use super::store::RoomSnapshotDto;

// ========================================
// DTO → Domain Entity
// ========================================

impl From<TableStatusDto> for TableStatus {
    fn from(dto: TableStatusDto) -> Self {
        match dto {
            TableStatusDto::Lobby => Self::Lobby,
            TableStatusDto::Started => Self::Started,
            TableStatusDto::Finished => Self::Finished,
        }
    }
}

impl From<TableStateDto> for TableState {
    fn from(dto: TableStateDto) -> Self {
        // 座席は位置で振り直す。空のプレイヤー ID は空席として扱う
        let occupants = dto
            .seats
            .into_iter()
            .map(|seat| seat.player_id.and_then(|id| PlayerId::new(id).ok()))
            .collect();

        TableState::from_parts(dto.game_id, occupants, dto.status.into(), dto.host_id)
    }
}

impl From<RoomSnapshotDto> for RoomSnapshot {
    fn from(dto: RoomSnapshotDto) -> Self {
        Self {
            game: dto.game,
            activity: dto.activity,
            table: dto.table_state.map(TableState::from),
        }
    }
}

// ========================================
// Domain Entity → DTO
// ========================================

impl From<TableStatus> for TableStatusDto {
    fn from(model: TableStatus) -> Self {
        match model {
            TableStatus::Lobby => Self::Lobby,
            TableStatus::Started => Self::Started,
            TableStatus::Finished => Self::Finished,
        }
    }
}

impl From<&TableState> for TableStateDto {
    fn from(model: &TableState) -> Self {
        Self {
            game_id: model.game_id.clone(),
            seats: model
                .seats()
                .iter()
                .map(|seat| SeatDto {
                    index: seat.index,
                    player_id: seat.player_id.as_ref().map(|id| id.as_str().to_string()),
                })
                .collect(),
            status: model.status.into(),
            host_id: model.host_id.clone(),
        }
    }
}

impl From<&RoomSnapshot> for RoomSnapshotDto {
    fn from(model: &RoomSnapshot) -> Self {
        Self {
            game: model.game.clone(),
            activity: model.activity.clone(),
            table_state: model.table.as_ref().map(TableStateDto::from),
        }
    }
}
