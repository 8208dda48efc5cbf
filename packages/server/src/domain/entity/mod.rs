//! エンティティ

mod room;
mod snapshot;
mod table;

pub use room::{
    MemberRemoved, ReadyOutcome, RemoteUpdate, Room, RoomCleanup, TableCommand, TableOutcome,
};
pub use snapshot::RoomSnapshot;
pub use table::{
    DEFAULT_SEAT_COUNT, MAX_SEAT_COUNT, Seat, SeatOutcome, StartVerdict, TableState, TableStatus,
};
