use dashmap::DashMap;
use std::sync::Arc;
use tandem_core::{Role, RoomId};
use tracing::{info, warn};

/// Decides who leads the offer/answer exchange in each room.
///
/// Owned by whoever creates and routes rooms and passed down explicitly: the first participant
/// to claim a room is its initiator, everyone after joins.
#[derive(Clone, Default)]
pub struct RoleLedger {
    rooms: Arc<DashMap<RoomId, usize>>,
}

impl RoleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&self, room: &RoomId) -> Role {
        let mut participants = self.rooms.entry(room.clone()).or_insert(0);
        *participants += 1;

        let role = if *participants == 1 {
            Role::Initiator
        } else {
            Role::Joiner
        };

        if *participants > 2 {
            warn!(
                "Room {} already has {} participants; only two can connect",
                room,
                *participants - 1
            );
        }

        info!("Participant #{} in room {} is {}", *participants, room, role);
        role
    }

    /// Drop everything known about `room`; the next claim leads again.
    pub fn forget(&self, room: &RoomId) {
        self.rooms.remove(room);
    }
}
