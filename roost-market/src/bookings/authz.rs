use crate::{BookingData, PrimaryKey, UserData, UserRole};

/// The requesting user, reduced to what authorization decisions need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: PrimaryKey,
    pub role: UserRole,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<&UserData> for Actor {
    fn from(user: &UserData) -> Self {
        Self {
            id: user.id,
            role: user.role,
        }
    }
}

/// A booking may be viewed by its booker, the host of the booked property,
/// or an admin.
pub fn can_view(actor: Actor, booking: &BookingData, host_id: Option<PrimaryKey>) -> bool {
    actor.id == booking.user_id || host_id == Some(actor.id) || actor.is_admin()
}

/// Only the booker or an admin may cancel. The host is not enough.
pub fn can_cancel(actor: Actor, booking: &BookingData) -> bool {
    actor.id == booking.user_id || actor.is_admin()
}
