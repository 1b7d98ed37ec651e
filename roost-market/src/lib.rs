mod auth;
mod bookings;
mod db;
mod properties;
mod reviews;
mod util;
mod wishlist;

use std::sync::Arc;

pub use auth::*;
pub use bookings::*;
pub use db::*;
pub use properties::*;
pub use reviews::*;
pub use wishlist::*;

/// The roost marketplace system, facilitating property listings, bookings,
/// reviews, wishlists, and authentication over a shared database.
pub struct Marketplace<Db> {
    pub auth: Auth<Db>,
    pub properties: PropertyManager<Db>,
    pub bookings: BookingManager<Db>,
    pub reviews: ReviewManager<Db>,
    pub wishlist: WishlistManager<Db>,
}

impl<Db> Marketplace<Db>
where
    Db: Database,
{
    pub fn new(database: Db) -> Self {
        let database = Arc::new(database);

        Self {
            auth: Auth::new(&database),
            properties: PropertyManager::new(&database),
            bookings: BookingManager::new(&database),
            reviews: ReviewManager::new(&database),
            wishlist: WishlistManager::new(&database),
        }
    }
}
