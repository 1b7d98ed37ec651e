mod authz;

use std::sync::Arc;

use chrono::NaiveDate;
use log::info;
use rust_decimal::Decimal;
use thiserror::Error;

pub use authz::*;

use crate::{
    util::KeyedLocks, BookingData, BookingStatus, Database, DatabaseError, NewBooking, PrimaryKey,
    PropertyData, UserData,
};

/// Manages the booking lifecycle: creation behind the conflict check,
/// listing, authorized viewing, and cancellation.
pub struct BookingManager<Db> {
    db: Arc<Db>,
    /// Serializes the conflict probe and the insert per property, so two
    /// concurrent requests cannot both pass the probe.
    locks: KeyedLocks<PrimaryKey>,
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("End date must be after start date")]
    InvalidRange,
    #[error("Property is already booked for these dates")]
    DateConflict,
    #[error("{0}")]
    Forbidden(&'static str),
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

/// A requested reservation over a half-open `[start_date, end_date)` range
#[derive(Debug)]
pub struct BookingRequest {
    pub property_id: PrimaryKey,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// A booking joined with a snapshot of the property it reserves.
/// The property is `None` when it has since been deleted.
#[derive(Debug)]
pub struct BookingWithProperty {
    pub booking: BookingData,
    pub property: Option<PropertyData>,
}

/// A booking as seen by the host: property snapshot plus the booking guest
#[derive(Debug)]
pub struct HostBooking {
    pub booking: BookingData,
    pub property: Option<PropertyData>,
    pub guest: Option<UserData>,
}

/// Half-open interval intersection. Ranges that merely touch, checkout day
/// equal to another booking's check-in day, do not overlap.
pub fn overlaps(a_start: NaiveDate, a_end: NaiveDate, b_start: NaiveDate, b_end: NaiveDate) -> bool {
    a_start < b_end && a_end > b_start
}

/// Number of nights in `[start, end)`. Exact, since dates are whole days.
pub fn nights_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

impl<Db> BookingManager<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self {
            db: db.clone(),
            locks: KeyedLocks::new(),
        }
    }

    /// Books a property for the requested range, if the property exists,
    /// the range is well-formed, and no active booking overlaps it.
    /// The total price is derived from the property's nightly price.
    pub async fn create_booking(
        &self,
        user_id: PrimaryKey,
        request: BookingRequest,
    ) -> Result<BookingData, BookingError> {
        let property = self.db.property_by_id(request.property_id).await?;

        if request.start_date >= request.end_date {
            return Err(BookingError::InvalidRange);
        }

        let lock = self.locks.get(property.id);
        let _guard = lock.lock().await;

        let conflict = self
            .db
            .booking_conflict_exists(property.id, request.start_date, request.end_date)
            .await?;

        if conflict {
            return Err(BookingError::DateConflict);
        }

        let nights = nights_between(request.start_date, request.end_date);
        let total_price = Decimal::from(nights) * property.price_per_night;

        let booking = self
            .db
            .create_booking(NewBooking {
                property_id: property.id,
                user_id,
                start_date: request.start_date,
                end_date: request.end_date,
                total_price,
                status: BookingStatus::Confirmed,
            })
            .await?;

        info!(
            "User {} booked property {} for {} night(s)",
            user_id, property.id, nights
        );

        Ok(booking)
    }

    /// All bookings made by the user, newest first, with property snapshots
    pub async fn my_bookings(
        &self,
        user_id: PrimaryKey,
    ) -> Result<Vec<BookingWithProperty>, BookingError> {
        let bookings = self.db.bookings_for_user(user_id).await?;

        let mut result = Vec::with_capacity(bookings.len());
        for booking in bookings {
            let property = self.db.property_by_id(booking.property_id).await.ok();
            result.push(BookingWithProperty { booking, property });
        }

        Ok(result)
    }

    /// Fetches one booking for an authorized viewer: the booker, the
    /// property's host, or an admin.
    pub async fn booking_by_id(
        &self,
        booking_id: PrimaryKey,
        actor: Actor,
    ) -> Result<BookingWithProperty, BookingError> {
        let booking = self.db.booking_by_id(booking_id).await?;
        let property = self.db.property_by_id(booking.property_id).await.ok();

        if !can_view(actor, &booking, property.as_ref().map(|p| p.host_id)) {
            return Err(BookingError::Forbidden(
                "You do not have permission to view this booking",
            ));
        }

        Ok(BookingWithProperty { booking, property })
    }

    /// Cancels a booking by hard-deleting the record, which frees the date
    /// range for future bookings. Allowed for the booker or an admin; the
    /// property's host may only view.
    pub async fn cancel_booking(
        &self,
        booking_id: PrimaryKey,
        actor: Actor,
    ) -> Result<(), BookingError> {
        let booking = self.db.booking_by_id(booking_id).await?;

        if !can_cancel(actor, &booking) {
            return Err(BookingError::Forbidden(
                "Only the person who booked this can cancel it",
            ));
        }

        self.db.delete_booking(booking_id).await?;

        info!(
            "User {} cancelled booking {} on property {}",
            actor.id, booking_id, booking.property_id
        );

        Ok(())
    }

    /// Bookings across every property the host owns, newest start date
    /// first, with property and guest snapshots
    pub async fn host_bookings(
        &self,
        host_id: PrimaryKey,
    ) -> Result<Vec<HostBooking>, BookingError> {
        let bookings = self.db.bookings_for_host(host_id).await?;

        let mut result = Vec::with_capacity(bookings.len());
        for booking in bookings {
            let property = self.db.property_by_id(booking.property_id).await.ok();
            let guest = self.db.user_by_id(booking.user_id).await.ok();
            result.push(HostBooking {
                booking,
                property,
                guest,
            });
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        LocationData, MemoryDatabase, NewProperty, NewUser, PropertyKind, UserRole,
    };

    fn day(year: i32, month: u32, date: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, date).unwrap()
    }

    struct Fixture {
        db: Arc<MemoryDatabase>,
        bookings: BookingManager<MemoryDatabase>,
        host: UserData,
        guest: UserData,
        property: PropertyData,
    }

    async fn fixture() -> Fixture {
        let db = Arc::new(MemoryDatabase::new());
        let bookings = BookingManager::new(&db);

        let host = db
            .create_user(NewUser {
                username: "marta".to_string(),
                email: "marta@example.com".to_string(),
                password: "hash".to_string(),
                role: UserRole::Host,
            })
            .await
            .unwrap();

        let guest = db
            .create_user(NewUser {
                username: "jonas".to_string(),
                email: "jonas@example.com".to_string(),
                password: "hash".to_string(),
                role: UserRole::Guest,
            })
            .await
            .unwrap();

        let property = db
            .create_property(NewProperty {
                host_id: host.id,
                title: "Seaside cabin".to_string(),
                description: "A cabin by the sea".to_string(),
                location: LocationData {
                    city: "Visby".to_string(),
                    country: "Sweden".to_string(),
                    ..Default::default()
                },
                price_per_night: Decimal::from(1000),
                photos: vec![],
                amenities: vec![],
                max_guests: 4,
                kind: PropertyKind::Cabin,
            })
            .await
            .unwrap();

        Fixture {
            db,
            bookings,
            host,
            guest,
            property,
        }
    }

    fn request(property_id: PrimaryKey, start: NaiveDate, end: NaiveDate) -> BookingRequest {
        BookingRequest {
            property_id,
            start_date: start,
            end_date: end,
        }
    }

    async fn admin(db: &Arc<MemoryDatabase>) -> Actor {
        let user = db
            .create_user(NewUser {
                username: "root".to_string(),
                email: "admin@example.com".to_string(),
                password: "hash".to_string(),
                role: UserRole::Admin,
            })
            .await
            .unwrap();

        Actor::from(&user)
    }

    #[test]
    fn touching_ranges_do_not_overlap() {
        let (a, b, c) = (day(2024, 6, 1), day(2024, 6, 5), day(2024, 6, 8));

        assert!(!overlaps(a, b, b, c));
        assert!(!overlaps(b, c, a, b));
    }

    #[test]
    fn intersecting_and_contained_ranges_overlap() {
        assert!(overlaps(
            day(2024, 6, 1),
            day(2024, 6, 5),
            day(2024, 6, 3),
            day(2024, 6, 6)
        ));
        assert!(overlaps(
            day(2024, 6, 1),
            day(2024, 6, 10),
            day(2024, 6, 3),
            day(2024, 6, 4)
        ));
        assert!(overlaps(
            day(2024, 6, 3),
            day(2024, 6, 4),
            day(2024, 6, 1),
            day(2024, 6, 10)
        ));
    }

    #[test]
    fn confirmed_booking_reads_completed_after_checkout() {
        let booking = BookingData {
            id: uuid::Uuid::new_v4(),
            property_id: uuid::Uuid::new_v4(),
            user_id: uuid::Uuid::new_v4(),
            start_date: day(2024, 6, 1),
            end_date: day(2024, 6, 5),
            total_price: Decimal::from(4000),
            status: BookingStatus::Confirmed,
            created_at: chrono::Utc::now(),
        };

        assert_eq!(
            booking.effective_status(day(2024, 6, 4)),
            BookingStatus::Confirmed
        );
        assert_eq!(
            booking.effective_status(day(2024, 6, 5)),
            BookingStatus::Completed
        );
    }

    #[tokio::test]
    async fn computes_total_price_from_nights() {
        let f = fixture().await;

        let booking = f
            .bookings
            .create_booking(
                f.guest.id,
                request(f.property.id, day(2024, 6, 1), day(2024, 6, 5)),
            )
            .await
            .unwrap();

        assert_eq!(booking.total_price, Decimal::from(4000));
        assert_eq!(booking.status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn rejects_inverted_or_empty_range() {
        let f = fixture().await;

        let inverted = f
            .bookings
            .create_booking(
                f.guest.id,
                request(f.property.id, day(2024, 6, 5), day(2024, 6, 1)),
            )
            .await;
        let empty = f
            .bookings
            .create_booking(
                f.guest.id,
                request(f.property.id, day(2024, 6, 1), day(2024, 6, 1)),
            )
            .await;

        assert!(matches!(inverted, Err(BookingError::InvalidRange)));
        assert!(matches!(empty, Err(BookingError::InvalidRange)));
    }

    #[tokio::test]
    async fn rejects_booking_for_missing_property() {
        let f = fixture().await;

        let result = f
            .bookings
            .create_booking(
                f.guest.id,
                request(uuid::Uuid::new_v4(), day(2024, 6, 1), day(2024, 6, 5)),
            )
            .await;

        assert!(matches!(
            result,
            Err(BookingError::Db(DatabaseError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn rejects_overlapping_booking() {
        let f = fixture().await;

        f.bookings
            .create_booking(
                f.guest.id,
                request(f.property.id, day(2024, 6, 1), day(2024, 6, 5)),
            )
            .await
            .unwrap();

        let overlapping = f
            .bookings
            .create_booking(
                f.host.id,
                request(f.property.id, day(2024, 6, 3), day(2024, 6, 6)),
            )
            .await;

        assert!(matches!(overlapping, Err(BookingError::DateConflict)));
    }

    #[tokio::test]
    async fn allows_booking_that_touches_existing_checkout() {
        let f = fixture().await;

        f.bookings
            .create_booking(
                f.guest.id,
                request(f.property.id, day(2024, 6, 1), day(2024, 6, 5)),
            )
            .await
            .unwrap();

        let touching = f
            .bookings
            .create_booking(
                f.guest.id,
                request(f.property.id, day(2024, 6, 5), day(2024, 6, 8)),
            )
            .await;

        assert!(touching.is_ok());
    }

    #[tokio::test]
    async fn cancelling_frees_the_range() {
        let f = fixture().await;

        let booking = f
            .bookings
            .create_booking(
                f.guest.id,
                request(f.property.id, day(2024, 6, 1), day(2024, 6, 5)),
            )
            .await
            .unwrap();

        f.bookings
            .cancel_booking(booking.id, Actor::from(&f.guest))
            .await
            .unwrap();

        let rebooked = f
            .bookings
            .create_booking(
                f.guest.id,
                request(f.property.id, day(2024, 6, 1), day(2024, 6, 5)),
            )
            .await;

        assert!(rebooked.is_ok());
    }

    #[tokio::test]
    async fn round_trips_booking_fields() {
        let f = fixture().await;

        let created = f
            .bookings
            .create_booking(
                f.guest.id,
                request(f.property.id, day(2024, 6, 1), day(2024, 6, 5)),
            )
            .await
            .unwrap();

        let fetched = f
            .bookings
            .booking_by_id(created.id, Actor::from(&f.guest))
            .await
            .unwrap();

        assert_eq!(fetched.booking, created);
        assert_eq!(fetched.property.unwrap().id, f.property.id);
    }

    #[tokio::test]
    async fn viewing_is_limited_to_booker_host_and_admin() {
        let f = fixture().await;
        let admin = admin(&f.db).await;

        let stranger = f
            .db
            .create_user(NewUser {
                username: "nils".to_string(),
                email: "nils@example.com".to_string(),
                password: "hash".to_string(),
                role: UserRole::Guest,
            })
            .await
            .unwrap();

        let booking = f
            .bookings
            .create_booking(
                f.guest.id,
                request(f.property.id, day(2024, 6, 1), day(2024, 6, 5)),
            )
            .await
            .unwrap();

        let by_stranger = f
            .bookings
            .booking_by_id(booking.id, Actor::from(&stranger))
            .await;

        assert!(matches!(by_stranger, Err(BookingError::Forbidden(_))));
        assert!(f
            .bookings
            .booking_by_id(booking.id, Actor::from(&f.host))
            .await
            .is_ok());
        assert!(f.bookings.booking_by_id(booking.id, admin).await.is_ok());
    }

    #[tokio::test]
    async fn host_cannot_cancel_but_admin_can() {
        let f = fixture().await;
        let admin = admin(&f.db).await;

        let booking = f
            .bookings
            .create_booking(
                f.guest.id,
                request(f.property.id, day(2024, 6, 1), day(2024, 6, 5)),
            )
            .await
            .unwrap();

        let by_host = f
            .bookings
            .cancel_booking(booking.id, Actor::from(&f.host))
            .await;

        assert!(matches!(by_host, Err(BookingError::Forbidden(_))));
        assert!(f.bookings.cancel_booking(booking.id, admin).await.is_ok());
    }

    #[tokio::test]
    async fn my_bookings_are_newest_first_with_property_snapshot() {
        let f = fixture().await;

        let first = f
            .bookings
            .create_booking(
                f.guest.id,
                request(f.property.id, day(2024, 6, 1), day(2024, 6, 5)),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;

        let second = f
            .bookings
            .create_booking(
                f.guest.id,
                request(f.property.id, day(2024, 7, 1), day(2024, 7, 3)),
            )
            .await
            .unwrap();

        let listed = f.bookings.my_bookings(f.guest.id).await.unwrap();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].booking.id, second.id);
        assert_eq!(listed[1].booking.id, first.id);
        assert!(listed.iter().all(|b| b.property.is_some()));
    }

    #[tokio::test]
    async fn host_bookings_are_sorted_by_start_date() {
        let f = fixture().await;

        let late = f
            .bookings
            .create_booking(
                f.guest.id,
                request(f.property.id, day(2024, 8, 1), day(2024, 8, 5)),
            )
            .await
            .unwrap();

        let early = f
            .bookings
            .create_booking(
                f.guest.id,
                request(f.property.id, day(2024, 6, 1), day(2024, 6, 5)),
            )
            .await
            .unwrap();

        let listed = f.bookings.host_bookings(f.host.id).await.unwrap();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].booking.id, late.id);
        assert_eq!(listed[1].booking.id, early.id);
        assert_eq!(listed[0].guest.as_ref().unwrap().id, f.guest.id);

        // A booking on someone else's property is not the host's business
        let other_guest_list = f.bookings.host_bookings(f.guest.id).await.unwrap();
        assert!(other_guest_list.is_empty());
    }

    #[tokio::test]
    async fn active_bookings_never_overlap() {
        let f = fixture().await;

        let ranges = [
            (day(2024, 6, 1), day(2024, 6, 5)),
            (day(2024, 6, 3), day(2024, 6, 6)),
            (day(2024, 6, 5), day(2024, 6, 8)),
            (day(2024, 6, 7), day(2024, 6, 9)),
            (day(2024, 5, 30), day(2024, 6, 2)),
        ];

        for (start, end) in ranges {
            let _ = f
                .bookings
                .create_booking(f.guest.id, request(f.property.id, start, end))
                .await;
        }

        let stored = f.db.bookings_for_user(f.guest.id).await.unwrap();

        for a in &stored {
            for b in &stored {
                if a.id != b.id {
                    assert!(!overlaps(a.start_date, a.end_date, b.start_date, b.end_date));
                }
            }
        }
    }
}
