use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;
pub type BoxedDatabase = Box<dyn Database>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(e) => match e {
                DatabaseError::NotFound {
                    resource: _,
                    identifier: _,
                } => Ok(()),
                e => Err(e),
            },
        }
    }
}

/// Represents a type that can fetch roost data from a database
#[async_trait]
pub trait Database: Send + Sync + 'static {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData>;
    async fn user_by_email(&self, email: &str) -> Result<UserData>;
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;
    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData>;
    async fn update_user_password(&self, user_id: PrimaryKey, password: String) -> Result<()>;

    async fn session_by_token(&self, token: &str) -> Result<SessionData>;
    async fn create_session(&self, new_session: NewSession) -> Result<SessionData>;
    async fn delete_session_by_token(&self, token: &str) -> Result<()>;
    async fn clear_expired_sessions(&self) -> Result<()>;

    async fn property_by_id(&self, property_id: PrimaryKey) -> Result<PropertyData>;
    /// Filtered listing, newest first
    async fn list_properties(&self, filter: PropertyFilter) -> Result<Vec<PropertyData>>;
    async fn create_property(&self, new_property: NewProperty) -> Result<PropertyData>;
    async fn update_property(&self, updated_property: UpdatedProperty) -> Result<PropertyData>;
    /// Deletes the property along with every booking that references it,
    /// as one atomic step. Reviews are left in place.
    async fn delete_property(&self, property_id: PrimaryKey) -> Result<()>;
    /// Writes the review aggregate onto the property. A no-op if the
    /// property no longer exists.
    async fn set_property_rating(
        &self,
        property_id: PrimaryKey,
        rating: f64,
        num_reviews: i64,
    ) -> Result<()>;

    async fn booking_by_id(&self, booking_id: PrimaryKey) -> Result<BookingData>;
    /// All bookings made by the user, newest created first
    async fn bookings_for_user(&self, user_id: PrimaryKey) -> Result<Vec<BookingData>>;
    /// All bookings across every property the host owns, newest start date first
    async fn bookings_for_host(&self, host_id: PrimaryKey) -> Result<Vec<BookingData>>;
    /// True if a booking with status other than cancelled intersects the
    /// half-open `[start_date, end_date)` range on this property
    async fn booking_conflict_exists(
        &self,
        property_id: PrimaryKey,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<bool>;
    async fn create_booking(&self, new_booking: NewBooking) -> Result<BookingData>;
    async fn delete_booking(&self, booking_id: PrimaryKey) -> Result<()>;

    async fn review_by_id(&self, review_id: PrimaryKey) -> Result<ReviewData>;
    /// All reviews for the property, newest created first
    async fn reviews_for_property(&self, property_id: PrimaryKey) -> Result<Vec<ReviewData>>;
    async fn create_review(&self, new_review: NewReview) -> Result<ReviewData>;
    async fn delete_review(&self, review_id: PrimaryKey) -> Result<()>;

    /// The user's saved property ids, oldest entry first
    async fn wishlist_property_ids(&self, user_id: PrimaryKey) -> Result<Vec<PrimaryKey>>;
    /// Set-insert. Adding an id that is already present is a no-op success.
    /// Returns the updated id set.
    async fn add_wishlist_entry(
        &self,
        user_id: PrimaryKey,
        property_id: PrimaryKey,
    ) -> Result<Vec<PrimaryKey>>;
    /// Set-removal. Removing an absent id is a no-op success.
    /// Returns the updated id set.
    async fn remove_wishlist_entry(
        &self,
        user_id: PrimaryKey,
        property_id: PrimaryKey,
    ) -> Result<Vec<PrimaryKey>>;
}

#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

#[derive(Debug, Default)]
pub struct UpdatedUser {
    pub id: PrimaryKey,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Debug)]
pub struct NewSession {
    pub token: String,
    pub user_id: PrimaryKey,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewProperty {
    /// The host listing the property
    pub host_id: PrimaryKey,
    pub title: String,
    pub description: String,
    pub location: LocationData,
    pub price_per_night: Decimal,
    pub photos: Vec<String>,
    pub amenities: Vec<String>,
    pub max_guests: i32,
    pub kind: PropertyKind,
}

#[derive(Debug, Default)]
pub struct UpdatedProperty {
    pub id: PrimaryKey,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<LocationData>,
    pub price_per_night: Option<Decimal>,
    pub photos: Option<Vec<String>>,
    pub amenities: Option<Vec<String>>,
    pub max_guests: Option<i32>,
    pub kind: Option<PropertyKind>,
}

/// Listing filter. All fields are conjunctive; `None` means "any".
#[derive(Debug, Default)]
pub struct PropertyFilter {
    pub city: Option<String>,
    pub country: Option<String>,
    pub kind: Option<PropertyKind>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Case-insensitive substring match on the title
    pub search: Option<String>,
}

#[derive(Debug)]
pub struct NewBooking {
    pub property_id: PrimaryKey,
    pub user_id: PrimaryKey,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: Decimal,
    pub status: BookingStatus,
}

#[derive(Debug)]
pub struct NewReview {
    pub user_id: PrimaryKey,
    pub property_id: PrimaryKey,
    pub rating: i32,
    pub comment: String,
}
