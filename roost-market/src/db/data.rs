use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// The type used for primary keys in the database.
pub type PrimaryKey = Uuid;

/// A roost account
#[derive(Debug, Clone, PartialEq)]
pub struct UserData {
    pub id: PrimaryKey,
    pub username: String,
    /// Unique per account
    pub email: String,
    /// Argon2 hash, never the plain text
    pub password: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Guest,
    Host,
    Admin,
}

/// Login session data for authentication
#[derive(Debug, Clone)]
pub struct SessionData {
    pub id: PrimaryKey,
    /// The session token, or key if you will
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// The user that is logged in
    pub user: UserData,
}

/// A listed rental property
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyData {
    pub id: PrimaryKey,
    /// The user that listed and administers this property
    pub host_id: PrimaryKey,
    pub title: String,
    pub description: String,
    pub location: LocationData,
    /// Currency-agnostic unit per night, always positive
    pub price_per_night: Decimal,
    pub photos: Vec<String>,
    pub amenities: Vec<String>,
    pub max_guests: i32,
    pub kind: PropertyKind,
    /// Arithmetic mean of all stored reviews, 0 when there are none
    pub rating: f64,
    pub num_reviews: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocationData {
    pub address: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Apartment,
    House,
    Villa,
    Cabin,
    Hotel,
    Other,
}

/// A reservation of a property over a half-open `[start_date, end_date)` range
#[derive(Debug, Clone, PartialEq)]
pub struct BookingData {
    pub id: PrimaryKey,
    pub property_id: PrimaryKey,
    /// The user that made the booking
    pub user_id: PrimaryKey,
    pub start_date: NaiveDate,
    /// Checkout day, exclusive. Another booking may start on this day.
    pub end_date: NaiveDate,
    /// Derived at creation: nights × the property's price per night
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingData {
    /// The status as reported to callers. A confirmed booking whose checkout
    /// day has passed reads as completed; nothing is persisted for this.
    pub fn effective_status(&self, today: NaiveDate) -> BookingStatus {
        if self.status == BookingStatus::Confirmed && self.end_date <= today {
            BookingStatus::Completed
        } else {
            self.status
        }
    }
}

/// A guest's review of a property
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewData {
    pub id: PrimaryKey,
    pub user_id: PrimaryKey,
    pub property_id: PrimaryKey,
    /// Whole stars, 1 to 5
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}
