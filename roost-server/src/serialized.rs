//! All schemas that are exposed from endpoints are defined here
//! along with the [ToSerialized] impls that build them

use axum::Json;
use chrono::{DateTime, Utc};
use roost_market::{
    BookingData, BookingWithProperty, HostBooking, LocationData, PropertyData, ReviewData,
    ReviewWithAuthor, SessionData, UserData,
};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// The envelope every successful endpoint responds with
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn success<T>(data: T) -> Json<ApiResponse<T>>
where
    T: Serialize,
{
    Json(ApiResponse {
        success: true,
        data,
    })
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub address: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub country: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: Uuid,
    pub host_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: Location,
    #[schema(value_type = String)]
    pub price_per_night: Decimal,
    pub photos: Vec<String>,
    pub amenities: Vec<String>,
    pub max_guests: i32,
    pub kind: String,
    pub rating: f64,
    pub num_reviews: i64,
    pub created_at: DateTime<Utc>,
}

/// The slice of a property that booking listings carry along
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PropertySummary {
    pub id: Uuid,
    pub title: String,
    pub photos: Vec<String>,
    pub location: Location,
    #[schema(value_type = String)]
    pub price_per_night: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub property_id: Uuid,
    pub user_id: Uuid,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    #[schema(value_type = String)]
    pub total_price: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<PropertySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest: Option<User>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub property_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub author: Option<User>,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role.to_string(),
            phone: self.phone.clone(),
            profile_picture: self.profile_picture.clone(),
        }
    }
}

impl ToSerialized<LoginResult> for SessionData {
    fn to_serialized(&self) -> LoginResult {
        LoginResult {
            token: self.token.clone(),
            user: self.user.to_serialized(),
        }
    }
}

impl ToSerialized<Location> for LocationData {
    fn to_serialized(&self) -> Location {
        Location {
            address: self.address.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            country: self.country.clone(),
            lat: self.latitude,
            lng: self.longitude,
        }
    }
}

impl ToSerialized<Property> for PropertyData {
    fn to_serialized(&self) -> Property {
        Property {
            id: self.id,
            host_id: self.host_id,
            title: self.title.clone(),
            description: self.description.clone(),
            location: self.location.to_serialized(),
            price_per_night: self.price_per_night,
            photos: self.photos.clone(),
            amenities: self.amenities.clone(),
            max_guests: self.max_guests,
            kind: self.kind.to_string(),
            rating: self.rating,
            num_reviews: self.num_reviews,
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<PropertySummary> for PropertyData {
    fn to_serialized(&self) -> PropertySummary {
        PropertySummary {
            id: self.id,
            title: self.title.clone(),
            photos: self.photos.clone(),
            location: self.location.to_serialized(),
            price_per_night: self.price_per_night,
        }
    }
}

impl ToSerialized<Booking> for BookingData {
    fn to_serialized(&self) -> Booking {
        Booking {
            id: self.id,
            property_id: self.property_id,
            user_id: self.user_id,
            start_date: self.start_date,
            end_date: self.end_date,
            total_price: self.total_price,
            status: self.effective_status(Utc::now().date_naive()).to_string(),
            created_at: self.created_at,
            property: None,
            guest: None,
        }
    }
}

impl ToSerialized<Booking> for BookingWithProperty {
    fn to_serialized(&self) -> Booking {
        Booking {
            property: self.property.as_ref().map(|p| p.to_serialized()),
            ..self.booking.to_serialized()
        }
    }
}

impl ToSerialized<Booking> for HostBooking {
    fn to_serialized(&self) -> Booking {
        Booking {
            property: self.property.as_ref().map(|p| p.to_serialized()),
            guest: self.guest.as_ref().map(|g| g.to_serialized()),
            ..self.booking.to_serialized()
        }
    }
}

impl ToSerialized<Review> for ReviewData {
    fn to_serialized(&self) -> Review {
        Review {
            id: self.id,
            property_id: self.property_id,
            rating: self.rating,
            comment: self.comment.clone(),
            created_at: self.created_at,
            author: None,
        }
    }
}

impl ToSerialized<Review> for ReviewWithAuthor {
    fn to_serialized(&self) -> Review {
        Review {
            author: self.author.as_ref().map(|a| a.to_serialized()),
            ..self.review.to_serialized()
        }
    }
}
