use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use chrono::NaiveDate;
use roost_market::{PropertyKind, UserRole};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::errors::ServerError;

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterSchema {
    #[validate(length(min = 2, max = 128))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 64))]
    pub password: String,
    #[schema(value_type = Option<String>)]
    pub role: Option<UserRole>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginSchema {
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 64))]
    pub password: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProfileSchema {
    #[validate(length(min = 2, max = 128))]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePasswordSchema {
    #[validate(length(max = 64))]
    pub current_password: String,
    #[validate(length(min = 8, max = 64))]
    pub new_password: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LocationSchema {
    pub address: Option<String>,
    #[validate(length(min = 1))]
    pub city: String,
    pub state: Option<String>,
    #[validate(length(min = 1))]
    pub country: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewPropertySchema {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(nested)]
    pub location: LocationSchema,
    #[schema(value_type = f64)]
    pub price_per_night: Decimal,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[validate(range(min = 1))]
    pub max_guests: i32,
    #[schema(value_type = String)]
    pub kind: PropertyKind,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePropertySchema {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    #[validate(nested)]
    pub location: Option<LocationSchema>,
    #[schema(value_type = Option<f64>)]
    pub price_per_night: Option<Decimal>,
    pub photos: Option<Vec<String>>,
    pub amenities: Option<Vec<String>>,
    #[validate(range(min = 1))]
    pub max_guests: Option<i32>,
    #[schema(value_type = Option<String>)]
    pub kind: Option<PropertyKind>,
}

#[derive(Debug, IntoParams, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[into_params(parameter_in = Query)]
pub struct PropertyFilterQuery {
    pub city: Option<String>,
    pub country: Option<String>,
    #[param(value_type = Option<String>)]
    pub kind: Option<PropertyKind>,
    #[param(value_type = Option<f64>)]
    pub min_price: Option<Decimal>,
    #[param(value_type = Option<f64>)]
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewBookingSchema {
    pub property_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewReviewSchema {
    pub property_id: Uuid,
    pub rating: i32,
    pub comment: String,
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ServerError::Validation(e.to_string()))?;

        value
            .validate()
            .map_err(|e| ServerError::Validation(e.to_string()))?;

        Ok(Self(value))
    }
}
