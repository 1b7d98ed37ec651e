use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde_json::json;
use thiserror::Error;
use roost_market::{AuthError, BookingError, DatabaseError, PropertyError, ReviewError};

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    Validation(String),
    #[error("Property is already booked for these dates")]
    DateConflict,
    #[error("Incorrect email or password")]
    InvalidCredentials,
    #[error("{0}")]
    Unauthenticated(&'static str),
    #[error("{0}")]
    Forbidden(String),
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::DateConflict => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound {
                resource: _,
                identifier: _,
            } => StatusCode::NOT_FOUND,
            Self::Conflict {
                resource: _,
                field: _,
                value: _,
            } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.as_status_code();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("{self}");
        }

        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource,
                identifier,
            } => Self::NotFound {
                resource,
                identifier,
            },
            DatabaseError::Conflict {
                resource,
                field,
                value,
            } => Self::Conflict {
                resource,
                field,
                value,
            },
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::WrongPassword => Self::Validation(value.to_string()),
            AuthError::Db(e) => e.into(),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<BookingError> for ServerError {
    fn from(value: BookingError) -> Self {
        match value {
            BookingError::InvalidRange => Self::Validation(value.to_string()),
            BookingError::DateConflict => Self::DateConflict,
            BookingError::Forbidden(message) => Self::Forbidden(message.to_string()),
            BookingError::Db(e) => e.into(),
        }
    }
}

impl From<ReviewError> for ServerError {
    fn from(value: ReviewError) -> Self {
        match value {
            ReviewError::RatingOutOfRange | ReviewError::EmptyComment => {
                Self::Validation(value.to_string())
            }
            ReviewError::Forbidden => Self::Forbidden(value.to_string()),
            ReviewError::Db(e) => e.into(),
        }
    }
}

impl From<PropertyError> for ServerError {
    fn from(value: PropertyError) -> Self {
        match value {
            PropertyError::InvalidPrice => Self::Validation(value.to_string()),
            PropertyError::Forbidden(message) => Self::Forbidden(message.to_string()),
            PropertyError::Db(e) => e.into(),
        }
    }
}
