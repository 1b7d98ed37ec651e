use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json,
};
use roost_market::BookingRequest;
use uuid::Uuid;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{NewBookingSchema, ValidatedJson},
    serialized::{success, ApiResponse, Booking, ToSerialized},
    Router,
};

#[utoipa::path(
    post,
    path = "/v1/bookings",
    tag = "bookings",
    request_body = NewBookingSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Booking),
        (status = 400, description = "Invalid range or dates already booked")
    )
)]
async fn create_booking(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewBookingSchema>,
) -> ServerResult<Json<ApiResponse<Booking>>> {
    let booking = context
        .market
        .bookings
        .create_booking(
            session.user().id,
            BookingRequest {
                property_id: body.property_id,
                start_date: body.start_date,
                end_date: body.end_date,
            },
        )
        .await?;

    Ok(success(booking.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/bookings/my-bookings",
    tag = "bookings",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Booking>)
    )
)]
async fn my_bookings(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<ApiResponse<Vec<Booking>>>> {
    let bookings = context.market.bookings.my_bookings(session.user().id).await?;

    Ok(success(bookings.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/bookings/host-bookings",
    tag = "bookings",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Booking>)
    )
)]
async fn host_bookings(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<ApiResponse<Vec<Booking>>>> {
    let bookings = context
        .market
        .bookings
        .host_bookings(session.user().id)
        .await?;

    Ok(success(bookings.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/bookings/{id}",
    tag = "bookings",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Booking),
        (status = 403, description = "Requester is not the booker, the host, or an admin"),
        (status = 404, description = "Booking does not exist")
    )
)]
async fn booking(
    session: Session,
    State(context): State<ServerContext>,
    Path(booking_id): Path<Uuid>,
) -> ServerResult<Json<ApiResponse<Booking>>> {
    let booking = context
        .market
        .bookings
        .booking_by_id(booking_id, session.actor())
        .await?;

    Ok(success(booking.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/bookings/{id}",
    tag = "bookings",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Booking was cancelled and its dates freed"),
        (status = 403, description = "Requester is not the booker or an admin"),
        (status = 404, description = "Booking does not exist")
    )
)]
async fn cancel_booking(
    session: Session,
    State(context): State<ServerContext>,
    Path(booking_id): Path<Uuid>,
) -> ServerResult<Json<ApiResponse<()>>> {
    context
        .market
        .bookings
        .cancel_booking(booking_id, session.actor())
        .await?;

    Ok(success(()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_booking))
        .route("/my-bookings", get(my_bookings))
        .route("/host-bookings", get(host_bookings))
        .route("/:id", get(booking))
        .route("/:id", delete(cancel_booking))
}
