use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json,
};
use uuid::Uuid;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    serialized::{success, ApiResponse, Property, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/wishlist",
    tag = "wishlist",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Property>)
    )
)]
async fn list_wishlist(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<ApiResponse<Vec<Property>>>> {
    let properties = context.market.wishlist.list(session.user().id).await?;

    Ok(success(properties.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/wishlist/{propertyId}",
    tag = "wishlist",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Uuid>),
        (status = 404, description = "Property does not exist")
    )
)]
async fn add_to_wishlist(
    session: Session,
    State(context): State<ServerContext>,
    Path(property_id): Path<Uuid>,
) -> ServerResult<Json<ApiResponse<Vec<Uuid>>>> {
    let wishlist = context
        .market
        .wishlist
        .add(session.user().id, property_id)
        .await?;

    Ok(success(wishlist))
}

#[utoipa::path(
    delete,
    path = "/v1/wishlist/{propertyId}",
    tag = "wishlist",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Uuid>)
    )
)]
async fn remove_from_wishlist(
    session: Session,
    State(context): State<ServerContext>,
    Path(property_id): Path<Uuid>,
) -> ServerResult<Json<ApiResponse<Vec<Uuid>>>> {
    let wishlist = context
        .market
        .wishlist
        .remove(session.user().id, property_id)
        .await?;

    Ok(success(wishlist))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_wishlist))
        .route("/:property_id", post(add_to_wishlist))
        .route("/:property_id", delete(remove_from_wishlist))
}
