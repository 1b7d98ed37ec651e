use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, patch, post},
    Json,
};
use roost_market::{
    LocationData, NewProperty, PropertyFilter, UpdatedProperty,
};
use uuid::Uuid;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{
        LocationSchema, NewPropertySchema, PropertyFilterQuery, UpdatePropertySchema,
        ValidatedJson,
    },
    serialized::{success, ApiResponse, Property, Review, ToSerialized},
    Router,
};

fn into_location(schema: LocationSchema) -> LocationData {
    LocationData {
        address: schema.address,
        city: schema.city,
        state: schema.state,
        country: schema.country,
        latitude: schema.lat,
        longitude: schema.lng,
    }
}

#[utoipa::path(
    get,
    path = "/v1/properties",
    tag = "properties",
    params(PropertyFilterQuery),
    responses(
        (status = 200, body = Vec<Property>)
    )
)]
async fn list_properties(
    State(context): State<ServerContext>,
    Query(filter): Query<PropertyFilterQuery>,
) -> ServerResult<Json<ApiResponse<Vec<Property>>>> {
    let properties = context
        .market
        .properties
        .search(PropertyFilter {
            city: filter.city,
            country: filter.country,
            kind: filter.kind,
            min_price: filter.min_price,
            max_price: filter.max_price,
            search: filter.search,
        })
        .await?;

    Ok(success(properties.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/properties/{id}",
    tag = "properties",
    responses(
        (status = 200, body = Property),
        (status = 404, description = "Property does not exist")
    )
)]
async fn property(
    State(context): State<ServerContext>,
    Path(property_id): Path<Uuid>,
) -> ServerResult<Json<ApiResponse<Property>>> {
    let property = context.market.properties.property_by_id(property_id).await?;

    Ok(success(property.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/properties",
    tag = "properties",
    request_body = NewPropertySchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Property)
    )
)]
async fn create_property(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewPropertySchema>,
) -> ServerResult<Json<ApiResponse<Property>>> {
    let host_id = session.user().id;

    let property = context
        .market
        .properties
        .create_property(
            host_id,
            NewProperty {
                host_id,
                title: body.title,
                description: body.description,
                location: into_location(body.location),
                price_per_night: body.price_per_night,
                photos: body.photos,
                amenities: body.amenities,
                max_guests: body.max_guests,
                kind: body.kind,
            },
        )
        .await?;

    Ok(success(property.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/v1/properties/{id}",
    tag = "properties",
    request_body = UpdatePropertySchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Property),
        (status = 403, description = "Requester is not the host or an admin")
    )
)]
async fn update_property(
    session: Session,
    State(context): State<ServerContext>,
    Path(property_id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<UpdatePropertySchema>,
) -> ServerResult<Json<ApiResponse<Property>>> {
    let property = context
        .market
        .properties
        .update_property(
            session.actor(),
            UpdatedProperty {
                id: property_id,
                title: body.title,
                description: body.description,
                location: body.location.map(into_location),
                price_per_night: body.price_per_night,
                photos: body.photos,
                amenities: body.amenities,
                max_guests: body.max_guests,
                kind: body.kind,
            },
        )
        .await?;

    Ok(success(property.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/properties/{id}",
    tag = "properties",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Property and its bookings were deleted"),
        (status = 403, description = "Requester is not the host or an admin")
    )
)]
async fn delete_property(
    session: Session,
    State(context): State<ServerContext>,
    Path(property_id): Path<Uuid>,
) -> ServerResult<Json<ApiResponse<()>>> {
    context
        .market
        .properties
        .delete_property(property_id, session.actor())
        .await?;

    Ok(success(()))
}

#[utoipa::path(
    get,
    path = "/v1/properties/{id}/reviews",
    tag = "properties",
    responses(
        (status = 200, body = Vec<Review>)
    )
)]
async fn property_reviews(
    State(context): State<ServerContext>,
    Path(property_id): Path<Uuid>,
) -> ServerResult<Json<ApiResponse<Vec<Review>>>> {
    let reviews = context
        .market
        .reviews
        .reviews_for_property(property_id)
        .await?;

    Ok(success(reviews.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_properties))
        .route("/", post(create_property))
        .route("/:id", get(property))
        .route("/:id", patch(update_property))
        .route("/:id", delete(delete_property))
        .route("/:id/reviews", get(property_reviews))
}
