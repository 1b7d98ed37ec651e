use axum::{
    extract::{Path, State},
    routing::{delete, post},
    Json,
};
use roost_market::NewReview;
use uuid::Uuid;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{NewReviewSchema, ValidatedJson},
    serialized::{success, ApiResponse, Review, ToSerialized},
    Router,
};

#[utoipa::path(
    post,
    path = "/v1/reviews",
    tag = "reviews",
    request_body = NewReviewSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Review),
        (status = 400, description = "Rating out of range or empty comment"),
        (status = 404, description = "Property does not exist")
    )
)]
async fn create_review(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewReviewSchema>,
) -> ServerResult<Json<ApiResponse<Review>>> {
    let user_id = session.user().id;

    let review = context
        .market
        .reviews
        .add_review(
            user_id,
            NewReview {
                user_id,
                property_id: body.property_id,
                rating: body.rating,
                comment: body.comment,
            },
        )
        .await?;

    Ok(success(review.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/reviews/{id}",
    tag = "reviews",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Review was deleted and the property rating refreshed"),
        (status = 403, description = "Requester is not the author or an admin"),
        (status = 404, description = "Review does not exist")
    )
)]
async fn delete_review(
    session: Session,
    State(context): State<ServerContext>,
    Path(review_id): Path<Uuid>,
) -> ServerResult<Json<ApiResponse<()>>> {
    context
        .market
        .reviews
        .delete_review(review_id, session.actor())
        .await?;

    Ok(success(()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_review))
        .route("/:id", delete(delete_review))
}
