use std::sync::Arc;

use log::info;
use thiserror::Error;

use crate::{
    util::KeyedLocks, Actor, Database, DatabaseError, NewReview, PrimaryKey, ReviewData, UserData,
};

/// Creates and deletes reviews, and keeps each property's rating aggregate
/// consistent with its stored reviews.
pub struct ReviewManager<Db> {
    db: Arc<Db>,
    /// Serializes aggregate recomputation per property, so concurrent
    /// review mutations cannot interleave the read and the write-back.
    locks: KeyedLocks<PrimaryKey>,
}

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Rating must be between 1 and 5")]
    RatingOutOfRange,
    #[error("Review must have a comment")]
    EmptyComment,
    #[error("Not authorized")]
    Forbidden,
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

/// A review joined with a snapshot of its author.
/// The author is `None` when the account has since been deleted.
#[derive(Debug)]
pub struct ReviewWithAuthor {
    pub review: ReviewData,
    pub author: Option<UserData>,
}

/// The aggregate over a full review set: mean rating and count.
/// An empty set yields `(0.0, 0)`.
pub fn rating_summary(reviews: &[ReviewData]) -> (f64, i64) {
    let count = reviews.len() as i64;

    if count == 0 {
        return (0.0, 0);
    }

    let sum: i64 = reviews.iter().map(|r| i64::from(r.rating)).sum();
    (sum as f64 / count as f64, count)
}

impl<Db> ReviewManager<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self {
            db: db.clone(),
            locks: KeyedLocks::new(),
        }
    }

    /// Adds a review to an existing property and refreshes the property's
    /// aggregate. A user may review the same property more than once.
    pub async fn add_review(
        &self,
        user_id: PrimaryKey,
        new_review: NewReview,
    ) -> Result<ReviewData, ReviewError> {
        let property = self.db.property_by_id(new_review.property_id).await?;

        if !(1..=5).contains(&new_review.rating) {
            return Err(ReviewError::RatingOutOfRange);
        }

        if new_review.comment.trim().is_empty() {
            return Err(ReviewError::EmptyComment);
        }

        let review = self
            .db
            .create_review(NewReview {
                user_id,
                ..new_review
            })
            .await?;

        self.refresh_rating(property.id).await?;

        info!(
            "User {} rated property {} at {}",
            user_id, property.id, review.rating
        );

        Ok(review)
    }

    /// Deletes a review, allowed for its author or an admin, and refreshes
    /// the property's aggregate. When the last review goes, the aggregate
    /// resets to zero.
    pub async fn delete_review(
        &self,
        review_id: PrimaryKey,
        actor: Actor,
    ) -> Result<(), ReviewError> {
        let review = self.db.review_by_id(review_id).await?;

        if review.user_id != actor.id && !actor.is_admin() {
            return Err(ReviewError::Forbidden);
        }

        self.db.delete_review(review_id).await?;
        self.refresh_rating(review.property_id).await?;

        Ok(())
    }

    /// All reviews for a property, newest first, with author snapshots
    pub async fn reviews_for_property(
        &self,
        property_id: PrimaryKey,
    ) -> Result<Vec<ReviewWithAuthor>, ReviewError> {
        let reviews = self.db.reviews_for_property(property_id).await?;

        let mut result = Vec::with_capacity(reviews.len());
        for review in reviews {
            let author = self.db.user_by_id(review.user_id).await.ok();
            result.push(ReviewWithAuthor { review, author });
        }

        Ok(result)
    }

    /// Recomputes the aggregate from the full review set and writes it
    /// back, holding the property's lock across both steps.
    async fn refresh_rating(&self, property_id: PrimaryKey) -> Result<(), DatabaseError> {
        let lock = self.locks.get(property_id);
        let _guard = lock.lock().await;

        let reviews = self.db.reviews_for_property(property_id).await?;
        let (rating, num_reviews) = rating_summary(&reviews);

        self.db
            .set_property_rating(property_id, rating, num_reviews)
            .await
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::*;
    use crate::{
        LocationData, MemoryDatabase, NewProperty, NewUser, PropertyData, PropertyKind, UserRole,
    };

    struct Fixture {
        db: Arc<MemoryDatabase>,
        reviews: ReviewManager<MemoryDatabase>,
        reviewer: UserData,
        property: PropertyData,
    }

    async fn fixture() -> Fixture {
        let db = Arc::new(MemoryDatabase::new());
        let reviews = ReviewManager::new(&db);

        let host = db
            .create_user(NewUser {
                username: "marta".to_string(),
                email: "marta@example.com".to_string(),
                password: "hash".to_string(),
                role: UserRole::Host,
            })
            .await
            .unwrap();

        let reviewer = db
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
                title: "Old town flat".to_string(),
                description: "A flat in the old town".to_string(),
                location: LocationData {
                    city: "Visby".to_string(),
                    country: "Sweden".to_string(),
                    ..Default::default()
                },
                price_per_night: Decimal::from(700),
                photos: vec![],
                amenities: vec![],
                max_guests: 2,
                kind: PropertyKind::Apartment,
            })
            .await
            .unwrap();

        Fixture {
            db,
            reviews,
            reviewer,
            property,
        }
    }

    fn new_review(property_id: PrimaryKey, rating: i32) -> NewReview {
        NewReview {
            user_id: Uuid::nil(),
            property_id,
            rating,
            comment: "A fine stay".to_string(),
        }
    }

    #[test]
    fn summary_of_empty_set_is_zero() {
        assert_eq!(rating_summary(&[]), (0.0, 0));
    }

    #[tokio::test]
    async fn aggregate_tracks_added_reviews() {
        let f = fixture().await;

        for rating in [5, 3, 4] {
            f.reviews
                .add_review(f.reviewer.id, new_review(f.property.id, rating))
                .await
                .unwrap();
        }

        let property = f.db.property_by_id(f.property.id).await.unwrap();

        assert_eq!(property.num_reviews, 3);
        assert_eq!(property.rating, 4.0);
    }

    #[tokio::test]
    async fn aggregate_tracks_deleted_reviews() {
        let f = fixture().await;
        let mut created = vec![];

        for rating in [5, 3, 4] {
            created.push(
                f.reviews
                    .add_review(f.reviewer.id, new_review(f.property.id, rating))
                    .await
                    .unwrap(),
            );
        }

        let middle = created.iter().find(|r| r.rating == 3).unwrap();

        f.reviews
            .delete_review(middle.id, Actor::from(&f.reviewer))
            .await
            .unwrap();

        let property = f.db.property_by_id(f.property.id).await.unwrap();
        assert_eq!(property.num_reviews, 2);
        assert_eq!(property.rating, 4.5);

        for review in created.iter().filter(|r| r.rating != 3) {
            f.reviews
                .delete_review(review.id, Actor::from(&f.reviewer))
                .await
                .unwrap();
        }

        let property = f.db.property_by_id(f.property.id).await.unwrap();
        assert_eq!(property.num_reviews, 0);
        assert_eq!(property.rating, 0.0);
    }

    #[tokio::test]
    async fn rejects_out_of_range_rating_and_empty_comment() {
        let f = fixture().await;

        for rating in [0, 6, -1] {
            let result = f
                .reviews
                .add_review(f.reviewer.id, new_review(f.property.id, rating))
                .await;

            assert!(matches!(result, Err(ReviewError::RatingOutOfRange)));
        }

        let empty = f
            .reviews
            .add_review(
                f.reviewer.id,
                NewReview {
                    comment: "  ".to_string(),
                    ..new_review(f.property.id, 4)
                },
            )
            .await;

        assert!(matches!(empty, Err(ReviewError::EmptyComment)));
    }

    #[tokio::test]
    async fn rejects_review_for_missing_property() {
        let f = fixture().await;

        let result = f
            .reviews
            .add_review(f.reviewer.id, new_review(Uuid::new_v4(), 4))
            .await;

        assert!(matches!(
            result,
            Err(ReviewError::Db(DatabaseError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn deletion_is_limited_to_author_and_admin() {
        let f = fixture().await;

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

        let admin = f
            .db
            .create_user(NewUser {
                username: "root".to_string(),
                email: "admin@example.com".to_string(),
                password: "hash".to_string(),
                role: UserRole::Admin,
            })
            .await
            .unwrap();

        let review = f
            .reviews
            .add_review(f.reviewer.id, new_review(f.property.id, 5))
            .await
            .unwrap();

        let by_stranger = f
            .reviews
            .delete_review(review.id, Actor::from(&stranger))
            .await;

        assert!(matches!(by_stranger, Err(ReviewError::Forbidden)));
        assert!(f
            .reviews
            .delete_review(review.id, Actor::from(&admin))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn multiple_reviews_per_user_are_allowed() {
        let f = fixture().await;

        for rating in [2, 4] {
            f.reviews
                .add_review(f.reviewer.id, new_review(f.property.id, rating))
                .await
                .unwrap();
        }

        let listed = f.reviews.reviews_for_property(f.property.id).await.unwrap();

        assert_eq!(listed.len(), 2);
        assert!(listed
            .iter()
            .all(|r| r.author.as_ref().unwrap().id == f.reviewer.id));
    }
}
