use std::sync::Arc;

use crate::{Database, DatabaseError, PrimaryKey, PropertyData};

/// Maintains each user's set of saved properties. Mutations are idempotent
/// set operations.
pub struct WishlistManager<Db> {
    db: Arc<Db>,
}

impl<Db> WishlistManager<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self { db: db.clone() }
    }

    /// Saves a property. Saving one that is already on the list is a no-op
    /// success. Returns the updated id set.
    pub async fn add(
        &self,
        user_id: PrimaryKey,
        property_id: PrimaryKey,
    ) -> Result<Vec<PrimaryKey>, DatabaseError> {
        // The property must exist at save time, though it may go away later
        let _ = self.db.property_by_id(property_id).await?;

        self.db.add_wishlist_entry(user_id, property_id).await
    }

    /// Removes a property from the list. Removing one that isn't on it is a
    /// no-op success. Returns the updated id set.
    pub async fn remove(
        &self,
        user_id: PrimaryKey,
        property_id: PrimaryKey,
    ) -> Result<Vec<PrimaryKey>, DatabaseError> {
        self.db.remove_wishlist_entry(user_id, property_id).await
    }

    /// The saved properties with their details joined in. Entries whose
    /// property has been deleted are silently dropped.
    pub async fn list(&self, user_id: PrimaryKey) -> Result<Vec<PropertyData>, DatabaseError> {
        let ids = self.db.wishlist_property_ids(user_id).await?;

        let mut properties = Vec::with_capacity(ids.len());
        for id in ids {
            if let Ok(property) = self.db.property_by_id(id).await {
                properties.push(property);
            }
        }

        Ok(properties)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::{
        LocationData, MemoryDatabase, NewProperty, NewUser, PropertyKind, UserData, UserRole,
    };

    async fn seed_property(db: &Arc<MemoryDatabase>, host: &UserData, title: &str) -> PropertyData {
        db.create_property(NewProperty {
            host_id: host.id,
            title: title.to_string(),
            description: "A place to stay".to_string(),
            location: LocationData {
                city: "Visby".to_string(),
                country: "Sweden".to_string(),
                ..Default::default()
            },
            price_per_night: Decimal::from(500),
            photos: vec![],
            amenities: vec![],
            max_guests: 2,
            kind: PropertyKind::House,
        })
        .await
        .unwrap()
    }

    async fn fixture() -> (
        Arc<MemoryDatabase>,
        WishlistManager<MemoryDatabase>,
        UserData,
        PropertyData,
    ) {
        let db = Arc::new(MemoryDatabase::new());
        let wishlist = WishlistManager::new(&db);

        let user = db
            .create_user(NewUser {
                username: "jonas".to_string(),
                email: "jonas@example.com".to_string(),
                password: "hash".to_string(),
                role: UserRole::Guest,
            })
            .await
            .unwrap();

        let property = seed_property(&db, &user, "Seaside cabin").await;

        (db, wishlist, user, property)
    }

    #[tokio::test]
    async fn adding_twice_keeps_a_single_entry() {
        let (_db, wishlist, user, property) = fixture().await;

        wishlist.add(user.id, property.id).await.unwrap();
        let ids = wishlist.add(user.id, property.id).await.unwrap();

        assert_eq!(ids, vec![property.id]);
    }

    #[tokio::test]
    async fn removing_an_absent_entry_is_a_noop_success() {
        let (_db, wishlist, user, property) = fixture().await;

        let ids = wishlist.remove(user.id, property.id).await.unwrap();

        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn rejects_adding_a_missing_property() {
        let (_db, wishlist, user, _property) = fixture().await;

        let result = wishlist.add(user.id, uuid::Uuid::new_v4()).await;

        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn listing_filters_out_deleted_properties() {
        let (db, wishlist, user, property) = fixture().await;
        let second = seed_property(&db, &user, "Old town flat").await;

        wishlist.add(user.id, property.id).await.unwrap();
        wishlist.add(user.id, second.id).await.unwrap();

        db.delete_property(property.id).await.unwrap();

        let listed = wishlist.list(user.id).await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, second.id);
    }
}
