use std::sync::Arc;

use log::info;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    Actor, Database, DatabaseError, NewProperty, PrimaryKey, PropertyData, PropertyFilter,
    UpdatedProperty,
};

/// Manages property listings: creation, filtered search, and host/admin
/// mutations.
pub struct PropertyManager<Db> {
    db: Arc<Db>,
}

#[derive(Debug, Error)]
pub enum PropertyError {
    #[error("Price per night must be positive")]
    InvalidPrice,
    #[error("{0}")]
    Forbidden(&'static str),
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

impl<Db> PropertyManager<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self { db: db.clone() }
    }

    /// Lists a new property with the actor as its host
    pub async fn create_property(
        &self,
        host_id: PrimaryKey,
        new_property: NewProperty,
    ) -> Result<PropertyData, PropertyError> {
        if new_property.price_per_night <= Decimal::ZERO {
            return Err(PropertyError::InvalidPrice);
        }

        let property = self
            .db
            .create_property(NewProperty {
                host_id,
                ..new_property
            })
            .await?;

        info!("User {} listed property {}", host_id, property.id);
        Ok(property)
    }

    pub async fn property_by_id(
        &self,
        property_id: PrimaryKey,
    ) -> Result<PropertyData, PropertyError> {
        Ok(self.db.property_by_id(property_id).await?)
    }

    /// Filtered listing, newest first
    pub async fn search(&self, filter: PropertyFilter) -> Result<Vec<PropertyData>, PropertyError> {
        Ok(self.db.list_properties(filter).await?)
    }

    /// Updates a property, allowed for its host or an admin
    pub async fn update_property(
        &self,
        actor: Actor,
        updated_property: UpdatedProperty,
    ) -> Result<PropertyData, PropertyError> {
        let property = self.db.property_by_id(updated_property.id).await?;

        if property.host_id != actor.id && !actor.is_admin() {
            return Err(PropertyError::Forbidden(
                "You do not have permission to update this property",
            ));
        }

        if let Some(price) = updated_property.price_per_night {
            if price <= Decimal::ZERO {
                return Err(PropertyError::InvalidPrice);
            }
        }

        Ok(self.db.update_property(updated_property).await?)
    }

    /// Deletes a property, allowed for its host or an admin. Every booking
    /// that references it goes with it; reviews are kept.
    pub async fn delete_property(
        &self,
        property_id: PrimaryKey,
        actor: Actor,
    ) -> Result<(), PropertyError> {
        let property = self.db.property_by_id(property_id).await?;

        if property.host_id != actor.id && !actor.is_admin() {
            return Err(PropertyError::Forbidden(
                "You do not have permission to delete this property",
            ));
        }

        self.db.delete_property(property_id).await?;

        info!("User {} deleted property {}", actor.id, property_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        BookingStatus, LocationData, MemoryDatabase, NewBooking, NewUser, PropertyKind, UserData,
        UserRole,
    };

    async fn seed_user(db: &Arc<MemoryDatabase>, email: &str, role: UserRole) -> UserData {
        db.create_user(NewUser {
            username: email.split('@').next().unwrap().to_string(),
            email: email.to_string(),
            password: "hash".to_string(),
            role,
        })
        .await
        .unwrap()
    }

    fn new_property(host_id: PrimaryKey, title: &str, price: i64) -> NewProperty {
        NewProperty {
            host_id,
            title: title.to_string(),
            description: "A place to stay".to_string(),
            location: LocationData {
                city: "Visby".to_string(),
                country: "Sweden".to_string(),
                ..Default::default()
            },
            price_per_night: Decimal::from(price),
            photos: vec![],
            amenities: vec![],
            max_guests: 4,
            kind: PropertyKind::House,
        }
    }

    #[tokio::test]
    async fn rejects_non_positive_price() {
        let db = Arc::new(MemoryDatabase::new());
        let properties = PropertyManager::new(&db);
        let host = seed_user(&db, "marta@example.com", UserRole::Host).await;

        let result = properties
            .create_property(host.id, new_property(host.id, "Freebie", 0))
            .await;

        assert!(matches!(result, Err(PropertyError::InvalidPrice)));
    }

    #[tokio::test]
    async fn mutation_is_limited_to_host_and_admin() {
        let db = Arc::new(MemoryDatabase::new());
        let properties = PropertyManager::new(&db);

        let host = seed_user(&db, "marta@example.com", UserRole::Host).await;
        let stranger = seed_user(&db, "nils@example.com", UserRole::Guest).await;
        let admin = seed_user(&db, "admin@example.com", UserRole::Admin).await;

        let property = properties
            .create_property(host.id, new_property(host.id, "Seaside cabin", 1000))
            .await
            .unwrap();

        let update = UpdatedProperty {
            id: property.id,
            title: Some("Seaside cottage".to_string()),
            ..Default::default()
        };

        let by_stranger = properties
            .update_property(Actor::from(&stranger), update)
            .await;
        assert!(matches!(by_stranger, Err(PropertyError::Forbidden(_))));

        let by_admin = properties
            .update_property(
                Actor::from(&admin),
                UpdatedProperty {
                    id: property.id,
                    title: Some("Seaside cottage".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(by_admin.title, "Seaside cottage");

        let deleted = properties
            .delete_property(property.id, Actor::from(&stranger))
            .await;
        assert!(matches!(deleted, Err(PropertyError::Forbidden(_))));

        properties
            .delete_property(property.id, Actor::from(&host))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn deleting_a_property_cascades_to_its_bookings() {
        let db = Arc::new(MemoryDatabase::new());
        let properties = PropertyManager::new(&db);

        let host = seed_user(&db, "marta@example.com", UserRole::Host).await;
        let guest = seed_user(&db, "jonas@example.com", UserRole::Guest).await;

        let property = properties
            .create_property(host.id, new_property(host.id, "Seaside cabin", 1000))
            .await
            .unwrap();

        let booking = db
            .create_booking(NewBooking {
                property_id: property.id,
                user_id: guest.id,
                start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 6, 5).unwrap(),
                total_price: Decimal::from(4000),
                status: BookingStatus::Confirmed,
            })
            .await
            .unwrap();

        properties
            .delete_property(property.id, Actor::from(&host))
            .await
            .unwrap();

        let gone = db.booking_by_id(booking.id).await;
        assert!(matches!(gone, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn search_filters_compose() {
        let db = Arc::new(MemoryDatabase::new());
        let properties = PropertyManager::new(&db);
        let host = seed_user(&db, "marta@example.com", UserRole::Host).await;

        properties
            .create_property(host.id, new_property(host.id, "Seaside cabin", 1000))
            .await
            .unwrap();
        properties
            .create_property(host.id, new_property(host.id, "Old town flat", 400))
            .await
            .unwrap();

        let by_title = properties
            .search(PropertyFilter {
                search: Some("seaside".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].title, "Seaside cabin");

        let by_price = properties
            .search(PropertyFilter {
                max_price: Some(Decimal::from(500)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_price.len(), 1);
        assert_eq!(by_price[0].title, "Old town flat");

        let by_city = properties
            .search(PropertyFilter {
                city: Some("Stockholm".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(by_city.is_empty());
    }
}
