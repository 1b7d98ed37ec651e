use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::{
    bookings::overlaps, BookingData, BookingStatus, Database, DatabaseError, DatabaseResult,
    NewBooking, NewProperty, NewReview, NewSession, NewUser, PrimaryKey, PropertyData,
    PropertyFilter, Result, ReviewData, SessionData, UpdatedProperty, UpdatedUser, UserData,
};

/// An in-memory database for roost, used by the test suite and for running
/// the marketplace without a Postgres instance. Every operation takes a
/// single lock, so each trait method is atomic.
#[derive(Default)]
pub struct MemoryDatabase {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    users: HashMap<PrimaryKey, UserData>,
    sessions: HashMap<String, SessionRow>,
    properties: HashMap<PrimaryKey, PropertyData>,
    bookings: HashMap<PrimaryKey, BookingData>,
    reviews: HashMap<PrimaryKey, ReviewData>,
    wishlists: HashMap<PrimaryKey, Vec<PrimaryKey>>,
}

struct SessionRow {
    id: PrimaryKey,
    token: String,
    user_id: PrimaryKey,
    expires_at: DateTime<Utc>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        self.tables
            .read()
            .users
            .get(&user_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            })
    }

    async fn user_by_email(&self, email: &str) -> Result<UserData> {
        self.tables
            .read()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "email",
            })
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        self.user_by_email(&new_user.email)
            .await
            .conflict_or_ok("user", "email", &new_user.email)?;

        let user = UserData {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password: new_user.password,
            role: new_user.role,
            phone: None,
            profile_picture: None,
            created_at: Utc::now(),
        };

        self.tables.write().users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData> {
        let mut tables = self.tables.write();
        let user = tables
            .users
            .get_mut(&updated_user.id)
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            })?;

        if let Some(username) = updated_user.username {
            user.username = username;
        }
        if let Some(email) = updated_user.email {
            user.email = email;
        }
        if let Some(phone) = updated_user.phone {
            user.phone = Some(phone);
        }
        if let Some(picture) = updated_user.profile_picture {
            user.profile_picture = Some(picture);
        }

        Ok(user.clone())
    }

    async fn update_user_password(&self, user_id: PrimaryKey, password: String) -> Result<()> {
        let mut tables = self.tables.write();
        let user = tables.users.get_mut(&user_id).ok_or(DatabaseError::NotFound {
            resource: "user",
            identifier: "id",
        })?;

        user.password = password;
        Ok(())
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        let tables = self.tables.read();
        let row = tables.sessions.get(token).ok_or(DatabaseError::NotFound {
            resource: "session",
            identifier: "token",
        })?;

        let user = tables
            .users
            .get(&row.user_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            })?;

        Ok(SessionData {
            id: row.id,
            token: row.token.clone(),
            expires_at: row.expires_at,
            user,
        })
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        self.session_by_token(&new_session.token)
            .await
            .conflict_or_ok("session", "token", &new_session.token)?;

        let row = SessionRow {
            id: Uuid::new_v4(),
            token: new_session.token.clone(),
            user_id: new_session.user_id,
            expires_at: new_session.expires_at,
        };

        self.tables.write().sessions.insert(row.token.clone(), row);
        self.session_by_token(&new_session.token).await
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        self.tables
            .write()
            .sessions
            .remove(token)
            .map(|_| ())
            .ok_or(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            })
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        let now = Utc::now();
        self.tables
            .write()
            .sessions
            .retain(|_, row| row.expires_at > now);
        Ok(())
    }

    async fn property_by_id(&self, property_id: PrimaryKey) -> Result<PropertyData> {
        self.tables
            .read()
            .properties
            .get(&property_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "property",
                identifier: "id",
            })
    }

    async fn list_properties(&self, filter: PropertyFilter) -> Result<Vec<PropertyData>> {
        let search = filter.search.map(|s| s.to_lowercase());

        let mut properties: Vec<_> = self
            .tables
            .read()
            .properties
            .values()
            .filter(|p| {
                filter.city.as_ref().map_or(true, |c| &p.location.city == c)
                    && filter
                        .country
                        .as_ref()
                        .map_or(true, |c| &p.location.country == c)
                    && filter.kind.map_or(true, |k| p.kind == k)
                    && filter.min_price.map_or(true, |min| p.price_per_night >= min)
                    && filter.max_price.map_or(true, |max| p.price_per_night <= max)
                    && search
                        .as_ref()
                        .map_or(true, |s| p.title.to_lowercase().contains(s))
            })
            .cloned()
            .collect();

        properties.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(properties)
    }

    async fn create_property(&self, new_property: NewProperty) -> Result<PropertyData> {
        let property = PropertyData {
            id: Uuid::new_v4(),
            host_id: new_property.host_id,
            title: new_property.title,
            description: new_property.description,
            location: new_property.location,
            price_per_night: new_property.price_per_night,
            photos: new_property.photos,
            amenities: new_property.amenities,
            max_guests: new_property.max_guests,
            kind: new_property.kind,
            rating: 0.0,
            num_reviews: 0,
            created_at: Utc::now(),
        };

        self.tables
            .write()
            .properties
            .insert(property.id, property.clone());
        Ok(property)
    }

    async fn update_property(&self, updated_property: UpdatedProperty) -> Result<PropertyData> {
        let mut tables = self.tables.write();
        let property =
            tables
                .properties
                .get_mut(&updated_property.id)
                .ok_or(DatabaseError::NotFound {
                    resource: "property",
                    identifier: "id",
                })?;

        if let Some(title) = updated_property.title {
            property.title = title;
        }
        if let Some(description) = updated_property.description {
            property.description = description;
        }
        if let Some(location) = updated_property.location {
            property.location = location;
        }
        if let Some(price) = updated_property.price_per_night {
            property.price_per_night = price;
        }
        if let Some(photos) = updated_property.photos {
            property.photos = photos;
        }
        if let Some(amenities) = updated_property.amenities {
            property.amenities = amenities;
        }
        if let Some(max_guests) = updated_property.max_guests {
            property.max_guests = max_guests;
        }
        if let Some(kind) = updated_property.kind {
            property.kind = kind;
        }

        Ok(property.clone())
    }

    async fn delete_property(&self, property_id: PrimaryKey) -> Result<()> {
        let mut tables = self.tables.write();

        tables
            .properties
            .remove(&property_id)
            .ok_or(DatabaseError::NotFound {
                resource: "property",
                identifier: "id",
            })?;

        // Cascade under the same lock. Reviews stay.
        tables.bookings.retain(|_, b| b.property_id != property_id);
        Ok(())
    }

    async fn set_property_rating(
        &self,
        property_id: PrimaryKey,
        rating: f64,
        num_reviews: i64,
    ) -> Result<()> {
        if let Some(property) = self.tables.write().properties.get_mut(&property_id) {
            property.rating = rating;
            property.num_reviews = num_reviews;
        }

        Ok(())
    }

    async fn booking_by_id(&self, booking_id: PrimaryKey) -> Result<BookingData> {
        self.tables
            .read()
            .bookings
            .get(&booking_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "booking",
                identifier: "id",
            })
    }

    async fn bookings_for_user(&self, user_id: PrimaryKey) -> Result<Vec<BookingData>> {
        let mut bookings: Vec<_> = self
            .tables
            .read()
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();

        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn bookings_for_host(&self, host_id: PrimaryKey) -> Result<Vec<BookingData>> {
        let tables = self.tables.read();

        let mut bookings: Vec<_> = tables
            .bookings
            .values()
            .filter(|b| {
                tables
                    .properties
                    .get(&b.property_id)
                    .map_or(false, |p| p.host_id == host_id)
            })
            .cloned()
            .collect();

        bookings.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(bookings)
    }

    async fn booking_conflict_exists(
        &self,
        property_id: PrimaryKey,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<bool> {
        let conflict = self.tables.read().bookings.values().any(|b| {
            b.property_id == property_id
                && b.status != BookingStatus::Cancelled
                && overlaps(b.start_date, b.end_date, start_date, end_date)
        });

        Ok(conflict)
    }

    async fn create_booking(&self, new_booking: NewBooking) -> Result<BookingData> {
        let booking = BookingData {
            id: Uuid::new_v4(),
            property_id: new_booking.property_id,
            user_id: new_booking.user_id,
            start_date: new_booking.start_date,
            end_date: new_booking.end_date,
            total_price: new_booking.total_price,
            status: new_booking.status,
            created_at: Utc::now(),
        };

        self.tables
            .write()
            .bookings
            .insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn delete_booking(&self, booking_id: PrimaryKey) -> Result<()> {
        self.tables
            .write()
            .bookings
            .remove(&booking_id)
            .map(|_| ())
            .ok_or(DatabaseError::NotFound {
                resource: "booking",
                identifier: "id",
            })
    }

    async fn review_by_id(&self, review_id: PrimaryKey) -> Result<ReviewData> {
        self.tables
            .read()
            .reviews
            .get(&review_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "review",
                identifier: "id",
            })
    }

    async fn reviews_for_property(&self, property_id: PrimaryKey) -> Result<Vec<ReviewData>> {
        let mut reviews: Vec<_> = self
            .tables
            .read()
            .reviews
            .values()
            .filter(|r| r.property_id == property_id)
            .cloned()
            .collect();

        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn create_review(&self, new_review: NewReview) -> Result<ReviewData> {
        let review = ReviewData {
            id: Uuid::new_v4(),
            user_id: new_review.user_id,
            property_id: new_review.property_id,
            rating: new_review.rating,
            comment: new_review.comment,
            created_at: Utc::now(),
        };

        self.tables
            .write()
            .reviews
            .insert(review.id, review.clone());
        Ok(review)
    }

    async fn delete_review(&self, review_id: PrimaryKey) -> Result<()> {
        self.tables
            .write()
            .reviews
            .remove(&review_id)
            .map(|_| ())
            .ok_or(DatabaseError::NotFound {
                resource: "review",
                identifier: "id",
            })
    }

    async fn wishlist_property_ids(&self, user_id: PrimaryKey) -> Result<Vec<PrimaryKey>> {
        Ok(self
            .tables
            .read()
            .wishlists
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_wishlist_entry(
        &self,
        user_id: PrimaryKey,
        property_id: PrimaryKey,
    ) -> Result<Vec<PrimaryKey>> {
        let mut tables = self.tables.write();
        let wishlist = tables.wishlists.entry(user_id).or_default();

        if !wishlist.contains(&property_id) {
            wishlist.push(property_id);
        }

        Ok(wishlist.clone())
    }

    async fn remove_wishlist_entry(
        &self,
        user_id: PrimaryKey,
        property_id: PrimaryKey,
    ) -> Result<Vec<PrimaryKey>> {
        let mut tables = self.tables.write();
        let wishlist = tables.wishlists.entry(user_id).or_default();

        wishlist.retain(|id| id != &property_id);
        Ok(wishlist.clone())
    }
}
