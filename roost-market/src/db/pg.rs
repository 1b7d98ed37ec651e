use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, Error as SqlxError, FromRow, PgPool, QueryBuilder};
use uuid::Uuid;

use crate::{
    BookingData, Database, DatabaseError, DatabaseResult, IntoDatabaseError, LocationData,
    NewBooking, NewProperty, NewReview, NewSession, NewUser, PrimaryKey, PropertyData,
    PropertyFilter, Result, ReviewData, SessionData, UpdatedProperty, UpdatedUser, UserData,
};

/// A postgres database implementation for roost
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        Ok(Self { pool })
    }
}

const USER_COLUMNS: &str =
    "id, username, email, password, role, phone, profile_picture, created_at";

const PROPERTY_COLUMNS: &str = "id, host_id, title, description, address, city, state, country, \
     latitude, longitude, price_per_night, photos, amenities, max_guests, kind, rating, \
     num_reviews, created_at";

const BOOKING_COLUMNS: &str =
    "id, property_id, user_id, start_date, end_date, total_price, status, created_at";

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password: String,
    role: String,
    phone: Option<String>,
    profile_picture: Option<String>,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_data(self) -> Result<UserData> {
        Ok(UserData {
            id: self.id,
            username: self.username,
            email: self.email,
            password: self.password,
            role: self
                .role
                .parse()
                .map_err(|e: strum::ParseError| DatabaseError::Internal(Box::new(e)))?,
            phone: self.phone,
            profile_picture: self.profile_picture,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct SessionRow {
    id: Uuid,
    token: String,
    expires_at: DateTime<Utc>,
    user_id: Uuid,
    username: String,
    email: String,
    password: String,
    role: String,
    phone: Option<String>,
    profile_picture: Option<String>,
    user_created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct PropertyRow {
    id: Uuid,
    host_id: Uuid,
    title: String,
    description: String,
    address: Option<String>,
    city: String,
    state: Option<String>,
    country: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    price_per_night: Decimal,
    photos: Vec<String>,
    amenities: Vec<String>,
    max_guests: i32,
    kind: String,
    rating: f64,
    num_reviews: i64,
    created_at: DateTime<Utc>,
}

impl PropertyRow {
    fn into_data(self) -> Result<PropertyData> {
        Ok(PropertyData {
            id: self.id,
            host_id: self.host_id,
            title: self.title,
            description: self.description,
            location: LocationData {
                address: self.address,
                city: self.city,
                state: self.state,
                country: self.country,
                latitude: self.latitude,
                longitude: self.longitude,
            },
            price_per_night: self.price_per_night,
            photos: self.photos,
            amenities: self.amenities,
            max_guests: self.max_guests,
            kind: self
                .kind
                .parse()
                .map_err(|e: strum::ParseError| DatabaseError::Internal(Box::new(e)))?,
            rating: self.rating,
            num_reviews: self.num_reviews,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct BookingRow {
    id: Uuid,
    property_id: Uuid,
    user_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    total_price: Decimal,
    status: String,
    created_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_data(self) -> Result<BookingData> {
        Ok(BookingData {
            id: self.id,
            property_id: self.property_id,
            user_id: self.user_id,
            start_date: self.start_date,
            end_date: self.end_date,
            total_price: self.total_price,
            status: self
                .status
                .parse()
                .map_err(|e: strum::ParseError| DatabaseError::Internal(Box::new(e)))?,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct ReviewRow {
    id: Uuid,
    user_id: Uuid,
    property_id: Uuid,
    rating: i32,
    comment: String,
    created_at: DateTime<Utc>,
}

impl ReviewRow {
    fn into_data(self) -> ReviewData {
        ReviewData {
            id: self.id,
            user_id: self.user_id,
            property_id: self.property_id,
            rating: self.rating,
            comment: self.comment,
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, UserRow>(&query)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "id"))?
            .into_data()
    }

    async fn user_by_email(&self, email: &str) -> Result<UserData> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        sqlx::query_as::<_, UserRow>(&query)
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "email"))?
            .into_data()
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        self.user_by_email(&new_user.email)
            .await
            .conflict_or_ok("user", "email", &new_user.email)?;

        let id = Uuid::new_v4();

        sqlx::query("INSERT INTO users (id, username, email, password, role) VALUES ($1, $2, $3, $4, $5)")
            .bind(id)
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.password)
            .bind(new_user.role.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.user_by_id(id).await
    }

    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData> {
        let user = self.user_by_id(updated_user.id).await?;

        sqlx::query(
            "UPDATE users SET username = $1, email = $2, phone = $3, profile_picture = $4 WHERE id = $5",
        )
        .bind(updated_user.username.unwrap_or(user.username))
        .bind(updated_user.email.unwrap_or(user.email))
        .bind(updated_user.phone.or(user.phone))
        .bind(updated_user.profile_picture.or(user.profile_picture))
        .bind(updated_user.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.user_by_id(updated_user.id).await
    }

    async fn update_user_password(&self, user_id: PrimaryKey, password: String) -> Result<()> {
        // Ensure user exists
        let _ = self.user_by_id(user_id).await?;

        sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
            .bind(password)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT
                sessions.id,
                sessions.token,
                sessions.expires_at,
                users.id AS user_id,
                users.username,
                users.email,
                users.password,
                users.role,
                users.phone,
                users.profile_picture,
                users.created_at AS user_created_at
            FROM sessions
                INNER JOIN users ON sessions.user_id = users.id
            WHERE token = $1",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("session", "token"))?;

        let user = UserRow {
            id: row.user_id,
            username: row.username,
            email: row.email,
            password: row.password,
            role: row.role,
            phone: row.phone,
            profile_picture: row.profile_picture,
            created_at: row.user_created_at,
        }
        .into_data()?;

        Ok(SessionData {
            id: row.id,
            token: row.token,
            expires_at: row.expires_at,
            user,
        })
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        self.session_by_token(&new_session.token)
            .await
            .conflict_or_ok("session", "token", &new_session.token)?;

        sqlx::query("INSERT INTO sessions (id, token, user_id, expires_at) VALUES ($1, $2, $3, $4)")
            .bind(Uuid::new_v4())
            .bind(&new_session.token)
            .bind(new_session.user_id)
            .bind(new_session.expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.session_by_token(&new_session.token).await
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        // Ensure session exists
        let _ = self.session_by_token(token).await?;

        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE now() > expires_at")
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn property_by_id(&self, property_id: PrimaryKey) -> Result<PropertyData> {
        let query = format!("SELECT {PROPERTY_COLUMNS} FROM properties WHERE id = $1");

        sqlx::query_as::<_, PropertyRow>(&query)
            .bind(property_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("property", "id"))?
            .into_data()
    }

    async fn list_properties(&self, filter: PropertyFilter) -> Result<Vec<PropertyData>> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties WHERE 1=1"
        ));

        if let Some(city) = filter.city {
            qb.push(" AND city = ").push_bind(city);
        }
        if let Some(country) = filter.country {
            qb.push(" AND country = ").push_bind(country);
        }
        if let Some(kind) = filter.kind {
            qb.push(" AND kind = ").push_bind(kind.to_string());
        }
        if let Some(min_price) = filter.min_price {
            qb.push(" AND price_per_night >= ").push_bind(min_price);
        }
        if let Some(max_price) = filter.max_price {
            qb.push(" AND price_per_night <= ").push_bind(max_price);
        }
        if let Some(search) = filter.search {
            qb.push(" AND title ILIKE ").push_bind(format!("%{search}%"));
        }

        qb.push(" ORDER BY created_at DESC");

        qb.build_query_as::<PropertyRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?
            .into_iter()
            .map(PropertyRow::into_data)
            .collect()
    }

    async fn create_property(&self, new_property: NewProperty) -> Result<PropertyData> {
        let id = Uuid::new_v4();
        let location = new_property.location;

        sqlx::query(
            "INSERT INTO properties (id, host_id, title, description, address, city, state, \
             country, latitude, longitude, price_per_night, photos, amenities, max_guests, kind)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(id)
        .bind(new_property.host_id)
        .bind(&new_property.title)
        .bind(&new_property.description)
        .bind(&location.address)
        .bind(&location.city)
        .bind(&location.state)
        .bind(&location.country)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(new_property.price_per_night)
        .bind(&new_property.photos)
        .bind(&new_property.amenities)
        .bind(new_property.max_guests)
        .bind(new_property.kind.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.property_by_id(id).await
    }

    async fn update_property(&self, updated_property: UpdatedProperty) -> Result<PropertyData> {
        let property = self.property_by_id(updated_property.id).await?;
        let location = updated_property.location.unwrap_or(property.location);

        sqlx::query(
            "UPDATE properties SET
                title = $1,
                description = $2,
                address = $3,
                city = $4,
                state = $5,
                country = $6,
                latitude = $7,
                longitude = $8,
                price_per_night = $9,
                photos = $10,
                amenities = $11,
                max_guests = $12,
                kind = $13
            WHERE id = $14",
        )
        .bind(updated_property.title.unwrap_or(property.title))
        .bind(updated_property.description.unwrap_or(property.description))
        .bind(&location.address)
        .bind(&location.city)
        .bind(&location.state)
        .bind(&location.country)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(
            updated_property
                .price_per_night
                .unwrap_or(property.price_per_night),
        )
        .bind(updated_property.photos.unwrap_or(property.photos))
        .bind(updated_property.amenities.unwrap_or(property.amenities))
        .bind(updated_property.max_guests.unwrap_or(property.max_guests))
        .bind(updated_property.kind.unwrap_or(property.kind).to_string())
        .bind(updated_property.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.property_by_id(updated_property.id).await
    }

    async fn delete_property(&self, property_id: PrimaryKey) -> Result<()> {
        // Ensure property exists
        let _ = self.property_by_id(property_id).await?;

        // The bookings foreign key cascades, so the property and its
        // bookings disappear in one statement.
        sqlx::query("DELETE FROM properties WHERE id = $1")
            .bind(property_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn set_property_rating(
        &self,
        property_id: PrimaryKey,
        rating: f64,
        num_reviews: i64,
    ) -> Result<()> {
        sqlx::query("UPDATE properties SET rating = $1, num_reviews = $2 WHERE id = $3")
            .bind(rating)
            .bind(num_reviews)
            .bind(property_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn booking_by_id(&self, booking_id: PrimaryKey) -> Result<BookingData> {
        let query = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");

        sqlx::query_as::<_, BookingRow>(&query)
            .bind(booking_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("booking", "id"))?
            .into_data()
    }

    async fn bookings_for_user(&self, user_id: PrimaryKey) -> Result<Vec<BookingData>> {
        let query = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC"
        );

        sqlx::query_as::<_, BookingRow>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?
            .into_iter()
            .map(BookingRow::into_data)
            .collect()
    }

    async fn bookings_for_host(&self, host_id: PrimaryKey) -> Result<Vec<BookingData>> {
        sqlx::query_as::<_, BookingRow>(
            "SELECT
                bookings.id,
                bookings.property_id,
                bookings.user_id,
                bookings.start_date,
                bookings.end_date,
                bookings.total_price,
                bookings.status,
                bookings.created_at
            FROM bookings
                INNER JOIN properties ON bookings.property_id = properties.id
            WHERE properties.host_id = $1
            ORDER BY bookings.start_date DESC",
        )
        .bind(host_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?
        .into_iter()
        .map(BookingRow::into_data)
        .collect()
    }

    async fn booking_conflict_exists(
        &self,
        property_id: PrimaryKey,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                SELECT 1 FROM bookings
                WHERE property_id = $1
                    AND status <> 'cancelled'
                    AND start_date < $3
                    AND end_date > $2
            )",
        )
        .bind(property_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn create_booking(&self, new_booking: NewBooking) -> Result<BookingData> {
        let id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO bookings (id, property_id, user_id, start_date, end_date, total_price, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(id)
        .bind(new_booking.property_id)
        .bind(new_booking.user_id)
        .bind(new_booking.start_date)
        .bind(new_booking.end_date)
        .bind(new_booking.total_price)
        .bind(new_booking.status.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.booking_by_id(id).await
    }

    async fn delete_booking(&self, booking_id: PrimaryKey) -> Result<()> {
        // Ensure booking exists
        let _ = self.booking_by_id(booking_id).await?;

        sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(booking_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn review_by_id(&self, review_id: PrimaryKey) -> Result<ReviewData> {
        sqlx::query_as::<_, ReviewRow>(
            "SELECT id, user_id, property_id, rating, comment, created_at FROM reviews WHERE id = $1",
        )
        .bind(review_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("review", "id"))
        .map(ReviewRow::into_data)
    }

    async fn reviews_for_property(&self, property_id: PrimaryKey) -> Result<Vec<ReviewData>> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            "SELECT id, user_id, property_id, rating, comment, created_at
             FROM reviews WHERE property_id = $1 ORDER BY created_at DESC",
        )
        .bind(property_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(ReviewRow::into_data).collect())
    }

    async fn create_review(&self, new_review: NewReview) -> Result<ReviewData> {
        let id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO reviews (id, user_id, property_id, rating, comment) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(new_review.user_id)
        .bind(new_review.property_id)
        .bind(new_review.rating)
        .bind(&new_review.comment)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.review_by_id(id).await
    }

    async fn delete_review(&self, review_id: PrimaryKey) -> Result<()> {
        // Ensure review exists
        let _ = self.review_by_id(review_id).await?;

        sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(review_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn wishlist_property_ids(&self, user_id: PrimaryKey) -> Result<Vec<PrimaryKey>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT property_id FROM wishlist_entries WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn add_wishlist_entry(
        &self,
        user_id: PrimaryKey,
        property_id: PrimaryKey,
    ) -> Result<Vec<PrimaryKey>> {
        sqlx::query(
            "INSERT INTO wishlist_entries (user_id, property_id) VALUES ($1, $2)
             ON CONFLICT (user_id, property_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(property_id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.wishlist_property_ids(user_id).await
    }

    async fn remove_wishlist_entry(
        &self,
        user_id: PrimaryKey,
        property_id: PrimaryKey,
    ) -> Result<Vec<PrimaryKey>> {
        sqlx::query("DELETE FROM wishlist_entries WHERE user_id = $1 AND property_id = $2")
            .bind(user_id)
            .bind(property_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.wishlist_property_ids(user_id).await
    }
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}
