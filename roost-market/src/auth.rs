use argon2::{
    password_hash::{Encoding, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{Duration, Utc};
use rand::rngs::OsRng;
use std::sync::Arc;
use thiserror::Error;

use crate::{
    util::random_string, Database, DatabaseError, DatabaseResult, NewSession, NewUser, PrimaryKey,
    SessionData, UpdatedUser, UserData, UserRole,
};

pub struct Auth<Db> {
    db: Arc<Db>,
    argon: Argon2<'static>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Email or password is incorrect
    #[error("Incorrect email or password")]
    InvalidCredentials,
    /// The current password check on a password change failed
    #[error("Current password is incorrect")]
    WrongPassword,
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
    #[error("HashError: {0}")]
    HashError(String),
}

impl<Db> Auth<Db>
where
    Db: Database,
{
    const SESSION_DURATION_IN_DAYS: usize = 7;

    pub fn new(db: &Arc<Db>) -> Self {
        Self {
            db: db.clone(),
            argon: Argon2::default(),
        }
    }

    /// Logs in a user, returning a new session
    pub async fn login(&self, credentials: Credentials) -> Result<SessionData, AuthError> {
        self.clear_expired().await?;

        let user = self
            .db
            .user_by_email(&credentials.email)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound {
                    resource: _,
                    identifier: _,
                } => AuthError::InvalidCredentials,
                err => AuthError::Db(err),
            })?;

        let stored_password = PasswordHash::parse(&user.password, Encoding::default())
            .map_err(|e| AuthError::HashError(e.to_string()))?;

        self.argon
            .verify_password(credentials.password.as_bytes(), &stored_password)
            .map_err(|_| AuthError::InvalidCredentials)?;

        self.create_session(user.id).await
    }

    /// Deletes the associated session, if it exists
    pub async fn logout(&self, token: &str) -> Result<(), DatabaseError> {
        self.db.delete_session_by_token(token).await
    }

    /// Creates an account and logs it in right away. The email must not be
    /// taken; the role defaults to guest.
    pub async fn register(&self, new_account: NewAccount) -> Result<SessionData, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hashed_password = self
            .argon
            .hash_password(new_account.password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?
            .to_string();

        let user = self
            .db
            .create_user(NewUser {
                username: new_account.username,
                email: new_account.email,
                password: hashed_password,
                role: new_account.role.unwrap_or_default(),
            })
            .await
            .map_err(AuthError::Db)?;

        self.create_session(user.id).await
    }

    /// Returns a session if it exists
    pub async fn session(&self, token: &str) -> Result<SessionData, DatabaseError> {
        self.db.session_by_token(token).await
    }

    /// Updates profile fields. A changed email must not belong to another
    /// account.
    pub async fn update_profile(&self, updated_user: UpdatedUser) -> Result<UserData, AuthError> {
        let user = self
            .db
            .user_by_id(updated_user.id)
            .await
            .map_err(AuthError::Db)?;

        if let Some(email) = &updated_user.email {
            if email != &user.email {
                self.db
                    .user_by_email(email)
                    .await
                    .conflict_or_ok("user", "email", email)
                    .map_err(AuthError::Db)?;
            }
        }

        self.db.update_user(updated_user).await.map_err(AuthError::Db)
    }

    /// Changes the password after verifying the current one
    pub async fn change_password(
        &self,
        user_id: PrimaryKey,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self.db.user_by_id(user_id).await.map_err(AuthError::Db)?;

        let stored_password = PasswordHash::parse(&user.password, Encoding::default())
            .map_err(|e| AuthError::HashError(e.to_string()))?;

        self.argon
            .verify_password(current_password.as_bytes(), &stored_password)
            .map_err(|_| AuthError::WrongPassword)?;

        let salt = SaltString::generate(&mut OsRng);
        let hashed_password = self
            .argon
            .hash_password(new_password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?
            .to_string();

        self.db
            .update_user_password(user_id, hashed_password)
            .await
            .map_err(AuthError::Db)
    }

    async fn create_session(&self, user_id: PrimaryKey) -> Result<SessionData, AuthError> {
        let expires_at = Utc::now() + Duration::days(Self::SESSION_DURATION_IN_DAYS as i64);

        let new_session = NewSession {
            token: random_string(32),
            user_id,
            expires_at,
        };

        self.db
            .create_session(new_session)
            .await
            .map_err(AuthError::Db)
    }

    async fn clear_expired(&self) -> Result<(), AuthError> {
        self.db
            .clear_expired_sessions()
            .await
            .map_err(AuthError::Db)
    }
}

#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Option<UserRole>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryDatabase;

    fn account(email: &str) -> NewAccount {
        NewAccount {
            username: "jonas".to_string(),
            email: email.to_string(),
            password: "correct horse".to_string(),
            role: None,
        }
    }

    #[tokio::test]
    async fn register_then_login_round_trips() {
        let db = Arc::new(MemoryDatabase::new());
        let auth = Auth::new(&db);

        let registered = auth.register(account("jonas@example.com")).await.unwrap();
        assert_eq!(registered.user.role, UserRole::Guest);
        // The stored password is a hash, never the plain text
        assert_ne!(registered.user.password, "correct horse");

        let session = auth
            .login(Credentials {
                email: "jonas@example.com".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(session.user.id, registered.user.id);
        assert!(auth.session(&session.token).await.is_ok());
    }

    #[tokio::test]
    async fn rejects_wrong_password_and_unknown_email() {
        let db = Arc::new(MemoryDatabase::new());
        let auth = Auth::new(&db);

        auth.register(account("jonas@example.com")).await.unwrap();

        let wrong = auth
            .login(Credentials {
                email: "jonas@example.com".to_string(),
                password: "incorrect horse".to_string(),
            })
            .await;
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));

        let unknown = auth
            .login(Credentials {
                email: "nils@example.com".to_string(),
                password: "correct horse".to_string(),
            })
            .await;
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn rejects_duplicate_email() {
        let db = Arc::new(MemoryDatabase::new());
        let auth = Auth::new(&db);

        auth.register(account("jonas@example.com")).await.unwrap();
        let duplicate = auth.register(account("jonas@example.com")).await;

        assert!(matches!(
            duplicate,
            Err(AuthError::Db(DatabaseError::Conflict { .. }))
        ));
    }

    #[tokio::test]
    async fn change_password_requires_the_current_one() {
        let db = Arc::new(MemoryDatabase::new());
        let auth = Auth::new(&db);

        let session = auth.register(account("jonas@example.com")).await.unwrap();
        let user_id = session.user.id;

        let wrong = auth
            .change_password(user_id, "incorrect horse", "battery staple")
            .await;
        assert!(matches!(wrong, Err(AuthError::WrongPassword)));

        auth.change_password(user_id, "correct horse", "battery staple")
            .await
            .unwrap();

        let relogin = auth
            .login(Credentials {
                email: "jonas@example.com".to_string(),
                password: "battery staple".to_string(),
            })
            .await;
        assert!(relogin.is_ok());
    }

    #[tokio::test]
    async fn logout_invalidates_the_session() {
        let db = Arc::new(MemoryDatabase::new());
        let auth = Auth::new(&db);

        let session = auth.register(account("jonas@example.com")).await.unwrap();

        auth.logout(&session.token).await.unwrap();
        assert!(auth.session(&session.token).await.is_err());
    }
}
