use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts},
    routing::{get, post, put},
    Json,
};
use roost_market::{Actor, Credentials, NewAccount, SessionData, UpdatedUser, UserData};

use crate::{
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{
        LoginSchema, RegisterSchema, UpdatePasswordSchema, UpdateProfileSchema, ValidatedJson,
    },
    serialized::{success, ApiResponse, LoginResult, ToSerialized, User},
    Router,
};

/// Wraps [SessionData] so [FromRequestParts] can be implemented for it
pub struct Session(SessionData);

impl Session {
    /// Returns the user of the session
    pub fn user(&self) -> UserData {
        self.0.user.clone()
    }

    /// Returns the authorization actor of the session
    pub fn actor(&self) -> Actor {
        Actor::from(&self.0.user)
    }

    /// Returns the raw session token
    pub fn token(&self) -> &str {
        &self.0.token
    }
}

#[async_trait]
impl FromRequestParts<ServerContext> for Session {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|x| x.to_str().ok())
            .ok_or(ServerError::Unauthenticated("Missing authorization"))?;

        let parts: Vec<_> = token.split_ascii_whitespace().collect();

        if parts.first() != Some(&"Bearer") {
            return Err(ServerError::Validation(
                "Authorization must be Bearer".to_string(),
            ));
        }

        let token = parts.last().cloned().unwrap_or_default();

        let session = state
            .market
            .auth
            .session(token)
            .await
            .map_err(|_| ServerError::Unauthenticated("Session does not exist"))?;

        Ok(Self(session))
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    tag = "auth",
    request_body = RegisterSchema,
    responses(
        (status = 200, body = LoginResult)
    )
)]
async fn register(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<RegisterSchema>,
) -> ServerResult<Json<ApiResponse<LoginResult>>> {
    let session = context
        .market
        .auth
        .register(NewAccount {
            username: body.username,
            email: body.email,
            password: body.password,
            role: body.role,
        })
        .await?;

    Ok(success(session.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "auth",
    request_body = LoginSchema,
    responses(
        (status = 200, body = LoginResult)
    )
)]
async fn login(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<LoginSchema>,
) -> ServerResult<Json<ApiResponse<LoginResult>>> {
    let session = context
        .market
        .auth
        .login(Credentials {
            email: body.email,
            password: body.password,
        })
        .await?;

    Ok(success(session.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Session was deleted")
    )
)]
async fn logout(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<ApiResponse<()>>> {
    context.market.auth.logout(session.token()).await?;

    Ok(success(()))
}

#[utoipa::path(
    get,
    path = "/v1/auth/profile",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User)
    )
)]
async fn profile(session: Session) -> Json<ApiResponse<User>> {
    success(session.user().to_serialized())
}

#[utoipa::path(
    put,
    path = "/v1/auth/profile",
    tag = "auth",
    request_body = UpdateProfileSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User)
    )
)]
async fn update_profile(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<UpdateProfileSchema>,
) -> ServerResult<Json<ApiResponse<User>>> {
    let user = context
        .market
        .auth
        .update_profile(UpdatedUser {
            id: session.user().id,
            username: body.username,
            email: body.email,
            phone: body.phone,
            profile_picture: body.profile_picture,
        })
        .await?;

    Ok(success(user.to_serialized()))
}

#[utoipa::path(
    put,
    path = "/v1/auth/password",
    tag = "auth",
    request_body = UpdatePasswordSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Password was changed")
    )
)]
async fn update_password(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<UpdatePasswordSchema>,
) -> ServerResult<Json<ApiResponse<()>>> {
    context
        .market
        .auth
        .change_password(session.user().id, &body.current_password, &body.new_password)
        .await?;

    Ok(success(()))
}

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/profile", get(profile))
        .route("/profile", put(update_profile))
        .route("/password", put(update_password))
}
