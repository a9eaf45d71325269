use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use weathermail_db::{Database, UserInsert};
use weathermail_report::ReportPipeline;
use weathermail_types::api::{
    Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse,
};

use crate::error::{ApiError, run_db};
use crate::middleware::SESSION_COOKIE;
use crate::validation::validate_signup;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    pub pipeline: Arc<ReportPipeline>,
    /// Usernames allowed to trigger a report run over HTTP.
    pub admin_users: Vec<String>,
}

/// A freshly authenticated user and their signed session token.
pub(crate) struct Session {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload.map_err(|_| ApiError::Validation("Invalid JSON data".into()))?;

    let session = signup_account(&state, &req.username, &req.email, &req.password).await?;

    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(session.token.clone())),
        Json(RegisterResponse {
            user_id: session.user_id,
            token: session.token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload.map_err(|_| ApiError::Validation("Invalid JSON data".into()))?;

    let session = authenticate(&state, &req.username, &req.password).await?;

    Ok((
        jar.add(session_cookie(session.token.clone())),
        Json(LoginResponse {
            user_id: session.user_id,
            username: session.username,
            token: session.token,
        }),
    ))
}

pub(crate) async fn signup_account(
    state: &AppState,
    username: &str,
    email: &str,
    password: &str,
) -> Result<Session, ApiError> {
    validate_signup(username, email, password)?;

    let (name, mail) = (username.to_string(), email.to_string());
    let (username_taken, email_taken) = run_db(&state.db, move |db| {
        Ok((db.get_user_by_username(&name)?.is_some(), db.email_taken(&mail)?))
    })
    .await?;

    if username_taken {
        signup_conflict(UserInsert::UsernameTaken)?;
    }
    if email_taken {
        signup_conflict(UserInsert::EmailTaken)?;
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();

    let user_id = Uuid::new_v4();
    let (id, name, mail) = (user_id.to_string(), username.to_string(), email.to_string());
    // A concurrent signup can still win the race past the checks above.
    let inserted =
        run_db(&state.db, move |db| db.create_user(&id, &name, &mail, &password_hash)).await?;
    signup_conflict(inserted)?;

    info!("Account created for {}", username);
    let token = create_token(&state.jwt_secret, user_id, username)?;

    Ok(Session {
        user_id,
        username: username.to_string(),
        token,
    })
}

fn signup_conflict(outcome: UserInsert) -> Result<(), ApiError> {
    match outcome {
        UserInsert::Created => Ok(()),
        UserInsert::UsernameTaken => Err(ApiError::Conflict("Username already exists".into())),
        UserInsert::EmailTaken => Err(ApiError::Conflict("Email already exists".into())),
    }
}

pub(crate) async fn authenticate(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<Session, ApiError> {
    let bad_credentials = || ApiError::Unauthorized("Invalid username or password".into());

    let name = username.to_string();
    let user = run_db(&state.db, move |db| db.get_user_by_username(&name))
        .await?
        .ok_or_else(bad_credentials)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("stored hash for {} is unreadable: {}", user.username, e))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| bad_credentials())?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", user.id, e))?;

    let token = create_token(&state.jwt_secret, user_id, &user.username)?;

    Ok(Session {
        user_id,
        username: user.username,
        token,
    })
}

pub(crate) fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub(crate) fn clear_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
