/**
 * Authentication Routes
 * JWT-based admin authentication: login, first-admin registration, and the
 * bearer-token gate used by mutating handlers.
 */
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::error::ApiError;

lazy_static::lazy_static! {
    /// JWT secret key from environment
    pub static ref JWT_SECRET: String = std::env::var("JWT_SECRET")
        .unwrap_or_else(|_| "default-jwt-secret-change-in-production".to_string());
}

/// Access token expiry in hours
const TOKEN_EXPIRY_HOURS: i64 = 24;

/// JWT claims carried by the admin token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,   // Admin user ID
    pub email: String, // Admin email
    pub exp: i64,      // Expiry timestamp
    pub iat: i64,      // Issued at timestamp
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub email: String,
}

/// Create a signed access token for an admin user
fn create_access_token(user_id: &Uuid, email: &str) -> Result<String, ApiError> {
    let now = Utc::now();
    let exp = now + Duration::hours(TOKEN_EXPIRY_HOURS);

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("failed to create token: {e}")))
}

/// Verify and decode an access token
pub fn verify_access_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Extractor that gates admin-only handlers. Rejects with 401 when the
/// request carries no bearer token or an invalid/expired one.
#[derive(Debug, Clone)]
pub struct AdminClaims(pub Claims);

impl<S> FromRequestParts<S> for AdminClaims
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Auth("Authorization required".to_string()))?;

        let claims = verify_access_token(token)
            .map_err(|_| ApiError::Auth("Invalid or expired token".to_string()))?;

        Ok(AdminClaims(claims))
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<(), ApiError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ApiError::Validation(
            "Email and password are required".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(ApiError::Validation("Invalid email format".to_string()));
    }
    Ok(())
}

/// POST /api/auth/login
/// Authenticate an admin and return a signed token. Unknown email and wrong
/// password answer identically so the response never reveals which field
/// was wrong.
pub async fn login(
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    validate_credentials(&payload.email, &payload.password)?;

    let pool = db::pool()?;

    let row = sqlx::query_as::<_, (Uuid, String, String)>(
        "SELECT id, email, password_hash FROM admin_users WHERE LOWER(email) = LOWER($1)",
    )
    .bind(&payload.email)
    .fetch_optional(pool.as_ref())
    .await?;

    let (user_id, email, password_hash) = match row {
        Some(row) => row,
        None => {
            tracing::warn!("Login attempt for unknown user: {}", payload.email);
            return Err(ApiError::Auth("Invalid credentials".to_string()));
        }
    };

    // bcrypt is CPU-bound; keep the async executor free.
    let password = payload.password;
    let stored_hash = password_hash.clone();
    let password_ok =
        tokio::task::spawn_blocking(move || verify(&password, &stored_hash).unwrap_or(false))
            .await
            .unwrap_or(false);

    if !password_ok {
        tracing::warn!("Failed login attempt for: {}", email);
        return Err(ApiError::Auth("Invalid credentials".to_string()));
    }

    let token = create_access_token(&user_id, &email)?;

    tracing::info!("Successful login for admin: {}", email);

    Ok(Json(LoginResponse {
        token,
        user_id,
        email,
    }))
}

/// POST /api/auth/register
/// Bootstrap the first admin account. Closed once any admin exists.
pub async fn register(
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    validate_credentials(&payload.email, &payload.password)?;

    if payload.password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters long".to_string(),
        ));
    }

    let pool = db::pool()?;

    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM admin_users")
        .fetch_one(pool.as_ref())
        .await?;

    if existing > 0 {
        return Err(ApiError::Forbidden(
            "Registration is closed. An admin account already exists.".to_string(),
        ));
    }

    let password = payload.password;
    let password_hash = tokio::task::spawn_blocking(move || hash(&password, DEFAULT_COST))
        .await
        .map_err(|e| ApiError::Internal(format!("hash task failed: {e}")))?
        .map_err(|e| ApiError::Internal(format!("failed to hash password: {e}")))?;

    let (user_id, email): (Uuid, String) = sqlx::query_as(
        r#"
        INSERT INTO admin_users (email, password_hash)
        VALUES ($1, $2)
        RETURNING id, email
        "#,
    )
    .bind(&payload.email)
    .bind(&password_hash)
    .fetch_one(pool.as_ref())
    .await?;

    tracing::info!("Admin user registered: {}", email);

    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id, email })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    fn auth_router() -> Router {
        Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/register", post(register))
    }

    async fn post_json(
        app: Router,
        uri: &str,
        json: &impl serde::Serialize,
    ) -> (StatusCode, axum::body::Bytes) {
        let body = Body::from(serde_json::to_vec(json).unwrap());
        let req = Request::post(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes)
    }

    #[test]
    fn test_verify_access_token_invalid_returns_err() {
        assert!(verify_access_token("invalid.jwt.token").is_err());
    }

    #[test]
    fn test_token_round_trip_preserves_claims() {
        let user_id = Uuid::new_v4();
        let token = create_access_token(&user_id, "admin@example.com").unwrap();
        let claims = verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "admin@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn test_login_empty_email_returns_bad_request() {
        let (status, _) = post_json(
            auth_router(),
            "/api/auth/login",
            &LoginRequest {
                email: "".to_string(),
                password: "admin123".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_invalid_email_format_returns_bad_request() {
        let (status, _) = post_json(
            auth_router(),
            "/api/auth/login",
            &LoginRequest {
                email: "no-at-sign".to_string(),
                password: "admin123".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_short_password_returns_bad_request() {
        let (status, _) = post_json(
            auth_router(),
            "/api/auth/register",
            &RegisterRequest {
                email: "admin@example.com".to_string(),
                password: "short".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_without_database_is_internal_error() {
        if crate::db::get_pool().is_some() {
            return;
        }
        let (status, _) = post_json(
            auth_router(),
            "/api/auth/login",
            &LoginRequest {
                email: "admin@example.com".to_string(),
                password: "admin123".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
