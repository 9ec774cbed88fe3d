/**
 * Contact Routes
 * Lead capture (public create) plus the admin-only submission reads and the
 * monthly statistics series the dashboard chart renders.
 */
use axum::{extract::Path, http::StatusCode, Json};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{self, models::ContactSubmission};
use crate::error::ApiError;
use crate::routes::auth::AdminClaims;
use crate::stats::{fill_months, MonthlyCount};

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub requirements: String,
    pub company_name: Option<String>,
    pub phone_number: Option<String>,
}

/// POST /api/contact - create a lead submission (public)
pub async fn create_contact(
    Json(payload): Json<CreateContactRequest>,
) -> Result<(StatusCode, Json<ContactSubmission>), ApiError> {
    if payload.name.trim().is_empty()
        || payload.email.trim().is_empty()
        || payload.requirements.trim().is_empty()
    {
        return Err(ApiError::Validation(
            "Please fill in all required fields".to_string(),
        ));
    }

    let pool = db::pool()?;

    let submission = sqlx::query_as::<_, ContactSubmission>(
        r#"
        INSERT INTO contact_submissions (name, email, requirements, company_name, phone_number)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, name, email, requirements, company_name, phone_number, created_at
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&payload.requirements)
    .bind(&payload.company_name)
    .bind(&payload.phone_number)
    .fetch_one(pool.as_ref())
    .await?;

    tracing::info!("New lead submission from {}", submission.email);

    Ok((StatusCode::CREATED, Json(submission)))
}

/// GET /api/contact - list all submissions, newest first (admin)
pub async fn list_contacts(
    _claims: AdminClaims,
) -> Result<Json<Vec<ContactSubmission>>, ApiError> {
    let pool = db::pool()?;

    let submissions = sqlx::query_as::<_, ContactSubmission>(
        r#"
        SELECT id, name, email, requirements, company_name, phone_number, created_at
        FROM contact_submissions
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool.as_ref())
    .await?;

    Ok(Json(submissions))
}

/// GET /api/contact/{id} - get one submission (admin)
pub async fn get_contact(
    _claims: AdminClaims,
    Path(id): Path<Uuid>,
) -> Result<Json<ContactSubmission>, ApiError> {
    let pool = db::pool()?;

    let submission = sqlx::query_as::<_, ContactSubmission>(
        r#"
        SELECT id, name, email, requirements, company_name, phone_number, created_at
        FROM contact_submissions
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await?
    .ok_or_else(|| ApiError::NotFound("Contact not found".to_string()))?;

    Ok(Json(submission))
}

/// Half-open UTC range covering the given calendar year.
fn year_bounds(year: i32) -> Result<(DateTime<Utc>, DateTime<Utc>), ApiError> {
    let start = Utc
        .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| ApiError::Internal(format!("invalid year bound: {year}")))?;
    let end = Utc
        .with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| ApiError::Internal(format!("invalid year bound: {}", year + 1)))?;
    Ok((start, end))
}

/// GET /api/contact/stats/monthly - 12-point monthly lead series (admin)
///
/// The group-by is pushed down to the store so the count scales with the
/// number of populated months rather than with submission volume; the
/// zero-filling happens in application logic because the query only returns
/// months that have data. Months are bucketed by the submission's creation
/// instant interpreted in UTC, independent of the server's local timezone.
pub async fn monthly_stats(_claims: AdminClaims) -> Result<Json<Vec<MonthlyCount>>, ApiError> {
    let pool = db::pool()?;

    let (start, end) = year_bounds(Utc::now().year())?;

    let sparse: Vec<(i32, i64)> = sqlx::query_as(
        r#"
        SELECT EXTRACT(MONTH FROM created_at AT TIME ZONE 'UTC')::INT AS month,
               COUNT(*) AS users
        FROM contact_submissions
        WHERE created_at >= $1 AND created_at < $2
        GROUP BY 1
        ORDER BY 1
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool.as_ref())
    .await?;

    Ok(Json(fill_months(&sparse)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::{get, post};
    use axum::Router;
    use tower::ServiceExt;

    fn contact_router() -> Router {
        Router::new()
            .route("/api/contact", post(create_contact).get(list_contacts))
            .route("/api/contact/stats/monthly", get(monthly_stats))
            .route("/api/contact/{id}", get(get_contact))
    }

    async fn post_json(
        app: Router,
        uri: &str,
        json: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let req = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    #[test]
    fn test_year_bounds_are_half_open_utc() {
        let (start, end) = year_bounds(2025).unwrap();
        assert_eq!(start.to_rfc3339(), "2025-01-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2026-01-01T00:00:00+00:00");
        assert!(start < end);
    }

    #[tokio::test]
    async fn test_create_contact_missing_requirements_returns_400() {
        let (status, body) = post_json(
            contact_router(),
            "/api/contact",
            serde_json::json!({"name": "A", "email": "a@x.com"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Please fill in all required fields");
    }

    #[tokio::test]
    async fn test_create_contact_blank_name_returns_400() {
        let (status, _) = post_json(
            contact_router(),
            "/api/contact",
            serde_json::json!({"name": "  ", "email": "a@x.com", "requirements": "need X"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_contacts_without_token_returns_unauthorized() {
        let req = Request::get("/api/contact").body(Body::empty()).unwrap();
        let res = contact_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_monthly_stats_without_token_returns_unauthorized() {
        let req = Request::get("/api/contact/stats/monthly")
            .body(Body::empty())
            .unwrap();
        let res = contact_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_contact_without_database_is_internal_error() {
        if crate::db::get_pool().is_some() {
            return;
        }
        let (status, body) = post_json(
            contact_router(),
            "/api/contact",
            serde_json::json!({"name": "A", "email": "a@x.com", "requirements": "need X"}),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Server Error");
    }
}
