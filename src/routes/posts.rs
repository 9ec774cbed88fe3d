/**
 * Post Routes
 * CRUD API endpoints for blog posts and case studies. The two entities are
 * structurally identical; every handler is a thin wrapper over the shared
 * implementation parameterized by `PostKind`.
 */
use axum::{
    extract::{Multipart, Path},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::db::{self, models::Post};
use crate::error::ApiError;
use crate::routes::auth::AdminClaims;

const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// Which of the two post collections a handler operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    Blog,
    Case,
}

impl PostKind {
    fn table(self) -> &'static str {
        match self {
            PostKind::Blog => "blog_posts",
            PostKind::Case => "case_posts",
        }
    }

    fn upload_dir(self) -> &'static str {
        match self {
            PostKind::Blog => "uploads/blogs",
            PostKind::Case => "uploads/cases",
        }
    }
}

// ============================================================================
// Multipart form handling
// ============================================================================

/// Fields collected from a create/update multipart body.
#[derive(Debug, Default)]
struct PostForm {
    title: Option<String>,
    description: Option<String>,
    image: Option<ImageUpload>,
}

#[derive(Debug)]
struct ImageUpload {
    bytes: axum::body::Bytes,
    mime: &'static str,
}

fn validate_image_magic_bytes(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    match bytes {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        // GIF: 47 49 46 38
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        // WebP: 52 49 46 46 ... 57 45 42 50
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

fn extension_from_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "bin",
    }
}

async fn read_post_form(mut multipart: Multipart) -> Result<PostForm, ApiError> {
    let mut form = PostForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Invalid multipart data: {e}")))?
    {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("title") => {
                form.title = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::Validation(format!("Invalid title field: {e}")))?,
                );
            }
            Some("description") => {
                form.description = Some(field.text().await.map_err(|e| {
                    ApiError::Validation(format!("Invalid description field: {e}"))
                })?);
            }
            Some("image") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Failed to read image: {e}")))?;

                // An empty file input is treated as "no image".
                if bytes.is_empty() {
                    continue;
                }
                if bytes.len() > MAX_IMAGE_SIZE {
                    return Err(ApiError::Validation(
                        "Image too large. Maximum size is 5MB.".to_string(),
                    ));
                }
                let mime = validate_image_magic_bytes(&bytes).ok_or_else(|| {
                    ApiError::Validation(
                        "Image content does not match an allowed type (JPEG, PNG, WebP, GIF)."
                            .to_string(),
                    )
                })?;
                form.image = Some(ImageUpload { bytes, mime });
            }
            // Unknown fields (e.g. the optional date the editor sends) are skipped.
            _ => {}
        }
    }

    Ok(form)
}

/// Required-field check, run before any store access. The error names every
/// missing field.
fn require_fields(form: &PostForm) -> Result<(String, String), ApiError> {
    let mut missing = Vec::new();
    let title = form.title.as_deref().unwrap_or("").trim();
    let description = form.description.as_deref().unwrap_or("").trim();

    if title.is_empty() {
        missing.push("title");
    }
    if description.is_empty() {
        missing.push("description");
    }
    if !missing.is_empty() {
        return Err(ApiError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    // Rich-text HTML comes straight from the editor; strip anything unsafe.
    Ok((title.to_string(), ammonia::clean(description)))
}

// ============================================================================
// Image storage
// ============================================================================

async fn store_image(kind: PostKind, image: &ImageUpload) -> Result<String, ApiError> {
    let dir = std::path::PathBuf::from(kind.upload_dir());
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to create upload directory: {e}")))?;

    let filename = format!("{}.{}", Uuid::new_v4(), extension_from_mime(image.mime));
    tokio::fs::write(dir.join(&filename), &image.bytes)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to save image: {e}")))?;

    tracing::info!("Image stored: {}/{} ({} bytes)", kind.upload_dir(), filename, image.bytes.len());

    Ok(format!("/{}/{}", kind.upload_dir(), filename))
}

/// Best-effort removal of a previously stored image. Only the filename
/// component of the stored URL is used, so a corrupted value cannot escape
/// the upload directory.
async fn remove_image(kind: PostKind, url: &str) {
    let Some(filename) = std::path::Path::new(url).file_name() else {
        return;
    };
    let path = std::path::PathBuf::from(kind.upload_dir()).join(filename);
    if let Err(e) = tokio::fs::remove_file(&path).await {
        tracing::debug!("could not remove image {}: {}", path.display(), e);
    }
}

// ============================================================================
// Shared handler implementations
// ============================================================================

async fn create_post(kind: PostKind, multipart: Multipart) -> Result<(StatusCode, Json<Post>), ApiError> {
    let form = read_post_form(multipart).await?;
    let (title, description) = require_fields(&form)?;

    let pool = db::pool()?;

    let image_url = match &form.image {
        Some(image) => Some(store_image(kind, image).await?),
        None => None,
    };

    let post = sqlx::query_as::<_, Post>(&format!(
        r#"
        INSERT INTO {} (title, description, image)
        VALUES ($1, $2, $3)
        RETURNING id, title, description, image, created_at, updated_at
        "#,
        kind.table()
    ))
    .bind(&title)
    .bind(&description)
    .bind(&image_url)
    .fetch_one(pool.as_ref())
    .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

async fn list_posts(kind: PostKind) -> Result<Json<Vec<Post>>, ApiError> {
    let pool = db::pool()?;

    let posts = sqlx::query_as::<_, Post>(&format!(
        r#"
        SELECT id, title, description, image, created_at, updated_at
        FROM {}
        ORDER BY created_at DESC
        "#,
        kind.table()
    ))
    .fetch_all(pool.as_ref())
    .await?;

    Ok(Json(posts))
}

async fn get_post(kind: PostKind, id: Uuid) -> Result<Json<Post>, ApiError> {
    let pool = db::pool()?;

    let post = sqlx::query_as::<_, Post>(&format!(
        r#"
        SELECT id, title, description, image, created_at, updated_at
        FROM {}
        WHERE id = $1
        "#,
        kind.table()
    ))
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await?
    .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    Ok(Json(post))
}

/// Full-field replace. A request without a new image keeps the stored one.
async fn update_post(kind: PostKind, id: Uuid, multipart: Multipart) -> Result<Json<Post>, ApiError> {
    let form = read_post_form(multipart).await?;
    let (title, description) = require_fields(&form)?;

    let pool = db::pool()?;

    let existing = sqlx::query_as::<_, Post>(&format!(
        "SELECT id, title, description, image, created_at, updated_at FROM {} WHERE id = $1",
        kind.table()
    ))
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await?
    .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    let image_url = match &form.image {
        Some(image) => {
            let url = store_image(kind, image).await?;
            if let Some(old) = &existing.image {
                remove_image(kind, old).await;
            }
            Some(url)
        }
        None => existing.image,
    };

    let post = sqlx::query_as::<_, Post>(&format!(
        r#"
        UPDATE {}
        SET title = $1, description = $2, image = $3, updated_at = now()
        WHERE id = $4
        RETURNING id, title, description, image, created_at, updated_at
        "#,
        kind.table()
    ))
    .bind(&title)
    .bind(&description)
    .bind(&image_url)
    .bind(id)
    .fetch_one(pool.as_ref())
    .await?;

    Ok(Json(post))
}

async fn delete_post(kind: PostKind, id: Uuid) -> Result<StatusCode, ApiError> {
    let pool = db::pool()?;

    let deleted = sqlx::query_as::<_, (Option<String>,)>(&format!(
        "DELETE FROM {} WHERE id = $1 RETURNING image",
        kind.table()
    ))
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await?
    .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    if let Some(image) = deleted.0 {
        remove_image(kind, &image).await;
    }

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Route-facing wrappers
// ============================================================================

pub async fn create_blog(
    _claims: AdminClaims,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    create_post(PostKind::Blog, multipart).await
}

pub async fn list_blogs() -> Result<Json<Vec<Post>>, ApiError> {
    list_posts(PostKind::Blog).await
}

pub async fn get_blog(Path(id): Path<Uuid>) -> Result<Json<Post>, ApiError> {
    get_post(PostKind::Blog, id).await
}

pub async fn update_blog(
    _claims: AdminClaims,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<Post>, ApiError> {
    update_post(PostKind::Blog, id, multipart).await
}

pub async fn delete_blog(
    _claims: AdminClaims,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    delete_post(PostKind::Blog, id).await
}

pub async fn create_case(
    _claims: AdminClaims,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    create_post(PostKind::Case, multipart).await
}

pub async fn list_cases() -> Result<Json<Vec<Post>>, ApiError> {
    list_posts(PostKind::Case).await
}

pub async fn get_case(Path(id): Path<Uuid>) -> Result<Json<Post>, ApiError> {
    get_post(PostKind::Case, id).await
}

pub async fn update_case(
    _claims: AdminClaims,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<Post>, ApiError> {
    update_post(PostKind::Case, id, multipart).await
}

pub async fn delete_case(
    _claims: AdminClaims,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    delete_post(PostKind::Case, id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    #[test]
    fn test_magic_bytes_detects_known_formats() {
        assert_eq!(
            validate_image_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some("image/jpeg")
        );
        assert_eq!(
            validate_image_magic_bytes(&[0x89, 0x50, 0x4E, 0x47, 0x0D]),
            Some("image/png")
        );
        assert_eq!(
            validate_image_magic_bytes(&[0x47, 0x49, 0x46, 0x38, 0x39]),
            Some("image/gif")
        );
        assert_eq!(
            validate_image_magic_bytes(b"RIFF\x00\x00\x00\x00WEBP"),
            Some("image/webp")
        );
    }

    #[test]
    fn test_magic_bytes_rejects_non_images() {
        assert_eq!(validate_image_magic_bytes(b"<html>"), None);
        assert_eq!(validate_image_magic_bytes(&[]), None);
        assert_eq!(validate_image_magic_bytes(&[0xFF, 0xD8]), None);
    }

    #[test]
    fn test_require_fields_names_missing_fields() {
        let form = PostForm::default();
        let err = require_fields(&form).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("title"));
        assert!(message.contains("description"));
    }

    #[test]
    fn test_require_fields_rejects_whitespace_only_title() {
        let form = PostForm {
            title: Some("   ".to_string()),
            description: Some("<p>body</p>".to_string()),
            image: None,
        };
        let err = require_fields(&form).unwrap_err();
        assert!(err.to_string().contains("title"));
        assert!(!err.to_string().contains("description"));
    }

    #[test]
    fn test_require_fields_sanitizes_description() {
        let form = PostForm {
            title: Some("Title".to_string()),
            description: Some("<p>ok</p><script>alert(1)</script>".to_string()),
            image: None,
        };
        let (_, description) = require_fields(&form).unwrap();
        assert!(description.contains("<p>ok</p>"));
        assert!(!description.contains("script"));
    }

    #[tokio::test]
    async fn test_create_blog_without_token_returns_unauthorized() {
        let app = Router::new().route("/api/blogs", post(create_blog));
        let req = Request::post("/api/blogs")
            .header("content-type", "multipart/form-data; boundary=X")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_delete_case_with_bad_token_returns_unauthorized() {
        let app = Router::new().route(
            "/api/cases/{id}",
            axum::routing::delete(delete_case),
        );
        let req = Request::delete(format!("/api/cases/{}", Uuid::new_v4()))
            .header("authorization", "Bearer not-a-real-token")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
