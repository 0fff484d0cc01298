/// File upload and download
///
/// - `POST /files` - Multipart upload, field `file` (administrator or moderator)
/// - `GET /files/:id` - Download, public

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use taskboard_shared::models::file::{CreateFile, FileView};
use tracing::info;

/// Stores an uploaded file and records it
///
/// # Errors
///
/// - `413 Payload Too Large`: File over 2 MiB
/// - `422 Unprocessable Entity`: No `file` field in the form
pub async fn store(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<FileView>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let name = field.file_name().unwrap_or("upload").to_string();
        let (mime_type, subtype) = split_content_type(field.content_type());
        let bytes = field.bytes().await?;

        let key = state.storage.save(&bytes, subtype.as_deref()).await?;
        let file = state
            .gateway
            .create_file(CreateFile {
                file: key,
                name,
                mime_type,
                subtype,
            })
            .await?;

        info!(file_id = file.id, size = bytes.len(), "File uploaded");
        return Ok(Json(file.into()));
    }

    Err(ApiError::ValidationError(vec![ValidationErrorDetail {
        field: "file".to_string(),
        message: "File is required".to_string(),
    }]))
}

/// Streams a stored file back with its content type
pub async fn show(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Response> {
    let file = state
        .gateway
        .find_file(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("File {} not found", id)))?;

    let bytes = state.storage.read(&file.file).await?;
    let disposition = format!("inline; filename=\"{}\"", header_safe(&file.name));

    Ok((
        [
            (header::CONTENT_TYPE, file.content_type()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// Splits `type/subtype; params` into its two halves
fn split_content_type(content_type: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(essence) = content_type.map(|ct| ct.split(';').next().unwrap_or(ct).trim()) else {
        return (None, None);
    };

    match essence.split_once('/') {
        Some((mime_type, subtype)) if !mime_type.is_empty() && !subtype.is_empty() => (
            Some(mime_type.to_ascii_lowercase()),
            Some(subtype.to_ascii_lowercase()),
        ),
        _ => (None, None),
    }
}

/// Keeps only characters a quoted header parameter can carry
fn header_safe(name: &str) -> String {
    name.chars()
        .filter(|c| (c.is_ascii_graphic() || *c == ' ') && *c != '"' && *c != '\\')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_content_type() {
        assert_eq!(
            split_content_type(Some("image/png")),
            (Some("image".to_string()), Some("png".to_string()))
        );
        assert_eq!(
            split_content_type(Some("Text/Plain; charset=utf-8")),
            (Some("text".to_string()), Some("plain".to_string()))
        );
        assert_eq!(split_content_type(Some("garbage")), (None, None));
        assert_eq!(split_content_type(None), (None, None));
    }

    #[test]
    fn test_header_safe_strips_quotes() {
        assert_eq!(header_safe("a \"b\".png"), "a b.png");
        assert_eq!(header_safe("relatório.pdf"), "relatrio.pdf");
    }
}
