/// Uploaded file metadata
///
/// The bytes live on disk under the uploads directory, keyed by `file`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct File {
    pub id: i64,

    /// Storage key on disk
    pub file: String,

    /// Client-supplied file name
    pub name: String,

    /// MIME type, e.g. `image`
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub mime_type: Option<String>,

    /// MIME subtype, e.g. `png`
    pub subtype: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl File {
    /// Public download path
    pub fn url(&self) -> String {
        format!("/files/{}", self.id)
    }

    /// Full content type, falling back to `application/octet-stream`
    pub fn content_type(&self) -> String {
        match (&self.mime_type, &self.subtype) {
            (Some(t), Some(s)) => format!("{}/{}", t, s),
            _ => "application/octet-stream".to_string(),
        }
    }
}

/// Input for recording an upload
#[derive(Debug, Clone)]
pub struct CreateFile {
    pub file: String,
    pub name: String,
    pub mime_type: Option<String>,
    pub subtype: Option<String>,
}

/// File as returned by the API, with its download url
#[derive(Debug, Clone, Serialize)]
pub struct FileView {
    #[serde(flatten)]
    pub file: File,

    pub url: String,
}

impl From<File> for FileView {
    fn from(file: File) -> Self {
        let url = file.url();
        Self { file, url }
    }
}
