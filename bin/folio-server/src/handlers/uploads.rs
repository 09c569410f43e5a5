//! Files received in multipart requests and kept below the upload root.
//!
//! Stored names are `<uuid>_<sanitized original name>` inside a per-feature
//! subdirectory; the database keeps the path relative to the upload root.

use std::path::Path;

use axum::extract::multipart::Field;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ServerError;

/// A file received in a multipart request, not yet written to disk.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '.' || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

/// Drain a file field, refusing anything over `max_bytes`. An empty part
/// yields `None`.
pub async fn read_file(mut field: Field<'_>, max_bytes: usize) -> Result<Option<Upload>, ServerError> {
    let name = field.file_name().unwrap_or("upload").to_owned();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_owned();
    let mut bytes = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Failed to read file chunk: {e}")))?
    {
        bytes.extend_from_slice(&chunk);
        if bytes.len() > max_bytes {
            return Err(ServerError::BadRequest(format!(
                "File too large: exceeds maximum of {max_bytes} bytes"
            )));
        }
    }
    debug!(file_name = %name, content_type = %content_type, size_bytes = bytes.len(), "received upload");
    Ok((!bytes.is_empty()).then_some(Upload { name, content_type, bytes }))
}

/// Write an upload to `root/subdir`; returns the path relative to `root`.
pub async fn store(root: &Path, subdir: &str, upload: &Upload) -> Result<String, ServerError> {
    let dir = root.join(subdir);
    tokio::fs::create_dir_all(&dir).await?;
    let stored_name = format!("{}_{}", Uuid::new_v4(), sanitize_filename(&upload.name));
    tokio::fs::write(dir.join(&stored_name), &upload.bytes).await?;
    info!(
        original_name = %upload.name,
        stored_name = %stored_name,
        size_bytes = upload.bytes.len(),
        "saved upload"
    );
    Ok(format!("{subdir}/{stored_name}"))
}

/// Read a stored file back. A missing file is a 404.
pub async fn load(root: &Path, relative: &str) -> Result<Vec<u8>, ServerError> {
    match tokio::fs::read(root.join(relative)).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ServerError::NotFound("File not found.".into()))
        }
        Err(e) => Err(e.into()),
    }
}
