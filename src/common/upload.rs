use std::io;
use std::path::Path;

use anyhow::{Result, anyhow};
use axum::extract::multipart::Field;
use futures_util::TryStreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;
use tracing::{error, info};

fn accepted_content_type(content_type: &str) -> bool {
    content_type.starts_with("video/")
}

/// Streams one multipart field to `dest`, removing the partial file on error.
/// Returns the number of bytes written.
pub async fn stream_to_file(field: Field<'_>, dest: &Path) -> Result<u64> {
    let content_type = field
        .content_type()
        .unwrap_or_default()
        .to_string();

    if !accepted_content_type(&content_type) {
        return Err(anyhow!("Invalid content type: only video/* allowed"));
    }

    let body = field.map_err(io::Error::other);
    let reader = StreamReader::new(body);
    tokio::pin!(reader);

    let mut file = File::create(dest).await?;
    let copied = tokio::io::copy(&mut reader, &mut file).await;
    let written = match copied {
        Ok(n) => n,
        Err(e) => {
            error!("Upload stream error: {}", e);
            drop(file);
            let _ = tokio::fs::remove_file(dest).await;
            return Err(anyhow!("Stream interrupted"));
        }
    };
    file.flush().await?;

    info!(path = %dest.display(), bytes = written, "upload stored");
    Ok(written)
}
