//! Streaming HTTP download of one resource file
//!
//! Downloads are written to disk chunk by chunk as the body arrives, so a
//! resource file of any size can be fetched without buffering it in memory.
//! A single attempt per call; retries are the caller's business (and this tool
//! deliberately has none).

use crate::error::{Error, Result};
use futures::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Download `url` to `dest`, replacing any existing file at that path.
///
/// Success means the server answered with status 200 exactly and the whole
/// body was written and flushed. On any failure the partially-written
/// destination file is removed before the error is returned; a failure of that
/// removal is logged and swallowed so it never masks the original error.
pub async fn fetch(client: &reqwest::Client, url: &Url, dest: &Path) -> Result<()> {
    match stream_to_file(client, url, dest).await {
        Ok(()) => Ok(()),
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_file(dest).await
                && cleanup.kind() != std::io::ErrorKind::NotFound
            {
                tracing::warn!(
                    path = %dest.display(),
                    error = %cleanup,
                    "failed to remove partial download"
                );
            }
            Err(e)
        }
    }
}

async fn stream_to_file(client: &reqwest::Client, url: &Url, dest: &Path) -> Result<()> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| Error::Transport {
            url: url.to_string(),
            source: e,
        })?;

    // Status must be exactly 200; a 2xx redirect leftover or 206 would mean
    // we did not get the whole file the way we asked for it.
    let status = response.status();
    if status.as_u16() != 200 {
        return Err(Error::Remote {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| Error::Write {
            path: dest.to_path_buf(),
            source: e,
        })?;

    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| Error::Transport {
            url: url.to_string(),
            source: e,
        })?;
        file.write_all(&chunk).await.map_err(|e| Error::Write {
            path: dest.to_path_buf(),
            source: e,
        })?;
    }

    file.flush().await.map_err(|e| Error::Write {
        path: dest.to_path_buf(),
        source: e,
    })?;

    Ok(())
}
