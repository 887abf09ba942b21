//! HTTP response serialization
//!
//! Builds JSON and file responses and writes them to the connection. Every
//! response closes its connection; the service does not do keep-alive.

use log::error;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Response payload.
pub enum Body {
    Bytes(Vec<u8>),
    /// Streamed from disk at write time.
    File(PathBuf),
}

pub struct Response {
    pub status: u16,
    content_type: &'static str,
    content_disposition: Option<String>,
    pub body: Body,
}

impl Response {
    /// A JSON response from any serializable value.
    pub fn json<T: Serialize>(status: u16, value: &T) -> Response {
        match serde_json::to_vec(value) {
            Ok(bytes) => Response {
                status,
                content_type: "application/json",
                content_disposition: None,
                body: Body::Bytes(bytes),
            },
            Err(e) => {
                error!("Failed to encode response body: {}", e);
                Response::error(500, "Internal server error")
            }
        }
    }

    /// A JSON error body: `{"error": message}`.
    pub fn error(status: u16, message: &str) -> Response {
        Response {
            status,
            content_type: "application/json",
            content_disposition: None,
            body: Body::Bytes(json!({ "error": message }).to_string().into_bytes()),
        }
    }

    /// A file download, served as an attachment.
    pub fn file(path: PathBuf, filename: &str) -> Response {
        Response {
            status: 200,
            content_type: "application/octet-stream",
            content_disposition: Some(format!(
                "attachment; filename=\"{}\"",
                filename.replace('"', "")
            )),
            body: Body::File(path),
        }
    }

    /// Write the response and its body to the stream.
    pub async fn write_to<W: AsyncWrite + Unpin>(self, writer: &mut W) -> std::io::Result<()> {
        match self.body {
            Body::Bytes(bytes) => {
                write_head(
                    writer,
                    self.status,
                    self.content_type,
                    self.content_disposition.as_deref(),
                    bytes.len() as u64,
                )
                .await?;
                writer.write_all(&bytes).await?;
            }
            Body::File(path) => match tokio::fs::File::open(&path).await {
                Ok(mut file) => {
                    let length = file.metadata().await?.len();
                    write_head(
                        writer,
                        self.status,
                        self.content_type,
                        self.content_disposition.as_deref(),
                        length,
                    )
                    .await?;
                    tokio::io::copy(&mut file, writer).await?;
                }
                Err(e) => {
                    // The path was checked before routing here; losing the
                    // file now means the volume went away underneath us.
                    error!("Failed to open {} for download: {}", path.display(), e);
                    let bytes = json!({ "error": "Failed to read file" })
                        .to_string()
                        .into_bytes();
                    write_head(writer, 500, "application/json", None, bytes.len() as u64)
                        .await?;
                    writer.write_all(&bytes).await?;
                }
            },
        }
        writer.flush().await
    }
}

async fn write_head<W: AsyncWrite + Unpin>(
    writer: &mut W,
    status: u16,
    content_type: &str,
    content_disposition: Option<&str>,
    content_length: u64,
) -> std::io::Result<()> {
    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        status,
        reason_phrase(status),
        content_type,
        content_length
    );
    if let Some(disposition) = content_disposition {
        head.push_str("Content-Disposition: ");
        head.push_str(disposition);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    writer.write_all(head.as_bytes()).await
}

pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
