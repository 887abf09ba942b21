//! API handlers
//!
//! Dispatches parsed requests to the file-operation handlers. Every
//! path-bearing endpoint runs its inputs through the path guard inside the
//! storage module; handlers translate storage errors into JSON responses and
//! fire the change notification after successful mutations.

use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;

use crate::error::StorageError;
use crate::error::handlers::{storage_message, storage_status};
use crate::http::multipart;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::server::AppContext;
use crate::storage::validation::sanitize_filename;
use crate::storage::{operations, StoredFile};

/// Route a request to its handler.
pub async fn handle_request(ctx: &AppContext, request: Request) -> Response {
    let path = request.path.trim_matches('/').to_string();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (request.method.as_str(), segments.as_slice()) {
        ("GET", ["api", "files"]) => handle_list(ctx, &request),
        ("POST", ["api", "upload"]) => handle_upload(ctx, &request).await,
        ("GET", ["api", "download", filename]) => handle_download(ctx, filename),
        ("DELETE", ["api", "files", filename]) => handle_delete(ctx, &request, filename).await,
        ("PUT", ["api", "files", filename]) => handle_rename(ctx, &request, filename).await,
        ("POST", ["api", "refresh"]) => handle_refresh(ctx).await,

        (_, ["api", "files"])
        | (_, ["api", "upload"])
        | (_, ["api", "download", _])
        | (_, ["api", "files", _])
        | (_, ["api", "refresh"]) => Response::error(405, "Method not allowed"),

        _ => Response::error(404, "Not found"),
    }
}

/// Default translation of a storage error; `io_context` prefixes the
/// message for unexpected IO failures.
fn storage_response(err: &StorageError, io_context: &str) -> Response {
    match err {
        StorageError::PathEscape(requested) => {
            warn!("Rejected path escape attempt: {}", requested);
            Response::error(400, storage_message(err))
        }
        StorageError::IoError(e) => {
            error!("{}: {}", io_context, e);
            Response::error(500, &format!("{}: {}", io_context, e))
        }
        _ => Response::error(storage_status(err), storage_message(err)),
    }
}

fn requested_dir(request: &Request) -> String {
    request.query_param("path").unwrap_or("").to_string()
}

fn handle_list(ctx: &AppContext, request: &Request) -> Response {
    let dir = requested_dir(request);
    match operations::list_directory(&ctx.config.mount_root_path(), &dir) {
        Ok(entries) => Response::json(200, &entries),
        Err(e) => storage_response(&e, "Failed to read files"),
    }
}

async fn handle_upload(ctx: &AppContext, request: &Request) -> Response {
    let dir = requested_dir(request);
    let mount_root = ctx.config.mount_root_path();

    let boundary = match request.content_type().and_then(multipart::boundary_from_content_type) {
        Some(boundary) => boundary,
        None => return Response::error(400, "Expected multipart/form-data upload"),
    };

    let parts = match multipart::parse(&request.body, &boundary) {
        Ok(parts) => parts,
        Err(e) => {
            warn!("Rejected upload: {}", e);
            return Response::error(400, "Malformed upload body");
        }
    };

    if parts.is_empty() {
        return Response::error(400, "No files uploaded");
    }

    let mut stored: Vec<StoredFile> = Vec::with_capacity(parts.len());
    for part in &parts {
        let filename = match sanitize_filename(&part.filename) {
            Some(filename) => filename,
            None => return Response::error(400, "Invalid filename"),
        };

        match operations::store_file(&mount_root, &dir, &filename, &part.data) {
            Ok(file) => stored.push(file),
            // The upload contract reports a missing or non-directory target
            // as a bad request, not as not-found.
            Err(e @ StorageError::DirectoryNotFound(_))
            | Err(e @ StorageError::NotADirectory(_)) => {
                warn!("Upload into invalid target: {}", e);
                return Response::error(400, "Target directory does not exist");
            }
            Err(e) => return storage_response(&e, "Upload failed"),
        }
    }

    crate::notify::signal_change(&ctx.config.marker_file()).await;

    info!("Stored {} uploaded file(s) in '{}'", stored.len(), dir);
    Response::json(200, &json!({ "success": true, "files": stored }))
}

fn handle_download(ctx: &AppContext, filename: &str) -> Response {
    match operations::download_path(&ctx.config.mount_root_path(), filename) {
        Ok(path) => Response::file(path, filename),
        Err(e) => storage_response(&e, "Download failed"),
    }
}

async fn handle_delete(ctx: &AppContext, request: &Request, filename: &str) -> Response {
    let dir = requested_dir(request);
    match operations::delete_entry(&ctx.config.mount_root_path(), &dir, filename) {
        Ok(()) => {
            crate::notify::signal_change(&ctx.config.marker_file()).await;
            Response::json(200, &json!({ "success": true }))
        }
        Err(e) => storage_response(&e, "Failed to delete file"),
    }
}

#[derive(Deserialize)]
struct RenameBody {
    #[serde(rename = "newName")]
    new_name: String,
}

async fn handle_rename(ctx: &AppContext, request: &Request, filename: &str) -> Response {
    let body: RenameBody = match serde_json::from_slice(&request.body) {
        Ok(body) => body,
        Err(_) => return Response::error(400, "Invalid request body"),
    };
    if body.new_name.is_empty() {
        return Response::error(400, "Invalid filename");
    }

    let dir = requested_dir(request);
    match operations::rename_entry(
        &ctx.config.mount_root_path(),
        &dir,
        filename,
        &body.new_name,
    ) {
        Ok(new_name) => {
            crate::notify::signal_change(&ctx.config.marker_file()).await;
            Response::json(200, &json!({ "success": true, "newName": new_name }))
        }
        Err(e) => storage_response(&e, "Failed to rename file"),
    }
}

async fn handle_refresh(ctx: &AppContext) -> Response {
    match ctx.mount.refresh().await {
        Ok(()) => Response::json(200, &json!({ "success": true })),
        Err(e) => {
            error!("Refresh failed: {}", e);
            Response::error(500, "Failed to refresh mount")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::error::MountError;
    use crate::http::response::Body;
    use crate::mount::{MountManager, Mounter};
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    struct OkMounter;
    impl Mounter for OkMounter {
        fn mount(&self) -> Result<(), MountError> {
            Ok(())
        }
        fn unmount(&self) -> Result<(), MountError> {
            Ok(())
        }
    }

    struct BrokenMounter;
    impl Mounter for BrokenMounter {
        fn mount(&self) -> Result<(), MountError> {
            Err(MountError::CommandFailed {
                operation: "mount",
                detail: "no device".into(),
            })
        }
        fn unmount(&self) -> Result<(), MountError> {
            Ok(())
        }
    }

    fn test_context(root: &Path, mounter: Arc<dyn Mounter>) -> AppContext {
        let config = ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 3000,
            mount_root: root.to_string_lossy().to_string(),
            image_path: "/var/lib/shared.img".to_string(),
            fs_type: "exfat".to_string(),
            image_offset: 0,
            mount_uid: 1000,
            mount_gid: 1000,
            marker_path: root.join(".sync_needed").to_string_lossy().to_string(),
            mount_timeout_secs: 5,
            max_upload_mb: 16,
        };
        AppContext {
            mount: MountManager::new(mounter, Duration::from_secs(5)),
            config,
        }
    }

    fn setup() -> (tempfile::TempDir, AppContext) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let ctx = test_context(&root, Arc::new(OkMounter));
        (dir, ctx)
    }

    fn request(method: &str, path: &str, query: &[(&str, &str)], body: Vec<u8>) -> Request {
        let mut request = Request {
            method: method.to_string(),
            path: path.to_string(),
            query: HashMap::new(),
            headers: HashMap::new(),
            body,
        };
        for (name, value) in query {
            request
                .query
                .insert(name.to_string(), value.to_string());
        }
        request
    }

    fn body_json(response: &Response) -> serde_json::Value {
        match &response.body {
            Body::Bytes(bytes) => serde_json::from_slice(bytes).unwrap(),
            Body::File(_) => panic!("expected a bytes body"),
        }
    }

    fn multipart_body(files: &[(&str, &str)]) -> (String, Vec<u8>) {
        let mut body = Vec::new();
        for (filename, content) in files {
            body.extend_from_slice(b"--BOUND\r\n");
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\n\r\n",
                    filename
                )
                .as_bytes(),
            );
            body.extend_from_slice(content.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(b"--BOUND--\r\n");
        (
            "multipart/form-data; boundary=BOUND".to_string(),
            body,
        )
    }

    #[tokio::test]
    async fn test_list_route() {
        let (dir, ctx) = setup();
        fs::write(dir.path().join("a.txt"), "hello").unwrap();

        let response = handle_request(&ctx, request("GET", "/api/files", &[], Vec::new())).await;

        assert_eq!(response.status, 200);
        let entries = body_json(&response);
        assert_eq!(entries.as_array().unwrap().len(), 1);
        assert_eq!(entries[0]["name"], "a.txt");
        assert_eq!(entries[0]["size"], 5);
        assert_eq!(entries[0]["isDirectory"], false);
    }

    #[tokio::test]
    async fn test_list_escape_is_invalid_path() {
        let (_dir, ctx) = setup();

        let response = handle_request(
            &ctx,
            request("GET", "/api/files", &[("path", "../../etc")], Vec::new()),
        )
        .await;

        assert_eq!(response.status, 400);
        assert_eq!(body_json(&response)["error"], "Invalid path");
    }

    #[tokio::test]
    async fn test_list_missing_directory_404() {
        let (_dir, ctx) = setup();

        let response = handle_request(
            &ctx,
            request("GET", "/api/files", &[("path", "nope")], Vec::new()),
        )
        .await;

        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_upload_two_files_to_root() {
        let (dir, ctx) = setup();
        let (content_type, body) = multipart_body(&[("a.txt", "aaa"), ("b.txt", "bb")]);

        let mut req = request("POST", "/api/upload", &[], body);
        req.headers.insert("content-type".into(), content_type);
        let response = handle_request(&ctx, req).await;

        assert_eq!(response.status, 200);
        let json = body_json(&response);
        assert_eq!(json["success"], true);
        assert_eq!(json["files"][0]["name"], "a.txt");
        assert_eq!(json["files"][0]["size"], 3);
        assert_eq!(json["files"][1]["name"], "b.txt");
        assert!(dir.path().join("a.txt").exists());
        assert!(dir.path().join("b.txt").exists());
        // Mutation hint fired.
        assert!(Path::new(&ctx.config.marker_path).exists());
    }

    #[tokio::test]
    async fn test_upload_into_missing_directory_400() {
        let (_dir, ctx) = setup();
        let (content_type, body) = multipart_body(&[("a.txt", "aaa")]);

        let mut req = request("POST", "/api/upload", &[("path", "missing")], body);
        req.headers.insert("content-type".into(), content_type);
        let response = handle_request(&ctx, req).await;

        assert_eq!(response.status, 400);
        assert_eq!(
            body_json(&response)["error"],
            "Target directory does not exist"
        );
    }

    #[tokio::test]
    async fn test_upload_without_multipart_400() {
        let (_dir, ctx) = setup();
        let response =
            handle_request(&ctx, request("POST", "/api/upload", &[], b"raw".to_vec())).await;
        assert_eq!(response.status, 400);
    }

    #[tokio::test]
    async fn test_download_existing_file() {
        let (dir, ctx) = setup();
        fs::write(dir.path().join("a.txt"), "hello").unwrap();

        let response =
            handle_request(&ctx, request("GET", "/api/download/a.txt", &[], Vec::new())).await;

        assert_eq!(response.status, 200);
        assert!(matches!(response.body, Body::File(_)));
    }

    #[tokio::test]
    async fn test_download_missing_file_404() {
        let (_dir, ctx) = setup();
        let response =
            handle_request(&ctx, request("GET", "/api/download/nope", &[], Vec::new())).await;
        assert_eq!(response.status, 404);
        assert_eq!(body_json(&response)["error"], "File not found");
    }

    #[tokio::test]
    async fn test_delete_directory_recursively() {
        let (dir, ctx) = setup();
        fs::create_dir_all(dir.path().join("sub/deep")).unwrap();
        fs::write(dir.path().join("sub/deep/x.txt"), "x").unwrap();

        let response =
            handle_request(&ctx, request("DELETE", "/api/files/sub", &[], Vec::new())).await;

        assert_eq!(response.status, 200);
        assert_eq!(body_json(&response)["success"], true);
        assert!(!dir.path().join("sub").exists());
    }

    #[tokio::test]
    async fn test_rename_collision_is_reported() {
        let (dir, ctx) = setup();
        fs::write(dir.path().join("old.txt"), "old").unwrap();
        fs::write(dir.path().join("new.txt"), "new").unwrap();

        let body = serde_json::to_vec(&json!({"newName": "new.txt"})).unwrap();
        let response =
            handle_request(&ctx, request("PUT", "/api/files/old.txt", &[], body)).await;

        assert_eq!(response.status, 400);
        assert_eq!(
            body_json(&response)["error"],
            "File with that name already exists"
        );
        assert!(dir.path().join("old.txt").exists());
        assert!(dir.path().join("new.txt").exists());
    }

    #[tokio::test]
    async fn test_rename_success_returns_new_name() {
        let (dir, ctx) = setup();
        fs::write(dir.path().join("old.txt"), "data").unwrap();

        let body = serde_json::to_vec(&json!({"newName": "renamed.txt"})).unwrap();
        let response =
            handle_request(&ctx, request("PUT", "/api/files/old.txt", &[], body)).await;

        assert_eq!(response.status, 200);
        let json = body_json(&response);
        assert_eq!(json["success"], true);
        assert_eq!(json["newName"], "renamed.txt");
        assert!(dir.path().join("renamed.txt").exists());
    }

    #[tokio::test]
    async fn test_rename_with_bad_body_400() {
        let (dir, ctx) = setup();
        fs::write(dir.path().join("old.txt"), "data").unwrap();

        let response = handle_request(
            &ctx,
            request("PUT", "/api/files/old.txt", &[], b"not json".to_vec()),
        )
        .await;

        assert_eq!(response.status, 400);
    }

    #[tokio::test]
    async fn test_refresh_success() {
        let (_dir, ctx) = setup();
        let response =
            handle_request(&ctx, request("POST", "/api/refresh", &[], Vec::new())).await;
        assert_eq!(response.status, 200);
        assert_eq!(body_json(&response)["success"], true);
    }

    #[tokio::test]
    async fn test_refresh_failure_500() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let ctx = test_context(&root, Arc::new(BrokenMounter));

        let response =
            handle_request(&ctx, request("POST", "/api/refresh", &[], Vec::new())).await;

        assert_eq!(response.status, 500);
        assert_eq!(body_json(&response)["error"], "Failed to refresh mount");
    }

    #[tokio::test]
    async fn test_unknown_route_404() {
        let (_dir, ctx) = setup();
        let response =
            handle_request(&ctx, request("GET", "/api/unknown", &[], Vec::new())).await;
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_wrong_method_405() {
        let (_dir, ctx) = setup();
        let response =
            handle_request(&ctx, request("PATCH", "/api/files", &[], Vec::new())).await;
        assert_eq!(response.status, 405);
    }
}
