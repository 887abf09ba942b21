//! Server core
//!
//! Binds the listener and runs the accept loop, spawning one task per
//! connection. Each connection carries a single request/response exchange.

use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::config::ServerConfig;
use crate::error::HttpError;
use crate::error::handlers::http_status;
use crate::http::response::Response;
use crate::http::{handle_request, read_request};
use crate::mount::MountManager;

/// Shared state handed to every connection task.
pub struct AppContext {
    pub config: ServerConfig,
    pub mount: MountManager,
}

pub struct Server {
    listener: TcpListener,
    ctx: Arc<AppContext>,
}

impl Server {
    pub async fn bind(config: ServerConfig, mount: MountManager) -> std::io::Result<Self> {
        let addr = config.socket_addr();
        let listener = TcpListener::bind(&addr).await?;
        info!("Server bound to {}", addr);
        info!("Serving mount root {}", config.mount_root);

        Ok(Self {
            listener,
            ctx: Arc::new(AppContext { config, mount }),
        })
    }

    /// Address the listener actually bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Kick off the startup mount as a detached task.
    ///
    /// The serving path never waits for it: the server accepts connections
    /// before the volume is guaranteed attached, and early requests fail at
    /// the filesystem layer instead.
    pub fn spawn_startup_mount(&self) {
        let ctx = Arc::clone(&self.ctx);
        tokio::spawn(async move {
            ctx.mount.ensure_mounted().await;
        });
    }

    pub async fn start(&self) {
        info!("Accepting connections");

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let ctx = Arc::clone(&self.ctx);

                    // Spawn a task for each connection so the accept loop
                    // doesn't block.
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, ctx).await {
                            warn!("Connection {} failed: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    ctx: Arc<AppContext>,
) -> std::io::Result<()> {
    let max_body = ctx.config.max_upload_bytes();
    let mut reader = BufReader::new(stream);

    let response = match read_request(&mut reader, max_body).await {
        Ok(request) => {
            info!("{} {} from {}", request.method, request.path, addr);
            handle_request(&ctx, request).await
        }
        Err(HttpError::IoError(e)) => {
            // Stream died mid-request; nothing sensible left to send.
            return Err(e);
        }
        Err(e) => {
            warn!("Bad request from {}: {}", addr, e);
            Response::error(http_status(&e), "Bad request")
        }
    };

    let mut stream = reader.into_inner();
    response.write_to(&mut stream).await?;
    stream.shutdown().await
}
