//! Conversor MCP Server
//!
//! Line-delimited JSON-RPC 2.0 over stdin/stdout. The unit catalog is
//! loaded once before the first request is read; logs go to stderr.
//!
//! Environment:
//! - CONVERSOR_CATALOG: catalog JSON file (embedded catalog when unset)
//! - CONVERSOR_SNAPSHOT: file holding the saved conversion (":memory:" to
//!   keep it in process)
//! - RUST_LOG: log filter (default "info")

mod config;
mod server;
mod snapshot;

use std::io;
use conversor_core::ConvertError;
use conversor_units::Catalog;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{ServerConfig, SnapshotTarget};
use crate::server::{McpRequest, McpResponse, Server, PROTOCOL_VERSION, SERVER_VERSION};
use crate::snapshot::{JsonFileStore, MemoryStore, SnapshotStore};

#[derive(Debug, Error)]
enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Catalog(#[from] ConvertError),
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn load_catalog(config: &ServerConfig) -> Result<Catalog, ServerError> {
    let catalog = match &config.catalog_path {
        Some(path) => {
            let text = tokio::fs::read_to_string(path).await?;
            let catalog = Catalog::from_json(&text)?;
            info!(path = %path.display(), categories = catalog.len(), "Catalog loaded");
            catalog
        }
        None => {
            let catalog = Catalog::builtin()?;
            info!(categories = catalog.len(), "Embedded catalog loaded");
            catalog
        }
    };
    Ok(catalog)
}

/// Answer one JSON-RPC request per input line until EOF
async fn serve<R, W>(server: &Server, input: R, mut output: W) -> Result<(), ServerError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    info!("Server ready, waiting for requests");

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        debug!(bytes = line.len(), "Received request");

        let response = match serde_json::from_str::<McpRequest>(line) {
            Ok(request) => {
                let response = server.handle_request(&request).await;
                // Notifications (no id) get no response
                if request.id.is_none() {
                    debug!(method = %request.method, "Notification processed");
                    continue;
                }
                response
            }
            Err(e) => {
                warn!(error = %e, "Error parsing request");
                McpResponse::parse_error(e)
            }
        };

        let mut payload = serde_json::to_vec(&response).map_err(io::Error::from)?;
        payload.push(b'\n');
        output.write_all(&payload).await?;
        output.flush().await?;
    }

    info!("Client disconnected (EOF), shutting down");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let config = ServerConfig::from_env();
    init_tracing(&config.log_filter);

    info!(version = SERVER_VERSION, protocol = PROTOCOL_VERSION, "Conversor MCP server starting");

    let catalog = load_catalog(&config).await?;
    let store: Box<dyn SnapshotStore> = match &config.snapshot {
        SnapshotTarget::File(path) => {
            let store = JsonFileStore::new(path.clone());
            info!(path = %store.path().display(), "Snapshots stored in file");
            Box::new(store)
        }
        SnapshotTarget::Memory => {
            info!("Snapshots kept in memory");
            Box::new(MemoryStore::new())
        }
    };

    let server = Server::new(catalog, store);
    serve(&server, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}
