//! HTTP API for the skiff account store.
//!
//! Provides a [`StoreServer`] exposing an axum-based API over any
//! [`EntryStore`] implementation:
//!
//! - `GET /account/{addr}/store` — return the root entry
//! - `GET /account/{addr}/store/{key}` — return one entry
//! - `POST /account/{addr}/store/{key}` — create or update an entry
//!   (body: `{parent, value, signature, public_key}`)
//! - `DELETE /account/{addr}/store/{key}` — remove a leaf entry
//!
//! Reads return `200` with the JSON entry; writes return `200`; deletes
//! return `204`. Missing accounts or keys are `404` with the stable body
//! `{"error": "store: key not found"}`; malformed bodies, bad signatures,
//! and tree-shape violations are `400`; other backend failures on writes
//! are `500`.
//!
//! Account authentication sits in front of this router in the full server;
//! here the signature check on `POST` is the only gate, which is what the
//! storage contract requires of this layer.

mod error;
mod handlers;


use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use skiff_store::EntryStore;

pub use error::ApiError;

/// Shared application state for all handlers.
#[derive(Clone)]
pub(crate) struct AppState {
    /// The entry store (trait object — file-backed or in-memory).
    pub store: Arc<dyn EntryStore>,
}

/// Configuration for creating a [`StoreServer`].
pub struct StoreServerConfig {
    /// The entry store to serve.
    pub store: Arc<dyn EntryStore>,
}

/// HTTP server for the account store, backed by any [`EntryStore`].
pub struct StoreServer {
    router: Router,
}

impl StoreServer {
    /// Create a new server with the given configuration.
    pub fn new(config: StoreServerConfig) -> Self {
        let state = AppState {
            store: config.store,
        };
        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the axum [`Router`] for the store API.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/account/{addr}/store", get(handlers::get_root))
            .route(
                "/account/{addr}/store/{key}",
                get(handlers::get_entry)
                    .post(handlers::update_entry)
                    .delete(handlers::delete_entry),
            )
            .with_state(state)
    }

    /// Return the inner [`Router`] (useful for testing with `tower::ServiceExt`).
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve the store API on the given TCP address.
    pub async fn serve(self, addr: &str) -> Result<(), std::io::Error> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(addr, "store API listening");
        axum::serve(listener, self.router).await
    }

    /// Serve with graceful shutdown triggered by the given future.
    ///
    /// When `shutdown` completes, the server stops accepting new
    /// connections and waits for in-flight requests to finish.
    pub async fn serve_with_shutdown(
        self,
        addr: &str,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), std::io::Error> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(addr, "store API listening");
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
