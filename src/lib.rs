//! Ledger is a web service for keeping a per-user ledger of income and expenses.
//!
//! This library provides a JSON REST API for creating, listing, getting,
//! updating and deleting transactions. Every transaction belongs to exactly
//! one user and all transactions are kept in a single JSON document that is
//! safe to share between concurrent requests.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod app_state;
mod endpoints;
mod error;
mod logging;
mod pagination;
mod routing;
mod stores;
mod transaction;
mod user;

pub use app_state::AppState;
pub use error::Error;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use pagination::{Pagination, PaginationConfig};
pub use routing::build_router;
pub use stores::{FileStorage, MemoryStorage, Modification, Storage, TransactionStore};
pub use transaction::{
    AmountInput, FieldInput, Ledger, NormalizedTransaction, SortField, SortOrder, Summary,
    Transaction, TransactionFilters, TransactionId, TransactionInput, TransactionPage,
    TransactionType, Validation, merge, normalize, parse_timestamp, summarize, validate,
};
pub use user::{USER_ID_HEADER, UserId};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
