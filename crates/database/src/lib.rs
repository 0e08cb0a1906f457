//! Replay-memory persistence for training transitions.
//!
//! Finished self-play games stream their labeled transitions here; the
//! trainer samples uniform batches back out. Retention is bounded: rows
//! beyond [`REPLAY_CAPACITY`](tempo_core::REPLAY_CAPACITY) are evicted
//! oldest-first, tracked by monotonic transition and game ids.
//!
//! - [`db()`] — Establishes a database connection from `DB_URL`
//! - [`Replay`] — The transitions table: push, sample, retention
mod replay;
mod schema;

pub use replay::*;
pub use schema::*;

use std::sync::Arc;
use tokio_postgres::Client;

/// Establishes a database connection.
///
/// Connects to PostgreSQL using the `DB_URL` environment variable.
/// Returns an `Arc<Client>` suitable for sharing across async tasks.
///
/// # Panics
///
/// Panics if `DB_URL` is not set or if connection fails; there is no
/// degraded mode without a replay store.
pub async fn db() -> Arc<Client> {
    log::info!("connecting to database");
    let tls = tokio_postgres::tls::NoTls;
    let ref url = std::env::var("DB_URL").expect("DB_URL must be set");
    let (client, connection) = tokio_postgres::connect(url, tls)
        .await
        .expect("database connection failed");
    tokio::spawn(connection);
    client
        .execute("SET client_min_messages TO WARNING", &[])
        .await
        .expect("set client_min_messages");
    Arc::new(client)
}

/// PostgreSQL error type alias.
pub type PgErr = tokio_postgres::Error;
