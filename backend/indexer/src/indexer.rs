//! Background task: poll the RPC and persist decoded events until cancelled.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::config::Config;
use crate::db;
use crate::rpc;

pub struct IndexerState {
    pub pool: SqlitePool,
    pub config: Config,
    pub client: Client,
}

pub async fn run(state: Arc<IndexerState>, shutdown: CancellationToken) {
    info!(contract = %state.config.contract_id, "Indexer starting");

    let last_ledger = db::get_last_ledger(&state.pool).await.unwrap_or(0);
    let mut cursor = db::get_cursor_string(&state.pool).await.unwrap_or(None);
    let mut current_ledger = if last_ledger > 0 {
        last_ledger as u32
    } else {
        state.config.start_ledger
    };
    info!("Resuming from ledger {current_ledger}");

    let interval = Duration::from_secs(state.config.poll_interval_secs);
    loop {
        let poll = poll_once(
            &state.pool,
            &state.client,
            &state.config,
            current_ledger,
            cursor.as_deref(),
        );
        tokio::select! {
            _ = shutdown.cancelled() => break,
            result = poll => match result {
                Ok((next_ledger, next_cursor)) => {
                    current_ledger = next_ledger;
                    cursor = next_cursor;
                }
                Err(e) => error!("Indexer poll error: {e}"),
            },
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    info!(ledger = current_ledger, "Indexer stopped");
}

/// One poll. Returns `(next_start_ledger, next_cursor)`.
#[instrument(skip(pool, client, config, cursor))]
async fn poll_once(
    pool: &SqlitePool,
    client: &Client,
    config: &Config,
    start_ledger: u32,
    cursor: Option<&str>,
) -> crate::errors::Result<(u32, Option<String>)> {
    let (raw_events, next_cursor, latest_ledger) = rpc::fetch_events(
        client,
        &config.rpc_url,
        &config.contract_id,
        start_ledger,
        cursor,
        config.events_per_page,
    )
    .await?;

    if !raw_events.is_empty() {
        let decoded = rpc::decode_events(&raw_events, &config.contract_id);
        let inserted = db::insert_events(pool, &decoded).await?;
        info!(
            fetched = raw_events.len(),
            stored = inserted,
            "Indexed event page"
        );
    }

    // With a cursor the next call paginates; `start_ledger` only matters
    // once the cursor is lost.
    let next_ledger = latest_ledger
        .map(|l| (l as u32).max(start_ledger))
        .unwrap_or(start_ledger);
    db::save_cursor(pool, next_ledger as i64, next_cursor.as_deref()).await?;

    Ok((next_ledger, next_cursor))
}
