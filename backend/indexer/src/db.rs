//! SQLite persistence: migrations, the poll cursor, the event log and the
//! per-project status projection.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::info;

use crate::errors::Result;
use crate::events::{EventKind, EventRecord, PlatformEvent, ProjectStatusRecord};

/// Open (creating if needed) the database and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Cursor
// ─────────────────────────────────────────────────────────

/// Last fully indexed ledger, `0` before the first poll.
pub async fn get_last_ledger(pool: &SqlitePool) -> Result<i64> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT last_ledger FROM indexer_cursor WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(v,)| v).unwrap_or(0))
}

pub async fn get_cursor_string(pool: &SqlitePool) -> Result<Option<String>> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT last_cursor FROM indexer_cursor WHERE id = 1")
            .fetch_optional(pool)
            .await?;
    Ok(row.and_then(|(v,)| v))
}

pub async fn save_cursor(
    pool: &SqlitePool,
    last_ledger: i64,
    last_cursor: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE indexer_cursor SET last_ledger = ?1, last_cursor = ?2 WHERE id = 1")
        .bind(last_ledger)
        .bind(last_cursor)
        .execute(pool)
        .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Writes
// ─────────────────────────────────────────────────────────

/// Store a batch of events in one transaction and fold new `status` events
/// into `project_status`.
///
/// Rows are keyed by `event_uid`, so replaying a page changes nothing.
/// Returns the number of new rows.
pub async fn insert_events(pool: &SqlitePool, events: &[PlatformEvent]) -> Result<usize> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;
    for ev in events {
        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO events
                (event_uid, event_type, project_id, actor, amount, status, phase_index,
                 ledger, timestamp, contract_id, tx_hash)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&ev.event_uid)
        .bind(&ev.event_type)
        .bind(&ev.project_id)
        .bind(&ev.actor)
        .bind(&ev.amount)
        .bind(&ev.status)
        .bind(ev.phase_index)
        .bind(ev.ledger)
        .bind(ev.timestamp)
        .bind(&ev.contract_id)
        .bind(&ev.tx_hash)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            continue;
        }
        count += 1;
        if ev.event_type == EventKind::StatusChanged.as_str() {
            apply_status(&mut tx, ev).await?;
        }
    }
    tx.commit().await?;
    Ok(count)
}

/// Events of one ledger arrive in emission order, so a later row at the same
/// ledger wins.
async fn apply_status(tx: &mut Transaction<'_, Sqlite>, ev: &PlatformEvent) -> Result<()> {
    let (Some(project_id), Some(status)) = (&ev.project_id, &ev.status) else {
        return Ok(());
    };
    sqlx::query(
        r#"
        INSERT INTO project_status (project_id, status, phase_index, ledger)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(project_id) DO UPDATE SET
            status      = excluded.status,
            phase_index = excluded.phase_index,
            ledger      = excluded.ledger,
            updated_at  = strftime('%s', 'now')
        WHERE excluded.ledger >= project_status.ledger
        "#,
    )
    .bind(project_id)
    .bind(status)
    .bind(ev.phase_index)
    .bind(ev.ledger)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Reads
// ─────────────────────────────────────────────────────────

const EVENT_COLUMNS: &str = "id, event_uid, event_type, project_id, actor, amount, status, \
                             phase_index, ledger, timestamp, contract_id, tx_hash, created_at";

/// Events of one project in ledger order.
pub async fn get_events_for_project(
    pool: &SqlitePool,
    project_id: &str,
) -> Result<Vec<EventRecord>> {
    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE project_id = ?1 ORDER BY ledger ASC, id ASC"
    );
    let rows = sqlx::query_as::<_, EventRecord>(&sql)
        .bind(project_id.to_lowercase())
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// All events in ledger order, optionally restricted to one `event_type`.
pub async fn get_all_events(
    pool: &SqlitePool,
    event_type: Option<&str>,
) -> Result<Vec<EventRecord>> {
    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM events \
         WHERE ?1 IS NULL OR event_type = ?1 \
         ORDER BY ledger ASC, id ASC"
    );
    let rows = sqlx::query_as::<_, EventRecord>(&sql)
        .bind(event_type)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn get_project_status(
    pool: &SqlitePool,
    project_id: &str,
) -> Result<Option<ProjectStatusRecord>> {
    let row = sqlx::query_as::<_, ProjectStatusRecord>(
        r#"
        SELECT project_id, status, phase_index, ledger, updated_at
        FROM   project_status
        WHERE  project_id = ?1
        "#,
    )
    .bind(project_id.to_lowercase())
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
