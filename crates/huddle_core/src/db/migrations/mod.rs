//! Embedded schema migrations for the meeting store.
//!
//! # Responsibility
//! - Keep the ordered list of SQL steps compiled into the binary.
//! - Bring a connection from its recorded version up to `latest_version()`.
//!
//! # Invariants
//! - Step versions start at 1 and increase by exactly 1.
//! - `PRAGMA user_version` always names the last applied step.
//! - All pending steps commit together or not at all.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::{Connection, TransactionBehavior};

/// One embedded schema step.
struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "init",
        sql: include_str!("0001_init.sql"),
    },
    SchemaStep {
        version: 2,
        name: "participant_indexes",
        sql: include_str!("0002_participant_indexes.sql"),
    },
];

/// Schema version this build writes and expects.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Upgrades `conn` to `latest_version()`.
///
/// Fails with `UnsupportedSchemaVersion` when the file was written by a
/// newer build; such files are left untouched. Connections opening the same
/// fresh file concurrently queue on the writer lock and only the first one
/// runs the pending steps.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let latest = latest_version();
    if current_user_version(conn)? == latest {
        return Ok(());
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    // Re-read under the writer lock.
    let from_version = current_user_version(&tx)?;
    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }

    let pending = pending_steps(from_version);
    if pending.is_empty() {
        return Ok(());
    }

    for step in pending {
        debug!(
            "event=db_migrate_step module=db status=start version={} name={}",
            step.version, step.name
        );
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={from_version} to_version={latest}");
    Ok(())
}

pub(crate) fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))?)
}

fn pending_steps(applied: u32) -> &'static [SchemaStep] {
    let start = SCHEMA_STEPS.partition_point(|step| step.version <= applied);
    &SCHEMA_STEPS[start..]
}
