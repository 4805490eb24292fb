use anyhow::{bail, Context, Result};
use rusqlite::Connection;

/// Schema steps in order; step `n` upgrades `user_version` from `n` to `n + 1`.
const SCHEMA_STEPS: &[&str] = &[include_str!("schemas/schema_v1.sql")];

fn latest_version() -> i32 {
    SCHEMA_STEPS.len() as i32
}

fn schema_version(conn: &Connection) -> Result<i32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .context("cannot read kv schema version")
}

/// Brings the `kv` schema up to date in one transaction. Refuses a file
/// written by a newer build.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let found = schema_version(conn)?;
    let latest = latest_version();

    if found > latest {
        bail!("kv schema v{found} is newer than this build understands (v{latest})");
    }
    if found == latest {
        return Ok(());
    }

    let tx = conn.transaction().context("cannot begin schema upgrade")?;
    for (step, sql) in SCHEMA_STEPS.iter().enumerate().skip(found.max(0) as usize) {
        tx.execute_batch(sql)
            .with_context(|| format!("schema step v{} failed", step + 1))?;
    }
    tx.pragma_update(None, "user_version", latest)
        .context("cannot record kv schema version")?;
    tx.commit().context("cannot commit schema upgrade")
}
