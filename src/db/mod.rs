pub mod migrations;
pub mod queries;

use anyhow::Context;
use rusqlite::Connection;

pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).context("failed to open database")?;

    // WAL is meaningless for in-memory databases and reports "memory".
    if path != ":memory:" {
        conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))
            .context("failed to set database pragmas")?;
    }

    migrations::run_migrations(&conn)?;

    Ok(conn)
}
