// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.homeledger", "Homeledger", "homeledger"));

pub const DB_ENV: &str = "HOMELEDGER_DB";

pub fn db_path() -> Result<PathBuf> {
    if let Ok(p) = std::env::var(DB_ENV) {
        if !p.trim().is_empty() {
            return Ok(PathBuf::from(p.trim()));
        }
    }
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("homeledger.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    open_at(&path)
}

pub fn open_at(path: &Path) -> Result<Connection> {
    let mut conn =
        Connection::open(path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    tracing::debug!(path = %path.display(), "database ready");
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("Open in-memory DB")?;
    init_schema(&mut conn)?;
    Ok(conn)
}

fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS workspaces(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS accounts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        workspace_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        balance TEXT NOT NULL,
        initial_balance TEXT NOT NULL, -- signed opening balance
        is_credit INTEGER NOT NULL DEFAULT 0,
        last_four_digits TEXT,
        on_hold INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(workspace_id, name),
        FOREIGN KEY(workspace_id) REFERENCES workspaces(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        workspace_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        monthly_budget TEXT NOT NULL DEFAULT '0',
        is_expense INTEGER NOT NULL DEFAULT 1,
        actual_spent TEXT NOT NULL DEFAULT '0',
        on_hold INTEGER NOT NULL DEFAULT 0,
        UNIQUE(workspace_id, name),
        FOREIGN KEY(workspace_id) REFERENCES workspaces(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        workspace_id INTEGER NOT NULL,
        date TEXT NOT NULL,
        amount TEXT NOT NULL,
        type TEXT NOT NULL CHECK(type IN ('income','expense','refund','transfer')),
        merchant TEXT,
        payer TEXT,
        note TEXT,
        account_id INTEGER NOT NULL,
        receiving_account_id INTEGER,
        category_id INTEGER,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(workspace_id) REFERENCES workspaces(id) ON DELETE CASCADE,
        FOREIGN KEY(account_id) REFERENCES accounts(id),
        FOREIGN KEY(receiving_account_id) REFERENCES accounts(id),
        FOREIGN KEY(category_id) REFERENCES categories(id)
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_ws_date ON transactions(workspace_id, date);

    CREATE TABLE IF NOT EXISTS receipts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        transaction_id INTEGER NOT NULL UNIQUE,
        timestamp TEXT NOT NULL,
        image BLOB NOT NULL,
        ocr_text TEXT,
        FOREIGN KEY(transaction_id) REFERENCES transactions(id) ON DELETE CASCADE
    );

    -- Per-workspace editor defaults (last used account / category)
    CREATE TABLE IF NOT EXISTS workspace_preferences(
        workspace_id INTEGER PRIMARY KEY,
        default_account_id INTEGER,
        default_category_id INTEGER,
        FOREIGN KEY(workspace_id) REFERENCES workspaces(id) ON DELETE CASCADE
    );
    "#,
    )?;
    Ok(())
}
