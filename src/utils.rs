// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::store;
use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Installs the fmt subscriber once. `RUST_LOG` overrides the default level.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("homeledger=info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

pub fn fmt_money(d: &Decimal) -> String {
    format!("{:.2}", d.round_dp(2))
}

/// A required argument; clap enforces presence, this only avoids a panic.
pub fn required<'a>(sub: &'a clap::ArgMatches, name: &str) -> Result<&'a String> {
    sub.get_one::<String>(name)
        .ok_or_else(|| anyhow!("Missing argument '{}'", name))
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

pub const ACTIVE_WORKSPACE: &str = "active_workspace";

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let v: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key=?1",
            params![key],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub fn clear_setting(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM settings WHERE key=?1", params![key])?;
    Ok(())
}

/// Workspace id from `--workspace`, else the stored active workspace.
pub fn resolve_workspace(conn: &Connection, explicit: Option<&str>) -> Result<i64> {
    if let Some(name) = explicit {
        return Ok(store::workspace_by_name(conn, name)?.id);
    }
    let active = get_setting(conn, ACTIVE_WORKSPACE)?.context(
        "No active workspace; create one with `workspace add <name>` or pass --workspace",
    )?;
    let id: i64 = active
        .parse()
        .with_context(|| format!("Invalid active workspace setting '{}'", active))?;
    Ok(store::get_workspace(conn, id)
        .context("Active workspace no longer exists; pick one with `workspace use <name>`")?
        .id)
}

pub fn account_id(conn: &Connection, ws: i64, name: &str) -> Result<i64> {
    Ok(store::account_by_name(conn, ws, name)
        .with_context(|| format!("Account '{}' not found", name))?
        .id)
}

pub fn category_id(conn: &Connection, ws: i64, name: &str) -> Result<i64> {
    Ok(store::category_by_name(conn, ws, name)
        .with_context(|| format!("Category '{}' not found", name))?
        .id)
}
