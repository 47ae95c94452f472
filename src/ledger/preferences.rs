// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Per-workspace editor defaults: the last account and expense category used.

use crate::errors::LedgerResult;
use crate::models::{LedgerEntry, TransactionType};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EditorDefaults {
    pub account_id: Option<i64>,
    pub category_id: Option<i64>,
}

pub fn load(conn: &Connection, ws: i64) -> LedgerResult<EditorDefaults> {
    let row: Option<(Option<i64>, Option<i64>)> = conn
        .query_row(
            "SELECT default_account_id, default_category_id FROM workspace_preferences WHERE workspace_id=?1",
            params![ws],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    Ok(row
        .map(|(account_id, category_id)| EditorDefaults {
            account_id,
            category_id,
        })
        .unwrap_or_default())
}

pub fn save(conn: &Connection, ws: i64, defaults: &EditorDefaults) -> LedgerResult<()> {
    conn.execute(
        "INSERT INTO workspace_preferences(workspace_id, default_account_id, default_category_id)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(workspace_id) DO UPDATE SET
             default_account_id=excluded.default_account_id,
             default_category_id=excluded.default_category_id",
        params![ws, defaults.account_id, defaults.category_id],
    )?;
    Ok(())
}

/// Remembers the sending account, and the category for expense/refund.
pub(crate) fn remember(conn: &Connection, ws: i64, entry: &LedgerEntry) -> LedgerResult<()> {
    let mut defaults = load(conn, ws)?;
    defaults.account_id = Some(entry.account_id);
    if matches!(entry.tx_type, TransactionType::Expense | TransactionType::Refund) {
        if let Some(c) = entry.category_id {
            defaults.category_id = Some(c);
        }
    }
    save(conn, ws, &defaults)
}
