// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::{Discrepancy, LedgerResult};
use crate::ledger::{reconcile, store};
use crate::models::Workspace;
use rusqlite::Connection;

/// Sharing/sync collaborator. It is told about a shared workspace and owns
/// everything past that point.
pub trait ShareTransport {
    fn workspace_shared(&self, workspace: &Workspace);
}

/// Transport that only records the share in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransport;

impl ShareTransport for LogTransport {
    fn workspace_shared(&self, workspace: &Workspace) {
        tracing::info!(workspace = workspace.id, name = %workspace.name, "workspace shared");
    }
}

pub fn share_workspace(
    conn: &Connection,
    ws: i64,
    transport: &dyn ShareTransport,
) -> LedgerResult<Workspace> {
    let workspace = store::get_workspace(conn, ws)?;
    transport.workspace_shared(&workspace);
    Ok(workspace)
}

/// Called once a sync collaborator has merged remote transaction rows.
/// Totals are re-derived through the apply table.
pub fn after_remote_merge(conn: &mut Connection, ws: i64) -> LedgerResult<Vec<Discrepancy>> {
    let fixed = reconcile::rebuild_workspace(conn, ws)?;
    if !fixed.is_empty() {
        tracing::info!(workspace = ws, corrected = fixed.len(), "totals re-derived after merge");
    }
    Ok(fixed)
}
