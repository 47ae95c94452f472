// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::sharing::{self, LogTransport};
use crate::ledger::store;
use crate::utils::{
    ACTIVE_WORKSPACE, clear_setting, get_setting, pretty_table, required, resolve_workspace,
    set_setting,
};
use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, explicit: Option<&str>, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let ws = store::create_workspace(conn, required(sub, "name")?)?;
            set_setting(conn, ACTIVE_WORKSPACE, &ws.id.to_string())?;
            println!("Created workspace '{}' (now active)", ws.name);
        }
        Some(("list", _)) => {
            let active = get_setting(conn, ACTIVE_WORKSPACE)?;
            let data = store::list_workspaces(conn)?
                .into_iter()
                .map(|w| {
                    let mark = if active.as_deref() == Some(w.id.to_string().as_str()) {
                        "*"
                    } else {
                        ""
                    };
                    vec![mark.to_string(), w.id.to_string(), w.name]
                })
                .collect();
            println!("{}", pretty_table(&["", "ID", "Name"], data));
        }
        Some(("use", sub)) => {
            let ws = store::workspace_by_name(conn, required(sub, "name")?)?;
            set_setting(conn, ACTIVE_WORKSPACE, &ws.id.to_string())?;
            println!("Active workspace: '{}'", ws.name);
        }
        Some(("rename", sub)) => {
            let ws = store::workspace_by_name(conn, required(sub, "name")?)?;
            let renamed = store::rename_workspace(conn, ws.id, required(sub, "new_name")?)?;
            println!("Renamed workspace '{}' to '{}'", ws.name, renamed.name);
        }
        Some(("rm", sub)) => {
            let ws = store::workspace_by_name(conn, required(sub, "name")?)?;
            store::delete_workspace(conn, ws.id)
                .with_context(|| format!("Remove workspace '{}'", ws.name))?;
            if get_setting(conn, ACTIVE_WORKSPACE)? == Some(ws.id.to_string()) {
                clear_setting(conn, ACTIVE_WORKSPACE)?;
            }
            println!("Removed workspace '{}' and everything in it", ws.name);
        }
        Some(("share", _)) => {
            let id = resolve_workspace(conn, explicit)?;
            let ws = sharing::share_workspace(conn, id, &LogTransport)?;
            println!("Shared workspace '{}' (id {})", ws.name, ws.id);
        }
        _ => {}
    }
    Ok(())
}
