// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::Discrepancy;
use crate::ledger::reconcile;
use crate::utils::{fmt_money, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

fn table(items: &[Discrepancy]) -> comfy_table::Table {
    let rows = items
        .iter()
        .map(|d| {
            vec![
                d.aggregate.to_string(),
                d.name.clone(),
                fmt_money(&d.stored),
                fmt_money(&d.expected),
            ]
        })
        .collect();
    pretty_table(&["Aggregate", "Name", "Stored", "From history"], rows)
}

pub fn handle(conn: &mut Connection, ws: i64, sub: &clap::ArgMatches) -> Result<()> {
    if sub.get_flag("repair") {
        let fixed = reconcile::rebuild_workspace(conn, ws)?;
        if fixed.is_empty() {
            println!("doctor: totals already match history; holds lifted");
        } else {
            println!("{}", table(&fixed));
            println!("doctor: rebuilt {} total(s) and lifted holds", fixed.len());
        }
        return Ok(());
    }

    let found = if sub.get_flag("audit") {
        reconcile::audit_workspace(conn, ws)?
    } else {
        reconcile::check_workspace(conn, ws)?
    };
    if found.is_empty() {
        println!("doctor: no issues found");
    } else {
        println!("{}", table(&found));
        if sub.get_flag("audit") {
            println!("doctor: {} total(s) put on hold; run with --repair to rebuild", found.len());
        } else {
            println!("doctor: {} mismatch(es); --audit holds them, --repair rebuilds", found.len());
        }
    }
    Ok(())
}
