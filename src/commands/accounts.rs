// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::store::{self, NewAccount};
use crate::ledger::{aggregate, engine};
use crate::utils::{account_id, fmt_money, maybe_print_json, parse_decimal, pretty_table, required};
use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, ws: i64, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = required(sub, "name")?;
            let opening = parse_decimal(required(sub, "balance")?.trim())?;
            let acct = store::create_account(
                conn,
                ws,
                &NewAccount {
                    name,
                    opening_balance: opening,
                    is_credit: sub.get_flag("credit"),
                    last_four_digits: sub.get_one::<String>("last4").map(|s| s.as_str()),
                },
            )?;
            println!(
                "Added account '{}' (balance {}{})",
                acct.name,
                fmt_money(&acct.balance),
                if acct.is_credit { ", credit" } else { "" }
            );
        }
        Some(("list", sub)) => {
            let accounts = store::list_accounts(conn, ws)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &accounts)? {
                let data = accounts
                    .iter()
                    .map(|a| {
                        vec![
                            a.name.clone(),
                            if a.is_credit { "credit" } else { "" }.to_string(),
                            a.last_four_digits.clone().unwrap_or_default(),
                            fmt_money(&a.balance),
                            if a.on_hold { "ON HOLD" } else { "" }.to_string(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Name", "Kind", "Last 4", "Balance", "Status"], data)
                );
                println!(
                    "Total available: {}",
                    fmt_money(&aggregate::total_available(conn, ws)?)
                );
            }
        }
        Some(("edit", sub)) => {
            let name = required(sub, "name")?;
            let current = store::account_by_name(conn, ws, name)
                .with_context(|| format!("Account '{}' not found", name))?;
            let new_name = sub
                .get_one::<String>("rename")
                .map(|s| s.as_str())
                .unwrap_or(current.name.as_str());
            let last4 = sub
                .get_one::<String>("last4")
                .map(|s| s.as_str())
                .or(current.last_four_digits.as_deref());
            let acct = store::update_account_details(conn, ws, current.id, new_name, last4)?;
            println!("Updated account '{}'", acct.name);
        }
        Some(("rm", sub)) => {
            let name = required(sub, "name")?;
            let id = account_id(conn, ws, name)?;
            let removed = engine::delete_account(conn, ws, id, sub.get_flag("yes"))?;
            println!(
                "Removed account '{}' ({} transaction(s) removed)",
                name, removed
            );
        }
        _ => {}
    }
    Ok(())
}
