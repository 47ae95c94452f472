// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::engine;
use crate::ledger::store::{self, NewCategory};
use crate::utils::{category_id, fmt_money, maybe_print_json, parse_decimal, pretty_table, required};
use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, ws: i64, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let budget = parse_decimal(required(sub, "budget")?.trim())?;
            let cat = store::create_category(
                conn,
                ws,
                &NewCategory {
                    name: required(sub, "name")?,
                    monthly_budget: budget,
                    is_expense: !sub.get_flag("income"),
                },
            )?;
            println!(
                "Added {} category '{}' (monthly budget {})",
                if cat.is_expense { "expense" } else { "income" },
                cat.name,
                fmt_money(&cat.monthly_budget)
            );
        }
        Some(("list", sub)) => {
            let cats = store::list_categories(conn, ws)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &cats)? {
                let data = cats
                    .iter()
                    .map(|c| {
                        vec![
                            c.name.clone(),
                            if c.is_expense { "expense" } else { "income" }.to_string(),
                            fmt_money(&c.monthly_budget),
                            fmt_money(&c.actual_spent),
                            if c.on_hold { "ON HOLD" } else { "" }.to_string(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Name", "Kind", "Monthly budget", "Spent", "Status"], data)
                );
            }
        }
        Some(("edit", sub)) => {
            let name = required(sub, "name")?;
            let current = store::category_by_name(conn, ws, name)
                .with_context(|| format!("Category '{}' not found", name))?;
            let new_name = sub
                .get_one::<String>("rename")
                .map(|s| s.as_str())
                .unwrap_or(current.name.as_str());
            let budget = match sub.get_one::<String>("budget") {
                Some(b) => parse_decimal(b.trim())?,
                None => current.monthly_budget,
            };
            let cat = store::update_category(conn, ws, current.id, new_name, budget)?;
            println!(
                "Updated category '{}' (monthly budget {})",
                cat.name,
                fmt_money(&cat.monthly_budget)
            );
        }
        Some(("rm", sub)) => {
            let name = required(sub, "name")?;
            let id = category_id(conn, ws, name)?;
            let removed = engine::delete_category(conn, ws, id, sub.get_flag("yes"))?;
            println!(
                "Removed category '{}' ({} transaction(s) removed)",
                name, removed
            );
        }
        _ => {}
    }
    Ok(())
}
