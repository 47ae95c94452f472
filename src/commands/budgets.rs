// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::aggregate::{self, MonthWindow};
use crate::utils::{fmt_money, maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, ws: i64, sub: &clap::ArgMatches) -> Result<()> {
    let window = match sub.get_one::<String>("month") {
        Some(m) => MonthWindow::parse(m)?,
        None => MonthWindow::containing(chrono::Local::now().date_naive()),
    };
    let overview = aggregate::budget_overview(conn, ws, &window)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &overview)? {
        return Ok(());
    }

    let data = overview
        .lines
        .iter()
        .map(|l| {
            vec![
                l.name.clone(),
                fmt_money(&l.monthly_budget),
                fmt_money(&l.spent),
                fmt_money(&l.remaining),
            ]
        })
        .collect();
    println!("Budget for {}", overview.month);
    println!(
        "{}",
        pretty_table(&["Category", "Budget", "Spent", "Remaining"], data)
    );
    println!(
        "Total budget {}  spent {}  remaining {}",
        fmt_money(&overview.total_budget),
        fmt_money(&overview.total_spent),
        fmt_money(&overview.total_remaining)
    );
    println!(
        "Total available {}",
        fmt_money(&aggregate::total_available(conn, ws)?)
    );
    Ok(())
}
