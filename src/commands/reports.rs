// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::aggregate;
use crate::models::TransactionType;
use crate::utils::{fmt_money, maybe_print_json, parse_date, pretty_table, required};
use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use rust_decimal::Decimal;

pub fn handle(conn: &Connection, ws: i64, sub: &clap::ArgMatches) -> Result<()> {
    let start = parse_date(required(sub, "from")?.trim())?;
    let end = parse_date(required(sub, "to")?.trim())?;
    if end < start {
        bail!("--to {} is before --from {}", end, start);
    }
    let rows = aggregate::report(conn, ws, start, end)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rows)? {
        return Ok(());
    }

    let mut totals = [Decimal::ZERO; 4];
    let mut data = Vec::with_capacity(rows.len());
    for v in &rows {
        let t = &v.transaction;
        let slot = TransactionType::ALL
            .iter()
            .position(|k| *k == t.tx_type)
            .unwrap_or(0);
        totals[slot] = totals[slot]
            .checked_add(t.amount)
            .with_context(|| format!("{} total overflowed", t.tx_type.display_name()))?;
        data.push(vec![
            t.date.to_string(),
            v.title(),
            t.tx_type.display_name().to_string(),
            fmt_money(&t.amount),
            v.category_name.clone().unwrap_or_else(|| "N/A".into()),
        ]);
    }
    println!(
        "{}",
        pretty_table(&["Date", "Title", "Type", "Amount", "Category"], data)
    );
    let summary = TransactionType::ALL
        .iter()
        .zip(totals.iter())
        .map(|(k, v)| vec![k.display_name().to_string(), fmt_money(v)])
        .collect();
    println!("{}", pretty_table(&["Type", "Total"], summary));
    Ok(())
}
