// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::aggregate::{self, TransactionView};
use crate::models::TransactionType;
use crate::utils::{parse_date, required};
use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use std::io::Write;

pub const CSV_HEADER: [&str; 8] = [
    "Date",
    "Merchant/Payer",
    "Account",
    "Category",
    "Type",
    "Amount",
    "Note",
    "Receiving Account",
];

pub fn csv_record(v: &TransactionView) -> [String; 8] {
    let t = &v.transaction;
    let who = match t.tx_type {
        TransactionType::Income => t.payer.clone(),
        _ => t.merchant.clone(),
    };
    [
        t.date.format("%Y-%m-%d").to_string(),
        who.unwrap_or_default(),
        v.account_name.clone(),
        v.category_name.clone().unwrap_or_else(|| "N/A".into()),
        t.tx_type.display_name().to_string(),
        format!("{:.2}", t.amount),
        t.note.clone().unwrap_or_default(),
        v.receiving_account_name.clone().unwrap_or_default(),
    ]
}

/// Writes the rows in the order given.
pub fn write_csv<W: Write>(out: W, rows: &[TransactionView]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(CSV_HEADER)?;
    for v in rows {
        wtr.write_record(csv_record(v))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn handle(conn: &Connection, ws: i64, sub: &clap::ArgMatches) -> Result<()> {
    let start = parse_date(required(sub, "from")?.trim())?;
    let end = parse_date(required(sub, "to")?.trim())?;
    if end < start {
        bail!("--to {} is before --from {}", end, start);
    }
    let fmt = required(sub, "format")?.to_lowercase();
    let out = required(sub, "out")?;

    let rows = aggregate::report(conn, ws, start, end)?;
    match fmt.as_str() {
        "csv" => {
            let file = std::fs::File::create(out)
                .with_context(|| format!("Create {}", out))?;
            write_csv(file, &rows)?;
        }
        "json" => {
            std::fs::write(out, serde_json::to_string_pretty(&rows)?)
                .with_context(|| format!("Write {}", out))?;
        }
        _ => bail!("Unknown format: {} (use csv|json)", fmt),
    }
    tracing::info!(workspace = ws, rows = rows.len(), path = %out, "export written");
    println!("Exported {} transaction(s) to {}", rows.len(), out);
    Ok(())
}
