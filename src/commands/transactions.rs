// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::aggregate::{self, MonthWindow, SearchQuery, TransactionView};
use crate::ledger::editor::TransactionEditor;
use crate::ledger::engine;
use crate::models::{ReceiptCapture, ReceiptChange, TransactionType};
use crate::utils::{
    account_id, category_id, fmt_money, maybe_print_json, parse_date, pretty_table,
};
use anyhow::{Context, Result, anyhow};
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, ws: i64, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, ws, sub)?,
        Some(("edit", sub)) => edit(conn, ws, sub)?,
        Some(("rm", sub)) => {
            let ids: Vec<i64> = sub
                .get_many::<i64>("ids")
                .map(|v| v.copied().collect())
                .unwrap_or_default();
            let n = engine::delete_transactions(conn, ws, &ids)?;
            println!("Removed {} transaction(s)", n);
        }
        Some(("list", sub)) => list(conn, ws, sub)?,
        _ => {}
    }
    Ok(())
}

fn tx_type(sub: &clap::ArgMatches) -> Result<Option<TransactionType>> {
    sub.get_one::<String>("type")
        .map(|s| s.parse::<TransactionType>().map_err(|e| anyhow!(e)))
        .transpose()
}

fn receipt_change(sub: &clap::ArgMatches) -> Result<ReceiptChange> {
    if sub.try_get_one::<bool>("drop-receipt").ok().flatten() == Some(&true) {
        return Ok(ReceiptChange::Remove);
    }
    match sub.get_one::<String>("receipt") {
        Some(path) => {
            let image = std::fs::read(path)
                .with_context(|| format!("Read receipt image {}", path))?;
            Ok(ReceiptChange::Replace(ReceiptCapture {
                image,
                ocr_text: sub.get_one::<String>("ocr").cloned(),
            }))
        }
        None => Ok(ReceiptChange::Keep),
    }
}

/// Copies whatever flags were given onto the editor form.
fn fill_form(
    conn: &Connection,
    ws: i64,
    editor: &mut TransactionEditor,
    sub: &clap::ArgMatches,
) -> Result<()> {
    let account = match sub.get_one::<String>("account") {
        Some(name) => Some(account_id(conn, ws, name)?),
        None => None,
    };
    let receiving = match sub.get_one::<String>("to") {
        Some(name) => Some(account_id(conn, ws, name)?),
        None => None,
    };
    let category = match sub.get_one::<String>("category") {
        Some(name) => Some(category_id(conn, ws, name)?),
        None => None,
    };
    let receipt = receipt_change(sub)?;

    let form = editor.form_mut();
    if let Some(d) = sub.get_one::<String>("date") {
        form.date = parse_date(d.trim())?;
    }
    if let Some(who) = sub.get_one::<String>("who") {
        form.counterparty = who.clone();
    }
    if let Some(amount) = sub.get_one::<String>("amount") {
        form.amount = amount.clone();
    }
    if let Some(note) = sub.get_one::<String>("note") {
        form.note = note.clone();
    }
    if account.is_some() {
        form.account_id = account;
    }
    if receiving.is_some() {
        form.receiving_account_id = receiving;
    }
    if category.is_some() {
        form.category_id = category;
    }
    form.receipt = receipt;
    Ok(())
}

fn add(conn: &mut Connection, ws: i64, sub: &clap::ArgMatches) -> Result<()> {
    let date = match sub.get_one::<String>("date") {
        Some(d) => parse_date(d.trim())?,
        None => chrono::Local::now().date_naive(),
    };
    let kind = tx_type(sub)?.unwrap_or(TransactionType::Expense);
    let mut editor = TransactionEditor::compose(conn, ws, date, kind)?;
    fill_form(conn, ws, &mut editor, sub)?;
    let t = editor.commit(conn)?;
    println!(
        "Recorded {} {} on {} (id {})",
        t.tx_type,
        fmt_money(&t.amount),
        t.date,
        t.id
    );
    Ok(())
}

fn edit(conn: &mut Connection, ws: i64, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub
        .get_one::<i64>("id")
        .ok_or_else(|| anyhow!("Missing transaction id"))?;
    let mut editor = TransactionEditor::load(conn, ws, id)?;
    if let Some(kind) = tx_type(sub)? {
        if kind != editor.form().tx_type {
            editor.set_type(kind);
        }
    }
    fill_form(conn, ws, &mut editor, sub)?;
    let t = editor.commit(conn)?;
    println!(
        "Updated transaction {}: {} {} on {}",
        t.id,
        t.tx_type,
        fmt_money(&t.amount),
        t.date
    );
    Ok(())
}

fn row(v: &TransactionView) -> Vec<String> {
    let t = &v.transaction;
    vec![
        t.id.to_string(),
        t.date.to_string(),
        v.title(),
        t.tx_type.display_name().to_string(),
        fmt_money(&t.amount),
        v.account_name.clone(),
        v.category_name.clone().unwrap_or_default(),
        t.note.clone().unwrap_or_default(),
    ]
}

const HEADERS: [&str; 8] = [
    "ID", "Date", "Title", "Type", "Amount", "Account", "Category", "Note",
];

fn list(conn: &Connection, ws: i64, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(conn, ws, sub)?;
    if sub.get_flag("grouped") {
        let groups = aggregate::group_by_day(data);
        if !maybe_print_json(json_flag, jsonl_flag, &groups)? {
            for g in groups {
                println!("{}", g.date.format("%A, %B %-d, %Y"));
                let rows = g.transactions.iter().map(row).collect();
                println!("{}", pretty_table(&HEADERS, rows));
            }
        }
    } else if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows = data.iter().map(row).collect();
        println!("{}", pretty_table(&HEADERS, rows));
    }
    Ok(())
}

/// Filtered transactions, newest first.
pub fn query_rows(
    conn: &Connection,
    ws: i64,
    sub: &clap::ArgMatches,
) -> Result<Vec<TransactionView>> {
    let query = match sub.get_one::<String>("category") {
        Some(name) => SearchQuery::category(category_id(conn, ws, name)?),
        None => {
            let q = SearchQuery::new(
                sub.get_one::<String>("search").cloned().unwrap_or_default(),
            );
            if sub.get_flag("any") { q.any() } else { q }
        }
    };
    let mut rows = aggregate::search_transactions(conn, ws, &query)?;
    if let Some(month) = sub.get_one::<String>("month") {
        let window = MonthWindow::parse(month)?;
        rows.retain(|v| window.contains(v.transaction.date));
    }
    if let Some(limit) = sub.get_one::<usize>("limit") {
        rows.truncate(*limit);
    }
    Ok(rows)
}
