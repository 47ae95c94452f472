// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use homeledger::ledger::editor::TransactionEditor;
use homeledger::ledger::store::{self, NewAccount, NewCategory};
use homeledger::models::TransactionType;
use homeledger::{cli, commands::exporter, db};
use rusqlite::Connection;
use rust_decimal::Decimal;
use tempfile::tempdir;

fn base_conn() -> (Connection, i64) {
    let mut conn = db::open_in_memory().unwrap();
    let ws = store::create_workspace(&conn, "Home").unwrap().id;
    for name in ["Checking", "Savings"] {
        store::create_account(
            &conn,
            ws,
            &NewAccount {
                name,
                opening_balance: Decimal::new(1000, 0),
                is_credit: false,
                last_four_digits: None,
            },
        )
        .unwrap();
    }
    for (name, is_expense) in [("Groceries", true), ("Salary", false)] {
        store::create_category(
            &conn,
            ws,
            &NewCategory {
                name,
                monthly_budget: Decimal::ZERO,
                is_expense,
            },
        )
        .unwrap();
    }
    let checking = store::account_by_name(&conn, ws, "Checking").unwrap().id;
    let savings = store::account_by_name(&conn, ws, "Savings").unwrap().id;

    let entries = [
        ("2025-01-02", TransactionType::Expense, "Corner Shop", "12.3", "Weekly run"),
        ("2025-01-01", TransactionType::Income, "Employer", "2500", ""),
        ("2025-01-03", TransactionType::Transfer, "", "100", "rainy day"),
    ];
    for (date, kind, who, amount, note) in entries {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        let mut ed = TransactionEditor::compose(&conn, ws, date, kind).unwrap();
        let form = ed.form_mut();
        form.counterparty = who.into();
        form.amount = amount.into();
        form.note = note.into();
        form.account_id = Some(checking);
        if kind == TransactionType::Transfer {
            form.receiving_account_id = Some(savings);
        }
        ed.commit(&mut conn).unwrap();
    }
    (conn, ws)
}

#[test]
fn export_csv_has_fixed_columns() {
    let (conn, ws) = base_conn();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("export.csv");
    let out_str = out_path.to_string_lossy().to_string();

    let matches = cli::build_cli().get_matches_from([
        "homeledger",
        "export",
        "--from",
        "2025-01-01",
        "--to",
        "2025-01-31",
        "--out",
        &out_str,
    ]);
    if let Some(("export", export_m)) = matches.subcommand() {
        exporter::handle(&conn, ws, export_m).unwrap();
    } else {
        panic!("no export subcommand");
    }

    let contents = std::fs::read_to_string(&out_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Date,Merchant/Payer,Account,Category,Type,Amount,Note,Receiving Account",
            "2025-01-01,Employer,Checking,Salary,Income,2500.00,,",
            "2025-01-02,Corner Shop,Checking,Groceries,Expense,12.30,Weekly run,",
            "2025-01-03,,Checking,N/A,Transfer,100.00,rainy day,Savings",
        ]
    );
}

#[test]
fn export_json_round_trips_rows() {
    let (conn, ws) = base_conn();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("export.json");
    let out_str = out_path.to_string_lossy().to_string();

    let matches = cli::build_cli().get_matches_from([
        "homeledger",
        "export",
        "--from",
        "2025-01-02",
        "--to",
        "2025-01-02",
        "--format",
        "json",
        "--out",
        &out_str,
    ]);
    if let Some(("export", export_m)) = matches.subcommand() {
        exporter::handle(&conn, ws, export_m).unwrap();
    } else {
        panic!("no export subcommand");
    }

    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out_path).unwrap()).unwrap();
    let rows = parsed.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["merchant"], "Corner Shop");
    assert_eq!(rows[0]["tx_type"], "expense");
    assert_eq!(rows[0]["category_name"], "Groceries");
}

#[test]
fn export_rejects_backwards_range() {
    let (conn, ws) = base_conn();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("export.csv");
    let out_str = out_path.to_string_lossy().to_string();

    let matches = cli::build_cli().get_matches_from([
        "homeledger",
        "export",
        "--from",
        "2025-02-01",
        "--to",
        "2025-01-01",
        "--out",
        &out_str,
    ]);
    if let Some(("export", export_m)) = matches.subcommand() {
        assert!(exporter::handle(&conn, ws, export_m).is_err());
    } else {
        panic!("no export subcommand");
    }
    assert!(!out_path.exists());
}
