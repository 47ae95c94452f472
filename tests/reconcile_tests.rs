// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use homeledger::db;
use homeledger::errors::LedgerError;
use homeledger::ledger::editor::{EditorState, TransactionEditor};
use homeledger::ledger::effects::Aggregate;
use homeledger::ledger::store::{self, NewAccount, NewCategory};
use homeledger::ledger::{engine, reconcile, sharing};
use homeledger::models::{ReceiptCapture, ReceiptChange, TransactionType};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

struct Fixture {
    conn: Connection,
    ws: i64,
    checking: i64,
    food: i64,
}

fn setup() -> Fixture {
    let conn = db::open_in_memory().unwrap();
    let ws = store::create_workspace(&conn, "Home").unwrap().id;
    let checking = store::create_account(
        &conn,
        ws,
        &NewAccount {
            name: "Checking",
            opening_balance: dec("1000"),
            is_credit: false,
            last_four_digits: None,
        },
    )
    .unwrap()
    .id;
    let food = store::create_category(
        &conn,
        ws,
        &NewCategory {
            name: "Food",
            monthly_budget: dec("300"),
            is_expense: true,
        },
    )
    .unwrap()
    .id;
    Fixture {
        conn,
        ws,
        checking,
        food,
    }
}

fn expense(f: &Fixture, amount: &str) -> TransactionEditor {
    let date = NaiveDate::from_ymd_opt(2025, 4, 2).unwrap();
    let mut ed = TransactionEditor::compose(&f.conn, f.ws, date, TransactionType::Expense).unwrap();
    let form = ed.form_mut();
    form.counterparty = "Market".into();
    form.amount = amount.into();
    ed
}

#[test]
fn clean_ledger_has_no_discrepancies() {
    let mut f = setup();
    expense(&f, "25").commit(&mut f.conn).unwrap();
    assert!(reconcile::check_workspace(&f.conn, f.ws).unwrap().is_empty());
    assert_eq!(
        reconcile::expected_total(&f.conn, f.ws, Aggregate::Account(f.checking)).unwrap(),
        dec("975")
    );
}

#[test]
fn tampered_total_is_held_and_rebuilt() {
    let mut f = setup();
    expense(&f, "25").commit(&mut f.conn).unwrap();
    f.conn
        .execute(
            "UPDATE accounts SET balance='1.00' WHERE id=?1",
            params![f.checking],
        )
        .unwrap();

    let found = reconcile::check_workspace(&f.conn, f.ws).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].aggregate, Aggregate::Account(f.checking));
    assert_eq!(found[0].stored, dec("1"));
    assert_eq!(found[0].expected, dec("975"));

    reconcile::audit_workspace(&mut f.conn, f.ws).unwrap();
    assert!(store::get_account(&f.conn, f.ws, f.checking).unwrap().on_hold);

    let mut ed = expense(&f, "5");
    let err = ed.commit(&mut f.conn).unwrap_err();
    assert!(matches!(err, LedgerError::OnHold { aggregate, .. } if aggregate == Aggregate::Account(f.checking)));
    assert_eq!(ed.state(), &EditorState::Composing);
    assert_eq!(store::list_transactions(&f.conn, f.ws).unwrap().len(), 1);
    // the category was not touched either
    assert_eq!(store::get_category(&f.conn, f.ws, f.food).unwrap().actual_spent, dec("25"));

    let fixed = reconcile::rebuild_workspace(&mut f.conn, f.ws).unwrap();
    assert_eq!(fixed.len(), 1);
    let acct = store::get_account(&f.conn, f.ws, f.checking).unwrap();
    assert_eq!(acct.balance, dec("975"));
    assert!(!acct.on_hold);

    // retrying the same editor now goes through
    ed.commit(&mut f.conn).unwrap();
    assert_eq!(store::get_account(&f.conn, f.ws, f.checking).unwrap().balance, dec("970"));
}

#[test]
fn drift_found_during_a_write_rolls_back_and_holds() {
    let mut f = setup();
    expense(&f, "25").commit(&mut f.conn).unwrap();
    f.conn
        .execute(
            "UPDATE categories SET actual_spent='999' WHERE id=?1",
            params![f.food],
        )
        .unwrap();

    let err = expense(&f, "10").commit(&mut f.conn).unwrap_err();
    match err {
        LedgerError::Reconciliation { op, discrepancies } => {
            assert_eq!(op, "create transaction");
            assert_eq!(discrepancies.len(), 1);
            assert_eq!(discrepancies[0].aggregate, Aggregate::Category(f.food));
        }
        other => panic!("expected reconciliation error, got {other:?}"),
    }
    // rolled back
    assert_eq!(store::list_transactions(&f.conn, f.ws).unwrap().len(), 1);
    assert_eq!(store::get_account(&f.conn, f.ws, f.checking).unwrap().balance, dec("975"));
    let food = store::get_category(&f.conn, f.ws, f.food).unwrap();
    assert!(food.on_hold);
    assert_eq!(food.actual_spent, dec("999"));

    let fixed = sharing::after_remote_merge(&mut f.conn, f.ws).unwrap();
    assert_eq!(fixed.len(), 1);
    assert_eq!(store::get_category(&f.conn, f.ws, f.food).unwrap().actual_spent, dec("25"));
}

#[test]
fn storage_failure_leaves_balances_untouched() {
    let mut f = setup();
    let t = expense(&f, "40").commit(&mut f.conn).unwrap();
    f.conn.execute_batch("DROP TABLE receipts;").unwrap();

    let mut ed = expense(&f, "15");
    ed.form_mut().receipt = ReceiptChange::Replace(ReceiptCapture {
        image: vec![0xFF],
        ocr_text: None,
    });
    let err = ed.commit(&mut f.conn).unwrap_err();
    assert!(err.is_retryable());
    assert!(err.to_string().contains("create transaction"));
    assert_eq!(ed.state(), &EditorState::Composing);

    assert!(engine::delete_transaction(&mut f.conn, f.ws, t.id).unwrap_err().is_retryable());

    let acct = store::get_account(&f.conn, f.ws, f.checking).unwrap();
    assert_eq!(acct.balance, dec("960"));
    assert!(!acct.on_hold);
    assert_eq!(store::get_category(&f.conn, f.ws, f.food).unwrap().actual_spent, dec("40"));
    assert_eq!(store::list_transactions(&f.conn, f.ws).unwrap().len(), 1);
}

#[test]
fn overflowing_total_fails_cleanly() {
    let mut f = setup();
    let floor = "-79228162514264337593543950335";
    f.conn
        .execute(
            "UPDATE accounts SET balance=?1 WHERE id=?2",
            params![floor, f.checking],
        )
        .unwrap();

    let mut ed = expense(&f, "5");
    let err = ed.commit(&mut f.conn).unwrap_err();
    assert!(matches!(err, LedgerError::Overflow { ref op, .. } if op == "create transaction"));
    assert!(!err.is_retryable());
    assert_eq!(ed.state(), &EditorState::Composing);

    assert!(store::list_transactions(&f.conn, f.ws).unwrap().is_empty());
    assert_eq!(store::get_account(&f.conn, f.ws, f.checking).unwrap().balance, dec(floor));
    assert!(store::get_category(&f.conn, f.ws, f.food).unwrap().actual_spent.is_zero());

    // the account is simply wrong, and reconciliation says so
    let found = reconcile::check_workspace(&f.conn, f.ws).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].expected, dec("1000"));
}
