// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use homeledger::db;
use homeledger::errors::{LedgerError, ValidationError};
use homeledger::ledger::editor::{EditorState, TransactionEditor};
use homeledger::ledger::preferences::{self, EditorDefaults};
use homeledger::ledger::store::{self, NewAccount, NewCategory};
use homeledger::models::{ReceiptCapture, ReceiptChange, TransactionType};
use rusqlite::Connection;
use rust_decimal::Decimal;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

fn account(conn: &Connection, ws: i64, name: &str) -> i64 {
    store::create_account(
        conn,
        ws,
        &NewAccount {
            name,
            opening_balance: Decimal::new(100, 0),
            is_credit: false,
            last_four_digits: None,
        },
    )
    .unwrap()
    .id
}

fn category(conn: &Connection, ws: i64, name: &str, is_expense: bool) -> i64 {
    store::create_category(
        conn,
        ws,
        &NewCategory {
            name,
            monthly_budget: Decimal::ZERO,
            is_expense,
        },
    )
    .unwrap()
    .id
}

fn setup() -> (Connection, i64) {
    let conn = db::open_in_memory().unwrap();
    let ws = store::create_workspace(&conn, "Home").unwrap().id;
    (conn, ws)
}

fn rejected(ed: &mut TransactionEditor, conn: &mut Connection) -> ValidationError {
    match ed.commit(conn) {
        Err(LedgerError::Validation(v)) => {
            assert_eq!(ed.state(), &EditorState::Rejected(v.clone()));
            v
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[test]
fn validation_reports_first_failure_in_order() {
    let (mut conn, ws) = setup();
    let checking = account(&conn, ws, "Checking");
    let food = category(&conn, ws, "Food", true);

    let mut ed = TransactionEditor::compose(&conn, ws, date(), TransactionType::Expense).unwrap();
    {
        let form = ed.form_mut();
        form.account_id = None;
        form.category_id = None;
        form.amount = "abc".into();
    }
    assert_eq!(rejected(&mut ed, &mut conn), ValidationError::MissingCounterparty);

    ed.form_mut().counterparty = "  Market ".into();
    assert_eq!(
        rejected(&mut ed, &mut conn),
        ValidationError::InvalidAmount("abc".into())
    );

    ed.form_mut().amount = "-4".into();
    assert!(matches!(rejected(&mut ed, &mut conn), ValidationError::InvalidAmount(_)));

    ed.form_mut().amount = "0".into();
    assert!(matches!(rejected(&mut ed, &mut conn), ValidationError::InvalidAmount(_)));

    ed.form_mut().amount = "4.20".into();
    assert_eq!(rejected(&mut ed, &mut conn), ValidationError::MissingAccount);

    ed.form_mut().account_id = Some(checking);
    assert_eq!(rejected(&mut ed, &mut conn), ValidationError::MissingCategory);

    ed.form_mut().category_id = Some(food);
    let t = ed.commit(&mut conn).unwrap();
    assert_eq!(t.merchant.as_deref(), Some("Market"));
    assert!(matches!(ed.state(), EditorState::Committed(_)));
}

#[test]
fn transfer_needs_distinct_receiving_account() {
    let (mut conn, ws) = setup();
    let a = account(&conn, ws, "A");
    let b = account(&conn, ws, "B");

    let mut ed = TransactionEditor::compose(&conn, ws, date(), TransactionType::Transfer).unwrap();
    ed.form_mut().amount = "10".into();
    ed.form_mut().account_id = Some(a);
    // no counterparty needed for transfers
    assert_eq!(rejected(&mut ed, &mut conn), ValidationError::MissingReceivingAccount);

    ed.form_mut().receiving_account_id = Some(a);
    assert_eq!(rejected(&mut ed, &mut conn), ValidationError::SameAccountTransfer);

    ed.form_mut().receiving_account_id = Some(b);
    ed.commit(&mut conn).unwrap();
    assert_eq!(store::get_account(&conn, ws, b).unwrap().balance, Decimal::new(110, 0));
}

#[test]
fn income_category_only_required_when_one_exists() {
    let (mut conn, ws) = setup();
    let a = account(&conn, ws, "A");

    let mut ed = TransactionEditor::compose(&conn, ws, date(), TransactionType::Income).unwrap();
    assert_eq!(ed.form().category_id, None);
    {
        let form = ed.form_mut();
        form.counterparty = "Employer".into();
        form.amount = "1000".into();
        form.account_id = Some(a);
    }
    let t = ed.commit(&mut conn).unwrap();
    assert_eq!(t.payer.as_deref(), Some("Employer"));
    assert_eq!(t.merchant, None);

    let salary = category(&conn, ws, "Salary", false);
    let mut ed = TransactionEditor::compose(&conn, ws, date(), TransactionType::Income).unwrap();
    assert_eq!(ed.form().category_id, Some(salary));
    {
        let form = ed.form_mut();
        form.counterparty = "Employer".into();
        form.amount = "1000".into();
        form.category_id = None;
    }
    assert_eq!(rejected(&mut ed, &mut conn), ValidationError::MissingCategory);
}

#[test]
fn category_kind_must_match_type() {
    let (mut conn, ws) = setup();
    account(&conn, ws, "A");
    let salary = category(&conn, ws, "Salary", false);

    let mut ed = TransactionEditor::compose(&conn, ws, date(), TransactionType::Expense).unwrap();
    {
        let form = ed.form_mut();
        form.counterparty = "Shop".into();
        form.amount = "5".into();
        form.category_id = Some(salary);
    }
    assert!(matches!(
        rejected(&mut ed, &mut conn),
        ValidationError::CategoryKindMismatch { .. }
    ));
}

#[test]
fn rejected_commit_writes_nothing() {
    let (mut conn, ws) = setup();
    let a = account(&conn, ws, "A");
    category(&conn, ws, "Food", true);

    let mut ed = TransactionEditor::compose(&conn, ws, date(), TransactionType::Expense).unwrap();
    ed.form_mut().amount = "5".into();
    rejected(&mut ed, &mut conn);
    assert!(store::list_transactions(&conn, ws).unwrap().is_empty());
    assert_eq!(store::get_account(&conn, ws, a).unwrap().balance, Decimal::new(100, 0));
    assert_eq!(preferences::load(&conn, ws).unwrap(), EditorDefaults::default());
}

#[test]
fn defaults_follow_last_new_transaction() {
    let (mut conn, ws) = setup();
    let first = account(&conn, ws, "Alpha");
    let second = account(&conn, ws, "Beta");
    let bills = category(&conn, ws, "Bills", true);
    let food = category(&conn, ws, "Food", true);

    let ed = TransactionEditor::compose(&conn, ws, date(), TransactionType::Expense).unwrap();
    assert_eq!(ed.form().account_id, Some(first));
    assert_eq!(ed.form().category_id, Some(bills));

    let mut ed = TransactionEditor::compose(&conn, ws, date(), TransactionType::Expense).unwrap();
    {
        let form = ed.form_mut();
        form.counterparty = "Grocer".into();
        form.amount = "12".into();
        form.account_id = Some(second);
        form.category_id = Some(food);
    }
    let t = ed.commit(&mut conn).unwrap();
    assert_eq!(
        preferences::load(&conn, ws).unwrap(),
        EditorDefaults {
            account_id: Some(second),
            category_id: Some(food),
        }
    );

    let ed = TransactionEditor::compose(&conn, ws, date(), TransactionType::Refund).unwrap();
    assert_eq!(ed.form().account_id, Some(second));
    assert_eq!(ed.form().category_id, Some(food));

    // edits leave the defaults alone
    let mut ed = TransactionEditor::load(&conn, ws, t.id).unwrap();
    assert!(matches!(ed.state(), EditorState::Loaded(_)));
    ed.form_mut().account_id = Some(first);
    ed.form_mut().category_id = Some(bills);
    ed.commit(&mut conn).unwrap();
    assert_eq!(preferences::load(&conn, ws).unwrap().account_id, Some(second));

    let mut ed = TransactionEditor::compose(&conn, ws, date(), TransactionType::Expense).unwrap();
    ed.set_type(TransactionType::Transfer);
    assert_eq!(ed.form().category_id, None);
    ed.set_type(TransactionType::Expense);
    assert_eq!(ed.form().category_id, Some(food));
}

#[test]
fn receipt_keep_replace_remove() {
    let (mut conn, ws) = setup();
    account(&conn, ws, "A");
    category(&conn, ws, "Food", true);

    let mut ed = TransactionEditor::compose(&conn, ws, date(), TransactionType::Expense).unwrap();
    {
        let form = ed.form_mut();
        form.counterparty = "Cafe".into();
        form.amount = "3.10".into();
        form.receipt = ReceiptChange::Replace(ReceiptCapture {
            image: vec![1, 2, 3],
            ocr_text: Some("LATTE 3.10".into()),
        });
    }
    let t = ed.commit(&mut conn).unwrap();
    let r = store::receipt_for(&conn, t.id).unwrap().unwrap();
    assert_eq!(r.image, vec![1, 2, 3]);
    assert_eq!(r.ocr_text.as_deref(), Some("LATTE 3.10"));

    let mut ed = TransactionEditor::load(&conn, ws, t.id).unwrap();
    ed.form_mut().note = "kept".into();
    ed.commit(&mut conn).unwrap();
    assert_eq!(store::receipt_for(&conn, t.id).unwrap().unwrap().image, vec![1, 2, 3]);

    let mut ed = TransactionEditor::load(&conn, ws, t.id).unwrap();
    ed.form_mut().receipt = ReceiptChange::Replace(ReceiptCapture {
        image: vec![9],
        ocr_text: None,
    });
    ed.commit(&mut conn).unwrap();
    let r = store::receipt_for(&conn, t.id).unwrap().unwrap();
    assert_eq!(r.image, vec![9]);
    assert_eq!(r.ocr_text, None);

    let mut ed = TransactionEditor::load(&conn, ws, t.id).unwrap();
    ed.form_mut().receipt = ReceiptChange::Remove;
    ed.commit(&mut conn).unwrap();
    assert!(store::receipt_for(&conn, t.id).unwrap().is_none());
}

#[test]
fn amounts_are_cents_within_the_ceiling() {
    let (mut conn, ws) = setup();
    let a = account(&conn, ws, "A");
    category(&conn, ws, "Food", true);

    let mut ed = TransactionEditor::compose(&conn, ws, date(), TransactionType::Expense).unwrap();
    ed.form_mut().counterparty = "Shop".into();

    ed.form_mut().amount = "10.005".into();
    assert_eq!(rejected(&mut ed, &mut conn), ValidationError::TooPrecise("10.005".into()));

    ed.form_mut().amount = "79228162514264337593543950335".into();
    assert!(matches!(rejected(&mut ed, &mut conn), ValidationError::AmountTooLarge(_)));

    ed.form_mut().amount = "1000000000000.01".into();
    assert!(matches!(rejected(&mut ed, &mut conn), ValidationError::AmountTooLarge(_)));
    assert!(store::list_transactions(&conn, ws).unwrap().is_empty());
    assert_eq!(store::get_account(&conn, ws, a).unwrap().balance, Decimal::new(100, 0));

    // trailing zeros are still cents
    ed.form_mut().amount = "2.500".into();
    ed.commit(&mut conn).unwrap();
    assert_eq!(store::get_account(&conn, ws, a).unwrap().balance, Decimal::new(975, 1));

    let err = store::create_category(
        &conn,
        ws,
        &NewCategory {
            name: "Fuel",
            monthly_budget: Decimal::new(10001, 3),
            is_expense: true,
        },
    )
    .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(ValidationError::TooPrecise(_))));
}

#[test]
fn editing_the_note_keeps_the_amount() {
    let (mut conn, ws) = setup();
    let a = account(&conn, ws, "A");
    category(&conn, ws, "Food", true);

    let mut ed = TransactionEditor::compose(&conn, ws, date(), TransactionType::Expense).unwrap();
    ed.form_mut().counterparty = "Bakery".into();
    ed.form_mut().amount = "7.5".into();
    let t = ed.commit(&mut conn).unwrap();

    let mut ed = TransactionEditor::load(&conn, ws, t.id).unwrap();
    assert_eq!(ed.form().amount, t.amount.to_string());
    ed.form_mut().note = "sourdough".into();
    let edited = ed.commit(&mut conn).unwrap();

    assert_eq!(edited.amount, t.amount);
    assert_eq!(edited.note.as_deref(), Some("sourdough"));
    assert_eq!(store::get_account(&conn, ws, a).unwrap().balance, Decimal::new(925, 1));
}
