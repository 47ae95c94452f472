// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Workspace-scoped reads and writes for the five ledger entities.
//!
//! Running totals (`accounts.balance`, `categories.actual_spent`) are only
//! written through the crate-private adjusters below, which the engine and
//! reconciliation call inside their write units.

use crate::errors::{LedgerError, LedgerResult, ValidationError};
use crate::ledger::effects::Aggregate;
use crate::models::{
    Account, Category, EntityKind, LedgerEntry, Receipt, ReceiptCapture, Transaction,
    TransactionType, Workspace, check_money,
};
use chrono::{NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;

fn conversion(idx: usize, err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

pub(crate) fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let s: String = row.get(idx)?;
    s.parse::<Decimal>()
        .map_err(|e| conversion(idx, format!("Invalid amount '{}': {}", s, e)))
}

fn date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = row.get(idx)?;
    NaiveDate::parse_from_str(&s, "%Y-%m-%d")
        .map_err(|e| conversion(idx, format!("Invalid date '{}': {}", s, e)))
}

fn type_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<TransactionType> {
    let s: String = row.get(idx)?;
    s.parse::<TransactionType>().map_err(|e| conversion(idx, e))
}

fn clean_name(name: &str) -> Result<String, ValidationError> {
    let n = name.trim();
    if n.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(n.to_string())
}

fn blank_to_none(s: Option<&str>) -> Option<String> {
    s.map(|v| v.trim()).filter(|v| !v.is_empty()).map(|v| v.to_string())
}

// ---- workspaces ----

pub fn create_workspace(conn: &Connection, name: &str) -> LedgerResult<Workspace> {
    let name = clean_name(name)?;
    conn.execute("INSERT INTO workspaces(name) VALUES (?1)", params![name])?;
    let id = conn.last_insert_rowid();
    tracing::info!(workspace = id, %name, "workspace created");
    Ok(Workspace { id, name })
}

pub fn list_workspaces(conn: &Connection) -> LedgerResult<Vec<Workspace>> {
    let mut stmt = conn.prepare("SELECT id, name FROM workspaces ORDER BY name, id")?;
    let rows = stmt.query_map([], |r| {
        Ok(Workspace {
            id: r.get(0)?,
            name: r.get(1)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn get_workspace(conn: &Connection, id: i64) -> LedgerResult<Workspace> {
    conn.query_row(
        "SELECT id, name FROM workspaces WHERE id=?1",
        params![id],
        |r| {
            Ok(Workspace {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found(EntityKind::Workspace, id))
}

pub fn workspace_by_name(conn: &Connection, name: &str) -> LedgerResult<Workspace> {
    conn.query_row(
        "SELECT id, name FROM workspaces WHERE name=?1 ORDER BY id LIMIT 1",
        params![name.trim()],
        |r| {
            Ok(Workspace {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found(EntityKind::Workspace, name.trim()))
}

pub fn rename_workspace(conn: &Connection, id: i64, name: &str) -> LedgerResult<Workspace> {
    let name = clean_name(name)?;
    let n = conn.execute(
        "UPDATE workspaces SET name=?1 WHERE id=?2",
        params![name, id],
    )?;
    if n == 0 {
        return Err(LedgerError::not_found(EntityKind::Workspace, id));
    }
    Ok(Workspace { id, name })
}

/// Removes the workspace and everything it owns as one unit.
pub fn delete_workspace(conn: &mut Connection, id: i64) -> LedgerResult<()> {
    let tx = conn.transaction()?;
    get_workspace(&tx, id)?;
    tx.execute(
        "DELETE FROM receipts WHERE transaction_id IN (SELECT id FROM transactions WHERE workspace_id=?1)",
        params![id],
    )?;
    tx.execute("DELETE FROM transactions WHERE workspace_id=?1", params![id])?;
    tx.execute("DELETE FROM accounts WHERE workspace_id=?1", params![id])?;
    tx.execute("DELETE FROM categories WHERE workspace_id=?1", params![id])?;
    tx.execute(
        "DELETE FROM workspace_preferences WHERE workspace_id=?1",
        params![id],
    )?;
    tx.execute("DELETE FROM workspaces WHERE id=?1", params![id])?;
    tx.commit()?;
    tracing::info!(workspace = id, "workspace deleted");
    Ok(())
}

// ---- accounts ----

#[derive(Debug, Clone)]
pub struct NewAccount<'a> {
    pub name: &'a str,
    pub opening_balance: Decimal,
    pub is_credit: bool,
    pub last_four_digits: Option<&'a str>,
}

const ACCOUNT_COLS: &str =
    "id, workspace_id, name, balance, initial_balance, is_credit, last_four_digits, on_hold";

fn account_row(r: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: r.get(0)?,
        workspace_id: r.get(1)?,
        name: r.get(2)?,
        balance: decimal_at(r, 3)?,
        initial_balance: decimal_at(r, 4)?,
        is_credit: r.get(5)?,
        last_four_digits: r.get(6)?,
        on_hold: r.get(7)?,
    })
}

pub fn create_account(conn: &Connection, ws: i64, new: &NewAccount<'_>) -> LedgerResult<Account> {
    get_workspace(conn, ws)?;
    let name = clean_name(new.name)?;
    if find_account_id(conn, ws, &name)?.is_some() {
        return Err(ValidationError::DuplicateName {
            entity: EntityKind::Account,
            name,
        }
        .into());
    }
    check_money(new.opening_balance)?;
    // credit balances are owed money and start negative
    let opening = if new.is_credit {
        -new.opening_balance.abs()
    } else {
        new.opening_balance.abs()
    };
    conn.execute(
        "INSERT INTO accounts(workspace_id, name, balance, initial_balance, is_credit, last_four_digits)
         VALUES (?1, ?2, ?3, ?3, ?4, ?5)",
        params![
            ws,
            name,
            opening.to_string(),
            new.is_credit,
            blank_to_none(new.last_four_digits)
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(workspace = ws, account = id, %opening, "account created");
    get_account(conn, ws, id)
}

pub fn get_account(conn: &Connection, ws: i64, id: i64) -> LedgerResult<Account> {
    conn.query_row(
        &format!("SELECT {ACCOUNT_COLS} FROM accounts WHERE id=?1 AND workspace_id=?2"),
        params![id, ws],
        account_row,
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found(EntityKind::Account, id))
}

fn find_account_id(conn: &Connection, ws: i64, name: &str) -> LedgerResult<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT id FROM accounts WHERE workspace_id=?1 AND name=?2",
            params![ws, name.trim()],
            |r| r.get(0),
        )
        .optional()?)
}

pub fn account_by_name(conn: &Connection, ws: i64, name: &str) -> LedgerResult<Account> {
    match find_account_id(conn, ws, name)? {
        Some(id) => get_account(conn, ws, id),
        None => Err(LedgerError::not_found(EntityKind::Account, name.trim())),
    }
}

pub fn list_accounts(conn: &Connection, ws: i64) -> LedgerResult<Vec<Account>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ACCOUNT_COLS} FROM accounts WHERE workspace_id=?1 ORDER BY name, id"
    ))?;
    let rows = stmt.query_map(params![ws], account_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Name and display digits only; the balance and credit flag are fixed.
pub fn update_account_details(
    conn: &Connection,
    ws: i64,
    id: i64,
    name: &str,
    last_four_digits: Option<&str>,
) -> LedgerResult<Account> {
    let current = get_account(conn, ws, id)?;
    let name = clean_name(name)?;
    if name != current.name && find_account_id(conn, ws, &name)?.is_some() {
        return Err(ValidationError::DuplicateName {
            entity: EntityKind::Account,
            name,
        }
        .into());
    }
    conn.execute(
        "UPDATE accounts SET name=?1, last_four_digits=?2 WHERE id=?3 AND workspace_id=?4",
        params![name, blank_to_none(last_four_digits), id, ws],
    )?;
    get_account(conn, ws, id)
}

// ---- categories ----

#[derive(Debug, Clone)]
pub struct NewCategory<'a> {
    pub name: &'a str,
    pub monthly_budget: Decimal,
    pub is_expense: bool,
}

const CATEGORY_COLS: &str = "id, workspace_id, name, monthly_budget, is_expense, actual_spent, on_hold";

fn category_row(r: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: r.get(0)?,
        workspace_id: r.get(1)?,
        name: r.get(2)?,
        monthly_budget: decimal_at(r, 3)?,
        is_expense: r.get(4)?,
        actual_spent: decimal_at(r, 5)?,
        on_hold: r.get(6)?,
    })
}

fn find_category_id(conn: &Connection, ws: i64, name: &str) -> LedgerResult<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT id FROM categories WHERE workspace_id=?1 AND name=?2",
            params![ws, name.trim()],
            |r| r.get(0),
        )
        .optional()?)
}

pub fn create_category(
    conn: &Connection,
    ws: i64,
    new: &NewCategory<'_>,
) -> LedgerResult<Category> {
    get_workspace(conn, ws)?;
    let name = clean_name(new.name)?;
    check_money(new.monthly_budget)?;
    if find_category_id(conn, ws, &name)?.is_some() {
        return Err(ValidationError::DuplicateName {
            entity: EntityKind::Category,
            name,
        }
        .into());
    }
    conn.execute(
        "INSERT INTO categories(workspace_id, name, monthly_budget, is_expense, actual_spent)
         VALUES (?1, ?2, ?3, ?4, '0')",
        params![ws, name, new.monthly_budget.to_string(), new.is_expense],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(workspace = ws, category = id, "category created");
    get_category(conn, ws, id)
}

pub fn get_category(conn: &Connection, ws: i64, id: i64) -> LedgerResult<Category> {
    conn.query_row(
        &format!("SELECT {CATEGORY_COLS} FROM categories WHERE id=?1 AND workspace_id=?2"),
        params![id, ws],
        category_row,
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found(EntityKind::Category, id))
}

pub fn category_by_name(conn: &Connection, ws: i64, name: &str) -> LedgerResult<Category> {
    match find_category_id(conn, ws, name)? {
        Some(id) => get_category(conn, ws, id),
        None => Err(LedgerError::not_found(EntityKind::Category, name.trim())),
    }
}

pub fn list_categories(conn: &Connection, ws: i64) -> LedgerResult<Vec<Category>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CATEGORY_COLS} FROM categories WHERE workspace_id=?1 ORDER BY name, id"
    ))?;
    let rows = stmt.query_map(params![ws], category_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn update_category(
    conn: &Connection,
    ws: i64,
    id: i64,
    name: &str,
    monthly_budget: Decimal,
) -> LedgerResult<Category> {
    let current = get_category(conn, ws, id)?;
    let name = clean_name(name)?;
    check_money(monthly_budget)?;
    if name != current.name && find_category_id(conn, ws, &name)?.is_some() {
        return Err(ValidationError::DuplicateName {
            entity: EntityKind::Category,
            name,
        }
        .into());
    }
    conn.execute(
        "UPDATE categories SET name=?1, monthly_budget=?2 WHERE id=?3 AND workspace_id=?4",
        params![name, monthly_budget.to_string(), id, ws],
    )?;
    get_category(conn, ws, id)
}

// ---- running totals ----

fn aggregate_sql(agg: Aggregate) -> (&'static str, &'static str, i64) {
    match agg {
        Aggregate::Account(id) => ("accounts", "balance", id),
        Aggregate::Category(id) => ("categories", "actual_spent", id),
    }
}

fn aggregate_entity(agg: Aggregate) -> (EntityKind, i64) {
    match agg {
        Aggregate::Account(id) => (EntityKind::Account, id),
        Aggregate::Category(id) => (EntityKind::Category, id),
    }
}

/// Stored total, hold flag and display name of an aggregate in `ws`.
pub(crate) fn aggregate_state(
    conn: &Connection,
    ws: i64,
    agg: Aggregate,
) -> LedgerResult<(Decimal, bool, String)> {
    let (table, col, id) = aggregate_sql(agg);
    conn.query_row(
        &format!("SELECT {col}, on_hold, name FROM {table} WHERE id=?1 AND workspace_id=?2"),
        params![id, ws],
        |r| Ok((decimal_at(r, 0)?, r.get::<_, bool>(1)?, r.get::<_, String>(2)?)),
    )
    .optional()?
    .ok_or_else(|| {
        let (entity, id) = aggregate_entity(agg);
        LedgerError::not_found(entity, id)
    })
}

pub(crate) fn set_aggregate_total(
    conn: &Connection,
    agg: Aggregate,
    value: Decimal,
) -> LedgerResult<()> {
    let (table, col, id) = aggregate_sql(agg);
    conn.execute(
        &format!("UPDATE {table} SET {col}=?1 WHERE id=?2"),
        params![value.to_string(), id],
    )?;
    Ok(())
}

pub(crate) fn set_hold(conn: &Connection, agg: Aggregate, on_hold: bool) -> LedgerResult<()> {
    let (table, _, id) = aggregate_sql(agg);
    conn.execute(
        &format!("UPDATE {table} SET on_hold=?1 WHERE id=?2"),
        params![on_hold, id],
    )?;
    Ok(())
}

// ---- transactions ----

fn merchant_payer(entry: &LedgerEntry) -> (Option<&str>, Option<&str>) {
    let who = entry.counterparty.as_deref();
    match entry.tx_type {
        TransactionType::Income => (None, who),
        TransactionType::Transfer => (Some(who.unwrap_or("")), None),
        TransactionType::Expense | TransactionType::Refund => (who, None),
    }
}

const TX_COLS: &str = "id, workspace_id, date, amount, type, merchant, payer, note, account_id, receiving_account_id, category_id";

pub(crate) fn transaction_row(r: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: r.get(0)?,
        workspace_id: r.get(1)?,
        date: date_at(r, 2)?,
        amount: decimal_at(r, 3)?,
        tx_type: type_at(r, 4)?,
        merchant: r.get(5)?,
        payer: r.get(6)?,
        note: r.get(7)?,
        account_id: r.get(8)?,
        receiving_account_id: r.get(9)?,
        category_id: r.get(10)?,
    })
}

pub fn get_transaction(conn: &Connection, ws: i64, id: i64) -> LedgerResult<Transaction> {
    conn.query_row(
        &format!("SELECT {TX_COLS} FROM transactions WHERE id=?1 AND workspace_id=?2"),
        params![id, ws],
        transaction_row,
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found(EntityKind::Transaction, id))
}

pub fn list_transactions(conn: &Connection, ws: i64) -> LedgerResult<Vec<Transaction>> {
    query_transactions(
        conn,
        &format!("SELECT {TX_COLS} FROM transactions WHERE workspace_id=?1 ORDER BY date, id"),
        params![ws],
    )
}

/// Transactions that send from or receive into the account.
pub fn transactions_for_account(
    conn: &Connection,
    ws: i64,
    account_id: i64,
) -> LedgerResult<Vec<Transaction>> {
    query_transactions(
        conn,
        &format!(
            "SELECT {TX_COLS} FROM transactions
             WHERE workspace_id=?1 AND (account_id=?2 OR receiving_account_id=?2) ORDER BY date, id"
        ),
        params![ws, account_id],
    )
}

pub fn transactions_for_category(
    conn: &Connection,
    ws: i64,
    category_id: i64,
) -> LedgerResult<Vec<Transaction>> {
    query_transactions(
        conn,
        &format!(
            "SELECT {TX_COLS} FROM transactions WHERE workspace_id=?1 AND category_id=?2 ORDER BY date, id"
        ),
        params![ws, category_id],
    )
}

fn query_transactions(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> LedgerResult<Vec<Transaction>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, transaction_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub(crate) fn insert_transaction(
    conn: &Connection,
    ws: i64,
    entry: &LedgerEntry,
) -> LedgerResult<i64> {
    let (merchant, payer) = merchant_payer(entry);
    conn.execute(
        "INSERT INTO transactions(workspace_id, date, amount, type, merchant, payer, note, account_id, receiving_account_id, category_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            ws,
            entry.date.to_string(),
            entry.amount.to_string(),
            entry.tx_type.as_str(),
            merchant,
            payer,
            entry.note,
            entry.account_id,
            entry.receiving_account_id,
            entry.category_id
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn update_transaction(
    conn: &Connection,
    ws: i64,
    id: i64,
    entry: &LedgerEntry,
) -> LedgerResult<()> {
    let (merchant, payer) = merchant_payer(entry);
    let n = conn.execute(
        "UPDATE transactions SET date=?1, amount=?2, type=?3, merchant=?4, payer=?5, note=?6,
             account_id=?7, receiving_account_id=?8, category_id=?9
         WHERE id=?10 AND workspace_id=?11",
        params![
            entry.date.to_string(),
            entry.amount.to_string(),
            entry.tx_type.as_str(),
            merchant,
            payer,
            entry.note,
            entry.account_id,
            entry.receiving_account_id,
            entry.category_id,
            id,
            ws
        ],
    )?;
    if n == 0 {
        return Err(LedgerError::not_found(EntityKind::Transaction, id));
    }
    Ok(())
}

/// Deletes the row together with its receipt.
pub(crate) fn delete_transaction_row(conn: &Connection, ws: i64, id: i64) -> LedgerResult<()> {
    remove_receipt(conn, id)?;
    let n = conn.execute(
        "DELETE FROM transactions WHERE id=?1 AND workspace_id=?2",
        params![id, ws],
    )?;
    if n == 0 {
        return Err(LedgerError::not_found(EntityKind::Transaction, id));
    }
    Ok(())
}

// ---- receipts ----

pub fn receipt_for(conn: &Connection, transaction_id: i64) -> LedgerResult<Option<Receipt>> {
    Ok(conn
        .query_row(
            "SELECT id, transaction_id, timestamp, image, ocr_text FROM receipts WHERE transaction_id=?1",
            params![transaction_id],
            |r| {
                Ok(Receipt {
                    id: r.get(0)?,
                    transaction_id: r.get(1)?,
                    timestamp: r.get(2)?,
                    image: r.get(3)?,
                    ocr_text: r.get(4)?,
                })
            },
        )
        .optional()?)
}

/// Attaches a receipt, replacing any receipt already on the transaction.
pub(crate) fn put_receipt(
    conn: &Connection,
    transaction_id: i64,
    capture: &ReceiptCapture,
) -> LedgerResult<()> {
    remove_receipt(conn, transaction_id)?;
    conn.execute(
        "INSERT INTO receipts(transaction_id, timestamp, image, ocr_text) VALUES (?1, ?2, ?3, ?4)",
        params![
            transaction_id,
            Utc::now(),
            capture.image,
            blank_to_none(capture.ocr_text.as_deref())
        ],
    )?;
    Ok(())
}

pub(crate) fn remove_receipt(conn: &Connection, transaction_id: i64) -> LedgerResult<()> {
    conn.execute(
        "DELETE FROM receipts WHERE transaction_id=?1",
        params![transaction_id],
    )?;
    Ok(())
}

// ---- guarded removals (engine only) ----

pub(crate) fn delete_account_row(conn: &Connection, ws: i64, id: i64) -> LedgerResult<()> {
    conn.execute(
        "UPDATE workspace_preferences SET default_account_id=NULL WHERE workspace_id=?1 AND default_account_id=?2",
        params![ws, id],
    )?;
    let n = conn.execute(
        "DELETE FROM accounts WHERE id=?1 AND workspace_id=?2",
        params![id, ws],
    )?;
    if n == 0 {
        return Err(LedgerError::not_found(EntityKind::Account, id));
    }
    Ok(())
}

pub(crate) fn delete_category_row(conn: &Connection, ws: i64, id: i64) -> LedgerResult<()> {
    conn.execute(
        "UPDATE workspace_preferences SET default_category_id=NULL WHERE workspace_id=?1 AND default_category_id=?2",
        params![ws, id],
    )?;
    let n = conn.execute(
        "DELETE FROM categories WHERE id=?1 AND workspace_id=?2",
        params![id, ws],
    )?;
    if n == 0 {
        return Err(LedgerError::not_found(EntityKind::Category, id));
    }
    Ok(())
}
