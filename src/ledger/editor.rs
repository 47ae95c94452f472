// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Create/edit workflow for a single transaction.
//!
//! New: `Composing -> Validating -> Committed | Rejected`.
//! Edit: `Loaded -> Composing -> Validating -> Committed | Rejected`.
//!
//! Validation runs before any mutation and reports the first failing check:
//! counterparty, amount, sending account, receiving account (transfer),
//! category (expense/refund, and income once income categories exist),
//! category kind.

use crate::errors::{LedgerResult, ValidationError};
use crate::ledger::{engine, preferences, store};
use crate::models::{
    Account, Category, LedgerEntry, ReceiptChange, Transaction, TransactionType, check_money,
};
use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;

/// Raw field values as the user entered them.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionForm {
    pub date: NaiveDate,
    pub tx_type: TransactionType,
    /// Merchant, or payer for income. Ignored for transfers.
    pub counterparty: String,
    pub amount: String,
    pub note: String,
    pub account_id: Option<i64>,
    pub receiving_account_id: Option<i64>,
    pub category_id: Option<i64>,
    pub receipt: ReceiptChange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorState {
    Loaded(Transaction),
    Composing,
    Validating,
    Committed(Transaction),
    Rejected(ValidationError),
}

/// A form that passed validation. Only the editor can build one, so the
/// engine never sees unchecked input.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEntry {
    entry: LedgerEntry,
}

impl ValidatedEntry {
    pub fn entry(&self) -> &LedgerEntry {
        &self.entry
    }
}

fn parse_amount(raw: &str) -> Result<Decimal, ValidationError> {
    let t = raw.trim();
    match t.parse::<Decimal>() {
        Ok(v) if v > Decimal::ZERO => check_money(v),
        _ => Err(ValidationError::InvalidAmount(t.to_string())),
    }
}

fn kind_name(is_expense: bool) -> &'static str {
    if is_expense { "expense" } else { "income" }
}

/// Checks `form` against the workspace's accounts and categories.
pub fn validate_form(
    form: &TransactionForm,
    accounts: &[Account],
    categories: &[Category],
) -> Result<ValidatedEntry, ValidationError> {
    let tx_type = form.tx_type;
    let is_transfer = tx_type == TransactionType::Transfer;

    let who = form.counterparty.trim();
    if !is_transfer && who.is_empty() {
        return Err(ValidationError::MissingCounterparty);
    }

    let amount = parse_amount(&form.amount)?;

    let account_id = form.account_id.ok_or(ValidationError::MissingAccount)?;
    if !accounts.iter().any(|a| a.id == account_id) {
        return Err(ValidationError::UnknownAccount(account_id));
    }

    let receiving_account_id = if is_transfer {
        let r = form
            .receiving_account_id
            .ok_or(ValidationError::MissingReceivingAccount)?;
        if !accounts.iter().any(|a| a.id == r) {
            return Err(ValidationError::UnknownAccount(r));
        }
        if r == account_id {
            return Err(ValidationError::SameAccountTransfer);
        }
        Some(r)
    } else {
        None
    };

    let category_id = match tx_type.wants_expense_category() {
        None => None,
        Some(want_expense) => {
            // income needs a category only once income categories exist
            let required =
                want_expense || categories.iter().any(|c| !c.is_expense);
            match form.category_id {
                None if required => return Err(ValidationError::MissingCategory),
                None => None,
                Some(id) => {
                    let cat = categories
                        .iter()
                        .find(|c| c.id == id)
                        .ok_or(ValidationError::UnknownCategory(id))?;
                    if cat.is_expense != want_expense {
                        return Err(ValidationError::CategoryKindMismatch {
                            name: cat.name.clone(),
                            tx_type: tx_type.as_str().to_string(),
                            actual: kind_name(cat.is_expense),
                            wanted: kind_name(want_expense),
                        });
                    }
                    Some(id)
                }
            }
        }
    };

    let note = form.note.trim();
    Ok(ValidatedEntry {
        entry: LedgerEntry {
            date: form.date,
            tx_type,
            amount,
            counterparty: if is_transfer { None } else { Some(who.to_string()) },
            note: if note.is_empty() { None } else { Some(note.to_string()) },
            account_id,
            receiving_account_id,
            category_id,
        },
    })
}

fn pick_category(
    categories: &[Category],
    tx_type: TransactionType,
    preferred: Option<i64>,
) -> Option<i64> {
    let want = tx_type.wants_expense_category()?;
    if let Some(id) = preferred {
        if categories.iter().any(|c| c.id == id && c.is_expense == want) {
            return Some(id);
        }
    }
    categories.iter().find(|c| c.is_expense == want).map(|c| c.id)
}

#[derive(Debug, Clone)]
pub struct TransactionEditor {
    workspace_id: i64,
    original: Option<Transaction>,
    form: TransactionForm,
    state: EditorState,
    accounts: Vec<Account>,
    categories: Vec<Category>,
    preferred_category: Option<i64>,
}

impl TransactionEditor {
    /// Starts a new transaction, pre-selecting the workspace's remembered
    /// account and category when they still exist.
    pub fn compose(
        conn: &Connection,
        ws: i64,
        date: NaiveDate,
        tx_type: TransactionType,
    ) -> LedgerResult<Self> {
        store::get_workspace(conn, ws)?;
        let accounts = store::list_accounts(conn, ws)?;
        let categories = store::list_categories(conn, ws)?;
        let defaults = preferences::load(conn, ws)?;

        let account_id = defaults
            .account_id
            .filter(|id| accounts.iter().any(|a| a.id == *id))
            .or_else(|| accounts.first().map(|a| a.id));
        let category_id = pick_category(&categories, tx_type, defaults.category_id);

        Ok(TransactionEditor {
            workspace_id: ws,
            original: None,
            form: TransactionForm {
                date,
                tx_type,
                counterparty: String::new(),
                amount: String::new(),
                note: String::new(),
                account_id,
                receiving_account_id: None,
                category_id,
                receipt: ReceiptChange::Keep,
            },
            state: EditorState::Composing,
            accounts,
            categories,
            preferred_category: defaults.category_id,
        })
    }

    /// Opens an existing transaction for editing.
    pub fn load(conn: &Connection, ws: i64, id: i64) -> LedgerResult<Self> {
        let snapshot = store::get_transaction(conn, ws, id)?;
        let accounts = store::list_accounts(conn, ws)?;
        let categories = store::list_categories(conn, ws)?;
        let form = TransactionForm {
            date: snapshot.date,
            tx_type: snapshot.tx_type,
            counterparty: snapshot.counterparty().to_string(),
            amount: snapshot.amount.to_string(),
            note: snapshot.note.clone().unwrap_or_default(),
            account_id: Some(snapshot.account_id),
            receiving_account_id: snapshot.receiving_account_id,
            category_id: snapshot.category_id,
            receipt: ReceiptChange::Keep,
        };
        Ok(TransactionEditor {
            workspace_id: ws,
            original: Some(snapshot.clone()),
            form,
            state: EditorState::Loaded(snapshot),
            accounts,
            categories,
            preferred_category: None,
        })
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn form(&self) -> &TransactionForm {
        &self.form
    }

    pub fn is_edit(&self) -> bool {
        self.original.is_some()
    }

    /// Mutable access to the fields; moves the editor back to `Composing`.
    pub fn form_mut(&mut self) -> &mut TransactionForm {
        self.state = EditorState::Composing;
        &mut self.form
    }

    /// Switches the type and re-selects a category that fits it.
    pub fn set_type(&mut self, tx_type: TransactionType) {
        let keep = self.form.category_id.or(self.preferred_category);
        let form = self.form_mut();
        form.tx_type = tx_type;
        if tx_type != TransactionType::Transfer {
            form.receiving_account_id = None;
        }
        let picked = pick_category(&self.categories, tx_type, keep);
        self.form.category_id = picked;
    }

    pub fn validate(&mut self) -> Result<ValidatedEntry, ValidationError> {
        self.state = EditorState::Validating;
        match validate_form(&self.form, &self.accounts, &self.categories) {
            Ok(v) => Ok(v),
            Err(err) => {
                self.state = EditorState::Rejected(err.clone());
                Err(err)
            }
        }
    }

    /// Validates against fresh workspace data and hands the entry to the
    /// engine. Validation failures leave the editor `Rejected` with nothing
    /// written; storage failures leave it `Composing` so the caller can retry.
    pub fn commit(&mut self, conn: &mut Connection) -> LedgerResult<Transaction> {
        if let EditorState::Committed(done) = &self.state {
            return Ok(done.clone());
        }
        let ws = self.workspace_id;
        self.accounts = store::list_accounts(conn, ws)?;
        self.categories = store::list_categories(conn, ws)?;
        let valid = self.validate()?;
        let receipt = self.form.receipt.clone();

        let result = match self.original.as_ref().map(|t| t.id) {
            None => {
                let capture = match &receipt {
                    ReceiptChange::Replace(c) => Some(c),
                    ReceiptChange::Keep | ReceiptChange::Remove => None,
                };
                engine::commit_unit(conn, "create transaction", |c| {
                    let id = engine::create_in(c, ws, &valid, capture)?;
                    preferences::remember(c, ws, valid.entry())?;
                    store::get_transaction(c, ws, id)
                })
            }
            Some(id) => engine::commit_unit(conn, "edit transaction", |c| {
                engine::edit_in(c, ws, id, &valid, &receipt)?;
                store::get_transaction(c, ws, id)
            }),
        };

        match result {
            Ok(t) => {
                self.state = EditorState::Committed(t.clone());
                Ok(t)
            }
            Err(err) => {
                self.state = EditorState::Composing;
                Err(err)
            }
        }
    }
}
