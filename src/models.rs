// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::ValidationError;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest amount, balance or budget the ledger accepts: one trillion.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

/// Amounts are kept to the cent.
pub const MONEY_SCALE: u32 = 2;

/// Rejects sub-cent digits and magnitudes above [`MAX_AMOUNT`].
pub fn check_money(value: Decimal) -> Result<Decimal, ValidationError> {
    if value.normalize().scale() > MONEY_SCALE {
        return Err(ValidationError::TooPrecise(value.to_string()));
    }
    if value.abs() > MAX_AMOUNT {
        return Err(ValidationError::AmountTooLarge(value.to_string()));
    }
    Ok(value)
}

/// The four kinds of money movement a transaction can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
    Refund,
    Transfer,
}

impl TransactionType {
    pub const ALL: [TransactionType; 4] = [
        TransactionType::Income,
        TransactionType::Expense,
        TransactionType::Refund,
        TransactionType::Transfer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
            TransactionType::Refund => "refund",
            TransactionType::Transfer => "transfer",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            TransactionType::Income => "Income",
            TransactionType::Expense => "Expense",
            TransactionType::Refund => "Refund",
            TransactionType::Transfer => "Transfer",
        }
    }

    /// Expense and refund draw from expense categories; income from income ones.
    pub fn wants_expense_category(self) -> Option<bool> {
        match self {
            TransactionType::Expense | TransactionType::Refund => Some(true),
            TransactionType::Income => Some(false),
            TransactionType::Transfer => None,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            "refund" => Ok(TransactionType::Refund),
            "transfer" => Ok(TransactionType::Transfer),
            other => Err(format!(
                "Unknown transaction type '{}' (use income|expense|refund|transfer)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub workspace_id: i64,
    pub name: String,
    pub balance: Decimal,
    pub initial_balance: Decimal, // signed, as stored at creation
    pub is_credit: bool,
    pub last_four_digits: Option<String>,
    pub on_hold: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub workspace_id: i64,
    pub name: String,
    pub monthly_budget: Decimal,
    pub is_expense: bool,
    pub actual_spent: Decimal,
    pub on_hold: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub workspace_id: i64,
    pub date: NaiveDate,
    pub amount: Decimal, // always positive; direction comes from tx_type
    pub tx_type: TransactionType,
    pub merchant: Option<String>,
    pub payer: Option<String>,
    pub note: Option<String>,
    pub account_id: i64,
    pub receiving_account_id: Option<i64>,
    pub category_id: Option<i64>,
}

impl Transaction {
    /// Payer for income, merchant for everything else.
    pub fn counterparty(&self) -> &str {
        let v = match self.tx_type {
            TransactionType::Income => self.payer.as_deref(),
            _ => self.merchant.as_deref(),
        };
        v.unwrap_or("")
    }
}

/// Field values for a transaction about to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub date: NaiveDate,
    pub tx_type: TransactionType,
    pub amount: Decimal,
    pub counterparty: Option<String>,
    pub note: Option<String>,
    pub account_id: i64,
    pub receiving_account_id: Option<i64>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: i64,
    pub transaction_id: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(skip)]
    pub image: Vec<u8>,
    pub ocr_text: Option<String>,
}

/// Image bytes and optional OCR text handed over by the capture provider.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReceiptCapture {
    pub image: Vec<u8>,
    pub ocr_text: Option<String>,
}

/// What an edit does to the receipt already attached to a transaction.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ReceiptChange {
    #[default]
    Keep,
    Replace(ReceiptCapture),
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Workspace,
    Account,
    Category,
    Transaction,
    Receipt,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Workspace => "workspace",
            EntityKind::Account => "account",
            EntityKind::Category => "category",
            EntityKind::Transaction => "transaction",
            EntityKind::Receipt => "receipt",
        };
        f.write_str(s)
    }
}
