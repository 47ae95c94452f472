// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Read-side derivations. Nothing in here writes.

use crate::errors::{LedgerError, LedgerResult};
use crate::ledger::{effects, store};
use crate::models::{Account, Category, Transaction, TransactionType};
use anyhow::{Context, Result};
use chrono::{Datelike, Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Calendar month `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MonthWindow {
    pub fn containing(date: NaiveDate) -> Self {
        let start = date.with_day(1).unwrap_or(date);
        let end = start
            .checked_add_months(Months::new(1))
            .unwrap_or(NaiveDate::MAX);
        MonthWindow { start, end }
    }

    /// Parses `YYYY-MM`.
    pub fn parse(s: &str) -> Result<Self> {
        let start = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
            .with_context(|| format!("Invalid month '{}', expected YYYY-MM", s))?;
        Ok(Self::containing(start))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    pub fn label(&self) -> String {
        self.start.format("%Y-%m").to_string()
    }

    /// Moves the window by `n` months (negative goes back).
    pub fn shift(&self, n: i32) -> Self {
        let months = Months::new(n.unsigned_abs());
        let start = if n >= 0 {
            self.start.checked_add_months(months)
        } else {
            self.start.checked_sub_months(months)
        };
        Self::containing(start.unwrap_or(self.start))
    }
}

/// Expense-type spend per expense category within the window.
///
/// Refunds are left out here; they only reduce `actual_spent`.
pub fn category_month_spend(
    conn: &Connection,
    ws: i64,
    window: &MonthWindow,
) -> LedgerResult<HashMap<i64, Decimal>> {
    let mut stmt = conn.prepare(
        "SELECT t.category_id, t.amount
         FROM transactions t JOIN categories c ON c.id = t.category_id
         WHERE t.workspace_id=?1 AND t.type='expense' AND c.is_expense=1
           AND t.date >= ?2 AND t.date < ?3",
    )?;
    let mut rows = stmt.query(params![
        ws,
        window.start.format("%Y-%m-%d").to_string(),
        window.end.format("%Y-%m-%d").to_string()
    ])?;
    let mut map: HashMap<i64, Decimal> = HashMap::new();
    while let Some(r) = rows.next()? {
        let cid: i64 = r.get(0)?;
        let amount = store::decimal_at(r, 1)?;
        let slot = map.entry(cid).or_insert(Decimal::ZERO);
        *slot = slot.checked_add(amount).ok_or_else(|| {
            LedgerError::overflow(format!("month spend of category {cid}"), "budget overview")
        })?;
    }
    Ok(map)
}

/// Zero-budget categories with no spend this month are hidden.
pub fn is_visible(monthly_budget: Decimal, spent_this_month: Decimal) -> bool {
    !monthly_budget.is_zero() || !spent_this_month.is_zero()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetLine {
    pub category_id: i64,
    pub name: String,
    pub monthly_budget: Decimal,
    pub spent: Decimal,
    pub remaining: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetOverview {
    pub month: String,
    pub total_budget: Decimal,
    pub total_spent: Decimal,
    pub total_remaining: Decimal,
    /// Visible categories of either kind.
    pub lines: Vec<BudgetLine>,
}

pub fn budget_overview(
    conn: &Connection,
    ws: i64,
    window: &MonthWindow,
) -> LedgerResult<BudgetOverview> {
    let categories = store::list_categories(conn, ws)?;
    let spend = category_month_spend(conn, ws, window)?;

    let op = "budget overview";
    let total_budget = effects::checked_sum(categories.iter().map(|c| c.monthly_budget))
        .ok_or_else(|| LedgerError::overflow("total budget", op))?;
    let total_spent = effects::checked_sum(spend.values().copied())
        .ok_or_else(|| LedgerError::overflow("total spent", op))?;
    let total_remaining = total_budget
        .checked_sub(total_spent)
        .ok_or_else(|| LedgerError::overflow("total remaining", op))?;

    let mut lines = Vec::new();
    for c in &categories {
        let spent = spend.get(&c.id).copied().unwrap_or(Decimal::ZERO);
        if !is_visible(c.monthly_budget, spent) {
            continue;
        }
        let remaining = c
            .monthly_budget
            .checked_sub(spent)
            .ok_or_else(|| LedgerError::overflow(format!("remaining budget of {}", c.name), op))?;
        lines.push(BudgetLine {
            category_id: c.id,
            name: c.name.clone(),
            monthly_budget: c.monthly_budget,
            spent,
            remaining,
        });
    }

    Ok(BudgetOverview {
        month: window.label(),
        total_budget,
        total_spent,
        total_remaining,
        lines,
    })
}

/// Sum of every account balance in the workspace.
pub fn total_available(conn: &Connection, ws: i64) -> LedgerResult<Decimal> {
    effects::checked_sum(store::list_accounts(conn, ws)?.iter().map(|a| a.balance))
        .ok_or_else(|| LedgerError::overflow("total available", "sum balances"))
}

/// A transaction with the names it refers to resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionView {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub account_name: String,
    pub receiving_account_name: Option<String>,
    pub category_name: Option<String>,
}

impl TransactionView {
    /// Payer for income, `from to to` for transfers, merchant otherwise.
    pub fn title(&self) -> String {
        match self.transaction.tx_type {
            TransactionType::Transfer => format!(
                "{} to {}",
                self.account_name,
                self.receiving_account_name.as_deref().unwrap_or("?")
            ),
            _ => self.transaction.counterparty().to_string(),
        }
    }

    fn haystack(&self) -> Vec<String> {
        let t = &self.transaction;
        vec![
            t.merchant.as_deref().unwrap_or("").to_lowercase(),
            t.payer.as_deref().unwrap_or("").to_lowercase(),
            t.note.as_deref().unwrap_or("").to_lowercase(),
            self.category_name.as_deref().unwrap_or("").to_lowercase(),
            self.account_name.to_lowercase(),
            t.tx_type.as_str().to_string(),
            t.amount.normalize().to_string(),
            format!("{:.2}", t.amount),
        ]
    }
}

/// Resolves account and category names for `transactions`.
pub fn resolve(
    accounts: &[Account],
    categories: &[Category],
    transactions: Vec<Transaction>,
) -> Vec<TransactionView> {
    let acct: HashMap<i64, &str> = accounts.iter().map(|a| (a.id, a.name.as_str())).collect();
    let cat: HashMap<i64, &str> = categories.iter().map(|c| (c.id, c.name.as_str())).collect();
    transactions
        .into_iter()
        .map(|t| TransactionView {
            account_name: acct.get(&t.account_id).copied().unwrap_or("").to_string(),
            receiving_account_name: t
                .receiving_account_id
                .and_then(|id| acct.get(&id).map(|s| s.to_string())),
            category_name: t
                .category_id
                .and_then(|id| cat.get(&id).map(|s| s.to_string())),
            transaction: t,
        })
        .collect()
}

pub fn views(conn: &Connection, ws: i64, transactions: Vec<Transaction>) -> LedgerResult<Vec<TransactionView>> {
    let accounts = store::list_accounts(conn, ws)?;
    let categories = store::list_categories(conn, ws)?;
    Ok(resolve(&accounts, &categories, transactions))
}

static THRESHOLD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([<>])\s*(\d+(?:\.\d+)?)$").expect("valid threshold regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTerm {
    Above(Decimal),
    Below(Decimal),
    /// Lowercased substring.
    Text(String),
}

impl SearchTerm {
    pub fn parse(raw: &str) -> Option<Self> {
        let term = raw.trim();
        if term.is_empty() {
            return None;
        }
        if let Some(caps) = THRESHOLD.captures(term) {
            if let Ok(v) = caps[2].parse::<Decimal>() {
                return Some(if &caps[1] == ">" {
                    SearchTerm::Above(v)
                } else {
                    SearchTerm::Below(v)
                });
            }
        }
        // unparseable thresholds fall back to plain text
        Some(SearchTerm::Text(term.to_lowercase()))
    }

    fn matches(&self, amount: Decimal, haystack: &[String]) -> bool {
        match self {
            SearchTerm::Above(v) => amount > *v,
            SearchTerm::Below(v) => amount < *v,
            SearchTerm::Text(s) => haystack.iter().any(|h| h.contains(s.as_str())),
        }
    }
}

/// Comma-separated terms; blanks are dropped.
pub fn parse_terms(text: &str) -> Vec<SearchTerm> {
    text.split(',').filter_map(SearchTerm::parse).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    /// AND across terms when true, OR when false.
    pub match_all: bool,
    /// Exact category drill-down; overrides `text` when set.
    pub category_id: Option<i64>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        SearchQuery {
            text: text.into(),
            match_all: true,
            category_id: None,
        }
    }

    pub fn any(mut self) -> Self {
        self.match_all = false;
        self
    }

    pub fn category(category_id: i64) -> Self {
        SearchQuery {
            text: String::new(),
            match_all: true,
            category_id: Some(category_id),
        }
    }

    pub fn matches(&self, view: &TransactionView) -> bool {
        if let Some(cid) = self.category_id {
            return view.transaction.category_id == Some(cid);
        }
        let terms = parse_terms(&self.text);
        if terms.is_empty() {
            return true;
        }
        let hay = view.haystack();
        let amount = view.transaction.amount;
        if self.match_all {
            terms.iter().all(|t| t.matches(amount, &hay))
        } else {
            terms.iter().any(|t| t.matches(amount, &hay))
        }
    }
}

/// Filtered transactions, newest first.
pub fn search_transactions(
    conn: &Connection,
    ws: i64,
    query: &SearchQuery,
) -> LedgerResult<Vec<TransactionView>> {
    let mut out: Vec<TransactionView> = views(conn, ws, store::list_transactions(conn, ws)?)?
        .into_iter()
        .filter(|v| query.matches(v))
        .collect();
    out.sort_by(|a, b| {
        b.transaction
            .date
            .cmp(&a.transaction.date)
            .then(b.transaction.id.cmp(&a.transaction.id))
    });
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub transactions: Vec<TransactionView>,
}

/// Buckets by calendar day, most recent day first. Order within a day is kept.
pub fn group_by_day(views: Vec<TransactionView>) -> Vec<DayGroup> {
    let mut days: BTreeMap<NaiveDate, Vec<TransactionView>> = BTreeMap::new();
    for v in views {
        days.entry(v.transaction.date).or_default().push(v);
    }
    days.into_iter()
        .rev()
        .map(|(date, transactions)| DayGroup { date, transactions })
        .collect()
}

/// Transactions with `start <= date <= end`, oldest first.
pub fn report(
    conn: &Connection,
    ws: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<Vec<TransactionView>> {
    let rows: Vec<Transaction> = store::list_transactions(conn, ws)?
        .into_iter()
        .filter(|t| start <= t.date && t.date <= end)
        .collect();
    views(conn, ws, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn view(id: i64, date: NaiveDate, amount: &str, merchant: &str) -> TransactionView {
        TransactionView {
            transaction: Transaction {
                id,
                workspace_id: 1,
                date,
                amount: dec(amount),
                tx_type: TransactionType::Expense,
                merchant: Some(merchant.to_string()),
                payer: None,
                note: None,
                account_id: 1,
                receiving_account_id: None,
                category_id: Some(7),
            },
            account_name: "Checking".into(),
            receiving_account_name: None,
            category_name: Some("Dining".into()),
        }
    }

    #[test]
    fn month_window_bounds() {
        let w = MonthWindow::parse("2024-12").unwrap();
        assert_eq!(w.start, d(2024, 12, 1));
        assert_eq!(w.end, d(2025, 1, 1));
        assert!(w.contains(d(2024, 12, 31)));
        assert!(!w.contains(d(2025, 1, 1)));
        assert_eq!(w.shift(-1).label(), "2024-11");
        assert_eq!(w.shift(2).label(), "2025-02");
        assert!(MonthWindow::parse("2024-13").is_err());
    }

    #[test]
    fn terms_parse() {
        assert_eq!(
            parse_terms(" Coffee , >20, <5.5,, >abc"),
            vec![
                SearchTerm::Text("coffee".into()),
                SearchTerm::Above(dec("20")),
                SearchTerm::Below(dec("5.5")),
                SearchTerm::Text(">abc".into()),
            ]
        );
    }

    #[test]
    fn match_all_and_any() {
        let cheap = view(1, d(2024, 5, 1), "4.50", "Corner Coffee");
        let dear = view(2, d(2024, 5, 2), "25", "Coffee Roasters");
        let q = SearchQuery::new("coffee,>20");
        assert!(!q.matches(&cheap));
        assert!(q.matches(&dear));
        let q = SearchQuery::new("bakery,<5").any();
        assert!(q.matches(&cheap));
        assert!(!q.matches(&dear));
        // amount at two decimals is searchable text
        assert!(SearchQuery::new("25.00").matches(&dear));
        assert!(SearchQuery::new("dining").matches(&dear));
        assert!(SearchQuery::new("expense").matches(&dear));
    }

    #[test]
    fn exact_category_ignores_text() {
        let v = view(1, d(2024, 5, 1), "4.50", "Corner Coffee");
        let mut q = SearchQuery::category(7);
        q.text = "nothing matches this".into();
        assert!(q.matches(&v));
        assert!(!SearchQuery::category(8).matches(&v));
    }

    #[test]
    fn groups_newest_day_first() {
        let groups = group_by_day(vec![
            view(1, d(2024, 5, 1), "1", "a"),
            view(2, d(2024, 5, 3), "1", "b"),
            view(3, d(2024, 5, 1), "1", "c"),
        ]);
        let dates: Vec<_> = groups.iter().map(|g| g.date).collect();
        assert_eq!(dates, vec![d(2024, 5, 3), d(2024, 5, 1)]);
        assert_eq!(groups[1].transactions.len(), 2);
    }

    #[test]
    fn visibility() {
        assert!(!is_visible(Decimal::ZERO, Decimal::ZERO));
        assert!(is_visible(dec("100"), Decimal::ZERO));
        assert!(is_visible(Decimal::ZERO, dec("3")));
    }

    #[test]
    fn transfer_title() {
        let mut v = view(1, d(2024, 5, 1), "10", "");
        v.transaction.tx_type = TransactionType::Transfer;
        v.receiving_account_name = Some("Savings".into());
        assert_eq!(v.title(), "Checking to Savings");
    }
}
