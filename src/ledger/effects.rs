// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The sign-convention table.
//!
//! | Type     | account         | category            | receiving account |
//! |----------|-----------------|---------------------|-------------------|
//! | expense  | `-= amount`     | `actual_spent += amount` | -            |
//! | refund   | `+= amount`     | `actual_spent -= amount` | -            |
//! | income   | `+= amount`     | -                   | -                 |
//! | transfer | `-= amount`     | -                   | `+= amount`       |
//!
//! Reversal is the exact negation of the same rows.

use crate::models::{LedgerEntry, Transaction, TransactionType};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A stored running total the engine is allowed to mutate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Aggregate {
    Account(i64),
    Category(i64),
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregate::Account(id) => write!(f, "account {}", id),
            Aggregate::Category(id) => write!(f, "category {}", id),
        }
    }
}

/// One signed change to one aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delta {
    pub target: Aggregate,
    pub amount: Decimal,
}

/// The fields of a transaction that decide its balance effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub tx_type: TransactionType,
    pub amount: Decimal,
    pub account_id: i64,
    pub receiving_account_id: Option<i64>,
    pub category_id: Option<i64>,
}

impl From<&Transaction> for Posting {
    fn from(t: &Transaction) -> Self {
        Posting {
            tx_type: t.tx_type,
            amount: t.amount,
            account_id: t.account_id,
            receiving_account_id: t.receiving_account_id,
            category_id: t.category_id,
        }
    }
}

impl From<&LedgerEntry> for Posting {
    fn from(e: &LedgerEntry) -> Self {
        Posting {
            tx_type: e.tx_type,
            amount: e.amount,
            account_id: e.account_id,
            receiving_account_id: e.receiving_account_id,
            category_id: e.category_id,
        }
    }
}

pub fn apply(p: &Posting) -> Vec<Delta> {
    let acct = Aggregate::Account(p.account_id);
    let mut out = Vec::with_capacity(2);
    match p.tx_type {
        TransactionType::Expense => {
            out.push(Delta { target: acct, amount: -p.amount });
            if let Some(c) = p.category_id {
                out.push(Delta { target: Aggregate::Category(c), amount: p.amount });
            }
        }
        TransactionType::Refund => {
            out.push(Delta { target: acct, amount: p.amount });
            if let Some(c) = p.category_id {
                out.push(Delta { target: Aggregate::Category(c), amount: -p.amount });
            }
        }
        // category on income is informational only
        TransactionType::Income => {
            out.push(Delta { target: acct, amount: p.amount });
        }
        TransactionType::Transfer => {
            out.push(Delta { target: acct, amount: -p.amount });
            if let Some(r) = p.receiving_account_id {
                out.push(Delta { target: Aggregate::Account(r), amount: p.amount });
            }
        }
    }
    out
}

pub fn reverse(p: &Posting) -> Vec<Delta> {
    apply(p)
        .into_iter()
        .map(|d| Delta { target: d.target, amount: -d.amount })
        .collect()
}

/// Every aggregate a posting reaches, whether or not its delta is non-zero.
pub fn targets(p: &Posting) -> Vec<Aggregate> {
    apply(p).into_iter().map(|d| d.target).collect()
}

/// Folds deltas into one per aggregate, keeping zero nets so the target is
/// still visited. `None` if a net leaves `Decimal`'s range.
pub fn net(deltas: &[Delta]) -> Option<Vec<Delta>> {
    let mut by_target: BTreeMap<Aggregate, Decimal> = BTreeMap::new();
    for d in deltas {
        let slot = by_target.entry(d.target).or_insert(Decimal::ZERO);
        *slot = slot.checked_add(d.amount)?;
    }
    Some(
        by_target
            .into_iter()
            .map(|(target, amount)| Delta { target, amount })
            .collect(),
    )
}

/// Sums without panicking; `None` once the total leaves `Decimal`'s range.
pub fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(tx_type: TransactionType) -> Posting {
        Posting {
            tx_type,
            amount: Decimal::new(5000, 2),
            account_id: 1,
            receiving_account_id: Some(2),
            category_id: Some(9),
        }
    }

    fn delta_for(deltas: &[Delta], target: Aggregate) -> Option<Decimal> {
        deltas.iter().find(|d| d.target == target).map(|d| d.amount)
    }

    #[test]
    fn expense_debits_account_and_adds_spend() {
        let d = apply(&posting(TransactionType::Expense));
        assert_eq!(d.len(), 2);
        assert_eq!(delta_for(&d, Aggregate::Account(1)), Some(Decimal::new(-5000, 2)));
        assert_eq!(delta_for(&d, Aggregate::Category(9)), Some(Decimal::new(5000, 2)));
    }

    #[test]
    fn refund_credits_account_and_lowers_spend() {
        let d = apply(&posting(TransactionType::Refund));
        assert_eq!(delta_for(&d, Aggregate::Account(1)), Some(Decimal::new(5000, 2)));
        assert_eq!(delta_for(&d, Aggregate::Category(9)), Some(Decimal::new(-5000, 2)));
    }

    #[test]
    fn income_never_touches_category() {
        let d = apply(&posting(TransactionType::Income));
        assert_eq!(d, vec![Delta { target: Aggregate::Account(1), amount: Decimal::new(5000, 2) }]);
    }

    #[test]
    fn transfer_moves_between_accounts_only() {
        let d = apply(&posting(TransactionType::Transfer));
        assert_eq!(delta_for(&d, Aggregate::Account(1)), Some(Decimal::new(-5000, 2)));
        assert_eq!(delta_for(&d, Aggregate::Account(2)), Some(Decimal::new(5000, 2)));
        assert_eq!(delta_for(&d, Aggregate::Category(9)), None);
    }

    #[test]
    fn reverse_negates_every_row() {
        for t in TransactionType::ALL {
            let p = posting(t);
            let sum: Decimal = apply(&p)
                .iter()
                .chain(reverse(&p).iter())
                .map(|d| d.amount)
                .sum();
            assert_eq!(sum, Decimal::ZERO, "{t}");
            assert_eq!(targets(&p).len(), reverse(&p).len());
        }
    }

    #[test]
    fn edit_nets_to_one_delta_per_aggregate() {
        let old = posting(TransactionType::Expense);
        let new = Posting {
            amount: Decimal::new(8000, 2),
            ..old
        };
        let deltas: Vec<Delta> = reverse(&old).into_iter().chain(apply(&new)).collect();
        let netted = net(&deltas).unwrap();
        assert_eq!(
            netted,
            vec![
                Delta { target: Aggregate::Account(1), amount: Decimal::new(-3000, 2) },
                Delta { target: Aggregate::Category(9), amount: Decimal::new(3000, 2) },
            ]
        );
    }

    #[test]
    fn unchanged_edit_still_visits_targets() {
        let p = posting(TransactionType::Transfer);
        let deltas: Vec<Delta> = reverse(&p).into_iter().chain(apply(&p)).collect();
        let netted = net(&deltas).unwrap();
        assert_eq!(netted.len(), 2);
        assert!(netted.iter().all(|d| d.amount.is_zero()));
    }

    #[test]
    fn sums_report_overflow_instead_of_panicking() {
        assert_eq!(checked_sum([Decimal::MAX, Decimal::ONE]), None);
        assert_eq!(checked_sum([Decimal::ONE, Decimal::TWO]), Some(Decimal::new(3, 0)));
        let big = [
            Delta { target: Aggregate::Account(1), amount: Decimal::MAX },
            Delta { target: Aggregate::Account(1), amount: Decimal::MAX },
        ];
        assert_eq!(net(&big), None);
    }
}
