// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Compares stored running totals against the transaction history.
//!
//! Expected account balance: `initial_balance + Σ signed effects`.
//! Expected category spend: `Σ expense − Σ refund` of assigned transactions.

use crate::errors::{Discrepancy, LedgerError, LedgerResult, OpContext};
use crate::ledger::effects::{self, Aggregate, Posting};
use crate::ledger::store;
use crate::models::Transaction;
use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;
use std::collections::HashMap;

fn fold(transactions: &[Transaction]) -> LedgerResult<HashMap<Aggregate, Decimal>> {
    let mut sums: HashMap<Aggregate, Decimal> = HashMap::new();
    for t in transactions {
        for d in effects::apply(&Posting::from(t)) {
            let slot = sums.entry(d.target).or_insert(Decimal::ZERO);
            *slot = slot
                .checked_add(d.amount)
                .ok_or_else(|| LedgerError::overflow(d.target, "replay history"))?;
        }
    }
    Ok(sums)
}

fn with_base(
    base: Decimal,
    sums: &HashMap<Aggregate, Decimal>,
    agg: Aggregate,
) -> LedgerResult<Decimal> {
    base.checked_add(sums.get(&agg).copied().unwrap_or(Decimal::ZERO))
        .ok_or_else(|| LedgerError::overflow(agg, "replay history"))
}

/// Expected total for one aggregate, recomputed from its transactions.
pub fn expected_total(conn: &Connection, ws: i64, agg: Aggregate) -> LedgerResult<Decimal> {
    let (base, history) = match agg {
        Aggregate::Account(id) => {
            let acct = store::get_account(conn, ws, id)?;
            (acct.initial_balance, store::transactions_for_account(conn, ws, id)?)
        }
        Aggregate::Category(id) => {
            store::get_category(conn, ws, id)?;
            (Decimal::ZERO, store::transactions_for_category(conn, ws, id)?)
        }
    };
    with_base(base, &fold(&history)?, agg)
}

/// Checks the listed aggregates; any mismatch fails the surrounding unit.
pub(crate) fn verify(conn: &Connection, ws: i64, aggs: &[Aggregate], op: &str) -> LedgerResult<()> {
    let mut bad = Vec::new();
    for agg in aggs {
        let (stored, _, name) = store::aggregate_state(conn, ws, *agg)?;
        let expected = expected_total(conn, ws, *agg)?;
        if stored != expected {
            bad.push(Discrepancy {
                aggregate: *agg,
                name,
                stored,
                expected,
            });
        }
    }
    if bad.is_empty() {
        return Ok(());
    }
    for d in &bad {
        tracing::warn!(%op, discrepancy = %d, "running total disagrees with history");
    }
    Err(LedgerError::Reconciliation {
        op: op.to_string(),
        discrepancies: bad,
    })
}

/// Puts aggregates on hold so that no further mutation touches them.
pub(crate) fn hold(conn: &mut Connection, aggs: &[Aggregate]) -> LedgerResult<()> {
    let tx = conn.transaction().during("hold aggregates")?;
    for agg in aggs {
        store::set_hold(&tx, *agg, true)?;
        tracing::warn!(aggregate = %agg, "aggregate put on hold");
    }
    tx.commit().during("hold aggregates")?;
    Ok(())
}

/// Every aggregate in the workspace whose stored total disagrees with history.
pub fn check_workspace(conn: &Connection, ws: i64) -> LedgerResult<Vec<Discrepancy>> {
    store::get_workspace(conn, ws)?;
    let sums = fold(&store::list_transactions(conn, ws)?)?;
    let mut out = Vec::new();
    for a in store::list_accounts(conn, ws)? {
        let agg = Aggregate::Account(a.id);
        let expected = with_base(a.initial_balance, &sums, agg)?;
        if a.balance != expected {
            out.push(Discrepancy {
                aggregate: agg,
                name: a.name,
                stored: a.balance,
                expected,
            });
        }
    }
    for c in store::list_categories(conn, ws)? {
        let agg = Aggregate::Category(c.id);
        let expected = sums.get(&agg).copied().unwrap_or(Decimal::ZERO);
        if c.actual_spent != expected {
            out.push(Discrepancy {
                aggregate: agg,
                name: c.name,
                stored: c.actual_spent,
                expected,
            });
        }
    }
    Ok(out)
}

/// Like [`check_workspace`], and holds every mismatched aggregate.
pub fn audit_workspace(conn: &mut Connection, ws: i64) -> LedgerResult<Vec<Discrepancy>> {
    let found = check_workspace(conn, ws)?;
    if !found.is_empty() {
        let aggs: Vec<Aggregate> = found.iter().map(|d| d.aggregate).collect();
        hold(conn, &aggs)?;
    }
    Ok(found)
}

/// Re-runs the apply table over history, stores the results and lifts all
/// holds. Returns what was corrected.
///
/// Sync merges end here too: remote rows are merged as transactions and the
/// totals are rebuilt, never merged as raw numbers.
pub fn rebuild_workspace(conn: &mut Connection, ws: i64) -> LedgerResult<Vec<Discrepancy>> {
    let op = "rebuild workspace";
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .during(op)?;
    let fixed = check_workspace(&tx, ws).during(op)?;
    for d in &fixed {
        store::set_aggregate_total(&tx, d.aggregate, d.expected).during(op)?;
        tracing::info!(discrepancy = %d, "running total rebuilt");
    }
    for a in store::list_accounts(&tx, ws)? {
        store::set_hold(&tx, Aggregate::Account(a.id), false)?;
    }
    for c in store::list_categories(&tx, ws)? {
        store::set_hold(&tx, Aggregate::Category(c.id), false)?;
    }
    tx.commit().during(op)?;
    Ok(fixed)
}
