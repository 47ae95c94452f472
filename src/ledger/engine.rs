// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Balance mutation engine.
//!
//! Every write runs in one IMMEDIATE sqlite transaction: the pre-image is
//! read under the same lock it is written under, old effects are reversed
//! before new ones are applied, and the touched aggregates are checked
//! against history before commit. Anything that fails rolls the whole unit
//! back.

use crate::errors::{LedgerError, LedgerResult, OpContext};
use crate::ledger::editor::ValidatedEntry;
use crate::ledger::effects::{self, Aggregate, Delta, Posting};
use crate::ledger::{reconcile, store};
use crate::models::{EntityKind, ReceiptCapture, ReceiptChange, Transaction};
use rusqlite::{Connection, TransactionBehavior};
use std::collections::BTreeSet;

/// Runs `body` as a single atomic unit named `op`.
///
/// On a reconciliation failure the unit is rolled back and the mismatched
/// aggregates are put on hold in a separate write.
pub(crate) fn commit_unit<T>(
    conn: &mut Connection,
    op: &str,
    body: impl FnOnce(&Connection) -> LedgerResult<T>,
) -> LedgerResult<T> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .during(op)?;
    match body(&*tx).during(op) {
        Ok(out) => {
            tx.commit().during(op)?;
            Ok(out)
        }
        Err(err) => {
            drop(tx);
            if let LedgerError::Reconciliation { discrepancies, .. } = &err {
                let held: Vec<Aggregate> = discrepancies.iter().map(|d| d.aggregate).collect();
                if let Err(hold_err) = reconcile::hold(conn, &held) {
                    tracing::error!(%op, error = %hold_err, "could not record reconciliation hold");
                }
            }
            Err(err)
        }
    }
}

/// Posts the deltas netted per aggregate, one write each. Held aggregates
/// refuse any change.
pub(crate) fn post(conn: &Connection, ws: i64, deltas: &[Delta], op: &str) -> LedgerResult<()> {
    let netted = effects::net(deltas).ok_or_else(|| LedgerError::overflow("net change", op))?;
    for d in netted {
        let (stored, on_hold, _) = store::aggregate_state(conn, ws, d.target)?;
        if on_hold {
            return Err(LedgerError::OnHold {
                aggregate: d.target,
                op: op.to_string(),
            });
        }
        let next = stored
            .checked_add(d.amount)
            .ok_or_else(|| LedgerError::overflow(d.target, op))?;
        store::set_aggregate_total(conn, d.target, next)?;
        tracing::debug!(aggregate = %d.target, delta = %d.amount, total = %next, "posted");
    }
    Ok(())
}

fn touched(postings: &[&Posting]) -> Vec<Aggregate> {
    let set: BTreeSet<Aggregate> = postings.iter().flat_map(|p| effects::targets(p)).collect();
    set.into_iter().collect()
}

pub(crate) fn create_in(
    conn: &Connection,
    ws: i64,
    entry: &ValidatedEntry,
    receipt: Option<&ReceiptCapture>,
) -> LedgerResult<i64> {
    let op = "create transaction";
    let new = Posting::from(entry.entry());
    post(conn, ws, &effects::apply(&new), op)?;
    let id = store::insert_transaction(conn, ws, entry.entry())?;
    if let Some(r) = receipt {
        store::put_receipt(conn, id, r)?;
    }
    reconcile::verify(conn, ws, &touched(&[&new]), op)?;
    tracing::info!(workspace = ws, transaction = id, tx_type = %new.tx_type, amount = %new.amount, "transaction created");
    Ok(id)
}

pub(crate) fn edit_in(
    conn: &Connection,
    ws: i64,
    id: i64,
    entry: &ValidatedEntry,
    receipt: &ReceiptChange,
) -> LedgerResult<()> {
    let op = "edit transaction";
    // pre-image, read inside the unit
    let before = store::get_transaction(conn, ws, id)?;
    let old = Posting::from(&before);
    let new = Posting::from(entry.entry());
    // old effects reversed first, then the new ones; one write per aggregate
    let deltas: Vec<Delta> = effects::reverse(&old)
        .into_iter()
        .chain(effects::apply(&new))
        .collect();
    post(conn, ws, &deltas, op)?;
    store::update_transaction(conn, ws, id, entry.entry())?;
    match receipt {
        ReceiptChange::Keep => {}
        ReceiptChange::Replace(capture) => store::put_receipt(conn, id, capture)?,
        ReceiptChange::Remove => store::remove_receipt(conn, id)?,
    }
    reconcile::verify(conn, ws, &touched(&[&old, &new]), op)?;
    tracing::info!(
        workspace = ws,
        transaction = id,
        old_type = %old.tx_type,
        old_amount = %old.amount,
        new_type = %new.tx_type,
        new_amount = %new.amount,
        "transaction edited"
    );
    Ok(())
}

pub(crate) fn delete_in(conn: &Connection, ws: i64, id: i64) -> LedgerResult<()> {
    let op = "delete transaction";
    let before = store::get_transaction(conn, ws, id)?;
    let old = Posting::from(&before);
    post(conn, ws, &effects::reverse(&old), op)?;
    store::delete_transaction_row(conn, ws, id)?;
    reconcile::verify(conn, ws, &touched(&[&old]), op)?;
    tracing::info!(workspace = ws, transaction = id, "transaction deleted");
    Ok(())
}

pub fn create_transaction(
    conn: &mut Connection,
    ws: i64,
    entry: &ValidatedEntry,
    receipt: Option<&ReceiptCapture>,
) -> LedgerResult<Transaction> {
    commit_unit(conn, "create transaction", |c| {
        let id = create_in(c, ws, entry, receipt)?;
        store::get_transaction(c, ws, id)
    })
}

pub fn edit_transaction(
    conn: &mut Connection,
    ws: i64,
    id: i64,
    entry: &ValidatedEntry,
    receipt: &ReceiptChange,
) -> LedgerResult<Transaction> {
    commit_unit(conn, "edit transaction", |c| {
        edit_in(c, ws, id, entry, receipt)?;
        store::get_transaction(c, ws, id)
    })
}

pub fn delete_transaction(conn: &mut Connection, ws: i64, id: i64) -> LedgerResult<()> {
    commit_unit(conn, "delete transaction", |c| delete_in(c, ws, id))
}

/// Deletes every listed transaction or none of them.
pub fn delete_transactions(conn: &mut Connection, ws: i64, ids: &[i64]) -> LedgerResult<usize> {
    let unique: BTreeSet<i64> = ids.iter().copied().collect();
    commit_unit(conn, "delete transactions", |c| {
        for id in &unique {
            delete_in(c, ws, *id)?;
        }
        Ok(unique.len())
    })
}

/// Reverses and removes dependents, leaving the doomed aggregate alone.
fn cascade(
    conn: &Connection,
    ws: i64,
    doomed: Aggregate,
    dependents: &[Transaction],
    op: &str,
) -> LedgerResult<Vec<Aggregate>> {
    let mut reached = BTreeSet::new();
    for t in dependents {
        let deltas: Vec<Delta> = effects::reverse(&Posting::from(t))
            .into_iter()
            .filter(|d| d.target != doomed)
            .collect();
        post(conn, ws, &deltas, op)?;
        reached.extend(deltas.iter().map(|d| d.target));
        store::delete_transaction_row(conn, ws, t.id)?;
    }
    Ok(reached.into_iter().collect())
}

/// Deletes an account. With dependent transactions and no confirmation this
/// is refused with [`LedgerError::HasDependents`]; once confirmed, the
/// dependents are reversed and removed in the same unit. Returns how many
/// transactions went with it.
pub fn delete_account(
    conn: &mut Connection,
    ws: i64,
    id: i64,
    confirmed: bool,
) -> LedgerResult<usize> {
    let op = "delete account";
    commit_unit(conn, op, |c| {
        store::get_account(c, ws, id)?;
        let dependents = store::transactions_for_account(c, ws, id)?;
        if !dependents.is_empty() && !confirmed {
            tracing::warn!(workspace = ws, account = id, dependents = dependents.len(), "delete refused");
            return Err(LedgerError::HasDependents {
                entity: EntityKind::Account,
                id,
                dependents: dependents.len(),
            });
        }
        let reached = cascade(c, ws, Aggregate::Account(id), &dependents, op)?;
        store::delete_account_row(c, ws, id)?;
        reconcile::verify(c, ws, &reached, op)?;
        tracing::info!(workspace = ws, account = id, removed = dependents.len(), "account deleted");
        Ok(dependents.len())
    })
}

/// Category counterpart of [`delete_account`].
pub fn delete_category(
    conn: &mut Connection,
    ws: i64,
    id: i64,
    confirmed: bool,
) -> LedgerResult<usize> {
    let op = "delete category";
    commit_unit(conn, op, |c| {
        store::get_category(c, ws, id)?;
        let dependents = store::transactions_for_category(c, ws, id)?;
        if !dependents.is_empty() && !confirmed {
            tracing::warn!(workspace = ws, category = id, dependents = dependents.len(), "delete refused");
            return Err(LedgerError::HasDependents {
                entity: EntityKind::Category,
                id,
                dependents: dependents.len(),
            });
        }
        let reached = cascade(c, ws, Aggregate::Category(id), &dependents, op)?;
        store::delete_category_row(c, ws, id)?;
        reconcile::verify(c, ws, &reached, op)?;
        tracing::info!(workspace = ws, category = id, removed = dependents.len(), "category deleted");
        Ok(dependents.len())
    })
}
