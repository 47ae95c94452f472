// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::effects::Aggregate;
use crate::models::EntityKind;
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

/// Bad user input. Nothing was mutated; the caller should re-prompt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a merchant or payer.")]
    MissingCounterparty,
    #[error("Please enter a valid amount ('{0}' is not a positive number).")]
    InvalidAmount(String),
    #[error("Amounts are kept to the cent; '{0}' has more than two decimal places.")]
    TooPrecise(String),
    #[error("'{0}' is larger than the ledger accepts (at most 1,000,000,000,000).")]
    AmountTooLarge(String),
    #[error("Please select an account.")]
    MissingAccount,
    #[error("Please select a receiving account.")]
    MissingReceivingAccount,
    #[error("Sending and receiving accounts must be different.")]
    SameAccountTransfer,
    #[error("Please select a category.")]
    MissingCategory,
    #[error("Account {0} does not exist in this workspace.")]
    UnknownAccount(i64),
    #[error("Category {0} does not exist in this workspace.")]
    UnknownCategory(i64),
    #[error("Category '{name}' is an {actual} category but {tx_type} needs an {wanted} category.")]
    CategoryKindMismatch {
        name: String,
        tx_type: String,
        actual: &'static str,
        wanted: &'static str,
    },
    #[error("Name must not be empty.")]
    EmptyName,
    #[error("A {entity} named '{name}' already exists in this workspace.")]
    DuplicateName { entity: EntityKind, name: String },
}

/// A stored aggregate that disagrees with the transaction history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discrepancy {
    pub aggregate: Aggregate,
    pub name: String,
    pub stored: Decimal,
    pub expected: Decimal,
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}': stored {} but history gives {}",
            self.aggregate, self.name, self.stored, self.expected
        )
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Storage failure during {op}: {source}")]
    Persistence {
        op: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Reconciliation failed during {op}: {}", list(.discrepancies))]
    Reconciliation {
        op: String,
        discrepancies: Vec<Discrepancy>,
    },

    #[error("{aggregate} is on hold pending reconciliation; refusing {op}")]
    OnHold { aggregate: Aggregate, op: String },

    #[error("{entity} {id} has {dependents} dependent transaction(s); confirm to delete them as well")]
    HasDependents {
        entity: EntityKind,
        id: i64,
        dependents: usize,
    },

    #[error("{what} would overflow during {op}")]
    Overflow { what: String, op: String },

    #[error("{entity} '{key}' not found")]
    NotFound { entity: EntityKind, key: String },
}

fn list(items: &[Discrepancy]) -> String {
    items
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl LedgerError {
    pub fn not_found(entity: EntityKind, key: impl ToString) -> Self {
        LedgerError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn overflow(what: impl ToString, op: &str) -> Self {
        LedgerError::Overflow {
            what: what.to_string(),
            op: op.to_string(),
        }
    }

    /// Storage failures roll back cleanly and may be retried as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Persistence { .. })
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(source: rusqlite::Error) -> Self {
        LedgerError::Persistence {
            op: "storage access".into(),
            source,
        }
    }
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Names the operation on persistence errors bubbling out of a write unit.
pub trait OpContext<T> {
    fn during(self, op: &str) -> LedgerResult<T>;
}

impl<T> OpContext<T> for LedgerResult<T> {
    fn during(self, op: &str) -> LedgerResult<T> {
        self.map_err(|err| match err {
            LedgerError::Persistence { source, .. } => LedgerError::Persistence {
                op: op.to_string(),
                source,
            },
            other => other,
        })
    }
}

impl<T> OpContext<T> for rusqlite::Result<T> {
    fn during(self, op: &str) -> LedgerResult<T> {
        self.map_err(|source| LedgerError::Persistence {
            op: op.to_string(),
            source,
        })
    }
}
