//! Transaction Log.
//!
//! A ledger [`Entry`] records a single-direction balance movement. Entries are
//! append-only: the engine inserts them and never updates or deletes them.
//! The direction lives in [`EntryKind`], the amount is always a non-negative
//! magnitude.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, MoneyCents};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Deposit,
    Withdraw,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
        }
    }
}

impl TryFrom<&str> for EntryKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "deposit" => Ok(Self::Deposit),
            "withdraw" => Ok(Self::Withdraw),
            other => Err(EngineError::Inconsistent(format!(
                "unknown entry kind: {other}"
            ))),
        }
    }
}

/// A persisted ledger entry.
///
/// `id` and `timestamp` are assigned when the entry is committed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub account_id: i64,
    pub amount: MoneyCents,
    pub kind: EntryKind,
    pub details: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
}

impl Entry {
    /// Signed effect of this entry on the account balance.
    #[must_use]
    pub fn signed_amount(&self) -> i64 {
        match self.kind {
            EntryKind::Deposit => self.amount.cents(),
            EntryKind::Withdraw => -self.amount.cents(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub account_id: i64,
    pub amount: i64,
    pub kind: String,
    pub details: String,
    pub timestamp: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Entry fields known before the store assigns an id.
#[derive(Clone, Debug)]
pub(crate) struct NewEntry {
    pub account_id: i64,
    pub amount: MoneyCents,
    pub kind: EntryKind,
    pub details: String,
    pub timestamp: i64,
}

impl From<NewEntry> for ActiveModel {
    fn from(entry: NewEntry) -> Self {
        Self {
            id: ActiveValue::NotSet,
            account_id: ActiveValue::Set(entry.account_id),
            amount: ActiveValue::Set(entry.amount.cents()),
            kind: ActiveValue::Set(entry.kind.as_str().to_string()),
            details: ActiveValue::Set(entry.details),
            timestamp: ActiveValue::Set(entry.timestamp),
        }
    }
}

impl TryFrom<Model> for Entry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            account_id: model.account_id,
            amount: MoneyCents::new(model.amount),
            kind: EntryKind::try_from(model.kind.as_str())?,
            details: model.details,
            timestamp: model.timestamp,
        })
    }
}
