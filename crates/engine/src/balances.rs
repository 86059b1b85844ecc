//! Balance Store.
//!
//! One row per account holding its current balance. Rows are created lazily
//! by the first ledger entry that touches an account and are only mutated
//! inside the engine's atomic units.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::MoneyCents;

/// Current balance of an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub account_id: i64,
    pub balance: MoneyCents,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub account_id: i64,
    pub balance: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Balance {
    fn from(model: Model) -> Self {
        Self {
            account_id: model.account_id,
            balance: MoneyCents::new(model.balance),
        }
    }
}

impl From<&Balance> for ActiveModel {
    fn from(value: &Balance) -> Self {
        Self {
            account_id: ActiveValue::Set(value.account_id),
            balance: ActiveValue::Set(value.balance.cents()),
        }
    }
}
