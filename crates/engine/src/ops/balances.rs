use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, TransactionTrait};

use crate::{Balance, EngineError, Entry, MoneyCents, ResultEngine, balances, entries};

use super::{Engine, validate_account_id, with_tx};

impl Engine {
    /// Returns the current balance of an account.
    ///
    /// Accounts exist only once they have at least one ledger entry; unknown
    /// ids yield [`EngineError::NotFound`].
    pub async fn balance(&self, account_id: i64) -> ResultEngine<Balance> {
        validate_account_id(account_id)?;
        balances::Entity::find_by_id(account_id)
            .one(&self.database)
            .await?
            .map(Balance::from)
            .ok_or_else(|| EngineError::NotFound(format!("account {account_id}")))
    }

    /// Replays the ledger of an account and checks it against the stored
    /// balance.
    ///
    /// Runs under the account's lock so no write can interleave with the
    /// replay. Returns [`EngineError::Inconsistent`] if the stored balance
    /// differs from `Σdeposits − Σwithdrawals` or if the running balance ever
    /// dips below zero; state is never rewritten.
    pub async fn recompute_balance(&self, account_id: i64) -> ResultEngine<Balance> {
        validate_account_id(account_id)?;
        with_tx!(self, &[account_id], |db_tx| {
            replay_account(&db_tx, account_id).await
        })
    }
}

async fn replay_account(
    db_tx: &sea_orm::DatabaseTransaction,
    account_id: i64,
) -> ResultEngine<Balance> {
    let stored = balances::Entity::find_by_id(account_id)
        .one(db_tx)
        .await?
        .map(Balance::from)
        .ok_or_else(|| EngineError::NotFound(format!("account {account_id}")))?;

    let models = entries::Entity::find()
        .filter(entries::Column::AccountId.eq(account_id))
        .order_by_asc(entries::Column::Timestamp)
        .order_by_asc(entries::Column::Id)
        .all(db_tx)
        .await?;

    let mut running = MoneyCents::ZERO;
    for model in models {
        let entry = Entry::try_from(model)?;
        running = running
            .checked_add(MoneyCents::new(entry.signed_amount()))
            .filter(|balance| !balance.is_negative())
            .ok_or_else(|| {
                EngineError::Inconsistent(format!(
                    "account {account_id} goes negative at entry {}",
                    entry.id
                ))
            })?;
    }

    if running != stored.balance {
        return Err(EngineError::Inconsistent(format!(
            "account {account_id}: stored balance {} but ledger sums to {running}",
            stored.balance
        )));
    }
    Ok(stored)
}
