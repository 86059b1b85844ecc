use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter,
    TransactionTrait, sea_query::OnConflict,
};

use crate::{
    Balance, DepositCmd, EngineError, Entry, EntryKind, MoneyCents, ResultEngine, TransferCmd,
    WithdrawCmd, balances,
    entries::{self, NewEntry},
};

use super::{Engine, validate_account_id, validate_amount, with_tx};

impl Engine {
    /// Credit `cmd.amount` to an account, creating it at balance 0 if unseen.
    ///
    /// Deposits cannot breach the non-negative invariant. They fail on invalid
    /// input, on [`EngineError::BalanceOverflow`] or on storage errors.
    pub async fn record_deposit(&self, cmd: DepositCmd) -> ResultEngine<Entry> {
        validate_account_id(cmd.account_id)?;
        validate_amount(cmd.amount)?;

        let entry = with_tx!(self, &[cmd.account_id], |db_tx| {
            let entry = NewEntry {
                account_id: cmd.account_id,
                amount: cmd.amount,
                kind: EntryKind::Deposit,
                details: cmd.details,
                timestamp: self.now(),
            };
            apply_entry(&db_tx, entry).await
        })
        .inspect_err(|err| log_rejection("deposit", err))?;
        tracing::debug!(
            account_id = entry.account_id,
            amount = %entry.amount,
            tx_id = entry.id,
            "deposit committed"
        );
        Ok(entry)
    }

    /// Debit `cmd.amount` from an account.
    ///
    /// Fails with [`EngineError::InsufficientFunds`] when the balance read
    /// inside the atomic unit is lower than the amount; nothing is persisted
    /// in that case.
    pub async fn record_withdraw(&self, cmd: WithdrawCmd) -> ResultEngine<Entry> {
        validate_account_id(cmd.account_id)?;
        validate_amount(cmd.amount)?;

        let entry = with_tx!(self, &[cmd.account_id], |db_tx| {
            let entry = NewEntry {
                account_id: cmd.account_id,
                amount: cmd.amount,
                kind: EntryKind::Withdraw,
                details: cmd.details,
                timestamp: self.now(),
            };
            apply_entry(&db_tx, entry).await
        })
        .inspect_err(|err| log_rejection("withdraw", err))?;
        tracing::debug!(
            account_id = entry.account_id,
            amount = %entry.amount,
            tx_id = entry.id,
            "withdraw committed"
        );
        Ok(entry)
    }

    /// Move `cmd.amount` from `cmd.from_id` to `cmd.to_id`.
    ///
    /// Returns `(withdraw, deposit)`. Both entries share one timestamp, read
    /// once the locks are held, and are committed together, or neither is.
    pub async fn record_transfer(&self, cmd: TransferCmd) -> ResultEngine<(Entry, Entry)> {
        validate_account_id(cmd.from_id)?;
        validate_account_id(cmd.to_id)?;
        validate_amount(cmd.amount)?;
        if cmd.from_id == cmd.to_id {
            return Err(EngineError::InvalidAccount(
                "from and to accounts must differ".to_string(),
            ));
        }

        let (withdraw, deposit) = with_tx!(self, &[cmd.from_id, cmd.to_id], |db_tx| {
            let timestamp = self.now();
            let withdraw = NewEntry {
                account_id: cmd.from_id,
                amount: cmd.amount,
                kind: EntryKind::Withdraw,
                details: cmd.withdraw_details(),
                timestamp,
            };
            let deposit = NewEntry {
                account_id: cmd.to_id,
                amount: cmd.amount,
                kind: EntryKind::Deposit,
                details: cmd.deposit_details(),
                timestamp,
            };
            apply_transfer(&db_tx, withdraw, deposit).await
        })
        .inspect_err(|err| log_rejection("transfer", err))?;
        tracing::debug!(
            from = cmd.from_id,
            to = cmd.to_id,
            amount = %cmd.amount,
            "transfer committed"
        );
        Ok((withdraw, deposit))
    }
}

fn log_rejection(operation: &str, err: &EngineError) {
    match err {
        EngineError::InsufficientFunds { account_id } => {
            tracing::info!(account_id = *account_id, "{operation} rejected: insufficient funds");
        }
        EngineError::BalanceOverflow { account_id } => {
            tracing::info!(account_id = *account_id, "{operation} rejected: balance overflow");
        }
        _ => {}
    }
}

async fn apply_transfer(
    db_tx: &DatabaseTransaction,
    withdraw: NewEntry,
    deposit: NewEntry,
) -> ResultEngine<(Entry, Entry)> {
    let withdraw = apply_entry(db_tx, withdraw).await?;
    let deposit = apply_entry(db_tx, deposit).await?;
    Ok((withdraw, deposit))
}

/// Applies one entry inside an open transaction: adjusts the balance, then
/// appends the entry.
///
/// The balance row is upserted first so the unit's first statement is a write
/// and the store's write lock is held before the balance is read.
async fn apply_entry(db_tx: &DatabaseTransaction, entry: NewEntry) -> ResultEngine<Entry> {
    ensure_account(db_tx, entry.account_id).await?;

    let current = balances::Entity::find_by_id(entry.account_id)
        .one(db_tx)
        .await?
        .map(Balance::from)
        .ok_or_else(|| EngineError::NotFound(format!("account {}", entry.account_id)))?;

    let new_balance = match entry.kind {
        EntryKind::Deposit => current
            .balance
            .checked_add(entry.amount)
            .ok_or(EngineError::BalanceOverflow {
                account_id: entry.account_id,
            })?,
        EntryKind::Withdraw => current
            .balance
            .checked_sub(entry.amount)
            .filter(|balance| !balance.is_negative())
            .ok_or(EngineError::InsufficientFunds {
                account_id: entry.account_id,
            })?,
    };

    compare_and_set_balance(db_tx, current, new_balance).await?;

    let model = entries::ActiveModel::from(entry).insert(db_tx).await?;
    Entry::try_from(model)
}

async fn ensure_account(db_tx: &DatabaseTransaction, account_id: i64) -> ResultEngine<()> {
    let opening = Balance {
        account_id,
        balance: MoneyCents::ZERO,
    };
    balances::Entity::insert(balances::ActiveModel::from(&opening))
        .on_conflict(
            OnConflict::column(balances::Column::AccountId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db_tx)
        .await?;
    Ok(())
}

/// Writes `new_balance` only if the stored balance still equals the value read
/// earlier in this unit.
async fn compare_and_set_balance(
    db_tx: &DatabaseTransaction,
    current: Balance,
    new_balance: MoneyCents,
) -> ResultEngine<()> {
    let result = balances::Entity::update_many()
        .col_expr(
            balances::Column::Balance,
            sea_orm::sea_query::Expr::value(new_balance.cents()),
        )
        .filter(balances::Column::AccountId.eq(current.account_id))
        .filter(balances::Column::Balance.eq(current.balance.cents()))
        .exec(db_tx)
        .await?;

    if result.rows_affected != 1 {
        return Err(EngineError::Inconsistent(format!(
            "balance of account {} changed during update",
            current.account_id
        )));
    }
    Ok(())
}
