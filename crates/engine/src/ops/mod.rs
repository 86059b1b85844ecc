use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{Clock, EngineError, MoneyCents, ResultEngine, SystemClock, locks::AccountLocks};

mod balances;
mod entries;
mod record;

/// Run a block as one atomic unit: lock the given accounts, open a DB
/// transaction, commit on success and roll back on error.
///
/// The body must evaluate to a `ResultEngine<T>`. Early returns through `?`
/// outside the body still roll back, because the transaction is dropped.
macro_rules! with_tx {
    ($self:expr, $accounts:expr, |$tx:ident| $body:expr) => {{
        let _guards = $self.locks.acquire($accounts).await;
        let $tx = $self.database.begin().await?;
        let result: ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = $tx.rollback().await {
                    tracing::error!("rollback failed after {err}: {rollback_err}");
                }
                Err(err)
            }
        }
    }};
}

pub(crate) use with_tx;

/// The ledger engine.
///
/// Sole writer of the Balance Store and the Transaction Log. Cheap to share
/// behind an [`Arc`]; every method takes `&self`.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    clock: Arc<dyn Clock>,
    locks: AccountLocks,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    fn now(&self) -> i64 {
        self.clock.now_unix()
    }
}

fn validate_account_id(account_id: i64) -> ResultEngine<()> {
    if account_id < 0 {
        return Err(EngineError::InvalidAccount(format!(
            "account id must be >= 0, got {account_id}"
        )));
    }
    Ok(())
}

fn validate_amount(amount: MoneyCents) -> ResultEngine<()> {
    if amount.is_negative() {
        return Err(EngineError::InvalidAmount(
            "amount must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    clock: Option<Arc<dyn Clock>>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Override the time source (defaults to [`SystemClock`]).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> EngineBuilder {
        self.clock = Some(clock);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        self.database.ping().await?;
        Ok(Engine {
            database: self.database,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            locks: AccountLocks::default(),
        })
    }
}
