//! Ledger engine.
//!
//! Keeps per-account balances and an append-only log of the entries that
//! produced them. Every balance change goes through the [`Engine`], which
//! applies it as one atomic unit together with its ledger entry, so that for
//! every account `balance == Σdeposits − Σwithdrawals` and `balance >= 0`.

pub use balances::Balance;
pub use clock::{Clock, SystemClock};
pub use commands::{DepositCmd, EntryPage, SortOrder, TransferCmd, WithdrawCmd};
pub use entries::{Entry, EntryKind};
pub use error::EngineError;
pub use money::MoneyCents;
pub use ops::{Engine, EngineBuilder};

mod balances;
mod clock;
mod commands;
mod entries;
mod error;
mod locks;
mod money;
mod ops;

type ResultEngine<T> = Result<T, EngineError>;
