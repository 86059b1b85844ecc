use std::fmt;

use serde::{Deserialize, Serialize};

/// A decimal amount as sent by clients.
///
/// Accepts either a JSON number (`99.9`) or a string (`"99.90"`); the text is
/// kept as-is and parsed into minor units by the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

pub mod balance {
    use super::*;

    /// Query string of `GET /balance`.
    ///
    /// Fields are kept as raw text so malformed values can be reported as
    /// validation errors instead of generic rejections.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BalanceQuery {
        pub account_id: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceView {
        pub account_id: i64,
        /// Decimal rendering, e.g. `"100.51"`.
        pub balance: String,
        pub balance_minor: i64,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum EntryKind {
        Deposit,
        Withdraw,
    }

    /// Query string of `GET /transactions`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionsQuery {
        pub account_id: Option<String>,
        /// 1-based, defaults to 1.
        pub page: Option<String>,
        /// Defaults to 10.
        pub limit: Option<String>,
        /// `asc` or `desc` (default), case-insensitive.
        pub order: Option<String>,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct EntryView {
        pub tx_id: i64,
        pub account_id: i64,
        /// Decimal rendering, e.g. `"12.34"`.
        pub amount: String,
        pub amount_minor: i64,
        #[serde(rename = "type")]
        pub kind: EntryKind,
        pub details: String,
        /// Seconds since the Unix epoch.
        pub timestamp: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DepositNew {
        pub account_id: i64,
        pub amount: Amount,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WithdrawNew {
        pub account_id: i64,
        pub amount: Amount,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferNew {
        pub from: i64,
        pub to: i64,
        pub amount: Amount,
        /// Appended to both narrations when present.
        pub note: Option<String>,
    }
}
