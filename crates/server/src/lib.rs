use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{RequestId, router, run_with_listener};

mod balance;
mod server;
mod transactions;

pub mod types {
    pub mod balance {
        pub use api_types::balance::{BalanceQuery, BalanceView};
    }

    pub mod transaction {
        pub use api_types::transaction::{
            DepositNew, EntryKind, EntryView, TransactionsQuery, TransferNew, WithdrawNew,
        };
    }
}

/// Errors returned by the handlers.
///
/// - `Engine`: outcome of an engine call, mapped by variant.
/// - `Validation`: malformed query parameters (422).
/// - `Generic`: malformed request bodies (400).
#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    Validation(String),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    if err.is_validation() {
        return StatusCode::UNPROCESSABLE_ENTITY;
    }
    match err {
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::InsufficientFunds { .. } | EngineError::BalanceOverflow { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Storage(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::Inconsistent(detail) => {
            tracing::error!("ledger inconsistency: {detail}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Validation(err) => (StatusCode::UNPROCESSABLE_ENTITY, err),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
