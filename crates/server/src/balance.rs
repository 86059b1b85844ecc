//! Balance API endpoints.

use api_types::balance::{BalanceQuery, BalanceView};
use axum::{
    Json,
    extract::{Query, State},
};

use crate::{ServerError, server::ServerState};

/// Parses the `account_id` query parameter.
pub(crate) fn parse_account_id(raw: Option<&str>) -> Result<i64, ServerError> {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|id| *id >= 0)
        .ok_or_else(|| ServerError::Validation("incorrect account_id format".to_string()))
}

fn view(balance: engine::Balance) -> BalanceView {
    BalanceView {
        account_id: balance.account_id,
        balance: balance.balance.to_string(),
        balance_minor: balance.balance.cents(),
    }
}

pub async fn get(
    State(state): State<ServerState>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<BalanceView>, ServerError> {
    let account_id = parse_account_id(query.account_id.as_deref())?;
    let balance = state.engine.balance(account_id).await?;
    Ok(Json(view(balance)))
}

/// Replays the account's ledger and returns the balance if it matches.
pub async fn verify(
    State(state): State<ServerState>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<BalanceView>, ServerError> {
    let account_id = parse_account_id(query.account_id.as_deref())?;
    let balance = state.engine.recompute_balance(account_id).await?;
    Ok(Json(view(balance)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_must_be_a_non_negative_integer() {
        assert_eq!(parse_account_id(Some("42")).unwrap(), 42);
        assert_eq!(parse_account_id(Some("0")).unwrap(), 0);
        assert!(parse_account_id(None).is_err());
        assert!(parse_account_id(Some("")).is_err());
        assert!(parse_account_id(Some("abc")).is_err());
        assert!(parse_account_id(Some("-1")).is_err());
        assert!(parse_account_id(Some("1.5")).is_err());
    }
}
