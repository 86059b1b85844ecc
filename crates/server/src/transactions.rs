//! Ledger API endpoints: history, deposit, withdraw and transfer.

use api_types::transaction::{
    DepositNew, EntryKind as ApiKind, EntryView, TransactionsQuery, TransferNew, WithdrawNew,
};
use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};
use engine::{DepositCmd, Entry, EntryPage, MoneyCents, SortOrder, TransferCmd, WithdrawCmd};

use crate::{ServerError, balance::parse_account_id, server::ServerState};

const DEFAULT_PAGE: u64 = 1;
const DEFAULT_LIMIT: u64 = 10;

fn map_kind(kind: engine::EntryKind) -> ApiKind {
    match kind {
        engine::EntryKind::Deposit => ApiKind::Deposit,
        engine::EntryKind::Withdraw => ApiKind::Withdraw,
    }
}

fn view(entry: Entry) -> EntryView {
    EntryView {
        tx_id: entry.id,
        account_id: entry.account_id,
        amount: entry.amount.to_string(),
        amount_minor: entry.amount.cents(),
        kind: map_kind(entry.kind),
        details: entry.details,
        timestamp: entry.timestamp,
    }
}

fn parse_number(raw: Option<&str>, default: u64, label: &str) -> Result<u64, ServerError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ServerError::Validation(format!("incorrect {label} format"))),
    }
}

fn parse_amount(amount: &api_types::Amount) -> Result<MoneyCents, ServerError> {
    Ok(amount.to_string().parse::<MoneyCents>()?)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServerError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ServerError::Generic(rejection.body_text()))
}

pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<Vec<EntryView>>, ServerError> {
    let order = match query.order.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => SortOrder::Desc,
        Some(order) => SortOrder::try_from(order)
            .map_err(|_| ServerError::Validation("incorrect order format".to_string()))?,
    };
    let account_id = parse_account_id(query.account_id.as_deref())?;
    let page = parse_number(query.page.as_deref(), DEFAULT_PAGE, "page")?;
    let limit = parse_number(query.limit.as_deref(), DEFAULT_LIMIT, "limit")?;

    let page = EntryPage::numbered(page, limit, order)?;
    let entries = state.engine.list_entries(account_id, page).await?;
    Ok(Json(entries.into_iter().map(view).collect()))
}

pub async fn deposit(
    State(state): State<ServerState>,
    payload: Result<Json<DepositNew>, JsonRejection>,
) -> Result<Json<EntryView>, ServerError> {
    let payload = body(payload)?;
    let amount = parse_amount(&payload.amount)?;
    let entry = state
        .engine
        .record_deposit(DepositCmd::new(payload.account_id, amount))
        .await?;
    Ok(Json(view(entry)))
}

pub async fn withdraw(
    State(state): State<ServerState>,
    payload: Result<Json<WithdrawNew>, JsonRejection>,
) -> Result<Json<EntryView>, ServerError> {
    let payload = body(payload)?;
    let amount = parse_amount(&payload.amount)?;
    let entry = state
        .engine
        .record_withdraw(WithdrawCmd::new(payload.account_id, amount))
        .await?;
    Ok(Json(view(entry)))
}

pub async fn transfer(
    State(state): State<ServerState>,
    payload: Result<Json<TransferNew>, JsonRejection>,
) -> Result<Json<Vec<EntryView>>, ServerError> {
    let payload = body(payload)?;
    let amount = parse_amount(&payload.amount)?;
    let mut cmd = TransferCmd::new(payload.from, payload.to, amount);
    if let Some(note) = payload.note {
        cmd = cmd.note(note);
    }
    let (withdraw, deposit) = state.engine.record_transfer(cmd).await?;
    Ok(Json(vec![view(withdraw), view(deposit)]))
}
