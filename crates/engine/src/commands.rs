//! Command structs for engine operations.
//!
//! These types group the parameters of the write operations
//! (deposit/withdraw/transfer) and of history paging, keeping call sites
//! readable.

use crate::MoneyCents;

/// Credit an account.
#[derive(Clone, Debug)]
pub struct DepositCmd {
    pub account_id: i64,
    pub amount: MoneyCents,
    pub details: String,
}

impl DepositCmd {
    #[must_use]
    pub fn new(account_id: i64, amount: impl Into<MoneyCents>) -> Self {
        Self {
            account_id,
            amount: amount.into(),
            details: "receiving external funds".to_string(),
        }
    }

    #[must_use]
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }
}

/// Debit an account, failing if it would go negative.
#[derive(Clone, Debug)]
pub struct WithdrawCmd {
    pub account_id: i64,
    pub amount: MoneyCents,
    pub details: String,
}

impl WithdrawCmd {
    #[must_use]
    pub fn new(account_id: i64, amount: impl Into<MoneyCents>) -> Self {
        Self {
            account_id,
            amount: amount.into(),
            details: "withdrawal of funds".to_string(),
        }
    }

    #[must_use]
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }
}

/// Move money between two accounts as one atomic unit.
///
/// Narrations are derived from the account pair; `note` is appended to both
/// when present.
#[derive(Clone, Debug)]
pub struct TransferCmd {
    pub from_id: i64,
    pub to_id: i64,
    pub amount: MoneyCents,
    pub note: Option<String>,
}

impl TransferCmd {
    #[must_use]
    pub fn new(from_id: i64, to_id: i64, amount: impl Into<MoneyCents>) -> Self {
        Self {
            from_id,
            to_id,
            amount: amount.into(),
            note: None,
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub(crate) fn withdraw_details(&self) -> String {
        narration(format!("transfer to account {}", self.to_id), &self.note)
    }

    pub(crate) fn deposit_details(&self) -> String {
        narration(format!("transfer from account {}", self.from_id), &self.note)
    }
}

fn narration(base: String, note: &Option<String>) -> String {
    match note.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        Some(note) => format!("{base}: {note}"),
        None => base,
    }
}

/// Sort direction of a history page, by entry timestamp.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl TryFrom<&str> for SortOrder {
    type Error = crate::EngineError;

    /// Case-insensitive; only `asc` and `desc` are accepted.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(crate::EngineError::InvalidPage(format!(
                "invalid order: {value}"
            ))),
        }
    }
}

/// One page of an account's history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryPage {
    pub offset: u64,
    pub limit: u64,
    pub order: SortOrder,
}

impl EntryPage {
    #[must_use]
    pub fn new(offset: u64, limit: u64, order: SortOrder) -> Self {
        Self {
            offset,
            limit,
            order,
        }
    }

    /// Builds a page from a 1-based page number, as exposed over HTTP.
    pub fn numbered(page: u64, limit: u64, order: SortOrder) -> crate::ResultEngine<Self> {
        if page == 0 {
            return Err(crate::EngineError::InvalidPage(
                "page must be >= 1".to_string(),
            ));
        }
        let offset = (page - 1).checked_mul(limit).ok_or_else(|| {
            crate::EngineError::InvalidPage("page is out of range".to_string())
        })?;
        Ok(Self::new(offset, limit, order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_narrations_reference_the_other_account() {
        let cmd = TransferCmd::new(1, 42, 100);
        assert_eq!(cmd.withdraw_details(), "transfer to account 42");
        assert_eq!(cmd.deposit_details(), "transfer from account 1");

        let cmd = cmd.note("  rent ");
        assert_eq!(cmd.withdraw_details(), "transfer to account 42: rent");
        assert_eq!(cmd.deposit_details(), "transfer from account 1: rent");
    }

    #[test]
    fn order_parsing_is_case_insensitive() {
        assert_eq!(SortOrder::try_from("ASC").unwrap(), SortOrder::Asc);
        assert_eq!(SortOrder::try_from("desc").unwrap(), SortOrder::Desc);
        assert!(SortOrder::try_from("newest").is_err());
        assert!(SortOrder::try_from("").is_err());
    }

    #[test]
    fn numbered_page_computes_offset() {
        let page = EntryPage::numbered(3, 10, SortOrder::Asc).unwrap();
        assert_eq!(page.offset, 20);
        assert_eq!(page.limit, 10);
        assert!(EntryPage::numbered(0, 10, SortOrder::Asc).is_err());
        assert!(EntryPage::numbered(u64::MAX, 10, SortOrder::Asc).is_err());
    }
}
