use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

use crate::{EngineError, Entry, EntryPage, ResultEngine, SortOrder, entries};

use super::{Engine, validate_account_id};

impl Engine {
    /// Lists one page of an account's ledger entries.
    ///
    /// Entries are ordered by `(timestamp, id)` in the requested direction, so
    /// `desc` is the exact reverse of `asc` even when timestamps tie. Unknown
    /// accounts and offsets past the end give an empty page.
    pub async fn list_entries(&self, account_id: i64, page: EntryPage) -> ResultEngine<Vec<Entry>> {
        validate_account_id(account_id)?;
        if page.limit == 0 {
            return Err(EngineError::InvalidPage("limit must be > 0".to_string()));
        }

        let query = entries::Entity::find().filter(entries::Column::AccountId.eq(account_id));
        let query = match page.order {
            SortOrder::Asc => query
                .order_by_asc(entries::Column::Timestamp)
                .order_by_asc(entries::Column::Id),
            SortOrder::Desc => query
                .order_by_desc(entries::Column::Timestamp)
                .order_by_desc(entries::Column::Id),
        };

        // The store binds LIMIT/OFFSET as signed 64-bit integers.
        query
            .offset(page.offset.min(i64::MAX as u64))
            .limit(page.limit.min(i64::MAX as u64))
            .all(&self.database)
            .await?
            .into_iter()
            .map(Entry::try_from)
            .collect()
    }
}
