use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use mongodb::options::UpdateOptions;
use mongodb::results::UpdateResult;

use crate::errors::StoreError;

/// Number of documents returned by a find when no limit is given.
pub const DEFAULT_FIND_LIMIT: i64 = 10;

/// Counts reported by the server for an update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
    // Set when an upsert inserted a new document
    pub upserted_id: Option<Bson>,
}

impl From<UpdateResult> for UpdateOutcome {
    fn from(result: UpdateResult) -> Self {
        Self {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        }
    }
}

/// Data operations against one collection of a document store.
///
/// Filters, sort specifications and options are handed to the server as they are.
#[async_trait]
pub trait DocumentStore {
    /// Inserts `data`, returning the `_id` it was stored under.
    async fn create_one_document(&self, data: Document) -> Result<Bson, StoreError>;

    /// Inserts every document in `data`, returning their `_id`s in input order.
    async fn create_multiple_documents(&self, data: Vec<Document>) -> Result<Vec<Bson>, StoreError>;

    /// Documents matching `filter`, ordered by `sort_by` and truncated to `limit`
    /// ([`DEFAULT_FIND_LIMIT`] when `None`).
    async fn find_documents(
        &self,
        filter: Document,
        sort_by: Option<Document>,
        limit: Option<i64>,
    ) -> Result<Vec<Document>, StoreError>;

    /// Applies `{ "$set": set }` to the first document matching `filter`.
    async fn update_one_document(
        &self,
        filter: Document,
        set: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome, StoreError>;

    /// Applies `{ "$set": set }` to every document matching `filter`.
    async fn update_multiple_documents(
        &self,
        filter: Document,
        set: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome, StoreError>;

    async fn delete_one_document(&self, filter: Document) -> Result<u64, StoreError>;

    async fn delete_multiple_documents(&self, filter: Document) -> Result<u64, StoreError>;
}
