pub use mongodb::bson;

pub use document_store::{DocumentStore, UpdateOutcome, DEFAULT_FIND_LIMIT};
pub use errors::StoreError;
pub use mongodb_client::{from_document, to_document, CollectionHandle, DocumentStoreClient};

pub mod document_store;
pub mod errors;
pub mod mongodb_client;
