use std::time::Duration;

use async_trait::async_trait;
use derive_more::Display;
use futures::TryStreamExt;
use log::{debug, info, warn};
use mongodb::{
    bson::{self, doc, Bson, Document},
    options::{ClientOptions, FindOptions, UpdateOptions},
    Client, Collection, Database,
};
use serde::{de::DeserializeOwned, Serialize};

use config::DatabaseConfig;

use crate::document_store::{DocumentStore, UpdateOutcome, DEFAULT_FIND_LIMIT};
use crate::errors::{Operation, StoreError};

#[derive(Debug)]
struct Connection {
    client: Client,
    database: Database,
}

/// Client for one database of a MongoDB deployment.
///
/// Starts out disconnected. [`DocumentStoreClient::connection`] opens the single connection
/// handle and [`DocumentStoreClient::close_connection`] releases it. Data operations go either
/// through the selected collection (the [`DocumentStore`] impl on the client) or through a
/// [`CollectionHandle`] obtained from [`DocumentStoreClient::collection`].
#[derive(Debug)]
pub struct DocumentStoreClient {
    config: DatabaseConfig,
    connection: Option<Connection>,
    collection_name: Option<String>,
}

impl DocumentStoreClient {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config, connection: None, collection_name: None }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Opens the connection and checks it with a `ping` against `admin`.
    ///
    /// Does nothing if the client is already connected.
    pub async fn connection(&mut self) -> Result<(), StoreError> {
        if self.connection.is_some() {
            warn!("Already connected to {}, keeping the open connection", self.config.cluster);
            return Ok(());
        }

        info!("Connecting to {}", self.config.cluster);
        let connect_err = |e| StoreError::from_driver(e, Operation::Connect);

        let mut options =
            ClientOptions::parse(self.config.connection_string()).await.map_err(connect_err)?;
        if let Some(app_name) = &self.config.app_name {
            options.app_name = Some(app_name.clone());
        }
        if let Some(timeout_ms) = self.config.server_selection_timeout_ms {
            options.server_selection_timeout = Some(Duration::from_millis(timeout_ms));
        }

        let client = Client::with_options(options).map_err(connect_err)?;
        client.database("admin").run_command(doc! { "ping": 1 }, None).await.map_err(connect_err)?;

        let database = client.database(&self.config.database_name);
        info!("Connected to database {}", self.config.database_name);
        self.connection = Some(Connection { client, database });
        Ok(())
    }

    /// Shuts the driver client down. Does nothing if the client is not connected.
    pub async fn close_connection(&mut self) {
        match self.connection.take() {
            Some(connection) => {
                connection.client.shutdown().await;
                info!("Closed connection to {}", self.config.cluster);
            }
            None => debug!("close_connection called without an open connection"),
        }
    }

    pub fn set_collection_name(&mut self, collection_name: impl Into<String>) {
        self.collection_name = Some(collection_name.into());
    }

    pub fn collection_name(&self) -> Option<&str> {
        self.collection_name.as_deref()
    }

    /// Handle scoped to `collection_name`, independent of the selected collection.
    pub fn collection(&self, collection_name: &str) -> Result<CollectionHandle<'_>, StoreError> {
        let connection = self.connection.as_ref().ok_or(StoreError::NotConnected)?;
        Ok(CollectionHandle { database: &connection.database, name: collection_name.to_string() })
    }

    fn active_collection(&self) -> Result<CollectionHandle<'_>, StoreError> {
        if self.connection.is_none() {
            return Err(StoreError::NotConnected);
        }
        let collection_name =
            self.collection_name.as_deref().ok_or(StoreError::NoCollectionSelected)?;
        self.collection(collection_name)
    }
}

#[async_trait]
impl DocumentStore for DocumentStoreClient {
    async fn create_one_document(&self, data: Document) -> Result<Bson, StoreError> {
        self.active_collection()?.create_one_document(data).await
    }

    async fn create_multiple_documents(&self, data: Vec<Document>) -> Result<Vec<Bson>, StoreError> {
        self.active_collection()?.create_multiple_documents(data).await
    }

    async fn find_documents(
        &self,
        filter: Document,
        sort_by: Option<Document>,
        limit: Option<i64>,
    ) -> Result<Vec<Document>, StoreError> {
        self.active_collection()?.find_documents(filter, sort_by, limit).await
    }

    async fn update_one_document(
        &self,
        filter: Document,
        set: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome, StoreError> {
        self.active_collection()?.update_one_document(filter, set, options).await
    }

    async fn update_multiple_documents(
        &self,
        filter: Document,
        set: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome, StoreError> {
        self.active_collection()?.update_multiple_documents(filter, set, options).await
    }

    async fn delete_one_document(&self, filter: Document) -> Result<u64, StoreError> {
        self.active_collection()?.delete_one_document(filter).await
    }

    async fn delete_multiple_documents(&self, filter: Document) -> Result<u64, StoreError> {
        self.active_collection()?.delete_multiple_documents(filter).await
    }
}

/// A single collection of a connected [`DocumentStoreClient`].
///
/// Borrows the client, so the connection cannot be closed while a handle is alive.
#[derive(Debug, Display, Clone)]
#[display("CollectionHandle {{ collection: {} }}", name)]
pub struct CollectionHandle<'a> {
    database: &'a Database,
    name: String,
}

impl<'a> CollectionHandle<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get_collection(&self) -> Collection<Document> {
        self.database.collection(&self.name)
    }
}

fn write_err(e: mongodb::error::Error) -> StoreError {
    StoreError::from_driver(e, Operation::Write)
}

fn read_err(e: mongodb::error::Error) -> StoreError {
    StoreError::from_driver(e, Operation::Read)
}

#[async_trait]
impl DocumentStore for CollectionHandle<'_> {
    async fn create_one_document(&self, data: Document) -> Result<Bson, StoreError> {
        debug!("Inserting one document into {}", self.name);
        let result = self.get_collection().insert_one(data, None).await.map_err(write_err)?;
        Ok(result.inserted_id)
    }

    async fn create_multiple_documents(&self, data: Vec<Document>) -> Result<Vec<Bson>, StoreError> {
        debug!("Inserting {} documents into {}", data.len(), self.name);
        let result = self.get_collection().insert_many(data, None).await.map_err(write_err)?;

        // The driver reports ids keyed by input position
        let mut inserted_ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        inserted_ids.sort_by_key(|(index, _)| *index);
        Ok(inserted_ids.into_iter().map(|(_, id)| id).collect())
    }

    async fn find_documents(
        &self,
        filter: Document,
        sort_by: Option<Document>,
        limit: Option<i64>,
    ) -> Result<Vec<Document>, StoreError> {
        debug!("Finding documents in {} matching {}", self.name, filter);
        let mut options = FindOptions::default();
        options.sort = sort_by;
        options.limit = Some(limit.unwrap_or(DEFAULT_FIND_LIMIT));

        let cursor = self.get_collection().find(filter, options).await.map_err(read_err)?;
        cursor.try_collect().await.map_err(read_err)
    }

    async fn update_one_document(
        &self,
        filter: Document,
        set: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome, StoreError> {
        debug!("Updating one document in {} matching {}", self.name, filter);
        let update = doc! { "$set": set };
        let result =
            self.get_collection().update_one(filter, update, options).await.map_err(write_err)?;
        Ok(result.into())
    }

    async fn update_multiple_documents(
        &self,
        filter: Document,
        set: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome, StoreError> {
        debug!("Updating documents in {} matching {}", self.name, filter);
        let update = doc! { "$set": set };
        let result =
            self.get_collection().update_many(filter, update, options).await.map_err(write_err)?;
        Ok(result.into())
    }

    async fn delete_one_document(&self, filter: Document) -> Result<u64, StoreError> {
        debug!("Deleting one document from {} matching {}", self.name, filter);
        let result = self.get_collection().delete_one(filter, None).await.map_err(write_err)?;
        Ok(result.deleted_count)
    }

    async fn delete_multiple_documents(&self, filter: Document) -> Result<u64, StoreError> {
        debug!("Deleting documents from {} matching {}", self.name, filter);
        let result = self.get_collection().delete_many(filter, None).await.map_err(write_err)?;
        Ok(result.deleted_count)
    }
}

pub fn to_document<T: Serialize>(item: &T) -> Result<Document, StoreError> {
    let doc = bson::to_bson(item)?
        .as_document()
        .cloned()
        .ok_or_else(|| StoreError::Other("Failed to convert item to BSON document".to_string()))?;
    Ok(doc)
}

pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    let item = bson::from_bson(Bson::Document(doc))?;
    Ok(item)
}
