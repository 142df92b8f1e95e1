use log::info;
use mongodb::bson::{doc, Bson, DateTime};
use mongodb::options::UpdateOptions;
use serde::Serialize;

use storage::{to_document, DocumentStore, StoreError, UpdateOutcome};

const FIND_LIMIT: i64 = 3;

#[derive(Debug, Clone, Serialize)]
pub struct Person {
    pub name: String,
    pub age: i32,
    pub job: String,
    pub sex: String,
    pub married: bool,
    pub timestamp: DateTime,
}

impl Person {
    fn new(name: &str, age: i32, job: &str, sex: &str, married: bool) -> Self {
        Self {
            name: name.to_string(),
            age,
            job: job.to_string(),
            sex: sex.to_string(),
            married,
            timestamp: DateTime::now(),
        }
    }
}

/// What each step of the walkthrough got back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkthroughReport {
    pub inserted_id: Bson,
    pub inserted_ids: Vec<Bson>,
    pub found: usize,
    pub upserted: UpdateOutcome,
    pub updated: UpdateOutcome,
    pub deleted_one: u64,
    pub deleted_many: u64,
}

/// Exercises every data operation once, in order, with literal sample data.
///
/// Ends by deleting every document in the collection.
pub async fn run_walkthrough<S: DocumentStore>(
    store: &S,
) -> Result<WalkthroughReport, StoreError> {
    let inserted_id = store
        .create_one_document(to_document(&Person::new(
            "Abdullah Serhat INCE",
            24,
            "Software Engineer",
            "Male",
            false,
        ))?)
        .await?;
    info!("One document created: {}", inserted_id);

    let inserted_ids = store
        .create_multiple_documents(vec![
            to_document(&Person::new("Name example1", 33, "Lawyer", "Female", false))?,
            to_document(&Person::new("Name example2", 42, "Banker", "Male", true))?,
        ])
        .await?;
    info!("Multiple documents created: {:?}", inserted_ids);

    let found = store
        .find_documents(
            doc! { "_id": { "$exists": true } },
            Some(doc! { "timestamp": -1 }),
            Some(FIND_LIMIT),
        )
        .await?;
    info!("Found {} documents", found.len());
    for document in &found {
        info!("  {}", document);
    }

    let architect = to_document(&Person::new("Name example3", 37, "Architect", "Female", false))?;
    let upserted = store
        .update_one_document(
            doc! { "job": "Architect" },
            architect,
            Some(UpdateOptions::builder().upsert(true).build()),
        )
        .await?;
    info!("Document updated: {:?}", upserted);

    let updated = store
        .update_multiple_documents(
            doc! { "_id": { "$exists": true } },
            doc! { "timestamp": DateTime::now() },
            None,
        )
        .await?;
    info!("Multiple documents updated: {:?}", updated);

    let deleted_one = store.delete_one_document(doc! { "job": "Architect" }).await?;
    info!("Deleted one document: {}", deleted_one);

    let deleted_many = store.delete_multiple_documents(doc! { "_id": { "$exists": true } }).await?;
    info!("Deleted multiple documents: {}", deleted_many);

    Ok(WalkthroughReport {
        inserted_id,
        inserted_ids,
        found: found.len(),
        upserted,
        updated,
        deleted_one,
        deleted_many,
    })
}
