//! Document adapter
//!
//! Remote MongoDB backend over the driver's blocking API. The connection is
//! established once at construction and verified with a ping; a store must
//! never come up with a half-initialized document backend.

use std::sync::Mutex;

use mongodb::bson::{self, doc};
use mongodb::options::{
    ClientOptions, FindOptions, InsertManyOptions, ServerApi, ServerApiVersion,
};
use mongodb::sync::{Client, Collection};
use tracing::info;

use super::config::DocumentTimeouts;
use super::error::{Result, StoreError};
use super::query::{document_filter, document_projection, document_sort, FindQuery};
use super::record::RecordMap;

pub struct DocumentAdapter {
    collection: Collection<bson::Document>,
    /// Serializes writes, independently from the relational adapter's lock.
    write_lock: Mutex<()>,
}

impl DocumentAdapter {
    /// Connect, verify liveness, and bind the backing collection. Any
    /// failure here is fatal for construction.
    pub fn connect(
        uri: &str,
        database: &str,
        collection: &str,
        timeouts: &DocumentTimeouts,
    ) -> Result<Self> {
        let mut options =
            ClientOptions::parse(uri).map_err(|e| StoreError::Connection(e.to_string()))?;
        options.server_api = Some(ServerApi::builder().version(ServerApiVersion::V1).build());
        options.server_selection_timeout = Some(timeouts.server_selection);
        options.connect_timeout = Some(timeouts.connect);

        let client =
            Client::with_options(options).map_err(|e| StoreError::Connection(e.to_string()))?;

        // Liveness check before handing the connection to the facade
        client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        info!(database, collection, "connected to document store");

        Ok(Self {
            collection: client.database(database).collection(collection),
            write_lock: Mutex::new(()),
        })
    }

    /// Insert one document.
    pub fn insert_one(&self, document: bson::Document) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.collection.insert_one(document, None)?;
        Ok(())
    }

    /// Unordered bulk insert: one failing document does not abort the rest.
    /// Reports overall success or failure only, no per-document detail.
    pub fn insert_many(&self, documents: Vec<bson::Document>) -> Result<usize> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if documents.is_empty() {
            return Ok(0);
        }

        let mut options = InsertManyOptions::default();
        options.ordered = Some(false);

        let result = self.collection.insert_many(documents, options)?;
        Ok(result.inserted_ids.len())
    }

    /// Native structured query. `_id` is stripped so the row shape matches
    /// the relational path.
    pub fn find(&self, query: &FindQuery) -> Result<Vec<RecordMap>> {
        let filter = document_filter(query.predicate.as_ref())?;

        let mut options = FindOptions::default();
        options.sort = document_sort(&query.sort);
        options.projection = document_projection(query.projection.as_ref());
        options.limit = query.limit.map(|n| n as i64);

        let cursor = self.collection.find(filter, options)?;

        let mut rows = Vec::new();
        for result in cursor {
            let document = result?;
            let mut map = RecordMap::new();
            for (key, value) in document {
                if key == "_id" {
                    continue;
                }
                map.insert(key, value.into());
            }
            rows.push(map);
        }
        Ok(rows)
    }

    /// Drop the backing collection. Irreversible.
    pub fn destroy(&self) -> Result<()> {
        self.collection.drop(None)?;
        Ok(())
    }
}
