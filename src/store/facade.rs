//! Unified store facade
//!
//! The sole entry point. Resolves the schema once at construction, opens the
//! relational store, connects the document store, and from then on fans every
//! write out to both backends. Reads go to the single backend that holds the
//! canonical copy: the document store when active, the relational store
//! otherwise. Results are never merged across backends.

use tracing::warn;

use super::config::{DocumentSource, StoreConfig};
use super::document::DocumentAdapter;
use super::error::{Result, StoreError};
use super::query::FindQuery;
use super::record::{BatchOutcome, BatchReport, Record, RecordMap, WriteOutcome, WriteReport};
use super::relational::{InsertStatus, RelationalAdapter};
use super::schema::{Mode, SchemaDescriptor};

pub struct Store {
    descriptor: &'static SchemaDescriptor,
    relational: RelationalAdapter,
    document: Option<DocumentAdapter>,
}

impl Store {
    /// Construction order: resolve schema, ensure the relational schema,
    /// establish the document connection. Every failure here propagates;
    /// a half-initialized store is never returned.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let descriptor = SchemaDescriptor::resolve(config.mode);

        if matches!(config.document, DocumentSource::Unset) {
            return Err(StoreError::Configuration(
                "document store URI is required (or declare relational_only)".to_string(),
            ));
        }

        let relational = RelationalAdapter::open(&config.db_path(), &config.collection, descriptor)?;

        let document = match &config.document {
            DocumentSource::Uri(uri) => Some(DocumentAdapter::connect(
                uri,
                &config.database,
                &config.collection,
                &config.timeouts,
            )?),
            DocumentSource::Disabled => None,
            DocumentSource::Unset => unreachable!("rejected above"),
        };

        Ok(Self {
            descriptor,
            relational,
            document,
        })
    }

    pub fn mode(&self) -> Mode {
        self.descriptor.mode()
    }

    pub fn descriptor(&self) -> &'static SchemaDescriptor {
        self.descriptor
    }

    /// Fan a single record out to both backends. The outcomes are
    /// independent and both reported; errors are captured and logged, never
    /// propagated.
    pub fn insert_one(&self, record: &Record) -> WriteReport {
        let relational = match self.relational.insert_one(record) {
            Ok(InsertStatus::Inserted) => WriteOutcome::Inserted,
            Ok(InsertStatus::DuplicateKey) => {
                warn!(record = ?record.values().first(), "duplicate entry detected");
                WriteOutcome::DuplicateKey
            }
            Err(e) => {
                warn!(error = %e, "relational insert failed");
                WriteOutcome::Error(e)
            }
        };

        let document = self.document.as_ref().map(|adapter| {
            match adapter.insert_one(self.descriptor.document_from(record)) {
                Ok(()) => WriteOutcome::Inserted,
                Err(e) => {
                    warn!(error = %e, "document insert failed");
                    WriteOutcome::Error(e)
                }
            }
        });

        WriteReport {
            relational,
            document,
        }
    }

    /// Fan a batch out to both backends. The relational side is one
    /// all-or-nothing transaction; the document side is an unordered bulk
    /// write with overall success/failure only.
    pub fn insert_many(&self, records: &[Record]) -> BatchReport {
        let relational = match self.relational.insert_many(records) {
            Ok(inserted) => BatchOutcome {
                inserted,
                success: true,
            },
            Err(e) => {
                warn!(error = %e, "relational batch rolled back");
                BatchOutcome {
                    inserted: 0,
                    success: false,
                }
            }
        };

        let document = self.document.as_ref().map(|adapter| {
            let documents = records
                .iter()
                .map(|r| self.descriptor.document_from(r))
                .collect();
            match adapter.insert_many(documents) {
                Ok(inserted) => BatchOutcome {
                    inserted,
                    success: true,
                },
                Err(e) => {
                    warn!(error = %e, "document bulk insert failed");
                    BatchOutcome {
                        inserted: 0,
                        success: false,
                    }
                }
            }
        });

        BatchReport {
            relational,
            document,
        }
    }

    /// Query the backend holding the canonical read copy and return
    /// normalized field→value rows.
    pub fn find(&self, query: &FindQuery) -> Result<Vec<RecordMap>> {
        match &self.document {
            Some(adapter) => adapter.find(query),
            None => self.relational.find(query),
        }
    }

    /// Destroy both backends independently: delete the relational file and
    /// drop the remote collection. A failure in one does not block the
    /// other; the first error is reported after both ran.
    pub fn destroy(self) -> Result<()> {
        let Store {
            relational,
            document,
            ..
        } = self;

        let document_result = match &document {
            Some(adapter) => adapter.destroy(),
            None => Ok(()),
        };
        if let Err(e) = &document_result {
            warn!(error = %e, "dropping document collection failed");
        }

        let relational_result = relational.destroy();
        if let Err(e) = &relational_result {
            warn!(error = %e, "deleting relational database failed");
        }

        relational_result.and(document_result)
    }
}
