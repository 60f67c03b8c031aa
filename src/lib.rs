//! ratestore - dual-backend persistence for currency-pair time series
//!
//! Writes fan out to an embedded SQLite store and a remote MongoDB
//! collection sharing one logical schema per operating mode; queries go
//! through a single backend-agnostic entry point.

pub mod store;

pub use store::config::{DocumentTimeouts, StoreConfig};
pub use store::error::{Result, StoreError};
pub use store::facade::Store;
pub use store::query::{FindQuery, Predicate, SortDirection, SortKey};
pub use store::record::{
    BatchOutcome, BatchReport, FieldValue, Record, RecordMap, WriteOutcome, WriteReport,
};
pub use store::relational::InsertStatus;
pub use store::schema::{Mode, SchemaDescriptor};
