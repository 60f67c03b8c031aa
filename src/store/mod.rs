// Ratestore core module structure
pub mod config;
pub mod document;
pub mod error;
pub mod facade;
pub mod query;
pub mod record;
pub mod relational;
pub mod schema;

pub use config::StoreConfig;
pub use document::DocumentAdapter;
pub use error::StoreError;
pub use facade::Store;
pub use query::FindQuery;
pub use record::{FieldValue, Record};
pub use relational::RelationalAdapter;
pub use schema::{Mode, SchemaDescriptor};
