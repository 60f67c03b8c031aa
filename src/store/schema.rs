//! Mode-specific schema descriptors
//!
//! One fixed schema per operating mode, resolved once at construction and
//! shared by both backends. The descriptor is the single source of truth for
//! field order, primary keys, and the generated SQL.

use std::fmt;
use std::str::FromStr;

use mongodb::bson;
use serde::{Deserialize, Serialize};

use super::error::StoreError;
use super::record::Record;

/// Operating mode selecting which fixed schema a store instance uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Hourly raw rate observations.
    Aux,
    /// Six-hour aggregated features.
    Main,
}

impl FromStr for Mode {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aux" => Ok(Mode::Aux),
            "main" => Ok(Mode::Main),
            other => Err(StoreError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Aux => write!(f, "aux"),
            Mode::Main => write!(f, "main"),
        }
    }
}

/// Semantic type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Real,
}

impl FieldType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldType::Text => "TEXT",
            FieldType::Real => "REAL",
        }
    }
}

/// One field of a schema, in canonical insert order.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub ty: FieldType,
    pub nullable: bool,
    pub primary_key: bool,
}

const fn field(name: &'static str, ty: FieldType, nullable: bool, primary_key: bool) -> FieldDef {
    FieldDef {
        name,
        ty,
        nullable,
        primary_key,
    }
}

static AUX_DESCRIPTOR: SchemaDescriptor = SchemaDescriptor {
    mode: Mode::Aux,
    fields: &[
        field("timestamp", FieldType::Text, false, true),
        field("currency", FieldType::Text, false, true),
        field("rate", FieldType::Real, false, false),
    ],
};

static MAIN_DESCRIPTOR: SchemaDescriptor = SchemaDescriptor {
    mode: Mode::Main,
    fields: &[
        field("timestamp", FieldType::Text, false, true),
        field("currency", FieldType::Text, false, false),
        field("max", FieldType::Real, false, false),
        field("min", FieldType::Real, false, false),
        field("max_min", FieldType::Real, false, false),
        field("mean", FieldType::Real, false, false),
        field("corr_btc", FieldType::Real, true, false),
        field("norm_vol", FieldType::Real, false, false),
        field("fd", FieldType::Real, false, false),
        field("insert_timestamp", FieldType::Text, false, false),
    ],
};

/// Resolved field list, primary key, and insert order for a mode.
#[derive(Debug)]
pub struct SchemaDescriptor {
    mode: Mode,
    fields: &'static [FieldDef],
}

impl SchemaDescriptor {
    /// Look up the descriptor for a mode. Total: the two templates are fixed
    /// and an unrecognized mode string already failed at `Mode::from_str`.
    pub fn resolve(mode: Mode) -> &'static SchemaDescriptor {
        match mode {
            Mode::Aux => &AUX_DESCRIPTOR,
            Mode::Main => &MAIN_DESCRIPTOR,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn fields(&self) -> &'static [FieldDef] {
        self.fields
    }

    pub fn primary_key(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.primary_key)
            .map(|f| f.name)
            .collect()
    }

    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    /// Idempotent table creation statement for the relational backend.
    pub fn create_table_sql(&self, table: &str) -> String {
        let mut parts: Vec<String> = self
            .fields
            .iter()
            .map(|f| {
                let mut col = format!("\"{}\" {}", f.name, f.ty.sql_type());
                if !f.nullable {
                    col.push_str(" NOT NULL");
                }
                col
            })
            .collect();

        let pk: Vec<String> = self
            .primary_key()
            .iter()
            .map(|name| format!("\"{}\"", name))
            .collect();
        parts.push(format!("PRIMARY KEY ({})", pk.join(", ")));

        format!("CREATE TABLE IF NOT EXISTS \"{}\" ({})", table, parts.join(", "))
    }

    /// Parameterized insert statement in canonical field order.
    pub fn insert_sql(&self, table: &str) -> String {
        let columns: Vec<String> = self
            .fields
            .iter()
            .map(|f| format!("\"{}\"", f.name))
            .collect();
        let placeholders: Vec<String> = (1..=self.fields.len()).map(|i| format!("?{}", i)).collect();

        format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        )
    }

    /// Zip a positional record with the field order into a document for the
    /// document backend. A short record yields a short document, matching the
    /// positional insert failing on the relational side.
    pub fn document_from(&self, record: &Record) -> bson::Document {
        let mut doc = bson::Document::new();
        for (def, value) in self.fields.iter().zip(record.values()) {
            doc.insert(def.name, value);
        }
        doc
    }
}
