//! Backend-neutral queries and their relational translation
//!
//! `FindQuery` carries predicate, sort, projection, and limit. The document
//! backend serves structured filters natively; only the relational path goes
//! through the SQL renderer here. Raw clause predicates are a trusted
//! internal boundary and are passed through unsanitized.

use std::fmt;

use mongodb::bson::{self, Bson};
use serde::{Deserialize, Serialize};

use super::error::{Result, StoreError};

/// Sort direction, normalized from either the `1`/`-1` or `"ASC"`/`"DESC"`
/// convention. `-1` and `"DESC"` mean descending; anything else ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// The `1`/`-1` form used by the document backend.
    pub fn document_order(&self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

impl From<i32> for SortDirection {
    fn from(direction: i32) -> Self {
        if direction == -1 {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }
}

impl From<&str> for SortDirection {
    fn from(direction: &str) -> Self {
        if direction.eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// One (field, direction) sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// Backend-neutral filter description.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Raw relational filter clause, passed through verbatim. Not servable by
    /// the document backend.
    Clause(String),
    /// Structured filter document: flat field→value equality plus
    /// `$eq`/`$ne`/`$gt`/`$gte`/`$lt`/`$lte`. Served natively by the document
    /// backend and rendered to SQL for the relational one.
    Filter(bson::Document),
}

/// Predicate, sort, projection, and limit for one `find` call.
#[derive(Debug, Clone, Default)]
pub struct FindQuery {
    pub predicate: Option<Predicate>,
    pub sort: Vec<SortKey>,
    /// `None` means all fields.
    pub projection: Option<Vec<String>>,
    pub limit: Option<usize>,
}

impl FindQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw relational filter clause.
    pub fn clause(mut self, clause: impl Into<String>) -> Self {
        self.predicate = Some(Predicate::Clause(clause.into()));
        self
    }

    /// Structured filter document.
    pub fn filter(mut self, filter: bson::Document) -> Self {
        self.predicate = Some(Predicate::Filter(filter));
        self
    }

    pub fn sort(mut self, field: &str, direction: impl Into<SortDirection>) -> Self {
        self.sort.push(SortKey {
            field: field.to_string(),
            direction: direction.into(),
        });
        self
    }

    pub fn project(mut self, fields: &[&str]) -> Self {
        self.projection = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn literal(value: &Bson) -> Result<String> {
    match value {
        Bson::String(s) => Ok(format!("'{}'", s.replace('\'', "''"))),
        Bson::Double(f) => Ok(format!("{}", f)),
        Bson::Int32(i) => Ok(format!("{}", i)),
        Bson::Int64(i) => Ok(format!("{}", i)),
        Bson::Boolean(b) => Ok(if *b { "1" } else { "0" }.to_string()),
        other => Err(StoreError::Translation(format!(
            "unsupported literal in filter: {}",
            other
        ))),
    }
}

fn comparison_op(op: &str) -> Result<&'static str> {
    match op {
        "$eq" => Ok("="),
        "$ne" => Ok("!="),
        "$gt" => Ok(">"),
        "$gte" => Ok(">="),
        "$lt" => Ok("<"),
        "$lte" => Ok("<="),
        other => Err(StoreError::Translation(format!(
            "unsupported filter operator: {}",
            other
        ))),
    }
}

fn render_filter(filter: &bson::Document) -> Result<String> {
    let mut parts = Vec::new();

    for (field, value) in filter {
        match value {
            Bson::Document(operators) => {
                for (op, operand) in operators {
                    let sql_op = comparison_op(op)?;
                    match operand {
                        Bson::Null if sql_op == "=" => {
                            parts.push(format!("{} IS NULL", quote_ident(field)));
                        }
                        Bson::Null if sql_op == "!=" => {
                            parts.push(format!("{} IS NOT NULL", quote_ident(field)));
                        }
                        Bson::Null => {
                            return Err(StoreError::Translation(format!(
                                "{} cannot be compared against null with {}",
                                field, op
                            )));
                        }
                        _ => parts.push(format!(
                            "{} {} {}",
                            quote_ident(field),
                            sql_op,
                            literal(operand)?
                        )),
                    }
                }
            }
            Bson::Null => parts.push(format!("{} IS NULL", quote_ident(field))),
            scalar => parts.push(format!("{} = {}", quote_ident(field), literal(scalar)?)),
        }
    }

    Ok(parts.join(" AND "))
}

/// Render one `SELECT` statement for the relational backend.
///
/// No predicate emits no `WHERE` clause, no sort emits no `ORDER BY`, and an
/// omitted projection selects all fields.
pub(crate) fn render_select(table: &str, query: &FindQuery) -> Result<String> {
    let columns = match &query.projection {
        Some(fields) if !fields.is_empty() => fields
            .iter()
            .map(|f| quote_ident(f))
            .collect::<Vec<_>>()
            .join(", "),
        _ => "*".to_string(),
    };

    let mut sql = format!("SELECT {} FROM {}", columns, quote_ident(table));

    if let Some(predicate) = &query.predicate {
        let clause = match predicate {
            Predicate::Clause(raw) => raw.trim().to_string(),
            Predicate::Filter(filter) => render_filter(filter)?,
        };
        if !clause.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clause);
        }
    }

    if !query.sort.is_empty() {
        let keys: Vec<String> = query
            .sort
            .iter()
            .map(|key| format!("{} {}", quote_ident(&key.field), key.direction))
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&keys.join(", "));
    }

    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    Ok(sql)
}

/// Filter document for the document backend. A raw relational clause has no
/// native document form and is rejected.
pub(crate) fn document_filter(predicate: Option<&Predicate>) -> Result<Option<bson::Document>> {
    match predicate {
        None => Ok(None),
        Some(Predicate::Filter(filter)) => Ok(Some(filter.clone())),
        Some(Predicate::Clause(_)) => Err(StoreError::Translation(
            "raw filter clause cannot be served by the document backend".to_string(),
        )),
    }
}

/// Sort document in normalized `1`/`-1` form.
pub(crate) fn document_sort(sort: &[SortKey]) -> Option<bson::Document> {
    if sort.is_empty() {
        return None;
    }
    let mut doc = bson::Document::new();
    for key in sort {
        doc.insert(key.field.clone(), key.direction.document_order());
    }
    Some(doc)
}

/// Inclusion projection, with the backend-generated `_id` suppressed so both
/// backends return the same row shape.
pub(crate) fn document_projection(projection: Option<&Vec<String>>) -> Option<bson::Document> {
    let fields = projection?;
    let mut doc = bson::Document::new();
    for field in fields {
        doc.insert(field.clone(), 1);
    }
    doc.insert("_id", 0);
    Some(doc)
}
