//! Document store — collection-scoped JSON documents behind one trait.
//!
//! DESIGN
//! ======
//! Every service talks to persistence through `DocumentStore`: filtered
//! collection reads, point reads by id, and single-document writes. There are
//! no transactions and no optimistic-concurrency checks; the last writer wins.
//! Two backends implement the trait: `PgDocumentStore` (one JSONB table) and
//! `MemoryDocumentStore` (tests and local runs).
//!
//! ERROR HANDLING
//! ==============
//! `StoreError::PermissionDenied` is kept distinct from other failures because
//! the reporting layer turns it into a demo-mode signal instead of an error.
//! Collection reads skip documents that do not match the requested record
//! type; point reads by id still report the decode failure.

pub mod memory;
pub mod postgres;

use std::cmp::Ordering;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

/// Collection names used by the application.
pub mod collections {
    pub const USERS: &str = "users";
    pub const SHOPS: &str = "shops";
    pub const SESSIONS: &str = "sessions";
    pub const ECHANGES: &str = "echanges";
    pub const VENTES_CREDIT: &str = "ventes_credit";
    pub const DEPOTS: &str = "depots";
    pub const TRANSACTIONS: &str = "transactions";
    pub const CLIENTS: &str = "clients";
    pub const MESSAGES: &str = "messages";
    pub const EMPRUNTS_SOCIETE: &str = "emprunts_societe";
    pub const DEPENSES: &str = "depenses";
    pub const DEPOT_CARTE: &str = "depot_carte";
    pub const MOUVEMENTS: &str = "mouvements";
    pub const OPERATIONS: &str = "operations";
    pub const RAPPORTS_CAISSE: &str = "rapports_caisse";
    pub const SALAIRES: &str = "salaires";
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },
    #[error("document body must be a JSON object")]
    NotAnObject,
    #[error("document decode failed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// True for explicit permission failures and for backend errors whose
    /// message mentions permissions.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::PermissionDenied(_) => true,
            Self::Database(e) => e.to_string().to_ascii_lowercase().contains("permission"),
            _ => false,
        }
    }

    pub(crate) fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound { collection: collection.to_owned(), id: id.to_owned() }
    }
}

// =============================================================================
// DOCUMENT
// =============================================================================

/// A stored document: its id plus the JSON object body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Map<String, Value>,
}

impl Document {
    #[must_use]
    pub fn new(id: impl Into<String>, data: Map<String, Value>) -> Self {
        Self { id: id.into(), data }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// Decode into a typed record. The document id overrides any `id` field
    /// stored in the body.
    ///
    /// # Errors
    ///
    /// Returns a decode error if the body does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let mut data = self.data.clone();
        data.insert("id".into(), Value::String(self.id.clone()));
        Ok(serde_json::from_value(Value::Object(data))?)
    }
}

/// Serialize a typed record into a document body. The `id` field is dropped;
/// it lives outside the body.
///
/// # Errors
///
/// Returns an error if `value` does not serialize to a JSON object.
pub fn encode<T: Serialize>(value: &T) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        _ => Err(StoreError::NotAnObject),
    }
}

// =============================================================================
// QUERY
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    /// Evaluate against a document body. A missing field never matches.
    #[must_use]
    pub fn matches(&self, data: &Map<String, Value>) -> bool {
        let Some(actual) = data.get(&self.field) else {
            return false;
        };
        if self.op == FilterOp::Eq {
            return values_equal(actual, &self.value);
        }
        let Some(ord) = compare_values(actual, &self.value) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => ord == Ordering::Equal,
            FilterOp::Lt => ord == Ordering::Less,
            FilterOp::Lte => ord != Ordering::Greater,
            FilterOp::Gt => ord == Ordering::Greater,
            FilterOp::Gte => ord != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Collection read: conjunction of filters, optional ordering and limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, field: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter { field: field.to_owned(), op, value: value.into() });
        self
    }

    #[must_use]
    pub fn equals(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    #[must_use]
    pub fn at_least(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Gte, value)
    }

    #[must_use]
    pub fn at_most(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Lte, value)
    }

    #[must_use]
    pub fn before(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Lt, value)
    }

    #[must_use]
    pub fn order_asc(mut self, field: &str) -> Self {
        self.order_by = Some(OrderBy { field: field.to_owned(), direction: Direction::Asc });
        self
    }

    #[must_use]
    pub fn order_desc(mut self, field: &str) -> Self {
        self.order_by = Some(OrderBy { field: field.to_owned(), direction: Direction::Desc });
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn matches(&self, data: &Map<String, Value>) -> bool {
        self.filters.iter().all(|f| f.matches(data))
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Order two JSON values of the same kind. Mixed kinds are incomparable.
#[must_use]
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.as_str().cmp(y.as_str())),
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

// =============================================================================
// STORE TRAIT
// =============================================================================

#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read every document of `collection` that satisfies `query`.
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Point read by id.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Insert with a generated id and return that id.
    async fn create(&self, collection: &str, data: Map<String, Value>) -> Result<String, StoreError>;

    /// Insert or replace the document stored under `id`.
    async fn set(&self, collection: &str, id: &str, data: Map<String, Value>) -> Result<(), StoreError>;

    /// Merge `patch` into an existing document. Fails with `NotFound` if absent.
    async fn update(&self, collection: &str, id: &str, patch: Map<String, Value>) -> Result<(), StoreError>;

    /// Remove a document. Removing a missing document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}

/// Typed collection read. Documents that do not decode into `T` are logged
/// and left out of the result.
///
/// # Errors
///
/// Propagates store failures.
pub async fn query_as<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    query: &Query,
) -> Result<Vec<T>, StoreError> {
    let docs = store.query(collection, query).await?;
    Ok(docs
        .iter()
        .filter_map(|doc| match doc.decode() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(collection, doc_id = %doc.id, error = %e, "skipping undecodable document");
                None
            }
        })
        .collect())
}

/// Typed point read.
///
/// # Errors
///
/// Propagates store failures and decode failures.
pub async fn get_as<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
) -> Result<Option<T>, StoreError> {
    store
        .get(collection, id)
        .await?
        .map(|doc| doc.decode())
        .transpose()
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
