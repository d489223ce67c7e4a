//! Schemaless key-value store with three collections ("bases"): subscribers,
//! posts and config.
//!
//! Items are JSON objects; the store assigns each one a unique `key` on
//! insert. There is no cross-item atomicity whatsoever, so any
//! check-then-write done by a caller is racy.

mod deta;
mod memory;

pub use deta::DetaBase;
pub use memory::MemoryBase;
use secrecy::Secret;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

pub type Item = Map<String, Value>;

/// A stored item of type `T`, together with its store-assigned key. On the
/// wire this is a single flat object, e.g. `{"key": "abc", "email": ...}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Record<T> {
    pub key: String,
    #[serde(flatten)]
    pub value: T,
}

/// Equality filters, ANDed together. An empty query matches every item.
#[derive(Serialize, Debug, Clone, Default)]
#[serde(transparent)]
pub struct Query(Item);

impl Query {
    pub fn all() -> Self { Self::default() }

    pub fn eq(
        mut self,
        field: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.0.insert(field.to_owned(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn matches(
        &self,
        item: &Item,
    ) -> bool {
        self.0
            .iter()
            .all(|(field, value)| item.get(field) == Some(value))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("No item with key {0:?}")]
    NotFound(String),
    #[error("Item could not be (de)serialized")]
    Malformed(#[from] serde_json::Error),
    #[error("Request to the store failed")]
    Request(#[from] reqwest::Error),
}

/// One collection. Cloning is cheap; clones share the same underlying client
/// (or map, for the in-memory backend).
#[derive(Clone)]
pub enum Base {
    Deta(DetaBase),
    Memory(MemoryBase),
}

impl Base {
    pub fn name(&self) -> &str {
        match self {
            Base::Deta(b) => b.name(),
            Base::Memory(b) => b.name(),
        }
    }

    /// All items matching `query`, in store order
    #[tracing::instrument(name = "Fetching items", skip(self), fields(base = %self.name()))]
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        query: Query,
    ) -> Result<Vec<Record<T>>, StoreError> {
        let items = match self {
            Base::Deta(b) => b.fetch(&query).await?,
            Base::Memory(b) => b.fetch(&query).await,
        };
        items
            .into_iter()
            .map(|i| serde_json::from_value(Value::Object(i)).map_err(StoreError::from))
            .collect()
    }

    /// First item matching `query`, if any
    pub async fn find<T: DeserializeOwned>(
        &self,
        query: Query,
    ) -> Result<Option<Record<T>>, StoreError> {
        Ok(self.fetch(query).await?.into_iter().next())
    }

    #[tracing::instrument(name = "Getting item", skip(self), fields(base = %self.name()))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<Record<T>>, StoreError> {
        let item = match self {
            Base::Deta(b) => b.get(key).await?,
            Base::Memory(b) => b.get(key).await,
        };
        item.map(|i| serde_json::from_value(Value::Object(i)).map_err(StoreError::from))
            .transpose()
    }

    /// Returns the key assigned to the new item
    #[tracing::instrument(name = "Inserting item", skip(self, value), fields(base = %self.name()))]
    pub async fn insert<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<String, StoreError> {
        let item = to_item(value)?;
        match self {
            Base::Deta(b) => b.insert(item).await,
            Base::Memory(b) => Ok(b.insert(item).await),
        }
    }

    /// Overwrites the fields present in `updates`; other fields are left
    /// alone. Fails with `NotFound` if `key` does not exist.
    #[tracing::instrument(name = "Updating item", skip(self, updates), fields(base = %self.name()))]
    pub async fn update<T: Serialize>(
        &self,
        key: &str,
        updates: &T,
    ) -> Result<(), StoreError> {
        let updates = to_item(updates)?;
        match self {
            Base::Deta(b) => b.update(key, updates).await,
            Base::Memory(b) => b.update(key, updates).await,
        }
    }

    /// Succeeds whether or not `key` exists
    #[tracing::instrument(name = "Deleting item", skip(self), fields(base = %self.name()))]
    pub async fn delete(
        &self,
        key: &str,
    ) -> Result<(), StoreError> {
        match self {
            Base::Deta(b) => b.delete(key).await,
            Base::Memory(b) => {
                b.delete(key).await;
                Ok(())
            }
        }
    }
}

/// Serialize `value` into a JSON object; the `key` field, if any, is dropped
/// since it is owned by the store.
fn to_item<T: Serialize>(value: &T) -> Result<Item, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(mut item) => {
            item.remove("key");
            Ok(item)
        }
        other => Err(StoreError::Malformed(serde::ser::Error::custom(format!(
            "expected a JSON object, got {other}"
        )))),
    }
}

/// The three collections used by the newsletter
#[derive(Clone)]
pub struct Store {
    pub subscribers: Base,
    pub posts: Base,
    pub config: Base,
}

impl Store {
    pub fn in_memory(prefix: &str) -> Self {
        Self {
            subscribers: Base::Memory(MemoryBase::new(format!("{prefix}-subscribers"))),
            posts: Base::Memory(MemoryBase::new(format!("{prefix}-posts"))),
            config: Base::Memory(MemoryBase::new(format!("{prefix}-config"))),
        }
    }

    pub fn deta(
        base_url: &str,
        project_key: Secret<String>,
        prefix: &str,
    ) -> Result<Self, anyhow::Error> {
        let http_client = DetaBase::http_client()?;
        let base = |name: &str| {
            DetaBase::new(
                http_client.clone(),
                base_url,
                project_key.clone(),
                format!("{prefix}-{name}"),
            )
            .map(Base::Deta)
        };
        Ok(Self {
            subscribers: base("subscribers")?,
            posts: base("posts")?,
            config: base("config")?,
        })
    }
}
