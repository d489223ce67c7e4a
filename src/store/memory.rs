use std::collections::BTreeMap;
use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::thread_rng;
use rand::Rng;
use serde_json::Value;
use tokio::sync::RwLock;

use super::Item;
use super::Query;
use super::StoreError;

/// Process-local stand-in for a Deta Base, for development and tests. Follows
/// the same semantics: store-assigned keys, partial updates, and deletes that
/// succeed whether or not the key exists.
#[derive(Clone)]
pub struct MemoryBase {
    name: String,
    items: Arc<RwLock<BTreeMap<String, Item>>>,
}

/// 12 lowercase alphanumeric characters, like deta's own keys
fn generate_key() -> String {
    let mut rng = thread_rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(|c| char::from(c).to_ascii_lowercase())
        .take(12)
        .collect()
}

impl MemoryBase {
    pub fn new(name: String) -> Self {
        Self {
            name,
            items: Arc::default(),
        }
    }

    pub fn name(&self) -> &str { &self.name }

    pub async fn fetch(
        &self,
        query: &Query,
    ) -> Vec<Item> {
        self.items
            .read()
            .await
            .values()
            .filter(|i| query.matches(i))
            .cloned()
            .collect()
    }

    pub async fn get(
        &self,
        key: &str,
    ) -> Option<Item> {
        self.items.read().await.get(key).cloned()
    }

    pub async fn insert(
        &self,
        mut item: Item,
    ) -> String {
        let mut items = self.items.write().await;
        let key = loop {
            let key = generate_key();
            if !items.contains_key(&key) {
                break key;
            }
        };
        item.insert("key".to_owned(), Value::String(key.clone()));
        items.insert(key.clone(), item);
        key
    }

    pub async fn update(
        &self,
        key: &str,
        updates: Item,
    ) -> Result<(), StoreError> {
        let mut items = self.items.write().await;
        let item = items
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.to_owned()))?;
        item.extend(updates);
        Ok(())
    }

    pub async fn delete(
        &self,
        key: &str,
    ) {
        self.items.write().await.remove(key);
    }
}
