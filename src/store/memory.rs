use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::appresult::{DataError, DataResult};

use super::{push_key, Root, Store};

/// In-process store, used as the test double for the remote one.
///
/// Individual records can be made read-only with [`MemoryStore::deny_writes`]
/// to reproduce a store rejecting one write in the middle of a sequence.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    nodes: BTreeMap<Root, BTreeMap<String, Value>>,
    denied: HashSet<(Root, String)>,
}

impl Inner {
    fn check_writable(&self, root: Root, key: &str) -> DataResult<()> {
        if self.denied.contains(&(root, key.to_owned())) {
            return Err(DataError::Unavailable(format!("write to {root}/{key} denied")));
        }
        Ok(())
    }

    fn children(&mut self, root: Root) -> &mut BTreeMap<String, Value> {
        self.nodes.entry(root).or_default()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny_writes(&self, root: Root, key: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.denied.insert((root, key.to_owned()));
        }
    }

    pub fn allow_writes(&self, root: Root, key: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.denied.remove(&(root, key.to_owned()));
        }
    }

    fn lock(&self) -> DataResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| DataError::Unavailable("memory store poisoned".to_owned()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, root: Root, key: &str) -> DataResult<Option<Value>> {
        let inner = self.lock()?;
        Ok(inner.nodes.get(&root).and_then(|children| children.get(key)).cloned())
    }

    async fn list(&self, root: Root) -> DataResult<Vec<(String, Value)>> {
        let inner = self.lock()?;
        Ok(inner
            .nodes
            .get(&root)
            .map(|children| children.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn query_eq(&self, root: Root, child: &str, value: &str) -> DataResult<Vec<(String, Value)>> {
        Ok(self
            .list(root)
            .await?
            .into_iter()
            .filter(|(_, record)| record.get(child).and_then(Value::as_str) == Some(value))
            .collect())
    }

    async fn set(&self, root: Root, key: &str, value: Value) -> DataResult<()> {
        let mut inner = self.lock()?;
        inner.check_writable(root, key)?;
        inner.children(root).insert(key.to_owned(), value);
        Ok(())
    }

    async fn create(&self, root: Root, key: &str, value: Value) -> DataResult<()> {
        let mut inner = self.lock()?;
        inner.check_writable(root, key)?;
        let children = inner.children(root);
        if children.contains_key(key) {
            return Err(DataError::Conflict(format!("{root}/{key} already exists")));
        }
        children.insert(key.to_owned(), value);
        Ok(())
    }

    async fn update(&self, root: Root, key: &str, fields: Map<String, Value>) -> DataResult<()> {
        let mut inner = self.lock()?;
        inner.check_writable(root, key)?;
        let Some(record) = inner.children(root).get_mut(key) else {
            return Err(DataError::NotFound(format!("{root}/{key}")));
        };
        let Some(object) = record.as_object_mut() else {
            return Err(DataError::Invalid(format!("{root}/{key} is not an object")));
        };
        object.extend(fields);
        Ok(())
    }

    async fn push(&self, root: Root, value: Value) -> DataResult<String> {
        let key = push_key();
        self.set(root, &key, value).await?;
        Ok(key)
    }

    async fn remove(&self, root: Root, key: &str) -> DataResult<()> {
        let mut inner = self.lock()?;
        inner.check_writable(root, key)?;
        inner.children(root).remove(key);
        Ok(())
    }

    async fn compare_and_set(&self, root: Root, key: &str, expected: &Value, value: Value) -> DataResult<bool> {
        let mut inner = self.lock()?;
        inner.check_writable(root, key)?;
        match inner.children(root).get_mut(key) {
            Some(current) if current == expected => {
                *current = value;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn query_matches_string_children_only() {
        let store = MemoryStore::new();
        store.set(Root::Users, "ann", json!({"email": "ann@x.io", "phone": "1"})).await.unwrap();
        store.set(Root::Users, "bob", json!({"email": "bob@x.io", "phone": 1})).await.unwrap();

        let hits = store.query_eq(Root::Users, "email", "ann@x.io").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "ann");

        assert!(store.query_eq(Root::Users, "phone", "1").await.unwrap().len() == 1);
    }

    #[tokio::test]
    async fn create_refuses_existing_key() {
        let store = MemoryStore::new();
        store.create(Root::Users, "ann", json!({"email": "a"})).await.unwrap();

        let err = store.create(Root::Users, "ann", json!({"email": "b"})).await.unwrap_err();
        assert!(matches!(err, DataError::Conflict(_)));
        assert_eq!(store.get(Root::Users, "ann").await.unwrap(), Some(json!({"email": "a"})));
    }

    #[tokio::test]
    async fn update_merges_fields_and_requires_record() {
        let store = MemoryStore::new();
        store.set(Root::ContactLists, "l1", json!({"owner": "a", "contacts": []})).await.unwrap();

        let mut fields = Map::new();
        fields.insert("contacts".into(), json!(["b"]));
        store.update(Root::ContactLists, "l1", fields.clone()).await.unwrap();
        assert_eq!(
            store.get(Root::ContactLists, "l1").await.unwrap(),
            Some(json!({"owner": "a", "contacts": ["b"]}))
        );

        let err = store.update(Root::ContactLists, "nope", fields).await.unwrap_err();
        assert!(matches!(err, DataError::NotFound(_)));
    }

    #[tokio::test]
    async fn compare_and_set_detects_interleaved_write() {
        let store = MemoryStore::new();
        store.set(Root::Events, "e1", json!({"n": 1})).await.unwrap();
        let seen = store.get(Root::Events, "e1").await.unwrap().unwrap();

        store.set(Root::Events, "e1", json!({"n": 2})).await.unwrap();
        assert!(!store.compare_and_set(Root::Events, "e1", &seen, json!({"n": 3})).await.unwrap());

        let seen = json!({"n": 2});
        assert!(store.compare_and_set(Root::Events, "e1", &seen, json!({"n": 3})).await.unwrap());
        assert_eq!(store.get(Root::Events, "e1").await.unwrap(), Some(json!({"n": 3})));
    }

    #[tokio::test]
    async fn denied_records_reject_writes_until_allowed() {
        let store = MemoryStore::new();
        store.set(Root::Events, "e1", json!({})).await.unwrap();
        store.deny_writes(Root::Events, "e1");

        let err = store.set(Root::Events, "e1", json!({"x": 1})).await.unwrap_err();
        assert!(matches!(err, DataError::Unavailable(_)));

        store.allow_writes(Root::Events, "e1");
        store.set(Root::Events, "e1", json!({"x": 1})).await.unwrap();
    }

    #[tokio::test]
    async fn pushed_keys_list_in_insertion_order() {
        let store = MemoryStore::new();
        let first = store.push(Root::Events, json!({"i": 0})).await.unwrap();
        let second = store.push(Root::Events, json!({"i": 1})).await.unwrap();

        let keys: Vec<_> = store.list(Root::Events).await.unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![first, second]);
    }
}
