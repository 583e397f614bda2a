//! Hierarchical document store boundary.
//!
//! Records live under one of three roots and are addressed by `root/key`.
//! Everything above this trait treats the store as remote: no schema, no
//! joins, only the primitives below.

mod memory;
mod sqlite;

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::appresult::DataResult;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Root {
    Users,
    ContactLists,
    Events,
}

impl Root {
    pub fn as_str(&self) -> &'static str {
        use Root::*;
        match self {
            Users => "users",
            ContactLists => "contactLists",
            Events => "events",
        }
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Point read of `root/key`.
    async fn get(&self, root: Root, key: &str) -> DataResult<Option<Value>>;

    /// Full scan of a root, in key order.
    async fn list(&self, root: Root) -> DataResult<Vec<(String, Value)>>;

    /// Every record under `root` whose string field `child` equals `value`.
    async fn query_eq(&self, root: Root, child: &str, value: &str) -> DataResult<Vec<(String, Value)>>;

    /// Unconditional write, last write wins.
    async fn set(&self, root: Root, key: &str, value: Value) -> DataResult<()>;

    /// Write only if `root/key` is absent, `Conflict` otherwise.
    async fn create(&self, root: Root, key: &str, value: Value) -> DataResult<()>;

    /// Merge `fields` into an existing object record.
    async fn update(&self, root: Root, key: &str, fields: Map<String, Value>) -> DataResult<()>;

    /// Append under a generated, time-ordered key and return it.
    async fn push(&self, root: Root, value: Value) -> DataResult<String>;

    async fn remove(&self, root: Root, key: &str) -> DataResult<()>;

    /// Replace `root/key` with `value` only if it still equals `expected`.
    /// Returns false when the record changed underneath the caller.
    async fn compare_and_set(&self, root: Root, key: &str, expected: &Value, value: Value) -> DataResult<bool>;
}

pub(crate) fn push_key() -> String {
    uuid::Uuid::now_v7().to_string()
}
