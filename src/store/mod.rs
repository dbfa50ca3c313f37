//! Object store access for Zarr datasets
//!
//! A Zarr group is a flat key space (`.zmetadata`, `time/.zarray`,
//! `time/0`, ...). [`ObjectStore`] is the minimal read interface over such a
//! key space, implemented for the local filesystem and for S3-compatible
//! HTTP endpoints.

mod local;
mod s3;
pub mod sigv4;

pub use local::LocalStore;
pub use s3::{S3Credentials, S3Store};

use crate::errors::{Result, StacGenError};
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

/// Read access to a key/value object store
#[async_trait]
pub trait ObjectStore: Send + Sync + fmt::Debug {
    /// Fetch the object stored under `key`, `None` when it does not exist
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// List the immediate child "directories" below `prefix`
    async fn list_dirs(&self, prefix: &str) -> Result<Vec<String>> {
        let _ = prefix;
        Err(StacGenError::Store(format!(
            "{} does not support listing",
            self.describe()
        )))
    }

    /// Human readable location, used in logs and error messages
    fn describe(&self) -> String;

    /// Fetch `key` or fail with [`StacGenError::KeyNotFound`]
    async fn get_required(&self, key: &str) -> Result<Bytes> {
        self.get(key)
            .await?
            .ok_or_else(|| StacGenError::KeyNotFound {
                store: self.describe(),
                key: key.to_string(),
            })
    }
}

/// View of another store rooted at a key prefix
#[derive(Debug, Clone)]
pub struct PrefixedStore {
    inner: Arc<dyn ObjectStore>,
    prefix: String,
}

impl PrefixedStore {
    pub fn new(inner: Arc<dyn ObjectStore>, prefix: &str) -> Self {
        Self {
            inner,
            prefix: prefix.trim_matches('/').to_string(),
        }
    }

    fn full_key(&self, key: &str) -> String {
        join_key(&self.prefix, key)
    }
}

#[async_trait]
impl ObjectStore for PrefixedStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.inner.get(&self.full_key(key)).await
    }

    async fn list_dirs(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.list_dirs(&self.full_key(prefix)).await
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.inner.describe(), self.prefix)
    }
}

/// Join two key fragments with a single `/`, ignoring empty parts
pub fn join_key(prefix: &str, key: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let key = key.trim_start_matches('/');
    match (prefix.is_empty(), key.is_empty()) {
        (true, _) => key.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{}/{}", prefix, key),
    }
}
