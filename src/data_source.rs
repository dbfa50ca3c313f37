//! Store configurations and dataset opening with fallback
//!
//! A dataset id is looked up in a list of store configurations, tried in
//! order: first the public bucket without credentials, then the user's
//! bucket with the credentials found in the environment. Store
//! construction goes through [`DataStoreFactory`] so it can be swapped out.

use crate::dataset::Dataset;
use crate::errors::{Result, StacGenError};
use crate::settings::{StoreSettings, ENV_USER_BUCKET, ENV_USER_KEY, ENV_USER_SECRET};
use crate::store::{ObjectStore, PrefixedStore, S3Credentials, S3Store};
use crate::zarr_io::open_zarr;
use std::sync::Arc;
use tracing::{info, warn};

pub const PUBLIC_STORE_NAME: &str = "Public store";
pub const AUTHENTICATED_STORE_NAME: &str = "Authenticated store";

/// One way of reaching the bucket holding a dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub name: String,
    pub root: String,
    pub credentials: S3Credentials,
}

impl StoreConfig {
    /// The public bucket, read anonymously
    pub fn public(settings: &StoreSettings) -> Self {
        Self {
            name: PUBLIC_STORE_NAME.to_string(),
            root: settings.public_bucket.clone(),
            credentials: S3Credentials::Anonymous,
        }
    }

    /// The user bucket from `S3_USER_STORAGE_*`.
    ///
    /// Missing variables are kept empty here and reported when the store
    /// is created, so this configuration still counts as tried.
    pub fn authenticated_from_env() -> Self {
        Self::authenticated_from_lookup(|name| std::env::var(name).ok())
    }

    pub fn authenticated_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).unwrap_or_default();
        Self {
            name: AUTHENTICATED_STORE_NAME.to_string(),
            root: get(ENV_USER_BUCKET),
            credentials: S3Credentials::Static {
                key: get(ENV_USER_KEY),
                secret: get(ENV_USER_SECRET),
            },
        }
    }

    /// Public store first, then authenticated store
    pub fn default_chain(settings: &StoreSettings) -> Vec<Self> {
        vec![Self::public(settings), Self::authenticated_from_env()]
    }
}

/// Creates the object store for a configuration
pub trait DataStoreFactory: Send + Sync {
    fn new_data_store(&self, config: &StoreConfig) -> Result<Arc<dyn ObjectStore>>;
}

/// Factory building [`S3Store`]s against the configured endpoint
#[derive(Debug, Clone, Default)]
pub struct S3StoreFactory {
    settings: StoreSettings,
}

impl S3StoreFactory {
    pub fn new(settings: StoreSettings) -> Self {
        Self { settings }
    }
}

impl DataStoreFactory for S3StoreFactory {
    fn new_data_store(&self, config: &StoreConfig) -> Result<Arc<dyn ObjectStore>> {
        if config.root.trim().is_empty() {
            return Err(StacGenError::Config(format!(
                "{}: no bucket configured (set {})",
                config.name, ENV_USER_BUCKET
            )));
        }
        if let S3Credentials::Static { key, secret } = &config.credentials {
            if key.is_empty() || secret.is_empty() {
                return Err(StacGenError::Config(format!(
                    "{}: missing credentials (set {} and {})",
                    config.name, ENV_USER_KEY, ENV_USER_SECRET
                )));
            }
        }
        Ok(Arc::new(S3Store::new(
            &self.settings.endpoint,
            &self.settings.region,
            &config.root,
            config.credentials.clone(),
        )?))
    }
}

async fn open_with(
    factory: &dyn DataStoreFactory,
    config: &StoreConfig,
    dataset_id: &str,
) -> Result<Dataset> {
    let store = factory.new_data_store(config)?;
    open_zarr(Arc::new(PrefixedStore::new(store, dataset_id))).await
}

/// Open `dataset_id` with the first configuration that works.
///
/// Every configuration is tried exactly once, in order. When all fail the
/// error names each configuration tried and carries the last failure.
pub async fn open_dataset_with_fallback(
    factory: &dyn DataStoreFactory,
    configs: &[StoreConfig],
    dataset_id: &str,
) -> Result<Dataset> {
    let mut tried = Vec::with_capacity(configs.len());
    let mut last_error = StacGenError::Config("No store configurations given".to_string());

    for config in configs {
        info!("Attempting to open dataset with configuration: {}", config.name);
        tried.push(config.name.clone());
        match open_with(factory, config, dataset_id).await {
            Ok(dataset) => {
                info!("Successfully opened dataset with configuration: {}", config.name);
                return Ok(dataset);
            }
            Err(e) => {
                warn!("Failed to open dataset with configuration {}: {}", config.name, e);
                last_error = e;
            }
        }
    }

    Err(StacGenError::DatasetOpen {
        dataset_id: dataset_id.to_string(),
        tried,
        last_error: Box::new(last_error),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticated_config_reads_lookup() {
        let config = StoreConfig::authenticated_from_lookup(|name| match name {
            ENV_USER_BUCKET => Some("mock-bucket".to_string()),
            ENV_USER_KEY => Some("mock-key".to_string()),
            ENV_USER_SECRET => Some("mock-secret".to_string()),
            _ => None,
        });
        assert_eq!(config.name, AUTHENTICATED_STORE_NAME);
        assert_eq!(config.root, "mock-bucket");
        assert_eq!(
            config.credentials,
            S3Credentials::Static {
                key: "mock-key".to_string(),
                secret: "mock-secret".to_string()
            }
        );
    }

    #[test]
    fn s3_factory_rejects_incomplete_configs() {
        let factory = S3StoreFactory::default();
        let missing = StoreConfig::authenticated_from_lookup(|_| None);
        assert!(matches!(factory.new_data_store(&missing), Err(StacGenError::Config(_))));

        let no_secret = StoreConfig::authenticated_from_lookup(|name| {
            (name != ENV_USER_SECRET).then(|| "x".to_string())
        });
        let err = factory.new_data_store(&no_secret).unwrap_err();
        assert!(err.to_string().contains("missing credentials"));

        let public = StoreConfig::public(&StoreSettings::default());
        assert_eq!(public.root, "deep-esdl-public");
        assert!(factory.new_data_store(&public).is_ok());
    }

    #[tokio::test]
    async fn empty_chain_fails() {
        let err = open_dataset_with_fallback(&S3StoreFactory::default(), &[], "id")
            .await
            .unwrap_err();
        assert!(matches!(err, StacGenError::DatasetOpen { ref tried, .. } if tried.is_empty()));
    }
}
