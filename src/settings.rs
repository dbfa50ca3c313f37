//! Object store settings
//!
//! Defaults point at the public DeepESDL bucket. Each value can be
//! overridden through the environment or on the command line.

pub const DEFAULT_S3_ENDPOINT: &str = "https://s3.eu-central-1.amazonaws.com";
pub const DEFAULT_S3_REGION: &str = "eu-central-1";
pub const DEFAULT_PUBLIC_BUCKET: &str = "deep-esdl-public";

pub const ENV_S3_ENDPOINT: &str = "STACGEN_S3_ENDPOINT";
pub const ENV_S3_REGION: &str = "STACGEN_S3_REGION";
pub const ENV_PUBLIC_BUCKET: &str = "STACGEN_PUBLIC_BUCKET";

/// Bucket credentials of the authenticated user store
pub const ENV_USER_BUCKET: &str = "S3_USER_STORAGE_BUCKET";
pub const ENV_USER_KEY: &str = "S3_USER_STORAGE_KEY";
pub const ENV_USER_SECRET: &str = "S3_USER_STORAGE_SECRET";

/// Where and how S3 buckets are reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub endpoint: String,
    pub region: String,
    pub public_bucket: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_S3_ENDPOINT.to_string(),
            region: DEFAULT_S3_REGION.to_string(),
            public_bucket: DEFAULT_PUBLIC_BUCKET.to_string(),
        }
    }
}

impl StoreSettings {
    /// Defaults overridden by the `STACGEN_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`StoreSettings::from_env`] with an injectable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |name: &str, default: String| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(default)
        };
        Self {
            endpoint: get(ENV_S3_ENDPOINT, defaults.endpoint),
            region: get(ENV_S3_REGION, defaults.region),
            public_bucket: get(ENV_PUBLIC_BUCKET, defaults.public_bucket),
        }
    }
}
