//! S3-compatible object store over HTTP

use super::sigv4::{self, SigningParams};
use super::{join_key, ObjectStore};
use crate::errors::{Result, StacGenError};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::{StatusCode, Url};
use tracing::debug;

/// Credentials used to access a bucket
#[derive(Clone, PartialEq, Eq)]
pub enum S3Credentials {
    /// Unsigned requests against a public bucket
    Anonymous,
    /// Access key / secret key pair
    Static { key: String, secret: String },
}

impl std::fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            S3Credentials::Anonymous => write!(f, "Anonymous"),
            S3Credentials::Static { key, .. } => {
                f.debug_struct("Static").field("key", key).finish_non_exhaustive()
            }
        }
    }
}

/// Object store for one bucket, addressed path-style: `{endpoint}/{bucket}/{key}`
#[derive(Debug, Clone)]
pub struct S3Store {
    client: reqwest::Client,
    endpoint: Url,
    bucket: String,
    region: String,
    credentials: S3Credentials,
}

impl S3Store {
    pub fn new(endpoint: &str, region: &str, bucket: &str, credentials: S3Credentials) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| StacGenError::Config(format!("Invalid S3 endpoint '{}': {}", endpoint, e)))?;
        let bucket = bucket.trim_matches('/');
        if bucket.is_empty() {
            return Err(StacGenError::Config("S3 bucket name is empty".to_string()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            bucket: bucket.to_string(),
            region: region.to_string(),
            credentials,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_url(&self, key: &str) -> Result<Url> {
        let base = self.endpoint.as_str().trim_end_matches('/');
        let path = sigv4::uri_encode_path(&format!("/{}", join_key(&self.bucket, key)));
        Url::parse(&format!("{}{}", base, path))
            .map_err(|e| StacGenError::Store(format!("Invalid object URL for '{}': {}", key, e)))
    }

    fn host_header(url: &Url) -> String {
        let host = url.host_str().unwrap_or_default();
        match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let url = self.object_url(key)?;
        let mut request = self.client.get(url.clone());

        if let S3Credentials::Static { key: access_key, secret } = &self.credentials {
            let host = Self::host_header(&url);
            let params = SigningParams {
                access_key,
                secret_key: secret,
                region: &self.region,
                service: "s3",
                timestamp: Utc::now(),
            };
            for (name, value) in sigv4::sign_get(&params, url.path(), &[("host", host.as_str())])? {
                request = request.header(name, value);
            }
        }

        debug!("GET {}", url);
        let response = request.send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::FORBIDDEN => Err(StacGenError::AccessDenied(format!(
                "GET s3://{}/{} failed with status {}",
                self.bucket, key, StatusCode::FORBIDDEN
            ))),
            status if status.is_success() => Ok(Some(response.bytes().await?)),
            status => Err(StacGenError::Store(format!(
                "GET s3://{}/{} failed with status {}",
                self.bucket, key, status
            ))),
        }
    }

    fn describe(&self) -> String {
        format!("s3://{}", self.bucket)
    }
}
