//! Dataset and workflow configuration files
//!
//! Both are YAML documents whose keys match what
//! [`crate::templates::TemplateGenerator`] emits.

use crate::errors::{Result, StacGenError};
use crate::templates::find_placeholders;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Describes the dataset to publish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub dataset_id: String,
    pub collection_id: String,
    #[serde(default)]
    pub osc_themes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub osc_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_link: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub osc_missions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelInfo {
    pub name: String,
    pub python_version: String,
    pub env_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowProperties {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub themes: Vec<String>,
    pub license: String,
    pub jupyter_kernel_info: KernelInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactLink {
    pub rel: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub organization: String,
    #[serde(default)]
    pub links: Vec<ContactLink>,
}

/// Describes the workflow (notebook) that produced a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub workflow_id: String,
    pub properties: WorkflowProperties,
    pub jupyter_notebook_url: String,
    #[serde(default)]
    pub contact: Vec<Contact>,
}

/// Load a YAML config file into `T`
pub fn load_yaml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        StacGenError::Config(format!("Cannot read {}: {}", path.display(), e))
    })?;
    Ok(serde_yaml::from_str(&text)?)
}

/// Paths of values still holding `[PLACEHOLDER]` markers
pub fn unreplaced_placeholders<T: Serialize>(config: &T) -> Result<Vec<String>> {
    Ok(find_placeholders(&serde_yaml::to_value(config)?))
}

impl DatasetConfig {
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        load_yaml(path)
    }

    /// Reject configs that are empty or still carry template placeholders
    pub fn validate(&self) -> Result<()> {
        if self.dataset_id.trim().is_empty() || self.collection_id.trim().is_empty() {
            return Err(StacGenError::Config(
                "dataset_id and collection_id must not be empty".to_string(),
            ));
        }
        let placeholders = unreplaced_placeholders(self)?;
        if !placeholders.is_empty() {
            return Err(StacGenError::Config(format!(
                "Unreplaced placeholders in: {}",
                placeholders.join(", ")
            )));
        }
        Ok(())
    }
}

impl WorkflowConfig {
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        load_yaml(path)
    }
}
