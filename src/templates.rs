//! Placeholder configuration templates
//!
//! Emits dataset and workflow configuration files in which every value is a
//! `[PLACEHOLDER]` for the user to replace.

use crate::config::{
    Contact, ContactLink, DatasetConfig, KernelInfo, WorkflowConfig, WorkflowProperties,
};
use crate::errors::Result;
use serde::Serialize;
use serde_yaml::Value as YamlValue;
use std::path::Path;
use tracing::info;

const REPLACE_NOTICE: &str = "# Replace all [PLACEHOLDER] values with your actual data";

fn placeholder(name: &str) -> String {
    format!("[{}]", name)
}

pub struct TemplateGenerator;

impl TemplateGenerator {
    pub fn workflow_template() -> WorkflowConfig {
        WorkflowConfig {
            workflow_id: placeholder("WORKFLOW_ID"),
            properties: WorkflowProperties {
                title: placeholder("TITLE"),
                description: placeholder("DESCRIPTION"),
                keywords: vec![placeholder("KEYWORD1"), placeholder("KEYWORD2")],
                themes: vec![placeholder("THEME1"), placeholder("THEME2")],
                license: placeholder("LICENSE_TYPE"),
                jupyter_kernel_info: KernelInfo {
                    name: placeholder("DEEPESDL_KERNEL_NAME"),
                    python_version: placeholder("PYTHON_VERSION"),
                    env_file: placeholder("ENV_FILE_URL_IN_GIT"),
                },
            },
            jupyter_notebook_url: placeholder("NOTEBOOK_URL"),
            contact: vec![Contact {
                name: placeholder("CONTACT_NAME"),
                organization: placeholder("ORGANIZATION"),
                links: vec![ContactLink {
                    rel: "about".to_string(),
                    media_type: "text/html".to_string(),
                    href: placeholder("ORGANIZATION_URL"),
                }],
            }],
        }
    }

    pub fn dataset_template() -> DatasetConfig {
        DatasetConfig {
            dataset_id: format!("{}.zarr", placeholder("DATASET_ID")),
            collection_id: placeholder("COLLECTION_ID"),
            osc_themes: vec![placeholder("THEME1"), placeholder("THEME2")],
            osc_region: Some(placeholder("REGION")),
            dataset_status: Some(placeholder("STATUS")),
            documentation_link: Some(placeholder("DOCS_URL")),
            access_link: None,
            osc_missions: Vec::new(),
        }
    }

    /// Workflow template as YAML, also written to `output_path` when given
    pub fn generate_workflow_template(output_path: Option<&Path>) -> Result<String> {
        render(
            &Self::workflow_template(),
            "# Complete Workflow Configuration Template",
            output_path,
        )
    }

    /// Dataset template as YAML, also written to `output_path` when given
    pub fn generate_dataset_template(output_path: Option<&Path>) -> Result<String> {
        render(
            &Self::dataset_template(),
            "# Complete Dataset Configuration Template",
            output_path,
        )
    }
}

fn render<T: Serialize>(template: &T, title: &str, output_path: Option<&Path>) -> Result<String> {
    let yaml = serde_yaml::to_string(template)?;
    if let Some(path) = output_path {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, format!("{}\n{}\n\n{}", title, REPLACE_NOTICE, yaml))?;
        info!("Wrote template {}", path.display());
    }
    Ok(yaml)
}

/// True when `s` contains a `[UPPER_CASE]` marker
pub fn contains_placeholder(s: &str) -> bool {
    s.match_indices('[').any(|(start, _)| {
        let rest = &s[start + 1..];
        match rest.find(']') {
            Some(end) => {
                let inner = &rest[..end];
                inner.chars().any(|c| c.is_ascii_uppercase())
                    && inner
                        .chars()
                        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
            }
            None => false,
        }
    })
}

/// Dotted paths (`properties.title`, `contact[0].links[0].href`) of every
/// string value that still holds a placeholder marker
pub fn find_placeholders(value: &YamlValue) -> Vec<String> {
    let mut found = Vec::new();
    collect_placeholders(value, String::new(), &mut found);
    found
}

fn collect_placeholders(value: &YamlValue, path: String, found: &mut Vec<String>) {
    match value {
        YamlValue::String(s) if contains_placeholder(s) => found.push(path),
        YamlValue::Sequence(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_placeholders(item, format!("{}[{}]", path, i), found);
            }
        }
        YamlValue::Mapping(map) => {
            for (key, item) in map {
                let key = key.as_str().map(str::to_string).unwrap_or_else(|| format!("{:?}", key));
                let child = if path.is_empty() {
                    key
                } else {
                    format!("{}.{}", path, key)
                };
                collect_placeholders(item, child, found);
            }
        }
        YamlValue::Tagged(tagged) => collect_placeholders(&tagged.value, path, found),
        _ => {}
    }
}
