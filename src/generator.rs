//! Open Science Catalog record generation
//!
//! [`DatasetStacGenerator`] turns an opened dataset into an OSC product
//! collection and one catalog per variable, linked the way the catalog
//! repository lays them out (`products/<id>/collection.json`,
//! `variables/<var>/catalog.json`).

use crate::config::DatasetConfig;
use crate::data_source::{open_dataset_with_fallback, DataStoreFactory, S3StoreFactory, StoreConfig};
use crate::dataset::Dataset;
use crate::errors::Result;
use crate::metadata::{self, GeneralMetadata, VariableMetadata};
use crate::settings::StoreSettings;
use crate::stac::{Catalog, Collection, Extent, Link, Links, SpatialExtent, TemporalExtent};
use crate::utils::write_json;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value as JsonValue};
use std::path::{Path, PathBuf};
use tracing::info;

pub const OSC_EXTENSION: &str = "https://stac-extensions.github.io/osc/v1.0.0/schema.json";
pub const THEMES_EXTENSION: &str = "https://stac-extensions.github.io/themes/v1.0.0/schema.json";
pub const CF_EXTENSION: &str = "https://stac-extensions.github.io/cf/v0.2.0/schema.json";

pub const OSC_THEME_SCHEME: &str = "https://github.com/stac-extensions/osc#theme";
pub const OSC_PROJECT: &str = "deep-earth-system-data-lab";
pub const DEFAULT_CATALOG_BASE_URL: &str =
    "https://esa-earthcode.github.io/open-science-catalog-metadata";

const HTML_MEDIA_TYPE: &str = "text/html";

/// Publication details that do not come from the dataset itself
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorOptions {
    pub collection_id: String,
    pub access_link: Option<String>,
    pub documentation_link: Option<String>,
    pub osc_status: Option<String>,
    pub osc_region: Option<String>,
    pub osc_themes: Vec<String>,
    pub osc_missions: Vec<String>,
    pub catalog_base_url: String,
}

impl GeneratorOptions {
    pub fn new(collection_id: impl Into<String>) -> Self {
        Self {
            collection_id: collection_id.into(),
            access_link: None,
            documentation_link: None,
            osc_status: None,
            osc_region: None,
            osc_themes: Vec::new(),
            osc_missions: Vec::new(),
            catalog_base_url: DEFAULT_CATALOG_BASE_URL.to_string(),
        }
    }
}

impl From<&DatasetConfig> for GeneratorOptions {
    fn from(config: &DatasetConfig) -> Self {
        Self {
            collection_id: config.collection_id.clone(),
            access_link: config.access_link.clone(),
            documentation_link: config.documentation_link.clone(),
            osc_status: config.dataset_status.clone(),
            osc_region: config.osc_region.clone(),
            osc_themes: config.osc_themes.clone(),
            osc_missions: config.osc_missions.clone(),
            catalog_base_url: DEFAULT_CATALOG_BASE_URL.to_string(),
        }
    }
}

/// Collection plus variable catalogs built for one dataset
#[derive(Debug, Clone)]
pub struct GeneratedRecords {
    pub collection: Collection,
    pub variable_catalogs: Vec<Catalog>,
}

impl GeneratedRecords {
    /// Write every record below `out_dir`, returning the written paths
    pub fn write_all(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.variable_catalogs.len() + 1);

        let path = out_dir
            .join("products")
            .join(&self.collection.id)
            .join("collection.json");
        write_json(&path, &self.collection)?;
        written.push(path);

        for catalog in &self.variable_catalogs {
            let path = out_dir.join("variables").join(&catalog.id).join("catalog.json");
            write_json(&path, catalog)?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Builds OSC STAC records from a dataset
#[derive(Debug, Clone)]
pub struct DatasetStacGenerator {
    dataset_id: String,
    options: GeneratorOptions,
    dataset: Dataset,
}

impl DatasetStacGenerator {
    pub fn new(dataset_id: impl Into<String>, dataset: Dataset, options: GeneratorOptions) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            options,
            dataset,
        }
    }

    /// Open `dataset_id` through the given store configurations
    pub async fn open(
        dataset_id: &str,
        options: GeneratorOptions,
        factory: &dyn DataStoreFactory,
        configs: &[StoreConfig],
    ) -> Result<Self> {
        let dataset = open_dataset_with_fallback(factory, configs, dataset_id).await?;
        Ok(Self::new(dataset_id, dataset, options))
    }

    /// Open `dataset_id` from the public bucket, falling back to the
    /// authenticated user bucket
    pub async fn open_default(dataset_id: &str, options: GeneratorOptions) -> Result<Self> {
        let settings = StoreSettings::from_env();
        let configs = StoreConfig::default_chain(&settings);
        Self::open(dataset_id, options, &S3StoreFactory::new(settings), &configs).await
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    pub async fn spatial_extent(&self) -> Result<SpatialExtent> {
        metadata::spatial_extent(&self.dataset).await
    }

    pub async fn temporal_extent(&self) -> Result<TemporalExtent> {
        metadata::temporal_extent(&self.dataset).await
    }

    pub fn variable_ids(&self) -> Vec<String> {
        metadata::variable_ids(&self.dataset)
    }

    pub fn general_metadata(&self) -> GeneralMetadata {
        metadata::general_metadata(&self.dataset)
    }

    pub fn variables_metadata(&self) -> Result<Vec<VariableMetadata>> {
        self.variable_ids()
            .iter()
            .map(|id| metadata::variable_metadata(&self.dataset, id))
            .collect()
    }

    fn themes_field(&self) -> JsonValue {
        let concepts: Vec<JsonValue> = self
            .options
            .osc_themes
            .iter()
            .map(|theme| json!({ "id": theme }))
            .collect();
        json!([{ "scheme": OSC_THEME_SCHEME, "concepts": concepts }])
    }

    fn href(&self, kind: &str, id: &str, file: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.options.catalog_base_url.trim_end_matches('/'),
            kind,
            id,
            file
        )
    }

    /// The OSC product collection for this dataset
    pub async fn build_dataset_stac_collection(&self) -> Result<Collection> {
        self.build_collection_at(Utc::now()).await
    }

    async fn build_collection_at(&self, now: DateTime<Utc>) -> Result<Collection> {
        let extent = Extent {
            spatial: self.spatial_extent().await?,
            temporal: self.temporal_extent().await?,
        };
        let variables = self.variables_metadata()?;
        let variable_ids: Vec<&str> = variables.iter().map(|v| v.variable_id.as_str()).collect();
        let opts = &self.options;

        let mut collection = Collection::new(
            &opts.collection_id,
            self.general_metadata().description,
            extent,
        );
        collection.title = Some(
            self.dataset
                .attr_str("title")
                .map(str::to_string)
                .unwrap_or_else(|| metadata::format_string(&opts.collection_id)),
        );
        collection.stac_extensions = vec![
            OSC_EXTENSION.to_string(),
            THEMES_EXTENSION.to_string(),
            CF_EXTENSION.to_string(),
        ];
        collection.keywords = opts.osc_themes.clone();

        let timestamp = now.to_rfc3339_opts(SecondsFormat::Secs, true);
        let cf_parameters: Vec<JsonValue> = variables
            .iter()
            .filter_map(|v| v.standard_name.as_ref())
            .map(|name| json!({ "name": name }))
            .collect();

        let extra = &mut collection.extra_fields;
        extra.insert("osc:project".to_string(), json!(OSC_PROJECT));
        extra.insert("osc:type".to_string(), json!("product"));
        if let Some(status) = &opts.osc_status {
            extra.insert("osc:status".to_string(), json!(status));
        }
        if let Some(region) = &opts.osc_region {
            extra.insert("osc:region".to_string(), json!(region));
        }
        extra.insert("osc:variables".to_string(), json!(variable_ids));
        extra.insert("osc:missions".to_string(), json!(opts.osc_missions));
        extra.insert("themes".to_string(), self.themes_field());
        extra.insert("cf:parameter".to_string(), JsonValue::Array(cf_parameters));
        extra.insert("created".to_string(), json!(timestamp));
        extra.insert("updated".to_string(), json!(timestamp));

        collection.add_link(
            Link::new("root", "../../catalog.json")
                .json()
                .with_title("Open Science Catalog"),
        );
        collection.add_link(Link::new("parent", "../catalog.json").json().with_title("Products"));
        for var in &variables {
            collection.add_link(
                Link::new("related", format!("../../variables/{}/catalog.json", var.variable_id))
                    .json()
                    .with_title(format!("Variable: {}", var.title)),
            );
        }
        for theme in &opts.osc_themes {
            collection.add_link(
                Link::new("related", format!("../../themes/{}/catalog.json", theme))
                    .json()
                    .with_title(format!("Theme: {}", metadata::format_string(theme))),
            );
        }
        if let Some(access) = &opts.access_link {
            collection.add_link(Link::new("via", access).with_title("Access"));
        }
        if let Some(docs) = &opts.documentation_link {
            collection.add_link(
                Link::new("via", docs)
                    .with_type(HTML_MEDIA_TYPE)
                    .with_title("Documentation"),
            );
        }
        collection.set_self_href(&self.href("products", &opts.collection_id, "collection.json"));

        info!(
            "Built collection '{}' with {} variable(s)",
            collection.id,
            variables.len()
        );
        Ok(collection)
    }

    /// The OSC variable catalog for one data variable
    pub fn build_variable_catalog(&self, var: &VariableMetadata) -> Catalog {
        self.build_variable_catalog_at(var, Utc::now())
    }

    fn build_variable_catalog_at(&self, var: &VariableMetadata, now: DateTime<Utc>) -> Catalog {
        let mut catalog = Catalog::new(&var.variable_id, &var.description);
        catalog.title = Some(var.title.clone());
        catalog.stac_extensions = vec![THEMES_EXTENSION.to_string()];
        catalog
            .extra_fields
            .insert("themes".to_string(), self.themes_field());
        catalog.extra_fields.insert(
            "updated".to_string(),
            json!(now.to_rfc3339_opts(SecondsFormat::Secs, true)),
        );

        catalog.add_link(
            Link::new("root", "../../catalog.json")
                .json()
                .with_title("Open Science Catalog"),
        );
        catalog.add_link(Link::new("parent", "../catalog.json").json().with_title("Variables"));
        catalog.add_link(
            Link::new(
                "related",
                format!("../../products/{}/collection.json", self.options.collection_id),
            )
            .json()
            .with_title(metadata::format_string(&self.options.collection_id)),
        );
        if let Some(url) = &var.gcmd_keyword_url {
            catalog.add_link(
                Link::new("via", url)
                    .with_type(HTML_MEDIA_TYPE)
                    .with_title("Description"),
            );
        }
        catalog.set_self_href(&self.href("variables", &var.variable_id, "catalog.json"));
        catalog
    }

    /// Collection and all variable catalogs
    pub async fn build_all(&self) -> Result<GeneratedRecords> {
        let now = Utc::now();
        let collection = self.build_collection_at(now).await?;
        let variable_catalogs = self
            .variables_metadata()?
            .iter()
            .map(|var| self.build_variable_catalog_at(var, now))
            .collect();
        Ok(GeneratedRecords {
            collection,
            variable_catalogs,
        })
    }
}
