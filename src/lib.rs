//! stacgen: STAC records for Zarr datasets
//!
//! A Rust library for describing Zarr v2 datasets as Open Science Catalog
//! STAC records. stacgen opens a dataset from object storage (trying a public
//! bucket anonymously, then an authenticated one), extracts its spatial and
//! temporal extent along with per-variable metadata, and builds a product
//! collection plus one catalog per variable.
//!
//! ## Key Features
//!
//! - **Zarr Reading**: Consolidated and unconsolidated v2 groups decoded with `zarrs`
//! - **Object Storage**: Local directories and S3 with optional SigV4 signing
//! - **Store Fallback**: Ordered store configurations with per-attempt logging
//! - **STAC Records**: Collections and catalogs with OSC, themes and CF fields
//! - **Config Templates**: Placeholder YAML for dataset and workflow configs
//!
//! ## Module Organization
//!
//! - [`store`]: Object store abstraction with local and S3 backends
//! - [`zarr_io`]: Zarr metadata parsing, chunk reading and a small writer
//! - [`dataset`]: Opened Zarr groups with coordinates and data variables
//! - [`data_source`]: Store configurations and the fallback opener
//! - [`metadata`]: Extents and variable metadata extraction
//! - [`stac`]: STAC collection, catalog and link types
//! - [`generator`]: Builds the collection and variable catalogs
//! - [`config`] and [`templates`]: YAML configuration files
//! - [`errors`]: Centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use stacgen::prelude::*;
//!
//! # async fn run() -> stacgen::Result<()> {
//! let options = GeneratorOptions::new("my-cube");
//! let generator = DatasetStacGenerator::open_default("cube.zarr", options).await?;
//! let records = generator.build_all().await?;
//! records.write_all(std::path::Path::new("stac"))?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data_source;
pub mod dataset;
pub mod errors;
pub mod generator;
pub mod metadata;
pub mod settings;
pub mod stac;
pub mod store;
pub mod templates;
pub mod times;
pub mod utils;
pub mod zarr_io;

pub use data_source::{open_dataset_with_fallback, DataStoreFactory, S3StoreFactory, StoreConfig};
pub use dataset::Dataset;
pub use errors::{Result, StacGenError};
pub use generator::{DatasetStacGenerator, GeneratedRecords, GeneratorOptions};
pub use settings::StoreSettings;
pub use zarr_io::{open_zarr, ZarrReader, ZarrSource, ZarrWriter};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::config::{DatasetConfig, WorkflowConfig};
    pub use crate::data_source::{DataStoreFactory, S3StoreFactory, StoreConfig};
    pub use crate::dataset::Dataset;
    pub use crate::errors::{Result, StacGenError};
    pub use crate::generator::{DatasetStacGenerator, GeneratorOptions};
    pub use crate::settings::StoreSettings;
    pub use crate::stac::{Catalog, Collection, Link, Links};
    pub use crate::store::{LocalStore, ObjectStore, S3Store};
    pub use crate::zarr_io::{ArrayMetadata, ZarrReader, ZarrSource, ZarrWriter};
}
