//! Defines command-line interface options using `clap` for the stacgen application.

use clap::{Args as ClapArgs, Parser, Subcommand};
use stacgen::settings::{
    DEFAULT_PUBLIC_BUCKET, DEFAULT_S3_ENDPOINT, DEFAULT_S3_REGION, ENV_PUBLIC_BUCKET,
    ENV_S3_ENDPOINT, ENV_S3_REGION,
};
use stacgen::{StoreSettings, ZarrSource};
use std::path::PathBuf;

/// A CLI tool for describing Zarr datasets as STAC records
#[derive(Parser, Debug)]
#[command(
    version,
    name = "stacgen",
    about = "Build Open Science Catalog STAC records from Zarr datasets"
)]
pub struct Args {
    /// Enable verbose output.
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// S3 endpoint settings shared by all subcommands
#[derive(ClapArgs, Debug, Clone)]
pub struct StoreArgs {
    /// S3 endpoint URL
    #[arg(long, global = true, env = ENV_S3_ENDPOINT, default_value = DEFAULT_S3_ENDPOINT)]
    pub s3_endpoint: String,

    /// S3 region used for request signing
    #[arg(long, global = true, env = ENV_S3_REGION, default_value = DEFAULT_S3_REGION)]
    pub s3_region: String,

    /// Bucket tried first, anonymously
    #[arg(long, global = true, env = ENV_PUBLIC_BUCKET, default_value = DEFAULT_PUBLIC_BUCKET)]
    pub public_bucket: String,
}

impl From<&StoreArgs> for StoreSettings {
    fn from(args: &StoreArgs) -> Self {
        StoreSettings {
            endpoint: args.s3_endpoint.clone(),
            region: args.s3_region.clone(),
            public_bucket: args.public_bucket.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write dataset-config.yaml and workflow-config.yaml templates
    GenerateConfig {
        /// Directory receiving the templates
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Report values still holding [PLACEHOLDER] markers
    CheckConfig {
        /// Dataset configuration file
        #[arg(long)]
        dataset_config: Option<PathBuf>,

        /// Workflow configuration file
        #[arg(long)]
        workflow_config: Option<PathBuf>,
    },

    /// Print attributes, coordinates and variables of a Zarr store
    Inspect {
        /// Local path or s3://bucket/prefix of the Zarr group
        #[arg(value_parser = parse_store_arg)]
        store: ZarrSource,
    },

    /// Build the product collection and variable catalogs for a dataset
    BuildCollection {
        /// Dataset configuration file
        #[arg(long)]
        dataset_config: PathBuf,

        /// Read the dataset from this local path or s3://bucket/prefix
        /// instead of the public/authenticated bucket fallback
        #[arg(long, value_parser = parse_store_arg)]
        store: Option<ZarrSource>,

        /// Directory receiving products/ and variables/
        #[arg(short, long, default_value = "stac")]
        output_dir: PathBuf,

        /// Base URL used for self links
        #[arg(long)]
        catalog_base_url: Option<String>,
    },
}

fn parse_store_arg(s: &str) -> Result<ZarrSource, String> {
    ZarrSource::from_path_str(s).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_build_collection() {
        let args = Args::try_parse_from([
            "stacgen",
            "build-collection",
            "--dataset-config",
            "dataset-config.yaml",
            "--store",
            "s3://bucket/cube.zarr",
            "-v",
        ])
        .unwrap();
        assert!(args.verbose);
        match args.command {
            Command::BuildCollection { store, output_dir, .. } => {
                assert_eq!(
                    store,
                    Some(ZarrSource::S3 {
                        bucket: "bucket".to_string(),
                        prefix: "cube.zarr".to_string()
                    })
                );
                assert_eq!(output_dir, PathBuf::from("stac"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_store_scheme() {
        assert!(Args::try_parse_from(["stacgen", "inspect", "gs://bucket/cube.zarr"]).is_err());
    }
}
