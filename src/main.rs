//! Entry point for the stacgen application.
//! Handles CLI parsing and logging setup, and dispatches template generation,
//! config checks, store inspection and collection building.

use clap::Parser;
use stacgen::config::{unreplaced_placeholders, DatasetConfig, WorkflowConfig};
use stacgen::data_source::{S3StoreFactory, StoreConfig};
use stacgen::generator::{DatasetStacGenerator, GeneratorOptions};
use stacgen::metadata::{self, print_metadata};
use stacgen::templates::TemplateGenerator;
use stacgen::{open_zarr, StacGenError, StoreSettings, ZarrSource};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Args, Command};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);
    let settings = StoreSettings::from(&args.store);

    match args.command {
        Command::GenerateConfig { output_dir } => generate_config(&output_dir)?,
        Command::CheckConfig {
            dataset_config,
            workflow_config,
        } => check_config(dataset_config.as_deref(), workflow_config.as_deref())?,
        Command::Inspect { store } => inspect(store, &settings).await?,
        Command::BuildCollection {
            dataset_config,
            store,
            output_dir,
            catalog_base_url,
        } => {
            build_collection(
                &dataset_config,
                store,
                &output_dir,
                catalog_base_url,
                &settings,
            )
            .await?
        }
    }

    Ok(())
}

fn generate_config(output_dir: &Path) -> stacgen::Result<()> {
    let dataset = output_dir.join("dataset-config.yaml");
    let workflow = output_dir.join("workflow-config.yaml");
    TemplateGenerator::generate_dataset_template(Some(&dataset))?;
    TemplateGenerator::generate_workflow_template(Some(&workflow))?;
    println!("✅ Wrote {}", dataset.display());
    println!("✅ Wrote {}", workflow.display());
    Ok(())
}

fn check_config(dataset: Option<&Path>, workflow: Option<&Path>) -> stacgen::Result<()> {
    if dataset.is_none() && workflow.is_none() {
        return Err(StacGenError::Config(
            "Pass --dataset-config and/or --workflow-config".to_string(),
        ));
    }

    let mut pending = Vec::new();
    if let Some(path) = dataset {
        let found = unreplaced_placeholders(&DatasetConfig::from_yaml_file(path)?)?;
        pending.extend(found.into_iter().map(|p| format!("{}: {}", path.display(), p)));
    }
    if let Some(path) = workflow {
        let found = unreplaced_placeholders(&WorkflowConfig::from_yaml_file(path)?)?;
        pending.extend(found.into_iter().map(|p| format!("{}: {}", path.display(), p)));
    }

    if pending.is_empty() {
        println!("✅ No placeholders left");
        return Ok(());
    }
    for entry in &pending {
        println!("- {}", entry);
    }
    Err(StacGenError::Config(format!(
        "{} placeholder value(s) still need replacing",
        pending.len()
    )))
}

async fn inspect(source: ZarrSource, settings: &StoreSettings) -> stacgen::Result<()> {
    let dataset = open_zarr(source.into_store(settings)?).await?;
    print_metadata(&dataset);

    println!("\n===== Extent =====");
    match metadata::spatial_extent(&dataset).await {
        Ok(extent) => println!("- bbox: {:?}", extent.bbox[0]),
        Err(e) => warn!("No spatial extent: {}", e),
    }
    match metadata::temporal_extent(&dataset).await {
        Ok(extent) => {
            let [start, end] = extent.interval[0];
            println!("- interval: {:?} .. {:?}", start, end);
        }
        Err(e) => warn!("No temporal extent: {}", e),
    }
    Ok(())
}

async fn build_collection(
    config_path: &Path,
    store: Option<ZarrSource>,
    output_dir: &Path,
    catalog_base_url: Option<String>,
    settings: &StoreSettings,
) -> stacgen::Result<()> {
    let config = DatasetConfig::from_yaml_file(config_path)?;
    config.validate()?;

    let mut options = GeneratorOptions::from(&config);
    if let Some(base) = catalog_base_url {
        options.catalog_base_url = base;
    }

    let generator = match store {
        Some(source) => {
            if options.access_link.is_none() {
                if let ZarrSource::S3 { bucket, prefix } = &source {
                    options.access_link = Some(format!("s3://{}/{}", bucket, prefix));
                }
            }
            let dataset = open_zarr(source.into_store(settings)?).await?;
            DatasetStacGenerator::new(&config.dataset_id, dataset, options)
        }
        None => {
            if options.access_link.is_none() {
                options.access_link =
                    Some(format!("s3://{}/{}", settings.public_bucket, config.dataset_id));
            }
            let configs = StoreConfig::default_chain(settings);
            let factory = S3StoreFactory::new(settings.clone());
            DatasetStacGenerator::open(&config.dataset_id, options, &factory, &configs).await?
        }
    };

    let records = generator.build_all().await?;
    for path in records.write_all(output_dir)? {
        info!("Wrote {}", path.display());
        println!("✅ {}", path.display());
    }
    Ok(())
}
