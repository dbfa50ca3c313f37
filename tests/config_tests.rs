use stacgen::config::{unreplaced_placeholders, DatasetConfig, WorkflowConfig};
use stacgen::generator::GeneratorOptions;
use stacgen::templates::TemplateGenerator;
use tempfile::tempdir;

#[test]
fn test_templates_are_written_with_header() {
    let dir = tempdir().unwrap();
    let dataset_path = dir.path().join("configs/dataset-config.yaml");
    let workflow_path = dir.path().join("configs/workflow-config.yaml");

    let yaml = TemplateGenerator::generate_dataset_template(Some(&dataset_path)).unwrap();
    TemplateGenerator::generate_workflow_template(Some(&workflow_path)).unwrap();

    let text = std::fs::read_to_string(&dataset_path).unwrap();
    assert!(text.starts_with(
        "# Complete Dataset Configuration Template\n# Replace all [PLACEHOLDER] values with your actual data\n\n"
    ));
    assert!(text.ends_with(&yaml));

    let workflow = std::fs::read_to_string(&workflow_path).unwrap();
    assert!(workflow.starts_with("# Complete Workflow Configuration Template\n"));
    assert!(workflow.contains("jupyter_kernel_info:"));
}

#[test]
fn test_written_templates_load_back_with_placeholders() {
    let dir = tempdir().unwrap();
    let dataset_path = dir.path().join("dataset-config.yaml");
    let workflow_path = dir.path().join("workflow-config.yaml");
    TemplateGenerator::generate_dataset_template(Some(&dataset_path)).unwrap();
    TemplateGenerator::generate_workflow_template(Some(&workflow_path)).unwrap();

    let dataset = DatasetConfig::from_yaml_file(&dataset_path).unwrap();
    assert_eq!(dataset, TemplateGenerator::dataset_template());
    assert!(dataset.validate().is_err());

    let workflow = WorkflowConfig::from_yaml_file(&workflow_path).unwrap();
    assert_eq!(workflow.contact[0].links[0].media_type, "text/html");
    assert!(!unreplaced_placeholders(&workflow).unwrap().is_empty());
}

#[test]
fn test_filled_dataset_config_to_options() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dataset-config.yaml");
    std::fs::write(
        &path,
        "dataset_id: esa-cci-permafrost-1x1151x1641-1.0.0.zarr\n\
         collection_id: esa-cci-permafrost\n\
         osc_themes:\n  - cryosphere\n\
         osc_region: Northern Hemisphere\n\
         dataset_status: completed\n\
         documentation_link: https://climate.esa.int/en/projects/permafrost/\n",
    )
    .unwrap();

    let config = DatasetConfig::from_yaml_file(&path).unwrap();
    config.validate().unwrap();
    assert!(unreplaced_placeholders(&config).unwrap().is_empty());

    let options = GeneratorOptions::from(&config);
    assert_eq!(options.collection_id, "esa-cci-permafrost");
    assert_eq!(options.osc_status.as_deref(), Some("completed"));
    assert_eq!(options.osc_themes, vec!["cryosphere"]);
    assert!(options.access_link.is_none());
}
