mod common;

use chrono::{TimeZone, Utc};
use common::{attrs, write_mock_dataset};
use ndarray::{Array1, Array2};
use serde_json::json;
use stacgen::store::LocalStore;
use stacgen::zarr_io::{Compressor, ZarrSource};
use stacgen::{open_zarr, StacGenError, StoreSettings, ZarrWriter};
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn write_json(path: &Path, value: serde_json::Value) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, value.to_string()).unwrap();
}

fn i64_chunk(values: &[i64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

#[tokio::test]
async fn test_read_zlib_compressed_store() {
    let dir = tempdir().unwrap();
    write_mock_dataset(dir.path(), Compressor::Zlib, true);

    let dataset = open_zarr(Arc::new(LocalStore::new(dir.path()))).await.unwrap();
    let lon = dataset.read_values("lon").await.unwrap();
    assert_eq!(lon.len(), 10);
    assert_eq!(lon[0], -180.0);
    assert_eq!(lon[9], 180.0);
    assert_eq!(dataset.value_range("var2").await.unwrap(), (100.0, 199.0));
}

#[tokio::test]
async fn test_read_blosc_compressed_store() {
    let dir = tempdir().unwrap();
    write_mock_dataset(dir.path(), Compressor::Blosc, true);

    let dataset = open_zarr(Arc::new(LocalStore::new(dir.path()))).await.unwrap();
    assert_eq!(dataset.value_range("lon").await.unwrap(), (-180.0, 180.0));
    assert_eq!(dataset.value_range("lat").await.unwrap(), (-90.0, 90.0));
    assert_eq!(dataset.value_range("var1").await.unwrap(), (0.0, 99.0));
    let (start, end) = dataset.time_range("time").await.unwrap();
    assert_eq!(start, Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());
    assert_eq!(end, Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap());
}

#[tokio::test]
async fn test_nested_chunk_keys() {
    let dir = tempdir().unwrap();
    let mut writer = ZarrWriter::create(dir.path()).unwrap().with_nested_chunks();
    let grid = Array2::from_shape_fn((3, 4), |(y, x)| (y * 4 + x) as f64).into_dyn();
    writer
        .write_array("sst", &["y", "x"], &grid, Some(vec![2, 2]), Default::default())
        .unwrap();
    writer.consolidate().unwrap();
    assert!(dir.path().join("sst").join("1").join("1").is_file());

    let dataset = open_zarr(Arc::new(LocalStore::new(dir.path()))).await.unwrap();
    assert_eq!(dataset.value_range("sst").await.unwrap(), (0.0, 11.0));
    assert_eq!(dataset.read_values("sst").await.unwrap().len(), 12);
}

#[tokio::test]
async fn test_fortran_order_edge_chunks() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write_json(&root.join(".zgroup"), json!({"zarr_format": 2}));
    write_json(
        &root.join("a").join(".zarray"),
        json!({
            "shape": [3, 3], "chunks": [2, 2], "dtype": "<i8", "order": "F",
            "compressor": null, "fill_value": null, "filters": null, "zarr_format": 2
        }),
    );
    write_json(&root.join("a").join(".zattrs"), json!({"_ARRAY_DIMENSIONS": ["y", "x"]}));

    // a[y][x] = 10 * y + x, column-major chunks, -1 past the array edge
    for (key, values) in [
        ("0.0", [0, 10, 1, 11]),
        ("0.1", [2, 12, -1, -1]),
        ("1.0", [20, -1, 21, -1]),
        ("1.1", [22, -1, -1, -1]),
    ] {
        std::fs::write(root.join("a").join(key), i64_chunk(&values)).unwrap();
    }

    let dataset = open_zarr(Arc::new(LocalStore::new(root))).await.unwrap();
    let values = dataset.read_values("a").await.unwrap().to_vec();
    assert_eq!(values, vec![0.0, 1.0, 10.0, 11.0, 2.0, 12.0, 20.0, 21.0, 22.0]);
}

#[tokio::test]
async fn test_unsupported_compressor_is_reported() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write_json(&root.join(".zgroup"), json!({"zarr_format": 2}));
    write_json(
        &root.join("lon").join(".zarray"),
        json!({
            "shape": [2], "chunks": [2], "dtype": "<f8", "order": "C",
            "compressor": {"id": "lzma", "preset": 6}, "fill_value": "NaN",
            "filters": null, "zarr_format": 2
        }),
    );
    write_json(&root.join("lon").join(".zattrs"), json!({"_ARRAY_DIMENSIONS": ["lon"]}));
    std::fs::write(root.join("lon").join("0"), [0u8; 16]).unwrap();

    let dataset = open_zarr(Arc::new(LocalStore::new(root))).await.unwrap();
    let err = dataset.value_range("lon").await.unwrap_err();
    assert!(matches!(err, StacGenError::UnsupportedCompressor(ref id) if id == "lzma"));
}

#[tokio::test]
async fn test_read_unconsolidated_gzip_store() {
    let dir = tempdir().unwrap();
    write_mock_dataset(dir.path(), Compressor::Gzip, false);
    assert!(!dir.path().join(".zmetadata").exists());

    let dataset = open_zarr(Arc::new(LocalStore::new(dir.path()))).await.unwrap();
    let coords: Vec<_> = dataset.coords().keys().cloned().collect();
    assert_eq!(coords, vec!["lat", "lon", "time"]);
    assert_eq!(dataset.attr_str("description"), Some("Mock dataset for testing."));
    assert_eq!(dataset.value_range("lat").await.unwrap(), (-90.0, 90.0));
}

#[tokio::test]
async fn test_cf_encoded_time_and_fill_values() {
    let dir = tempdir().unwrap();
    let mut writer = ZarrWriter::create(dir.path()).unwrap();
    writer
        .write_array(
            "time",
            &["time"],
            &Array1::from(vec![0i32, 31, 59]).into_dyn(),
            None,
            attrs(json!({"units": "days since 2020-01-01", "calendar": "proleptic_gregorian"})),
        )
        .unwrap();
    let grid = Array2::from_shape_vec((2, 2), vec![1.0, f64::NAN, -3.5, 8.0])
        .unwrap()
        .into_dyn();
    writer
        .write_array("sst", &["y", "x"], &grid, Some(vec![1, 2]), attrs(json!({"scale_factor": 2.0})))
        .unwrap();
    writer.consolidate().unwrap();

    let dataset = open_zarr(Arc::new(LocalStore::new(dir.path()))).await.unwrap();
    let (start, end) = dataset.time_range("time").await.unwrap();
    assert_eq!(start, Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
    assert_eq!(end, Utc.with_ymd_and_hms(2020, 2, 29, 0, 0, 0).unwrap());

    assert_eq!(dataset.value_range("sst").await.unwrap(), (-7.0, 16.0));
}

#[tokio::test]
async fn test_open_missing_group_fails() {
    let dir = tempdir().unwrap();
    let err = open_zarr(Arc::new(LocalStore::new(dir.path()))).await.unwrap_err();
    assert!(err.to_string().contains("No Zarr group found"));
}

#[test]
fn test_zarr_source_parsing() {
    assert_eq!(
        ZarrSource::from_path_str("s3://deep-esdl-public/cube.zarr/").unwrap(),
        ZarrSource::S3 {
            bucket: "deep-esdl-public".to_string(),
            prefix: "cube.zarr".to_string()
        }
    );
    assert!(matches!(
        ZarrSource::from_path_str("/data/cube.zarr").unwrap(),
        ZarrSource::Local(_)
    ));
    assert!(ZarrSource::from_path_str("gs://bucket/cube.zarr").is_err());

    let missing = ZarrSource::Local("/nonexistent/cube.zarr".into());
    assert!(missing.into_store(&StoreSettings::default()).is_err());
}
