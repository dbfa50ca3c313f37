//! Mock dataset fixtures shared by the integration tests

#![allow(dead_code)]

use ndarray::{Array1, Array3, ArrayD};
use serde_json::{json, Map, Value as JsonValue};
use stacgen::zarr_io::{Compressor, ZarrWriter};
use std::path::Path;

/// 2023-01-01T00:00:00Z and 2023-01-02T00:00:00Z in nanoseconds
pub const MOCK_TIMES_NS: [i64; 2] = [1_672_531_200_000_000_000, 1_672_617_600_000_000_000];

pub fn attrs(value: JsonValue) -> Map<String, JsonValue> {
    value.as_object().cloned().unwrap_or_default()
}

/// Writes the mock dataset: 10 longitudes over [-180, 180], 5 latitudes
/// over [-90, 90], two daily time steps and two data variables.
pub fn write_mock_dataset(root: &Path, compressor: Compressor, consolidate: bool) -> ZarrWriter {
    let mut writer = ZarrWriter::create(root).unwrap().with_compressor(compressor);
    writer
        .write_group_attrs(attrs(json!({
            "description": "Mock dataset for testing.",
            "title": "Mock Dataset"
        })))
        .unwrap();

    let lon = Array1::linspace(-180.0, 180.0, 10).into_dyn();
    let lat = Array1::linspace(-90.0, 90.0, 5).into_dyn();
    writer
        .write_array("lon", &["lon"], &lon, Some(vec![4]), attrs(json!({"units": "degrees_east"})))
        .unwrap();
    writer
        .write_array("lat", &["lat"], &lat, None, attrs(json!({"units": "degrees_north"})))
        .unwrap();
    writer
        .write_datetime64_ns(
            "time",
            &["time"],
            &Array1::from(MOCK_TIMES_NS.to_vec()).into_dyn(),
            Map::new(),
        )
        .unwrap();

    let dims = ["time", "lat", "lon"];
    for (name, offset) in [("var1", 0.0), ("var2", 100.0)] {
        let data: ArrayD<f64> =
            Array3::from_shape_fn((2, 5, 10), |(t, y, x)| offset + (t * 50 + y * 10 + x) as f64)
                .into_dyn();
        writer
            .write_array(
                name,
                &dims,
                &data,
                Some(vec![1, 5, 5]),
                attrs(json!({
                    "description": format!("dummy {}", name),
                    "standard_name": format!("{}_standard", name),
                    "gcmd_keyword_url": format!("https://gcmd.nasa.gov/{}", name),
                    "units": "K"
                })),
            )
            .unwrap();
    }

    if consolidate {
        writer.consolidate().unwrap();
    }
    writer
}

/// Writes a group whose spatial coordinates `x`/`y` hold no values
pub fn write_empty_xy_dataset(root: &Path) {
    let mut writer = ZarrWriter::create(root).unwrap();
    let empty = Array1::<f64>::zeros(0).into_dyn();
    writer.write_array("x", &["x"], &empty, None, Map::new()).unwrap();
    writer.write_array("y", &["y"], &empty, None, Map::new()).unwrap();
    writer
        .write_datetime64_ns(
            "time",
            &["time"],
            &Array1::from(MOCK_TIMES_NS.to_vec()).into_dyn(),
            Map::new(),
        )
        .unwrap();
    writer.consolidate().unwrap();
}
