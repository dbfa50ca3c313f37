//! Dataset metadata extraction
//!
//! Functions for pulling extents, variable lists and descriptive attributes
//! out of an opened [`Dataset`], plus a plain-text summary printer.

use crate::dataset::Dataset;
use crate::errors::{Result, StacGenError};
use crate::stac::{SpatialExtent, TemporalExtent};
use serde::Serialize;

/// Coordinate pairs recognised as `(x, y)` axes, checked in order
pub const SPATIAL_COORDINATE_PAIRS: [(&str, &str); 3] =
    [("lon", "lat"), ("longitude", "latitude"), ("x", "y")];

/// Name of the time coordinate
pub const TIME_COORDINATE: &str = "time";

/// Data variables that describe the grid rather than a measured quantity
pub const EXCLUDED_VARIABLES: [&str; 2] = ["crs", "spatial_ref"];

pub const NO_DESCRIPTION: &str = "No description available.";
pub const NO_VARIABLE_DESCRIPTION: &str = "No variable description";

/// Dataset-level descriptive attributes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneralMetadata {
    pub description: String,
}

/// Descriptive attributes of one data variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableMetadata {
    pub variable_id: String,
    pub title: String,
    pub description: String,
    pub dimensions: Vec<String>,
    pub units: Option<String>,
    pub standard_name: Option<String>,
    pub gcmd_keyword_url: Option<String>,
}

/// Bounding box `[xmin, ymin, xmax, ymax]` of the first recognised
/// coordinate pair.
pub async fn spatial_extent(ds: &Dataset) -> Result<SpatialExtent> {
    let (x, y) = SPATIAL_COORDINATE_PAIRS
        .iter()
        .find(|(x, y)| ds.has_coord(x) && ds.has_coord(y))
        .ok_or(StacGenError::MissingSpatialCoordinates)?;

    let (x_min, x_max) = ds.value_range(x).await?;
    let (y_min, y_max) = ds.value_range(y).await?;
    Ok(SpatialExtent {
        bbox: vec![[x_min, y_min, x_max, y_max]],
    })
}

/// Closed interval from the first to the last time step
pub async fn temporal_extent(ds: &Dataset) -> Result<TemporalExtent> {
    if !ds.has_coord(TIME_COORDINATE) {
        return Err(StacGenError::MissingTimeCoordinate);
    }
    let (start, end) = ds.time_range(TIME_COORDINATE).await?;
    Ok(TemporalExtent {
        interval: vec![[Some(start), Some(end)]],
    })
}

/// Data variable names, without grid-mapping variables
pub fn variable_ids(ds: &Dataset) -> Vec<String> {
    ds.data_vars()
        .keys()
        .filter(|name| !EXCLUDED_VARIABLES.contains(&name.as_str()))
        .cloned()
        .collect()
}

pub fn general_metadata(ds: &Dataset) -> GeneralMetadata {
    GeneralMetadata {
        description: ds
            .attr_str("description")
            .unwrap_or(NO_DESCRIPTION)
            .to_string(),
    }
}

/// Turn an identifier such as `surface_temp` into a title (`Surface Temp`).
///
/// Words are separated by runs of underscores and whitespace; each word is
/// capitalized with the rest lowercased.
pub fn format_string(s: &str) -> String {
    s.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Descriptive attributes of `var_id`
pub fn variable_metadata(ds: &Dataset, var_id: &str) -> Result<VariableMetadata> {
    let var = ds
        .data_vars()
        .get(var_id)
        .ok_or_else(|| StacGenError::ArrayNotFound {
            array: var_id.to_string(),
        })?;
    let attr = |key: &str| var.attr_str(key).map(str::to_string);

    Ok(VariableMetadata {
        variable_id: var_id.to_string(),
        title: format_string(var_id),
        description: attr("description")
            .or_else(|| attr("long_name"))
            .unwrap_or_else(|| NO_VARIABLE_DESCRIPTION.to_string()),
        dimensions: var.dimensions.clone(),
        units: attr("units"),
        standard_name: attr("standard_name"),
        gcmd_keyword_url: attr("gcmd_keyword_url"),
    })
}

/// Prints global attributes, coordinates and data variables of a dataset.
pub fn print_metadata(ds: &Dataset) {
    println!("\n===== Global Attributes =====");
    for (key, value) in ds.attrs() {
        println!("- {}: {}", key, value);
    }

    for (heading, arrays) in [("Coordinates", ds.coords()), ("Data Variables", ds.data_vars())] {
        println!("\n===== {} =====", heading);
        if arrays.is_empty() {
            println!("   (none)");
        }
        for var in arrays.values() {
            let dims: Vec<String> = var
                .dimensions
                .iter()
                .zip(&var.shape)
                .map(|(d, len)| format!("{}[{}]", d, len))
                .collect();
            println!("- {} ({}) {}", var.name, dims.join(", "), var.dtype);
            if let Some(units) = var.attr_str("units") {
                println!("      units: {}", units);
            }
        }
    }
}
