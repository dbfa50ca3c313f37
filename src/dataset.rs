//! In-memory view of an opened dataset
//!
//! A [`Dataset`] holds group attributes and array metadata split into
//! coordinates and data variables the way xarray splits them. Coordinate
//! values stay in the store until [`Dataset::read_values`] or
//! [`Dataset::read_times`] asks for them.

use crate::errors::{Result, StacGenError};
use crate::store::ObjectStore;
use crate::times::decode_times;
use crate::zarr_io::{ArrayMetadata, RawValues};
use chrono::{DateTime, Utc};
use ndarray::Array1;
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Attribute listing non-dimension coordinates
const COORDINATES_ATTR: &str = "coordinates";

/// Group attributes plus coordinate and data variable metadata
#[derive(Debug, Clone)]
pub struct Dataset {
    attrs: Map<String, JsonValue>,
    coords: BTreeMap<String, ArrayMetadata>,
    data_vars: BTreeMap<String, ArrayMetadata>,
    store: Arc<dyn ObjectStore>,
}

impl Dataset {
    /// Classify arrays: an array is a coordinate when it is the sole
    /// dimension of itself or is named in a `coordinates` attribute.
    pub fn new(
        attrs: Map<String, JsonValue>,
        arrays: Vec<ArrayMetadata>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        let listed: BTreeSet<String> = std::iter::once(&attrs)
            .chain(arrays.iter().map(|a| &a.attributes))
            .filter_map(|a| a.get(COORDINATES_ATTR).and_then(JsonValue::as_str))
            .flat_map(|names| names.split_whitespace().map(str::to_string))
            .collect();

        let (coords, data_vars): (Vec<_>, Vec<_>) = arrays.into_iter().partition(|a| {
            listed.contains(&a.name) || (a.dimensions.len() == 1 && a.dimensions[0] == a.name)
        });

        Self {
            attrs,
            coords: coords.into_iter().map(|a| (a.name.clone(), a)).collect(),
            data_vars: data_vars.into_iter().map(|a| (a.name.clone(), a)).collect(),
            store,
        }
    }

    pub fn attrs(&self) -> &Map<String, JsonValue> {
        &self.attrs
    }

    /// Global string attribute
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(JsonValue::as_str)
    }

    pub fn coords(&self) -> &BTreeMap<String, ArrayMetadata> {
        &self.coords
    }

    pub fn data_vars(&self) -> &BTreeMap<String, ArrayMetadata> {
        &self.data_vars
    }

    pub fn has_coord(&self, name: &str) -> bool {
        self.coords.contains_key(name)
    }

    /// Coordinate or data variable by name
    pub fn variable(&self, name: &str) -> Option<&ArrayMetadata> {
        self.coords.get(name).or_else(|| self.data_vars.get(name))
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    fn require(&self, name: &str) -> Result<&ArrayMetadata> {
        self.variable(name).ok_or_else(|| StacGenError::ArrayNotFound {
            array: name.to_string(),
        })
    }

    async fn read_raw(&self, name: &str) -> Result<(&ArrayMetadata, RawValues)> {
        let meta = self.require(name)?;
        let raw = meta.read_values(self.store.as_ref()).await?;
        Ok((meta, raw))
    }

    /// Valid values of an array with CF `scale_factor`/`add_offset` applied
    pub async fn read_values(&self, name: &str) -> Result<Array1<f64>> {
        let (meta, raw) = self.read_raw(name).await?;
        let values = Array1::from(raw.to_f64());
        Ok(match meta.packing() {
            Some((scale, offset)) => values.mapv(|v| v * scale + offset),
            None => values,
        })
    }

    /// Valid values of a time array as UTC timestamps, CF packing applied
    pub async fn read_times(&self, name: &str) -> Result<Vec<DateTime<Utc>>> {
        let (meta, raw) = self.read_raw(name).await?;
        decode_times(meta, &raw)
    }

    /// `(min, max)` of an array, ignoring NaN
    pub async fn value_range(&self, name: &str) -> Result<(f64, f64)> {
        let values = self.read_values(name).await?;
        values
            .iter()
            .filter(|v| !v.is_nan())
            .fold(None, |range: Option<(f64, f64)>, &v| match range {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
            .ok_or_else(|| StacGenError::EmptyCoordinate(name.to_string()))
    }

    /// `(first, last)` timestamps of a time array
    pub async fn time_range(&self, name: &str) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let times = self.read_times(name).await?;
        match (times.iter().min(), times.iter().max()) {
            (Some(&start), Some(&end)) => Ok((start, end)),
            _ => Err(StacGenError::EmptyCoordinate(name.to_string())),
        }
    }
}
