//! Zarr I/O operations
//!
//! Reads Zarr v2 groups from any [`ObjectStore`]: consolidated metadata,
//! per-array `.zarray`/`.zattrs` documents and chunks. Chunk bytes are
//! fetched through the object store and handed to `zarrs`, which owns the
//! codecs (blosc, zlib, gzip, zstd), memory order and edge chunks. A small
//! [`ZarrWriter`] produces local groups in the layout xarray writes, which is
//! how test fixtures are built.

use crate::dataset::Dataset;
use crate::errors::{Result, StacGenError};
use crate::settings::StoreSettings;
use crate::store::{join_key, LocalStore, ObjectStore, PrefixedStore, S3Credentials, S3Store};
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use ndarray::ArrayD;
use rayon::prelude::*;
use serde_json::{json, Map, Value as JsonValue};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use zarrs::array::{Array, DataType, Element, ElementOwned};
use zarrs::array_subset::ArraySubset;
use zarrs::filesystem::FilesystemStore;
use zarrs::storage::store::MemoryStore;
use zarrs::storage::{StoreKey, WritableStorageTraits};

/// Attribute xarray uses to record dimension names
pub const ARRAY_DIMENSIONS_ATTR: &str = "_ARRAY_DIMENSIONS";

const CHUNK_FETCH_CONCURRENCY: usize = 16;

/// Where a Zarr group lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZarrSource {
    /// Local filesystem path
    Local(PathBuf),
    /// Bucket and key prefix in S3
    S3 { bucket: String, prefix: String },
}

impl ZarrSource {
    /// Parse `s3://bucket/prefix` or a local path
    pub fn from_path_str(s: &str) -> Result<Self> {
        if let Some(rest) = s.strip_prefix("s3://") {
            let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
            if bucket.is_empty() {
                return Err(StacGenError::Config(format!("Missing bucket in '{}'", s)));
            }
            return Ok(ZarrSource::S3 {
                bucket: bucket.to_string(),
                prefix: prefix.trim_matches('/').to_string(),
            });
        }
        if s.contains("://") {
            return Err(StacGenError::Config(format!(
                "Unsupported store URL '{}'. Use a local path or s3://bucket/prefix",
                s
            )));
        }
        Ok(ZarrSource::Local(PathBuf::from(s)))
    }

    /// Build the store for this source, anonymous for S3
    pub fn into_store(self, settings: &StoreSettings) -> Result<Arc<dyn ObjectStore>> {
        match self {
            ZarrSource::Local(path) => Ok(Arc::new(LocalStore::open(path)?)),
            ZarrSource::S3 { bucket, prefix } => {
                let s3: Arc<dyn ObjectStore> = Arc::new(S3Store::new(
                    &settings.endpoint,
                    &settings.region,
                    &bucket,
                    S3Credentials::Anonymous,
                )?);
                if prefix.is_empty() {
                    Ok(s3)
                } else {
                    Ok(Arc::new(PrefixedStore::new(s3, &prefix)))
                }
            }
        }
    }
}

/// Time resolution of a datetime64 dtype or a CF time unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Days,
    Hours,
    Minutes,
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

impl TimeUnit {
    /// Unit code used inside numpy `M8[...]` dtypes
    pub fn from_numpy(code: &str) -> Option<Self> {
        match code {
            "D" => Some(TimeUnit::Days),
            "h" => Some(TimeUnit::Hours),
            "m" => Some(TimeUnit::Minutes),
            "s" => Some(TimeUnit::Seconds),
            "ms" => Some(TimeUnit::Milliseconds),
            "us" => Some(TimeUnit::Microseconds),
            "ns" => Some(TimeUnit::Nanoseconds),
            _ => None,
        }
    }

    /// Unit word used in CF `units` attributes
    pub fn from_cf(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "days" | "day" | "d" => Some(TimeUnit::Days),
            "hours" | "hour" | "hrs" | "hr" | "h" => Some(TimeUnit::Hours),
            "minutes" | "minute" | "mins" | "min" => Some(TimeUnit::Minutes),
            "seconds" | "second" | "secs" | "sec" | "s" => Some(TimeUnit::Seconds),
            "milliseconds" | "millisecond" | "msecs" | "msec" | "ms" => {
                Some(TimeUnit::Milliseconds)
            }
            "microseconds" | "microsecond" | "usecs" | "usec" | "us" => {
                Some(TimeUnit::Microseconds)
            }
            "nanoseconds" | "nanosecond" | "nsecs" | "nsec" | "ns" => Some(TimeUnit::Nanoseconds),
            _ => None,
        }
    }

    fn micros_per_unit(self) -> f64 {
        match self {
            TimeUnit::Days => 86_400_000_000.0,
            TimeUnit::Hours => 3_600_000_000.0,
            TimeUnit::Minutes => 60_000_000.0,
            TimeUnit::Seconds => 1_000_000.0,
            TimeUnit::Milliseconds => 1_000.0,
            TimeUnit::Microseconds => 1.0,
            TimeUnit::Nanoseconds => 0.001,
        }
    }

    /// Exact duration of `count` units, `None` on overflow
    pub fn duration(self, count: i64) -> Option<chrono::TimeDelta> {
        use chrono::TimeDelta;
        match self {
            TimeUnit::Days => TimeDelta::try_days(count),
            TimeUnit::Hours => TimeDelta::try_hours(count),
            TimeUnit::Minutes => TimeDelta::try_minutes(count),
            TimeUnit::Seconds => TimeDelta::try_seconds(count),
            TimeUnit::Milliseconds => TimeDelta::try_milliseconds(count),
            TimeUnit::Microseconds => Some(TimeDelta::microseconds(count)),
            TimeUnit::Nanoseconds => Some(TimeDelta::nanoseconds(count)),
        }
    }

    /// Duration of a fractional `count`, rounded to microseconds
    pub fn duration_f64(self, count: f64) -> Option<chrono::TimeDelta> {
        let micros = (count * self.micros_per_unit()).round();
        if !micros.is_finite() || micros.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(chrono::TimeDelta::microseconds(micros as i64))
    }
}

/// Unit of a numpy `M8[...]` dtype such as `<M8[ns]`
pub fn datetime_unit(dtype: &str) -> Option<TimeUnit> {
    dtype
        .strip_prefix(['<', '>', '|'])?
        .strip_prefix("M8[")?
        .strip_suffix(']')
        .and_then(TimeUnit::from_numpy)
}

fn is_supported_dtype(dtype: &str) -> bool {
    let Some(body) = dtype.strip_prefix(['<', '>', '|']) else {
        return false;
    };
    matches!(body, "b1" | "i1" | "i2" | "i4" | "i8" | "u1" | "u2" | "u4" | "u8" | "f4" | "f8")
        || datetime_unit(dtype).is_some()
}

/// Decoded element values, in storage order
#[derive(Debug, Clone, PartialEq)]
pub enum RawValues {
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl RawValues {
    pub fn len(&self) -> usize {
        match self {
            RawValues::Int(v) => v.len(),
            RawValues::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            RawValues::Int(v) => v.iter().map(|&x| x as f64).collect(),
            RawValues::Float(v) => v.clone(),
        }
    }

    fn extend(&mut self, other: RawValues) -> Result<()> {
        match (self, other) {
            (RawValues::Int(a), RawValues::Int(b)) => a.extend(b),
            (RawValues::Float(a), RawValues::Float(b)) => a.extend(b),
            _ => return Err(StacGenError::ZarrError("Mixed chunk element types".to_string())),
        }
        Ok(())
    }

    fn retain(&mut self, keep: impl Fn(usize) -> bool) {
        fn retain_indexed<T>(values: &mut Vec<T>, keep: impl Fn(usize) -> bool) {
            let mut i = 0;
            values.retain(|_| {
                let k = keep(i);
                i += 1;
                k
            });
        }
        match self {
            RawValues::Int(v) => retain_indexed(v, keep),
            RawValues::Float(v) => retain_indexed(v, keep),
        }
    }
}

/// `fill_value` from `.zarray`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FillValue {
    None,
    Int(i64),
    Float(f64),
}

impl FillValue {
    fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => FillValue::Int(i),
                None => n.as_f64().map(FillValue::Float).unwrap_or(FillValue::None),
            },
            JsonValue::String(s) => match s.as_str() {
                "NaN" => FillValue::Float(f64::NAN),
                "Infinity" => FillValue::Float(f64::INFINITY),
                "-Infinity" => FillValue::Float(f64::NEG_INFINITY),
                "NaT" => FillValue::Int(i64::MIN),
                _ => FillValue::None,
            },
            JsonValue::Bool(b) => FillValue::Int(i64::from(*b)),
            _ => FillValue::None,
        }
    }

    fn matches_int(&self, v: i64) -> bool {
        match *self {
            FillValue::Int(f) => f == v,
            FillValue::Float(f) => f == v as f64,
            FillValue::None => false,
        }
    }

    fn matches_float(&self, v: f64) -> bool {
        match *self {
            FillValue::Float(f) => f == v,
            FillValue::Int(f) => f as f64 == v,
            FillValue::None => false,
        }
    }
}

/// Compressor ids the chunk codecs understand
pub const SUPPORTED_COMPRESSORS: [&str; 4] = ["blosc", "zlib", "gzip", "zstd"];

/// Chunk compressor used by [`ZarrWriter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compressor {
    None,
    Zlib,
    Gzip,
    /// lz4 inside blosc with byte shuffle, the numcodecs default
    Blosc,
}

impl Compressor {
    fn to_json(self) -> JsonValue {
        match self {
            Compressor::None => JsonValue::Null,
            Compressor::Zlib => json!({"id": "zlib", "level": 1}),
            Compressor::Gzip => json!({"id": "gzip", "level": 1}),
            Compressor::Blosc => json!({
                "id": "blosc",
                "cname": "lz4",
                "clevel": 5,
                "shuffle": 1,
                "blocksize": 0
            }),
        }
    }
}

fn zarr_error(name: &str, err: impl std::fmt::Display) -> StacGenError {
    StacGenError::ZarrError(format!("Array '{}': {}", name, err))
}

/// `.zarray` as the chunk codecs read it: datetimes become int64 and
/// optional keys get their defaults.
fn codec_metadata(zarray: &JsonValue) -> JsonValue {
    let mut doc = zarray.clone();
    if let Some(obj) = doc.as_object_mut() {
        obj.insert("zarr_format".to_string(), json!(2));
        for (key, default) in [
            ("compressor", JsonValue::Null),
            ("filters", JsonValue::Null),
            ("fill_value", JsonValue::Null),
            ("order", json!("C")),
        ] {
            obj.entry(key).or_insert(default);
        }
        let dtype = obj.get("dtype").and_then(JsonValue::as_str).map(str::to_string);
        if let Some(dtype) = dtype.filter(|d| datetime_unit(d).is_some()) {
            obj.insert("dtype".to_string(), json!(format!("{}i8", &dtype[..1])));
            if obj.get("fill_value").and_then(JsonValue::as_str) == Some("NaT") {
                obj.insert("fill_value".to_string(), json!(i64::MIN));
            }
        }
    }
    doc
}

/// Metadata for a Zarr array
#[derive(Debug, Clone)]
pub struct ArrayMetadata {
    pub name: String,
    pub shape: Vec<usize>,
    pub chunks: Vec<usize>,
    pub dtype: String,
    pub fill_value: FillValue,
    /// Compressor id, `None` for raw chunks
    pub compressor: Option<String>,
    pub filters: Vec<String>,
    pub dimensions: Vec<String>,
    pub attributes: Map<String, JsonValue>,
    zarray: JsonValue,
}

impl ArrayMetadata {
    /// Build from the `.zarray` document and optional `.zattrs` document
    pub fn from_json(name: &str, zarray: &JsonValue, zattrs: Option<&JsonValue>) -> Result<Self> {
        let dims_of = |key: &str| -> Result<Vec<usize>> {
            zarray[key]
                .as_array()
                .ok_or_else(|| {
                    StacGenError::ZarrError(format!("Missing {} in metadata of '{}'", key, name))
                })?
                .iter()
                .map(|v| {
                    v.as_u64().map(|n| n as usize).ok_or_else(|| {
                        StacGenError::ZarrError(format!("Invalid {} in metadata of '{}'", key, name))
                    })
                })
                .collect()
        };
        let shape = dims_of("shape")?;
        let chunks = dims_of("chunks")?;
        if shape.len() != chunks.len() {
            return Err(StacGenError::ZarrError(format!(
                "Array '{}' has {} dimensions but {} chunk sizes",
                name,
                shape.len(),
                chunks.len()
            )));
        }
        if chunks.iter().any(|&c| c == 0) {
            return Err(StacGenError::ZarrError(format!("Array '{}' has a zero chunk size", name)));
        }

        let dtype = match &zarray["dtype"] {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        };

        let filters = zarray["filters"]
            .as_array()
            .map(|list| {
                list.iter()
                    .map(|f| f["id"].as_str().unwrap_or("unknown").to_string())
                    .collect()
            })
            .unwrap_or_default();

        let mut attributes = zattrs
            .and_then(JsonValue::as_object)
            .cloned()
            .unwrap_or_default();
        let dimensions = match attributes.remove(ARRAY_DIMENSIONS_ATTR) {
            Some(JsonValue::Array(names)) => names
                .iter()
                .map(|n| n.as_str().unwrap_or_default().to_string())
                .collect(),
            _ => (0..shape.len()).map(|i| format!("dim_{}", i)).collect(),
        };

        Ok(ArrayMetadata {
            name: name.to_string(),
            shape,
            chunks,
            dtype,
            fill_value: FillValue::from_json(&zarray["fill_value"]),
            compressor: zarray["compressor"]["id"].as_str().map(str::to_string),
            filters,
            dimensions,
            attributes,
            zarray: codec_metadata(zarray),
        })
    }

    /// Number of elements in the array
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// String attribute lookup
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(JsonValue::as_str)
    }

    /// CF packing `(scale_factor, add_offset)` when either attribute is set
    pub fn packing(&self) -> Option<(f64, f64)> {
        let get = |key: &str| self.attributes.get(key).and_then(JsonValue::as_f64);
        match (get("scale_factor"), get("add_offset")) {
            (None, None) => None,
            (scale, offset) => Some((scale.unwrap_or(1.0), offset.unwrap_or(0.0))),
        }
    }

    fn chunk_counts(&self) -> Vec<u64> {
        self.shape
            .iter()
            .zip(&self.chunks)
            .map(|(&s, &c)| s.div_ceil(c) as u64)
            .collect()
    }

    /// All chunk grid positions, C order
    fn chunk_indices(&self) -> Vec<Vec<u64>> {
        let mut indices = vec![Vec::new()];
        for count in self.chunk_counts() {
            indices = indices
                .into_iter()
                .flat_map(|prefix| {
                    (0..count).map(move |i| {
                        let mut next = prefix.clone();
                        next.push(i);
                        next
                    })
                })
                .collect();
        }
        indices
    }

    fn check_readable(&self) -> Result<()> {
        if !is_supported_dtype(&self.dtype) {
            return Err(StacGenError::UnsupportedDtype(self.dtype.clone()));
        }
        if let Some(id) = &self.compressor {
            if !SUPPORTED_COMPRESSORS.contains(&id.as_str()) {
                return Err(StacGenError::UnsupportedCompressor(id.clone()));
            }
        }
        if let Some(filter) = self.filters.first() {
            return Err(StacGenError::ZarrError(format!(
                "Array '{}' uses unsupported filter '{}'",
                self.name, filter
            )));
        }
        Ok(())
    }

    /// Stage this array's metadata in an in-memory store for the codecs
    fn staged_array(&self) -> Result<(Arc<MemoryStore>, Array<MemoryStore>)> {
        let staging = Arc::new(MemoryStore::new());
        let key = StoreKey::new(join_key(&self.name, ".zarray"))
            .map_err(|e| zarr_error(&self.name, e))?;
        staging
            .set(&key, Bytes::from(serde_json::to_vec(&self.zarray)?))
            .map_err(|e| zarr_error(&self.name, e))?;
        let array = Array::open(staging.clone(), &format!("/{}", self.name))
            .map_err(|e| zarr_error(&self.name, e))?;
        Ok((staging, array))
    }

    fn is_fill(&self, values: &RawValues, i: usize) -> bool {
        match values {
            RawValues::Int(v) => self.fill_value.matches_int(v[i]),
            RawValues::Float(v) => v[i].is_nan() || self.fill_value.matches_float(v[i]),
        }
    }

    fn elements<T: ElementOwned>(
        &self,
        array: &Array<MemoryStore>,
        subset: &ArraySubset,
    ) -> Result<Vec<T>> {
        array
            .retrieve_array_subset_elements::<T>(subset)
            .map_err(|e| zarr_error(&self.name, e))
    }

    fn decode_chunk(&self, array: &Array<MemoryStore>, index: &[u64]) -> Result<RawValues> {
        let subset = array
            .chunk_subset_bounded(index)
            .map_err(|e| zarr_error(&self.name, e))?;
        let mut values = match array.data_type() {
            DataType::Float64 => RawValues::Float(self.elements::<f64>(array, &subset)?),
            DataType::Float32 => RawValues::Float(
                self.elements::<f32>(array, &subset)?.into_iter().map(f64::from).collect(),
            ),
            DataType::Int64 => RawValues::Int(self.elements::<i64>(array, &subset)?),
            DataType::Int32 => RawValues::Int(widen(self.elements::<i32>(array, &subset)?)),
            DataType::Int16 => RawValues::Int(widen(self.elements::<i16>(array, &subset)?)),
            DataType::Int8 => RawValues::Int(widen(self.elements::<i8>(array, &subset)?)),
            DataType::UInt32 => RawValues::Int(widen(self.elements::<u32>(array, &subset)?)),
            DataType::UInt16 => RawValues::Int(widen(self.elements::<u16>(array, &subset)?)),
            DataType::UInt8 => RawValues::Int(widen(self.elements::<u8>(array, &subset)?)),
            DataType::UInt64 => RawValues::Int(
                self.elements::<u64>(array, &subset)?
                    .into_iter()
                    .map(|v| v.min(i64::MAX as u64) as i64)
                    .collect(),
            ),
            DataType::Bool => RawValues::Int(widen(self.elements::<bool>(array, &subset)?)),
            _ => return Err(StacGenError::UnsupportedDtype(self.dtype.clone())),
        };
        let fill_mask: Vec<bool> = (0..values.len()).map(|i| self.is_fill(&values, i)).collect();
        values.retain(|i| !fill_mask[i]);
        Ok(values)
    }

    /// Read every valid (in-bounds, non-fill) element.
    ///
    /// Chunks are fetched concurrently from `store` into an in-memory staging
    /// store and decoded on the rayon pool. Missing chunks hold only fill
    /// values and contribute nothing. Values come back in chunk order, which
    /// is array order for one-dimensional arrays.
    pub async fn read_values(&self, store: &dyn ObjectStore) -> Result<RawValues> {
        self.check_readable()?;
        let (staging, array) = self.staged_array()?;

        let keys: Vec<(Vec<u64>, StoreKey)> = self
            .chunk_indices()
            .into_iter()
            .map(|index| {
                let key = array.chunk_key(&index);
                (index, key)
            })
            .collect();
        debug!("Reading {} chunk(s) of '{}'", keys.len(), self.name);

        let fetched: Vec<Option<Bytes>> = futures::stream::iter(&keys)
            .map(|(_, key)| fetch_chunk(store, key.as_str()))
            .buffered(CHUNK_FETCH_CONCURRENCY)
            .try_collect()
            .await?;

        let mut present = Vec::new();
        for ((index, key), data) in keys.iter().zip(fetched) {
            if let Some(data) = data {
                staging.set(key, data).map_err(|e| zarr_error(&self.name, e))?;
                present.push(index.as_slice());
            }
        }

        let decoded: Vec<RawValues> = present
            .par_iter()
            .map(|index| self.decode_chunk(&array, index))
            .collect::<Result<_>>()?;

        let mut values = match array.data_type() {
            DataType::Float32 | DataType::Float64 => RawValues::Float(Vec::new()),
            _ => RawValues::Int(Vec::new()),
        };
        for chunk in decoded {
            values.extend(chunk)?;
        }
        Ok(values)
    }
}

fn widen<T: Into<i64>>(values: Vec<T>) -> Vec<i64> {
    values.into_iter().map(Into::into).collect()
}

/// Fetch one chunk. S3 answers 403 instead of 404 for missing keys when the
/// caller may not list the bucket, so both mean "absent" here.
async fn fetch_chunk(store: &dyn ObjectStore, key: &str) -> Result<Option<Bytes>> {
    match store.get(key).await {
        Err(StacGenError::AccessDenied(_)) => {
            debug!("Chunk {} not readable, treating it as missing", key);
            Ok(None)
        }
        other => other,
    }
}

fn parse_json(bytes: &[u8], what: &str) -> Result<JsonValue> {
    serde_json::from_slice(bytes)
        .map_err(|e| StacGenError::ZarrError(format!("Failed to parse {}: {}", what, e)))
}

/// Reader turning a Zarr v2 group into a [`Dataset`]
pub struct ZarrReader {
    store: Arc<dyn ObjectStore>,
}

impl ZarrReader {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Read group and array metadata, preferring consolidated `.zmetadata`
    pub async fn open(self) -> Result<Dataset> {
        let (attrs, arrays) = match self.store.get(".zmetadata").await? {
            Some(bytes) => {
                debug!("Using consolidated metadata of {}", self.store.describe());
                Self::read_consolidated(&parse_json(&bytes, ".zmetadata")?)?
            }
            None => self.read_unconsolidated().await?,
        };
        Ok(Dataset::new(attrs, arrays, self.store))
    }

    fn read_consolidated(doc: &JsonValue) -> Result<(Map<String, JsonValue>, Vec<ArrayMetadata>)> {
        let metadata = doc["metadata"].as_object().ok_or_else(|| {
            StacGenError::ZarrError("Consolidated metadata has no 'metadata' object".to_string())
        })?;
        let attrs = metadata
            .get(".zattrs")
            .and_then(JsonValue::as_object)
            .cloned()
            .unwrap_or_default();

        let mut arrays = Vec::new();
        for (key, zarray) in metadata {
            let Some(name) = key.strip_suffix("/.zarray") else {
                continue;
            };
            if name.contains('/') {
                continue;
            }
            let zattrs = metadata.get(&format!("{}/.zattrs", name));
            arrays.push(ArrayMetadata::from_json(name, zarray, zattrs)?);
        }
        Ok((attrs, arrays))
    }

    async fn read_unconsolidated(&self) -> Result<(Map<String, JsonValue>, Vec<ArrayMetadata>)> {
        if self.store.get(".zgroup").await?.is_none() {
            return Err(StacGenError::ZarrError(format!(
                "No Zarr group found at {}",
                self.store.describe()
            )));
        }
        let attrs = match self.store.get(".zattrs").await? {
            Some(bytes) => parse_json(&bytes, ".zattrs")?
                .as_object()
                .cloned()
                .unwrap_or_default(),
            None => Map::new(),
        };

        let mut arrays = Vec::new();
        for name in self.store.list_dirs("").await? {
            let Some(zarray) = self.store.get(&join_key(&name, ".zarray")).await? else {
                continue;
            };
            let zarray = parse_json(&zarray, &format!("{}/.zarray", name))?;
            let zattrs = match self.store.get(&join_key(&name, ".zattrs")).await? {
                Some(bytes) => Some(parse_json(&bytes, &format!("{}/.zattrs", name))?),
                None => None,
            };
            arrays.push(ArrayMetadata::from_json(&name, &zarray, zattrs.as_ref())?);
        }
        Ok((attrs, arrays))
    }
}

/// Open the Zarr group behind `store`
pub async fn open_zarr(store: Arc<dyn ObjectStore>) -> Result<Dataset> {
    ZarrReader::new(store).open().await
}

/// Element types [`ZarrWriter`] can store
pub trait ZarrElement: Element + Copy + Send + Sync + 'static {
    const DTYPE: &'static str;
    fn fill_value() -> JsonValue;
}

impl ZarrElement for f64 {
    const DTYPE: &'static str = "<f8";
    fn fill_value() -> JsonValue {
        json!("NaN")
    }
}

impl ZarrElement for f32 {
    const DTYPE: &'static str = "<f4";
    fn fill_value() -> JsonValue {
        json!("NaN")
    }
}

impl ZarrElement for i64 {
    const DTYPE: &'static str = "<i8";
    fn fill_value() -> JsonValue {
        JsonValue::Null
    }
}

impl ZarrElement for i32 {
    const DTYPE: &'static str = "<i4";
    fn fill_value() -> JsonValue {
        JsonValue::Null
    }
}

/// Writer for local Zarr v2 groups in xarray layout
pub struct ZarrWriter {
    root: PathBuf,
    store: Arc<FilesystemStore>,
    compressor: Compressor,
    dimension_separator: &'static str,
    consolidated: Map<String, JsonValue>,
}

impl ZarrWriter {
    /// Create the group directory and its `.zgroup`
    pub fn create(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        let store = FilesystemStore::new(&root)
            .map_err(|e| StacGenError::ZarrError(format!("{}: {}", root.display(), e)))?;
        let mut writer = ZarrWriter {
            root,
            store: Arc::new(store),
            compressor: Compressor::None,
            dimension_separator: ".",
            consolidated: Map::new(),
        };
        writer.write_document(".zgroup", &json!({"zarr_format": 2}))?;
        Ok(writer)
    }

    /// Compress chunks written from now on
    pub fn with_compressor(mut self, compressor: Compressor) -> Self {
        self.compressor = compressor;
        self
    }

    /// Use nested `a/0/1` chunk keys instead of `a/0.1`
    pub fn with_nested_chunks(mut self) -> Self {
        self.dimension_separator = "/";
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn write_document(&mut self, key: &str, doc: &JsonValue) -> Result<()> {
        let path = key.split('/').fold(self.root.clone(), |p, part| p.join(part));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_string_pretty(doc)?)?;
        self.consolidated.insert(key.to_string(), doc.clone());
        Ok(())
    }

    /// Write the group attributes
    pub fn write_group_attrs(&mut self, attrs: Map<String, JsonValue>) -> Result<()> {
        self.write_document(".zattrs", &JsonValue::Object(attrs))
    }

    /// Write an array with its dimension names and attributes
    pub fn write_array<T: ZarrElement>(
        &mut self,
        name: &str,
        dims: &[&str],
        data: &ArrayD<T>,
        chunk_shape: Option<Vec<usize>>,
        attrs: Map<String, JsonValue>,
    ) -> Result<()> {
        self.write_array_as(name, T::DTYPE, T::fill_value(), dims, data, chunk_shape, attrs)
    }

    /// Write nanosecond epoch offsets as a `<M8[ns]` array
    pub fn write_datetime64_ns(
        &mut self,
        name: &str,
        dims: &[&str],
        data: &ArrayD<i64>,
        attrs: Map<String, JsonValue>,
    ) -> Result<()> {
        self.write_array_as(name, "<i8", json!(i64::MIN), dims, data, None, attrs)?;
        let key = format!("{}/.zarray", name);
        if let Some(mut zarray) = self.consolidated.get(&key).cloned() {
            zarray["dtype"] = json!("<M8[ns]");
            self.write_document(&key, &zarray)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn write_array_as<T: ZarrElement>(
        &mut self,
        name: &str,
        dtype: &str,
        fill_value: JsonValue,
        dims: &[&str],
        data: &ArrayD<T>,
        chunk_shape: Option<Vec<usize>>,
        mut attrs: Map<String, JsonValue>,
    ) -> Result<()> {
        let shape = data.shape().to_vec();
        if dims.len() != shape.len() {
            return Err(StacGenError::ZarrError(format!(
                "Array '{}' has {} dimensions but {} names",
                name,
                shape.len(),
                dims.len()
            )));
        }
        let chunks = chunk_shape.unwrap_or_else(|| shape.iter().map(|&s| s.max(1)).collect());

        let zarray = json!({
            "chunks": chunks,
            "compressor": self.compressor.to_json(),
            "dimension_separator": self.dimension_separator,
            "dtype": dtype,
            "fill_value": fill_value,
            "filters": null,
            "order": "C",
            "shape": shape,
            "zarr_format": 2
        });
        attrs.insert(ARRAY_DIMENSIONS_ATTR.to_string(), json!(dims));
        self.write_document(&format!("{}/.zarray", name), &zarray)?;
        self.write_document(&format!("{}/.zattrs", name), &JsonValue::Object(attrs))?;

        if data.is_empty() {
            return Ok(());
        }
        let array = Array::open(self.store.clone(), &format!("/{}", name))
            .map_err(|e| zarr_error(name, e))?;
        let elements: Vec<T> = data.iter().copied().collect();
        array
            .store_array_subset_elements(&array.subset_all(), &elements)
            .map_err(|e| zarr_error(name, e))
    }

    /// Write `.zmetadata` covering everything written so far
    pub fn consolidate(&self) -> Result<()> {
        let doc = json!({
            "metadata": JsonValue::Object(self.consolidated.clone()),
            "zarr_consolidated_format": 1
        });
        std::fs::write(self.root.join(".zmetadata"), serde_json::to_string_pretty(&doc)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(zarray: JsonValue) -> ArrayMetadata {
        ArrayMetadata::from_json("a", &zarray, None).unwrap()
    }

    #[test]
    fn datetime_units_from_dtype() {
        assert_eq!(datetime_unit("<M8[ns]"), Some(TimeUnit::Nanoseconds));
        assert_eq!(datetime_unit(">M8[D]"), Some(TimeUnit::Days));
        assert_eq!(datetime_unit("<i8"), None);
        assert!(is_supported_dtype("|u1"));
        assert!(is_supported_dtype(">i2"));
        assert!(!is_supported_dtype("<U10"));
        assert!(!is_supported_dtype("<f2"));
        assert!(!is_supported_dtype("f8"));
    }

    #[test]
    fn fill_value_variants() {
        assert_eq!(FillValue::from_json(&json!(null)), FillValue::None);
        assert_eq!(FillValue::from_json(&json!(-999)), FillValue::Int(-999));
        assert!(matches!(FillValue::from_json(&json!("NaN")), FillValue::Float(f) if f.is_nan()));
        assert_eq!(FillValue::from_json(&json!(0.5)), FillValue::Float(0.5));
        assert_eq!(FillValue::from_json(&json!("NaT")), FillValue::Int(i64::MIN));
    }

    #[test]
    fn codec_metadata_relabels_datetimes() {
        let doc = codec_metadata(&json!({
            "shape": [3], "chunks": [3], "dtype": "<M8[ns]", "fill_value": "NaT"
        }));
        assert_eq!(doc["dtype"], "<i8");
        assert_eq!(doc["fill_value"], json!(i64::MIN));
        assert_eq!(doc["zarr_format"], 2);
        assert_eq!(doc["order"], "C");
        assert!(doc["compressor"].is_null());
    }

    #[test]
    fn chunk_grid_covers_edges() {
        let m = meta(json!({"shape": [4, 6], "chunks": [2, 4], "dtype": "<f8"}));
        assert_eq!(m.dimensions, vec!["dim_0", "dim_1"]);
        assert_eq!(m.chunk_indices(), vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]);

        let scalar = meta(json!({"shape": [], "chunks": [], "dtype": "<i4"}));
        assert_eq!(scalar.chunk_indices(), vec![Vec::<u64>::new()]);
    }

    #[test]
    fn packing_defaults() {
        let mut m = meta(json!({"shape": [1], "chunks": [1], "dtype": "<i2"}));
        assert_eq!(m.packing(), None);
        m.attributes.insert("add_offset".to_string(), json!(10.0));
        assert_eq!(m.packing(), Some((1.0, 10.0)));
        m.attributes.insert("scale_factor".to_string(), json!(0.5));
        assert_eq!(m.packing(), Some((0.5, 10.0)));
    }

    #[tokio::test]
    async fn rejects_unknown_compressor_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        let m = meta(json!({
            "shape": [2], "chunks": [2], "dtype": "<f8", "compressor": {"id": "lzma"}
        }));
        assert_eq!(m.compressor.as_deref(), Some("lzma"));
        let err = m.read_values(&store).await.unwrap_err();
        assert!(matches!(err, StacGenError::UnsupportedCompressor(ref id) if id == "lzma"));
    }

    #[tokio::test]
    async fn rejects_filters_and_odd_dtypes() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        let filtered = meta(json!({
            "shape": [2], "chunks": [2], "dtype": "<f8",
            "filters": [{"id": "delta", "dtype": "<f8"}]
        }));
        let err = filtered.read_values(&store).await.unwrap_err();
        assert!(err.to_string().contains("unsupported filter 'delta'"));

        let strings = meta(json!({"shape": [2], "chunks": [2], "dtype": "<U10"}));
        let err = strings.read_values(&store).await.unwrap_err();
        assert!(matches!(err, StacGenError::UnsupportedDtype(_)));
    }

    #[test]
    fn source_from_path_str() {
        assert_eq!(
            ZarrSource::from_path_str("s3://deep-esdl-public/cube.zarr/").unwrap(),
            ZarrSource::S3 { bucket: "deep-esdl-public".to_string(), prefix: "cube.zarr".to_string() }
        );
        assert_eq!(
            ZarrSource::from_path_str("/data/cube.zarr").unwrap(),
            ZarrSource::Local(PathBuf::from("/data/cube.zarr"))
        );
        assert!(ZarrSource::from_path_str("gs://bucket/x").is_err());
        assert!(ZarrSource::from_path_str("s3://").is_err());
    }

    #[test]
    fn time_units() {
        assert_eq!(TimeUnit::from_cf("Days"), Some(TimeUnit::Days));
        assert_eq!(TimeUnit::from_numpy("us"), Some(TimeUnit::Microseconds));
        assert_eq!(TimeUnit::Hours.duration(2), chrono::TimeDelta::try_hours(2));
        assert_eq!(
            TimeUnit::Days.duration_f64(0.5),
            Some(chrono::TimeDelta::microseconds(43_200_000_000))
        );
        assert_eq!(TimeUnit::Days.duration_f64(f64::NAN), None);
    }
}
