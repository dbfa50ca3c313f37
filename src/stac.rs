//! STAC 1.0.0 document model
//!
//! Only the parts of the Collection and Catalog objects this crate writes
//! are typed; anything else rides along in `extra_fields`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

pub const STAC_VERSION: &str = "1.0.0";

/// Media type of STAC JSON documents
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// A link object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Link {
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
            media_type: None,
            title: None,
        }
    }

    pub fn json(mut self) -> Self {
        self.media_type = Some(JSON_MEDIA_TYPE.to_string());
        self
    }

    pub fn with_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Link handling shared by collections and catalogs
pub trait Links {
    fn links(&self) -> &[Link];
    fn links_mut(&mut self) -> &mut Vec<Link>;

    fn add_link(&mut self, link: Link) {
        self.links_mut().push(link);
    }

    /// Replace any `self` link with one pointing at `href`
    fn set_self_href(&mut self, href: &str) {
        let links = self.links_mut();
        links.retain(|l| l.rel != "self");
        links.push(Link::new("self", href).json());
    }

    fn self_href(&self) -> Option<&str> {
        self.links()
            .iter()
            .find(|l| l.rel == "self")
            .map(|l| l.href.as_str())
    }

    fn links_by_rel<'a>(&'a self, rel: &'a str) -> Box<dyn Iterator<Item = &'a Link> + 'a> {
        Box::new(self.links().iter().filter(move |l| l.rel == rel))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialExtent {
    /// `[west, south, east, north]` boxes
    pub bbox: Vec<[f64; 4]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalExtent {
    /// `[start, end]` intervals, `None` for open ends
    pub interval: Vec<[Option<DateTime<Utc>>; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub spatial: SpatialExtent,
    pub temporal: TemporalExtent,
}

/// A STAC Collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(rename = "type")]
    pub type_: String,
    pub stac_version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stac_extensions: Vec<String>,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    pub license: String,
    pub extent: Extent,
    pub links: Vec<Link>,
    #[serde(flatten)]
    pub extra_fields: Map<String, JsonValue>,
}

impl Collection {
    pub fn new(id: impl Into<String>, description: impl Into<String>, extent: Extent) -> Self {
        Self {
            type_: "Collection".to_string(),
            stac_version: STAC_VERSION.to_string(),
            stac_extensions: Vec::new(),
            id: id.into(),
            title: None,
            description: description.into(),
            keywords: Vec::new(),
            license: "proprietary".to_string(),
            extent,
            links: Vec::new(),
            extra_fields: Map::new(),
        }
    }
}

impl Links for Collection {
    fn links(&self) -> &[Link] {
        &self.links
    }
    fn links_mut(&mut self) -> &mut Vec<Link> {
        &mut self.links
    }
}

/// A STAC Catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(rename = "type")]
    pub type_: String,
    pub stac_version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stac_extensions: Vec<String>,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    pub links: Vec<Link>,
    #[serde(flatten)]
    pub extra_fields: Map<String, JsonValue>,
}

impl Catalog {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            type_: "Catalog".to_string(),
            stac_version: STAC_VERSION.to_string(),
            stac_extensions: Vec::new(),
            id: id.into(),
            title: None,
            description: description.into(),
            links: Vec::new(),
            extra_fields: Map::new(),
        }
    }
}

impl Links for Catalog {
    fn links(&self) -> &[Link] {
        &self.links
    }
    fn links_mut(&mut self) -> &mut Vec<Link> {
        &mut self.links
    }
}
