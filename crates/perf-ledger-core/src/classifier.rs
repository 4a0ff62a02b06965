// crates/perf-ledger-core/src/classifier.rs
// ============================================================================
// Module: Resource Classifier
// Description: Buckets network requests into resource categories by size.
// Purpose: Produce the per-category KB totals stored in each record.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Each request is assigned to exactly one [`ResourceCategory`]: the URL path
//! extension decides first, then the MIME type, then `other`. Byte totals are
//! accumulated per category and converted to KB once at the end, so rounding
//! error never compounds across requests.
//!
//! ## Invariants
//! - Classification is a pure function of the request multiset.
//! - Requests without a positive, finite size contribute nothing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::record::ResourceSizes;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Bytes per KB used for bucket conversion.
const BYTES_PER_KB: f64 = 1024.0;
/// Path extensions classified as images.
const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "gif", "svg", "webp", "ico"];
/// Path extensions classified as fonts.
const FONT_EXTENSIONS: [&str; 5] = ["woff", "woff2", "ttf", "otf", "eot"];

// ============================================================================
// SECTION: Types
// ============================================================================

/// Resource bucket for a network request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    /// Scripts and JSON payloads.
    Js,
    /// Stylesheets.
    Css,
    /// Images and icons.
    Image,
    /// Web fonts.
    Font,
    /// Anything not matched above.
    Other,
}

impl ResourceCategory {
    /// All categories in bucket order.
    pub const ALL: [Self; 5] = [Self::Js, Self::Css, Self::Image, Self::Font, Self::Other];

    /// Classifies a request by URL extension first, MIME type second.
    #[must_use]
    pub fn classify(url: &str, mime_type: Option<&str>) -> Self {
        if let Some(category) = url_extension(url).and_then(|ext| Self::from_extension(&ext)) {
            return category;
        }
        mime_type.and_then(Self::from_mime_type).unwrap_or(Self::Other)
    }

    /// Maps a lowercase path extension to a category.
    fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "js" => Some(Self::Js),
            "css" => Some(Self::Css),
            ext if IMAGE_EXTENSIONS.contains(&ext) => Some(Self::Image),
            ext if FONT_EXTENSIONS.contains(&ext) => Some(Self::Font),
            _ => None,
        }
    }

    /// Maps a MIME type to a category by substring match.
    fn from_mime_type(mime_type: &str) -> Option<Self> {
        let mime = mime_type.to_ascii_lowercase();
        if mime.contains("javascript") || mime.contains("json") {
            Some(Self::Js)
        } else if mime.contains("css") {
            Some(Self::Css)
        } else if mime.contains("image") {
            Some(Self::Image)
        } else if mime.contains("font") {
            Some(Self::Font)
        } else {
            None
        }
    }
}

/// Network request descriptor taken from the audit document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDescriptor {
    /// Request URL.
    pub url: String,
    /// Bytes transferred over the network.
    #[serde(default)]
    pub transfer_size: Option<f64>,
    /// Decoded resource size.
    #[serde(default)]
    pub resource_size: Option<f64>,
    /// Response MIME type.
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl RequestDescriptor {
    /// Returns the byte size counted for this request.
    ///
    /// Transfer size wins whenever it is present; the resource size is only a
    /// fallback. Missing, non-finite, or non-positive sizes yield `None`.
    #[must_use]
    pub fn effective_size(&self) -> Option<f64> {
        self.transfer_size
            .or(self.resource_size)
            .filter(|size| size.is_finite() && *size > 0.0)
    }

    /// Returns the category this request is bucketed into.
    #[must_use]
    pub fn category(&self) -> ResourceCategory {
        ResourceCategory::classify(&self.url, self.mime_type.as_deref())
    }
}

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Raw byte totals per category prior to KB conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ByteTotals {
    /// Script bytes.
    pub js: f64,
    /// Stylesheet bytes.
    pub css: f64,
    /// Image bytes.
    pub image: f64,
    /// Font bytes.
    pub font: f64,
    /// Remaining bytes.
    pub other: f64,
}

impl ByteTotals {
    /// Adds `bytes` to the bucket for `category`.
    pub fn add(&mut self, category: ResourceCategory, bytes: f64) {
        let bucket = match category {
            ResourceCategory::Js => &mut self.js,
            ResourceCategory::Css => &mut self.css,
            ResourceCategory::Image => &mut self.image,
            ResourceCategory::Font => &mut self.font,
            ResourceCategory::Other => &mut self.other,
        };
        *bucket += bytes;
    }

    /// Sum of every bucket in bytes.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.js + self.css + self.image + self.font + self.other
    }

    /// Converts each bucket to KB, rounding once per bucket.
    #[must_use]
    pub fn to_kilobytes(&self) -> ResourceSizes {
        ResourceSizes {
            js: bytes_to_kb(self.js),
            css: bytes_to_kb(self.css),
            image: bytes_to_kb(self.image),
            font: bytes_to_kb(self.font),
            other: bytes_to_kb(self.other),
        }
    }
}

/// Accumulates raw byte totals per category.
#[must_use]
pub fn accumulate_bytes<'a, I>(requests: I) -> ByteTotals
where
    I: IntoIterator<Item = &'a RequestDescriptor>,
{
    let mut totals = ByteTotals::default();
    for request in requests {
        if let Some(size) = request.effective_size() {
            totals.add(request.category(), size);
        }
    }
    totals
}

/// Classifies requests into per-category KB totals.
///
/// Empty input yields all-zero buckets.
#[must_use]
pub fn classify_requests<'a, I>(requests: I) -> ResourceSizes
where
    I: IntoIterator<Item = &'a RequestDescriptor>,
{
    accumulate_bytes(requests).to_kilobytes()
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts a byte total to whole KB.
fn bytes_to_kb(bytes: f64) -> u64 {
    crate::numeric::round_to_u64(bytes / BYTES_PER_KB)
}

/// Extracts the lowercase extension of the last URL path segment.
fn url_extension(url: &str) -> Option<String> {
    let without_fragment = url.split('#').next().unwrap_or_default();
    let without_query = without_fragment.split('?').next().unwrap_or_default();
    let path = match without_query.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |index| &rest[index ..]),
        None => without_query,
    };
    let segment = path.rsplit('/').next().unwrap_or_default();
    let (stem, extension) = segment.rsplit_once('.')?;
    if stem.is_empty() && extension.is_empty() {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
