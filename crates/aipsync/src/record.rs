//! Core record types for aipsync.
//!
//! This module defines the publication categories, the version descriptor
//! published alongside each cycle, and the typed record shape of every
//! category. Records keep any field the publisher sends that we do not
//! model in an `extra` map, and tell a missing key apart from an explicit
//! `null` through [`Nullable`], so a stored record reads back exactly as it
//! was downloaded.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Marker value the publisher uses for a modified record.
pub const MODIFIED_MARKER: &str = "Y";

/// One of the six record categories of the publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Aerodrome charts (AD).
    Ad,
    /// Enroute charts (ENR).
    Enr,
    /// Amendments (AMDT).
    Amdt,
    /// Supplements (SUP).
    Sup,
    /// Notices to airmen (NOTAM).
    Notam,
    /// Aeronautical information circulars (AIC).
    Aic,
}

impl Category {
    /// Every category, in the order a sync downloads them.
    pub const ALL: [Self; 6] = [
        Self::Ad,
        Self::Enr,
        Self::Amdt,
        Self::Sup,
        Self::Notam,
        Self::Aic,
    ];

    /// Lowercase code, used in config keys and table names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ad => "ad",
            Self::Enr => "enr",
            Self::Amdt => "amdt",
            Self::Sup => "sup",
            Self::Notam => "notam",
            Self::Aic => "aic",
        }
    }

    /// Uppercase code as printed in the publication.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Ad => "AD",
            Self::Enr => "ENR",
            Self::Amdt => "AMDT",
            Self::Sup => "SUP",
            Self::Notam => "NOTAM",
            Self::Aic => "AIC",
        }
    }

    /// Human-readable label for progress output and error messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ad => "aerodrome data (AD)",
            Self::Enr => "enroute data (ENR)",
            Self::Amdt => "amendment data (AMDT)",
            Self::Sup => "supplement data (SUP)",
            Self::Notam => "notices to airmen (NOTAM)",
            Self::Aic => "information circulars (AIC)",
        }
    }

    /// Name of the table holding this category.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Ad => "ad_records",
            Self::Enr => "enr_records",
            Self::Amdt => "amdt_records",
            Self::Sup => "sup_records",
            Self::Notam => "notam_records",
            Self::Aic => "aic_records",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when a string names no known category.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct ParseCategoryError(String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}

/// Identifies one publication cycle.
///
/// The locally persisted copy of this is the version marker: it is only
/// ever written after every category of that cycle has been stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDescriptor {
    /// Publication name.
    pub name: String,
    /// Cycle designator, e.g. `2510`.
    pub cycle: String,
    /// Numeric version id; the only field compared when deciding to resync.
    pub version_id: i64,
}

impl VersionDescriptor {
    /// Create a new version descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>, cycle: impl Into<String>, version_id: i64) -> Self {
        Self {
            name: name.into(),
            cycle: cycle.into(),
            version_id,
        }
    }
}

/// A record that belongs to exactly one category store.
pub trait CategoryRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The category this record type is stored under.
    const CATEGORY: Category;

    /// Whether the publisher flagged this record as modified in the cycle.
    fn is_modified(&self) -> bool;
}

fn is_marker(flag: Option<&str>) -> bool {
    flag == Some(MODIFIED_MARKER)
}

/// A published field that can be missing, explicitly `null`, or set.
///
/// Serializes back to the same shape: a missing field stays missing (with
/// `skip_serializing_if = "Nullable::is_missing"`) and a `null` stays `null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Nullable<T> {
    /// The key was not sent.
    Missing,
    /// The key was sent as `null`.
    Null,
    /// The key carried a value.
    Value(T),
}

impl<T> Default for Nullable<T> {
    fn default() -> Self {
        Self::Missing
    }
}

impl<T> Nullable<T> {
    /// Whether the key was absent.
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// The value, if any.
    #[must_use]
    pub const fn as_ref(&self) -> Option<&T> {
        match self {
            Self::Value(value) => Some(value),
            Self::Missing | Self::Null => None,
        }
    }

    /// Convert into an `Option`, folding `null` and missing together.
    #[must_use]
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Value(value) => Some(value),
            Self::Missing | Self::Null => None,
        }
    }
}

impl Nullable<String> {
    /// The value as a string slice, if any.
    #[must_use]
    pub fn as_deref(&self) -> Option<&str> {
        self.as_ref().map(String::as_str)
    }
}

impl<T> From<T> for Nullable<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

impl<T: Serialize> Serialize for Nullable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(value) => serializer.serialize_some(value),
            Self::Missing | Self::Null => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Nullable<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Only reached when the key is present; absent keys take the default.
        Option::<T>::deserialize(deserializer).map(|value| value.map_or(Self::Null, Self::Value))
    }
}

/// A row of the chart trees (AD, ENR and AMDT share this shape).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartEntry {
    /// Node id in the publisher's tree.
    #[serde(default, skip_serializing_if = "Nullable::is_missing")]
    pub id: Nullable<String>,
    /// Parent node id.
    #[serde(rename = "pId", default, skip_serializing_if = "Nullable::is_missing")]
    pub parent_id: Nullable<String>,
    /// Chart name, e.g. `ZBAA-2F:APDC`.
    #[serde(default, skip_serializing_if = "Nullable::is_missing")]
    pub name: Nullable<String>,
    /// Airport code. Only set on the first row of an airport.
    #[serde(default, skip_serializing_if = "Nullable::is_missing")]
    pub airporticao: Nullable<String>,
    /// Localized name.
    #[serde(default, skip_serializing_if = "Nullable::is_missing")]
    pub name_cn: Nullable<String>,
    /// Path of the PDF document.
    #[serde(rename = "pdfPath", default, skip_serializing_if = "Nullable::is_missing")]
    pub pdf_path: Nullable<String>,
    /// Path of the HTML document.
    #[serde(rename = "htmlPath", default, skip_serializing_if = "Nullable::is_missing")]
    pub html_path: Nullable<String>,
    /// Path of the English HTML document.
    #[serde(rename = "htmlEnPath", default, skip_serializing_if = "Nullable::is_missing")]
    pub html_en_path: Nullable<String>,
    /// Tree expansion state as published.
    #[serde(rename = "isOpened", default, skip_serializing_if = "Nullable::is_missing")]
    pub is_opened: Nullable<bool>,
    /// `Y` when the row changed in this cycle.
    #[serde(rename = "Is_Modified", default, skip_serializing_if = "Nullable::is_missing")]
    pub modified_flag: Nullable<String>,
    /// Fields we do not model, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChartEntry {
    /// Create an entry carrying only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Nullable::Value(name.into()),
            ..Self::default()
        }
    }

    /// Set the airport code, making this an anchor row.
    #[must_use]
    pub fn with_icao(mut self, icao: impl Into<String>) -> Self {
        self.airporticao = Nullable::Value(icao.into());
        self
    }

    /// Set the localized name.
    #[must_use]
    pub fn with_name_cn(mut self, name_cn: impl Into<String>) -> Self {
        self.name_cn = Nullable::Value(name_cn.into());
        self
    }

    /// Set the PDF path.
    #[must_use]
    pub fn with_pdf_path(mut self, path: impl Into<String>) -> Self {
        self.pdf_path = Nullable::Value(path.into());
        self
    }

    /// Flag the entry as modified.
    #[must_use]
    pub fn modified(mut self) -> Self {
        self.modified_flag = Nullable::Value(MODIFIED_MARKER.to_string());
        self
    }

    /// The name, or an empty string.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// The localized name, or an empty string.
    #[must_use]
    pub fn name_cn(&self) -> &str {
        self.name_cn.as_deref().unwrap_or_default()
    }

    /// The trimmed, upper-cased airport code if this row is an anchor.
    #[must_use]
    pub fn anchor_icao(&self) -> Option<String> {
        self.airporticao
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_uppercase)
    }

    /// Whether a PDF path is present.
    #[must_use]
    pub fn has_pdf(&self) -> bool {
        self.pdf_path.as_deref().is_some_and(|p| !p.trim().is_empty())
    }

    /// Look up an unmodelled string field.
    #[must_use]
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

/// A row of the circular listings (SUP and AIC share this shape).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CircularEntry {
    /// Publisher id.
    #[serde(default, skip_serializing_if = "Nullable::is_missing")]
    pub id: Nullable<String>,
    /// Path of the document.
    #[serde(default, skip_serializing_if = "Nullable::is_missing")]
    pub document: Nullable<String>,
    /// Chapter the circular is filed under.
    #[serde(rename = "CHAPTER_TYPE", default, skip_serializing_if = "Nullable::is_missing")]
    pub chapter_type: Nullable<String>,
    /// Serial number.
    #[serde(default, skip_serializing_if = "Nullable::is_missing")]
    pub serial: Nullable<String>,
    /// Subject line.
    #[serde(default, skip_serializing_if = "Nullable::is_missing")]
    pub subject: Nullable<String>,
    /// Localized subject line.
    #[serde(rename = "Local_Subject", default, skip_serializing_if = "Nullable::is_missing")]
    pub local_subject: Nullable<String>,
    /// `Y` when the circular changed in this cycle.
    #[serde(rename = "IS_MODIFIED", default, skip_serializing_if = "Nullable::is_missing")]
    pub modified_flag: Nullable<String>,
    /// Effective time as published.
    #[serde(rename = "Effective_Time", default, skip_serializing_if = "Nullable::is_missing")]
    pub effective_time: Nullable<String>,
    /// Expiry date as published.
    #[serde(rename = "Out_Date", default, skip_serializing_if = "Nullable::is_missing")]
    pub out_date: Nullable<String>,
    /// Publication date as published.
    #[serde(rename = "Pub_Date", default, skip_serializing_if = "Nullable::is_missing")]
    pub pub_date: Nullable<String>,
    /// Fields we do not model, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CircularEntry {
    /// Create an entry with a subject and document path.
    #[must_use]
    pub fn new(subject: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            subject: Nullable::Value(subject.into()),
            document: Nullable::Value(document.into()),
            ..Self::default()
        }
    }

    /// Set the chapter.
    #[must_use]
    pub fn with_chapter(mut self, chapter: impl Into<String>) -> Self {
        self.chapter_type = Nullable::Value(chapter.into());
        self
    }

    /// Flag the entry as modified.
    #[must_use]
    pub fn modified(mut self) -> Self {
        self.modified_flag = Nullable::Value(MODIFIED_MARKER.to_string());
        self
    }

    /// Whether a document path is present.
    #[must_use]
    pub fn has_document(&self) -> bool {
        self.document.as_deref().is_some_and(|d| !d.trim().is_empty())
    }
}

/// A NOTAM series document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NotamRecord {
    /// Series name.
    #[serde(default, skip_serializing_if = "Nullable::is_missing")]
    pub series_name: Nullable<String>,
    /// Path of the document.
    #[serde(default, skip_serializing_if = "Nullable::is_missing")]
    pub document: Nullable<String>,
    /// Generation time as published.
    #[serde(default, skip_serializing_if = "Nullable::is_missing")]
    pub generate_time: Nullable<String>,
    /// English generation time as published.
    #[serde(rename = "GenerateTime_En", default, skip_serializing_if = "Nullable::is_missing")]
    pub generate_time_en: Nullable<String>,
    /// Fields we do not model, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NotamRecord {
    /// Create a record for a series document.
    #[must_use]
    pub fn new(series_name: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            series_name: Nullable::Value(series_name.into()),
            document: Nullable::Value(document.into()),
            ..Self::default()
        }
    }

    /// Whether a document path is present.
    #[must_use]
    pub fn has_document(&self) -> bool {
        self.document.as_deref().is_some_and(|d| !d.trim().is_empty())
    }
}

impl CategoryRecord for NotamRecord {
    const CATEGORY: Category = Category::Notam;

    fn is_modified(&self) -> bool {
        false
    }
}

/// Aerodrome chart row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdRecord(pub ChartEntry);

/// Enroute chart row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnrRecord(pub ChartEntry);

/// Amendment row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AmdtRecord(pub ChartEntry);

/// Supplement row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupRecord(pub CircularEntry);

/// Information circular row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AicRecord(pub CircularEntry);

impl Deref for AdRecord {
    type Target = ChartEntry;

    fn deref(&self) -> &ChartEntry {
        &self.0
    }
}

impl DerefMut for AdRecord {
    fn deref_mut(&mut self) -> &mut ChartEntry {
        &mut self.0
    }
}

impl From<ChartEntry> for AdRecord {
    fn from(entry: ChartEntry) -> Self {
        Self(entry)
    }
}

impl CategoryRecord for AdRecord {
    const CATEGORY: Category = Category::Ad;

    fn is_modified(&self) -> bool {
        is_marker(self.modified_flag.as_deref())
    }
}

impl Deref for EnrRecord {
    type Target = ChartEntry;

    fn deref(&self) -> &ChartEntry {
        &self.0
    }
}

impl From<ChartEntry> for EnrRecord {
    fn from(entry: ChartEntry) -> Self {
        Self(entry)
    }
}

impl CategoryRecord for EnrRecord {
    const CATEGORY: Category = Category::Enr;

    fn is_modified(&self) -> bool {
        is_marker(self.modified_flag.as_deref())
    }
}

impl Deref for AmdtRecord {
    type Target = ChartEntry;

    fn deref(&self) -> &ChartEntry {
        &self.0
    }
}

impl From<ChartEntry> for AmdtRecord {
    fn from(entry: ChartEntry) -> Self {
        Self(entry)
    }
}

impl CategoryRecord for AmdtRecord {
    const CATEGORY: Category = Category::Amdt;

    fn is_modified(&self) -> bool {
        is_marker(self.modified_flag.as_deref())
    }
}

impl Deref for SupRecord {
    type Target = CircularEntry;

    fn deref(&self) -> &CircularEntry {
        &self.0
    }
}

impl From<CircularEntry> for SupRecord {
    fn from(entry: CircularEntry) -> Self {
        Self(entry)
    }
}

impl CategoryRecord for SupRecord {
    const CATEGORY: Category = Category::Sup;

    fn is_modified(&self) -> bool {
        is_marker(self.modified_flag.as_deref())
    }
}

impl Deref for AicRecord {
    type Target = CircularEntry;

    fn deref(&self) -> &CircularEntry {
        &self.0
    }
}

impl From<CircularEntry> for AicRecord {
    fn from(entry: CircularEntry) -> Self {
        Self(entry)
    }
}

impl CategoryRecord for AicRecord {
    const CATEGORY: Category = Category::Aic;

    fn is_modified(&self) -> bool {
        is_marker(self.modified_flag.as_deref())
    }
}
