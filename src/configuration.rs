//! Heading configuration: which spreadsheet column feeds which part of a listing
//!
//! A [`HeadingConfig`] is built by the configuration wizard, encoded into the
//! `urlConfig` query parameter of a share link, and decoded again on the
//! listing page. On the wire it is a JSON object whose keys are field names:
//!
//! ```json
//! { "Filtable Title": "Grants", "Title": "Name", "Text 1": "Agency", "Checkbox": ["Category"] }
//! ```
//!
//! Inside the crate every entry is a [`FieldBinding`], so lookups are exhaustive
//! matches instead of string-keyed access.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use lazy_static::lazy_static;
use log::warn;
use regex::Regex;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::dataset::{Row, cell};
use crate::error::{DecodeError, FiltableError, Result};

pub const LISTING_TITLE_KEY: &str = "Filtable Title";
pub const TITLE_KEY: &str = "Title";
pub const DESCRIPTION_KEY: &str = "Description";
pub const LINK_KEY: &str = "Link";

lazy_static! {
    static ref TEXT_KEY_REGEX: Regex = Regex::new(r"^Text ([0-9]+)$").unwrap();
}

/// `urlConfig` alphabet: URL-safe, unpadded, padding tolerated on decode
const URL_CONFIG_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Kinds of filterable field a heading can be declared as
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FilterKeyword {
    /// Multi-value discrete filter
    #[default]
    Checkbox,
}

impl FilterKeyword {
    pub const ALL: [FilterKeyword; 1] = [FilterKeyword::Checkbox];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKeyword::Checkbox => "Checkbox",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == key)
    }
}

impl fmt::Display for FilterKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a heading configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldBinding {
    /// Literal name of the listing, not a heading
    ListingTitle(String),
    Title(String),
    Description(String),
    /// `Text N`, 1-based
    Text(usize, String),
    Link(String),
    Filter(FilterKeyword, String),
}

impl FieldBinding {
    /// Wire key of this binding
    pub fn key(&self) -> String {
        match self {
            FieldBinding::ListingTitle(_) => LISTING_TITLE_KEY.to_string(),
            FieldBinding::Title(_) => TITLE_KEY.to_string(),
            FieldBinding::Description(_) => DESCRIPTION_KEY.to_string(),
            FieldBinding::Text(index, _) => format!("Text {}", index),
            FieldBinding::Link(_) => LINK_KEY.to_string(),
            FieldBinding::Filter(kind, _) => kind.as_str().to_string(),
        }
    }

    /// Referenced heading, if this binding points at a column
    pub fn heading(&self) -> Option<&str> {
        match self {
            FieldBinding::ListingTitle(_) => None,
            FieldBinding::Title(h)
            | FieldBinding::Description(h)
            | FieldBinding::Text(_, h)
            | FieldBinding::Link(h)
            | FieldBinding::Filter(_, h) => Some(h),
        }
    }
}

/// A heading bound under a filter kind
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFilter {
    pub heading: String,
    pub kind: FilterKeyword,
}

/// Mapping from display and filter fields to dataset headings
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeadingConfig {
    listing_title: Option<String>,
    title: Option<String>,
    description: Option<String>,
    link: Option<String>,
    texts: BTreeMap<usize, String>,
    filters: Vec<ExtractedFilter>,
}

impl HeadingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one binding, replacing any previous value for the same field
    ///
    /// Filter bindings accumulate; binding the same (kind, heading) twice is a
    /// no-op. Texts are numbered from 1, so `Text 0` is ignored.
    pub fn bind(&mut self, binding: FieldBinding) {
        match binding {
            FieldBinding::ListingTitle(text) => self.listing_title = Some(text),
            FieldBinding::Title(h) => self.title = Some(h),
            FieldBinding::Description(h) => self.description = Some(h),
            FieldBinding::Text(0, h) => {
                warn!("ignoring text binding with index 0 for heading {:?}", h);
            }
            FieldBinding::Text(index, h) => {
                self.texts.insert(index, h);
            }
            FieldBinding::Link(h) => self.link = Some(h),
            FieldBinding::Filter(kind, heading) => {
                let filter = ExtractedFilter { heading, kind };
                if !self.filters.contains(&filter) {
                    self.filters.push(filter);
                }
            }
        }
    }

    /// Builder form of [`bind`](Self::bind)
    pub fn with(mut self, binding: FieldBinding) -> Self {
        self.bind(binding);
        self
    }

    pub fn unbind_filter(&mut self, kind: FilterKeyword, heading: &str) {
        self.filters
            .retain(|filter| !(filter.kind == kind && filter.heading == heading));
    }

    pub fn remove_text(&mut self, index: usize) {
        self.texts.remove(&index);
    }

    pub fn listing_title(&self) -> Option<&str> {
        self.listing_title.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    /// `Text N` bindings in ascending N
    pub fn texts(&self) -> impl Iterator<Item = (usize, &str)> {
        self.texts.iter().map(|(index, h)| (*index, h.as_str()))
    }

    /// Every binding in canonical order: listing title, title, description,
    /// texts, link, then filters in the order they were declared
    pub fn bindings(&self) -> Vec<FieldBinding> {
        let mut bindings = Vec::new();
        if let Some(text) = &self.listing_title {
            bindings.push(FieldBinding::ListingTitle(text.clone()));
        }
        if let Some(h) = &self.title {
            bindings.push(FieldBinding::Title(h.clone()));
        }
        if let Some(h) = &self.description {
            bindings.push(FieldBinding::Description(h.clone()));
        }
        for (index, h) in &self.texts {
            bindings.push(FieldBinding::Text(*index, h.clone()));
        }
        if let Some(h) = &self.link {
            bindings.push(FieldBinding::Link(h.clone()));
        }
        for filter in &self.filters {
            bindings.push(FieldBinding::Filter(filter.kind, filter.heading.clone()));
        }
        bindings
    }

    /// A listing can be published once its title column is chosen
    pub fn is_publishable(&self) -> bool {
        self.title.as_deref().is_some_and(|h| !h.is_empty())
    }

    /// # Errors
    /// * `FiltableError::InvalidConfiguration` if no title column is bound
    pub fn validate_for_publish(&self) -> Result<()> {
        if self.is_publishable() {
            Ok(())
        } else {
            Err(FiltableError::InvalidConfiguration)
        }
    }

    /// Heading references that the given dataset does not have
    ///
    /// Shared links can outlive the sheet layout they were made for; such
    /// references resolve to placeholders rather than failing.
    pub fn unknown_headings(&self, headings: &[String]) -> Vec<String> {
        let mut unknown: Vec<String> = Vec::new();
        for binding in self.bindings() {
            let Some(heading) = binding.heading() else {
                continue;
            };
            if heading.is_empty()
                || headings.iter().any(|h| h == heading)
                || unknown.iter().any(|h| h == heading)
            {
                continue;
            }
            unknown.push(heading.to_string());
        }
        unknown
    }
}

impl Serialize for HeadingConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for binding in self.bindings() {
            match &binding {
                // Written below, one key per kind
                FieldBinding::Filter(..) => {}
                FieldBinding::ListingTitle(v)
                | FieldBinding::Title(v)
                | FieldBinding::Description(v)
                | FieldBinding::Text(_, v)
                | FieldBinding::Link(v) => map.serialize_entry(&binding.key(), v)?,
            }
        }
        for (kind, headings) in process_extracted_filters(&self.filters).iter() {
            match headings {
                [] => {}
                [heading] => map.serialize_entry(kind.as_str(), heading)?,
                many => map.serialize_entry(kind.as_str(), many)?,
            }
        }
        map.end()
    }
}

/// A filter key may bind a single heading or a list of them
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

struct HeadingConfigVisitor;

impl<'de> Visitor<'de> for HeadingConfigVisitor {
    type Value = HeadingConfig;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a heading configuration object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<HeadingConfig, A::Error> {
        let mut config = HeadingConfig::new();
        let mut seen: Vec<String> = Vec::new();

        while let Some(key) = access.next_key::<String>()? {
            if seen.contains(&key) {
                return Err(de::Error::custom(format!("duplicate key `{}`", key)));
            }

            match key.as_str() {
                LISTING_TITLE_KEY => {
                    if let Some(v) = access.next_value::<Option<String>>()? {
                        config.bind(FieldBinding::ListingTitle(v));
                    }
                }
                TITLE_KEY => {
                    if let Some(v) = access.next_value::<Option<String>>()? {
                        config.bind(FieldBinding::Title(v));
                    }
                }
                DESCRIPTION_KEY => {
                    if let Some(v) = access.next_value::<Option<String>>()? {
                        config.bind(FieldBinding::Description(v));
                    }
                }
                LINK_KEY => {
                    if let Some(v) = access.next_value::<Option<String>>()? {
                        config.bind(FieldBinding::Link(v));
                    }
                }
                other => {
                    if let Some(kind) = FilterKeyword::from_key(other) {
                        let headings = match access.next_value::<OneOrMany>()? {
                            OneOrMany::One(h) => vec![h],
                            OneOrMany::Many(hs) => hs,
                        };
                        for heading in headings {
                            config.bind(FieldBinding::Filter(kind, heading));
                        }
                    } else if let Some(index) = parse_text_index(other) {
                        let heading = access.next_value::<String>()?;
                        config.bind(FieldBinding::Text(index, heading));
                    } else {
                        return Err(de::Error::custom(format!(
                            "unknown configuration key `{}`",
                            other
                        )));
                    }
                }
            }

            seen.push(key);
        }

        Ok(config)
    }
}

impl<'de> Deserialize<'de> for HeadingConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(HeadingConfigVisitor)
    }
}

/// `Text N` with N >= 1
fn parse_text_index(key: &str) -> Option<usize> {
    let captures = TEXT_KEY_REGEX.captures(key)?;
    let index: usize = captures[1].parse().ok()?;
    (index >= 1).then_some(index)
}

/// Filter bindings of a configuration, in declaration order
///
/// Display fields (listing title, title, description, texts, link) are never
/// part of the result. A configuration without filter keys yields an empty list.
pub fn extract_filters(configuration: &HeadingConfig) -> Vec<ExtractedFilter> {
    configuration
        .bindings()
        .into_iter()
        .filter_map(|binding| match binding {
            FieldBinding::Filter(kind, heading) => Some(ExtractedFilter { heading, kind }),
            FieldBinding::ListingTitle(_)
            | FieldBinding::Title(_)
            | FieldBinding::Description(_)
            | FieldBinding::Text(..)
            | FieldBinding::Link(_) => None,
        })
        .collect()
}

/// Filterable headings grouped by kind
///
/// Every known kind is always present, possibly with an empty list, so callers
/// can index by kind without checking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProcessedFilters(BTreeMap<FilterKeyword, Vec<String>>);

impl ProcessedFilters {
    pub fn new() -> Self {
        ProcessedFilters(
            FilterKeyword::ALL
                .into_iter()
                .map(|kind| (kind, Vec::new()))
                .collect(),
        )
    }

    pub fn get(&self, kind: FilterKeyword) -> &[String] {
        self.0.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (FilterKeyword, &[String])> {
        self.0.iter().map(|(kind, headings)| (*kind, headings.as_slice()))
    }

    /// True when no heading is filterable under any kind
    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }
}

impl Default for ProcessedFilters {
    fn default() -> Self {
        Self::new()
    }
}

/// Group extracted filters by kind, keeping their relative order
pub fn process_extracted_filters(extracted_filters: &[ExtractedFilter]) -> ProcessedFilters {
    let mut processed = ProcessedFilters::new();
    for filter in extracted_filters {
        processed
            .0
            .entry(filter.kind)
            .or_default()
            .push(filter.heading.clone());
    }
    processed
}

/// Encode configurations into an opaque string for the `urlConfig` parameter
///
/// The payload is a JSON array of configuration objects in URL-safe base64.
///
/// # Examples
/// ```
/// use filtable::configuration::{decode_config, encode_config, FieldBinding, HeadingConfig};
///
/// let config = HeadingConfig::new().with(FieldBinding::Title("Name".into()));
/// let encoded = encode_config(std::slice::from_ref(&config));
/// assert_eq!(decode_config(&encoded).unwrap(), vec![config]);
/// ```
pub fn encode_config(configs: &[HeadingConfig]) -> String {
    // Maps of strings always serialize
    let json = serde_json::to_vec(configs).unwrap_or_default();
    URL_CONFIG_ENGINE.encode(json)
}

/// Decode a `urlConfig` parameter
///
/// Accepts an encoded array of configurations or a single encoded object.
///
/// # Errors
/// * `DecodeError` on bad base64, non UTF-8 bytes, malformed JSON, unknown keys
///   or wrongly shaped values. A partial configuration is never returned.
pub fn decode_config(encoded: &str) -> std::result::Result<Vec<HeadingConfig>, DecodeError> {
    let bytes = URL_CONFIG_ENGINE.decode(encoded.trim())?;
    let text = String::from_utf8(bytes)?;
    let value: serde_json::Value = serde_json::from_str(&text)?;

    let configs: Vec<HeadingConfig> = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    Ok(configs)
}

/// Resolve the configuration of a listing page from its `urlConfig` parameter
///
/// # Errors
/// * `FiltableError::MissingConfiguration` if the parameter is absent or holds
///   no configuration
/// * `FiltableError::Decode` if it cannot be decoded
pub fn resolve_configuration(url_config: Option<&str>) -> Result<HeadingConfig> {
    let encoded = url_config
        .filter(|s| !s.trim().is_empty())
        .ok_or(FiltableError::MissingConfiguration)?;
    decode_config(encoded)?
        .into_iter()
        .next()
        .ok_or(FiltableError::MissingConfiguration)
}

/// A (heading, value) pair shown as a chip
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub heading: String,
    pub value: String,
}

impl Tag {
    pub fn new(heading: impl Into<String>, value: impl Into<String>) -> Self {
        Tag {
            heading: heading.into(),
            value: value.into(),
        }
    }
}

/// Display strings for each `Text N` binding, in ascending N
///
/// Unbound texts, unknown headings and empty cells render as `<Text N>`.
pub fn extract_texts(row: &Row, configuration: &HeadingConfig) -> Vec<String> {
    configuration
        .texts()
        .map(|(index, heading)| {
            cell(row, heading)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("<Text {}>", index))
        })
        .collect()
}

/// Tags of a row for every filter binding, grouped by kind
///
/// A missing cell renders as `<heading>`.
pub fn extract_tags(row: &Row, configuration: &HeadingConfig) -> BTreeMap<FilterKeyword, Vec<Tag>> {
    let mut tags: BTreeMap<FilterKeyword, Vec<Tag>> =
        FilterKeyword::ALL.into_iter().map(|kind| (kind, Vec::new())).collect();

    for filter in extract_filters(configuration) {
        let value = cell(row, &filter.heading)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("<{}>", filter.heading));
        tags.entry(filter.kind)
            .or_default()
            .push(Tag::new(filter.heading, value));
    }
    tags
}

/// Flatten grouped tags into the chip list shown on a listing card
pub fn convert_collection_of_tags(collection: BTreeMap<FilterKeyword, Vec<Tag>>) -> Vec<Tag> {
    collection.into_values().flatten().collect()
}

/// Rebuild `Text 1..N` from the wizard's ordered text list
///
/// Text bindings already in the configuration are replaced, so removing a row
/// in the wizard removes its binding.
pub fn merge_texts_into_config(configuration: &HeadingConfig, texts: &[String]) -> HeadingConfig {
    let mut merged = configuration.clone();
    merged.texts.clear();
    for (idx, text) in texts.iter().enumerate() {
        merged.bind(FieldBinding::Text(idx + 1, text.clone()));
    }
    merged
}

/// Listing card rendered from the sample row during configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPreview {
    pub title: String,
    pub description: String,
    pub list_of_texts: Vec<String>,
    pub converted_collection_of_tags: Vec<Tag>,
    pub link: String,
}

fn lookup_or(row: &Row, heading: Option<&str>, placeholder: &str) -> String {
    heading
        .and_then(|h| cell(row, h))
        .unwrap_or(placeholder)
        .to_string()
}

/// Project the sample row through a configuration
pub fn preview_listing(row: &Row, configuration: &HeadingConfig) -> ListingPreview {
    ListingPreview {
        title: lookup_or(row, configuration.title(), "<Title>"),
        description: lookup_or(row, configuration.description(), "<Description>"),
        list_of_texts: extract_texts(row, configuration),
        converted_collection_of_tags: convert_collection_of_tags(extract_tags(row, configuration)),
        link: lookup_or(row, configuration.link(), "<link>"),
    }
}
