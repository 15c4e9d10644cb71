//! Catalog data models.
//!
//! Two layers live here: the loose `Raw*` shapes accepted from the remote
//! document store or the bundled dataset, and the normalized records every
//! downstream consumer reads. Raw shapes tolerate missing fields and mixed
//! scalar types; normalized records are total.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use crate::defaults::PLACEHOLDER_IMAGE;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Item identity as delivered by the source: document key or numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Number(n) => write!(f, "{}", n),
            ItemId::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId::Text(s.to_string())
    }
}

impl From<i64> for ItemId {
    fn from(n: i64) -> Self {
        ItemId::Number(n)
    }
}

// =============================================================================
// RAW SHAPES
// =============================================================================

/// A scalar whose JSON type varies between sources (`"1.02"` vs `1.02`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawScalar {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    Other(JsonValue),
}

impl RawScalar {
    /// Trimmed text form; numbers are rendered, everything else is `None`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawScalar::Text(s) => Some(s.trim().to_string()),
            RawScalar::Number(n) => Some(n.to_string()),
            RawScalar::Bool(_) | RawScalar::Other(_) => None,
        }
    }

    /// Finite numeric form; numeric strings are parsed.
    pub fn as_f64(&self) -> Option<f64> {
        let n = match self {
            RawScalar::Number(n) => n.as_f64()?,
            RawScalar::Text(s) => s.trim().parse::<f64>().ok()?,
            RawScalar::Bool(_) | RawScalar::Other(_) => return None,
        };
        n.is_finite().then_some(n)
    }

    /// Boolean form; accepts `"true"`/`"false"` strings and 0/1.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RawScalar::Bool(b) => Some(*b),
            RawScalar::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            RawScalar::Number(n) => n.as_i64().map(|v| v != 0),
            RawScalar::Other(_) => None,
        }
    }
}

/// One value or a list of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawList {
    Many(Vec<JsonValue>),
    One(JsonValue),
}

impl RawList {
    /// Non-empty trimmed strings, in order.
    pub fn strings(&self) -> Vec<String> {
        let values: Vec<&JsonValue> = match self {
            RawList::Many(values) => values.iter().collect(),
            RawList::One(value) => vec![value],
        };
        values
            .into_iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Item document as stored upstream. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawItem {
    pub id: Option<RawScalar>,
    pub shape: Option<RawScalar>,
    pub color: Option<RawScalar>,
    pub clarity: Option<RawScalar>,
    pub cut: Option<RawScalar>,
    pub category: Option<RawScalar>,
    pub growth_type: Option<RawScalar>,
    pub location: Option<RawScalar>,
    pub supplier: Option<RawScalar>,
    pub carat: Option<RawScalar>,
    pub price: Option<RawScalar>,
    pub price_per_carat: Option<RawScalar>,
    pub certificate: Option<RawScalar>,
    pub description: Option<RawScalar>,
    pub image: Option<RawScalar>,
    pub video: Option<RawScalar>,
    pub additional_images: Option<RawList>,
    pub additional_videos: Option<RawList>,
    pub bestseller: Option<RawScalar>,
    pub show_on_index: Option<RawScalar>,
    pub show_in_gallery: Option<RawScalar>,
    #[serde(deserialize_with = "lenient_management")]
    pub management: Option<RawManagement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawManagement {
    pub status: Option<RawScalar>,
    pub priority: Option<RawScalar>,
    pub tags: Option<RawList>,
}

/// Accept any shape for `management`. A bare scalar is a legacy status;
/// anything else unreadable is dropped without touching the other fields.
fn lenient_management<'de, D>(deserializer: D) -> Result<Option<RawManagement>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = JsonValue::deserialize(deserializer)?;
    let management = match &value {
        JsonValue::Null => None,
        JsonValue::String(_) | JsonValue::Number(_) => Some(RawManagement {
            status: serde_json::from_value(value).ok(),
            ..RawManagement::default()
        }),
        _ => match serde_json::from_value(value) {
            Ok(management) => Some(management),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unreadable management block");
                None
            }
        },
    };
    Ok(management)
}

impl RawItem {
    /// Read a document, degrading to an empty record when it is not an object.
    pub fn from_value(value: &JsonValue) -> Self {
        match serde_json::from_value(value.clone()) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable item document, using defaults");
                RawItem::default()
            }
        }
    }
}

/// Category document as stored upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawCategory {
    pub id: Option<RawScalar>,
    pub value: Option<RawScalar>,
    #[serde(alias = "name")]
    pub label: Option<RawScalar>,
    pub color: Option<RawScalar>,
    pub icon: Option<RawScalar>,
    pub subcategories: Option<RawList>,
    pub created_at: Option<RawScalar>,
}

impl RawCategory {
    pub fn from_value(value: &JsonValue) -> Self {
        match serde_json::from_value(value.clone()) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable category document, using defaults");
                RawCategory::default()
            }
        }
    }
}

// =============================================================================
// ITEM RECORD
// =============================================================================

/// Lifecycle status from the management sub-document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagementStatus {
    #[default]
    Active,
    Draft,
    Archived,
    SoldOut,
    Unknown(String),
}

impl ManagementStatus {
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "" | "active" => ManagementStatus::Active,
            "draft" => ManagementStatus::Draft,
            "archived" => ManagementStatus::Archived,
            "sold_out" | "soldout" | "sold-out" | "sold" => ManagementStatus::SoldOut,
            other => ManagementStatus::Unknown(other.to_string()),
        }
    }
}

/// Merchandising priority from the management sub-document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Featured,
    Unknown(String),
}

impl Priority {
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "low" => Priority::Low,
            "" | "normal" | "medium" => Priority::Normal,
            "high" => Priority::High,
            "featured" => Priority::Featured,
            other => Priority::Unknown(other.to_string()),
        }
    }
}

/// Management metadata; inert when absent upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Management {
    pub status: ManagementStatus,
    pub priority: Priority,
    pub tags: Vec<String>,
}

/// Media attached to an item. `image` is never empty after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub image: String,
    pub video: Option<String>,
    pub additional_images: Vec<String>,
    pub additional_videos: Vec<String>,
}

impl Default for Media {
    fn default() -> Self {
        Self {
            image: PLACEHOLDER_IMAGE.to_string(),
            video: None,
            additional_images: Vec::new(),
            additional_videos: Vec::new(),
        }
    }
}

/// The reference a card should render first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaRef<'a> {
    Image(&'a str),
    Video(&'a str),
    Placeholder(&'a str),
}

impl Media {
    pub fn has_real_image(&self) -> bool {
        self.image != PLACEHOLDER_IMAGE
    }

    /// Primary displayable media: real image, then video, then placeholder.
    pub fn primary(&self) -> MediaRef<'_> {
        if self.has_real_image() {
            MediaRef::Image(&self.image)
        } else if let Some(video) = self.video.as_deref() {
            MediaRef::Video(video)
        } else {
            MediaRef::Placeholder(&self.image)
        }
    }
}

/// One normalized catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: ItemId,
    pub shape: String,
    pub color: String,
    pub clarity: String,
    pub cut: String,
    pub category: String,
    pub growth_type: String,
    pub location: String,
    pub supplier: String,
    pub carat: f64,
    /// Price exactly as formatted upstream; see [`ItemRecord::price_value`].
    pub price: String,
    pub price_per_carat: f64,
    pub certificate: String,
    pub description: String,
    pub media: Media,
    pub bestseller: bool,
    pub show_on_index: bool,
    pub show_in_gallery: bool,
    pub management: Management,
    /// Graded fields whose value is outside the known vocabulary.
    pub unknown_fields: Vec<crate::catalog::GradedField>,
}

impl ItemRecord {
    /// Numeric total price, 0 when the formatted string is not a number.
    pub fn price_value(&self) -> f64 {
        parse_price(&self.price)
    }

    pub fn is_fully_graded(&self) -> bool {
        self.unknown_fields.is_empty()
    }
}

/// Parse a currency-formatted price such as `"$12,345.50"`.
///
/// Currency symbols, thousands separators and whitespace are ignored.
/// Anything that is still not a finite, non-negative number yields 0.
pub fn parse_price(formatted: &str) -> f64 {
    let cleaned: String = formatted
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => v,
        _ => 0.0,
    }
}

// =============================================================================
// CATEGORY RECORD
// =============================================================================

/// Icon keys understood by the catalog UI.
///
/// Unrecognized keys resolve to [`CategoryIcon::Unknown`] so missing
/// mappings stay visible instead of silently rendering a default.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryIcon {
    Gem,
    Diamond,
    Ring,
    Necklace,
    Earrings,
    Bracelet,
    Sparkles,
    Crown,
    Star,
    Heart,
    Leaf,
    Flask,
    Unknown(String),
}

impl CategoryIcon {
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "gem" => CategoryIcon::Gem,
            "diamond" => CategoryIcon::Diamond,
            "ring" => CategoryIcon::Ring,
            "necklace" => CategoryIcon::Necklace,
            "earrings" => CategoryIcon::Earrings,
            "bracelet" => CategoryIcon::Bracelet,
            "sparkles" => CategoryIcon::Sparkles,
            "crown" => CategoryIcon::Crown,
            "star" => CategoryIcon::Star,
            "heart" => CategoryIcon::Heart,
            "leaf" => CategoryIcon::Leaf,
            "flask" => CategoryIcon::Flask,
            other => CategoryIcon::Unknown(other.to_string()),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            CategoryIcon::Gem => "gem",
            CategoryIcon::Diamond => "diamond",
            CategoryIcon::Ring => "ring",
            CategoryIcon::Necklace => "necklace",
            CategoryIcon::Earrings => "earrings",
            CategoryIcon::Bracelet => "bracelet",
            CategoryIcon::Sparkles => "sparkles",
            CategoryIcon::Crown => "crown",
            CategoryIcon::Star => "star",
            CategoryIcon::Heart => "heart",
            CategoryIcon::Leaf => "leaf",
            CategoryIcon::Flask => "flask",
            CategoryIcon::Unknown(key) => key,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, CategoryIcon::Unknown(_))
    }
}

/// One catalog category, built-in or custom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: String,
    pub value: String,
    pub label: String,
    pub color: String,
    pub icon: CategoryIcon,
    pub subcategories: Vec<String>,
    pub built_in: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// Fields for a new custom category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub value: String,
    pub label: String,
    pub color: String,
    pub icon: CategoryIcon,
    #[serde(default)]
    pub subcategories: Vec<String>,
}

/// Partial update of a custom category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryPatch {
    pub label: Option<String>,
    pub color: Option<String>,
    pub icon: Option<CategoryIcon>,
    pub subcategories: Option<Vec<String>>,
}

impl CategoryPatch {
    pub fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.color.is_none()
            && self.icon.is_none()
            && self.subcategories.is_none()
    }
}

/// Interpret a creation stamp: RFC 3339 text or epoch milliseconds.
pub(crate) fn parse_timestamp(raw: &RawScalar) -> Option<DateTime<Utc>> {
    match raw {
        RawScalar::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        RawScalar::Text(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        RawScalar::Bool(_) | RawScalar::Other(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_id_untagged() {
        let n: ItemId = serde_json::from_value(json!(42)).unwrap();
        let s: ItemId = serde_json::from_value(json!("abc")).unwrap();
        assert_eq!(n, ItemId::Number(42));
        assert_eq!(s, ItemId::Text("abc".into()));
        assert_eq!(n.to_string(), "42");
    }

    #[test]
    fn test_raw_scalar_coercions() {
        let text = RawScalar::Text(" 1.25 ".into());
        assert_eq!(text.as_f64(), Some(1.25));
        assert_eq!(text.as_text().as_deref(), Some("1.25"));
        assert_eq!(RawScalar::Text("TRUE".into()).as_bool(), Some(true));
        assert_eq!(RawScalar::Text("maybe".into()).as_bool(), None);
        assert_eq!(RawScalar::Text("NaN".into()).as_f64(), None);
        assert_eq!(RawScalar::Other(json!({"a": 1})).as_text(), None);
    }

    #[test]
    fn test_raw_item_reads_camel_case() {
        let raw = RawItem::from_value(&json!({
            "id": "d-1",
            "pricePerCarat": 5000,
            "showOnIndex": true,
            "additionalImages": ["a.jpg", "", 7, "b.jpg"]
        }));
        assert_eq!(raw.price_per_carat.and_then(|p| p.as_f64()), Some(5000.0));
        assert_eq!(raw.show_on_index.and_then(|b| b.as_bool()), Some(true));
        assert_eq!(
            raw.additional_images.map(|l| l.strings()),
            Some(vec!["a.jpg".to_string(), "b.jpg".to_string()])
        );
    }

    #[test]
    fn test_raw_item_non_object_degrades() {
        assert_eq!(RawItem::from_value(&json!("oops")), RawItem::default());
    }

    #[test]
    fn test_raw_category_accepts_name_alias() {
        let raw = RawCategory::from_value(&json!({"name": "Rings"}));
        assert_eq!(
            raw.label.and_then(|l| l.as_text()).as_deref(),
            Some("Rings")
        );
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("$12,345.50"), 12345.5);
        assert_eq!(parse_price("4 200 €"), 4200.0);
        assert_eq!(parse_price("call for price"), 0.0);
        assert_eq!(parse_price(""), 0.0);
        assert_eq!(parse_price("-5"), 0.0);
        assert_eq!(parse_price("1.2.3"), 0.0);
    }

    #[test]
    fn test_icon_mapping_round_trip_and_unknown() {
        for key in ["gem", "diamond", "ring", "crown", "flask"] {
            assert_eq!(CategoryIcon::from_key(key).key(), key);
        }
        let unknown = CategoryIcon::from_key("unicorn");
        assert!(unknown.is_unknown());
        assert_eq!(unknown.key(), "unicorn");
    }

    #[test]
    fn test_management_keys() {
        assert_eq!(ManagementStatus::from_key("Sold-Out"), ManagementStatus::SoldOut);
        assert_eq!(ManagementStatus::from_key(""), ManagementStatus::Active);
        assert_eq!(
            ManagementStatus::from_key("pending"),
            ManagementStatus::Unknown("pending".into())
        );
        assert_eq!(Priority::from_key("HIGH"), Priority::High);
        assert_eq!(Priority::from_key(""), Priority::Normal);
    }

    #[test]
    fn test_media_primary_preference() {
        let mut media = Media::default();
        assert_eq!(media.primary(), MediaRef::Placeholder(PLACEHOLDER_IMAGE));

        media.video = Some("v.mp4".into());
        assert_eq!(media.primary(), MediaRef::Video("v.mp4"));

        media.image = "i.jpg".into();
        assert_eq!(media.primary(), MediaRef::Image("i.jpg"));
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let rfc = RawScalar::Text("2024-03-01T10:00:00Z".into());
        let millis = RawScalar::Number(serde_json::Number::from(1_709_287_200_000i64));
        assert_eq!(parse_timestamp(&rfc), parse_timestamp(&millis));
        assert!(parse_timestamp(&RawScalar::Text("yesterday".into())).is_none());
    }
}
