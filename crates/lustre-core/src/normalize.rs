//! Normalization of raw documents into total records.
//!
//! Applied to every snapshot from either the remote subscription or the
//! bundled dataset. The functions here are pure: the same input always
//! yields the same records, and nothing downstream has to null-check.

use std::collections::HashSet;

use serde_json::Value as JsonValue;
use tracing::{debug, trace};

use crate::catalog::GradedField;
use crate::defaults::PLACEHOLDER_IMAGE;
use crate::models::{
    parse_price, parse_timestamp, CategoryIcon, CategoryRecord, ItemId, ItemRecord, Management,
    ManagementStatus, Media, Priority, RawCategory, RawItem, RawScalar,
};

fn text(field: &Option<RawScalar>) -> String {
    field.as_ref().and_then(RawScalar::as_text).unwrap_or_default()
}

fn flag(field: &Option<RawScalar>, default: bool) -> bool {
    field.as_ref().and_then(RawScalar::as_bool).unwrap_or(default)
}

fn number(field: &Option<RawScalar>) -> Option<f64> {
    field.as_ref().and_then(RawScalar::as_f64)
}

/// Canonicalize a graded value, recording it when the vocabulary does not know it.
fn graded(
    field: GradedField,
    raw: &Option<RawScalar>,
    unknown: &mut Vec<GradedField>,
) -> String {
    let value = text(raw);
    if value.is_empty() {
        return value;
    }
    match field.canonical(&value) {
        Some(canonical) => canonical.to_string(),
        None => {
            unknown.push(field);
            value
        }
    }
}

/// The id the document carries, if it carries a usable one.
fn upstream_id(raw: &Option<RawScalar>) -> Option<ItemId> {
    match raw.as_ref()? {
        RawScalar::Number(n) if n.is_i64() => n.as_i64().map(ItemId::Number),
        other => other.as_text().filter(|s| !s.is_empty()).map(ItemId::Text),
    }
}

fn synthetic_id(index: usize) -> ItemId {
    ItemId::Text(format!("item-{}", index))
}

/// Price per carat, never NaN or infinite.
///
/// A positive upstream value wins; otherwise it is derived from the total
/// price, and a zero carat weight yields 0.
pub fn compute_price_per_carat(stated: Option<f64>, price: f64, carat: f64) -> f64 {
    match stated {
        Some(ppc) if ppc > 0.0 => ppc,
        _ if carat > 0.0 && price > 0.0 => {
            let ppc = price / carat;
            if ppc.is_finite() {
                ppc
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

fn media(raw: &RawItem) -> Media {
    let mut additional_images = raw
        .additional_images
        .as_ref()
        .map(|l| l.strings())
        .unwrap_or_default();
    let additional_videos = raw
        .additional_videos
        .as_ref()
        .map(|l| l.strings())
        .unwrap_or_default();

    let mut image = text(&raw.image);
    if image.is_empty() && !additional_images.is_empty() {
        image = additional_images.remove(0);
    }
    if image.is_empty() {
        image = PLACEHOLDER_IMAGE.to_string();
    }

    let video = Some(text(&raw.video)).filter(|v| !v.is_empty());

    Media {
        image,
        video,
        additional_images,
        additional_videos,
    }
}

fn management(raw: &RawItem) -> Management {
    match &raw.management {
        Some(m) => Management {
            status: m
                .status
                .as_ref()
                .and_then(RawScalar::as_text)
                .map(|s| ManagementStatus::from_key(&s))
                .unwrap_or_default(),
            priority: m
                .priority
                .as_ref()
                .and_then(RawScalar::as_text)
                .map(|s| Priority::from_key(&s))
                .unwrap_or_default(),
            tags: m.tags.as_ref().map(|t| t.strings()).unwrap_or_default(),
        },
        None => Management::default(),
    }
}

/// Normalize one raw item. `index` is its position in the snapshot and
/// seeds a synthetic id when the document has none.
pub fn normalize_item(raw: &RawItem, index: usize) -> ItemRecord {
    let mut unknown_fields = Vec::new();
    let shape = graded(GradedField::Shape, &raw.shape, &mut unknown_fields);
    let color = graded(GradedField::Color, &raw.color, &mut unknown_fields);
    let clarity = graded(GradedField::Clarity, &raw.clarity, &mut unknown_fields);
    let cut = graded(GradedField::Cut, &raw.cut, &mut unknown_fields);
    let growth_type = graded(GradedField::GrowthType, &raw.growth_type, &mut unknown_fields);

    let carat = number(&raw.carat).filter(|c| *c > 0.0).unwrap_or(0.0);
    let price = text(&raw.price);
    let price_per_carat =
        compute_price_per_carat(number(&raw.price_per_carat), parse_price(&price), carat);

    let record = ItemRecord {
        id: upstream_id(&raw.id).unwrap_or_else(|| synthetic_id(index)),
        shape,
        color,
        clarity,
        cut,
        category: text(&raw.category),
        growth_type,
        location: text(&raw.location),
        supplier: text(&raw.supplier),
        carat,
        price,
        price_per_carat,
        certificate: text(&raw.certificate),
        description: text(&raw.description),
        media: media(raw),
        bestseller: flag(&raw.bestseller, false),
        show_on_index: flag(&raw.show_on_index, false),
        show_in_gallery: flag(&raw.show_in_gallery, true),
        management: management(raw),
        unknown_fields,
    };

    if !record.is_fully_graded() {
        debug!(
            item_id = %record.id,
            unknown = ?record.unknown_fields,
            "Item carries values outside the grading vocabulary"
        );
    }
    trace!(item_id = %record.id, carat = record.carat, "Normalized item");
    record
}

/// Normalize a whole snapshot of raw documents, preserving order.
///
/// Upstream ids are kept as delivered; duplicates among them are logged.
/// A synthetic id that would collide with an upstream one gets a suffix.
pub fn normalize_items(docs: &[JsonValue]) -> Vec<ItemRecord> {
    let raws: Vec<RawItem> = docs.iter().map(RawItem::from_value).collect();
    let mut items: Vec<ItemRecord> = raws
        .iter()
        .enumerate()
        .map(|(index, raw)| normalize_item(raw, index))
        .collect();

    let mut seen = HashSet::with_capacity(items.len());
    for (index, (item, raw)) in items.iter().zip(&raws).enumerate() {
        if upstream_id(&raw.id).is_some() && !seen.insert(item.id.clone()) {
            debug!(item_id = %item.id, index, "Duplicate item id in snapshot");
        }
    }
    for (index, (item, raw)) in items.iter_mut().zip(&raws).enumerate() {
        if upstream_id(&raw.id).is_some() {
            continue;
        }
        let mut suffix = 1;
        while seen.contains(&item.id) {
            let id = ItemId::Text(format!("item-{}-{}", index, suffix));
            debug!(item_id = %id, index, "Synthetic id collides with an upstream id");
            item.id = id;
            suffix += 1;
        }
        seen.insert(item.id.clone());
    }
    items
}

/// Normalize one custom category document.
///
/// Returns `None` when the document has neither a value nor a label to
/// identify it.
pub fn normalize_category(raw: &RawCategory) -> Option<CategoryRecord> {
    let label = text(&raw.label);
    let value = match text(&raw.value) {
        v if v.is_empty() => slugify(&label),
        v => v,
    };
    if value.is_empty() {
        return None;
    }
    let id = match text(&raw.id) {
        id if id.is_empty() => value.clone(),
        id => id,
    };
    let label = if label.is_empty() { value.clone() } else { label };

    Some(CategoryRecord {
        id,
        value,
        label,
        color: text(&raw.color),
        icon: CategoryIcon::from_key(&text(&raw.icon)),
        subcategories: raw
            .subcategories
            .as_ref()
            .map(|l| l.strings())
            .unwrap_or_default(),
        built_in: false,
        created_at: raw.created_at.as_ref().and_then(parse_timestamp),
    })
}

/// Normalize a snapshot of category documents, skipping unusable ones.
pub fn normalize_categories(docs: &[JsonValue]) -> Vec<CategoryRecord> {
    docs.iter()
        .filter_map(|doc| normalize_category(&RawCategory::from_value(doc)))
        .collect()
}

/// Lowercase, hyphen-separated form of a label.
pub fn slugify(label: &str) -> String {
    label
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
