//! Built-in categories and the merge with custom ones.
//!
//! Built-ins are computed, never fetched, so the category list can always
//! fall back to a non-empty set. Merge order is fixed: built-ins first in
//! declaration order, then customs newest first.

use std::cmp::Ordering;

use tracing::warn;

use crate::models::{CategoryIcon, CategoryRecord};

/// Prefix shared by all built-in category ids.
pub const BUILT_IN_PREFIX: &str = "builtin-";

struct BuiltIn {
    slug: &'static str,
    value: &'static str,
    label: &'static str,
    color: &'static str,
    icon: &'static str,
    subcategories: &'static [&'static str],
}

const BUILT_INS: &[BuiltIn] = &[
    BuiltIn {
        slug: "natural",
        value: "natural-diamonds",
        label: "Natural Diamonds",
        color: "#2563eb",
        icon: "diamond",
        subcategories: &["Certified", "Melee"],
    },
    BuiltIn {
        slug: "lab-grown",
        value: "lab-grown-diamonds",
        label: "Lab-Grown Diamonds",
        color: "#059669",
        icon: "flask",
        subcategories: &["CVD", "HPHT"],
    },
    BuiltIn {
        slug: "fancy-color",
        value: "fancy-color",
        label: "Fancy Color",
        color: "#db2777",
        icon: "sparkles",
        subcategories: &["Yellow", "Pink", "Blue"],
    },
    BuiltIn {
        slug: "jewelry",
        value: "jewelry",
        label: "Jewelry",
        color: "#d97706",
        icon: "ring",
        subcategories: &["Rings", "Necklaces", "Earrings", "Bracelets"],
    },
];

/// The system-defined categories, in display order. Never empty.
pub fn built_in_categories() -> Vec<CategoryRecord> {
    BUILT_INS
        .iter()
        .map(|b| CategoryRecord {
            id: format!("{}{}", BUILT_IN_PREFIX, b.slug),
            value: b.value.to_string(),
            label: b.label.to_string(),
            color: b.color.to_string(),
            icon: CategoryIcon::from_key(b.icon),
            subcategories: b.subcategories.iter().map(|s| s.to_string()).collect(),
            built_in: true,
            created_at: None,
        })
        .collect()
}

/// Whether `id` names a built-in category.
pub fn is_built_in_id(id: &str) -> bool {
    BUILT_INS
        .iter()
        .any(|b| id.strip_prefix(BUILT_IN_PREFIX) == Some(b.slug))
}

/// Whether `value` is taken by a built-in category.
pub fn is_built_in_value(value: &str) -> bool {
    BUILT_INS.iter().any(|b| b.value.eq_ignore_ascii_case(value.trim()))
}

fn newest_first(a: &CategoryRecord, b: &CategoryRecord) -> Ordering {
    match (a.created_at, b.created_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.label.cmp(&b.label),
    }
}

/// Built-ins followed by `customs` sorted newest first.
///
/// Customs that reuse a built-in id or value are dropped so a remote
/// document can never shadow a system category.
pub fn merge_categories(customs: Vec<CategoryRecord>) -> Vec<CategoryRecord> {
    let mut customs: Vec<CategoryRecord> = customs
        .into_iter()
        .filter(|c| {
            let clash = is_built_in_id(&c.id) || is_built_in_value(&c.value);
            if clash {
                warn!(
                    category_id = %c.id,
                    value = %c.value,
                    "Custom category collides with a built-in, dropping"
                );
            }
            !clash
        })
        .collect();
    customs.sort_by(newest_first);

    let mut merged = built_in_categories();
    merged.extend(customs);
    merged
}
