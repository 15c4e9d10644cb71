//! Closed grading vocabularies and presentation classification tables.
//!
//! The vocabularies are known at build time and used to *validate* incoming
//! records and canonicalize spelling. They never restrict what the filter
//! layer offers: values outside a table still flow through and land in the
//! [`OTHER_BUCKET`] when grouped.

use serde::{Deserialize, Serialize};

/// Bucket name for values absent from a classification table.
pub const OTHER_BUCKET: &str = "Other";

/// A named presentation bucket and the canonical values it holds.
#[derive(Debug, Clone, Copy)]
pub struct Classification {
    pub bucket: &'static str,
    pub values: &'static [&'static str],
}

pub const SHAPE_GROUPS: &[Classification] = &[
    Classification {
        bucket: "Classic",
        values: &["Round", "Princess", "Cushion", "Oval", "Emerald", "Pear"],
    },
    Classification {
        bucket: "Fancy",
        values: &["Marquise", "Radiant", "Asscher", "Heart", "Baguette", "Trillion"],
    },
    Classification {
        bucket: "Unique",
        values: &[
            "Old European",
            "Old Mine",
            "Rose Cut",
            "Briolette",
            "Kite",
            "Half Moon",
            "Shield",
            "Hexagon",
        ],
    },
];

pub const COLOR_GROUPS: &[Classification] = &[
    Classification {
        bucket: "Colorless",
        values: &["D", "E", "F"],
    },
    Classification {
        bucket: "Near Colorless",
        values: &["G", "H", "I", "J"],
    },
    Classification {
        bucket: "Faint",
        values: &["K", "L", "M"],
    },
    Classification {
        bucket: "Light",
        values: &[
            "N", "O", "P", "Q", "R", "S", "T", "U", "V", "W", "X", "Y", "Z",
        ],
    },
    Classification {
        bucket: "Fancy",
        values: &[
            "Fancy Yellow",
            "Fancy Pink",
            "Fancy Blue",
            "Fancy Green",
            "Fancy Brown",
            "Fancy Black",
        ],
    },
];

pub const CLARITY_GROUPS: &[Classification] = &[
    Classification {
        bucket: "Flawless",
        values: &["FL", "IF"],
    },
    Classification {
        bucket: "Very Very Slightly Included",
        values: &["VVS1", "VVS2"],
    },
    Classification {
        bucket: "Very Slightly Included",
        values: &["VS1", "VS2"],
    },
    Classification {
        bucket: "Slightly Included",
        values: &["SI1", "SI2"],
    },
    Classification {
        bucket: "Included",
        values: &["I1", "I2", "I3"],
    },
];

pub const CUT_GROUPS: &[Classification] = &[
    Classification {
        bucket: "Premium",
        values: &["Ideal", "Excellent"],
    },
    Classification {
        bucket: "Standard",
        values: &["Very Good", "Good"],
    },
    Classification {
        bucket: "Commercial",
        values: &["Fair", "Poor"],
    },
];

pub const GROWTH_TYPES: &[&str] = &["Natural", "Lab Grown", "CVD", "HPHT"];

/// Graded item attributes that have a closed vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradedField {
    Shape,
    Color,
    Clarity,
    Cut,
    GrowthType,
}

impl GradedField {
    pub const ALL: [GradedField; 5] = [
        GradedField::Shape,
        GradedField::Color,
        GradedField::Clarity,
        GradedField::Cut,
        GradedField::GrowthType,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GradedField::Shape => "shape",
            GradedField::Color => "color",
            GradedField::Clarity => "clarity",
            GradedField::Cut => "cut",
            GradedField::GrowthType => "growth_type",
        }
    }

    /// Presentation table for this field, if it is grouped.
    pub fn groups(&self) -> Option<&'static [Classification]> {
        match self {
            GradedField::Shape => Some(SHAPE_GROUPS),
            GradedField::Color => Some(COLOR_GROUPS),
            GradedField::Clarity => Some(CLARITY_GROUPS),
            GradedField::Cut => Some(CUT_GROUPS),
            GradedField::GrowthType => None,
        }
    }

    /// Every canonical value known for this field.
    pub fn known_values(&self) -> Vec<&'static str> {
        match self.groups() {
            Some(groups) => groups.iter().flat_map(|g| g.values.iter().copied()).collect(),
            None => GROWTH_TYPES.to_vec(),
        }
    }

    /// Canonical spelling of `value` if the vocabulary knows it.
    ///
    /// Matching ignores ASCII case and surrounding whitespace.
    pub fn canonical(&self, value: &str) -> Option<&'static str> {
        let value = value.trim();
        self.known_values()
            .into_iter()
            .find(|known| known.eq_ignore_ascii_case(value))
    }
}

/// Bucket name for `value` in `table`, or [`OTHER_BUCKET`].
pub fn classify(table: &[Classification], value: &str) -> &'static str {
    table
        .iter()
        .find(|group| group.values.iter().any(|v| v.eq_ignore_ascii_case(value)))
        .map(|group| group.bucket)
        .unwrap_or(OTHER_BUCKET)
}
