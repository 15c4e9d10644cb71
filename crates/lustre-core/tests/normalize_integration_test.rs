//! Integration tests for normalizing whole upstream snapshots.
//!
//! Documents here mirror what the hosted collections actually contain:
//! mixed id types, formatted prices, string booleans and missing media.

use lustre_core::catalog::SHAPE_GROUPS;
use lustre_core::defaults::PLACEHOLDER_IMAGE;
use lustre_core::{
    built_in_categories, classify, merge_categories, normalize_categories, normalize_items,
    CategoryIcon, GradedField, ItemId, MediaRef, OTHER_BUCKET,
};
use serde_json::json;

#[test]
fn test_mixed_snapshot_normalizes_every_document() {
    let docs = vec![
        json!({
            "id": 101,
            "shape": "round",
            "color": "d",
            "clarity": "VS1",
            "carat": 1.5,
            "price": "$12,000",
            "image": "https://cdn.example/101.jpg",
            "bestseller": "true"
        }),
        json!({
            "id": "lot-7",
            "shape": "Kite",
            "carat": "0.75",
            "price": "call for price",
            "video": "https://cdn.example/lot-7.mp4",
            "showInGallery": false
        }),
        json!("not an object"),
        json!({
            "carat": 0,
            "price": "$900",
            "additionalImages": ["https://cdn.example/a.jpg", "https://cdn.example/b.jpg"]
        }),
    ];

    let items = normalize_items(&docs);
    assert_eq!(items.len(), 4);

    let first = &items[0];
    assert_eq!(first.id, ItemId::Number(101));
    assert_eq!(first.shape, "Round");
    assert_eq!(first.color, "D");
    assert_eq!(first.price_value(), 12_000.0);
    assert_eq!(first.price_per_carat, 8_000.0);
    assert!(first.bestseller);
    assert!(first.show_in_gallery);
    assert!(first.is_fully_graded());

    let second = &items[1];
    assert_eq!(second.id, ItemId::Text("lot-7".into()));
    assert_eq!(second.shape, "Kite");
    assert_eq!(second.unknown_fields, vec![GradedField::Shape]);
    assert_eq!(second.price_per_carat, 0.0);
    assert!(!second.show_in_gallery);
    assert_eq!(
        second.media.primary(),
        MediaRef::Video("https://cdn.example/lot-7.mp4")
    );

    let third = &items[2];
    assert_eq!(third.id, ItemId::Text("item-2".into()));
    assert_eq!(third.media.primary(), MediaRef::Placeholder(PLACEHOLDER_IMAGE));

    let fourth = &items[3];
    assert_eq!(fourth.id, ItemId::Text("item-3".into()));
    assert_eq!(fourth.price_per_carat, 0.0);
    assert_eq!(fourth.media.image, "https://cdn.example/a.jpg");
    assert_eq!(fourth.media.additional_images, vec!["https://cdn.example/b.jpg"]);

    for item in &items {
        assert!(item.price_per_carat.is_finite());
        assert!(!item.media.image.is_empty());
    }
}

#[test]
fn test_unknown_shape_lands_in_other_bucket() {
    let items = normalize_items(&[json!({"shape": "Kite"}), json!({"shape": "oval"})]);
    assert_eq!(classify(SHAPE_GROUPS, &items[0].shape), OTHER_BUCKET);
    assert_ne!(classify(SHAPE_GROUPS, &items[1].shape), OTHER_BUCKET);
}

#[test]
fn test_category_snapshot_merges_after_built_ins() {
    let docs = vec![
        json!({"id": "c1", "label": "Loose Melee", "icon": "gem", "createdAt": 1_000}),
        json!({"id": "c2", "name": "Bridal Sets", "createdAt": "2026-03-01T00:00:00Z"}),
        json!({"id": "c3"}),
        json!({"id": "c4", "value": "jewelry", "label": "Shadow"}),
    ];

    let customs = normalize_categories(&docs);
    assert_eq!(customs.len(), 3);
    assert_eq!(customs[0].value, "loose-melee");
    assert_eq!(customs[0].icon, CategoryIcon::Gem);
    assert_eq!(customs[1].value, "bridal-sets");

    let merged = merge_categories(customs);
    let built_ins = built_in_categories();
    assert_eq!(merged.len(), built_ins.len() + 2);
    assert!(merged[..built_ins.len()].iter().all(|c| c.built_in));
    let tail: Vec<&str> = merged[built_ins.len()..]
        .iter()
        .map(|c| c.id.as_str())
        .collect();
    assert_eq!(tail, vec!["c2", "c1"]);
}
