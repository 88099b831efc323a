// src/pipeline/diff.rs

//! Diff calculation between two snapshots of one site.
//!
//! Items are matched by URL. A matched item counts as updated only when its
//! content fingerprint differs; the changed fields are then attributed one
//! by one. Items that disappeared are not reported.

use std::collections::HashMap;

use crate::models::{ChangeSet, ChangedField, ChangedItem, Item, Snapshot};
use crate::pipeline::fingerprint::normalize;

/// Compare the current snapshot against the previous one, if any.
///
/// Pure: the same pair of inputs always yields an identical `ChangeSet`,
/// with new and updated items in the current snapshot's discovery order.
pub fn compare(previous: Option<&Snapshot>, current: &Snapshot) -> ChangeSet {
    let mut change_set = ChangeSet {
        site_key: current.site_key.clone(),
        listing_url: current.listing_url.clone(),
        api_url: current.api_url.clone(),
        previous_run_date: previous.map(Snapshot::run_date),
        ..ChangeSet::default()
    };

    let Some(previous) = previous else {
        change_set.new_items = current.items.iter().map(new_item).collect();
        return change_set;
    };

    let prev_map: HashMap<&str, &Item> = previous
        .items
        .iter()
        .map(|item| (item.url.as_str(), item))
        .collect();

    for item in &current.items {
        match prev_map.get(item.url.as_str()) {
            None => change_set.new_items.push(new_item(item)),
            Some(old) if old.content_fingerprint == item.content_fingerprint => {
                change_set.unchanged_count += 1;
            }
            Some(old) => change_set.updated_items.push(ChangedItem {
                item: item.clone(),
                changed_fields: changed_fields(old, item),
            }),
        }
    }

    change_set
}

/// Restore the previous excerpt of items whose detail page failed to load.
///
/// A failed fetch says nothing about the page, so the item keeps last
/// week's excerpt and fingerprint instead of reading as updated. Items the
/// previous snapshot does not know are left as they are. Returns how many
/// items were restored.
pub fn carry_forward_excerpts(previous: Option<&Snapshot>, current: &mut Snapshot) -> usize {
    let Some(previous) = previous else {
        return 0;
    };
    let prev_map: HashMap<&str, &Item> = previous
        .items
        .iter()
        .map(|item| (item.url.as_str(), item))
        .collect();

    let mut restored = 0;
    for item in current.items.iter_mut().filter(|item| item.detail_failed) {
        if let Some(old) = prev_map.get(item.url.as_str()) {
            item.set_excerpt(&old.raw_excerpt);
            restored += 1;
        }
    }
    restored
}

fn new_item(item: &Item) -> ChangedItem {
    ChangedItem {
        item: item.clone(),
        changed_fields: Vec::new(),
    }
}

/// Attribute a fingerprint change to individual fields.
pub fn changed_fields(old: &Item, new: &Item) -> Vec<ChangedField> {
    let mut changed = Vec::new();
    if normalize(&old.title) != normalize(&new.title) {
        changed.push(ChangedField::Title);
    }
    if normalize(&old.summary) != normalize(&new.summary) {
        changed.push(ChangedField::Summary);
    }
    if normalize(&old.raw_excerpt) != normalize(&new.raw_excerpt) {
        changed.push(ChangedField::Excerpt);
    }
    if changed.is_empty() {
        changed.push(ChangedField::Fingerprint);
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn item(url: &str, title: &str, summary: &str) -> Item {
        Item::new(url, title).with_summary(summary)
    }

    fn snapshot(day: u32, items: Vec<Item>) -> Snapshot {
        Snapshot::new(
            "test",
            Utc.with_ymd_and_hms(2026, 2, day, 8, 0, 0).unwrap(),
            items,
        )
    }

    fn sample_items() -> Vec<Item> {
        vec![
            item("https://example.com/1", "First", "one"),
            item("https://example.com/2", "Second", "two"),
            item("https://example.com/3", "Third", "three"),
        ]
    }

    #[test]
    fn test_first_run_all_items_are_new() {
        let current = snapshot(2, sample_items());
        let result = compare(None, &current);

        assert_eq!(result.new_items.len(), 3);
        assert!(result.updated_items.is_empty());
        assert_eq!(result.unchanged_count, 0);
        assert!(result.is_first_run());
        assert_eq!(result.new_items[0].item.url, "https://example.com/1");
    }

    #[test]
    fn test_no_changes() {
        let snap = snapshot(2, sample_items());
        let result = compare(Some(&snap), &snap);

        assert!(!result.has_changes());
        assert_eq!(result.change_count(), 0);
        assert_eq!(result.unchanged_count, 3);
    }

    #[test]
    fn test_additions() {
        let prev = snapshot(1, vec![item("https://example.com/1", "First", "one")]);
        let curr = snapshot(2, sample_items());

        let result = compare(Some(&prev), &curr);
        assert_eq!(result.new_items.len(), 2);
        assert_eq!(result.new_items[0].item.url, "https://example.com/2");
        assert_eq!(result.new_items[1].item.url, "https://example.com/3");
        assert_eq!(result.unchanged_count, 1);
    }

    #[test]
    fn test_summary_only_change_attributed() {
        let prev = snapshot(1, vec![item("https://example.com/1", "A", "B")]);
        let curr = snapshot(2, vec![item("https://example.com/1", "A", "C")]);

        let result = compare(Some(&prev), &curr);
        assert!(result.new_items.is_empty());
        assert_eq!(result.updated_items.len(), 1);
        assert_eq!(result.updated_items[0].changed_fields, vec![ChangedField::Summary]);
        assert_eq!(result.updated_items[0].item.summary, "C");
    }

    #[test]
    fn test_title_and_excerpt_changes() {
        let prev = snapshot(
            1,
            vec![Item::new("https://example.com/1", "Old").with_excerpt("old body")],
        );
        let curr = snapshot(
            2,
            vec![Item::new("https://example.com/1", "New").with_excerpt("new body")],
        );

        let result = compare(Some(&prev), &curr);
        assert_eq!(
            result.updated_items[0].changed_fields,
            vec![ChangedField::Title, ChangedField::Excerpt]
        );
    }

    #[test]
    fn test_formatting_only_change_is_unchanged() {
        let prev = snapshot(1, vec![item("https://example.com/1", "Big  Sale", "now")]);
        let curr = snapshot(2, vec![item("https://example.com/1", "big sale", "NOW")]);

        let result = compare(Some(&prev), &curr);
        assert!(!result.has_changes());
        assert_eq!(result.unchanged_count, 1);
    }

    #[test]
    fn test_stale_fingerprint_flags_fingerprint_field() {
        let mut old = item("https://example.com/1", "Same", "same");
        old.content_fingerprint = crate::pipeline::fingerprint::fingerprint("legacy");
        let prev = snapshot(1, vec![old]);
        let curr = snapshot(2, vec![item("https://example.com/1", "Same", "same")]);

        let result = compare(Some(&prev), &curr);
        assert_eq!(
            result.updated_items[0].changed_fields,
            vec![ChangedField::Fingerprint]
        );
    }

    #[test]
    fn test_failed_detail_keeps_previous_excerpt() {
        let prev = snapshot(
            1,
            vec![
                item("https://example.com/1", "First", "one").with_excerpt("full text"),
                item("https://example.com/2", "Second", "two").with_excerpt("old text"),
            ],
        );
        let mut failed = item("https://example.com/1", "First", "one");
        failed.detail_failed = true;
        let mut unknown = item("https://example.com/3", "Third", "three");
        unknown.detail_failed = true;
        let mut curr = snapshot(
            2,
            vec![
                failed,
                item("https://example.com/2", "Second", "two").with_excerpt("new text"),
                unknown,
            ],
        );

        assert_eq!(carry_forward_excerpts(Some(&prev), &mut curr), 1);
        assert_eq!(curr.items[0].raw_excerpt, "full text");
        assert_eq!(
            curr.items[0].content_fingerprint,
            prev.items[0].content_fingerprint
        );

        let result = compare(Some(&prev), &curr);
        assert_eq!(result.unchanged_count, 1);
        assert_eq!(result.updated_items.len(), 1);
        assert_eq!(result.updated_items[0].item.url, "https://example.com/2");
        assert_eq!(result.new_items.len(), 1);
    }

    #[test]
    fn test_carry_forward_without_previous_is_noop() {
        let mut failed = item("https://example.com/1", "First", "one");
        failed.detail_failed = true;
        let mut curr = snapshot(2, vec![failed]);
        assert_eq!(carry_forward_excerpts(None, &mut curr), 0);
        assert!(curr.items[0].raw_excerpt.is_empty());
    }

    #[test]
    fn test_removals_not_reported() {
        let prev = snapshot(1, sample_items());
        let curr = snapshot(2, vec![item("https://example.com/1", "First", "one")]);

        let result = compare(Some(&prev), &curr);
        assert!(!result.has_changes());
        assert_eq!(result.unchanged_count, 1);
    }

    #[test]
    fn test_mixed_changes() {
        let prev = snapshot(
            1,
            vec![
                item("https://example.com/1", "Keep", ""),
                item("https://example.com/2", "Update Me", ""),
                item("https://example.com/3", "Remove Me", ""),
            ],
        );
        let curr = snapshot(
            2,
            vec![
                item("https://example.com/1", "Keep", ""),
                item("https://example.com/2", "Updated", ""),
                item("https://example.com/4", "New Item", ""),
            ],
        );

        let result = compare(Some(&prev), &curr);
        assert_eq!(result.new_items.len(), 1);
        assert_eq!(result.new_items[0].item.url, "https://example.com/4");
        assert_eq!(result.updated_items.len(), 1);
        assert_eq!(result.updated_items[0].item.url, "https://example.com/2");
        assert_eq!(result.unchanged_count, 1);
        assert_eq!(
            result.previous_run_date,
            Some(chrono::NaiveDate::from_ymd_opt(2026, 2, 1).unwrap())
        );
    }

    #[test]
    fn test_compare_is_deterministic() {
        let prev = snapshot(1, sample_items());
        let mut changed = sample_items();
        changed[1] = item("https://example.com/2", "Second v2", "two");
        changed.push(item("https://example.com/9", "Ninth", ""));
        let curr = snapshot(2, changed);

        let a = serde_json::to_vec(&compare(Some(&prev), &curr)).unwrap();
        let b = serde_json::to_vec(&compare(Some(&prev), &curr)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_metadata_propagated() {
        let curr = snapshot(2, Vec::new()).with_provenance("https://example.com/news", "https://example.com/api");
        let result = compare(None, &curr);
        assert_eq!(result.site_key, "test");
        assert_eq!(result.listing_url, "https://example.com/news");
        assert_eq!(result.api_url, "https://example.com/api");
    }
}
