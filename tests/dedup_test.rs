mod helpers;

use helpers::{entry_count, insert_entry, set_access, test_db};
use lore::knowledge::duplicates::{find_duplicates, MAX_DUPLICATE_PAIRS};
use lore::knowledge::merge::merge_entries;
use lore::knowledge::store::{entry_log, get_entry};
use lore::knowledge::types::MemoryType;

#[test]
fn near_duplicates_found_then_merged() {
    let mut conn = test_db();
    let keep = insert_entry(
        &mut conn,
        "pricing-v2",
        "Monthly plan costs 20 euros billed through Stripe checkout",
        "website",
        &["billing"],
        MemoryType::Architecture,
    );
    let dup = insert_entry(
        &mut conn,
        "pricing v2",
        "Monthly plan costs 25 euros billed via Stripe checkout",
        "stripe",
        &["stripe", "Billing"],
        MemoryType::Architecture,
    );
    insert_entry(
        &mut conn,
        "godot-export",
        "Export templates must match the engine version",
        "godot-pay",
        &[],
        MemoryType::Pattern,
    );
    set_access(&conn, keep, 3, 10);
    set_access(&conn, dup, 4, 1);

    let pairs = find_duplicates(&conn, 0.6).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!((pairs[0].id_a, pairs[0].id_b), (keep, dup));

    let dup_access = get_entry(&conn, dup).unwrap().unwrap().last_accessed;
    let result = merge_entries(&mut conn, keep, dup, None).unwrap();
    assert!(result.merged);
    assert_eq!(entry_count(&conn), 2);

    let merged = get_entry(&conn, keep).unwrap().unwrap();
    assert_eq!(merged.tags, vec!["billing", "stripe"]);
    assert_eq!(merged.access_count, 7);
    // The later of the two accesses survives.
    assert!(dup_access.is_some());
    assert_eq!(merged.last_accessed, dup_access);
    assert!(find_duplicates(&conn, 0.6).unwrap().is_empty());

    let ops: Vec<_> = entry_log(&conn, dup)
        .unwrap()
        .into_iter()
        .map(|l| l.operation)
        .collect();
    assert_eq!(ops, vec!["create", "merge"]);
}

#[test]
fn merge_with_missing_id_leaves_rows_untouched() {
    let mut conn = test_db();
    let id = insert_entry(&mut conn, "pricing", "Plan is 20 EUR", "website", &["a"], MemoryType::Architecture);
    let before = get_entry(&conn, id).unwrap().unwrap();

    assert!(!merge_entries(&mut conn, id, 404, Some("replaced")).unwrap().merged);
    assert!(!merge_entries(&mut conn, 404, id, None).unwrap().merged);

    assert_eq!(get_entry(&conn, id).unwrap().unwrap(), before);
    assert_eq!(entry_count(&conn), 1);
}

#[test]
fn duplicate_scan_is_capped() {
    let mut conn = test_db();
    // Twelve identical-looking entries give 66 pairs.
    for i in 0..12 {
        insert_entry(
            &mut conn,
            "release-notes",
            &format!("Release checklist for the website build {i}"),
            "website",
            &[],
            MemoryType::Pattern,
        );
    }
    let pairs = find_duplicates(&conn, 0.3).unwrap();
    assert_eq!(pairs.len(), MAX_DUPLICATE_PAIRS);
}
