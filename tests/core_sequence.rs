use seq_crdt::{Element, ElementId, Integration, Sequence, SiteId};
use std::collections::HashSet;

fn elem(site: &str, seq: u64, value: char, parent: Option<ElementId>) -> Element {
    Element {
        id: ElementId::new(SiteId::new(site), seq),
        value,
        parent_id: parent,
        clock: seq,
        site_id: SiteId::new(site),
        tombstone: false,
    }
}

fn id(site: &str, seq: u64) -> ElementId {
    ElementId::new(SiteId::new(site), seq)
}

#[test]
fn test_insert_chain_in_order() {
    let mut seq = Sequence::new();
    assert_eq!(seq.insert(elem("a", 1, 'h', None)), Integration::Applied);
    assert_eq!(
        seq.insert(elem("a", 2, 'i', Some(id("a", 1)))),
        Integration::Applied
    );
    assert_eq!(seq.text(), "hi");
    assert_eq!(seq.visible_len(), 2);
}

#[test]
fn test_sibling_order_higher_clock_first() {
    let mut forward = Sequence::new();
    forward.insert(elem("a", 3, 'x', None));
    forward.insert(elem("b", 5, 'y', None));

    let mut reverse = Sequence::new();
    reverse.insert(elem("b", 5, 'y', None));
    reverse.insert(elem("a", 3, 'x', None));

    // Clock 5 beats clock 3 regardless of arrival order.
    assert_eq!(forward.text(), "yx");
    assert_eq!(reverse.text(), "yx");
}

#[test]
fn test_sibling_tie_broken_by_greater_site() {
    let mut forward = Sequence::new();
    forward.insert(elem("alpha", 1, 'x', None));
    forward.insert(elem("beta", 1, 'y', None));

    let mut reverse = Sequence::new();
    reverse.insert(elem("beta", 1, 'y', None));
    reverse.insert(elem("alpha", 1, 'x', None));

    // Equal clocks: "beta" > "alpha", so beta's element goes left.
    assert_eq!(forward.text(), "yx");
    assert_eq!(reverse.text(), "yx");
}

#[test]
fn test_concurrent_runs_do_not_interleave() {
    let mut merged = Sequence::new();

    // Two sites typed a word each against an empty document.
    let mut prev = None;
    for (i, ch) in "hello".chars().enumerate() {
        let e = elem("alice", i as u64 + 1, ch, prev.clone());
        prev = Some(e.id.clone());
        merged.insert(e);
    }
    let mut prev = None;
    for (i, ch) in "world".chars().enumerate() {
        let e = elem("bob", i as u64 + 1, ch, prev.clone());
        prev = Some(e.id.clone());
        merged.insert(e);
    }

    let text = merged.text();
    assert!(text == "helloworld" || text == "worldhello", "got {text}");
}

#[test]
fn test_delete_tombstones_in_place() {
    let mut seq = Sequence::new();
    seq.insert(elem("a", 1, 'x', None));
    seq.insert(elem("a", 2, 'y', Some(id("a", 1))));

    assert_eq!(seq.delete(&id("a", 1)), Integration::Applied);
    assert_eq!(seq.text(), "y");
    assert_eq!(seq.visible_len(), 1);

    // The element survives with its tombstone set; the id index still
    // resolves it.
    assert_eq!(seq.len(), 2);
    let buried = seq.get(&id("a", 1)).unwrap();
    assert!(buried.tombstone);
    assert_eq!(buried.value, 'x');
}

#[test]
fn test_tombstoned_parent_still_anchors_children() {
    let mut seq = Sequence::new();
    seq.insert(elem("a", 1, 'x', None));
    seq.delete(&id("a", 1));

    // A child of the deleted element still lands where its parent was.
    seq.insert(elem("b", 2, 'z', Some(id("a", 1))));
    assert_eq!(seq.text(), "z");
    assert_eq!(seq.len(), 2);
}

#[test]
fn test_duplicate_insert_is_noop() {
    let mut seq = Sequence::new();
    seq.insert(elem("a", 1, 'x', None));

    // Same id redelivered, even with a different payload, changes nothing.
    let mut dup = elem("a", 1, 'Q', None);
    dup.clock = 99;
    assert_eq!(seq.insert(dup), Integration::Duplicate);
    assert_eq!(seq.text(), "x");
    assert_eq!(seq.len(), 1);
}

#[test]
fn test_delete_is_idempotent() {
    let mut seq = Sequence::new();
    seq.insert(elem("a", 1, 'x', None));

    assert_eq!(seq.delete(&id("a", 1)), Integration::Applied);
    assert_eq!(seq.delete(&id("a", 1)), Integration::Duplicate);
    assert_eq!(seq.text(), "");
    assert_eq!(seq.len(), 1);
}

#[test]
fn inv_unique_element_ids() {
    let mut seq = Sequence::new();
    seq.insert(elem("a", 1, 'x', None));
    seq.insert(elem("b", 1, 'y', None));
    seq.insert(elem("a", 2, 'z', Some(id("a", 1))));

    let ids: HashSet<_> = seq.element_ids().into_iter().collect();
    assert_eq!(ids.len(), seq.len());
}

#[test]
fn inv_parents_resolve_after_integration() {
    let mut seq = Sequence::new();
    seq.insert(elem("a", 1, 'x', None));
    seq.insert(elem("a", 2, 'y', Some(id("a", 1))));

    for e in seq.iter_all() {
        if let Some(parent) = &e.parent_id {
            assert!(seq.get(parent).is_some());
        }
    }
}

#[test]
fn test_snapshot_skips_integration() {
    let mut visible = elem("srv", 1, 'h', None);
    visible.clock = 7;
    let mut buried = elem("srv", 2, 'i', Some(id("srv", 1)));
    buried.tombstone = true;

    let seq = Sequence::from_snapshot(vec![visible, buried]);
    assert_eq!(seq.text(), "h");
    assert_eq!(seq.len(), 2);
    assert_eq!(seq.max_clock(), 7);
    assert!(seq.get(&id("srv", 2)).is_some());
}

#[test]
fn test_load_snapshot_discards_previous_state() {
    let mut seq = Sequence::new();
    seq.insert(elem("a", 1, 'x', None));
    seq.insert(elem("ghostly", 9, 'g', Some(id("missing", 1))));
    assert_eq!(seq.pending_len(), 1);

    seq.load_snapshot(vec![elem("srv", 1, 'n', None)]);
    assert_eq!(seq.text(), "n");
    assert_eq!(seq.pending_len(), 0);
    assert!(seq.get(&id("a", 1)).is_none());
}

#[test]
fn test_element_id_display_and_parse() {
    let original = id("a-b-c", 42);
    let round_tripped: ElementId = original.to_string().parse().unwrap();
    assert_eq!(original, round_tripped);
    assert_eq!(original.to_string(), "a-b-c-42");
}
