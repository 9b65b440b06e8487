#![no_main]

//! Interprets the input as an operation history and checks that forward
//! and reversed delivery produce the same text.

use libfuzzer_sys::fuzz_target;
use seq_crdt::{Element, ElementId, Sequence, SiteId};

const SITES: [&str; 3] = ["alpha", "beta", "gamma"];

enum Step {
    Insert(Element),
    Delete(ElementId),
}

fn script(data: &[u8]) -> Vec<Step> {
    let mut counters = [0u64; SITES.len()];
    let mut created: Vec<ElementId> = Vec::new();
    let mut steps = Vec::new();

    for chunk in data.chunks_exact(3) {
        let site = (chunk[0] & 0x7f) as usize % SITES.len();
        if chunk[0] & 0x80 == 0 {
            counters[site] += 1;
            let site_id = SiteId::new(SITES[site]);
            let parent_id = if created.is_empty() || chunk[1] & 0x03 == 0 {
                None
            } else {
                Some(created[chunk[1] as usize % created.len()].clone())
            };
            let id = ElementId::new(site_id.clone(), counters[site]);
            created.push(id.clone());
            steps.push(Step::Insert(Element {
                id,
                value: (b'a' + chunk[2] % 26) as char,
                parent_id,
                clock: counters[site],
                site_id,
                tombstone: false,
            }));
        } else if !created.is_empty() {
            steps.push(Step::Delete(
                created[chunk[2] as usize % created.len()].clone(),
            ));
        }
    }

    steps
}

fn apply(seq: &mut Sequence, step: &Step) {
    match step {
        Step::Insert(element) => {
            seq.insert(element.clone());
        }
        Step::Delete(id) => {
            seq.delete(id);
        }
    }
}

fuzz_target!(|data: &[u8]| {
    let steps = script(data);

    let mut forward = Sequence::new();
    for step in &steps {
        apply(&mut forward, step);
    }

    let mut reversed = Sequence::new();
    for step in steps.iter().rev() {
        apply(&mut reversed, step);
    }

    assert_eq!(forward.text(), reversed.text());
    assert_eq!(forward.len(), reversed.len());
});
