#![no_main]

use libfuzzer_sys::fuzz_target;

use txindex_query::{Query, Tag};

// Fast-path classification never panics and keeps at most one height equality.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(query) = Query::parse(text) else {
        return;
    };
    let _ = txindex_search::look_for_hash(query.conditions());
    let plan = txindex_search::dedup_height(query.conditions());
    let heights = plan
        .conditions
        .iter()
        .filter(|c| c.is_eq_on(&Tag::Height))
        .count();
    assert!(heights <= 1);
    assert!(plan.skip.len() <= 1);
    assert!(plan.conditions.len() <= query.len());
});
