#![no_main]

use libfuzzer_sys::fuzz_target;

use txindex_query::Query;

// Parsing never panics, and whatever parses renders back to an equivalent query.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(query) = Query::parse(text) else {
        return;
    };
    let rendered = query.to_string();
    let reparsed = Query::parse(&rendered).expect("rendered query must parse");
    assert_eq!(reparsed.to_string(), rendered);
    assert_eq!(reparsed.len(), query.len());
});
