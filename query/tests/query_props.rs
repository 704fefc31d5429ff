use proptest::prelude::*;

use txindex_query::{Operand, Operator, Query, Tag};

fn tag_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("tx.height".to_string()),
        Just("tx.hash".to_string()),
        "[a-z]{1,6}\\.[a-z_]{1,8}",
    ]
}

fn condition_strategy() -> impl Strategy<Value = (String, Operator, Option<Operand>)> {
    tag_strategy().prop_flat_map(|tag| {
        prop_oneof![
            Just((tag.clone(), Operator::Exists, None)),
            "[a-zA-Z0-9 =<>.]{0,10}"
                .prop_map({
                    let tag = tag.clone();
                    move |s| (tag.clone(), Operator::Eq, Some(Operand::Str(s)))
                }),
            "[a-z]{1,5}".prop_map({
                let tag = tag.clone();
                move |s| (tag.clone(), Operator::Contains, Some(Operand::Str(s)))
            }),
            (
                prop_oneof![
                    Just(Operator::Eq),
                    Just(Operator::Gt),
                    Just(Operator::Gte),
                    Just(Operator::Lt),
                    Just(Operator::Lte),
                ],
                -1_000_000i64..1_000_000
            )
                .prop_map({
                    let tag = tag.clone();
                    move |(op, n)| (tag.clone(), op, Some(Operand::Int(n)))
                }),
            (-10_000i32..10_000).prop_map(move |n| (
                tag.clone(),
                Operator::Lte,
                Some(Operand::Float(n as f64 / 4.0 + 0.25))
            )),
        ]
    })
}

fn query_strategy() -> impl Strategy<Value = Query> {
    prop::collection::vec(condition_strategy(), 0..6).prop_map(|conds| {
        let mut q = Query::new();
        for (tag, op, operand) in conds {
            q.push(tag.as_str(), op, operand).expect("generated conditions are valid");
        }
        q
    })
}

proptest! {
    /// Rendering a query and parsing it back yields the same conditions.
    #[test]
    fn display_parse_roundtrip(q in query_strategy()) {
        let text = q.to_string();
        let parsed = Query::parse(&text).unwrap();
        prop_assert_eq!(parsed, q);
    }

    /// The tag map keeps the last condition authored for each tag.
    #[test]
    fn conditions_by_tag_keeps_last(q in query_strategy()) {
        let map = q.conditions_by_tag();
        for (tag, cond) in &map {
            let last = q.conditions().iter().rev().find(|c| c.tag() == *tag).unwrap();
            prop_assert_eq!(last.id(), cond.id());
        }
        let distinct: std::collections::HashSet<&Tag> =
            q.conditions().iter().map(|c| c.tag()).collect();
        prop_assert_eq!(map.len(), distinct.len());
    }

    /// Building the tag map never alters the query.
    #[test]
    fn conditions_by_tag_is_pure(q in query_strategy()) {
        let before = q.clone();
        let _ = q.conditions_by_tag();
        prop_assert_eq!(q, before);
    }
}
