use std::sync::Arc;

use proptest::prelude::*;

use txindex_nullables::NullTxStore;
use txindex_query::{Operator, Query, Tag};
use txindex_search::{dedup_height, TxSearch};
use txindex_store::SearchContext;
use txindex_types::{Event, EventAttribute, ExecTxResult, TxResult};

#[derive(Clone, Debug)]
enum Term {
    HeightEq(i64),
    HeightGt(i64),
    Amount(i64),
    Exists,
}

fn arb_term() -> impl Strategy<Value = Term> {
    prop_oneof![
        (0i64..6).prop_map(Term::HeightEq),
        (0i64..6).prop_map(Term::HeightGt),
        (0i64..100).prop_map(Term::Amount),
        Just(Term::Exists),
    ]
}

fn build(terms: &[Term]) -> Query {
    let mut q = Query::new();
    for t in terms {
        let pushed = match t {
            Term::HeightEq(h) => q.push(Tag::Height, Operator::Eq, Some((*h).into())),
            Term::HeightGt(h) => q.push(Tag::Height, Operator::Gt, Some((*h).into())),
            Term::Amount(a) => q.push("transfer.amount", Operator::Gte, Some((*a).into())),
            Term::Exists => q.push("transfer.amount", Operator::Exists, None),
        };
        pushed.unwrap();
    }
    q
}

fn store() -> NullTxStore {
    NullTxStore::with_results((0..6u64).flat_map(|h| {
        (0..3u32).map(move |i| TxResult {
            height: h,
            index: i,
            tx: format!("{}:{}", h, i).into_bytes(),
            result: ExecTxResult {
                events: vec![Event::new(
                    "transfer",
                    vec![EventAttribute::indexed("amount", ((h * 17 + i as u64 * 31) % 100).to_string())],
                )],
                ..Default::default()
            },
        })
    }))
}

proptest! {
    /// At most one height equality survives, and it is the last one written.
    #[test]
    fn dedup_keeps_last_height_eq(terms in prop::collection::vec(arb_term(), 0..8)) {
        let q = build(&terms);
        let plan = dedup_height(q.conditions());
        let kept: Vec<_> = plan.conditions.iter().filter(|c| c.is_eq_on(&Tag::Height)).collect();
        let last = q.conditions().iter().rev().find(|c| c.is_eq_on(&Tag::Height));
        prop_assert_eq!(kept.len(), usize::from(last.is_some()));
        if let Some(last) = last {
            prop_assert_eq!(kept[0].id(), last.id());
            prop_assert_eq!(plan.info.height_eq, Some(last.id()));
        }
        let others = q.conditions().iter().filter(|c| !c.is_eq_on(&Tag::Height)).count();
        prop_assert_eq!(plan.conditions.len(), others + kept.len());
    }

    /// `only_height_eq` holds exactly when a single height equality remains.
    #[test]
    fn only_height_eq_iff_single_survivor(terms in prop::collection::vec(arb_term(), 0..8)) {
        let q = build(&terms);
        let plan = dedup_height(q.conditions());
        let expected = plan.conditions.len() == 1 && plan.conditions[0].is_eq_on(&Tag::Height);
        prop_assert_eq!(plan.info.only_height_eq, expected);
        if plan.info.only_height_eq {
            prop_assert!(plan.skip.is_empty());
        } else {
            prop_assert_eq!(plan.skip.len(), usize::from(plan.info.height_eq.is_some()));
        }
    }

    /// Results satisfy the last height equality, and searching twice agrees.
    #[test]
    fn results_honour_last_height(terms in prop::collection::vec(arb_term(), 0..6)) {
        let search = TxSearch::new(Arc::new(store()));
        let q = build(&terms);
        let first = search.search(&SearchContext::new(), &q).unwrap();
        let again = search.search(&SearchContext::new(), &q).unwrap();
        prop_assert_eq!(&first, &again);
        if let Some(h) = q.conditions().iter().rev().find_map(|c| c.height_eq()) {
            prop_assert!(first.iter().all(|r| r.height == h));
        }
    }

    /// A context cancelled up front always yields an empty list and no error.
    #[test]
    fn cancelled_is_always_empty(terms in prop::collection::vec(arb_term(), 0..6)) {
        let search = TxSearch::new(Arc::new(store()));
        let ctx = SearchContext::new();
        ctx.cancel();
        prop_assert!(search.search(&ctx, &build(&terms)).unwrap().is_empty());
        prop_assert!(search.store().search_calls().is_empty());
    }

    /// A hash query returns nothing or exactly the transaction with that hash.
    #[test]
    fn hash_search_returns_at_most_one(h in 0u64..8, i in 0u32..4) {
        let search = TxSearch::new(Arc::new(store()));
        let hash = txindex_crypto::hash_transaction(format!("{}:{}", h, i).as_bytes());
        let q = Query::new().and(Tag::Hash, Operator::Eq, hash.to_hex()).unwrap();
        let found = search.search(&SearchContext::new(), &q).unwrap();
        prop_assert!(found.len() <= 1);
        prop_assert_eq!(found.len(), usize::from(h < 6 && i < 3));
        for r in &found {
            prop_assert_eq!(txindex_crypto::tx_result_hash(r), hash);
        }
    }
}
