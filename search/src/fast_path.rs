//! Classification passes run before a search reaches the base store.
//!
//! Both functions are pure: they read the condition list and never modify
//! the query it came from.

use txindex_query::{Condition, ConditionId, Operand, Tag};
use txindex_store::SkipSet;
use txindex_types::TxHash;

use crate::SearchError;

/// Find the hash a query pins with `tx.hash = ...`.
///
/// Only the first hash equality is consulted; later ones are ignored.
/// An operand that is not a well-formed hash is an error rather than a
/// miss.
pub fn look_for_hash(conditions: &[Condition]) -> Result<Option<TxHash>, SearchError> {
    let Some(cond) = conditions.iter().find(|c| c.is_eq_on(&Tag::Hash)) else {
        return Ok(None);
    };
    let raw = match cond.operand() {
        Some(Operand::Str(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    TxHash::from_hex(&raw)
        .map(Some)
        .map_err(|source| SearchError::MalformedHashCondition {
            operand: raw,
            source,
        })
}

/// Where the surviving height equality ended up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeightInfo {
    /// The height equality kept after deduplication, if any.
    pub height_eq: Option<ConditionId>,
    /// The reduced query is that one height equality and nothing else.
    pub only_height_eq: bool,
}

/// Output of [`dedup_height`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeightPlan {
    pub conditions: Vec<Condition>,
    pub info: HeightInfo,
    pub skip: SkipSet,
}

/// Collapse repeated `tx.height = N` conditions to the last one.
///
/// Earlier height equalities are dropped from the condition list. When the
/// survivor is not the whole query and pins a whole-number height, it goes
/// into the skip set so the base store applies it as a key restriction
/// instead of re-checking it per result.
pub fn dedup_height(conditions: &[Condition]) -> HeightPlan {
    let survivor = conditions
        .iter()
        .rev()
        .find(|c| c.is_eq_on(&Tag::Height))
        .map(Condition::id);

    let reduced: Vec<Condition> = conditions
        .iter()
        .filter(|c| !c.is_eq_on(&Tag::Height) || Some(c.id()) == survivor)
        .cloned()
        .collect();

    let only_height_eq = survivor.is_some() && reduced.len() == 1;
    let mut skip = SkipSet::new();
    if !only_height_eq {
        if let Some(kept) = reduced.iter().find(|c| Some(c.id()) == survivor) {
            if kept.height_eq().is_some() {
                skip.insert(kept.id());
            }
        }
    }

    HeightPlan {
        conditions: reduced,
        info: HeightInfo {
            height_eq: survivor,
            only_height_eq,
        },
        skip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txindex_query::Query;

    const HASH: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

    fn conds(text: &str) -> Query {
        Query::parse(text).unwrap()
    }

    #[test]
    fn no_hash_condition() {
        let q = conds("tx.height = 5 AND tx.hash EXISTS");
        assert_eq!(look_for_hash(q.conditions()).unwrap(), None);
    }

    #[test]
    fn well_formed_hash_is_found() {
        let q = conds(&format!("a.b = 'x' AND tx.hash = '{}'", HASH));
        let hash = look_for_hash(q.conditions()).unwrap().unwrap();
        assert_eq!(hash.to_hex(), HASH);
    }

    #[test]
    fn hash_prefix_and_case_accepted() {
        let q = conds(&format!("tx.hash = '0x{}'", HASH.to_uppercase()));
        assert_eq!(look_for_hash(q.conditions()).unwrap().unwrap().to_hex(), HASH);
    }

    #[test]
    fn malformed_hash_is_error() {
        for bad in ["tx.hash = 'ABCD'", "tx.hash = 'zz'", "tx.hash = 42"] {
            let q = conds(bad);
            assert!(
                matches!(
                    look_for_hash(q.conditions()),
                    Err(SearchError::MalformedHashCondition { .. })
                ),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn first_hash_wins() {
        let other = "ab".repeat(32);
        let q = conds(&format!("tx.hash = '{}' AND tx.hash = '{}'", HASH, other));
        assert_eq!(look_for_hash(q.conditions()).unwrap().unwrap().to_hex(), HASH);

        // A malformed later hash does not matter once the first is good.
        let q = conds(&format!("tx.hash = '{}' AND tx.hash = 'nope'", HASH));
        assert!(look_for_hash(q.conditions()).unwrap().is_some());
    }

    #[test]
    fn repeated_heights_keep_last() {
        let q = conds("tx.height = 5 AND tx.height = 7");
        let plan = dedup_height(q.conditions());
        assert_eq!(plan.conditions.len(), 1);
        assert_eq!(plan.conditions[0].height_eq(), Some(7));
        assert_eq!(plan.info.height_eq, Some(q.conditions()[1].id()));
        assert!(plan.info.only_height_eq);
        assert!(plan.skip.is_empty());
    }

    #[test]
    fn height_with_other_condition_is_skipped() {
        let q = conds("tx.height = 5 AND transfer.amount > 100");
        let plan = dedup_height(q.conditions());
        assert!(!plan.info.only_height_eq);
        assert_eq!(plan.conditions.len(), 2);
        let height_id = q.conditions()[0].id();
        assert!(plan.skip.contains(height_id));
        assert_eq!(plan.skip.len(), 1);
    }

    #[test]
    fn dropped_heights_leave_others_in_order() {
        let q = conds("tx.height = 1 AND a.b = 'x' AND tx.height = 2 AND c.d EXISTS");
        let plan = dedup_height(q.conditions());
        let rendered: Vec<String> = plan.conditions.iter().map(|c| c.to_string()).collect();
        assert_eq!(rendered, vec!["a.b = 'x'", "tx.height = 2", "c.d EXISTS"]);
        assert!(plan.skip.contains(q.conditions()[2].id()));
    }

    #[test]
    fn height_range_is_not_deduplicated() {
        let q = conds("tx.height > 5 AND tx.height > 7");
        let plan = dedup_height(q.conditions());
        assert_eq!(plan.conditions.len(), 2);
        assert_eq!(plan.info, HeightInfo::default());
        assert!(plan.skip.is_empty());
    }

    #[test]
    fn fractional_height_is_left_to_matcher() {
        let q = conds("tx.height = 5.5 AND a.b EXISTS");
        let plan = dedup_height(q.conditions());
        assert!(plan.info.height_eq.is_some());
        assert!(plan.skip.is_empty());
    }

    #[test]
    fn empty_query() {
        let plan = dedup_height(&[]);
        assert!(plan.conditions.is_empty());
        assert_eq!(plan.info, HeightInfo::default());
        assert!(plan.skip.is_empty());
        assert_eq!(look_for_hash(&[]).unwrap(), None);
    }

    #[test]
    fn classification_does_not_touch_query() {
        let q = conds("tx.height = 1 AND tx.height = 2");
        let before = q.clone();
        let _ = dedup_height(q.conditions());
        let _ = look_for_hash(q.conditions());
        assert_eq!(q, before);
    }
}
