//! Per-result evaluation of conditions.
//!
//! Index scans only see the stored string value of an attribute; these
//! helpers decide whether that value satisfies a condition. Numeric
//! operands compare numerically, and a stored value that does not parse
//! as a number never satisfies a numeric condition.

use std::cmp::Ordering;

use txindex_types::{TxHash, TxResult};

use crate::condition::{Condition, Operand, Operator, Tag};

/// Compare a stored value against a numeric operand.
fn compare_numeric(value: &str, operand: &Operand) -> Option<Ordering> {
    let value = value.trim();
    match operand {
        Operand::Int(rhs) => match value.parse::<i64>() {
            Ok(lhs) => Some(lhs.cmp(rhs)),
            Err(_) => value.parse::<f64>().ok()?.partial_cmp(&(*rhs as f64)),
        },
        Operand::Float(rhs) => value.parse::<f64>().ok()?.partial_cmp(rhs),
        Operand::Str(_) => None,
    }
}

impl Condition {
    /// Whether a stored attribute value satisfies this condition.
    pub fn matches_value(&self, value: &str) -> bool {
        let Some(operand) = self.operand() else {
            // EXISTS: any stored value will do.
            return true;
        };
        match (self.op(), operand) {
            (Operator::Exists, _) => true,
            (Operator::Contains, Operand::Str(needle)) => value.contains(needle.as_str()),
            (Operator::Contains, _) => false,
            (Operator::Eq, Operand::Str(s)) => value == s,
            (op, operand) => {
                let Some(ord) = compare_numeric(value, operand) else {
                    return false;
                };
                match op {
                    Operator::Eq => ord == Ordering::Equal,
                    Operator::Gt => ord == Ordering::Greater,
                    Operator::Gte => ord != Ordering::Less,
                    Operator::Lt => ord == Ordering::Less,
                    Operator::Lte => ord != Ordering::Greater,
                    Operator::Contains | Operator::Exists => unreachable!("handled above"),
                }
            }
        }
    }

    /// Whether a whole stored result satisfies this condition.
    ///
    /// `hash` is the key the result is stored under.
    pub fn matches_tx(&self, hash: &TxHash, result: &TxResult) -> bool {
        match self.tag() {
            Tag::Height => self.matches_value(&result.height.to_string()),
            Tag::Hash => match (self.op(), self.operand()) {
                (Operator::Eq, Some(Operand::Str(s))) => TxHash::from_hex(s)
                    .map(|h| &h == hash)
                    .unwrap_or(false),
                _ => self.matches_value(&hash.to_hex()),
            },
            Tag::Event(tag) => result
                .indexed_attributes()
                .any(|(t, v)| &t == tag && self.matches_value(v)),
        }
    }
}
