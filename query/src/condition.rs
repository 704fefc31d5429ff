//! Atomic query conditions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::QueryError;

/// Stable identifier of a condition within its [`Query`](crate::Query).
///
/// Assigned once when the condition is added and never reused, so skip sets
/// built from it stay valid when other conditions are dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConditionId(u32);

impl ConditionId {
    pub(crate) fn new(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ConditionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The tag a condition tests.
///
/// `tx.hash` and `tx.height` are reserved and get their own variants;
/// every other tag is a composite event tag of the form `"{event}.{key}"`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tag {
    Hash,
    Height,
    Event(String),
}

impl Tag {
    pub const HASH: &'static str = "tx.hash";
    pub const HEIGHT: &'static str = "tx.height";

    pub fn parse(s: &str) -> Self {
        match s {
            Self::HASH => Tag::Hash,
            Self::HEIGHT => Tag::Height,
            other => Tag::Event(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Tag::Hash => Self::HASH,
            Tag::Height => Self::HEIGHT,
            Tag::Event(s) => s,
        }
    }

    pub fn is_reserved(&self) -> bool {
        !matches!(self, Tag::Event(_))
    }
}

impl From<&str> for Tag {
    fn from(s: &str) -> Self {
        Tag::parse(s)
    }
}

impl From<String> for Tag {
    fn from(s: String) -> Self {
        Tag::parse(&s)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    Exists,
}

impl Operator {
    pub fn is_range(&self) -> bool {
        matches!(self, Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::Eq => "=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Contains => "CONTAINS",
            Operator::Exists => "EXISTS",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Str(String),
    Int(i64),
    Float(f64),
}

impl Operand {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Operand::Int(_) | Operand::Float(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Operand::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The operand as a block height, if it is a non-negative whole number.
    pub fn as_height(&self) -> Option<u64> {
        match *self {
            Operand::Int(i) => u64::try_from(i).ok(),
            Operand::Float(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => {
                Some(f as u64)
            }
            _ => None,
        }
    }
}

impl From<&str> for Operand {
    fn from(s: &str) -> Self {
        Operand::Str(s.to_string())
    }
}

impl From<String> for Operand {
    fn from(s: String) -> Self {
        Operand::Str(s)
    }
}

impl From<i64> for Operand {
    fn from(i: i64) -> Self {
        Operand::Int(i)
    }
}

impl From<f64> for Operand {
    fn from(f: f64) -> Self {
        Operand::Float(f)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Str(s) => write!(f, "'{}'", s),
            Operand::Int(i) => write!(f, "{}", i),
            Operand::Float(x) => write!(f, "{:?}", x),
        }
    }
}

/// One `tag op operand` term of a conjunctive query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    id: ConditionId,
    tag: Tag,
    op: Operator,
    operand: Option<Operand>,
}

impl Condition {
    /// Build a condition, checking that the operator fits the operand.
    pub(crate) fn new(
        id: ConditionId,
        tag: Tag,
        op: Operator,
        operand: Option<Operand>,
    ) -> Result<Self, QueryError> {
        let invalid = |reason| QueryError::InvalidOperand {
            tag: tag.to_string(),
            op,
            reason,
        };
        match (op, &operand) {
            (Operator::Exists, None) => {}
            (Operator::Exists, Some(_)) => return Err(invalid("EXISTS takes no operand")),
            (_, None) => return Err(invalid("operand is required")),
            (Operator::Contains, Some(Operand::Str(_))) => {}
            (Operator::Contains, Some(_)) => {
                return Err(invalid("CONTAINS requires a string operand"))
            }
            (op, Some(o)) if op.is_range() && !o.is_numeric() => {
                return Err(invalid("range comparison requires a numeric operand"))
            }
            (_, Some(Operand::Float(f))) if !f.is_finite() => {
                return Err(invalid("numeric operand must be finite"))
            }
            _ => {}
        }
        Ok(Self {
            id,
            tag,
            op,
            operand,
        })
    }

    pub fn id(&self) -> ConditionId {
        self.id
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn op(&self) -> Operator {
        self.op
    }

    pub fn operand(&self) -> Option<&Operand> {
        self.operand.as_ref()
    }

    pub fn is_eq_on(&self, tag: &Tag) -> bool {
        self.op == Operator::Eq && &self.tag == tag
    }

    /// The height this condition pins, if it is `tx.height = <whole number>`.
    pub fn height_eq(&self) -> Option<u64> {
        if self.is_eq_on(&Tag::Height) {
            self.operand.as_ref().and_then(Operand::as_height)
        } else {
            None
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            Some(operand) => write!(f, "{} {} {}", self.tag, self.op, operand),
            None => write!(f, "{} {}", self.tag, self.op),
        }
    }
}
