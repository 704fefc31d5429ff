//! Conjunctive transaction queries.
//!
//! A [`Query`] is an ordered list of [`Condition`]s joined by logical AND.
//! Each condition names a [`Tag`], an [`Operator`] and (except for
//! `EXISTS`) an [`Operand`]. The two reserved tags, `tx.hash` and
//! `tx.height`, are resolved to dedicated [`Tag`] variants when the
//! condition is built so that later stages never compare tag strings.
//!
//! Queries are written either programmatically or in the textual form
//! accepted by [`Query::parse`]:
//!
//! ```text
//! tx.height >= 10 AND transfer.recipient = 'alice' AND message.action EXISTS
//! ```

pub mod condition;
pub mod error;
pub mod eval;
pub mod parser;
pub mod query;

pub use condition::{Condition, ConditionId, Operand, Operator, Tag};
pub use error::QueryError;
pub use query::Query;
