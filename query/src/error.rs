use thiserror::Error;

use crate::condition::Operator;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryError {
    #[error("operator {op} is not valid for tag {tag}: {reason}")]
    InvalidOperand {
        tag: String,
        op: Operator,
        reason: &'static str,
    },

    #[error("syntax error at byte {pos}: {message}")]
    Syntax { pos: usize, message: String },
}
