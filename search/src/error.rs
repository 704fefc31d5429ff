use thiserror::Error;

use txindex_store::StoreError;
use txindex_types::TypesError;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("malformed tx.hash condition operand {operand}")]
    MalformedHashCondition {
        operand: String,
        #[source]
        source: TypesError,
    },

    #[error("transaction lookup failed")]
    LookupFailed(#[source] StoreError),

    #[error("transaction search failed")]
    SearchFailed(#[source] StoreError),
}
