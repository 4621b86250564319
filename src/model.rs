//! Records persisted by the store and returned by the resolver layer

use serde::{Deserialize, Serialize};

/// A catalog entry messages can be classified against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}

/// A user-submitted message together with its suggested classification.
///
/// `part_name` is not a stored column: it is filled from the `parts` table
/// (left join) when the message is read back, and stays `None` when the
/// message is not linked to a part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub user_id: String,
    pub text: String,
    pub part_id: Option<i64>,
    pub suggested_part: Option<String>,
    pub created_at: String,
    pub part_name: Option<String>,
}

/// A prior message and the label it was given, used as in-context guidance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub text: String,
    pub suggested_part: Option<String>,
}
