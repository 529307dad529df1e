use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a duplicate group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupStatus {
    /// Found by a scan, waiting for an operator decision
    Pending,

    /// Resolved by keeping one member and deleting the rest
    Merged,

    /// Operator decided the members are distinct stories
    Ignored,
}

impl GroupStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Merged => "merged",
            Self::Ignored => "ignored",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "merged" => Some(Self::Merged),
            "ignored" => Some(Self::Ignored),
            _ => None,
        }
    }
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// A cluster of records judged to represent the same underlying story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub id: i64,

    /// Lowest pairwise similarity inside the group (0-100)
    pub similarity: u8,

    /// Member record ids, ascending
    pub members: Vec<i64>,

    pub status: GroupStatus,

    /// Surviving member once the group has been merged
    pub keep_id: Option<i64>,

    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl DuplicateGroup {
    pub fn contains(&self, record_id: i64) -> bool {
        self.members.contains(&record_id)
    }
}
