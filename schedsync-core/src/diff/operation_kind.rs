use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
    Noop,
}

impl OperationKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            OperationKind::Create => "+",
            OperationKind::Update => "~",
            OperationKind::Delete => "-",
            OperationKind::Noop => "=",
        }
    }

    /// Position in a plan. Deletes first so a rescheduled session frees its
    /// old slot before the new one appears.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            OperationKind::Delete => 0,
            OperationKind::Create => 1,
            OperationKind::Update => 2,
            OperationKind::Noop => 3,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
