use serde::{Deserialize, Serialize};

/// `first` selects the earliest N rows, `last` the most recent N.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Pagination {
    pub first: Option<i64>,
    pub last: Option<i64>,
}

impl Pagination {
    pub fn first(n: i64) -> Self {
        Pagination {
            first: Some(n),
            last: None,
        }
    }

    pub fn last(n: i64) -> Self {
        Pagination {
            first: None,
            last: Some(n),
        }
    }
}
