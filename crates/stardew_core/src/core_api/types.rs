use serde::{Deserialize, Serialize};

use crate::entity::{Kind, KindSet};
use crate::filter::FilterSpec;

/// What to enumerate and how to filter it.
#[derive(Debug, Clone)]
pub struct Query {
    pub kinds: KindSet,
    pub filter: FilterSpec,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            kinds: [Kind::Object, Kind::Machine].into_iter().collect(),
            filter: FilterSpec::default(),
        }
    }
}

impl Query {
    pub fn new(kinds: KindSet, filter: FilterSpec) -> Self {
        Self { kinds, filter }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CountEntry {
    pub name: String,
    pub count: usize,
}
