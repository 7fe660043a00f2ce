mod engine;
mod error;
mod types;

pub use engine::{Engine, Session, count_by_name, sort_entities};
pub use error::{CoreError, CoreErrorCode};
pub use types::{CountEntry, Query};
