use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use log::debug;

use crate::entity::Entity;
use crate::enumerate::{self, Location};
use crate::game_data::GameData;
use crate::xml::{Document, Element};

use super::error::{CoreError, CoreErrorCode};
use super::types::{CountEntry, Query};

const UNNAMED: &str = "<none>";

#[derive(Debug, Default, Clone, Copy)]
pub struct Engine;

/// A loaded save. Entities returned by queries borrow from it.
#[derive(Debug)]
pub struct Session {
    document: Document,
}

impl Engine {
    pub fn new() -> Self {
        Self
    }

    pub fn open_bytes<B: AsRef<[u8]>>(&self, bytes: B) -> Result<Session, CoreError> {
        let document = Document::parse_bytes(bytes.as_ref()).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Parse,
                format!("failed to parse save: {}", e.message),
            )
        })?;
        Ok(Session { document })
    }

    /// Reads the whole file, then parses it; the handle is closed before
    /// parsing starts.
    pub fn open_path(&self, path: &Path) -> Result<Session, CoreError> {
        let bytes = fs::read(path).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!("failed to read {}: {e}", path.display()),
            )
        })?;
        debug!("read {} bytes from {}", bytes.len(), path.display());
        self.open_bytes(bytes).map_err(|e| {
            CoreError::new(e.code, format!("{}: {}", path.display(), e.message))
        })
    }
}

impl Session {
    pub fn root(&self) -> &Element {
        self.document.root()
    }

    pub fn locations(&self, data: &GameData) -> Vec<Location<'_>> {
        enumerate::locations(self.root(), data)
    }

    /// Candidates of the requested kinds that the filter shows, in
    /// enumeration order.
    pub fn query(&self, data: &GameData, query: &Query) -> Vec<Entity<'_>> {
        let locations = self.locations(data);
        let shown: Vec<Entity<'_>> = enumerate::candidates(&locations, &query.kinds)
            .filter(|entity| query.filter.shows(entity, data))
            .collect();
        debug!("query matched {} entities", shown.len());
        shown
    }
}

/// Counts entities by name in first-seen order, or by descending count then
/// name when `sort` is set.
pub fn count_by_name(entities: &[Entity<'_>], sort: bool) -> Vec<CountEntry> {
    let mut counts: Vec<CountEntry> = Vec::new();
    for entity in entities {
        let name = entity.name.unwrap_or(UNNAMED);
        match counts.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.count += 1,
            None => counts.push(CountEntry {
                name: name.to_string(),
                count: 1,
            }),
        }
    }
    if sort {
        counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    }
    counts
}

/// Orders entities by map, then name, then position. Entities without a
/// position sort after those with one.
pub fn sort_entities(entities: &mut [Entity<'_>]) {
    entities.sort_by(|a, b| {
        a.map
            .cmp(b.map)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| compare_positions(a.position, b.position))
    });
}

fn compare_positions(a: Option<(i64, i64)>, b: Option<(i64, i64)>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
