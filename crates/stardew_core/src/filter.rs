//! Tri-state pattern filters over entities.
//!
//! Every axis (name, type, category, map) yields a [`Decision`]. Decisions
//! are folded with [`Decision::combine`], where an exclusion always wins.

use std::fmt;

use log::{trace, warn};

use crate::entity::{Entity, Kind};
use crate::game_data::GameData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Exclude,
    Unspecified,
    Include,
}

impl Decision {
    /// Exclude dominates, then Include, then Unspecified.
    pub fn combine(self, other: Decision) -> Decision {
        match (self, other) {
            (Decision::Exclude, _) | (_, Decision::Exclude) => Decision::Exclude,
            (Decision::Include, _) | (_, Decision::Include) => Decision::Include,
            _ => Decision::Unspecified,
        }
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Glob(glob::Pattern),
    Literal(String),
}

/// A shell glob, optionally negated with a leading `!`.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    negated: bool,
    matcher: Matcher,
}

impl Pattern {
    pub fn parse(source: &str) -> Self {
        let (negated, body) = match source.strip_prefix('!') {
            Some(body) => (true, body),
            None => (false, source),
        };
        let matcher = match glob::Pattern::new(body) {
            Ok(glob) => Matcher::Glob(glob),
            Err(e) => {
                warn!("invalid pattern {source:?} ({e}); matching it literally");
                Matcher::Literal(body.to_string())
            }
        };
        Self {
            source: source.to_string(),
            negated,
            matcher,
        }
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Glob match of `term` against the pattern body, ignoring negation.
    pub fn matches(&self, term: &str) -> bool {
        match &self.matcher {
            Matcher::Glob(glob) => glob.matches(term),
            Matcher::Literal(literal) => literal == term,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PatternList {
    patterns: Vec<Pattern>,
}

impl PatternList {
    pub fn parse<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: sources
                .into_iter()
                .map(|source| Pattern::parse(source.as_ref()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    /// A matching negated pattern excludes wherever it sits in the list.
    /// Otherwise a matching positive pattern includes. An absent or empty
    /// term matches nothing.
    pub fn matches(&self, term: Option<&str>) -> Decision {
        let Some(term) = term.filter(|term| !term.is_empty()) else {
            return Decision::Unspecified;
        };
        if self
            .patterns
            .iter()
            .any(|p| p.is_negated() && p.matches(term))
        {
            return Decision::Exclude;
        }
        if self
            .patterns
            .iter()
            .any(|p| !p.is_negated() && p.matches(term))
        {
            return Decision::Include;
        }
        Decision::Unspecified
    }

    /// Map matching: a list of only negations admits every other map, and a
    /// list of only positives rejects every other map.
    pub fn matches_map(&self, map: Option<&str>) -> Decision {
        if self.is_empty() {
            return Decision::Unspecified;
        }
        let decision = self.matches(map);
        if decision != Decision::Unspecified {
            return decision;
        }
        if self.patterns.iter().all(Pattern::is_negated) {
            Decision::Include
        } else if self.patterns.iter().all(|p| !p.is_negated()) {
            Decision::Exclude
        } else {
            Decision::Unspecified
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Category {
    Artifact,
    Forage,
    CropReady,
    CropDead,
    NoFertilizer,
    ReadyToHarvest,
}

// Kinds each category can say anything about.
#[rustfmt::skip]
const CATEGORY_KINDS: &[(Category, &[Kind])] = &[
    (Category::Artifact,       &[Kind::Object]),
    (Category::Forage,         &[Kind::Object, Kind::Crop]),
    (Category::CropReady,      &[Kind::Crop]),
    (Category::CropDead,       &[Kind::Crop]),
    (Category::NoFertilizer,   &[Kind::Crop]),
    (Category::ReadyToHarvest, &[Kind::Machine, Kind::FruitTree, Kind::Crop]),
];

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Artifact,
        Category::Forage,
        Category::CropReady,
        Category::CropDead,
        Category::NoFertilizer,
        Category::ReadyToHarvest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Artifact => "artifact",
            Category::Forage => "forage",
            Category::CropReady => "crop-ready",
            Category::CropDead => "crop-dead",
            Category::NoFertilizer => "no-fertilizer",
            Category::ReadyToHarvest => "ready-to-harvest",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    pub fn applies_to(self, kind: Kind) -> bool {
        CATEGORY_KINDS
            .iter()
            .find(|(category, _)| *category == self)
            .is_some_and(|(_, kinds)| kinds.contains(&kind))
    }

    /// Whether the entity is in this category. Kinds the category does not
    /// apply to are never in it.
    pub fn holds(self, entity: &Entity<'_>, data: &GameData) -> bool {
        if !self.applies_to(entity.kind) {
            return false;
        }
        match (self, entity.kind) {
            (Category::Artifact, _) => entity.name.is_some_and(|n| data.is_artifact_marker(n)),
            (Category::Forage, Kind::Object) => entity.name.is_some_and(|n| data.is_forage(n)),
            (Category::Forage, _) => entity.flag("crop/forageCrop"),
            (Category::CropReady, _) => entity.flag("crop/fullGrown"),
            (Category::CropDead, _) => entity.flag("crop/dead"),
            (Category::NoFertilizer, _) => !has_fertilizer(entity),
            (Category::ReadyToHarvest, Kind::Machine) => entity.flag("readyForHarvest"),
            (Category::ReadyToHarvest, Kind::FruitTree) => {
                entity.number("fruitsOnTree").is_some_and(|n| n > 0.0)
            }
            (Category::ReadyToHarvest, _) => entity.flag("crop/fullGrown"),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn has_fertilizer(entity: &Entity<'_>) -> bool {
    match entity.node.child("fertilizer", false) {
        None => false,
        Some(node) if node.is_nil() => false,
        Some(node) => match node.text().map(str::trim) {
            None | Some("") | Some("0") => false,
            Some(_) => true,
        },
    }
}

/// Filters of a single query. Built fresh for every query; holds no state
/// between entities.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    names: PatternList,
    types: PatternList,
    categories: PatternList,
    maps: PatternList,
    selected: Vec<Category>,
}

impl FilterSpec {
    pub fn new(
        names: PatternList,
        types: PatternList,
        categories: PatternList,
        maps: PatternList,
    ) -> Self {
        let selected = select_categories(&categories);
        Self {
            names,
            types,
            categories,
            maps,
            selected,
        }
    }

    pub fn from_patterns<S: AsRef<str>>(
        names: &[S],
        types: &[S],
        categories: &[S],
        maps: &[S],
    ) -> Self {
        Self::new(
            PatternList::parse(names),
            PatternList::parse(types),
            PatternList::parse(categories),
            PatternList::parse(maps),
        )
    }

    pub fn categories(&self) -> &[Category] {
        &self.selected
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
            && self.types.is_empty()
            && self.categories.is_empty()
            && self.maps.is_empty()
    }

    /// Category axis: Include when any selected category holds.
    pub fn category_decision(&self, entity: &Entity<'_>, data: &GameData) -> Decision {
        if self.selected.iter().any(|c| c.holds(entity, data)) {
            Decision::Include
        } else {
            Decision::Unspecified
        }
    }

    /// The map axis scopes the query: a map exclusion is final, and a map
    /// inclusion only decides on its own when no other axis has patterns.
    pub fn decide(&self, entity: &Entity<'_>, data: &GameData) -> Decision {
        if self.is_empty() {
            return Decision::Include;
        }

        let map = self.maps.matches_map(Some(entity.map));
        let decision = if map == Decision::Exclude {
            Decision::Exclude
        } else if self.names.is_empty() && self.types.is_empty() && self.categories.is_empty() {
            map
        } else {
            self.names
                .matches(entity.name)
                .combine(self.types.matches(entity.entity_type()))
                .combine(self.category_decision(entity, data))
        };

        trace!(
            "{} {:?} on {} at {:?}: {:?}",
            entity.kind, entity.name, entity.map, entity.position, decision
        );
        decision
    }

    /// Entities are shown only on an explicit Include.
    pub fn shows(&self, entity: &Entity<'_>, data: &GameData) -> bool {
        self.decide(entity, data) == Decision::Include
    }
}

fn select_categories(patterns: &PatternList) -> Vec<Category> {
    let mut selected = Vec::new();
    for pattern in patterns.iter() {
        if pattern.is_negated() {
            warn!("category {pattern} is negated; categories can only include, ignoring it");
            continue;
        }
        let matched: Vec<Category> = Category::ALL
            .into_iter()
            .filter(|c| pattern.matches(c.as_str()))
            .collect();
        if matched.is_empty() {
            warn!("unknown category {pattern}");
        }
        for category in matched {
            if !selected.contains(&category) {
                selected.push(category);
            }
        }
    }
    selected
}
