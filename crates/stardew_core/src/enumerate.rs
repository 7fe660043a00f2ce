//! Walks the locations of a save and yields candidate entities per kind.
//!
//! Nothing here filters; the [`crate::filter`] stage decides what is shown.

use std::collections::BTreeSet;

use log::{debug, warn};

use crate::entity::{self, Entity, Kind, KindSet};
use crate::game_data::{GameData, LOCATION_UNKNOWN};
use crate::xml::{Element, FindAll};

const SLIME_HUTCH: &str = "Slime Hutch";
const SLIME_HUTCH_TYPE: &str = "SlimeHutch";

/// A map of the save: a `GameLocation` or a building interior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location<'a> {
    pub name: &'a str,
    pub element: &'a Element,
}

impl<'a> Location<'a> {
    pub fn new(element: &'a Element) -> Self {
        let name = element
            .child("name", true)
            .and_then(Element::text)
            .or_else(|| element.type_attr())
            .unwrap_or(LOCATION_UNKNOWN);
        Self { name, element }
    }

    pub fn is_slime_hutch(&self) -> bool {
        self.name == SLIME_HUTCH || self.element.type_attr() == Some(SLIME_HUTCH_TYPE)
    }

    /// Non-nil children of the `<container>` child.
    fn items(self, container: &'static str) -> impl Iterator<Item = &'a Element> {
        self.element
            .child(container, false)
            .into_iter()
            .flat_map(Element::children)
            .filter(|item| !item.is_nil())
    }

    /// `(key, value)` pairs of a serialized dictionary child, where each
    /// `<item>` holds `<key><Inner/></key><value><Inner/></value>`.
    fn dictionary(
        self,
        container: &'static str,
    ) -> impl Iterator<Item = (Option<&'a Element>, &'a Element)> {
        self.items(container).filter_map(|item| {
            let key = item.child("key", false).and_then(|key| key.children().next());
            let value = item.child("value", false)?.children().next()?;
            if value.is_nil() {
                debug!("skipping nil <{}> entry", value.tag);
                return None;
            }
            Some((key, value))
        })
    }
}

/// Every `GameLocation` at any depth, each followed by its building
/// interiors. Unknown names are warned about once and still returned.
pub fn locations<'a>(root: &'a Element, data: &GameData) -> Vec<Location<'a>> {
    let mut out = Vec::new();
    for element in FindAll::new(root, "GameLocation", false) {
        if element.is_nil() {
            continue;
        }
        out.push(Location::new(element));
        out.extend(interiors(element));
    }

    let mut warned = BTreeSet::new();
    for location in &out {
        if !data.is_known_location(location.name) && warned.insert(location.name) {
            warn!("unknown location {}", location.name);
        }
    }
    debug!("found {} locations", out.len());
    out
}

fn interiors(location: &Element) -> impl Iterator<Item = Location<'_>> {
    location
        .child("buildings", false)
        .into_iter()
        .flat_map(Element::children)
        .filter_map(|building| building.child("indoors", false))
        .filter(|indoors| !indoors.is_nil())
        .map(Location::new)
}

/// Lazily yields the candidates of every requested kind, kind by kind, in
/// location order.
pub fn candidates<'a, 'b>(
    locations: &'b [Location<'a>],
    kinds: &'b KindSet,
) -> impl Iterator<Item = Entity<'a>> + 'b
where
    'a: 'b,
{
    kinds.iter().flat_map(move |&kind| {
        locations
            .iter()
            .flat_map(move |&location| location_candidates(location, kind, kinds))
    })
}

fn location_candidates<'a, 'b>(
    location: Location<'a>,
    kind: Kind,
    kinds: &'b KindSet,
) -> Box<dyn Iterator<Item = Entity<'a>> + 'b>
where
    'a: 'b,
{
    match kind {
        Kind::Object | Kind::Machine => {
            Box::new(objects(location).filter(move |entity| entity.kind == kind))
        }
        Kind::SmallFeature | Kind::Crop | Kind::Tree | Kind::FruitTree => {
            Box::new(terrain_features(location).filter_map(move |(specific, node, position)| {
                claims(kind, specific, kinds)
                    .then(|| Entity::new(kind, location.name, node, position))
            }))
        }
        Kind::LargeFeature => Box::new(large_features(location)),
        Kind::Animal => Box::new(animals(location)),
        Kind::Slime => Box::new(slimes(location)),
    }
}

/// A feature is yielded once: under its own kind when requested, otherwise
/// as a small feature.
fn claims(requested: Kind, specific: Kind, kinds: &KindSet) -> bool {
    requested == specific || (requested == Kind::SmallFeature && !kinds.contains(&specific))
}

fn objects(location: Location<'_>) -> impl Iterator<Item = Entity<'_>> {
    location.dictionary("objects").map(move |(key, object)| {
        let kind = if object.child("bigCraftable", false).and_then(Element::text) == Some("true") {
            Kind::Machine
        } else {
            Kind::Object
        };
        let position = object
            .child("tileLocation", false)
            .and_then(entity::tile_position)
            .or_else(|| key.and_then(entity::tile_position));
        Entity::new(kind, location.name, object, position)
    })
}

fn terrain_features(
    location: Location<'_>,
) -> impl Iterator<Item = (Kind, &Element, Option<(i64, i64)>)> {
    location
        .dictionary("terrainFeatures")
        .map(|(key, feature)| {
            let position = key.and_then(entity::tile_position);
            (entity::classify_feature(feature), feature, position)
        })
}

fn large_features(location: Location<'_>) -> impl Iterator<Item = Entity<'_>> {
    location.items("largeTerrainFeatures").map(move |feature| {
        let position = feature
            .child("tilePosition", false)
            .and_then(entity::tile_position);
        Entity::new(Kind::LargeFeature, location.name, feature, position)
    })
}

fn animals(location: Location<'_>) -> impl Iterator<Item = Entity<'_>> {
    location.dictionary("animals").map(move |(_, animal)| {
        let position = animal.child("position", false).and_then(entity::pixel_tile);
        Entity::new(Kind::Animal, location.name, animal, position)
    })
}

fn slimes(location: Location<'_>) -> impl Iterator<Item = Entity<'_>> {
    let hutch = location.is_slime_hutch();
    location
        .items("characters")
        .filter(move |npc| hutch && npc.type_attr().is_some_and(|t| t.ends_with("Slime")))
        .map(move |slime| {
            let position = slime.child("position", false).and_then(entity::pixel_tile);
            Entity::new(Kind::Slime, location.name, slime, position)
        })
}
