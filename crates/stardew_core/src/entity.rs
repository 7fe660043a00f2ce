use std::collections::BTreeSet;
use std::fmt;

use log::debug;
use serde::Serialize;

use crate::core_api::{CoreError, CoreErrorCode};
use crate::xml::{Coord, Element};

/// Pixels per map tile; characters and animals store pixel positions.
pub const TILE_SIZE: f64 = 64.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Kind {
    Object,
    Machine,
    SmallFeature,
    LargeFeature,
    Crop,
    Tree,
    FruitTree,
    Animal,
    Slime,
}

pub type KindSet = BTreeSet<Kind>;

impl Kind {
    pub const ALL: [Kind; 9] = [
        Kind::Object,
        Kind::Machine,
        Kind::SmallFeature,
        Kind::LargeFeature,
        Kind::Crop,
        Kind::Tree,
        Kind::FruitTree,
        Kind::Animal,
        Kind::Slime,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Object => "object",
            Kind::Machine => "machine",
            Kind::SmallFeature => "small-feature",
            Kind::LargeFeature => "large-feature",
            Kind::Crop => "crop",
            Kind::Tree => "tree",
            Kind::FruitTree => "fruit-tree",
            Kind::Animal => "animal",
            Kind::Slime => "slime",
        }
    }
}

#[rustfmt::skip]
const INCLUDE_NAMES: &[(&str, &[Kind])] = &[
    ("objects",     &[Kind::Object, Kind::Machine]),
    ("machines",    &[Kind::Machine]),
    ("crops",       &[Kind::Crop]),
    ("small",       &[Kind::SmallFeature]),
    ("large",       &[Kind::LargeFeature]),
    ("features",    &[Kind::SmallFeature, Kind::LargeFeature]),
    ("trees",       &[Kind::Tree]),
    ("fruit-trees", &[Kind::FruitTree]),
    ("animals",     &[Kind::Animal]),
    ("slimes",      &[Kind::Slime]),
    ("all",         &[Kind::Object, Kind::Machine, Kind::SmallFeature, Kind::LargeFeature]),
];

/// Kinds selected by an include name such as `objects` or `features`.
pub fn include_kinds(name: &str) -> Result<KindSet, CoreError> {
    INCLUDE_NAMES
        .iter()
        .find(|(include, _)| *include == name)
        .map(|(_, kinds)| kinds.iter().copied().collect())
        .ok_or_else(|| {
            CoreError::new(
                CoreErrorCode::InvalidArgument,
                format!("unknown include {name:?}"),
            )
        })
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate found in a loaded save. Borrows the document it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entity<'a> {
    pub kind: Kind,
    pub map: &'a str,
    pub name: Option<&'a str>,
    pub position: Option<(i64, i64)>,
    pub node: &'a Element,
}

impl<'a> Entity<'a> {
    pub fn new(
        kind: Kind,
        map: &'a str,
        node: &'a Element,
        position: Option<(i64, i64)>,
    ) -> Self {
        let name = object_name(node);
        if name.is_none() {
            debug!("{kind} <{}> on {map} has no name", node.tag);
        }
        Self {
            kind,
            map,
            name,
            position,
            node,
        }
    }

    /// The `type` child when present (e.g. `Basic`, `Arch`, `White Chicken`),
    /// otherwise the name.
    pub fn entity_type(&self) -> Option<&'a str> {
        self.node
            .child("type", false)
            .and_then(Element::text)
            .or(self.name)
    }

    /// True when the text at `path` below the node is `true`.
    pub fn flag(&self, path: &str) -> bool {
        self.node.descend(path, false).and_then(Element::text) == Some("true")
    }

    pub fn number(&self, path: &str) -> Option<f64> {
        self.node
            .descend(path, false)
            .and_then(Element::text)
            .and_then(|text| text.trim().parse().ok())
    }
}

/// Name child (any case) text, falling back to the serialized type.
pub fn object_name(node: &Element) -> Option<&str> {
    node.child("name", true)
        .and_then(Element::text)
        .or_else(|| node.type_attr())
}

/// A `HoeDirt` holds a crop unless its `crop/seedIndex` is missing or `-1`.
pub fn is_crop(node: &Element) -> bool {
    if node.type_attr() != Some("HoeDirt") {
        return false;
    }
    match node.descend("crop/seedIndex", false).and_then(Element::text) {
        Some(index) => index.trim() != "-1",
        None => false,
    }
}

/// Most specific kind for a `TerrainFeature` value.
pub fn classify_feature(node: &Element) -> Kind {
    match node.type_attr() {
        Some("Tree") => Kind::Tree,
        Some("FruitTree") => Kind::FruitTree,
        _ if is_crop(node) => Kind::Crop,
        _ => Kind::SmallFeature,
    }
}

/// Tile position of a `{X, Y}` node. Fractional tile values are floored.
pub fn tile_position(node: &Element) -> Option<(i64, i64)> {
    match node.coord()? {
        Coord::Int(x, y) => Some((x, y)),
        Coord::Raw(..) => float_coord(node).map(|(x, y)| (x.floor() as i64, y.floor() as i64)),
    }
}

/// Tile position of a `{X, Y}` node holding pixel coordinates.
pub fn pixel_tile(node: &Element) -> Option<(i64, i64)> {
    let (x, y) = float_coord(node)?;
    Some(((x / TILE_SIZE).floor() as i64, (y / TILE_SIZE).floor() as i64))
}

fn float_coord(node: &Element) -> Option<(f64, f64)> {
    let (x, y) = match node.coord()? {
        Coord::Int(x, y) => return Some((x as f64, y as f64)),
        Coord::Raw(x, y) => (x, y),
    };
    match (x.trim().parse::<f64>(), y.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => Some((x, y)),
        _ => {
            debug!("unreadable position <{}>: ({x}, {y})", node.tag);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::Document;

    fn parse(xml: &str) -> Document {
        Document::parse_str(xml).expect("fixture xml should parse")
    }

    #[test]
    fn seed_index_minus_one_is_not_a_crop() {
        let empty = parse(
            r#"<TerrainFeature xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="HoeDirt">
                 <crop><seedIndex>-1</seedIndex></crop>
               </TerrainFeature>"#,
        );
        let planted = parse(
            r#"<TerrainFeature xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="HoeDirt">
                 <crop><seedIndex>13</seedIndex></crop>
               </TerrainFeature>"#,
        );
        assert!(!is_crop(empty.root()));
        assert!(is_crop(planted.root()));
        assert_eq!(classify_feature(empty.root()), Kind::SmallFeature);
        assert_eq!(classify_feature(planted.root()), Kind::Crop);
    }

    #[test]
    fn hoe_dirt_without_crop_is_not_a_crop() {
        let doc = parse(
            r#"<TerrainFeature xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="HoeDirt">
                 <fertilizer>0</fertilizer>
               </TerrainFeature>"#,
        );
        assert!(!is_crop(doc.root()));
    }

    #[test]
    fn trees_are_classified_by_type() {
        let tree = parse(
            r#"<TerrainFeature xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="Tree"><growthStage>5</growthStage></TerrainFeature>"#,
        );
        let fruit = parse(
            r#"<TerrainFeature xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="FruitTree"><fruitsOnTree>1</fruitsOnTree></TerrainFeature>"#,
        );
        assert_eq!(classify_feature(tree.root()), Kind::Tree);
        assert_eq!(classify_feature(fruit.root()), Kind::FruitTree);
    }

    #[test]
    fn name_prefers_name_child_over_type() {
        let named = parse(
            r#"<Object xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="Chest"><Name>Stone</Name><type>Basic</type></Object>"#,
        );
        let typed = parse(
            r#"<LargeTerrainFeature xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="Bush"><size>1</size></LargeTerrainFeature>"#,
        );
        let anonymous = parse("<Object><price>3</price></Object>");

        assert_eq!(object_name(named.root()), Some("Stone"));
        assert_eq!(object_name(typed.root()), Some("Bush"));
        assert_eq!(object_name(anonymous.root()), None);

        let entity = Entity::new(Kind::Object, "Farm", named.root(), Some((1, 2)));
        assert_eq!(entity.entity_type(), Some("Basic"));
        let bush = Entity::new(Kind::LargeFeature, "Farm", typed.root(), None);
        assert_eq!(bush.entity_type(), Some("Bush"));
    }

    #[test]
    fn positions_accept_tiles_and_pixels() {
        let tile = parse("<tileLocation><X>10</X><Y>12</Y></tileLocation>");
        let float_tile = parse("<tileLocation><X>10.5</X><Y>12</Y></tileLocation>");
        let pixels = parse("<position><X>640.5</X><Y>128</Y></position>");
        let junk = parse("<position><X>left</X><Y>128</Y></position>");

        assert_eq!(tile_position(tile.root()), Some((10, 12)));
        assert_eq!(tile_position(float_tile.root()), Some((10, 12)));
        assert_eq!(pixel_tile(pixels.root()), Some((10, 2)));
        assert_eq!(pixel_tile(tile.root()), Some((0, 0)));
        assert_eq!(pixel_tile(junk.root()), None);
    }

    #[test]
    fn include_names_expand_to_kinds() {
        let objects = include_kinds("objects").expect("objects");
        assert_eq!(objects.into_iter().collect::<Vec<_>>(), vec![Kind::Object, Kind::Machine]);
        let all = include_kinds("all").expect("all");
        assert_eq!(all.len(), 4);
        assert!(!all.contains(&Kind::Crop));
        let err = include_kinds("villagers").expect_err("unknown include");
        assert_eq!(err.code, CoreErrorCode::InvalidArgument);
    }

    #[test]
    fn flags_and_numbers_read_descendant_text() {
        let doc = parse(
            "<TerrainFeature><crop><fullGrown>true</fullGrown><dead>false</dead><phase>3</phase></crop></TerrainFeature>",
        );
        let entity = Entity::new(Kind::Crop, "Farm", doc.root(), None);
        assert!(entity.flag("crop/fullGrown"));
        assert!(!entity.flag("crop/dead"));
        assert!(!entity.flag("crop/missing"));
        assert_eq!(entity.number("crop/phase"), Some(3.0));
    }
}
