//! Read-only lookup tables: known locations, forage, artifact markers and
//! object ids.
//!
//! The built-in tables cover vanilla content. An unpacked
//! `ObjectInformation.json` (id -> `Name/Price/Edibility/Type Category/...`)
//! can be layered on top to resolve every object id of a given install.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::core_api::{CoreError, CoreErrorCode};

pub const LOCATION_UNKNOWN: &str = "<unknown>";

const OBJECT_INFORMATION_FILE: &str = "ObjectInformation.json";

#[rustfmt::skip]
const LOCATIONS: &[&str] = &[
    "AbandonedJojaMart", "AdventureGuild", "BathHousePool", "Beach", "BeachNightMarket",
    "BoatTunnel", "BugLand", "BusStop", "Caldera", "Cellar", "Club", "CommunityCenter",
    "Desert", "Farm", "FarmCave", "FarmHouse", "FishShop", "Forest", "Greenhouse",
    "IslandEast", "IslandFarmCave", "IslandFarmHouse", "IslandFieldOffice", "IslandHut",
    "IslandLocation", "IslandNorth", "IslandShrine", "IslandSouth", "IslandSouthEast",
    "IslandSouthEastCave", "IslandWest", "IslandWestCave1", "JojaMart", "LibraryMuseum",
    "ManorHouse", "MermaidHouse", "Mine", "Mountain", "MovieTheater", "Railroad",
    "SeedShop", "Sewer", "Submarine", "Summit", "Town", "WizardHouse", "Woods",
    // farm building interiors
    "Barn", "Big Barn", "Deluxe Barn", "Coop", "Big Coop", "Deluxe Coop", "Shed",
    "Big Shed", "Slime Hutch", "Cabin",
    LOCATION_UNKNOWN,
];

#[rustfmt::skip]
const FORAGE_SPRING: &[&str] = &[
    "Wild Horseradish", "Daffodil", "Leek", "Dandelion", "Spring Onion",
    "Common Mushroom", "Morel", "Salmonberry",
];
#[rustfmt::skip]
const FORAGE_SUMMER: &[&str] = &[
    "Grape", "Spice Berry", "Sweet Pea", "Red Mushroom", "Fiddlehead Fern",
    "Common Mushroom",
];
#[rustfmt::skip]
const FORAGE_FALL: &[&str] = &[
    "Common Mushroom", "Wild Plum", "Hazelnut", "Blackberry", "Chanterelle",
    "Red Mushroom", "Purple Mushroom",
];
const FORAGE_WINTER: &[&str] = &["Winter Root", "Crystal Fruit", "Snow Yam", "Crocus", "Holly"];
#[rustfmt::skip]
const FORAGE_BEACH: &[&str] = &[
    "Nautilus Shell", "Coral", "Sea Urchin", "Rainbow Shell", "Clam", "Cockle",
    "Mussel", "Oyster", "Seaweed",
];
const FORAGE_MINES: &[&str] = &["Red Mushroom", "Purple Mushroom", "Cave Carrot"];
const FORAGE_DESERT: &[&str] = &["Cactus Fruit", "Coconut"];
const FORAGE_ISLAND: &[&str] = &["Ginger", "Magma Cap"];

const ARTIFACT_MARKERS: &[&str] = &["Artifact Spot"];

struct WellKnownObject {
    id: i32,
    name: &'static str,
    object_type: &'static str,
    category: Option<i32>,
}

// Object ids the renderer resolves most often: crops, their seeds and the
// fertilizers found on hoe dirt.
#[rustfmt::skip]
const WELL_KNOWN_OBJECTS: &[WellKnownObject] = &[
    // Forage
    WellKnownObject { id:  16, name: "Wild Horseradish",      object_type: "Basic",   category: Some(-81) },
    WellKnownObject { id:  18, name: "Daffodil",              object_type: "Basic",   category: Some(-81) },
    WellKnownObject { id:  20, name: "Leek",                  object_type: "Basic",   category: Some(-81) },
    WellKnownObject { id:  22, name: "Dandelion",             object_type: "Basic",   category: Some(-81) },
    WellKnownObject { id: 257, name: "Morel",                 object_type: "Basic",   category: Some(-81) },
    WellKnownObject { id: 296, name: "Salmonberry",           object_type: "Basic",   category: Some(-79) },
    WellKnownObject { id: 399, name: "Spring Onion",          object_type: "Basic",   category: Some(-81) },
    WellKnownObject { id: 404, name: "Common Mushroom",       object_type: "Basic",   category: Some(-81) },

    // Crops
    WellKnownObject { id:  24, name: "Parsnip",               object_type: "Basic",   category: Some(-75) },
    WellKnownObject { id: 188, name: "Green Bean",            object_type: "Basic",   category: Some(-75) },
    WellKnownObject { id: 190, name: "Cauliflower",           object_type: "Basic",   category: Some(-75) },
    WellKnownObject { id: 192, name: "Potato",                object_type: "Basic",   category: Some(-75) },
    WellKnownObject { id: 248, name: "Garlic",                object_type: "Basic",   category: Some(-75) },
    WellKnownObject { id: 250, name: "Kale",                  object_type: "Basic",   category: Some(-75) },
    WellKnownObject { id: 252, name: "Rhubarb",               object_type: "Basic",   category: Some(-79) },
    WellKnownObject { id: 254, name: "Melon",                 object_type: "Basic",   category: Some(-79) },
    WellKnownObject { id: 256, name: "Tomato",                object_type: "Basic",   category: Some(-75) },
    WellKnownObject { id: 258, name: "Blueberry",             object_type: "Basic",   category: Some(-79) },
    WellKnownObject { id: 260, name: "Hot Pepper",            object_type: "Basic",   category: Some(-79) },
    WellKnownObject { id: 262, name: "Wheat",                 object_type: "Basic",   category: Some(-75) },
    WellKnownObject { id: 264, name: "Radish",                object_type: "Basic",   category: Some(-75) },
    WellKnownObject { id: 266, name: "Red Cabbage",           object_type: "Basic",   category: Some(-75) },
    WellKnownObject { id: 268, name: "Starfruit",             object_type: "Basic",   category: Some(-79) },
    WellKnownObject { id: 270, name: "Corn",                  object_type: "Basic",   category: Some(-75) },
    WellKnownObject { id: 272, name: "Eggplant",              object_type: "Basic",   category: Some(-75) },
    WellKnownObject { id: 274, name: "Artichoke",             object_type: "Basic",   category: Some(-75) },
    WellKnownObject { id: 276, name: "Pumpkin",               object_type: "Basic",   category: Some(-75) },
    WellKnownObject { id: 278, name: "Bok Choy",              object_type: "Basic",   category: Some(-75) },
    WellKnownObject { id: 280, name: "Yam",                   object_type: "Basic",   category: Some(-75) },
    WellKnownObject { id: 282, name: "Cranberries",           object_type: "Basic",   category: Some(-79) },
    WellKnownObject { id: 284, name: "Beet",                  object_type: "Basic",   category: Some(-75) },
    WellKnownObject { id: 300, name: "Amaranth",              object_type: "Basic",   category: Some(-75) },
    WellKnownObject { id: 304, name: "Hops",                  object_type: "Basic",   category: Some(-75) },
    WellKnownObject { id: 376, name: "Poppy",                 object_type: "Basic",   category: Some(-80) },
    WellKnownObject { id: 398, name: "Grape",                 object_type: "Basic",   category: Some(-79) },
    WellKnownObject { id: 400, name: "Strawberry",            object_type: "Basic",   category: Some(-79) },
    WellKnownObject { id: 421, name: "Sunflower",             object_type: "Basic",   category: Some(-80) },
    WellKnownObject { id: 433, name: "Coffee Bean",           object_type: "Seeds",   category: Some(-74) },
    WellKnownObject { id: 591, name: "Tulip",                 object_type: "Basic",   category: Some(-80) },
    WellKnownObject { id: 593, name: "Summer Spangle",        object_type: "Basic",   category: Some(-80) },
    WellKnownObject { id: 595, name: "Fairy Rose",            object_type: "Basic",   category: Some(-80) },
    WellKnownObject { id: 597, name: "Blue Jazz",             object_type: "Basic",   category: Some(-80) },

    // Seeds
    WellKnownObject { id: 472, name: "Parsnip Seeds",         object_type: "Seeds",   category: Some(-74) },
    WellKnownObject { id: 473, name: "Bean Starter",          object_type: "Seeds",   category: Some(-74) },
    WellKnownObject { id: 474, name: "Cauliflower Seeds",     object_type: "Seeds",   category: Some(-74) },
    WellKnownObject { id: 475, name: "Potato Seeds",          object_type: "Seeds",   category: Some(-74) },

    // Fertilizers
    WellKnownObject { id: 368, name: "Basic Fertilizer",      object_type: "Basic",   category: Some(-19) },
    WellKnownObject { id: 369, name: "Quality Fertilizer",    object_type: "Basic",   category: Some(-19) },
    WellKnownObject { id: 370, name: "Basic Retaining Soil",  object_type: "Basic",   category: Some(-19) },
    WellKnownObject { id: 371, name: "Quality Retaining Soil",object_type: "Basic",   category: Some(-19) },
    WellKnownObject { id: 465, name: "Speed-Gro",             object_type: "Basic",   category: Some(-19) },
    WellKnownObject { id: 466, name: "Deluxe Speed-Gro",      object_type: "Basic",   category: Some(-19) },

    // Debris
    WellKnownObject { id: 388, name: "Wood",                  object_type: "Basic",   category: Some(-16) },
    WellKnownObject { id: 390, name: "Stone",                 object_type: "Basic",   category: Some(-16) },
    WellKnownObject { id: 590, name: "Artifact Spot",         object_type: "Arch",    category: None },
    WellKnownObject { id: 771, name: "Fiber",                 object_type: "Basic",   category: Some(-16) },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectInfo {
    pub id: String,
    pub name: String,
    pub object_type: String,
    pub category: Option<i32>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameData {
    source: Option<PathBuf>,
    locations: BTreeSet<String>,
    forage: BTreeSet<String>,
    artifact_markers: BTreeSet<String>,
    objects: BTreeMap<String, ObjectInfo>,
}

impl Default for GameData {
    fn default() -> Self {
        Self::builtin()
    }
}

impl GameData {
    pub fn builtin() -> Self {
        let forage = [
            FORAGE_SPRING,
            FORAGE_SUMMER,
            FORAGE_FALL,
            FORAGE_WINTER,
            FORAGE_BEACH,
            FORAGE_MINES,
            FORAGE_DESERT,
            FORAGE_ISLAND,
        ]
        .iter()
        .flat_map(|season| season.iter())
        .map(|name| name.to_string())
        .collect();

        let objects = WELL_KNOWN_OBJECTS
            .iter()
            .map(|item| {
                let id = item.id.to_string();
                let info = ObjectInfo {
                    id: id.clone(),
                    name: item.name.to_string(),
                    object_type: item.object_type.to_string(),
                    category: item.category,
                    display_name: None,
                };
                (id, info)
            })
            .collect();

        Self {
            source: None,
            locations: LOCATIONS.iter().map(|s| s.to_string()).collect(),
            forage,
            artifact_markers: ARTIFACT_MARKERS.iter().map(|s| s.to_string()).collect(),
            objects,
        }
    }

    /// Built-in tables extended with the `ObjectInformation.json` found in
    /// `dir` (or `dir/Data`).
    pub fn load_from_dir(dir: &Path) -> Result<Self, CoreError> {
        let path = find_object_information(dir).ok_or_else(|| {
            CoreError::not_found(format!(
                "no {OBJECT_INFORMATION_FILE} under {} (or {}/Data)",
                dir.display(),
                dir.display()
            ))
        })?;
        let text = fs::read_to_string(&path).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!("failed to read {}: {e}", path.display()),
            )
        })?;
        let loaded = parse_object_information(&text).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Parse,
                format!("{}: {}", path.display(), e.message),
            )
        })?;
        debug!("loaded {} objects from {}", loaded.len(), path.display());

        let mut data = Self::builtin();
        data.objects.extend(loaded);
        data.source = Some(path);
        Ok(data)
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn is_known_location(&self, name: &str) -> bool {
        self.locations.contains(name)
    }

    pub fn is_forage(&self, name: &str) -> bool {
        self.forage.contains(name)
    }

    pub fn is_artifact_marker(&self, name: &str) -> bool {
        self.artifact_markers.contains(name)
    }

    pub fn object(&self, id: &str) -> Option<&ObjectInfo> {
        self.objects.get(id)
    }

    /// Display name for an object id, falling back to the id itself.
    pub fn object_name(&self, id: &str) -> String {
        match self.object(id) {
            Some(info) => info.display_name.clone().unwrap_or_else(|| info.name.clone()),
            None => format!("#{id}"),
        }
    }

    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

fn find_object_information(dir: &Path) -> Option<PathBuf> {
    [
        dir.join(OBJECT_INFORMATION_FILE),
        dir.join("Data").join(OBJECT_INFORMATION_FILE),
    ]
    .into_iter()
    .find(|path| path.is_file())
}

/// Parses the id -> slash-delimited record map. Records that do not have at
/// least a name and a type field are skipped with a warning.
pub fn parse_object_information(text: &str) -> Result<BTreeMap<String, ObjectInfo>, CoreError> {
    let raw: BTreeMap<String, String> = serde_json::from_str(text)
        .map_err(|e| CoreError::new(CoreErrorCode::Parse, format!("invalid JSON: {e}")))?;

    let mut out = BTreeMap::new();
    for (id, record) in raw {
        match parse_object_record(&id, &record) {
            Some(info) => {
                out.insert(id, info);
            }
            None => warn!("skipping malformed object record {id}: {record:?}"),
        }
    }
    Ok(out)
}

fn parse_object_record(id: &str, record: &str) -> Option<ObjectInfo> {
    let fields: Vec<&str> = record.split('/').collect();
    let name = fields.first().filter(|name| !name.is_empty())?;
    let mut type_field = fields.get(3)?.split_whitespace();
    let object_type = type_field.next()?;
    let category = type_field.next().and_then(|c| c.parse::<i32>().ok());
    let display_name = fields
        .get(4)
        .filter(|display| !display.is_empty() && display != &name)
        .map(|display| display.to_string());

    Some(ObjectInfo {
        id: id.to_string(),
        name: name.to_string(),
        object_type: object_type.to_string(),
        category,
        display_name,
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    #[test]
    fn builtin_tables_cover_vanilla_content() {
        let data = GameData::builtin();
        assert!(data.is_known_location("Farm"));
        assert!(data.is_known_location("IslandWest"));
        assert!(data.is_known_location("Slime Hutch"));
        assert!(data.is_known_location(LOCATION_UNKNOWN));
        assert!(!data.is_known_location("ModdedGrove"));
        assert!(data.is_forage("Daffodil"));
        assert!(data.is_forage("Magma Cap"));
        assert!(!data.is_forage("Stone"));
        assert!(data.is_artifact_marker("Artifact Spot"));
        assert_eq!(data.object_name("24"), "Parsnip");
        assert_eq!(data.object_name("368"), "Basic Fertilizer");
        assert_eq!(data.object_name("99999"), "#99999");
    }

    #[test]
    fn object_records_split_type_and_category() {
        let parsed = parse_object_information(
            r#"{
                "24": "Parsnip/35/10/Basic -75/Parsnip/A spring tuber.",
                "590": "Artifact Spot/0/-300/Arch/Artifact Spot/Dig here.",
                "9001": "Moon Melon/500/40/Basic -79/Lunar Melon/Modded.",
                "bad": "no fields"
            }"#,
        )
        .expect("object information should parse");

        assert_eq!(parsed.len(), 3);
        let parsnip = &parsed["24"];
        assert_eq!(parsnip.name, "Parsnip");
        assert_eq!(parsnip.object_type, "Basic");
        assert_eq!(parsnip.category, Some(-75));
        assert_eq!(parsnip.display_name, None);
        assert_eq!(parsed["590"].category, None);
        assert_eq!(parsed["9001"].display_name.as_deref(), Some("Lunar Melon"));
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let err = parse_object_information("[1, 2").expect_err("should fail");
        assert_eq!(err.code, CoreErrorCode::Parse);
    }

    #[test]
    fn loads_object_information_from_data_subdirectory() {
        let root = temp_test_dir("game_data");
        let data_dir = root.join("Data");
        fs::create_dir_all(&data_dir).expect("failed to create data dir");
        fs::write(
            data_dir.join(OBJECT_INFORMATION_FILE),
            r#"{"9001": "Moon Melon/500/40/Basic -79/Moon Melon/Modded."}"#,
        )
        .expect("failed to write object information");

        let data = GameData::load_from_dir(&root).expect("game data should load");
        assert_eq!(data.object_name("9001"), "Moon Melon");
        assert_eq!(data.object_name("24"), "Parsnip");
        assert_eq!(
            data.source(),
            Some(data_dir.join(OBJECT_INFORMATION_FILE).as_path())
        );

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_object_information_is_not_found() {
        let root = temp_test_dir("game_data_missing");
        fs::create_dir_all(&root).expect("failed to create temp root");
        let err = GameData::load_from_dir(&root).expect_err("should fail");
        assert_eq!(err.code, CoreErrorCode::NotFound);
        let _ = fs::remove_dir_all(&root);
    }

    fn temp_test_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "stardew_inspect_{}_{}_{}",
            prefix,
            std::process::id(),
            nanos
        ))
    }
}
