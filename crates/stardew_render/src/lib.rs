use std::fmt::Write as _;

use serde_json::{Map as JsonMap, Number as JsonNumber, Value as JsonValue};
use stardew_core::core_api::CountEntry;
use stardew_core::entity::{Entity, Kind};
use stardew_core::flatten::{FlattenOptions, Flattener, Value};
use stardew_core::game_data::GameData;

pub const VERBOSITY_BRIEF: u8 = 0;
pub const VERBOSITY_NORMAL: u8 = 1;
pub const VERBOSITY_LONG: u8 = 2;
pub const VERBOSITY_FULL: u8 = 3;

const OVERALL_PREFIX: &str = "overall";
const UNNAMED: &str = "<none>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextRenderOptions {
    pub verbosity: u8,
}

/// `overall`, or the map patterns joined with `+`.
pub fn count_prefix<S: AsRef<str>>(maps: &[S]) -> String {
    if maps.is_empty() {
        return OVERALL_PREFIX.to_string();
    }
    maps.iter()
        .map(|map| map.as_ref())
        .collect::<Vec<_>>()
        .join("+")
}

pub fn render_counts(prefix: &str, counts: &[CountEntry]) -> String {
    let mut out = String::new();
    for entry in counts {
        writeln!(&mut out, "{prefix} {} {}", entry.name, entry.count)
            .expect("writing to String cannot fail");
    }
    out
}

pub fn render_lines(
    entities: &[Entity<'_>],
    data: &GameData,
    options: TextRenderOptions,
) -> String {
    let mut out = String::new();
    for entity in entities {
        out.push_str(&render_entity_line(entity, data, options));
        out.push('\n');
    }
    out
}

/// `<map> <name> at (<x>, <y>)`, with crop notes appended for crops.
pub fn render_entity_line(
    entity: &Entity<'_>,
    data: &GameData,
    options: TextRenderOptions,
) -> String {
    if entity.kind == Kind::Crop {
        let crop = CropSummary::from_entity(entity, data);
        let line = format_line(entity.map, &crop.produce, entity.position);
        let notes = crop.notes(options.verbosity);
        if notes.is_empty() {
            return line;
        }
        return format!("{line} {}", notes.join("; "));
    }
    format_line(entity.map, entity.name.unwrap_or(UNNAMED), entity.position)
}

fn format_line(map: &str, name: &str, position: Option<(i64, i64)>) -> String {
    match position {
        Some((x, y)) => format!("{map} {name} at ({x}, {y})"),
        None => format!("{map} {name} at (?, ?)"),
    }
}

/// What the text view reports about a planted `HoeDirt`.
#[derive(Debug, Clone, PartialEq)]
pub struct CropSummary {
    pub produce: String,
    pub dead: bool,
    pub ready: bool,
    pub forage: bool,
    pub seasons: Vec<String>,
    pub fertilizer: Option<String>,
    pub phase: Option<i64>,
    pub phase_days: Option<i64>,
    pub min_harvest: Option<i64>,
    pub max_harvest: Option<i64>,
}

impl CropSummary {
    pub fn from_entity(entity: &Entity<'_>, data: &GameData) -> Self {
        let fields = Flattener::new().value(entity.node);
        let dirt = fields.as_ref();
        let crop = dirt.and_then(|d| d.get("crop"));
        let int = |key: &str| crop.and_then(|c| c.get(key)).and_then(object_id);
        let flag = |key: &str| {
            crop.and_then(|c| c.get(key))
                .and_then(Value::as_bool)
                .unwrap_or(false)
        };

        let produce = match int("indexOfHarvest").or_else(|| int("seedIndex")) {
            Some(id) => data.object_name(&id.to_string()),
            None => entity.name.unwrap_or(UNNAMED).to_string(),
        };
        let seasons: Vec<String> = crop
            .and_then(|c| c.get("seasonsToGrowIn"))
            .and_then(|s| s.get("string"))
            .map(|s| s.as_slice().iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();
        let fertilizer = dirt
            .and_then(|d| d.get("fertilizer"))
            .and_then(object_id)
            .filter(|id| *id > 0)
            .map(|id| data.object_name(&id.to_string()));
        let phase = int("currentPhase");
        let phase_days = crop
            .and_then(|c| c.get("phaseDays"))
            .and_then(|p| p.get("int"))
            .zip(phase)
            .and_then(|(days, phase)| {
                usize::try_from(phase)
                    .ok()
                    .and_then(|i| days.as_slice().get(i))
            })
            .and_then(Value::as_int);

        Self {
            produce,
            dead: flag("dead"),
            ready: flag("fullGrown"),
            forage: flag("forageCrop"),
            seasons,
            fertilizer,
            phase,
            phase_days,
            min_harvest: int("minHarvest"),
            max_harvest: int("maxHarvest"),
        }
    }

    /// Notes shown after the position; more appear as verbosity rises.
    pub fn notes(&self, verbosity: u8) -> Vec<String> {
        let mut notes = Vec::new();
        if self.dead {
            notes.push("dead".to_string());
        }
        if self.ready {
            notes.push("ready".to_string());
        }
        if verbosity >= VERBOSITY_NORMAL && !self.seasons.is_empty() {
            notes.push(self.seasons.join(","));
        }
        if verbosity >= VERBOSITY_LONG {
            if self.forage {
                notes.push("forage".to_string());
            }
            if let Some(fertilizer) = &self.fertilizer {
                notes.push(format!("fertilizer={fertilizer:?}"));
            }
        }
        if verbosity >= VERBOSITY_FULL {
            if let Some(phase) = self.phase {
                match self.phase_days {
                    Some(days) => notes.push(format!("phase={phase} days={days}")),
                    None => notes.push(format!("phase={phase}")),
                }
            }
            match (self.min_harvest, self.max_harvest) {
                (Some(min), Some(max)) if min == max => notes.push(format!("yield={min}")),
                (Some(min), Some(max)) if min > 0 && max > 0 => {
                    notes.push(format!("yield={min} to {max}"))
                }
                _ => {}
            }
        }
        notes
    }
}

// Object ids are plain integers in older saves and `(O)368` in newer ones.
fn object_id(value: &Value) -> Option<i64> {
    match value {
        Value::Int(id) => Some(*id),
        Value::Str(text) => text.trim_start_matches("(O)").parse().ok(),
        _ => None,
    }
}

pub fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Int(i) => JsonValue::from(*i),
        Value::Float(f) => JsonNumber::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::Str(s) => JsonValue::String(s.clone()),
        Value::Pair(x, y) => JsonValue::Array(vec![value_to_json(x), value_to_json(y)]),
        Value::Map(fields) => {
            let mut out = JsonMap::new();
            for (key, value) in fields {
                out.insert(key.clone(), value_to_json(value));
            }
            JsonValue::Object(out)
        }
        Value::List(items) => JsonValue::Array(items.iter().map(value_to_json).collect()),
    }
}

/// The entity's node flattened to `{tag: value}`, keys sorted.
pub fn render_entity_json(entity: &Entity<'_>, options: FlattenOptions) -> JsonValue {
    let flattener = Flattener::from_options(options);
    value_to_json(&Value::Map(flattener.flatten(entity.node)))
}

/// One pretty-printed JSON document per entity.
pub fn render_long(entities: &[Entity<'_>], options: FlattenOptions) -> String {
    let flattener = Flattener::from_options(options);
    let mut out = String::new();
    for entity in entities {
        let value = value_to_json(&Value::Map(flattener.flatten(entity.node)));
        let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
        out.push_str(&text);
        out.push('\n');
    }
    out
}

/// The query result as one JSON document. `fields` adds the flattened node
/// of each entity.
pub fn render_query_json(
    entities: &[Entity<'_>],
    fields: Option<FlattenOptions>,
) -> JsonValue {
    let flattener = fields.map(Flattener::from_options);
    let items = entities
        .iter()
        .map(|entity| {
            let mut out = entity_summary_json(entity);
            if let Some(flattener) = &flattener {
                out.insert(
                    "fields".to_string(),
                    value_to_json(&Value::Map(flattener.flatten(entity.node))),
                );
            }
            JsonValue::Object(out)
        })
        .collect();

    let mut out = JsonMap::new();
    out.insert("count".to_string(), JsonValue::from(entities.len()));
    out.insert("entities".to_string(), JsonValue::Array(items));
    JsonValue::Object(out)
}

pub fn render_counts_json(prefix: &str, counts: &[CountEntry]) -> JsonValue {
    let items = counts
        .iter()
        .map(|entry| {
            let mut out = JsonMap::new();
            out.insert("name".to_string(), JsonValue::String(entry.name.clone()));
            out.insert("count".to_string(), JsonValue::from(entry.count));
            JsonValue::Object(out)
        })
        .collect();

    let mut out = JsonMap::new();
    out.insert("prefix".to_string(), JsonValue::String(prefix.to_string()));
    out.insert("counts".to_string(), JsonValue::Array(items));
    JsonValue::Object(out)
}

fn entity_summary_json(entity: &Entity<'_>) -> JsonMap<String, JsonValue> {
    let mut out = JsonMap::new();
    out.insert(
        "kind".to_string(),
        JsonValue::String(entity.kind.as_str().to_string()),
    );
    out.insert("map".to_string(), JsonValue::String(entity.map.to_string()));
    out.insert("name".to_string(), optional_string(entity.name));
    out.insert("type".to_string(), optional_string(entity.entity_type()));
    out.insert(
        "position".to_string(),
        match entity.position {
            Some((x, y)) => JsonValue::Array(vec![JsonValue::from(x), JsonValue::from(y)]),
            None => JsonValue::Null,
        },
    );
    out
}

fn optional_string(value: Option<&str>) -> JsonValue {
    match value {
        Some(v) => JsonValue::String(v.to_string()),
        None => JsonValue::Null,
    }
}
