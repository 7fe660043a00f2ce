use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, CommandFactory, Parser, ValueEnum};
use log::{LevelFilter, debug};
use serde_json::Value as JsonValue;
use stardew_core::core_api::{Engine, Query, count_by_name, sort_entities};
use stardew_core::entity::{self, KindSet};
use stardew_core::filter::FilterSpec;
use stardew_core::flatten::FlattenOptions;
use stardew_core::game_data::GameData;
use stardew_core::saves;
use stardew_render::{
    TextRenderOptions, VERBOSITY_BRIEF, VERBOSITY_FULL, count_prefix, render_counts,
    render_counts_json, render_lines, render_long, render_query_json,
};

const AFTER_HELP: &str = "\
Save file selection:
  If -f,--file is given, use that.
  Otherwise, if --farm is given, scan the save path (see -P,--save-path).
  Otherwise, if --list is given, list all save files in the save path.
  Otherwise, print the usage and exit.

-n, -t, -m and -C take shell globs and may be repeated. Prefix a pattern with
'!' to exclude whatever it matches; an exclusion always wins.

Categories (-C): artifact, forage, crop-ready, crop-dead, no-fertilizer,
ready-to-harvest.";

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum IncludeArg {
    Objects,
    Machines,
    Crops,
    Small,
    Large,
    Features,
    Trees,
    FruitTrees,
    Animals,
    Slimes,
    All,
}

impl IncludeArg {
    fn as_str(self) -> &'static str {
        match self {
            IncludeArg::Objects => "objects",
            IncludeArg::Machines => "machines",
            IncludeArg::Crops => "crops",
            IncludeArg::Small => "small",
            IncludeArg::Large => "large",
            IncludeArg::Features => "features",
            IncludeArg::Trees => "trees",
            IncludeArg::FruitTrees => "fruit-trees",
            IncludeArg::Animals => "animals",
            IncludeArg::Slimes => "slimes",
            IncludeArg::All => "all",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum FormatterArg {
    False,
    Zero,
    Points,
}

#[derive(Debug, Parser)]
#[command(author, version, about, after_help = AFTER_HELP)]
struct Cli {
    /// Farm name; resolved to <save-path>/<NAME>_<id>/<NAME>_<id>
    #[arg(long, value_name = "NAME", conflicts_with_all = ["file", "list"])]
    farm: Option<String>,
    /// Path to a save file or save directory
    #[arg(short = 'f', long, value_name = "PATH", conflicts_with = "list")]
    file: Option<PathBuf>,
    /// List available save files and exit
    #[arg(long)]
    list: bool,
    /// Directory holding the save directories
    #[arg(short = 'P', long = "save-path", value_name = "DIR", env = "STARDEW_SAVES")]
    save_path: Option<PathBuf>,
    /// Directory with an unpacked ObjectInformation.json
    #[arg(short = 'D', long = "data-dir", value_name = "DIR")]
    data_dir: Option<PathBuf>,
    /// Things to enumerate (default: objects)
    #[arg(short = 'i', long = "include", value_enum, action = ArgAction::Append)]
    include: Vec<IncludeArg>,
    /// Select by name
    #[arg(short = 'n', long = "name", value_name = "PATTERN", allow_hyphen_values = true)]
    names: Vec<String>,
    /// Select by type
    #[arg(short = 't', long = "type", value_name = "PATTERN", allow_hyphen_values = true)]
    types: Vec<String>,
    /// Limit to maps
    #[arg(short = 'm', long = "map", value_name = "PATTERN", allow_hyphen_values = true)]
    maps: Vec<String>,
    /// Select by category
    #[arg(short = 'C', long = "category", value_name = "PATTERN", allow_hyphen_values = true)]
    categories: Vec<String>,
    /// Show counts by name instead of entities
    #[arg(short = 'c', long)]
    count: bool,
    /// Sort output
    #[arg(short = 's', long)]
    sort: bool,
    /// Amount of detail in text output
    #[arg(
        short = 'l',
        long = "verbosity-level",
        default_value_t = 0,
        value_parser = clap::value_parser!(u8)
            .range(i64::from(VERBOSITY_BRIEF)..=i64::from(VERBOSITY_FULL))
    )]
    verbosity_level: u8,
    /// Print every entity as flattened JSON
    #[arg(short = 'L', long)]
    long: bool,
    /// Flattening options for --long; with --json, adds each entity's fields
    #[arg(short = 'F', long = "formatter", value_enum, action = ArgAction::Append)]
    formatters: Vec<FormatterArg>,
    /// Print the whole result as one JSON document
    #[arg(long)]
    json: bool,
    /// More logging; repeat for trace output
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn kinds(&self) -> KindSet {
        let includes: &[IncludeArg] = if self.include.is_empty() {
            &[IncludeArg::Objects]
        } else {
            &self.include
        };
        let mut kinds = KindSet::new();
        for include in includes {
            let selected = entity::include_kinds(include.as_str()).unwrap_or_else(|e| {
                eprintln!("{e}");
                process::exit(2);
            });
            kinds.extend(selected);
        }
        kinds
    }

    fn filter(&self) -> FilterSpec {
        FilterSpec::from_patterns(&self.names, &self.types, &self.categories, &self.maps)
    }

    fn flatten_options(&self) -> FlattenOptions {
        FlattenOptions {
            filter_false: self.formatters.contains(&FormatterArg::False),
            filter_zero: self.formatters.contains(&FormatterArg::Zero),
            collapse_points: self.formatters.contains(&FormatterArg::Points),
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_env("RUST_LOG")
        .init();
}

fn save_root(cli: &Cli) -> PathBuf {
    cli.save_path
        .clone()
        .or_else(saves::default_save_root)
        .unwrap_or_else(|| {
            eprintln!("cannot determine the save directory; pass -P/--save-path");
            process::exit(2);
        })
}

fn load_game_data(dir: Option<&Path>) -> GameData {
    let Some(dir) = dir else {
        return GameData::builtin();
    };
    GameData::load_from_dir(dir).unwrap_or_else(|e| {
        eprintln!("Error loading game data from {}", dir.display());
        eprintln!("  {e}");
        process::exit(1);
    })
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.list {
        let root = save_root(&cli);
        let listed = saves::list_saves(&root).unwrap_or_else(|e| {
            eprintln!("Error listing saves: {e}");
            process::exit(1);
        });
        for path in listed {
            println!("{}", path.display());
        }
        return;
    }

    let save_file = match (&cli.farm, &cli.file) {
        (Some(farm), _) => {
            let root = save_root(&cli);
            saves::find_farm(&root, farm)
                .and_then(|dir| saves::resolve_save_file(&dir, &root))
                .unwrap_or_else(|e| {
                    eprintln!("Failed to find farm {farm}: {e}");
                    process::exit(1);
                })
        }
        (None, Some(file)) => {
            let root = cli
                .save_path
                .clone()
                .or_else(saves::default_save_root)
                .unwrap_or_default();
            saves::resolve_save_file(file, &root).unwrap_or_else(|e| {
                eprintln!("Failed to find save {}: {e}", file.display());
                process::exit(1);
            })
        }
        (None, None) => {
            if let Err(e) = Cli::command().print_help() {
                eprintln!("Error printing usage: {e}");
                process::exit(1);
            }
            println!();
            return;
        }
    };

    let data = load_game_data(cli.data_dir.as_deref());
    debug!(
        "game data: {} locations, {} objects",
        data.location_count(),
        data.object_count()
    );

    let session = Engine::new().open_path(&save_file).unwrap_or_else(|e| {
        eprintln!("Error parsing save file: {}", save_file.display());
        eprintln!("  {e}");
        process::exit(1);
    });

    let query = Query::new(cli.kinds(), cli.filter());
    let mut entities = session.query(&data, &query);

    if cli.count {
        let prefix = count_prefix(&cli.maps);
        let counts = count_by_name(&entities, cli.sort);
        if cli.json {
            print_json(&render_counts_json(&prefix, &counts));
        } else {
            print!("{}", render_counts(&prefix, &counts));
        }
        return;
    }

    if cli.sort {
        sort_entities(&mut entities);
    }
    if cli.json {
        let with_fields = cli.long || !cli.formatters.is_empty();
        let fields = with_fields.then(|| cli.flatten_options());
        print_json(&render_query_json(&entities, fields));
    } else if cli.long {
        print!("{}", render_long(&entities, cli.flatten_options()));
    } else {
        let options = TextRenderOptions {
            verbosity: cli.verbosity_level,
        };
        print!("{}", render_lines(&entities, &data, options));
    }
}

fn print_json(value: &JsonValue) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("Error serializing JSON: {e}");
            process::exit(1);
        }
    }
}
