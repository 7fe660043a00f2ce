use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn save_root() -> PathBuf {
    workspace_root().join("tests/fixtures/Saves")
}

fn save_file() -> PathBuf {
    save_root().join("Meadow_123456789/Meadow_123456789")
}

fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_stardew-inspect"))
        .args(args)
        .env_remove("STARDEW_SAVES")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run stardew-inspect CLI")
}

fn run_on_fixture(extra: &[&str]) -> std::process::Output {
    let path = save_file();
    let path = path.to_string_lossy().to_string();
    let mut args = vec!["-f", path.as_str()];
    args.extend_from_slice(extra);
    run_cli(&args)
}

fn stdout_lines(output: &std::process::Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

fn temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("{prefix}_{}_{}", std::process::id(), nanos))
}

#[test]
fn no_selection_prints_usage_and_succeeds() {
    let output = run_cli(&[]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"));
}

#[test]
fn list_prints_save_files() {
    let root = save_root();
    let root = root.to_string_lossy().to_string();
    let output = run_cli(&["--list", "-P", &root]);
    assert!(output.status.success());

    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with("Meadow_123456789"));
    assert!(PathBuf::from(&lines[0]).is_file());
}

#[test]
fn farm_and_file_are_mutually_exclusive() {
    let path = save_file();
    let path = path.to_string_lossy().to_string();
    let output = run_cli(&["--farm", "Meadow", "-f", &path]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn farm_name_is_resolved_under_the_save_path() {
    let root = save_root();
    let root = root.to_string_lossy().to_string();
    let output = run_cli(&["--farm", "Meadow", "-P", &root, "-n", "Keg"]);
    assert!(output.status.success());
    assert_eq!(stdout_lines(&output), vec!["Farm Keg at (30, 31)"]);
}

#[test]
fn save_path_can_come_from_the_environment() {
    let output = Command::new(env!("CARGO_BIN_EXE_stardew-inspect"))
        .args(["--farm", "Meadow", "-n", "Daffodil"])
        .env("STARDEW_SAVES", save_root())
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run stardew-inspect CLI");
    assert!(output.status.success());
    assert_eq!(stdout_lines(&output), vec!["Farm Daffodil at (5, 6)"]);
}

#[test]
fn unknown_farm_fails() {
    let root = save_root();
    let root = root.to_string_lossy().to_string();
    let output = run_cli(&["--farm", "Nowhere", "-P", &root]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Nowhere"));
}

#[test]
fn directory_paths_resolve_to_the_inner_save() {
    let dir = save_root().join("Meadow_123456789");
    let dir = dir.to_string_lossy().to_string();
    let output = run_cli(&["-f", &dir, "-m", "IslandWest"]);
    assert!(output.status.success());
    assert_eq!(stdout_lines(&output), vec!["IslandWest Stone at (7, 8)"]);
}

#[test]
fn sorted_counts_across_maps() {
    let output = run_on_fixture(&["-c", "-s"]);
    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        vec![
            "overall Stone 3",
            "overall Wood 2",
            "overall Artifact Spot 1",
            "overall Daffodil 1",
            "overall Furnace 1",
            "overall Keg 1",
        ]
    );
}

#[test]
fn counts_are_prefixed_with_map_patterns() {
    let output = run_on_fixture(&["-c", "-m", "!IslandWest", "-n", "Stone"]);
    assert!(output.status.success());
    assert_eq!(stdout_lines(&output), vec!["!IslandWest Stone 2"]);
}

#[test]
fn negated_names_exclude_matches() {
    let output = run_on_fixture(&["-n", "*", "-n", "!Wood", "-n", "!Stone"]);
    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        vec![
            "Farm Artifact Spot at (20, 21)",
            "Farm Daffodil at (5, 6)",
            "Farm Keg at (30, 31)",
            "Farm Furnace at (32, 31)",
        ]
    );
}

#[test]
fn crops_include_with_category_and_verbosity() {
    let output = run_on_fixture(&["-i", "crops", "-C", "crop-ready", "-l", "2"]);
    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        vec!["Farm Parsnip at (40, 41) ready; spring; fertilizer=\"Basic Fertilizer\""]
    );
}

#[test]
fn forage_crops_are_selected_by_category() {
    let output = run_on_fixture(&["-i", "crops", "-C", "forage", "-l", "3"]);
    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        vec!["IslandWest Spring Onion at (12, 14) spring; forage; phase=0 days=1; yield=1 to 3"]
    );
}

#[test]
fn verbosity_level_is_bounded() {
    let output = run_on_fixture(&["-l", "4"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn features_include_small_and_large() {
    let output = run_on_fixture(&["-i", "features", "-c", "-s"]);
    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        vec![
            "overall HoeDirt 4",
            "overall Bush 1",
            "overall FruitTree 1",
            "overall Grass 1",
            "overall Tree 1",
        ]
    );
}

#[test]
fn animals_and_slimes_are_listed_with_tiles() {
    let output = run_on_fixture(&["-i", "animals", "-i", "slimes"]);
    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        vec!["Coop Clucky at (5, 7)", "Slime Hutch Green Slime at (10, 2)"]
    );
}

#[test]
fn long_form_applies_formatters() {
    let output = run_on_fixture(&["-n", "Artifact Spot", "-L", "-F", "false", "-F", "points"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: Value = serde_json::from_str(&stdout).expect("stdout should be valid JSON");
    assert_eq!(json["Object"]["tileLocation"], serde_json::json!([20, 21]));
    assert_eq!(json["Object"]["type"], "Arch");
    assert!(json["Object"].get("bigCraftable").is_none());
}

#[test]
fn json_output_reports_entities() {
    let output = run_on_fixture(&["--json", "-i", "machines", "-C", "ready-to-harvest"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: Value = serde_json::from_str(&stdout).expect("stdout should be valid JSON");
    assert_eq!(json["count"], 1);
    assert_eq!(json["entities"][0]["name"], "Keg");
    assert_eq!(json["entities"][0]["kind"], "machine");
    assert_eq!(json["entities"][0]["position"], serde_json::json!([30, 31]));
}

#[test]
fn formatters_add_fields_to_json_output() {
    let output = run_on_fixture(&["--json", "-n", "Artifact Spot", "-F", "false", "-F", "points"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: Value = serde_json::from_str(&stdout).expect("stdout should be valid JSON");
    let object = &json["entities"][0]["fields"]["Object"];
    assert_eq!(object["tileLocation"], serde_json::json!([20, 21]));
    assert!(object.get("bigCraftable").is_none());

    let plain = run_on_fixture(&["--json", "-n", "Artifact Spot"]);
    let stdout = String::from_utf8_lossy(&plain.stdout);
    let json: Value = serde_json::from_str(&stdout).expect("stdout should be valid JSON");
    assert!(json["entities"][0].get("fields").is_none());
}

#[test]
fn data_dir_extends_object_names() {
    let dir = temp_dir("stardew_inspect_cli_data");
    fs::create_dir_all(&dir).expect("failed to create data dir");
    fs::write(
        dir.join("ObjectInformation.json"),
        r#"{"24": "Parsnip/35/10/Basic -75/Golden Parsnip/Renamed by a mod."}"#,
    )
    .expect("failed to write object information");
    let dir_arg = dir.to_string_lossy().to_string();

    let output = run_on_fixture(&["-i", "crops", "-C", "crop-ready", "-D", &dir_arg]);
    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        vec!["Farm Golden Parsnip at (40, 41) ready"]
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_data_dir_fails() {
    let dir = temp_dir("stardew_inspect_cli_no_data");
    let dir_arg = dir.to_string_lossy().to_string();
    let output = run_on_fixture(&["-D", &dir_arg]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn malformed_save_fails() {
    let dir = temp_dir("stardew_inspect_cli_bad_save");
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    let path = dir.join("Broken_1");
    fs::write(&path, "<SaveGame><locations>").expect("failed to write broken save");
    let path_arg = path.to_string_lossy().to_string();

    let output = run_cli(&["-f", &path_arg]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error parsing save file"));

    let _ = fs::remove_dir_all(&dir);
}
