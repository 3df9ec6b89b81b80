use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use vehfix_core::engine::EngineSummary;
use vehfix_core::{BatchReport, CheckConfig, VehicleDescriptor, process_vehicles};
use vehfix_render::{
    CategoryTree, render_batch_json, render_batch_text, render_engine_json,
    render_engine_summary, render_vehicle_info,
};

fn write_fixture(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("fixture path should have a parent"))
        .expect("failed to create fixture directories");
    fs::write(&path, contents).expect("failed to write fixture");
    path
}

fn acme_batch(root: &Path, config: &CheckConfig) -> BatchReport {
    write_fixture(root, "GameData/Vehicles/ACME/acme_body.mas", "");
    write_fixture(
        root,
        "GameData/Vehicles/ACME/acme.gen",
        "SearchPath=<VEHDIR>\nMASFile=acme_body.mas\n",
    );
    let red = write_fixture(
        root,
        "GameData/Vehicles/ACME/Red/red.veh",
        "Graphics=acme.gen\nDriver=\"Red Driver\"\n",
    );
    let blue = write_fixture(
        root,
        "GameData/Vehicles/ACME/Blue/blue.veh",
        "Graphics=missing.gen\n",
    );
    process_vehicles(&[red, blue], config)
}

#[test]
fn check_text_lists_vehicle_block_and_failures() {
    let root = TempDir::new().expect("temp dir");
    let batch = acme_batch(root.path(), &CheckConfig::default());
    let text = render_batch_text(&batch);

    assert!(text.starts_with("[Vehicle]\nveh: "), "text: {text}");
    assert!(text.contains("    graphics: acme.gen\n"));
    assert!(text.contains("     spinner: -\n"));
    assert!(text.contains("  SearchPath: [\"<VEHDIR>\"]\n"));
    assert!(text.contains("    MasFiles: [\"acme_body.mas\"]\n"));
    assert!(text.contains("acme.gen: couldn't locate MAS file 'acme_body.mas' in search path\n"));
    assert!(text.contains("error: "));
    assert!(text.contains("couldn't find scene file 'missing.gen'"));
    assert!(text.ends_with("1 vehicle(s), 1 failure(s), 2 error(s), 0 file(s) written\n"));
}

#[test]
fn fix_text_lists_diagnostics_before_and_after_repair() {
    let root = TempDir::new().expect("temp dir");
    let batch = acme_batch(root.path(), &CheckConfig::default().with_fix(true));
    let text = render_batch_text(&batch);

    let before = text.find("      before: 1 error(s)").expect("before line");
    let unresolved = text
        .find("acme.gen: couldn't locate MAS file 'acme_body.mas' in search path\n")
        .expect("original archive error is listed");
    let decision = text
        .find("    decision: accept_candidate (written)\n")
        .expect("decision line");
    let after = text.find("       after: 0 error(s)").expect("after line");
    assert!(before < unresolved && unresolved < decision && decision < after, "text: {text}");
    assert!(text.ends_with("1 vehicle(s), 1 failure(s), 1 error(s), 1 file(s) written\n"));
}

#[test]
fn fix_json_uses_stable_key_order() {
    let root = TempDir::new().expect("temp dir");
    let batch = acme_batch(root.path(), &CheckConfig::default().with_fix(true));
    let value = render_batch_json(&batch);

    let keys: Vec<&str> = value
        .as_object()
        .expect("json should be an object")
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys, vec!["vehicles", "failures", "error_count", "written"]);

    let scene = &value["vehicles"][0]["scenes"][0];
    let scene_keys: Vec<&str> = scene
        .as_object()
        .expect("scene should be an object")
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(
        scene_keys,
        vec![
            "role",
            "reference",
            "gen",
            "search_path",
            "archives",
            "before",
            "candidate_search_path",
            "override_archive",
            "decision",
            "after",
            "written",
        ]
    );
    assert_eq!(scene["role"], "graphics");
    assert_eq!(scene["decision"], "accept_candidate");
    assert_eq!(scene["written"], true);
    assert_eq!(
        scene["before"]["errors"][0]["kind"],
        "archive_unresolved"
    );
    assert_eq!(scene["after"]["errors"].as_array().map(Vec::len), Some(0));
    assert_eq!(value["failures"][0]["code"], "not_found");
    assert_eq!(value["error_count"], 1);
    assert_eq!(value["written"].as_array().map(Vec::len), Some(1));
}

#[test]
fn category_tree_groups_vehicles() {
    let vehicles = [
        VehicleDescriptor::parse_text(
            "a.veh",
            "Driver=\"Alice\"\nTeam=\"Acme\"\nCategory=\"Formula, 2013\"\n",
        ),
        VehicleDescriptor::parse_text(
            "b.veh",
            "Driver=\"Bob\"\nTeam=\"Acme\"\nCategory=\"Formula, 2012\"\n",
        ),
        VehicleDescriptor::parse_text(
            "c.veh",
            "Driver=\"Carol\"\nTeam=\"Zed\"\nCategory=\"GT\"\n",
        ),
    ];
    let tree = CategoryTree::from_vehicles(&vehicles);

    let expected = format!(
        concat!(
            "[Formula]\n",
            "  + [2012]\n",
            "  | - {:<30} Acme\n",
            "  + [2013]\n",
            "    - {:<30} Acme\n",
            "[GT]\n",
            " - {:<30} Zed\n",
        ),
        "Bob", "Alice", "Carol"
    );
    assert_eq!(tree.render(), expected);
}

#[test]
fn vehicle_info_lists_descriptor_fields() {
    let vehicle = VehicleDescriptor::parse_text(
        "a.veh",
        "Driver=\"Alice\"\nClasses=\"F1\"\nGraphics=a.gen\nHDVehicle=a.hdv\n",
    );
    let text = render_vehicle_info(&[vehicle]);
    assert_eq!(
        text,
        concat!(
            "    file: a.veh\n",
            "  driver: Alice\n",
            " classes: F1\n",
            "graphics: a.gen\n",
            " physics: a.hdv\n",
            "category: []\n",
            "    team: -\n\n",
        )
    );
}

#[test]
fn engine_summary_reports_peaks() {
    let summary = EngineSummary::parse_text(
        "acme_engine.ini",
        concat!(
            "LifetimeEngineRPM=(17500.0, 500.0)\n",
            "RPMTorque=(5000, -20.0, 200.0)\n",
            "RPMTorque=(9000, -30.0, 280.0)\n",
            "RPMTorque=(12000, -40.0, 250.0)\n",
        ),
    )
    .expect("engine parses");

    let text = render_engine_summary(&summary);
    assert!(text.contains("  lifetime rpm: 17500.0 (500.0)\n"));
    assert!(text.contains("    max torque: 280 Nm @ 9000 rpm\n"));
    assert!(text.contains("     max power: 421 hp @ 12000 rpm\n"));

    let value = render_engine_json(&[summary]);
    assert_eq!(value[0]["max_torque"]["rpm"], 9000);
    assert_eq!(value[0]["samples"], 3);
}
