use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde_json::{Map as JsonMap, Value as JsonValue};
use vehfix_core::engine::{EngineSummary, RangedValue};
use vehfix_core::hdv::PhysicsSummary;
use vehfix_core::sfx::{SoundReference, SoundStatus};
use vehfix_core::{
    BatchEntry, BatchReport, CheckResult, CoreErrorCode, Diagnostic, RepairDecision, SceneReport,
    VehicleDescriptor, VehicleReport,
};

const TREE_DRIVER_WIDTH: usize = 30;
const MISSING: &str = "-";

pub fn render_vehicle_report(report: &VehicleReport) -> String {
    let mut out = String::new();
    writeln!(&mut out, "[Vehicle]").expect("writing to String cannot fail");
    writeln!(&mut out, "veh: {}", report.path.display()).expect("writing to String cannot fail");
    writeln!(&mut out, "    <VEHDIR>: {}", report.context.vehdir.display())
        .expect("writing to String cannot fail");
    writeln!(&mut out, "   <TEAMDIR>: {}", report.context.teamdir.display())
        .expect("writing to String cannot fail");
    writeln!(&mut out, "    graphics: {}", or_missing(&report.vehicle.graphics_file))
        .expect("writing to String cannot fail");
    writeln!(&mut out, "     spinner: {}", or_missing(&report.vehicle.spinner_file))
        .expect("writing to String cannot fail");

    for scene in &report.scenes {
        render_scene(&mut out, scene);
    }
    out
}

fn render_scene(out: &mut String, scene: &SceneReport) {
    writeln!(out, "gen: {}", scene.path.display()).expect("writing to String cannot fail");
    writeln!(out, "  SearchPath: {:?}", scene.search_path).expect("writing to String cannot fail");
    writeln!(out, "    MasFiles: {:?}", scene.archives).expect("writing to String cannot fail");
    writeln!(out).expect("writing to String cannot fail");

    if let Some(result) = &scene.check {
        push_messages(out, result, &scene.path);
        return;
    }
    let Some(outcome) = &scene.repair else {
        return;
    };

    if let Some(archive) = &outcome.override_archive {
        writeln!(out, "    override: {archive}").expect("writing to String cannot fail");
    }
    writeln!(out, "      before: {}", counts(&outcome.original))
        .expect("writing to String cannot fail");
    push_messages(out, &outcome.original, &scene.path);
    if let Some(candidate) = &outcome.candidate {
        writeln!(
            out,
            "   candidate: {:?} ({})",
            candidate.search_path,
            counts(&candidate.result)
        )
        .expect("writing to String cannot fail");
    }
    writeln!(
        out,
        "    decision: {}{}",
        decision_name(outcome.decision),
        if scene.written { " (written)" } else { "" }
    )
    .expect("writing to String cannot fail");
    writeln!(out, "       after: {}", counts(outcome.chosen_result()))
        .expect("writing to String cannot fail");
    push_messages(out, outcome.chosen_result(), &scene.path);
}

fn push_messages(out: &mut String, result: &CheckResult, context: &Path) {
    for message in result.messages(context) {
        writeln!(out, "{message}").expect("writing to String cannot fail");
    }
}

fn counts(result: &CheckResult) -> String {
    format!(
        "{} error(s), {} warning(s)",
        result.errors.len(),
        result.warnings.len()
    )
}

fn decision_name(decision: RepairDecision) -> &'static str {
    match decision {
        RepairDecision::Unchanged => "unchanged",
        RepairDecision::AcceptCandidate => "accept_candidate",
        RepairDecision::KeepOriginalWithOverride => "keep_original_with_override",
        RepairDecision::OverrideOnly => "override_only",
    }
}

fn or_missing(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(MISSING)
}

/// Every vehicle block or structural failure in processing order, then a
/// one-line summary.
pub fn render_batch_text(batch: &BatchReport) -> String {
    let mut out = String::new();
    for entry in &batch.entries {
        match entry {
            BatchEntry::Processed(vehicle) => {
                out.push_str(&render_vehicle_report(vehicle));
                out.push('\n');
            }
            BatchEntry::Failed(failure) => {
                writeln!(&mut out, "error: {}", failure.message())
                    .expect("writing to String cannot fail");
            }
        }
    }
    writeln!(
        &mut out,
        "{} vehicle(s), {} failure(s), {} error(s), {} file(s) written",
        batch.vehicles().count(),
        batch.failures().count(),
        batch.error_count(),
        batch.written_files().count()
    )
    .expect("writing to String cannot fail");
    out
}

pub fn render_batch_json(batch: &BatchReport) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert(
        "vehicles".to_string(),
        JsonValue::Array(batch.vehicles().map(vehicle_to_json).collect()),
    );
    out.insert(
        "failures".to_string(),
        JsonValue::Array(
            batch
                .failures()
                .map(|failure| {
                    let mut entry = JsonMap::new();
                    entry.insert("veh".to_string(), path_json(&failure.path));
                    entry.insert(
                        "code".to_string(),
                        JsonValue::String(error_code_name(failure.error.code).to_string()),
                    );
                    entry.insert(
                        "message".to_string(),
                        JsonValue::String(failure.error.message.clone()),
                    );
                    JsonValue::Object(entry)
                })
                .collect(),
        ),
    );
    out.insert(
        "error_count".to_string(),
        JsonValue::from(batch.error_count()),
    );
    out.insert(
        "written".to_string(),
        JsonValue::Array(batch.written_files().map(path_json).collect()),
    );
    JsonValue::Object(out)
}

fn vehicle_to_json(report: &VehicleReport) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert("veh".to_string(), path_json(&report.path));
    out.insert("vehdir".to_string(), path_json(&report.context.vehdir));
    out.insert("teamdir".to_string(), path_json(&report.context.teamdir));
    out.insert(
        "mod_name".to_string(),
        JsonValue::String(report.context.mod_name.clone()),
    );
    out.insert(
        "scenes".to_string(),
        JsonValue::Array(report.scenes.iter().map(scene_to_json).collect()),
    );
    out.insert(
        "error_count".to_string(),
        JsonValue::from(report.error_count()),
    );
    JsonValue::Object(out)
}

fn scene_to_json(scene: &SceneReport) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert(
        "role".to_string(),
        JsonValue::String(format!("{:?}", scene.role).to_lowercase()),
    );
    out.insert(
        "reference".to_string(),
        JsonValue::String(scene.reference.clone()),
    );
    out.insert("gen".to_string(), path_json(&scene.path));
    out.insert("search_path".to_string(), strings_json(&scene.search_path));
    out.insert("archives".to_string(), strings_json(&scene.archives));

    match &scene.repair {
        Some(outcome) => {
            out.insert("before".to_string(), result_to_json(&outcome.original));
            out.insert(
                "candidate_search_path".to_string(),
                outcome
                    .candidate
                    .as_ref()
                    .map_or(JsonValue::Null, |candidate| {
                        strings_json(&candidate.search_path)
                    }),
            );
            out.insert(
                "override_archive".to_string(),
                outcome
                    .override_archive
                    .clone()
                    .map_or(JsonValue::Null, JsonValue::String),
            );
            out.insert(
                "decision".to_string(),
                JsonValue::String(decision_name(outcome.decision).to_string()),
            );
            out.insert("after".to_string(), result_to_json(outcome.chosen_result()));
        }
        None => {
            out.insert("after".to_string(), result_to_json(scene.result()));
        }
    }
    out.insert("written".to_string(), JsonValue::Bool(scene.written));
    JsonValue::Object(out)
}

fn result_to_json(result: &CheckResult) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert(
        "errors".to_string(),
        JsonValue::Array(result.errors.iter().map(diagnostic_to_json).collect()),
    );
    out.insert(
        "warnings".to_string(),
        JsonValue::Array(result.warnings.iter().map(diagnostic_to_json).collect()),
    );
    JsonValue::Object(out)
}

fn diagnostic_to_json(diagnostic: &Diagnostic) -> JsonValue {
    let mut out = JsonMap::new();
    let kind = match diagnostic {
        Diagnostic::ArchiveUnresolved { archive } => {
            out.insert("archive".to_string(), JsonValue::String(archive.clone()));
            "archive_unresolved"
        }
        Diagnostic::SearchPathMissing { entry, expanded } => {
            out.insert("entry".to_string(), JsonValue::String(entry.clone()));
            out.insert("expanded".to_string(), path_json(expanded));
            "search_path_missing"
        }
        Diagnostic::SearchPathDuplicate { entry, first } => {
            out.insert("entry".to_string(), JsonValue::String(entry.clone()));
            out.insert("first".to_string(), JsonValue::String(first.clone()));
            "search_path_duplicate"
        }
    };
    out.insert("kind".to_string(), JsonValue::String(kind.to_string()));
    out.insert(
        "message".to_string(),
        JsonValue::String(diagnostic.to_string()),
    );
    JsonValue::Object(out)
}

fn error_code_name(code: CoreErrorCode) -> &'static str {
    match code {
        CoreErrorCode::Io => "io",
        CoreErrorCode::Parse => "parse",
        CoreErrorCode::NotFound => "not_found",
    }
}

fn path_json(path: impl AsRef<Path>) -> JsonValue {
    JsonValue::String(path.as_ref().display().to_string())
}

fn strings_json(items: &[String]) -> JsonValue {
    JsonValue::Array(items.iter().cloned().map(JsonValue::String).collect())
}

/// One vehicle listed under its category path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLeaf {
    pub driver: String,
    pub team: String,
    pub path: PathBuf,
}

impl TreeLeaf {
    pub fn from_vehicle(vehicle: &VehicleDescriptor) -> Self {
        Self {
            driver: vehicle.driver.clone().unwrap_or_default(),
            team: vehicle.team.clone().unwrap_or_default(),
            path: vehicle.path.clone(),
        }
    }
}

/// Vehicles grouped by their category path, e.g. `Series > Class > Year`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryTree {
    children: BTreeMap<String, CategoryTree>,
    leaves: Vec<TreeLeaf>,
}

impl CategoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vehicles<'a>(vehicles: impl IntoIterator<Item = &'a VehicleDescriptor>) -> Self {
        let mut tree = Self::new();
        for vehicle in vehicles {
            tree.insert(&vehicle.category, TreeLeaf::from_vehicle(vehicle));
        }
        tree
    }

    /// Files `leaf` under `category`, creating intermediate nodes. An empty
    /// category files it at the root.
    pub fn insert(&mut self, category: &[String], leaf: TreeLeaf) {
        let mut node = self;
        for name in category {
            node = node.children.entry(name.clone()).or_default();
        }
        node.leaves.push(leaf);
    }

    pub fn child(&self, name: &str) -> Option<&CategoryTree> {
        self.children.get(name)
    }

    pub fn leaves(&self) -> &[TreeLeaf] {
        &self.leaves
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.leaves.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for leaf in &self.leaves {
            push_leaf(&mut out, "", " - ", leaf);
        }
        self.render_children(&mut out, "");
        out
    }

    fn render_children(&self, out: &mut String, indent: &str) {
        let count = self.children.len();
        for (i, (name, child)) in self.children.iter().enumerate() {
            let (marker, leaf_marker) = match (indent.is_empty(), i + 1 < count) {
                (true, _) => ("", " - "),
                (false, true) => ("+ ", "| - "),
                (false, false) => ("+ ", "  - "),
            };
            writeln!(out, "{indent}{marker}[{name}]").expect("writing to String cannot fail");
            for leaf in &child.leaves {
                push_leaf(out, indent, leaf_marker, leaf);
            }
            child.render_children(out, &format!("{indent}  "));
        }
    }
}

fn push_leaf(out: &mut String, indent: &str, marker: &str, leaf: &TreeLeaf) {
    let line = format!(
        "{indent}{marker}{:<width$} {}",
        leaf.driver,
        leaf.team,
        width = TREE_DRIVER_WIDTH
    );
    writeln!(out, "{}", line.trim_end()).expect("writing to String cannot fail");
}

pub fn render_vehicle_info(vehicles: &[VehicleDescriptor]) -> String {
    let mut out = String::new();
    for vehicle in vehicles {
        writeln!(&mut out, "    file: {}", vehicle.path.display())
            .expect("writing to String cannot fail");
        writeln!(&mut out, "  driver: {}", or_missing(&vehicle.driver))
            .expect("writing to String cannot fail");
        writeln!(&mut out, " classes: {}", or_missing(&vehicle.classes))
            .expect("writing to String cannot fail");
        writeln!(&mut out, "graphics: {}", or_missing(&vehicle.graphics_file))
            .expect("writing to String cannot fail");
        writeln!(&mut out, " physics: {}", or_missing(&vehicle.physics_file))
            .expect("writing to String cannot fail");
        writeln!(&mut out, "category: {:?}", vehicle.category)
            .expect("writing to String cannot fail");
        writeln!(&mut out, "    team: {}", or_missing(&vehicle.team))
            .expect("writing to String cannot fail");
        writeln!(&mut out).expect("writing to String cannot fail");
    }
    out
}

pub fn render_physics_summary(summary: &PhysicsSummary) -> String {
    let mut out = String::new();
    writeln!(&mut out, "hdv: {}", summary.path.display()).expect("writing to String cannot fail");
    writeln!(&mut out, "      mass: {}", or_missing(&summary.mass))
        .expect("writing to String cannot fail");
    writeln!(&mut out, "   inertia: {}", or_missing(&summary.inertia))
        .expect("writing to String cannot fail");
    writeln!(&mut out, "    engine: {}", or_missing(&summary.engine_file))
        .expect("writing to String cannot fail");
    writeln!(&mut out, "   gearbox: {}", or_missing(&summary.gear_file))
        .expect("writing to String cannot fail");
    writeln!(&mut out, "     model: {}", or_missing(&summary.physical_model_file))
        .expect("writing to String cannot fail");
    writeln!(&mut out, "     tires: {}", or_missing(&summary.tire_brand))
        .expect("writing to String cannot fail");
    out
}

pub fn render_engine_summary(summary: &EngineSummary) -> String {
    let mut out = String::new();
    writeln!(&mut out, "engine: {}", summary.path.display())
        .expect("writing to String cannot fail");
    writeln!(&mut out, "  lifetime rpm: {}", ranged(&summary.lifetime_rpm))
        .expect("writing to String cannot fail");
    writeln!(&mut out, "  lifetime oil: {}", ranged(&summary.lifetime_oil_temp))
        .expect("writing to String cannot fail");
    writeln!(&mut out, "  lifetime avg: {}", or_missing(&summary.lifetime_avg))
        .expect("writing to String cannot fail");
    writeln!(&mut out, "  lifetime var: {}", or_missing(&summary.lifetime_var))
        .expect("writing to String cannot fail");
    writeln!(&mut out, "   optimum oil: {}", or_missing(&summary.optimum_oil_temp))
        .expect("writing to String cannot fail");
    match summary.max_torque {
        Some(peak) => {
            writeln!(&mut out, "    max torque: {} Nm @ {} rpm", peak.value, peak.rpm)
                .expect("writing to String cannot fail");
        }
        None => {
            writeln!(&mut out, "    max torque: {MISSING}").expect("writing to String cannot fail");
        }
    }
    match summary.max_power {
        Some(peak) => {
            writeln!(&mut out, "     max power: {} hp @ {} rpm", peak.value, peak.rpm)
                .expect("writing to String cannot fail");
        }
        None => {
            writeln!(&mut out, "     max power: {MISSING}").expect("writing to String cannot fail");
        }
    }
    out
}

pub fn render_engine_json(summaries: &[EngineSummary]) -> JsonValue {
    JsonValue::Array(
        summaries
            .iter()
            .map(|summary| {
                let mut out = JsonMap::new();
                out.insert("engine".to_string(), path_json(&summary.path));
                out.insert(
                    "lifetime_rpm".to_string(),
                    ranged_json(&summary.lifetime_rpm),
                );
                out.insert(
                    "lifetime_oil_temp".to_string(),
                    ranged_json(&summary.lifetime_oil_temp),
                );
                out.insert(
                    "samples".to_string(),
                    JsonValue::from(summary.samples.len()),
                );
                for (key, peak) in [
                    ("max_torque", summary.max_torque),
                    ("max_power", summary.max_power),
                ] {
                    let value = peak.map_or(JsonValue::Null, |peak| {
                        let mut entry = JsonMap::new();
                        entry.insert("value".to_string(), JsonValue::from(peak.value));
                        entry.insert("rpm".to_string(), JsonValue::from(peak.rpm));
                        JsonValue::Object(entry)
                    });
                    out.insert(key.to_string(), value);
                }
                JsonValue::Object(out)
            })
            .collect(),
    )
}

fn ranged(value: &Option<RangedValue>) -> String {
    value.as_ref().map_or_else(
        || MISSING.to_string(),
        |value| format!("{} ({})", value.value, value.range),
    )
}

fn ranged_json(value: &Option<RangedValue>) -> JsonValue {
    value.as_ref().map_or(JsonValue::Null, |value| {
        let mut out = JsonMap::new();
        out.insert("value".to_string(), JsonValue::String(value.value.clone()));
        out.insert("range".to_string(), JsonValue::String(value.range.clone()));
        JsonValue::Object(out)
    })
}

pub fn render_sound_check(results: &[(&SoundReference, SoundStatus)]) -> String {
    let mut out = String::new();
    for (reference, status) in results {
        let status = match status {
            SoundStatus::Found => "ok",
            SoundStatus::FoundInMod => "ok with fix",
            SoundStatus::Missing => "failure",
        };
        writeln!(&mut out, "{}: {status}", reference.wav).expect("writing to String cannot fail");
    }
    out
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{CategoryTree, TreeLeaf};

    fn leaf(driver: &str) -> TreeLeaf {
        TreeLeaf {
            driver: driver.to_string(),
            team: "Team".to_string(),
            path: PathBuf::from(format!("{driver}.veh")),
        }
    }

    fn path(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn insertion_creates_intermediate_nodes() {
        let mut tree = CategoryTree::new();
        tree.insert(&path(&["Series", "GT"]), leaf("a"));
        tree.insert(&path(&["Series"]), leaf("b"));

        let series = tree.child("Series").expect("series node");
        assert_eq!(series.leaves(), &[leaf("b")]);
        assert_eq!(
            series.child("GT").expect("gt node").leaves(),
            &[leaf("a")]
        );
        assert!(tree.leaves().is_empty());
    }

    #[test]
    fn empty_category_lands_at_root() {
        let mut tree = CategoryTree::new();
        assert!(tree.is_empty());
        tree.insert(&[], leaf("solo"));
        assert_eq!(tree.render(), format!(" - {:<30} Team\n", "solo"));
    }
}
