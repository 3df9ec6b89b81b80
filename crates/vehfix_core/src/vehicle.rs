use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::check::{CheckResult, ResolutionContext, check};
use crate::config::CheckConfig;
use crate::error::{CoreError, CoreErrorCode};
use crate::icase::lookup_path_icase;
use crate::locate::find_ancestor_file;
use crate::repair::{RepairOutcome, repair};
use crate::rewrite::write_scene;
use crate::scene::SceneDescriptor;
use crate::text::read_text_file;
use crate::tokenizer::{split_lines, split_list, tokenize_line};

/// The root `.veh` descriptor of one vehicle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VehicleDescriptor {
    pub path: PathBuf,
    pub driver: Option<String>,
    pub team: Option<String>,
    pub description: Option<String>,
    pub category: Vec<String>,
    pub classes: Option<String>,
    pub graphics_file: Option<String>,
    pub spinner_file: Option<String>,
    pub physics_file: Option<String>,
    pub sounds_file: Option<String>,
}

impl VehicleDescriptor {
    pub fn parse_file(path: &Path) -> Result<Self, CoreError> {
        let text = read_text_file(path)?;
        Ok(Self::parse_text(path, &text))
    }

    pub fn parse_text(path: impl Into<PathBuf>, text: &str) -> Self {
        let mut vehicle = Self {
            path: path.into(),
            ..Self::default()
        };

        for (line, _) in split_lines(text) {
            let Some(kv) = tokenize_line(line).key_value else {
                continue;
            };
            let value = kv.unquoted().trim();
            let slot = match kv.key.to_ascii_lowercase().as_str() {
                "driver" => &mut vehicle.driver,
                "team" => &mut vehicle.team,
                "description" => &mut vehicle.description,
                "classes" => &mut vehicle.classes,
                "graphics" => &mut vehicle.graphics_file,
                "spinner" => &mut vehicle.spinner_file,
                "hdvehicle" => &mut vehicle.physics_file,
                "sounds" => &mut vehicle.sounds_file,
                "category" => {
                    vehicle.category = split_list(value);
                    continue;
                }
                _ => continue,
            };
            *slot = (!value.is_empty()).then(|| value.to_string());
        }

        vehicle
    }

    /// Scene files this vehicle references, graphics first.
    pub fn scene_references(&self) -> impl Iterator<Item = (SceneRole, &str)> {
        [
            (SceneRole::Graphics, self.graphics_file.as_deref()),
            (SceneRole::Spinner, self.spinner_file.as_deref()),
        ]
        .into_iter()
        .filter_map(|(role, file)| file.map(|file| (role, file)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneRole {
    Graphics,
    Spinner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneReport {
    pub role: SceneRole,
    /// The file name as written in the vehicle descriptor.
    pub reference: String,
    pub path: PathBuf,
    pub search_path: Vec<String>,
    pub archives: Vec<String>,
    /// Present when only checking.
    pub check: Option<CheckResult>,
    /// Present when fixing.
    pub repair: Option<RepairOutcome>,
    pub written: bool,
}

impl SceneReport {
    /// The diagnostics that still apply after any repair.
    pub fn result(&self) -> &CheckResult {
        match (&self.repair, &self.check) {
            (Some(outcome), _) => outcome.chosen_result(),
            (None, Some(result)) => result,
            (None, None) => &EMPTY_RESULT,
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.result().messages(&self.path)
    }
}

static EMPTY_RESULT: CheckResult = CheckResult {
    errors: Vec::new(),
    warnings: Vec::new(),
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehicleReport {
    pub path: PathBuf,
    pub context: ResolutionContext,
    pub vehicle: VehicleDescriptor,
    pub scenes: Vec<SceneReport>,
}

impl VehicleReport {
    pub fn messages(&self) -> Vec<String> {
        self.scenes.iter().flat_map(SceneReport::messages).collect()
    }

    pub fn error_count(&self) -> usize {
        self.scenes.iter().map(|scene| scene.result().errors.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehicleFailure {
    pub path: PathBuf,
    pub error: CoreError,
}

impl VehicleFailure {
    pub fn message(&self) -> String {
        format!("{}: {}", self.path.display(), self.error.message)
    }
}

/// Outcome of one vehicle of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchEntry {
    Processed(VehicleReport),
    Failed(VehicleFailure),
}

impl BatchEntry {
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Processed(report) => report.messages(),
            Self::Failed(failure) => vec![failure.message()],
        }
    }

    pub fn error_count(&self) -> usize {
        match self {
            Self::Processed(report) => report.error_count(),
            Self::Failed(_) => 1,
        }
    }
}

/// Per-vehicle outcomes, in the order the vehicles were processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn vehicles(&self) -> impl Iterator<Item = &VehicleReport> {
        self.entries.iter().filter_map(|entry| match entry {
            BatchEntry::Processed(report) => Some(report),
            BatchEntry::Failed(_) => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &VehicleFailure> {
        self.entries.iter().filter_map(|entry| match entry {
            BatchEntry::Failed(failure) => Some(failure),
            BatchEntry::Processed(_) => None,
        })
    }

    /// Every message of the batch in processing order, structural failures
    /// included.
    pub fn messages(&self) -> Vec<String> {
        self.entries.iter().flat_map(BatchEntry::messages).collect()
    }

    pub fn error_count(&self) -> usize {
        self.entries.iter().map(BatchEntry::error_count).sum()
    }

    pub fn written_files(&self) -> impl Iterator<Item = &Path> {
        self.vehicles()
            .flat_map(|vehicle| &vehicle.scenes)
            .filter(|scene| scene.written)
            .map(|scene| scene.path.as_path())
    }
}

pub fn process_vehicle(path: &Path, config: &CheckConfig) -> Result<VehicleReport, CoreError> {
    let context = ResolutionContext::for_vehicle_file(path)?;
    let resolved = lookup_path_icase(path).unwrap_or_else(|| path.to_path_buf());
    let vehicle = VehicleDescriptor::parse_file(&resolved)?;
    info!(
        veh = %path.display(),
        vehdir = %context.vehdir.display(),
        teamdir = %context.teamdir.display(),
        "processing vehicle"
    );

    let mut scenes = Vec::new();
    for (role, reference) in vehicle.scene_references() {
        scenes.push(process_scene(path, role, reference, &context, config)?);
    }

    Ok(VehicleReport {
        path: path.to_path_buf(),
        context,
        vehicle,
        scenes,
    })
}

fn process_scene(
    veh_path: &Path,
    role: SceneRole,
    reference: &str,
    context: &ResolutionContext,
    config: &CheckConfig,
) -> Result<SceneReport, CoreError> {
    let scene_path = find_ancestor_file(&context.teamdir, reference).ok_or_else(|| {
        CoreError::new(
            CoreErrorCode::NotFound,
            format!(
                "couldn't find scene file '{reference}' referenced by {}",
                veh_path.display()
            ),
        )
    })?;
    let descriptor = SceneDescriptor::parse_file(&scene_path)?;

    let mut report = SceneReport {
        role,
        reference: reference.to_string(),
        path: scene_path,
        search_path: descriptor.search_path.clone(),
        archives: descriptor.archives.clone(),
        check: None,
        repair: None,
        written: false,
    };

    if !config.fix {
        report.check = Some(check(&descriptor.search_path, &descriptor.archives, context));
        return Ok(report);
    }

    let outcome = repair(&descriptor, context, config);
    if let Some((search_path, archives)) = outcome.to_persist() {
        report.written = write_scene(&descriptor, search_path, archives)?;
        if report.written {
            info!(
                scene = %report.path.display(),
                decision = ?outcome.decision,
                "rewrote scene file"
            );
        }
    }
    report.repair = Some(outcome);
    Ok(report)
}

/// Processes every vehicle independently. A vehicle that fails
/// structurally is recorded and the batch carries on.
pub fn process_vehicles<P: AsRef<Path>>(paths: &[P], config: &CheckConfig) -> BatchReport {
    let mut batch = BatchReport::default();
    for path in paths {
        let path = path.as_ref();
        let entry = match process_vehicle(path, config) {
            Ok(report) => BatchEntry::Processed(report),
            Err(error) => {
                warn!(veh = %path.display(), %error, "skipping vehicle");
                BatchEntry::Failed(VehicleFailure {
                    path: path.to_path_buf(),
                    error,
                })
            }
        };
        batch.entries.push(entry);
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::{SceneRole, VehicleDescriptor};

    const VEH: &str = "\
DefaultLivery=red.dds
HDVehicle=acme.hdv
Graphics=acme.gen
Spinner=acme_spinner.gen // showroom
Sounds=\"acme.sfx\"
Driver=\"J. Doe\"
Team=\"Acme Racing\"
Description=\"#7 Acme\"
Category=\"ACME, Formula, 2013\"
Classes=\"ACME F1\"
";

    #[test]
    fn parses_root_descriptor_fields() {
        let vehicle = VehicleDescriptor::parse_text("red.veh", VEH);
        assert_eq!(vehicle.driver.as_deref(), Some("J. Doe"));
        assert_eq!(vehicle.team.as_deref(), Some("Acme Racing"));
        assert_eq!(vehicle.description.as_deref(), Some("#7 Acme"));
        assert_eq!(vehicle.category, vec!["ACME", "Formula", "2013"]);
        assert_eq!(vehicle.classes.as_deref(), Some("ACME F1"));
        assert_eq!(vehicle.physics_file.as_deref(), Some("acme.hdv"));
        assert_eq!(vehicle.sounds_file.as_deref(), Some("acme.sfx"));

        let scenes: Vec<_> = vehicle.scene_references().collect();
        assert_eq!(
            scenes,
            vec![
                (SceneRole::Graphics, "acme.gen"),
                (SceneRole::Spinner, "acme_spinner.gen"),
            ]
        );
    }

    #[test]
    fn empty_values_are_absent() {
        let vehicle = VehicleDescriptor::parse_text("red.veh", "Spinner=\nGraphics=acme.gen\n");
        assert_eq!(vehicle.spinner_file, None);
        assert_eq!(vehicle.scene_references().count(), 1);
    }
}
