pub mod check;
pub mod config;
pub mod engine;
pub mod error;
pub mod hdv;
pub mod icase;
pub mod locate;
pub mod repair;
pub mod rewrite;
pub mod scene;
pub mod sfx;
pub mod text;
pub mod tokenizer;
pub mod vehicle;

pub use check::{CheckResult, Diagnostic, ResolutionContext, check};
pub use config::CheckConfig;
pub use error::{CoreError, CoreErrorCode};
pub use locate::{find_ancestor_file, locate_mod_name, locate_mod_root};
pub use repair::{RepairCandidate, RepairDecision, RepairOutcome, repair};
pub use rewrite::{rewrite, write_scene};
pub use scene::SceneDescriptor;
pub use vehicle::{
    BatchEntry, BatchReport, SceneReport, SceneRole, VehicleDescriptor, VehicleFailure,
    VehicleReport, process_vehicle, process_vehicles,
};
