use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::Value as JsonValue;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use vehfix_core::engine::EngineSummary;
use vehfix_core::hdv::PhysicsSummary;
use vehfix_core::icase::dir_exists;
use vehfix_core::sfx::{SoundSet, SoundStatus, rewrite_text};
use vehfix_core::text::{read_text_file, write_text_file};
use vehfix_core::{
    CheckConfig, VehicleDescriptor, find_ancestor_file, locate_mod_name, process_vehicles,
};
use vehfix_render::{
    CategoryTree, render_batch_json, render_batch_text, render_engine_json,
    render_engine_summary, render_physics_summary, render_sound_check, render_vehicle_info,
};
use walkdir::WalkDir;

const VEHICLE_EXTENSION: &str = "veh";

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG wins.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check (and optionally repair) the scene files of vehicles.
    Check(CheckArgs),
    /// Print vehicles grouped by category.
    Tree {
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print the fields of each vehicle.
    Info {
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
    },
    /// Summarize engine torque curves.
    Engine {
        #[arg(long)]
        json: bool,
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
    /// Check wav references of a sound definition.
    Sfx(SfxArgs),
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Rewrite scene files when a repaired search path is better.
    #[arg(long)]
    fix: bool,
    #[arg(long)]
    json: bool,
    /// Don't substitute the mod's own copy of the override archive.
    #[arg(long = "no-override", conflicts_with = "override_archive")]
    no_override: bool,
    #[arg(long = "override-archive", value_name = "NAME")]
    override_archive: Option<String>,
    /// `.veh` files, or directories to search for them.
    #[arg(value_name = "PATH", required = true)]
    paths: Vec<PathBuf>,
}

impl CheckArgs {
    fn config(&self) -> CheckConfig {
        let config = CheckConfig::default().with_fix(self.fix);
        if self.no_override {
            config.with_override_archive(None)
        } else if let Some(name) = &self.override_archive {
            config.with_override_archive(Some(name.clone()))
        } else {
            config
        }
    }
}

#[derive(Debug, Args)]
struct SfxArgs {
    #[arg(value_name = "FILE")]
    file: PathBuf,
    /// The game's GameData directory, holding `Sounds`.
    #[arg(long, value_name = "DIR")]
    gamedata: PathBuf,
    #[arg(long = "mod-name", value_name = "NAME")]
    mod_name: Option<String>,
    /// Point references found only below `Sounds/<mod>` at that copy.
    #[arg(long)]
    fix: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match cli.command {
        Command::Check(args) => run_check(&args),
        Command::Tree { paths } => run_tree(&paths),
        Command::Info { paths } => run_info(&paths),
        Command::Engine { json, files } => run_engine(&files, json),
        Command::Sfx(args) => run_sfx(&args),
    };
    process::exit(code);
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_check(args: &CheckArgs) -> i32 {
    let files = collect_vehicle_files(&args.paths);
    let batch = process_vehicles(files.as_slice(), &args.config());

    if args.json {
        print_json(&render_batch_json(&batch));
    } else {
        print!("{}", render_batch_text(&batch));
    }
    for failure in batch.failures() {
        eprintln!("Error processing {}: {}", failure.path.display(), failure.error);
    }

    exit_code(batch.error_count() > 0)
}

fn run_tree(paths: &[PathBuf]) -> i32 {
    let (vehicles, failed) = parse_vehicles(paths);
    print!("{}", CategoryTree::from_vehicles(&vehicles).render());
    exit_code(failed)
}

fn run_info(paths: &[PathBuf]) -> i32 {
    let (vehicles, mut failed) = parse_vehicles(paths);
    for vehicle in &vehicles {
        print!("{}", render_vehicle_info(std::slice::from_ref(vehicle)));

        let Some(physics) = &vehicle.physics_file else {
            continue;
        };
        let start = vehicle.path.parent().unwrap_or_else(|| Path::new("."));
        let Some(hdv_path) = find_ancestor_file(start, physics) else {
            warn!(veh = %vehicle.path.display(), hdv = %physics, "physics file not found");
            continue;
        };
        match PhysicsSummary::parse_file(&hdv_path) {
            Ok(summary) => println!("{}", render_physics_summary(&summary)),
            Err(e) => {
                eprintln!("Error reading {}: {e}", hdv_path.display());
                failed = true;
            }
        }
    }
    exit_code(failed)
}

fn run_engine(files: &[PathBuf], json: bool) -> i32 {
    let mut summaries = Vec::with_capacity(files.len());
    let mut failed = false;
    for file in files {
        match EngineSummary::parse_file(file) {
            Ok(summary) => summaries.push(summary),
            Err(e) => {
                eprintln!("Error reading {}: {e}", file.display());
                failed = true;
            }
        }
    }

    if json {
        print_json(&render_engine_json(&summaries));
    } else {
        for summary in &summaries {
            println!("{}", render_engine_summary(summary));
        }
    }
    exit_code(failed)
}

fn run_sfx(args: &SfxArgs) -> i32 {
    if !dir_exists(&args.gamedata) {
        eprintln!("Error: {} is not a directory", args.gamedata.display());
        return 2;
    }
    let mod_name = match &args.mod_name {
        Some(name) => name.clone(),
        None => match locate_mod_name(&args.file) {
            Ok(name) => name,
            Err(e) => {
                eprintln!("Error: {e}; pass --mod-name");
                return 2;
            }
        },
    };
    let text = match read_text_file(&args.file) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error reading {}: {e}", args.file.display());
            return 1;
        }
    };

    let sounds = SoundSet::parse_text(&text);
    let results = sounds.check(&args.gamedata, &mod_name);
    print!("{}", render_sound_check(&results));

    if args.fix {
        let relocated: Vec<&str> = results
            .iter()
            .filter(|(_, status)| *status == SoundStatus::FoundInMod)
            .map(|(reference, _)| reference.wav.as_str())
            .collect();
        if !relocated.is_empty() {
            let fixed = rewrite_text(&text, |wav| {
                if relocated.contains(&wav) {
                    format!("{mod_name}/{wav}")
                } else {
                    wav.to_string()
                }
            });
            if let Err(e) = write_text_file(&args.file, &fixed) {
                eprintln!("Error writing {}: {e}", args.file.display());
                return 1;
            }
        }
    }

    let missing = results
        .iter()
        .any(|(_, status)| *status == SoundStatus::Missing);
    exit_code(missing)
}

/// Expands directories into the `.veh` files below them, in name order.
/// Plain file arguments are kept as given.
fn collect_vehicle_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(root = %path.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if entry.file_type().is_file() && is_vehicle_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }
    files
}

fn is_vehicle_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(VEHICLE_EXTENSION))
}

fn parse_vehicles(paths: &[PathBuf]) -> (Vec<VehicleDescriptor>, bool) {
    let mut vehicles = Vec::new();
    let mut failed = false;
    for file in collect_vehicle_files(paths) {
        match VehicleDescriptor::parse_file(&file) {
            Ok(vehicle) => vehicles.push(vehicle),
            Err(e) => {
                eprintln!("Error reading {}: {e}", file.display());
                failed = true;
            }
        }
    }
    (vehicles, failed)
}

fn print_json(value: &JsonValue) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("Error rendering JSON output: {e}");
            process::exit(1);
        }
    }
}

fn exit_code(failed: bool) -> i32 {
    if failed { 1 } else { 0 }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use clap::Parser;

    use super::{Cli, Command, is_vehicle_file};

    #[test]
    fn vehicle_extension_is_case_insensitive() {
        assert!(is_vehicle_file(Path::new("Teams/Red/RED.VEH")));
        assert!(is_vehicle_file(Path::new("red.veh")));
        assert!(!is_vehicle_file(Path::new("red.gen")));
        assert!(!is_vehicle_file(Path::new("veh")));
    }

    #[test]
    fn check_flags_map_onto_config() {
        let cli = Cli::parse_from(["vehfix", "-vv", "check", "--fix", "--no-override", "a.veh"]);
        assert_eq!(cli.verbose, 2);
        let Command::Check(args) = cli.command else {
            panic!("expected check subcommand");
        };
        let config = args.config();
        assert!(config.fix);
        assert_eq!(config.override_archive, None);

        let cli = Cli::parse_from(["vehfix", "check", "--override-archive", "maps.mas", "a.veh"]);
        let Command::Check(args) = cli.command else {
            panic!("expected check subcommand");
        };
        assert_eq!(args.config().override_archive.as_deref(), Some("maps.mas"));
        assert!(!args.config().fix);
    }

    #[test]
    fn conflicting_override_flags_are_rejected() {
        let parsed = Cli::try_parse_from([
            "vehfix",
            "check",
            "--no-override",
            "--override-archive",
            "maps.mas",
            "a.veh",
        ]);
        assert!(parsed.is_err());
    }
}
