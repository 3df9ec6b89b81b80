use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{CoreError, CoreErrorCode};
use crate::icase::{lookup_path_icase, lookup_relative_icase};
use crate::locate::{locate_mod_name, locate_mod_root};
use crate::tokenizer::nt_to_posix;

pub const VEHDIR_PLACEHOLDER: &str = "<VEHDIR>";
pub const TEAMDIR_PLACEHOLDER: &str = "<TEAMDIR>";

pub(crate) static VEHDIR_RE: LazyLock<Regex> =
    LazyLock::new(|| placeholder_regex(VEHDIR_PLACEHOLDER));
static TEAMDIR_RE: LazyLock<Regex> = LazyLock::new(|| placeholder_regex(TEAMDIR_PLACEHOLDER));

fn placeholder_regex(placeholder: &str) -> Regex {
    Regex::new(&format!("(?i){}", regex::escape(placeholder)))
        .expect("placeholder pattern must compile")
}

/// The directories `<VEHDIR>` and `<TEAMDIR>` expand to, and the mod name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionContext {
    pub vehdir: PathBuf,
    pub teamdir: PathBuf,
    pub mod_name: String,
}

impl ResolutionContext {
    pub fn new(
        vehdir: impl Into<PathBuf>,
        teamdir: impl Into<PathBuf>,
        mod_name: impl Into<String>,
    ) -> Self {
        Self {
            vehdir: vehdir.into(),
            teamdir: teamdir.into(),
            mod_name: mod_name.into(),
        }
    }

    /// Derives the context from a root vehicle descriptor: the team
    /// directory is the one holding the file.
    pub fn for_vehicle_file(path: &Path) -> Result<Self, CoreError> {
        let teamdir = path.parent().ok_or_else(|| {
            CoreError::new(
                CoreErrorCode::NotFound,
                format!("{} has no parent directory", path.display()),
            )
        })?;
        Ok(Self {
            vehdir: locate_mod_root(teamdir)?,
            teamdir: teamdir.to_path_buf(),
            mod_name: locate_mod_name(teamdir)?,
        })
    }

    pub fn expand(&self, entry: &str) -> PathBuf {
        let vehdir = format!("{}/", self.vehdir.display());
        let teamdir = format!("{}/", self.teamdir.display());
        let expanded = VEHDIR_RE.replace_all(entry, NoExpand(&vehdir));
        let expanded = TEAMDIR_RE.replace_all(&expanded, NoExpand(&teamdir));
        PathBuf::from(nt_to_posix(&expanded))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    ArchiveUnresolved { archive: String },
    SearchPathMissing { entry: String, expanded: PathBuf },
    SearchPathDuplicate { entry: String, first: String },
}

impl Diagnostic {
    pub fn with_context(&self, context: &Path) -> String {
        format!("{}: {}", context.display(), self)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArchiveUnresolved { archive } => {
                write!(f, "couldn't locate MAS file '{archive}' in search path")
            }
            Self::SearchPathMissing { entry, expanded } => write!(
                f,
                "search path entry '{entry}' doesn't exist ({})",
                expanded.display()
            ),
            Self::SearchPathDuplicate { entry, first } => write!(
                f,
                "search path entry '{entry}' is the same directory as '{first}'"
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl CheckResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Errors followed by warnings, each prefixed with `context`.
    pub fn messages(&self, context: &Path) -> Vec<String> {
        self.errors
            .iter()
            .chain(&self.warnings)
            .map(|diagnostic| diagnostic.with_context(context))
            .collect()
    }
}

/// Checks that every archive can be found through the search path.
///
/// Entries that don't resolve to a directory are only warned about; they
/// take no part in archive lookup. Diagnostics follow input order.
pub fn check(
    search_path: &[String],
    archives: &[String],
    context: &ResolutionContext,
) -> CheckResult {
    let mut result = CheckResult::default();

    let mut directories: Vec<(PathBuf, &str)> = Vec::with_capacity(search_path.len());
    for entry in search_path {
        let expanded = context.expand(entry);
        let Some(directory) = lookup_path_icase(&expanded).filter(|p| p.is_dir()) else {
            result.warnings.push(Diagnostic::SearchPathMissing {
                entry: entry.clone(),
                expanded,
            });
            continue;
        };

        if let Some((_, first)) = directories.iter().find(|(seen, _)| *seen == directory) {
            result.warnings.push(Diagnostic::SearchPathDuplicate {
                entry: entry.clone(),
                first: first.to_string(),
            });
            continue;
        }
        directories.push((directory, entry.as_str()));
    }

    for archive in archives {
        let found = directories.iter().find_map(|(directory, _)| {
            lookup_relative_icase(directory, archive).filter(|p| p.is_file())
        });
        match found {
            Some(path) => trace!(archive = %archive, path = %path.display(), "archive resolved"),
            None => result.errors.push(Diagnostic::ArchiveUnresolved {
                archive: archive.clone(),
            }),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{Diagnostic, ResolutionContext};

    #[test]
    fn expands_placeholders_case_insensitively() {
        let context = ResolutionContext::new("/g/Vehicles", "/g/Vehicles/ACME/Red", "ACME");
        assert_eq!(
            context.expand("<VEHDIR>\\Shared"),
            PathBuf::from("/g/Vehicles//Shared")
        );
        assert_eq!(
            context.expand("<teamdir>textures"),
            PathBuf::from("/g/Vehicles/ACME/Red/textures")
        );
        assert_eq!(context.expand("Common"), PathBuf::from("Common"));
    }

    #[test]
    fn context_from_vehicle_file() {
        let context =
            ResolutionContext::for_vehicle_file(Path::new("/g/Vehicles/ACME/Teams/Red/red.veh"))
                .expect("context");
        assert_eq!(context.vehdir, PathBuf::from("/g/Vehicles"));
        assert_eq!(context.teamdir, PathBuf::from("/g/Vehicles/ACME/Teams/Red"));
        assert_eq!(context.mod_name, "ACME");
    }

    #[test]
    fn diagnostics_render_with_context() {
        let diagnostic = Diagnostic::ArchiveUnresolved {
            archive: "cmaps.mas".to_string(),
        };
        assert_eq!(
            diagnostic.with_context(Path::new("/g/acme.gen")),
            "/g/acme.gen: couldn't locate MAS file 'cmaps.mas' in search path"
        );
    }
}
