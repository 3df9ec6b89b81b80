use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::check::{CheckResult, ResolutionContext, VEHDIR_PLACEHOLDER, VEHDIR_RE, check};
use crate::config::CheckConfig;
use crate::icase::find_file;
use crate::locate::relative_to;
use crate::scene::SceneDescriptor;
use crate::tokenizer::nt_to_posix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairDecision {
    /// Nothing to write.
    Unchanged,
    /// The synthesized search path resolves more archives.
    AcceptCandidate,
    /// The candidate was no better, but the mod's override archive replaced
    /// the shared one; keep the original search path with it.
    KeepOriginalWithOverride,
    /// The original search path was already clean once the override archive
    /// was substituted.
    OverrideOnly,
}

impl RepairDecision {
    pub fn persists(self) -> bool {
        self != Self::Unchanged
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairCandidate {
    pub search_path: Vec<String>,
    pub result: CheckResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairOutcome {
    pub original_search_path: Vec<String>,
    pub original: CheckResult,
    pub candidate: Option<RepairCandidate>,
    /// Archive list in effect, after any override substitution.
    pub archives: Vec<String>,
    /// Path (relative to `<VEHDIR>`) of the override archive, if substituted.
    pub override_archive: Option<String>,
    pub decision: RepairDecision,
}

impl RepairOutcome {
    pub fn chosen_search_path(&self) -> &[String] {
        match (&self.decision, &self.candidate) {
            (RepairDecision::AcceptCandidate, Some(candidate)) => &candidate.search_path,
            _ => &self.original_search_path,
        }
    }

    pub fn chosen_result(&self) -> &CheckResult {
        match (&self.decision, &self.candidate) {
            (RepairDecision::AcceptCandidate, Some(candidate)) => &candidate.result,
            _ => &self.original,
        }
    }

    /// Search path and archive list to write back, if the decision persists.
    pub fn to_persist(&self) -> Option<(&[String], &[String])> {
        self.decision
            .persists()
            .then(|| (self.chosen_search_path(), self.archives.as_slice()))
    }
}

pub fn repair(
    descriptor: &SceneDescriptor,
    context: &ResolutionContext,
    config: &CheckConfig,
) -> RepairOutcome {
    let mut archives = descriptor.archives.clone();
    let override_archive = config
        .override_archive
        .as_deref()
        .and_then(|name| apply_archive_override(&mut archives, context, name));

    let original = check(&descriptor.search_path, &archives, context);

    let (candidate, decision) = if original.errors.is_empty() {
        let decision = if override_archive.is_some() {
            RepairDecision::OverrideOnly
        } else {
            RepairDecision::Unchanged
        };
        (None, decision)
    } else {
        let search_path = candidate_search_path(&descriptor.search_path, context);
        let result = check(&search_path, &archives, context);
        let decision = if result.errors.is_empty() || result.errors.len() < original.errors.len() {
            RepairDecision::AcceptCandidate
        } else if override_archive.is_some() {
            RepairDecision::KeepOriginalWithOverride
        } else {
            RepairDecision::Unchanged
        };
        (
            Some(RepairCandidate {
                search_path,
                result,
            }),
            decision,
        )
    };

    debug!(
        scene = %descriptor.path.display(),
        original_errors = original.errors.len(),
        candidate_errors = ?candidate.as_ref().map(|c| c.result.errors.len()),
        ?decision,
        "repair decision"
    );

    RepairOutcome {
        original_search_path: descriptor.search_path.clone(),
        original,
        candidate,
        archives,
        override_archive,
        decision,
    }
}

/// Replaces every archive named `name` with the mod's own copy, if the mod
/// directory ships one. Returns the substituted path.
pub fn apply_archive_override(
    archives: &mut [String],
    context: &ResolutionContext,
    name: &str,
) -> Option<String> {
    if !archives.iter().any(|archive| archive.eq_ignore_ascii_case(name)) {
        return None;
    }
    let found = find_file(&context.vehdir.join(&context.mod_name), name)?;
    let relative = relative_to(&found, &context.vehdir)?;
    for archive in archives.iter_mut() {
        if archive.eq_ignore_ascii_case(name) {
            *archive = relative.clone();
        }
    }
    debug!(archive = name, replacement = %relative, "using mod override archive");
    Some(relative)
}

/// Builds the alternate search path: every `<VEHDIR>` entry qualified with
/// the mod name, then the team directory and each of its ancestors up to
/// `<VEHDIR>`. The result is sorted and free of duplicates.
pub fn candidate_search_path(search_path: &[String], context: &ResolutionContext) -> Vec<String> {
    let mut candidate: Vec<String> = search_path
        .iter()
        .map(|entry| qualify_with_mod_name(entry, &context.mod_name))
        .collect();
    candidate.extend(ancestor_entries(context));

    candidate
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn qualify_with_mod_name(entry: &str, mod_name: &str) -> String {
    if !VEHDIR_RE.is_match(entry) {
        return entry.to_string();
    }
    let posix = nt_to_posix(entry);
    let mut qualified = String::with_capacity(posix.len() + mod_name.len() + 2);
    let mut last = 0;
    for placeholder in VEHDIR_RE.find_iter(&posix) {
        qualified.push_str(&posix[last..placeholder.start()]);
        qualified.push_str(VEHDIR_PLACEHOLDER);
        qualified.push('/');
        qualified.push_str(mod_name);
        let rest = &posix[placeholder.end()..];
        let trimmed = rest.trim_start_matches('/');
        if !trimmed.is_empty() {
            qualified.push('/');
        }
        last = placeholder.end() + (rest.len() - trimmed.len());
    }
    qualified.push_str(&posix[last..]);
    qualified
}

fn ancestor_entries(context: &ResolutionContext) -> Vec<String> {
    let mut entries = Vec::new();
    match relative_to(&context.teamdir, &context.vehdir) {
        Some(mut relative) => {
            while !relative.is_empty() {
                entries.push(format!("{VEHDIR_PLACEHOLDER}/{relative}"));
                relative.truncate(relative.rfind('/').unwrap_or(0));
            }
        }
        None => debug!(
            teamdir = %context.teamdir.display(),
            vehdir = %context.vehdir.display(),
            "team directory is outside <VEHDIR>; no ancestor entries"
        ),
    }
    entries.push(VEHDIR_PLACEHOLDER.to_string());
    entries
}
