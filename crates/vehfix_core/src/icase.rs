//! Case-insensitive filesystem lookups.
//!
//! Mods are authored on Windows, so references in descriptors rarely match
//! the on-disk casing once the files land on a case-sensitive filesystem.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::trace;

/// Splits a path string on both `/` and `\`, dropping empty segments.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\']).filter(|segment| !segment.is_empty())
}

pub fn lookup_path_icase(path: &Path) -> Option<PathBuf> {
    if path.exists() {
        return Some(path.to_path_buf());
    }

    let mut current = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => current.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => current.push(".."),
            Component::Normal(part) => {
                current = resolve_component(&current, &part.to_string_lossy())?;
            }
        }
    }
    Some(current)
}

/// Resolves a `/` or `\` separated relative path below `base`.
pub fn lookup_relative_icase(base: &Path, relative: &str) -> Option<PathBuf> {
    let mut current = lookup_path_icase(base)?;
    for part in segments(relative) {
        match part {
            "." => {}
            ".." => current.push(".."),
            _ => current = resolve_component(&current, part)?,
        }
    }
    Some(current)
}

pub fn file_exists(path: &Path) -> bool {
    lookup_path_icase(path).is_some_and(|p| p.is_file())
}

pub fn dir_exists(path: &Path) -> bool {
    lookup_path_icase(path).is_some_and(|p| p.is_dir())
}

/// Recursively searches `root` for a file called `name`. Files of a
/// directory are checked before its subdirectories, both in name order.
pub fn find_file(root: &Path, name: &str) -> Option<PathBuf> {
    let root = lookup_path_icase(root)?;
    find_file_rec(&root, name)
}

fn find_file_rec(dir: &Path, name: &str) -> Option<PathBuf> {
    let mut files = Vec::new();
    let mut subdirs = Vec::new();
    for entry in fs::read_dir(dir).ok()?.flatten() {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else {
            files.push(path);
        }
    }
    files.sort();
    subdirs.sort();

    let found = files.into_iter().find(|path| {
        path.file_name()
            .is_some_and(|file_name| file_name.to_string_lossy().eq_ignore_ascii_case(name))
    });
    if found.is_some() {
        return found;
    }
    subdirs
        .iter()
        .find_map(|subdir| find_file_rec(subdir, name))
}

fn resolve_component(base: &Path, part: &str) -> Option<PathBuf> {
    let direct = base.join(part);
    if direct.exists() {
        return Some(direct);
    }

    let listing_dir = if base.as_os_str().is_empty() {
        Path::new(".")
    } else {
        base
    };
    let mut matches: Vec<_> = fs::read_dir(listing_dir)
        .ok()?
        .flatten()
        .map(|entry| entry.file_name())
        .filter(|file_name| file_name.to_string_lossy().eq_ignore_ascii_case(part))
        .collect();
    matches.sort();
    let resolved = matches.into_iter().next().map(|file_name| base.join(file_name));
    trace!(base = %base.display(), part, resolved = ?resolved, "case-insensitive lookup");
    resolved
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{dir_exists, file_exists, find_file, lookup_path_icase, lookup_relative_icase};

    #[test]
    fn resolves_mismatched_case_component_by_component() {
        let root = TempDir::new().expect("temp dir");
        let actual = root.path().join("Vehicles").join("ACME").join("Car.VEH");
        fs::create_dir_all(actual.parent().expect("parent")).expect("create dirs");
        fs::write(&actual, b"").expect("write fixture");

        let wanted = root.path().join("vehicles").join("acme").join("car.veh");
        assert_eq!(lookup_path_icase(&wanted), Some(actual.clone()));
        assert_eq!(
            lookup_relative_icase(root.path(), "VEHICLES\\acme/CAR.veh"),
            Some(actual)
        );
        assert!(file_exists(&wanted));
        assert!(dir_exists(&root.path().join("VEHICLES")));
        assert!(!dir_exists(&wanted));
    }

    #[test]
    fn missing_component_yields_none() {
        let root = TempDir::new().expect("temp dir");
        assert_eq!(lookup_path_icase(&root.path().join("nope").join("x")), None);
        assert!(!file_exists(&root.path().join("nope")));
    }

    #[test]
    fn find_file_prefers_shallow_matches_in_name_order() {
        let root = TempDir::new().expect("temp dir");
        let deep = root.path().join("A").join("cmaps.mas");
        let shallow = root.path().join("B").join("CMAPS.MAS");
        let deeper = root.path().join("B").join("C").join("cmaps.mas");
        for path in [&deep, &shallow, &deeper] {
            fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
            fs::write(path, b"").expect("write fixture");
        }

        assert_eq!(find_file(root.path(), "cmaps.mas"), Some(deep));
        assert_eq!(find_file(&root.path().join("b"), "cmaps.mas"), Some(shallow));
        assert_eq!(find_file(root.path(), "other.mas"), None);
    }
}
