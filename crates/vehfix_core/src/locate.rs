use std::path::{Path, PathBuf};

use crate::error::{CoreError, CoreErrorCode};
use crate::icase::{lookup_relative_icase, segments};

pub const VEHICLES_SEGMENT: &str = "Vehicles";

/// Byte span of every `/`- or `\`-separated segment of `path`.
fn segment_spans(path: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0;
    for (idx, c) in path.char_indices() {
        if c == '/' || c == '\\' {
            if idx > start {
                spans.push((start, idx));
            }
            start = idx + c.len_utf8();
        }
    }
    if path.len() > start {
        spans.push((start, path.len()));
    }
    spans
}

/// Index (into `spans`) of the last segment named `Vehicles`.
fn last_vehicles_segment(path: &str, spans: &[(usize, usize)]) -> Option<usize> {
    spans
        .iter()
        .rposition(|&(start, end)| path[start..end].eq_ignore_ascii_case(VEHICLES_SEGMENT))
}

pub fn locate_mod_root(path: &Path) -> Result<PathBuf, CoreError> {
    let text = path.to_string_lossy();
    let spans = segment_spans(&text);
    let idx = last_vehicles_segment(&text, &spans).ok_or_else(|| {
        CoreError::new(
            CoreErrorCode::NotFound,
            format!("couldn't locate <VEHDIR> in {}", path.display()),
        )
    })?;
    Ok(PathBuf::from(&text[..spans[idx].1]))
}

pub fn locate_mod_name(path: &Path) -> Result<String, CoreError> {
    let text = path.to_string_lossy();
    let spans = segment_spans(&text);
    last_vehicles_segment(&text, &spans)
        .and_then(|idx| spans.get(idx + 1))
        .map(|&(start, end)| text[start..end].to_string())
        .ok_or_else(|| {
            CoreError::new(
                CoreErrorCode::NotFound,
                format!("couldn't locate modname in {}", path.display()),
            )
        })
}

/// Walks from `start_directory` up to the filesystem root looking for
/// `relative_name`. Shared scene files may live at any level above the
/// vehicle that uses them.
pub fn find_ancestor_file(start_directory: &Path, relative_name: &str) -> Option<PathBuf> {
    let mut directory = start_directory.to_path_buf();
    loop {
        if let Some(found) = lookup_relative_icase(&directory, relative_name)
            && found.is_file()
        {
            return Some(found);
        }

        let parent = directory.parent().map(Path::to_path_buf)?;
        if parent == directory {
            return None;
        }
        directory = parent;
    }
}

/// `path` relative to `base` as a `/`-separated string, comparing segments
/// case-insensitively. Returns `None` when `path` is not below `base`.
pub fn relative_to(path: &Path, base: &Path) -> Option<String> {
    let path = path.to_string_lossy();
    let base = base.to_string_lossy();
    let mut path_segments = segments(&path);
    for base_segment in segments(&base) {
        if !path_segments.next()?.eq_ignore_ascii_case(base_segment) {
            return None;
        }
    }
    Some(path_segments.collect::<Vec<_>>().join("/"))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use tempfile::TempDir;

    use super::{find_ancestor_file, locate_mod_name, locate_mod_root, relative_to};
    use crate::error::CoreErrorCode;

    #[test]
    fn locates_root_and_mod_name_case_insensitively() {
        let path = Path::new("/games/rFactor/GameData/VEHICLES/ACME/Teams/Red/red.veh");
        assert_eq!(
            locate_mod_root(path).expect("root"),
            PathBuf::from("/games/rFactor/GameData/VEHICLES")
        );
        assert_eq!(locate_mod_name(path).expect("mod name"), "ACME");
    }

    #[test]
    fn handles_windows_separators() {
        let path = Path::new(r"C:\rFactor\GameData\Vehicles\ACME\red.veh");
        assert_eq!(
            locate_mod_root(path).expect("root"),
            PathBuf::from(r"C:\rFactor\GameData\Vehicles")
        );
        assert_eq!(locate_mod_name(path).expect("mod name"), "ACME");
    }

    #[test]
    fn uses_innermost_vehicles_segment() {
        let path = Path::new("/mods/Vehicles/Pack/Vehicles/ACME");
        assert_eq!(
            locate_mod_root(path).expect("root"),
            PathBuf::from("/mods/Vehicles/Pack/Vehicles")
        );
        assert_eq!(locate_mod_name(path).expect("mod name"), "ACME");
    }

    #[test]
    fn missing_vehicles_segment_is_not_found() {
        let path = Path::new("/games/rFactor/GameData/Locations/track.gdb");
        let root_err = locate_mod_root(path).expect_err("no Vehicles segment");
        let name_err = locate_mod_name(path).expect_err("no Vehicles segment");
        assert_eq!(root_err.code, CoreErrorCode::NotFound);
        assert_eq!(name_err.code, CoreErrorCode::NotFound);
        assert!(name_err.is_not_found());
    }

    #[test]
    fn vehicles_as_last_segment_has_no_mod_name() {
        let path = Path::new("/games/GameData/Vehicles");
        assert!(locate_mod_root(path).is_ok());
        assert!(locate_mod_name(path).is_err());
    }

    #[test]
    fn ancestor_search_walks_upward() {
        let root = TempDir::new().expect("temp dir");
        let team_dir = root.path().join("Vehicles").join("ACME").join("Teams").join("Red");
        fs::create_dir_all(&team_dir).expect("create dirs");
        let shared = root.path().join("Vehicles").join("ACME").join("acme.gen");
        fs::write(&shared, b"").expect("write fixture");

        assert_eq!(find_ancestor_file(&team_dir, "ACME.GEN"), Some(shared));
        assert_eq!(find_ancestor_file(&team_dir, "missing.gen"), None);
    }

    #[test]
    fn relative_to_compares_segments_case_insensitively() {
        assert_eq!(
            relative_to(Path::new("/g/Vehicles/ACME/Red"), Path::new("/g/vehicles")),
            Some("ACME/Red".to_string())
        );
        assert_eq!(
            relative_to(Path::new("/g/Vehicles"), Path::new("/g/Vehicles")),
            Some(String::new())
        );
        assert_eq!(relative_to(Path::new("/other"), Path::new("/g")), None);
    }
}
