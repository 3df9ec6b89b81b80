use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::CoreError;
use crate::text::read_text_file;
use crate::tokenizer::{split_lines, split_list, tokenize_line};

pub const SEARCH_PATH_KEY: &str = "SearchPath";
pub const ARCHIVE_KEY: &str = "MASFile";

/// A parsed scene (`.gen`) file.
///
/// `search_path` order matters: the first directory holding an archive
/// is the one the simulator loads it from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneDescriptor {
    pub path: PathBuf,
    pub search_path: Vec<String>,
    pub archives: Vec<String>,
    /// The full decoded file, kept for lossless rewriting.
    #[serde(skip)]
    pub text: String,
}

impl SceneDescriptor {
    pub fn parse_file(path: &Path) -> Result<Self, CoreError> {
        let text = read_text_file(path)?;
        Ok(Self::parse_text(path, text))
    }

    pub fn parse_text(path: impl Into<PathBuf>, text: String) -> Self {
        let search_path = declared_list(&text, SEARCH_PATH_KEY);
        let archives = declared_list(&text, ARCHIVE_KEY);
        Self {
            path: path.into(),
            search_path,
            archives,
            text,
        }
    }
}

/// Every entry declared under `key`, in file order. A declaration may hold a
/// single entry or a comma-separated list.
pub(crate) fn declared_list(text: &str, key: &str) -> Vec<String> {
    split_lines(text)
        .filter_map(|(line, _)| tokenize_line(line).key_value)
        .filter(|kv| kv.key_is(key))
        .flat_map(|kv| split_list(kv.unquoted()))
        .collect()
}
