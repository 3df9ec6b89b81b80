use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::CoreError;
use crate::text::read_text_file;
use crate::tokenizer::{split_lines, tokenize_line};

/// The handful of `.hdv` physics entries shown in vehicle listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhysicsSummary {
    pub path: PathBuf,
    pub mass: Option<String>,
    pub inertia: Option<String>,
    pub engine_file: Option<String>,
    pub gear_file: Option<String>,
    pub physical_model_file: Option<String>,
    pub tire_brand: Option<String>,
}

impl PhysicsSummary {
    pub fn parse_file(path: &Path) -> Result<Self, CoreError> {
        let text = read_text_file(path)?;
        Ok(Self::parse_text(path, &text))
    }

    pub fn parse_text(path: impl Into<PathBuf>, text: &str) -> Self {
        let mut hdv = Self {
            path: path.into(),
            ..Self::default()
        };
        for (line, _) in split_lines(text) {
            let Some(kv) = tokenize_line(line).key_value else {
                continue;
            };
            let slot = match kv.key.to_ascii_lowercase().as_str() {
                "mass" => &mut hdv.mass,
                "inertia" => &mut hdv.inertia,
                "normal" => &mut hdv.engine_file,
                "gearfile" => &mut hdv.gear_file,
                "physicalmodelfile" => &mut hdv.physical_model_file,
                "tirebrand" => &mut hdv.tire_brand,
                _ => continue,
            };
            *slot = Some(kv.unquoted().trim().to_string());
        }
        hdv
    }
}
