//! Wav references in `.sfx` sound definitions.
//!
//! Two line shapes carry a wav: `Key=path.wav` and `Key=volume,path.wav`.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::icase::file_exists;
use crate::tokenizer::{nt_to_posix, split_lines, tokenize_line};

static WAV_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?P<volume>[0-9]+(?:\.[0-9]+)?),)?(?P<wav>.*\.wav)(?P<rest>.*)$")
        .expect("wav pattern must compile")
});

const SOUNDS_DIR: &str = "Sounds";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SoundReference {
    pub key: String,
    pub volume: Option<String>,
    /// `/`-separated path relative to the game's `Sounds` directory.
    pub wav: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundStatus {
    Found,
    /// Only found below the mod's own `Sounds/<mod>` directory.
    FoundInMod,
    Missing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SoundSet {
    pub references: Vec<SoundReference>,
}

impl SoundSet {
    pub fn parse_text(text: &str) -> Self {
        let references = split_lines(text)
            .filter_map(|(line, _)| {
                let kv = tokenize_line(line).key_value?;
                let caps = WAV_VALUE_RE.captures(kv.value)?;
                Some(SoundReference {
                    key: kv.key.to_string(),
                    volume: caps.name("volume").map(|m| m.as_str().to_string()),
                    wav: nt_to_posix(caps.name("wav")?.as_str().trim()),
                })
            })
            .collect();
        Self { references }
    }

    pub fn check(&self, gamedata: &Path, mod_name: &str) -> Vec<(&SoundReference, SoundStatus)> {
        let sounds = gamedata.join(SOUNDS_DIR);
        self.references
            .iter()
            .map(|reference| {
                let exists = |base: &Path| file_exists(&base.join(&reference.wav));
                let status = if exists(&sounds) {
                    SoundStatus::Found
                } else if exists(&sounds.join(mod_name)) {
                    SoundStatus::FoundInMod
                } else {
                    SoundStatus::Missing
                };
                (reference, status)
            })
            .collect()
    }
}

/// Maps every wav reference in `text` through `on_wav`, leaving keys,
/// volumes, comments and all other lines as they were.
pub fn rewrite_text(text: &str, mut on_wav: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    for (line, ending) in split_lines(text) {
        let tokens = tokenize_line(line);
        let replaced = tokens.key_value.and_then(|kv| {
            let caps = WAV_VALUE_RE.captures(kv.value)?;
            let wav = caps.name("wav")?;
            let rest = caps.name("rest").map_or("", |m| m.as_str());
            let volume = caps
                .name("volume")
                .map(|m| format!("{},", m.as_str()))
                .unwrap_or_default();
            let mapped = on_wav(&nt_to_posix(wav.as_str().trim()));
            Some(format!(
                "{}{volume}{mapped}{rest}{}{}",
                kv.prefix,
                kv.trail,
                tokens.comment.unwrap_or("")
            ))
        });
        out.push_str(replaced.as_deref().unwrap_or(line));
        out.push_str(ending);
    }
    out
}
