//! Regenerates scene text with new `SearchPath`/`MASFile` declarations.
//!
//! Only the declaration lines of a list that actually changed are touched.
//! Everything else, including line endings, is copied through as is.

use crate::error::CoreError;
use crate::scene::{ARCHIVE_KEY, SEARCH_PATH_KEY, SceneDescriptor, declared_list};
use crate::text::write_text_file;
use crate::tokenizer::{split_lines, tokenize_line};

/// Formatting of one existing declaration line, reused for new entries.
#[derive(Debug, Clone)]
struct DeclarationTemplate<'a> {
    line_index: usize,
    prefix: &'a str,
    trail: &'a str,
    quoted: bool,
    comment: Option<&'a str>,
    indent: &'a str,
}

impl DeclarationTemplate<'_> {
    fn render(&self, entry: &str, with_comment: bool) -> String {
        let value = if self.quoted {
            format!("\"{entry}\"")
        } else {
            entry.to_string()
        };
        match self.comment.filter(|_| with_comment) {
            Some(comment) => format!("{}{value}{}{comment}", self.prefix, self.trail),
            None => format!("{}{value}", self.prefix),
        }
    }
}

struct ManagedList<'a> {
    key: &'static str,
    templates: Vec<DeclarationTemplate<'a>>,
    entries: &'a [String],
    changed: bool,
}

impl<'a> ManagedList<'a> {
    fn collect(text: &'a str, key: &'static str, entries: &'a [String]) -> Self {
        let templates = split_lines(text)
            .enumerate()
            .filter_map(|(line_index, (line, _))| {
                let tokens = tokenize_line(line);
                let kv = tokens.key_value.filter(|kv| kv.key_is(key))?;
                Some(DeclarationTemplate {
                    line_index,
                    prefix: kv.prefix,
                    trail: kv.trail,
                    quoted: kv.is_quoted(),
                    comment: tokens.comment,
                    indent: &line[..line.len() - line.trim_start().len()],
                })
            })
            .collect();
        let changed = declared_list(text, key) != entries;
        Self {
            key,
            templates,
            entries,
            changed,
        }
    }

    fn position(&self, line_index: usize) -> Option<usize> {
        self.templates
            .iter()
            .position(|template| template.line_index == line_index)
    }

    /// Output replacing declaration number `position`, or `None` to copy the
    /// original line.
    fn replacement(&self, position: usize) -> Option<Vec<String>> {
        if !self.changed {
            return None;
        }
        let template = &self.templates[position];
        if position == 0 && !self.entries.is_empty() {
            let last = self.templates.len() - 1;
            let lines = self
                .entries
                .iter()
                .enumerate()
                .map(|(i, entry)| match self.templates.get(i) {
                    Some(own) => own.render(entry, true),
                    None => self.templates[last].render(entry, false),
                })
                .collect();
            return Some(lines);
        }
        if position < self.entries.len() {
            // Its comment already moved up with the entry it formats.
            return Some(Vec::new());
        }
        Some(
            template
                .comment
                .map(|comment| vec![format!("{}{comment}", template.indent)])
                .unwrap_or_default(),
        )
    }

    fn appended(&self) -> Vec<String> {
        if !self.changed || !self.templates.is_empty() {
            return Vec::new();
        }
        self.entries
            .iter()
            .map(|entry| format!("{}={entry}", self.key))
            .collect()
    }
}

/// Returns `original_text` with its search path and archive declarations
/// replaced. Passing the lists parsed from `original_text` returns it
/// unchanged.
pub fn rewrite(original_text: &str, new_search_path: &[String], new_archives: &[String]) -> String {
    let lists = [
        ManagedList::collect(original_text, SEARCH_PATH_KEY, new_search_path),
        ManagedList::collect(original_text, ARCHIVE_KEY, new_archives),
    ];
    let newline = if original_text.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    };

    let mut out = String::with_capacity(original_text.len() + 64);
    for (line_index, (line, ending)) in split_lines(original_text).enumerate() {
        let replacement = lists.iter().find_map(|list| {
            list.position(line_index)
                .map(|position| list.replacement(position))
        });
        match replacement {
            None | Some(None) => {
                out.push_str(line);
                out.push_str(ending);
            }
            Some(Some(lines)) => {
                let separator = if ending.is_empty() { newline } else { ending };
                let count = lines.len();
                for (i, rendered) in lines.into_iter().enumerate() {
                    out.push_str(&rendered);
                    out.push_str(if i + 1 == count { ending } else { separator });
                }
            }
        }
    }

    for list in &lists {
        let appended = list.appended();
        if appended.is_empty() {
            continue;
        }
        if !out.is_empty() && !out.ends_with('\n') {
            out.push_str(newline);
        }
        for line in appended {
            out.push_str(&line);
            out.push_str(newline);
        }
    }

    out
}

/// Writes `descriptor` back to its file with the given lists. Returns
/// `false` without touching the file when the text would not change.
pub fn write_scene(
    descriptor: &SceneDescriptor,
    search_path: &[String],
    archives: &[String],
) -> Result<bool, CoreError> {
    let text = rewrite(&descriptor.text, search_path, archives);
    if text == descriptor.text {
        return Ok(false);
    }
    write_text_file(&descriptor.path, &text)?;
    Ok(true)
}
