use std::sync::LazyLock;

use regex::Regex;

static KEY_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<prefix>\s*(?P<key>[^=]*[^=\s])\s*=\s*)(?P<value>.*?)(?P<trail>\s*)$")
        .expect("key/value pattern must compile")
});

const COMMENT_MARKER: &str = "//";

/// A `key = value` assignment found on one line, borrowed from the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyValue<'a> {
    pub key: &'a str,
    /// Raw value text, still quoted if the file quoted it.
    pub value: &'a str,
    /// Indentation, key and the `=` with its surrounding spacing.
    pub prefix: &'a str,
    /// Whitespace between the value and the comment (or end of line).
    pub trail: &'a str,
}

impl KeyValue<'_> {
    pub fn key_is(&self, name: &str) -> bool {
        self.key.eq_ignore_ascii_case(name)
    }

    pub fn is_quoted(&self) -> bool {
        quoted_inner(self.value).is_some()
    }

    pub fn unquoted(&self) -> &str {
        unquote(self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTokens<'a> {
    /// The line with any trailing comment removed.
    pub content: &'a str,
    /// The comment including its leading `//`.
    pub comment: Option<&'a str>,
    pub key_value: Option<KeyValue<'a>>,
}

pub fn tokenize_line(line: &str) -> LineTokens<'_> {
    let (content, comment) = match line.find(COMMENT_MARKER) {
        Some(idx) => (&line[..idx], Some(&line[idx..])),
        None => (line, None),
    };

    let key_value = KEY_VALUE_RE.captures(content).and_then(|caps| {
        Some(KeyValue {
            key: caps.name("key")?.as_str(),
            value: caps.name("value")?.as_str(),
            prefix: caps.name("prefix")?.as_str(),
            trail: caps.name("trail")?.as_str(),
        })
    });

    LineTokens {
        content,
        comment,
        key_value,
    }
}

pub fn unquote(value: &str) -> &str {
    quoted_inner(value).unwrap_or(value)
}

fn quoted_inner(value: &str) -> Option<&str> {
    let rest = value.strip_prefix('"')?;
    let end = rest.rfind('"')?;
    Some(&rest[..end])
}

/// Splits a list-valued field on commas, trimming each item and dropping
/// empty ones.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn nt_to_posix(path: &str) -> String {
    path.replace('\\', "/")
}

/// Splits text into lines, keeping each line's terminator (`\r\n`, `\n` or
/// nothing for an unterminated last line) separate from its content.
pub fn split_lines(text: &str) -> impl Iterator<Item = (&str, &str)> {
    text.split_inclusive('\n').map(|raw| {
        if let Some(body) = raw.strip_suffix("\r\n") {
            (body, "\r\n")
        } else if let Some(body) = raw.strip_suffix('\n') {
            (body, "\n")
        } else {
            (raw, "")
        }
    })
}
