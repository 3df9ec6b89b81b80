use std::fs;
use std::io::Write as _;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{CoreError, CoreErrorCode};

/// Reads a descriptor file. Descriptors are Latin-1; every byte maps to the
/// code point of the same value, so decoding only rejects binary input.
pub fn read_text_file(path: &Path) -> Result<String, CoreError> {
    let bytes = fs::read(path).map_err(|e| {
        CoreError::new(
            CoreErrorCode::Io,
            format!("failed to read {}: {e}", path.display()),
        )
    })?;
    decode_latin1(&bytes).map_err(|message| {
        CoreError::new(
            CoreErrorCode::Parse,
            format!("{} is not a text file: {message}", path.display()),
        )
    })
}

/// Replaces `path` with `text`. The text is encoded and staged in a
/// temporary file next to the target, then renamed over it.
pub fn write_text_file(path: &Path, text: &str) -> Result<(), CoreError> {
    let bytes = encode_latin1(text).map_err(|message| {
        CoreError::new(
            CoreErrorCode::Parse,
            format!("can't write {}: {message}", path.display()),
        )
    })?;
    let io_error = |e: std::io::Error| {
        CoreError::new(
            CoreErrorCode::Io,
            format!("failed to write {}: {e}", path.display()),
        )
    };

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(directory).map_err(io_error)?;
    staged.write_all(&bytes).map_err(io_error)?;
    staged.persist(path).map_err(|e| io_error(e.error))?;
    debug!(path = %path.display(), bytes = bytes.len(), "wrote file");
    Ok(())
}

pub fn decode_latin1(bytes: &[u8]) -> Result<String, String> {
    if let Some(offset) = bytes.iter().position(|&b| b == 0) {
        return Err(format!("NUL byte at offset {offset}"));
    }
    Ok(bytes.iter().map(|&b| char::from(b)).collect())
}

pub fn encode_latin1(text: &str) -> Result<Vec<u8>, String> {
    text.chars()
        .map(|c| {
            u8::try_from(u32::from(c))
                .map_err(|_| format!("character {c:?} cannot be encoded as Latin-1"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{decode_latin1, encode_latin1, read_text_file, write_text_file};
    use crate::error::CoreErrorCode;

    #[test]
    fn latin1_round_trips_high_bytes() {
        let bytes = b"Team=\"Caf\xe9 Racing\"\r\n".to_vec();
        let text = decode_latin1(&bytes).expect("latin-1 should decode");
        assert!(text.contains("Café"));
        assert_eq!(encode_latin1(&text).expect("should encode"), bytes);
    }

    #[test]
    fn rejects_binary_and_unencodable_text() {
        assert!(decode_latin1(b"MAS\0\x01").is_err());
        assert!(encode_latin1("SearchPath=\u{2603}").is_err());
    }

    #[test]
    fn write_is_all_or_nothing() {
        let root = TempDir::new().expect("temp dir");
        let path = root.path().join("acme.gen");
        fs::write(&path, b"SearchPath=<VEHDIR>\r\n").expect("write fixture");

        let err = write_text_file(&path, "SearchPath=\u{2603}").expect_err("unencodable");
        assert_eq!(err.code, CoreErrorCode::Parse);
        assert_eq!(
            read_text_file(&path).expect("still readable"),
            "SearchPath=<VEHDIR>\r\n"
        );

        write_text_file(&path, "SearchPath=<VEHDIR>/ACME\r\n").expect("write");
        assert_eq!(
            fs::read(&path).expect("read back"),
            b"SearchPath=<VEHDIR>/ACME\r\n"
        );
        assert_eq!(fs::read_dir(root.path()).expect("list").count(), 1);
    }

    #[test]
    fn binary_file_is_a_parse_error() {
        let root = TempDir::new().expect("temp dir");
        let path = root.path().join("acme.mas");
        fs::write(&path, b"GMOTOR_MAS\0\x02").expect("write fixture");
        assert_eq!(
            read_text_file(&path).expect_err("binary").code,
            CoreErrorCode::Parse
        );
        assert_eq!(
            read_text_file(&root.path().join("missing.gen"))
                .expect_err("missing")
                .code,
            CoreErrorCode::Io
        );
    }
}
