// File Operations for signing and verification
// Scoped open/read/write with not-found / in-use classification

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::signed_file::{decode, encode, DecodedSignedFile};
use crate::error::{Error, Result};
use crate::rsa::bigint::RsaBigInt;

/// Buffer size for streaming copies
pub const IO_BUFFER_SIZE: usize = 8192;

/// Open an existing file for reading
pub fn open_for_read(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| Error::from_io(e, path))
}

/// Create a temporary file next to `destination`, removed on drop unless persisted
pub fn create_sibling_temp(destination: &Path) -> Result<NamedTempFile> {
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    NamedTempFile::new_in(dir).map_err(|e| Error::from_io(e, dir))
}

/// Get file size in bytes
pub fn get_file_size(path: &Path) -> Result<u64> {
    let metadata = fs::metadata(path).map_err(|e| Error::from_io(e, path))?;
    Ok(metadata.len())
}

/// Format file size for display
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Default destination for a signed copy of `original`: `<stem>.signed.txt`
/// in the same directory
pub fn default_signed_path(original: &Path) -> PathBuf {
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "message".to_string());
    original.with_file_name(format!("{}.signed.txt", stem))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Write `original` followed by the delimiter and `signature` to `destination`.
///
/// The copy is staged in a temporary file and renamed over `destination`
/// only once fully written, so a failure leaves `destination` untouched.
/// Returns the number of bytes written.
pub fn save_signed_message(
    original: &Path,
    destination: &Path,
    signature: &RsaBigInt,
) -> Result<u64> {
    if same_file(original, destination) {
        return Err(Error::InvalidArgument(format!(
            "refusing to overwrite the original file {}",
            original.display()
        )));
    }

    let mut reader = BufReader::with_capacity(IO_BUFFER_SIZE, open_for_read(original)?);
    let mut writer = BufWriter::with_capacity(IO_BUFFER_SIZE, create_sibling_temp(destination)?);

    let written = encode(&mut reader, &mut writer, signature)?;
    let staged = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    staged
        .persist(destination)
        .map_err(|e| Error::from_io(e.error, destination))?;
    tracing::info!(
        path = %destination.display(),
        size = %format_file_size(written),
        "saved signed message"
    );

    Ok(written)
}

/// Open a signed message and split it into content hash and signature
pub fn load_signed_message(
    path: &Path,
    modulus: &RsaBigInt,
    tail_window: usize,
) -> Result<DecodedSignedFile> {
    let mut file = open_for_read(path)?;
    decode(&mut file, modulus, tail_window)
}
