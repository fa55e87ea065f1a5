//! # Fingerprint Module
//!
//! Content identity for duplicate detection.
//!
//! Every accepted file is read in full and digested with 128-bit XXH3.
//! There is no size pre-filter and no cache: the digest is recomputed on
//! every scan, so cost is O(total bytes) per run.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::time::SystemTime;
use xxhash_rust::xxh3::Xxh3;

const READ_BUFFER: usize = 64 * 1024;
const SNIFF_LEN: usize = 512;

/// Size, mtime and digest of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// 32 lower-case hex characters
    pub content_hash: String,
    pub size_bytes: u64,
    pub modified: SystemTime,
}

/// Stat and hash a file.
pub fn fingerprint_file(path: &Path) -> io::Result<Fingerprint> {
    let metadata = fs::metadata(path)?;
    let content_hash = hash_file(path)?;

    Ok(Fingerprint {
        content_hash,
        size_bytes: metadata.len(),
        modified: metadata.modified()?,
    })
}

/// Hash a file's entire byte stream.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    hash_reader(BufReader::with_capacity(READ_BUFFER, file))
}

/// Hash everything a reader yields.
pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Xxh3::new();
    let mut buffer = vec![0u8; READ_BUFFER];

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:032x}", hasher.digest128()))
}

/// Classify a file's MIME type.
///
/// The extension wins; otherwise the first bytes are sniffed for a known
/// image signature. Content that is readable but unrecognised is reported
/// as `application/octet-stream`; empty or unreadable files yield `None`.
pub fn detect_mime(path: &Path) -> Option<String> {
    if let Some(mime) = mime_guess::from_path(path).first() {
        return Some(mime.essence_str().to_string());
    }

    let mut file = File::open(path).ok()?;
    let mut head = [0u8; SNIFF_LEN];
    let read = read_prefix(&mut file, &mut head).ok()?;
    if read == 0 {
        return None;
    }

    Some(sniff_mime(&head[..read]).to_string())
}

/// MIME type from leading content bytes.
pub fn sniff_mime(head: &[u8]) -> &'static str {
    match image::guess_format(head) {
        Ok(format) => format.to_mime_type(),
        Err(_) => "application/octet-stream",
    }
}

fn read_prefix(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
