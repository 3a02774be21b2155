//! Header-aware checksums of a file's payload.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use sha1::Digest;

use romset_dat::{HeaderRules, Operation};

/// Default read size for one hashing step.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Hash results for a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHashes {
    /// Lowercase hex.
    pub crc32: String,
    /// Lowercase hex.
    pub sha1: String,
    /// Size of the data that was hashed (after header stripping)
    pub data_size: u64,
}

/// Round a requested chunk size up to a whole number of 32-bit units so
/// byte-order transforms never straddle two reads.
pub fn align_chunk_size(requested: usize) -> usize {
    requested.max(4).div_ceil(4) * 4
}

/// Compute CRC32 and SHA1 of the payload of `reader` in a single pass.
///
/// When `rules` select a header rule, only the rule's range is hashed and
/// the rule's operation is applied to each chunk before hashing.
pub fn compute_hashes<R: Read + Seek>(
    reader: &mut R,
    rules: Option<&HeaderRules>,
    chunk_size: usize,
) -> io::Result<FileHashes> {
    let file_size = reader.seek(SeekFrom::End(0))?;
    let (start, end, operation) = match rules.filter(|r| !r.is_empty()) {
        Some(rules) => {
            let probe = rules.probe_len().min(file_size);
            let mut head = vec![0u8; probe as usize];
            reader.seek(SeekFrom::Start(0))?;
            reader.read_exact(&mut head)?;
            match rules.select(&head, file_size) {
                Some(rule) => {
                    let (start, end) = rule.span(file_size);
                    (start, end, rule.operation)
                }
                None => (0, file_size, Operation::None),
            }
        }
        None => (0, file_size, Operation::None),
    };
    reader.seek(SeekFrom::Start(start))?;

    let data_size = end - start;
    let mut crc = crc32fast::Hasher::new();
    let mut sha = sha1::Sha1::new();
    let mut buf = vec![0u8; align_chunk_size(chunk_size)];
    let mut remaining = data_size;

    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        read_full(reader, &mut buf[..want])?;
        operation.apply(&mut buf[..want]);
        crc.update(&buf[..want]);
        sha.update(&buf[..want]);
        remaining -= want as u64;
    }

    Ok(FileHashes {
        crc32: format!("{:08x}", crc.finalize()),
        sha1: format!("{:x}", sha.finalize()),
        data_size,
    })
}

/// Open `path` and hash it with [`compute_hashes`].
pub fn hash_file(
    path: &Path,
    rules: Option<&HeaderRules>,
    chunk_size: usize,
) -> io::Result<FileHashes> {
    let mut reader = BufReader::new(File::open(path)?);
    compute_hashes(&mut reader, rules, chunk_size)
}

// `read_exact` on a short read leaves the buffer unspecified; a file that
// shrinks mid-scan is reported as an error instead.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => io::Error::new(e.kind(), "file changed while hashing"),
        _ => e,
    })
}
