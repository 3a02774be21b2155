//! Content identification: bind physical files to catalog entries.
//!
//! Files are hashed concurrently on a [`WorkerPool`]; each result lands in
//! a write-once [`FileIdentityMap`]. Binding to candidates happens after
//! every scan has finished, in path order, so the outcome never depends on
//! which worker finished first.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use romset_core::{Candidate, Diagnostic};
use romset_dat::HeaderRules;

use crate::error::ScanIssue;
use crate::hasher::{self, FileHashes};
use crate::worker_pool::WorkerPool;

/// One ROM entry of one candidate, as indices into the candidate slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RomRef {
    pub candidate: usize,
    pub rom: usize,
}

/// Catalog checksums for fast lookups.
///
/// A ROM that declares a SHA1 is only ever matched by SHA1. A ROM without
/// one is matched by CRC32 together with its size.
#[derive(Debug, Default)]
pub struct ChecksumIndex {
    by_sha1: HashMap<String, Vec<RomRef>>,
    by_crc32: HashMap<(String, u64), Vec<RomRef>>,
}

impl ChecksumIndex {
    pub fn build(candidates: &[Candidate]) -> Self {
        let mut index = Self::default();
        let mut order: Vec<usize> = (0..candidates.len()).collect();
        order.sort_by_key(|&i| candidates[i].input_index);

        for ci in order {
            for (ri, rom) in candidates[ci].roms.iter().enumerate() {
                let rom_ref = RomRef {
                    candidate: ci,
                    rom: ri,
                };
                if let Some(sha1) = &rom.sha1 {
                    index
                        .by_sha1
                        .entry(sha1.to_ascii_lowercase())
                        .or_default()
                        .push(rom_ref);
                } else if let Some(crc) = &rom.crc32 {
                    index
                        .by_crc32
                        .entry((crc.to_ascii_lowercase(), rom.size))
                        .or_default()
                        .push(rom_ref);
                }
            }
        }
        index
    }

    pub fn is_empty(&self) -> bool {
        self.by_sha1.is_empty() && self.by_crc32.is_empty()
    }

    /// All catalog ROMs carrying this payload, in catalog order.
    pub fn lookup(&self, hashes: &FileHashes) -> Vec<RomRef> {
        let mut found: Vec<RomRef> = self
            .by_sha1
            .get(&hashes.sha1)
            .into_iter()
            .chain(
                self.by_crc32
                    .get(&(hashes.crc32.clone(), hashes.data_size)),
            )
            .flatten()
            .copied()
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }
}

/// What a scan learned about one file.
#[derive(Debug)]
pub enum FileIdentity {
    Matched(Vec<RomRef>),
    Unmatched,
    Skipped(ScanIssue),
}

/// Concurrent write-once map from file path to its identity.
#[derive(Debug, Default)]
pub struct FileIdentityMap {
    inner: Mutex<BTreeMap<PathBuf, FileIdentity>>,
}

impl FileIdentityMap {
    /// Record the identity of `path`. Returns false, leaving the first
    /// entry in place, when the path was already recorded.
    pub fn insert(&self, path: PathBuf, identity: FileIdentity) -> bool {
        // A poisoned lock still holds a consistent map: entries are only
        // ever added whole.
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if map.contains_key(&path) {
            return false;
        }
        map.insert(path, identity);
        true
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries in path order.
    pub fn into_entries(self) -> BTreeMap<PathBuf, FileIdentity> {
        self.inner.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    // Workers may still hold a handle for a moment after their last result
    // arrives, so the scan drains the map instead of unwrapping the Arc.
    fn take_entries(&self) -> BTreeMap<PathBuf, FileIdentity> {
        std::mem::take(&mut *self.inner.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl From<BTreeMap<PathBuf, FileIdentity>> for FileIdentityMap {
    fn from(entries: BTreeMap<PathBuf, FileIdentity>) -> Self {
        Self {
            inner: Mutex::new(entries),
        }
    }
}

/// Settings for a content scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub threads: usize,
    pub chunk_size: usize,
    /// Files above this size are not read.
    pub max_file_size: Option<u64>,
    pub rules: Option<Arc<HeaderRules>>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            threads: 4,
            chunk_size: hasher::DEFAULT_CHUNK_SIZE,
            max_file_size: None,
            rules: None,
        }
    }
}

/// Regular files under a directory tree, and the entries below the root
/// that could not be read.
#[derive(Debug, Default)]
pub struct Listing {
    /// Largest first, so long hashes start early.
    pub files: Vec<(PathBuf, u64)>,
    pub unreadable: Vec<(PathBuf, io::Error)>,
}

/// Recursively list regular files under `dir` with their sizes. Only a
/// failure to read `dir` itself is an error.
pub fn list_files(dir: &Path) -> io::Result<Listing> {
    let mut listing = Listing::default();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries = match fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(e) if current.as_path() == dir => return Err(e),
            Err(e) => {
                log::warn!("{}: {e}", current.display());
                listing.unreadable.push((current, e));
                continue;
            }
        };
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("{}: {e}", current.display());
                    listing.unreadable.push((current.clone(), e));
                    continue;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(e) => {
                    log::warn!("{}: {e}", path.display());
                    listing.unreadable.push((path, e));
                    continue;
                }
            };
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                match entry.metadata() {
                    Ok(meta) => listing.files.push((path, meta.len())),
                    Err(e) => {
                        log::warn!("{}: {e}", path.display());
                        listing.unreadable.push((path, e));
                    }
                }
            }
        }
    }
    listing
        .files
        .sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(listing)
}

fn scan_one(
    path: &Path,
    size: u64,
    index: &ChecksumIndex,
    options: &ScanOptions,
) -> FileIdentity {
    if options.max_file_size.is_some_and(|max| size > max) {
        return FileIdentity::Skipped(ScanIssue::Oversized { size });
    }
    match hasher::hash_file(path, options.rules.as_deref(), options.chunk_size) {
        Ok(hashes) => {
            let found = index.lookup(&hashes);
            if found.is_empty() {
                log::debug!(
                    "{}: crc {} sha1 {} not in catalog",
                    path.display(),
                    hashes.crc32,
                    hashes.sha1
                );
                FileIdentity::Unmatched
            } else {
                FileIdentity::Matched(found)
            }
        }
        Err(e) => FileIdentity::Skipped(ScanIssue::Io(e)),
    }
}

/// Run `scan` for `path`, turning a panic into a per-file failure so the
/// file still gets an outcome.
fn guarded(path: &Path, scan: impl FnOnce() -> FileIdentity) -> FileIdentity {
    panic::catch_unwind(AssertUnwindSafe(scan)).unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "worker panicked".into());
        log::warn!("{}: scan aborted: {reason}", path.display());
        FileIdentity::Skipped(ScanIssue::Aborted(reason))
    })
}

/// Hash every file under `dir` across `options.threads` workers.
///
/// `on_progress` runs on the calling task once per finished file with the
/// number of files done so far and the total.
pub async fn scan_directory(
    dir: &Path,
    index: Arc<ChecksumIndex>,
    options: ScanOptions,
    mut on_progress: impl FnMut(usize, usize),
) -> io::Result<FileIdentityMap> {
    let Listing { files, unreadable } = list_files(dir)?;
    let total = files.len();
    log::debug!("Scanning {} files with {} workers", total, options.threads);

    let identities = Arc::new(FileIdentityMap::default());
    for (path, e) in unreadable {
        identities.insert(path, FileIdentity::Skipped(ScanIssue::Io(e)));
    }
    let options = Arc::new(options);
    let sink = identities.clone();
    let mut pool = WorkerPool::start(options.threads, files, move |(path, size)| {
        let identity = guarded(&path, || scan_one(&path, size, &index, &options));
        sink.insert(path, identity)
    });

    let mut done = 0;
    while let Some(inserted) = pool.recv().await {
        if !inserted {
            log::debug!("File scanned twice; keeping the first result");
        }
        done += 1;
        on_progress(done, total);
    }
    drop(pool);

    Ok(FileIdentityMap::from(identities.take_entries()))
}

/// Files bound to candidates, with the catalog ROM name each one supplies.
#[derive(Debug, Default)]
pub struct Binding {
    pub rom_names: HashMap<PathBuf, String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Attach scanned files to `candidates`. The first file in path order
/// supplies a catalog ROM; a file matching several ROMs binds to the first
/// in catalog order.
pub fn bind_scanned(candidates: &mut [Candidate], identities: FileIdentityMap) -> Binding {
    let mut binding = Binding::default();
    let mut claimed: HashSet<RomRef> = HashSet::new();

    for (path, identity) in identities.into_entries() {
        match identity {
            FileIdentity::Matched(refs) => {
                let Some(&first) = refs.first() else {
                    continue;
                };
                if refs.len() > 1 {
                    binding.diagnostics.push(Diagnostic::AmbiguousFile {
                        path: path.clone(),
                        entries: refs.iter().map(|r| candidates[r.candidate].name.clone()).collect(),
                    });
                }
                let candidate = &mut candidates[first.candidate];
                let rom_name = candidate.roms[first.rom].name.clone();
                if !claimed.insert(first) {
                    binding.diagnostics.push(Diagnostic::DuplicateFile {
                        path,
                        entry: rom_name,
                    });
                    continue;
                }
                candidate.files.push(path.clone());
                binding.rom_names.insert(path, rom_name);
            }
            FileIdentity::Unmatched => {
                binding.diagnostics.push(Diagnostic::UnmatchedFile { path });
            }
            FileIdentity::Skipped(ScanIssue::Oversized { size }) => {
                binding.diagnostics.push(Diagnostic::OversizedFile { path, size });
            }
            FileIdentity::Skipped(issue) => {
                binding.diagnostics.push(Diagnostic::ScanFailed {
                    path,
                    reason: issue.to_string(),
                });
            }
        }
    }

    for candidate in candidates.iter().filter(|c| c.is_bound()) {
        if candidate.files.len() < candidate.roms.len() {
            log::debug!(
                "{}: {} of {} files found",
                candidate.name,
                candidate.files.len(),
                candidate.roms.len()
            );
        }
    }
    binding
}

/// Bind candidates by file name: `input_dir/<name>[.<extension>]` when that
/// file exists, otherwise the files of an `input_dir/<name>/` directory.
pub fn bind_by_name(
    candidates: &mut [Candidate],
    input_dir: &Path,
    extension: Option<&str>,
) -> io::Result<()> {
    for candidate in candidates.iter_mut() {
        let file_name = match extension {
            Some(ext) => format!("{}.{}", candidate.name, ext.trim_start_matches('.')),
            None => candidate.name.clone(),
        };
        let file = input_dir.join(&file_name);
        if file.is_file() {
            candidate.files.push(file);
            continue;
        }

        let folder = input_dir.join(&candidate.name);
        if !folder.is_dir() {
            continue;
        }
        let declared: Vec<PathBuf> = candidate
            .roms
            .iter()
            .map(|rom| folder.join(&rom.name))
            .filter(|p| p.is_file())
            .collect();
        if !declared.is_empty() {
            candidate.files = declared;
            continue;
        }
        let mut found: Vec<PathBuf> = fs::read_dir(&folder)?
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        found.sort();
        candidate.files = found;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use romset_core::{CatalogRecord, RomEntry, build_candidates};
    use sha1::Digest;

    fn sha1_hex(data: &[u8]) -> String {
        format!("{:x}", sha1::Sha1::digest(data))
    }

    fn crc_hex(data: &[u8]) -> String {
        format!("{:08x}", crc32fast::hash(data))
    }

    fn rom(name: &str, data: &[u8], with_sha1: bool) -> RomEntry {
        RomEntry {
            name: name.into(),
            size: data.len() as u64,
            crc32: Some(crc_hex(data).to_uppercase()),
            sha1: with_sha1.then(|| sha1_hex(data)),
        }
    }

    fn catalog(entries: Vec<(&str, Vec<RomEntry>)>) -> Vec<Candidate> {
        let records: Vec<CatalogRecord> = entries
            .into_iter()
            .map(|(name, roms)| CatalogRecord {
                name: name.into(),
                roms,
                ..Default::default()
            })
            .collect();
        build_candidates(&records).unwrap()
    }

    fn hashes(data: &[u8]) -> FileHashes {
        FileHashes {
            crc32: crc_hex(data),
            sha1: sha1_hex(data),
            data_size: data.len() as u64,
        }
    }

    #[test]
    fn test_sha1_entries_ignore_crc() {
        let candidates = catalog(vec![("A (USA)", vec![rom("a.bin", b"alpha", true)])]);
        let index = ChecksumIndex::build(&candidates);
        assert_eq!(index.lookup(&hashes(b"alpha")), vec![RomRef { candidate: 0, rom: 0 }]);

        // Same CRC and size with a different SHA1 is not a match.
        let mut forged = hashes(b"alpha");
        forged.sha1 = sha1_hex(b"other");
        assert!(index.lookup(&forged).is_empty());
    }

    #[test]
    fn test_crc_entries_need_matching_size() {
        let candidates = catalog(vec![("A (USA)", vec![rom("a.bin", b"alpha", false)])]);
        let index = ChecksumIndex::build(&candidates);
        assert_eq!(index.lookup(&hashes(b"alpha")).len(), 1);

        let mut wrong_size = hashes(b"alpha");
        wrong_size.data_size += 1;
        assert!(index.lookup(&wrong_size).is_empty());
    }

    #[test]
    fn test_write_once_map() {
        let map = FileIdentityMap::default();
        assert!(map.insert("a".into(), FileIdentity::Unmatched));
        assert!(!map.insert("a".into(), FileIdentity::Matched(vec![])));
        assert_eq!(map.len(), 1);
        assert!(matches!(
            map.into_entries().remove(Path::new("a")),
            Some(FileIdentity::Unmatched)
        ));
    }

    #[test]
    fn test_ambiguous_payload_binds_first_in_catalog_order() {
        let mut candidates = catalog(vec![
            ("A (USA)", vec![rom("a.bin", b"same", true)]),
            ("A (Europe)", vec![rom("a.bin", b"same", true)]),
        ]);
        let index = ChecksumIndex::build(&candidates);
        let map = FileIdentityMap::default();
        map.insert("x.bin".into(), FileIdentity::Matched(index.lookup(&hashes(b"same"))));

        let binding = bind_scanned(&mut candidates, map);
        assert_eq!(candidates[0].files, vec![PathBuf::from("x.bin")]);
        assert!(candidates[1].files.is_empty());
        assert!(matches!(
            binding.diagnostics.as_slice(),
            [Diagnostic::AmbiguousFile { entries, .. }] if entries.len() == 2
        ));
    }

    #[test]
    fn test_duplicate_files_bind_first_path() {
        let mut candidates = catalog(vec![("A (USA)", vec![rom("a.bin", b"alpha", true)])]);
        let map = FileIdentityMap::default();
        let hit = || FileIdentity::Matched(vec![RomRef { candidate: 0, rom: 0 }]);
        map.insert("z/copy.bin".into(), hit());
        map.insert("a/orig.bin".into(), hit());

        let binding = bind_scanned(&mut candidates, map);
        assert_eq!(candidates[0].files, vec![PathBuf::from("a/orig.bin")]);
        assert_eq!(binding.rom_names[Path::new("a/orig.bin")], "a.bin");
        assert_eq!(
            binding.diagnostics,
            vec![Diagnostic::DuplicateFile {
                path: "z/copy.bin".into(),
                entry: "a.bin".into(),
            }]
        );
    }

    #[test]
    fn test_bind_by_name_file_and_folder() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("A (USA).nes"), b"a").unwrap();
        fs::create_dir(dir.path().join("B (USA)")).unwrap();
        fs::write(dir.path().join("B (USA)").join("b1.bin"), b"1").unwrap();
        fs::write(dir.path().join("B (USA)").join("b2.bin"), b"2").unwrap();

        let mut candidates = catalog(vec![
            ("A (USA)", vec![]),
            ("B (USA)", vec![rom("b1.bin", b"1", true), rom("b2.bin", b"2", true)]),
            ("C (USA)", vec![]),
        ]);
        bind_by_name(&mut candidates, dir.path(), Some("nes")).unwrap();
        assert_eq!(candidates[0].files, vec![dir.path().join("A (USA).nes")]);
        assert_eq!(candidates[1].files.len(), 2);
        assert!(!candidates[2].is_bound());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_scan_directory_reports_every_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("known.bin"), b"alpha").unwrap();
        fs::write(dir.path().join("stranger.bin"), b"who am i").unwrap();
        fs::write(dir.path().join("huge.bin"), vec![0u8; 64]).unwrap();

        let mut candidates = catalog(vec![("A (USA)", vec![rom("a.bin", b"alpha", true)])]);
        let index = Arc::new(ChecksumIndex::build(&candidates));
        let options = ScanOptions {
            threads: 2,
            chunk_size: 4,
            max_file_size: Some(32),
            rules: None,
        };
        let mut seen = 0;
        let map = scan_directory(dir.path(), index, options, |done, total| {
            seen = done;
            assert_eq!(total, 3);
        })
        .await
        .unwrap();
        assert_eq!(seen, 3);

        let binding = bind_scanned(&mut candidates, map);
        assert_eq!(candidates[0].files, vec![dir.path().join("sub").join("known.bin")]);
        let summary = romset_core::Summary::from_events(&binding.diagnostics);
        assert_eq!(summary.files_unmatched, 1);
        assert_eq!(summary.files_oversized, 1);
    }

    #[test]
    fn test_panicking_scan_still_reports_file() {
        let identity = guarded(Path::new("bad.bin"), || panic!("offset out of range"));
        assert!(matches!(
            &identity,
            FileIdentity::Skipped(ScanIssue::Aborted(reason)) if reason == "offset out of range"
        ));

        let mut candidates = catalog(vec![("A (USA)", vec![rom("a.bin", b"alpha", true)])]);
        let map = FileIdentityMap::default();
        map.insert("bad.bin".into(), identity);
        let binding = bind_scanned(&mut candidates, map);
        assert!(matches!(
            binding.diagnostics.as_slice(),
            [Diagnostic::ScanFailed { path, .. }] if path == Path::new("bad.bin")
        ));
    }

    #[tokio::test]
    async fn test_far_detector_offset_is_scanned() {
        use romset_dat::{HeaderRule, RuleTest};

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("game.nes"), b"NES\x1adata").unwrap();
        let rules = HeaderRules {
            name: "far".into(),
            rules: vec![HeaderRule {
                tests: vec![RuleTest::Data {
                    offset: u64::MAX,
                    value: vec![0x4E, 0x45],
                    result: true,
                }],
                ..Default::default()
            }],
        };
        let mut candidates = catalog(vec![("A (USA)", vec![rom("a.bin", b"alpha", true)])]);
        let index = Arc::new(ChecksumIndex::build(&candidates));
        let options = ScanOptions {
            rules: Some(Arc::new(rules)),
            ..Default::default()
        };
        let mut seen = 0;
        let map = scan_directory(dir.path(), index, options, |done, _| seen = done)
            .await
            .unwrap();
        assert_eq!(seen, 1);

        let binding = bind_scanned(&mut candidates, map);
        let summary = romset_core::Summary::from_events(&binding.diagnostics);
        assert_eq!(summary.files_unmatched, 1);
        assert_eq!(summary.files_failed, 0);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_files(&dir.path().join("absent")).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_subdirectory_is_reported() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("hidden.bin"), b"x").unwrap();
        fs::write(dir.path().join("open.bin"), b"y").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // Privileged users read through the mode bits.
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let listing = list_files(dir.path()).unwrap();
        assert_eq!(listing.files.len(), 1);
        assert_eq!(listing.unreadable.len(), 1);
        assert_eq!(listing.unreadable[0].0, locked);

        let mut candidates = catalog(vec![("A (USA)", vec![rom("a.bin", b"alpha", true)])]);
        let index = Arc::new(ChecksumIndex::build(&candidates));
        let map = scan_directory(dir.path(), index, ScanOptions::default(), |_, _| {})
            .await
            .unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let binding = bind_scanned(&mut candidates, map);
        let summary = romset_core::Summary::from_events(&binding.diagnostics);
        assert_eq!(summary.files_failed, 1);
        assert_eq!(summary.files_unmatched, 1);
    }
}
