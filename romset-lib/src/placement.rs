//! Placing winners: copy, move or link their files into the output tree,
//! or list them when there is no output directory.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use romset_core::Candidate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaceMode {
    #[default]
    Copy,
    Move,
    Symlink {
        relative: bool,
    },
}

#[derive(Debug, Clone, Default)]
pub struct PlacementOptions {
    pub mode: PlaceMode,
    /// Place each winner under `output/<first letter>/`.
    pub group_by_first_letter: bool,
}

/// One file operation of a placement plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub source: PathBuf,
    pub dest: PathBuf,
}

/// A file that cannot be placed because its catalog name points outside
/// the output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFile {
    pub source: PathBuf,
    pub name: String,
}

/// Placement plan for a set of winners.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub files: Vec<PlannedFile>,
    pub rejected: Vec<RejectedFile>,
}

/// Bucket directory for `name`: its lower-cased first letter when that is
/// an ASCII letter, otherwise `#`.
pub fn first_letter_dir(name: &str) -> String {
    match name.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => c.to_ascii_lowercase().to_string(),
        _ => "#".to_string(),
    }
}

/// Final component of a catalog name, or `None` when the name is absolute
/// or climbs out of its directory.
fn contained_name(name: &str) -> Option<&OsStr> {
    let path = Path::new(name);
    if path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }
    path.file_name()
}

/// Destination paths for every bound file of `winners`.
///
/// Files identified by content take their catalog ROM name from
/// `rom_names`; files bound by name keep their own file name. A winner
/// with several files gets its own folder. Catalog names that would leave
/// `output` are rejected.
pub fn plan<'a>(
    winners: impl IntoIterator<Item = &'a Candidate>,
    output: &Path,
    rom_names: &HashMap<PathBuf, String>,
    options: &PlacementOptions,
) -> Plan {
    let mut plan = Plan::default();
    for winner in winners {
        let mut root = output.to_path_buf();
        if options.group_by_first_letter {
            root.push(first_letter_dir(&winner.name));
        }
        if winner.files.len() > 1 {
            match contained_name(&winner.name) {
                Some(folder) => root.push(folder),
                None => {
                    plan.rejected.extend(winner.files.iter().map(|source| RejectedFile {
                        source: source.clone(),
                        name: winner.name.clone(),
                    }));
                    continue;
                }
            }
        }
        for source in &winner.files {
            let file_name = match rom_names.get(source) {
                Some(name) => match contained_name(name) {
                    Some(name) => name,
                    None => {
                        plan.rejected.push(RejectedFile {
                            source: source.clone(),
                            name: name.clone(),
                        });
                        continue;
                    }
                },
                None => match source.file_name() {
                    Some(name) => name,
                    None => continue,
                },
            };
            plan.files.push(PlannedFile {
                source: source.clone(),
                dest: root.join(file_name),
            });
        }
    }
    plan
}

/// Carry out one planned operation, creating parent directories as needed.
pub fn place(file: &PlannedFile, mode: PlaceMode) -> io::Result<()> {
    if let Some(parent) = file.dest.parent() {
        fs::create_dir_all(parent)?;
    }
    match mode {
        PlaceMode::Copy => fs::copy(&file.source, &file.dest).map(|_| ()),
        PlaceMode::Move => match fs::rename(&file.source, &file.dest) {
            Ok(()) => Ok(()),
            // Rename fails across filesystems.
            Err(_) => {
                fs::copy(&file.source, &file.dest)?;
                fs::remove_file(&file.source)
            }
        },
        PlaceMode::Symlink { relative } => {
            let source = fs::canonicalize(&file.source)?;
            let target = if relative {
                let dest_dir = match file.dest.parent() {
                    Some(parent) => fs::canonicalize(parent)?,
                    None => std::env::current_dir()?,
                };
                pathdiff::diff_paths(&source, &dest_dir).unwrap_or(source)
            } else {
                source
            };
            if file.dest.symlink_metadata().is_ok() {
                fs::remove_file(&file.dest)?;
            }
            symlink(&target, &file.dest)
        }
    }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

/// Lines describing `winners` for print-only runs, sorted
/// case-insensitively. Bound files are shown relative to `input_dir`;
/// unbound winners as `name[.extension]`.
pub fn listing<'a>(
    winners: impl IntoIterator<Item = &'a Candidate>,
    input_dir: Option<&Path>,
    extension: Option<&str>,
) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for winner in winners {
        if winner.files.is_empty() {
            lines.push(match extension {
                Some(ext) => format!("{}.{}", winner.name, ext.trim_start_matches('.')),
                None => winner.name.clone(),
            });
            continue;
        }
        for file in &winner.files {
            let shown = input_dir
                .and_then(|dir| pathdiff::diff_paths(file, dir))
                .unwrap_or_else(|| file.clone());
            lines.push(shown.display().to_string());
        }
    }
    lines.sort_by_cached_key(|l| l.to_lowercase());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use romset_core::{CatalogRecord, extract};

    fn winner(name: &str, files: &[&Path]) -> Candidate {
        let mut c = extract(
            &CatalogRecord {
                name: name.into(),
                ..Default::default()
            },
            0,
        );
        c.files = files.iter().map(|p| p.to_path_buf()).collect();
        c
    }

    #[test]
    fn test_first_letter_dir() {
        assert_eq!(first_letter_dir("Zelda"), "z");
        assert_eq!(first_letter_dir("007 Racing"), "#");
        assert_eq!(first_letter_dir("\u{c9}lan"), "#");
        assert_eq!(first_letter_dir(""), "#");
    }

    #[test]
    fn test_plan_layout() {
        let single = winner("Alpha (USA)", &[Path::new("/in/a.bin")]);
        let multi = winner("Beta (USA)", &[Path::new("/in/b1.bin"), Path::new("/in/b2.bin")]);
        let mut names = HashMap::new();
        names.insert(PathBuf::from("/in/a.bin"), "Alpha (USA).nes".to_string());

        let opts = PlacementOptions {
            group_by_first_letter: true,
            ..Default::default()
        };
        let planned = plan([&single, &multi], Path::new("/out"), &names, &opts);
        assert!(planned.rejected.is_empty());
        assert_eq!(
            planned.files,
            vec![
                PlannedFile {
                    source: "/in/a.bin".into(),
                    dest: "/out/a/Alpha (USA).nes".into(),
                },
                PlannedFile {
                    source: "/in/b1.bin".into(),
                    dest: "/out/b/Beta (USA)/b1.bin".into(),
                },
                PlannedFile {
                    source: "/in/b2.bin".into(),
                    dest: "/out/b/Beta (USA)/b2.bin".into(),
                },
            ]
        );
    }

    #[test]
    fn test_plan_rejects_names_leaving_output() {
        let climbing = winner("Alpha (USA)", &[Path::new("/in/a.bin")]);
        let absolute = winner("Beta (USA)", &[Path::new("/in/b.bin")]);
        let nested = winner("Gamma (USA)", &[Path::new("/in/c.bin")]);
        let bad_folder = winner("..", &[Path::new("/in/d1.bin"), Path::new("/in/d2.bin")]);
        let mut names = HashMap::new();
        names.insert(PathBuf::from("/in/a.bin"), "../../escaped.bin".to_string());
        names.insert(PathBuf::from("/in/b.bin"), "/etc/escaped.bin".to_string());
        names.insert(PathBuf::from("/in/c.bin"), "disc/track 01.bin".to_string());

        let planned = plan(
            [&climbing, &absolute, &nested, &bad_folder],
            Path::new("/out"),
            &names,
            &PlacementOptions::default(),
        );
        assert_eq!(
            planned.files,
            vec![PlannedFile {
                source: "/in/c.bin".into(),
                dest: "/out/track 01.bin".into(),
            }]
        );
        let rejected: Vec<&str> = planned.rejected.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(rejected, vec!["../../escaped.bin", "/etc/escaped.bin", "..", ".."]);
        assert!(planned.files.iter().all(|f| f.dest.starts_with("/out")));
    }

    #[test]
    fn test_copy_and_move() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.bin");
        fs::write(&src, b"data").unwrap();

        let copy = PlannedFile {
            source: src.clone(),
            dest: dir.path().join("out").join("copy.bin"),
        };
        place(&copy, PlaceMode::Copy).unwrap();
        assert_eq!(fs::read(&copy.dest).unwrap(), b"data");
        assert!(src.exists());

        let moved = PlannedFile {
            source: src.clone(),
            dest: dir.path().join("out").join("moved.bin"),
        };
        place(&moved, PlaceMode::Move).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read(&moved.dest).unwrap(), b"data");
    }

    #[cfg(unix)]
    #[test]
    fn test_relative_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in").join("a.bin");
        fs::create_dir_all(src.parent().unwrap()).unwrap();
        fs::write(&src, b"data").unwrap();

        let link = PlannedFile {
            source: src,
            dest: dir.path().join("out").join("a.bin"),
        };
        place(&link, PlaceMode::Symlink { relative: true }).unwrap();
        assert_eq!(
            fs::read_link(&link.dest).unwrap(),
            PathBuf::from("../in/a.bin")
        );
        assert_eq!(fs::read(&link.dest).unwrap(), b"data");
    }

    #[test]
    fn test_listing_sorted_case_insensitively() {
        let a = winner("beta", &[]);
        let b = winner("Alpha", &[]);
        let c = winner("gamma", &[Path::new("/in/sub/Gamma.bin")]);
        assert_eq!(
            listing([&a, &b, &c], Some(Path::new("/in")), Some("nes")),
            vec!["Alpha.nes", "beta.nes", "sub/Gamma.bin"]
        );
    }
}
