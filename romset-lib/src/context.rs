//! Run context: one DAT, one policy, one pass from catalog to placed files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use romset_core::{
    Candidate, Diagnostic, Resolution, ResolveOptions, UserPolicy, build_candidates, resolve,
};
use romset_dat::{DatFile, HeaderRules, parse_dat_file, parse_rules_file};

use crate::error::RunError;
use crate::identify::{self, ChecksumIndex, ScanOptions};
use crate::placement::{self, Plan, PlacementOptions};
use crate::settings;

/// Everything about a run that is not selection policy.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub dat: PathBuf,
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    /// Extension appended to candidate names for filename-only binding.
    pub extension: Option<String>,
    /// Identify files by content rather than by name.
    pub scan: bool,
    pub scan_options: ScanOptions,
    pub header_file: Option<PathBuf>,
    pub placement: PlacementOptions,
    /// Accept a DAT without parent/clone information.
    pub force: bool,
}

impl RunConfig {
    /// Reject flag combinations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<(), RunError> {
        if self.output_dir.is_some() && self.input_dir.is_none() {
            return Err(RunError::config("--output-dir requires --input-dir"));
        }
        if self.extension.is_some() && self.scan && self.input_dir.is_some() {
            return Err(RunError::config(
                "--extension only applies with --no-scan",
            ));
        }
        if self.placement.group_by_first_letter && self.output_dir.is_none() {
            return Err(RunError::config(
                "--group-by-first-letter requires --output-dir",
            ));
        }
        if self.scan_options.threads == 0 {
            return Err(RunError::config("thread count must be positive"));
        }
        if self.scan_options.max_file_size == Some(0) {
            return Err(RunError::config("max file size must be positive"));
        }
        Ok(())
    }

    fn scanning(&self) -> bool {
        self.scan && self.input_dir.is_some()
    }
}

/// State carried through one run.
pub struct RunContext {
    pub config: RunConfig,
    pub dat: DatFile,
    pub candidates: Vec<Candidate>,
    /// Catalog ROM name for each file identified by content.
    pub rom_names: HashMap<PathBuf, String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunContext {
    /// Parse and check the DAT, build candidates and resolve header rules.
    pub fn load(mut config: RunConfig) -> Result<Self, RunError> {
        config.validate()?;
        let dat = parse_dat_file(&config.dat)?;
        log::debug!(
            "{}: {} entries, version {}",
            dat.name,
            dat.games.len(),
            dat.version
        );

        if !dat.has_clones() {
            if !config.force {
                return Err(RunError::NoCloneData(config.dat.display().to_string()));
            }
            log::warn!(
                "{} has no clone information; every entry is its own group",
                config.dat.display()
            );
        }

        if config.scanning() {
            let missing = dat.roms_without_sha1();
            if missing > 0 {
                log::warn!("{missing} ROM entries have no SHA1 and will match by CRC32 and size");
            }
            if config.scan_options.rules.is_none() {
                config.scan_options.rules = load_header_rules(&config, &dat)?.map(Arc::new);
            }
        }

        let candidates = build_candidates(&dat.records())?;
        Ok(Self {
            config,
            dat,
            candidates,
            rom_names: HashMap::new(),
            diagnostics: Vec::new(),
        })
    }

    /// Bind files from the input directory to candidates, by content or
    /// by name. Does nothing without an input directory.
    pub async fn identify(
        &mut self,
        on_progress: impl FnMut(usize, usize),
    ) -> Result<(), RunError> {
        let Some(input) = self.config.input_dir.clone() else {
            return Ok(());
        };
        if !self.config.scan {
            identify::bind_by_name(
                &mut self.candidates,
                &input,
                self.config.extension.as_deref(),
            )?;
            return Ok(());
        }

        let index = Arc::new(ChecksumIndex::build(&self.candidates));
        if index.is_empty() {
            log::warn!("The DAT declares no checksums; no file can be identified");
        }
        let identities = identify::scan_directory(
            &input,
            index,
            self.config.scan_options.clone(),
            on_progress,
        )
        .await?;
        let binding = identify::bind_scanned(&mut self.candidates, identities);
        self.rom_names = binding.rom_names;
        self.diagnostics.extend(binding.diagnostics);
        Ok(())
    }

    /// Pick one winner per group. Once files have been looked for, only
    /// candidates with a file can win.
    pub fn resolve(&mut self, policy: &UserPolicy) -> Resolution {
        let options = ResolveOptions {
            require_binding: self.config.input_dir.is_some(),
        };
        let mut resolution = resolve(std::mem::take(&mut self.candidates), policy, options);
        let mut diagnostics = std::mem::take(&mut self.diagnostics);
        diagnostics.append(&mut resolution.diagnostics);
        resolution.diagnostics = diagnostics;
        resolution
    }

    /// File operations for the winners, empty without an output directory.
    pub fn plan(&self, resolution: &Resolution) -> Plan {
        match &self.config.output_dir {
            Some(output) => placement::plan(
                resolution.winners.values(),
                output,
                &self.rom_names,
                &self.config.placement,
            ),
            None => Plan::default(),
        }
    }
}

fn load_header_rules(config: &RunConfig, dat: &DatFile) -> Result<Option<HeaderRules>, RunError> {
    if let Some(path) = &config.header_file {
        if !path.is_file() {
            return Err(RunError::HeaderNotFound(path.display().to_string()));
        }
        return Ok(Some(parse_rules_file(path)?));
    }
    let Some(name) = dat.header.as_deref() else {
        return Ok(None);
    };
    let candidates = [
        settings::headers_dir().join(name),
        Path::new("headers").join(name),
    ];
    match candidates.iter().find(|p| p.is_file()) {
        Some(path) => {
            log::debug!("Using header rules from {}", path.display());
            Ok(Some(parse_rules_file(path)?))
        }
        None => {
            log::warn!("DAT references header {name:?}, which was not found; hashing whole files");
            Ok(None)
        }
    }
}
