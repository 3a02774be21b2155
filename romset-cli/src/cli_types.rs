//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "romset")]
#[command(about = "Build 1G1R ROM sets from No-Intro and Redump DATs", long_about = None)]
pub(crate) struct Cli {
    /// Only show warnings and errors (suppress normal output)
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Enable verbose/debug logging (timestamps + debug-level messages)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write log output to a file (ANSI codes stripped)
    #[arg(long, global = true)]
    pub logfile: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Select one ROM per game from a DAT and optionally copy it out
    Generate(Box<GenerateArgs>),

    /// Inspect the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show the resolved settings
    Show,

    /// Print the settings file path
    Path,

    /// Write a settings file with the current values if none exists
    Init,
}

/// Class exclusions. Each flag removes matching entries before selection.
#[derive(Args, Clone, Default)]
pub(crate) struct ExclusionArgs {
    /// Exclude BIOS entries
    #[arg(long)]
    pub no_bios: bool,
    /// Exclude programs and applications
    #[arg(long)]
    pub no_program: bool,
    /// Exclude enhancement chips
    #[arg(long)]
    pub no_enhancement_chip: bool,
    /// Exclude prototypes
    #[arg(long)]
    pub no_proto: bool,
    /// Exclude betas
    #[arg(long)]
    pub no_beta: bool,
    /// Exclude demos
    #[arg(long)]
    pub no_demo: bool,
    /// Exclude samples
    #[arg(long)]
    pub no_sample: bool,
    /// Exclude pirate dumps
    #[arg(long)]
    pub no_pirate: bool,
    /// Exclude bad dumps
    #[arg(long)]
    pub no_bad: bool,
    /// Exclude aftermarket releases
    #[arg(long)]
    pub no_aftermarket: bool,
    /// Exclude homebrew
    #[arg(long)]
    pub no_homebrew: bool,
    /// Exclude kiosk releases
    #[arg(long)]
    pub no_kiosk: bool,
    /// Exclude promotional releases
    #[arg(long)]
    pub no_promo: bool,
    /// Exclude debug builds
    #[arg(long)]
    pub no_debug: bool,
    /// All of the exclusions above
    #[arg(long)]
    pub no_all: bool,
    /// Exclude unlicensed entries, except aftermarket and homebrew
    #[arg(long)]
    pub no_unlicensed: bool,
    /// Exclude every unlicensed entry
    #[arg(long)]
    pub no_unlicensed_strict: bool,
}

#[derive(Args, Clone)]
pub(crate) struct GenerateArgs {
    /// DAT file (Logiqx XML or ClrMamePro)
    #[arg(short, long)]
    pub dat: PathBuf,

    /// Region codes in order of preference (e.g., USA,EUR,JPN)
    #[arg(short, long, value_delimiter = ',')]
    pub regions: Option<Vec<String>>,

    /// Language codes in order of preference (e.g., en,fr)
    #[arg(short, long, value_delimiter = ',')]
    pub languages: Option<Vec<String>>,

    /// Weight of the language list relative to its length
    #[arg(short = 'w', long)]
    pub language_weight: Option<u32>,

    /// Rank by languages before regions
    #[arg(long)]
    pub prioritize_languages: bool,

    #[command(flatten)]
    pub exclusions: ExclusionArgs,

    /// Accept any region when no listed region is available
    #[arg(long)]
    pub all_regions: bool,

    /// Like --all-regions, but only for entries in a listed language
    #[arg(long)]
    pub all_regions_with_lang: bool,

    /// Drop entries with no listed language
    #[arg(long)]
    pub only_selected_lang: bool,

    /// Prefer earlier revisions
    #[arg(long)]
    pub early_revisions: bool,

    /// Prefer earlier versions
    #[arg(long)]
    pub early_versions: bool,

    /// Prefer entries that appear earlier in the DAT
    #[arg(long)]
    pub input_order: bool,

    /// Prefer parents over clones
    #[arg(long)]
    pub prefer_parents: bool,

    /// Prefer pre-releases over final releases
    #[arg(long)]
    pub prefer_prereleases: bool,

    /// Extension of input files when matching by name (e.g., nes)
    #[arg(short, long)]
    pub extension: Option<String>,

    /// Match input files by name instead of by checksum
    #[arg(long)]
    pub no_scan: bool,

    /// Directory holding the ROM files
    #[arg(short, long)]
    pub input_dir: Option<PathBuf>,

    /// Directory to place the selected files in
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Prefer entries whose names contain these words (comma list or file:PATH)
    #[arg(long)]
    pub prefer: Option<String>,

    /// Deprioritize entries whose names contain these words
    #[arg(long)]
    pub avoid: Option<String>,

    /// Drop entries whose names contain these words
    #[arg(long)]
    pub exclude: Option<String>,

    /// Skip the whole game when its selected entry contains these words
    #[arg(long)]
    pub exclude_after: Option<String>,

    /// Separator for word lists
    #[arg(long)]
    pub separator: Option<String>,

    /// Match word lists case-insensitively
    #[arg(long)]
    pub ignore_case: bool,

    /// Treat word list entries as regular expressions
    #[arg(long)]
    pub regex: bool,

    /// Move files instead of copying
    #[arg(long, conflicts_with = "symlink")]
    pub r#move: bool,

    /// Link files instead of copying
    #[arg(long)]
    pub symlink: bool,

    /// Make links relative (with --symlink)
    #[arg(long, requires = "symlink")]
    pub relative: bool,

    /// Bytes read per hashing step (e.g., 32MiB)
    #[arg(long)]
    pub chunk_size: Option<String>,

    /// Number of files hashed concurrently
    #[arg(long)]
    pub threads: Option<usize>,

    /// Header detector XML used to strip headers before hashing
    #[arg(long)]
    pub header_file: Option<PathBuf>,

    /// Skip hashing files larger than this (e.g., 256MiB)
    #[arg(long)]
    pub max_file_size: Option<String>,

    /// Place files under a folder named after their first letter
    #[arg(long)]
    pub group_by_first_letter: bool,

    /// Accept a DAT without parent/clone information
    #[arg(long)]
    pub force: bool,
}
