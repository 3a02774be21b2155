use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use romset_core::util::{format_bytes, parse_size};
use romset_core::{
    Diagnostic, Exclusions, ListOptions, PolicyOptions, Resolution, Summary, UnlicensedFilter,
    UserPolicy,
};
use romset_lib::placement::{self, PlaceMode, PlacementOptions};
use romset_lib::settings::{self, Settings};
use romset_lib::{RunConfig, RunContext, ScanOptions};

use crate::cli_types::{ExclusionArgs, GenerateArgs};
use crate::error::CliError;

fn exclusions(args: &ExclusionArgs) -> Exclusions {
    let mut ex = if args.no_all {
        Exclusions::all()
    } else {
        Exclusions::default()
    };
    ex.bios |= args.no_bios;
    ex.program |= args.no_program;
    ex.enhancement_chip |= args.no_enhancement_chip;
    ex.proto |= args.no_proto;
    ex.beta |= args.no_beta;
    ex.demo |= args.no_demo;
    ex.sample |= args.no_sample;
    ex.pirate |= args.no_pirate;
    ex.bad |= args.no_bad;
    ex.aftermarket |= args.no_aftermarket;
    ex.homebrew |= args.no_homebrew;
    ex.kiosk |= args.no_kiosk;
    ex.promo |= args.no_promo;
    ex.debug |= args.no_debug;
    ex.unlicensed = if args.no_unlicensed_strict {
        UnlicensedFilter::DropStrict
    } else if args.no_unlicensed {
        UnlicensedFilter::Drop
    } else {
        UnlicensedFilter::Keep
    };
    ex
}

/// Flags first, then `settings.toml`, then built-in defaults.
fn policy_options(args: &GenerateArgs, settings: &Settings) -> PolicyOptions {
    let defaults = &settings.defaults;
    let mut list_options = ListOptions::new();
    if let Some(sep) = args.separator.clone().or_else(|| defaults.separator.clone()) {
        list_options.separator = sep;
    }
    list_options.ignore_case = args.ignore_case;
    list_options.regex = args.regex;

    let base = PolicyOptions::default();
    PolicyOptions {
        regions: args.regions.clone().unwrap_or_else(|| defaults.regions.clone()),
        languages: args
            .languages
            .clone()
            .unwrap_or_else(|| defaults.languages.clone()),
        language_weight: args
            .language_weight
            .or(defaults.language_weight)
            .unwrap_or(base.language_weight),
        prioritize_languages: args.prioritize_languages,
        exclusions: exclusions(&args.exclusions),
        all_regions: args.all_regions,
        all_regions_with_lang: args.all_regions_with_lang,
        only_selected_lang: args.only_selected_lang,
        early_revisions: args.early_revisions,
        early_versions: args.early_versions,
        input_order: args.input_order,
        prefer_parents: args.prefer_parents,
        prefer_prereleases: args.prefer_prereleases,
        prefer: args.prefer.clone(),
        avoid: args.avoid.clone(),
        exclude: args.exclude.clone(),
        exclude_after: args.exclude_after.clone(),
        list_options,
    }
}

fn size_flag(flag: &str, value: Option<&str>, fallback: u64) -> Result<u64, CliError> {
    match value {
        None => Ok(fallback),
        Some(text) => parse_size(text)
            .ok_or_else(|| CliError::config(format!("{flag}: {text:?} is not a size"))),
    }
}

fn run_config(args: &GenerateArgs, settings: &Settings) -> Result<RunConfig, CliError> {
    let chunk_size = size_flag(
        "--chunk-size",
        args.chunk_size.as_deref(),
        settings.chunk_size(),
    )?;
    let max_file_size = size_flag(
        "--max-file-size",
        args.max_file_size.as_deref(),
        settings.max_file_size(),
    )?;
    let mode = if args.r#move {
        PlaceMode::Move
    } else if args.symlink {
        PlaceMode::Symlink {
            relative: args.relative,
        }
    } else {
        PlaceMode::Copy
    };

    Ok(RunConfig {
        dat: args.dat.clone(),
        input_dir: args.input_dir.clone(),
        output_dir: args.output_dir.clone(),
        extension: args.extension.clone(),
        scan: !args.no_scan,
        scan_options: ScanOptions {
            threads: args.threads.unwrap_or_else(|| settings.threads()),
            chunk_size: usize::try_from(chunk_size)
                .map_err(|_| CliError::config("--chunk-size is too large"))?,
            max_file_size: Some(max_file_size),
            rules: None,
        },
        header_file: args.header_file.clone(),
        placement: PlacementOptions {
            mode,
            group_by_first_letter: args.group_by_first_letter,
        },
        force: args.force,
    })
}

pub(crate) fn run_generate(args: &GenerateArgs, quiet: bool) -> Result<(), CliError> {
    let settings = settings::load_settings();
    let policy = UserPolicy::new(policy_options(args, &settings))?;
    let config = run_config(args, &settings)?;

    let mut ctx = RunContext::load(config)?;
    log::info!(
        "{} {} ({} entries)",
        "DAT:".if_supports_color(Stdout, |t| t.bold()),
        ctx.dat.name,
        ctx.candidates.len()
    );

    if ctx.config.input_dir.is_some() {
        let pb = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new(0);
            pb.set_style(
                ProgressStyle::with_template("  {spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                    .expect("static pattern")
                    .progress_chars("=> ")
                    .tick_chars("/-\\|"),
            );
            pb.set_message(if ctx.config.scan { "Hashing" } else { "Matching names" });
            pb
        };

        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| CliError::runtime(format!("Failed to create tokio runtime: {e}")))?;
        rt.block_on(ctx.identify(|done, total| {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
        }))?;
        pb.finish_and_clear();
    }

    let resolution = ctx.resolve(&policy);
    report_diagnostics(&resolution.diagnostics);

    if ctx.config.output_dir.is_some() {
        place_winners(&ctx, &resolution, quiet);
    } else {
        print_winners(&ctx, &resolution, args.extension.as_deref());
    }

    print_summary(&resolution);
    Ok(())
}

fn report_diagnostics(diagnostics: &[Diagnostic]) {
    for event in diagnostics {
        if event.is_verbose() {
            log::debug!("{event}");
        } else {
            log::info!(
                "  {} {event}",
                "\u{26A0}".if_supports_color(Stdout, |t| t.yellow())
            );
        }
    }
}

fn print_winners(ctx: &RunContext, resolution: &Resolution, extension: Option<&str>) {
    let lines = placement::listing(
        resolution.winners.values(),
        ctx.config.input_dir.as_deref(),
        extension,
    );
    for line in &lines {
        log::info!("{line}");
    }
}

fn place_winners(ctx: &RunContext, resolution: &Resolution, quiet: bool) {
    let plan = ctx.plan(resolution);
    for rejected in &plan.rejected {
        log::warn!(
            "{}: catalog name {:?} leaves the output directory",
            rejected.source.display(),
            rejected.name
        );
    }
    let planned = plan.files;
    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(planned.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("  [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
                .expect("static pattern")
                .progress_chars("=> "),
        );
        pb
    };

    let mut failed = plan.rejected.len();
    for file in &planned {
        if let Some(name) = file.dest.file_name() {
            pb.set_message(name.to_string_lossy().into_owned());
        }
        if let Err(e) = placement::place(file, ctx.config.placement.mode) {
            failed += 1;
            pb.suspend(|| {
                log::warn!("{} -> {}: {e}", file.source.display(), file.dest.display());
            });
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let verb = match ctx.config.placement.mode {
        PlaceMode::Copy => "Copied",
        PlaceMode::Move => "Moved",
        PlaceMode::Symlink { .. } => "Linked",
    };
    log::info!(
        "{} {} files",
        verb.if_supports_color(Stdout, |t| t.green()),
        planned.len() + plan.rejected.len() - failed
    );
    if failed > 0 {
        log::warn!("{failed} files could not be placed");
    }
}

fn print_summary(resolution: &Resolution) {
    let total: u64 = resolution
        .winners
        .values()
        .map(|c| c.declared_size())
        .sum();
    crate::logging::blank();
    log::info!(
        "{} {} games, {}",
        "Selected".if_supports_color(Stdout, |t| t.bold()),
        resolution.winners.len(),
        format_bytes(total)
    );

    let s = Summary::from_events(&resolution.diagnostics);
    let rows = [
        ("skipped by exclude-after", s.groups_skipped),
        ("without eligible entries", s.groups_empty),
        ("without files", s.groups_missing),
        ("unmatched files", s.files_unmatched),
        ("oversized files", s.files_oversized),
        ("unreadable files", s.files_failed),
        ("ambiguous files", s.files_ambiguous),
        ("duplicate files", s.files_duplicate),
    ];
    for (label, count) in rows.into_iter().filter(|(_, n)| *n > 0) {
        log::info!(
            "  {}: {}",
            label,
            count.if_supports_color(Stdout, |t| t.yellow())
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cli_types::{Cli, Commands};

    fn generate_args(argv: &[&str]) -> GenerateArgs {
        let mut full = vec!["romset", "generate"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Commands::Generate(args) => *args,
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_flags_override_settings() {
        let mut settings = Settings::default();
        settings.defaults.regions = vec!["JPN".into()];
        settings.defaults.languages = vec!["ja".into()];
        settings.defaults.language_weight = Some(7);

        let args = generate_args(&["-d", "x.dat", "-r", "USA,EUR"]);
        let opts = policy_options(&args, &settings);
        assert_eq!(opts.regions, vec!["USA", "EUR"]);
        assert_eq!(opts.languages, vec!["ja"]);
        assert_eq!(opts.language_weight, 7);
    }

    #[test]
    fn test_no_all_with_unlicensed() {
        let args = generate_args(&["-d", "x.dat", "--no-all", "--no-unlicensed"]);
        let ex = exclusions(&args.exclusions);
        assert!(ex.bios && ex.debug && ex.bad);
        assert_eq!(ex.unlicensed, UnlicensedFilter::Drop);
    }

    #[test]
    fn test_run_config_sizes_and_mode() {
        let args = generate_args(&[
            "-d",
            "x.dat",
            "-i",
            "in",
            "-o",
            "out",
            "--symlink",
            "--relative",
            "--chunk-size",
            "64K",
        ]);
        let config = run_config(&args, &Settings::default()).unwrap();
        assert_eq!(config.scan_options.chunk_size, 64 * 1024);
        assert_eq!(
            config.scan_options.max_file_size,
            Some(settings::DEFAULT_MAX_FILE_SIZE)
        );
        assert_eq!(config.placement.mode, PlaceMode::Symlink { relative: true });

        let bad = generate_args(&["-d", "x.dat", "--max-file-size", "huge"]);
        assert!(run_config(&bad, &Settings::default()).is_err());
    }
}
