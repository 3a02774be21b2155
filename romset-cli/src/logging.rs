//! Logger setup: level from `--quiet`/`--verbose`, optional copy to a file.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use env_logger::{Builder, Target};
use log::{Level, LevelFilter};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

/// Writes every line to stdout and, stripped of colour codes, to a file.
struct Tee {
    file: strip_ansi_escapes::Writer<File>,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()?;
        self.file.flush()
    }
}

pub(crate) fn init(quiet: bool, verbose: bool, logfile: Option<&Path>) -> io::Result<()> {
    let level = if quiet {
        LevelFilter::Warn
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = Builder::new();
    builder
        .filter_level(level)
        .parse_default_env()
        .format(move |buf, record| match record.level() {
            Level::Info => writeln!(buf, "{}", record.args()),
            Level::Warn => writeln!(
                buf,
                "{} {}",
                "warning:".if_supports_color(Stdout, |t| t.yellow()),
                record.args()
            ),
            Level::Error => writeln!(
                buf,
                "{} {}",
                "error:".if_supports_color(Stdout, |t| t.red()),
                record.args()
            ),
            _ if verbose => {
                let ts = buf.timestamp_millis();
                writeln!(
                    buf,
                    "{} {}",
                    ts.if_supports_color(Stdout, |t| t.dimmed()),
                    record.args().if_supports_color(Stdout, |t| t.dimmed())
                )
            }
            _ => writeln!(buf, "{}", record.args()),
        });

    match logfile {
        Some(path) => {
            let file = File::create(path)?;
            builder.target(Target::Pipe(Box::new(Tee {
                file: strip_ansi_escapes::Writer::new(file),
            })));
        }
        None => {
            builder.target(Target::Stdout);
        }
    }
    builder.init();
    Ok(())
}

/// Log an empty line at info level.
pub(crate) fn blank() {
    log::info!("");
}
