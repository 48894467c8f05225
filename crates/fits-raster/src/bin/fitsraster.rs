use std::fs::File;
use std::io::{self, BufRead, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fits_raster::{save_warning, Compatibility, Depth, Session, SessionConfig};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fitsraster")]
#[command(about = "Inspect and convert FITS images through the raster codec")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report whether the codec can open a file
    Probe { file: PathBuf },
    /// Decode a file and print its shape, provenance and header
    Info { file: PathBuf },
    /// Decode a file and save it again as a FITS image
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// Save without asking when the result will differ from the input
        #[arg(long)]
        yes: bool,
    },
}

/// An appender that writes to exactly `path`, appending to what is there.
fn log_appender(path: &Path) -> Result<RollingFileAppender> {
    let file_name = path
        .file_name()
        .with_context(|| format!("log path {} has no file name", path.display()))?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(dir)
        .with_context(|| format!("opening log file {}", path.display()))
}

/// Install the subscriber. With `FITSRASTER_LOG` set, events are appended to
/// that file; the returned guard flushes it on drop.
fn init_tracing() -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let Some(path) = std::env::var_os("FITSRASTER_LOG").map(PathBuf::from) else {
        builder.with_writer(io::stderr).init();
        return Ok(None);
    };

    let (writer, guard) = tracing_appender::non_blocking(log_appender(&path)?);
    builder.with_ansi(false).with_writer(writer).init();
    Ok(Some(guard))
}

fn open(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("opening {}", path.display()))
}

fn progress(done: u64, total: u64) -> ControlFlow<()> {
    if total > 0 && (done == total || done % 256 == 0) {
        debug!(done, total, "progress");
    }
    ControlFlow::Continue(())
}

fn ask(message: &str) -> bool {
    eprintln!("{message}");
    eprint!("Save anyway? [y/N] ");
    let _ = io::stderr().flush();
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes")
}

fn run_probe(session: &Session, file: &Path) -> Result<()> {
    match session.filter(open(file)?) {
        Compatibility::Compatible => println!("{}: compatible", file.display()),
        Compatibility::Unreadable(reason) => println!("{}: not a FITS file ({reason})", file.display()),
        Compatibility::Unsupported(why) => println!("{}: unsupported ({why})", file.display()),
    }
    Ok(())
}

fn run_info(session: &mut Session, file: &Path) -> Result<()> {
    let raster = match session.read(open(file)?, &mut progress) {
        Ok(r) => r,
        Err(e) => bail!(session.user_message(&e)),
    };
    let Some(meta) = session.metadata() else {
        bail!("no metadata after decode");
    };

    println!("{}", file.display());
    println!("  Size: {} x {} x {}", raster.width(), raster.height(), raster.planes());
    println!("  BITPIX: {} ({}-bit source)", meta.bitpix, meta.input_depth);
    let depth = match raster.depth() {
        Depth::Eight => "8-bit",
        Depth::Float32 => "32-bit float",
    };
    println!("  Working depth: {depth}");
    if meta.bscale != 1.0 || meta.bzero != 0.0 {
        println!("  BSCALE/BZERO: {} / {}", meta.bscale, meta.bzero);
    }
    for name in &meta.extension_names {
        println!("  Extension: {name}");
    }
    println!("  Header keywords:");
    for (name, kw) in &meta.keywords {
        match &kw.comment {
            Some(comment) => println!("    {name} = {} / {comment}", kw.value.to_literal()),
            None => println!("    {name} = {}", kw.value.to_literal()),
        }
    }
    for line in &meta.commentary {
        println!("    {} {}", line.keyword, line.text);
    }
    if let Some(warning) = save_warning(meta) {
        println!("\n{warning}");
    }
    Ok(())
}

fn run_convert(session: &mut Session, input: &Path, output: &Path) -> Result<()> {
    let raster = match session.read(open(input)?, &mut progress) {
        Ok(r) => r,
        Err(e) => bail!(session.user_message(&e)),
    };

    if let Err(e) = session.options(raster.planes(), &mut ask) {
        if e.is_cancellation() {
            info!("not saved");
            return Ok(());
        }
        bail!(session.user_message(&e));
    }

    let out = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    info!(bytes = session.estimate(&raster), "writing {}", output.display());
    if let Err(e) = session.write(out, &raster, &mut progress) {
        bail!(session.user_message(&e));
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_tracing()?;

    match args.command {
        Command::Probe { file } => run_probe(&Session::default(), &file),
        Command::Info { file } => run_info(&mut Session::default(), &file),
        Command::Convert { input, output, yes } => {
            let mut session = Session::new(SessionConfig {
                confirm_lossy_saves: !yes,
                ..SessionConfig::default()
            });
            run_convert(&mut session, &input, &output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_is_appended_at_the_given_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fitsraster.log");
        std::fs::write(&path, "earlier run\n").unwrap();

        let mut appender = log_appender(&path).unwrap();
        appender.write_all(b"this run\n").unwrap();
        appender.flush().unwrap();
        drop(appender);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "earlier run\nthis run\n");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn log_path_needs_a_file_name() {
        assert!(log_appender(Path::new("/")).is_err());
    }
}
