//! fsbridge - filesystem operations through the io_uring bridge

use anyhow::Result;
use clap::Parser;
use fsbridge::cli::{Args, Command};
use fsbridge::constants::{flags_from_str, parse_mode};
use fsbridge::runner::Runner;
use fsbridge::{DirentKind, StatRecord};
use std::io::Write;
use tracing::info;

#[compio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    args.validate()?;

    tracing_subscriber::fmt()
        .with_max_level(args.output.level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut runner = Runner::new(args.submit.mode())?;
    info!(mode = ?runner.mode(), "fsbridge {}", env!("CARGO_PKG_VERSION"));

    let mut out = std::io::stdout().lock();
    match &args.command {
        Command::Stat { path } => print_stat(&mut out, &runner.stat(path, true).await?)?,
        Command::Lstat { path } => print_stat(&mut out, &runner.stat(path, false).await?)?,
        Command::Readlink { path } => {
            out.write_all(&runner.readlink(path).await?)?;
            out.write_all(b"\n")?;
        }
        Command::Ls { path, batch } => {
            let mut entries = runner.list(path, *batch).await?;
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            for entry in entries {
                writeln!(out, "{}\t{}", kind_char(entry.kind), entry.name_lossy())?;
            }
        }
        Command::Cat { path, chunk } => {
            out.write_all(&runner.read_file(path, *chunk).await?)?;
        }
        Command::Mkdir {
            path,
            parents,
            mode,
        } => {
            let mode = parse_mode(mode)?;
            if *parents {
                runner.mkdir_all(path, mode).await?;
            } else {
                runner.mkdir(path, mode).await?;
            }
        }
        Command::Write {
            path,
            text,
            flags,
            mode,
        } => {
            let written = runner
                .write_file(path, text.as_bytes(), flags_from_str(flags)?, parse_mode(mode)?)
                .await?;
            info!("wrote {written} bytes to {}", path.display());
        }
    }
    out.flush()?;

    let stats = runner.context().stats();
    info!(
        submitted = stats.submitted,
        completed = stats.completed,
        failed = stats.failed,
        "bridge stats"
    );
    Ok(())
}

fn print_stat(out: &mut impl Write, st: &StatRecord) -> std::io::Result<()> {
    let kind = if st.is_dir() {
        "directory"
    } else if st.is_symlink() {
        "symlink"
    } else if st.is_file() {
        "file"
    } else {
        "other"
    };
    writeln!(out, "type: {kind}")?;
    writeln!(out, "mode: {:o}", st.permissions())?;
    writeln!(out, "size: {}", st.size)?;
    writeln!(out, "nlink: {}", st.nlink)?;
    writeln!(out, "uid: {}", st.uid)?;
    writeln!(out, "gid: {}", st.gid)?;
    writeln!(out, "ino: {}", st.ino)?;
    writeln!(out, "dev: {}", st.dev)?;
    writeln!(out, "blocks: {}", st.blocks)?;
    writeln!(out, "mtime_ms: {}", st.mtime_ms as i64)?;
    Ok(())
}

const fn kind_char(kind: DirentKind) -> char {
    match kind {
        DirentKind::File => 'f',
        DirentKind::Dir => 'd',
        DirentKind::Link => 'l',
        DirentKind::Fifo => 'p',
        DirentKind::Socket => 's',
        DirentKind::Char => 'c',
        DirentKind::Block => 'b',
        DirentKind::Unknown => '?',
    }
}
