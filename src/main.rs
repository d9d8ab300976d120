use anyhow::{Result, bail};
use camino::Utf8PathBuf;
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use seam::config;
use seam::filter::{GitignoreMatcher, IncludeGlob};
use seam::sync;

/// Keep two folders of notes agreeing with each other.
///
/// Each run copies new files to the side that's missing them and merges
/// files that changed on both sides, using the last content both sides
/// agreed on as the merge base.
#[derive(Debug, Parser)]
#[clap(version, verbatim_doc_comment)]
struct Args {
    /// Verbosity (-v, -vv, -vvv, etc.)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory for persistent state (agreement snapshot + ancestor blobs)
    #[clap(short, long, env = "SEAM_STATE_DIR")]
    state_dir: Option<Utf8PathBuf>,

    /// Glob for files to sync (empty matches everything)
    #[clap(short, long)]
    include: Option<String>,

    /// Don't stage .bak files before overwriting merged files
    #[clap(long)]
    no_backups: bool,

    /// Seed-merge tie window in seconds: without a recorded agreement,
    /// sides with mtimes closer than this get conflict markers instead of
    /// newer-wins
    #[clap(long, value_name = "seconds", verbatim_doc_comment)]
    epsilon: Option<f64>,

    /// Skip paths matching this gitignore-style pattern
    /// (can be given multiple times, adds to the built-in set)
    #[clap(long = "ignore", value_name = "pattern", verbatim_doc_comment)]
    ignores: Vec<String>,

    /// The two roots to reconcile
    root_a: Utf8PathBuf,
    root_b: Utf8PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let conf = config::load()?;

    let Some(state_dir) = args.state_dir.or(conf.state_dir) else {
        bail!(
            "No state directory; provide --state-dir, SEAM_STATE_DIR, \
             or state_dir in ~/.config/seam.toml"
        );
    };

    let mut ignore_patterns = conf.ignores;
    ignore_patterns.extend(args.ignores);

    let options = sync::Options {
        root_a: args.root_a,
        root_b: args.root_b,
        state_dir,
        include: IncludeGlob::new(args.include.as_deref().unwrap_or(conf.include.as_str()))?,
        ignores: Box::new(GitignoreMatcher::new(&ignore_patterns)?),
        backups: !args.no_backups && conf.backups,
        mtime_epsilon: args.epsilon.unwrap_or(conf.conflict_window_seconds),
    };

    let result = sync::run(&options)?;
    println!("{result}");
    Ok(())
}

/// Spit compact messages to stderr, louder with each -v.
/// RUST_LOG wins when set.
fn init_logger(verbosity: u8) {
    let default = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(filter);

    tracing_subscriber::registry().with(stderr_layer).init();
}
