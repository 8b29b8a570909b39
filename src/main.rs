//! steplink CLI
//!
//! Entry point for the `steplink` command-line tool.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use steplink::config::{Settings, StepConfig};
use steplink::pipeline::{run_and_write, StepError};
use steplink::runner::ProcessRunner;
use steplink::signing::{load_key, load_public_key, read_envelope, verify_envelope, Key};

#[derive(Parser)]
#[command(name = "steplink")]
#[command(about = "Record and sign a software supply chain step", version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record materials, run a command, record products and emit a link
    Run(RunArgs),

    /// Check a link file's signature against a public key
    Verify {
        /// Path to the public key file (base64 Ed25519 verifying key)
        #[arg(long, short = 'k')]
        key: PathBuf,

        /// Link file to check
        link: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Step name, used in the link and its file name
    #[arg(long, short = 'n')]
    name: String,

    /// Paths recorded before the command runs
    #[arg(long = "materials", short = 'm', num_args = 1..)]
    materials: Vec<PathBuf>,

    /// Paths recorded after the command runs
    #[arg(long = "products", short = 'p', num_args = 1..)]
    products: Vec<PathBuf>,

    /// Private key file (base64 Ed25519 seed); the link is unsigned without it
    #[arg(long, short = 'k')]
    key: Option<PathBuf>,

    /// Directory the link file is written to
    #[arg(long = "metadata-directory", short = 'd')]
    metadata_directory: Option<PathBuf>,

    /// Exclusion patterns (replace those from the settings file)
    #[arg(long, short = 'e', num_args = 1..)]
    exclude: Option<Vec<String>>,

    /// Prefixes stripped from recorded paths
    #[arg(long = "lstrip-paths", short = 'l', num_args = 1..)]
    lstrip_paths: Option<Vec<String>>,

    /// Digest algorithms (sha256, sha384, sha512)
    #[arg(long = "hash-algorithm", value_delimiter = ',')]
    hash_algorithms: Option<Vec<String>>,

    /// Hash files as if CRLF and CR line endings were LF
    #[arg(long)]
    normalize_line_endings: bool,

    /// Descend into symlinked directories
    #[arg(long)]
    follow_symlink_dirs: bool,

    /// Working directory for the command
    #[arg(long = "run-dir", short = 'r')]
    run_dir: Option<PathBuf>,

    /// Settings file (default: .steplink.toml when present)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Record the step without running a command
    #[arg(long, short = 'x', conflicts_with = "cmd")]
    no_command: bool,

    /// The command to run (after --)
    #[arg(last = true, required_unless_present = "no_command")]
    cmd: Vec<String>,
}

impl RunArgs {
    /// Settings given on the command line; flags left off stay unset
    fn overlay(&self) -> Settings {
        Settings {
            exclude: self.exclude.clone(),
            lstrip_paths: self.lstrip_paths.clone(),
            hash_algorithms: self.hash_algorithms.clone(),
            normalize_line_endings: self.normalize_line_endings.then_some(true),
            follow_symlink_dirs: self.follow_symlink_dirs.then_some(true),
            metadata_directory: self.metadata_directory.clone(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run(args) => match run(&args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{}", e);
                exit_code(e.exit_code())
            }
        },
        Commands::Verify { key, link } => run_verify(&key, &link),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn run(args: &RunArgs) -> Result<(), StepError> {
    // Key problems surface before anything is recorded.
    let key = match &args.key {
        Some(path) => load_key(path)?,
        None => Key::Absent,
    };

    let settings = Settings::discover(args.config.as_deref(), Path::new("."))?
        .overlay(args.overlay());

    let mut builder = StepConfig::builder(args.name.as_str())
        .materials(args.materials.iter().cloned())
        .products(args.products.iter().cloned())
        .record_options(settings.record_options()?)
        .command(args.cmd.iter().cloned())
        .metadata_dir(settings.metadata_directory());
    if let Some(dir) = &args.run_dir {
        builder = builder.run_dir(dir.clone());
    }
    let config = builder.build()?;

    let (_, path) = run_and_write(&config, &key, &ProcessRunner::new())?;
    println!("{}", path.display());
    Ok(())
}

fn run_verify(key_path: &Path, link_path: &Path) -> ExitCode {
    let key = match load_public_key(key_path) {
        Ok(key) => key,
        Err(e) => {
            error!("{}", e);
            return exit_code(3);
        }
    };

    let envelope = match read_envelope(link_path) {
        Ok(envelope) => envelope,
        Err(e) => {
            error!("{}", e);
            return exit_code(6);
        }
    };

    match verify_envelope(&envelope, &key) {
        Ok(true) => {
            info!(step = %envelope.signed.name, keyid = %key.keyid(), "signature verified");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            error!(
                step = %envelope.signed.name,
                keyid = %key.keyid(),
                "no valid signature for key"
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{}", e);
            exit_code(6)
        }
    }
}
