use std::process;
use std::time::Duration;

use clap::Parser;
use sigpatch_core::engine::{self, PatchRequest};
use sigpatch_core::types::{PatchOutcome, Signature};
use sigpatch_core::{PatchError, Result as PatchResult};
use sigpatch_utils::{info, init_logging};

/// Built-in pattern: the conditional-branch sequence in the stock `engine.so`.
const DEFAULT_PATTERN: [u8; 8] = [0x75, 0x11, 0x84, 0xdb, 0x75, 0x0d, 0xc6, 0x05];

/// Built-in replacement: same sequence with the leading conditional branch
/// rewritten to an unconditional short jump.
const DEFAULT_REPLACEMENT: [u8; 8] = [0xeb, 0x04, 0x84, 0xdb, 0x75, 0x0d, 0xc6, 0x05];

/// Attach to a running process and patch a byte signature in one of its modules.
#[derive(Parser, Debug)]
#[command(name = "sigpatch")]
#[command(version)]
#[command(
    about = "Attach to a running process and patch a byte signature in one of its modules",
    long_about = None
)]
struct Cli
{
    /// Executable name of the target process (as reported in /proc/<pid>/comm)
    #[arg(long, default_value = "hl2_linux")]
    process: String,

    /// Module to patch, matched as a substring of the mapping label
    #[arg(long, default_value = "engine.so")]
    module: String,

    /// Hex byte pattern to search for (e.g. "75 11 84 db 75 0d c6 05")
    ///
    /// Must be given together with --replacement; without both, the built-in
    /// signature is used.
    #[arg(long, requires = "replacement")]
    pattern: Option<String>,

    /// Hex replacement bytes, same length as the pattern
    #[arg(long, requires = "pattern")]
    replacement: Option<String>,

    /// Seconds to keep rescanning the process table before giving up
    #[arg(long, default_value_t = 20)]
    timeout: u32,

    /// Follow forked/cloned descendants of the target
    #[arg(long, default_value_t = false)]
    follow_children: bool,

    /// Command line to spawn before discovery (e.g. --launch steam steam://rungameid/550)
    #[arg(long, num_args = 1.., value_name = "CMD")]
    launch: Option<Vec<String>>,
}

fn main()
{
    // Initialize logging (reads from RUST_LOG env var)
    // Defaults to INFO level and Pretty format if not set
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    let cli = Cli::parse();

    match run(cli) {
        Ok(outcome) => {
            println!("{outcome}");
            if !outcome.is_applied() {
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> PatchResult<PatchOutcome>
{
    let signature = build_signature(&cli)?;

    info!(
        "Patching module {:?} of process {:?} ({} byte signature)",
        cli.module,
        cli.process,
        signature.len()
    );

    let request = PatchRequest {
        process_name: cli.process,
        module_name: cli.module,
        signature,
        // One scan per second until the timeout elapses
        max_attempts: cli.timeout.max(1),
        retry_interval: Duration::from_secs(1),
        follow_children: cli.follow_children,
        launch: cli.launch,
    };

    engine::run(&request)
}

fn build_signature(cli: &Cli) -> PatchResult<Signature>
{
    match (&cli.pattern, &cli.replacement) {
        (Some(pattern), Some(replacement)) => Signature::from_hex(pattern, replacement),
        (None, None) => Signature::new(DEFAULT_PATTERN.to_vec(), DEFAULT_REPLACEMENT.to_vec()),
        // Mixed cases are already rejected by clap's `requires`
        _ => Err(PatchError::InvalidSignature(
            "--pattern and --replacement must be given together".to_string(),
        )),
    }
}
