//! Command-line entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use enumcrypt::crypt;
use enumcrypt::delta::FileDeltaCache;
use enumcrypt::io::{BitFile, FileMode};

/// Direction of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Rank the input blocks and emit the encrypted stream.
    Encrypt,
    /// Restore the original input from an encrypted stream.
    Decrypt,
}

/// Enumerative symmetric encryption over combinatorial block ranks.
#[derive(Parser)]
#[command(name = "enumcrypt", version)]
struct Cli {
    /// Input file.
    input: PathBuf,

    /// Operation to perform on the input.
    #[arg(short, long, value_enum, default_value_t = Mode::Encrypt)]
    mode: Mode,

    /// Block size exponent; blocks hold 2^SIGMA symbols.
    #[arg(short, long, default_value_t = 8, value_parser = clap::value_parser!(u32).range(1..=16))]
    sigma: u32,

    /// Context window size for the message splitter; 0 disables splitting.
    #[arg(short = 'u', long, default_value_t = 0)]
    mu: u8,

    /// Secret key.
    #[arg(short, long)]
    key: String,

    /// Output file.
    #[arg(short, long, default_value = "a.out")]
    output: PathBuf,
}

fn init_tracing() {
    // Logs stay off unless RUST_LOG asks for them; diagnostics go to
    // stderr so piped output stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "off".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> enumcrypt::Result<()> {
    let mut input = BitFile::open(&cli.input, FileMode::Read)?;
    let mut output = BitFile::open(&cli.output, FileMode::Write)?;
    let cache = FileDeltaCache::new(std::env::current_dir()?);
    let key = cli.key.as_bytes();
    let mu = cli.mu as usize;
    match cli.mode {
        Mode::Encrypt => crypt::encrypt(&mut output, &mut input, key, cli.sigma, mu, &cache)?,
        Mode::Decrypt => crypt::decrypt(&mut output, &mut input, key, cli.sigma, mu, &cache)?,
    }
    output.close()
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("enumcrypt: {err}");
            ExitCode::FAILURE
        }
    }
}
