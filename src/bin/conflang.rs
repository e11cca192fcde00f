use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use conflang::{Error, Redeclare, Translator};

#[derive(Parser)]
#[command(author, version, about = "Translate a conflang configuration file to TOML")]
struct Args {
    /// Configuration file to translate
    input: PathBuf,

    /// Let `def` re-bind a name that is already declared
    #[arg(long)]
    allow_redeclare: bool,

    /// Bind a variable before translation (NAME=VALUE)
    #[arg(short = 'D', long = "define", value_name = "NAME=VALUE", value_parser = parse_define)]
    defines: Vec<(String, String)>,

    /// Bind variables from environment variables named PREFIX_NAME
    #[arg(long, value_name = "PREFIX")]
    env_prefix: Option<String>,
}

fn parse_define(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))
}

/// Logs to stderr, filtered by `CONFLANG_LOG` (or `RUST_LOG`). Silent when
/// neither is set.
fn init_tracing() {
    let filter = std::env::var("CONFLANG_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok());

    if let Some(filter) = filter {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(filter)
            .init();
    }
}

fn run(args: Args) -> Result<String, Error> {
    let policy = if args.allow_redeclare {
        Redeclare::Overwrite
    } else {
        Redeclare::Reject
    };

    let mut translator = Translator::builder().redeclare(policy);
    if let Some(prefix) = args.env_prefix {
        translator = translator.with_env(prefix, "_");
    }
    for (name, value) in args.defines {
        translator = translator.with_variable(name, conflang::translate::coerce_value(&value));
    }

    translator.to_toml_file(&args.input)
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    match run(args) {
        Ok(toml) => {
            print!("{toml}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
