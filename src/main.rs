use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use otpgen::{Configuration, Form, OtpError, Settings, base32, telemetry};
use serde::Serialize;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML file holding form defaults.
    #[clap(long, short, global = true)]
    config: Option<PathBuf>,
    /// Log debug events to stderr.
    #[clap(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Build a credential from query parameters and print its code and URI.
    Generate {
        /// Query string, e.g. `issuer=ACME&label=Alice&digits=8`.
        #[clap(default_value = "")]
        query: String,
        /// Unix time to generate for instead of now.
        #[clap(long, short)]
        time: Option<u64>,
        /// Print JSON.
        #[clap(long, short)]
        json: bool,
    },
    /// Decode an `otpauth://` URI and print its code.
    Parse {
        uri: String,
        #[clap(long, short)]
        time: Option<u64>,
        #[clap(long, short)]
        json: bool,
    },
    /// Check a code against an `otpauth://` URI.
    Verify {
        code: String,
        uri: String,
        #[clap(long, short)]
        time: Option<u64>,
        /// Steps accepted on each side of the current one.
        #[clap(long, short)]
        window: Option<u64>,
    },
    /// Print a random Base32 secret.
    Secret {
        /// Secret size in bytes.
        #[clap(long, short)]
        size: Option<usize>,
        /// Pad with `=` to a multiple of 8 characters.
        #[clap(long, short)]
        padding: bool,
    },
}

#[derive(Debug, Serialize)]
struct Output {
    code: String,
    uri: String,
    issuer: String,
    label: String,
    algorithm: String,
    digits: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    period: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    counter: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remaining_seconds: Option<u64>,
    query: String,
}

impl Output {
    fn new(config: &Configuration, time: u64) -> Result<Self, OtpError> {
        Ok(Self {
            code: config.generate(time)?,
            uri: config.to_uri(),
            issuer: config.issuer().to_owned(),
            label: config.label().to_owned(),
            algorithm: config.algorithm().to_string(),
            digits: config.digits(),
            period: config.period(),
            counter: config.counter(),
            remaining_seconds: config.remaining_seconds(time),
            query: Form::from(config).to_query(),
        })
    }

    fn print(&self, json: bool) -> Result<(), serde_json::Error> {
        if json {
            println!("{}", serde_json::to_string_pretty(self)?);
            return Ok(());
        }

        println!("{}", self.code);
        println!("{}", self.uri);
        if let Some(remaining) = self.remaining_seconds {
            println!("valid for {remaining}s");
        }
        Ok(())
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    if let Err(err) = telemetry::setup_logging(level) {
        eprintln!("cannot install logger: {err}");
    }

    match run(args) {
        Ok(code) => code,
        Err(err @ OtpError::Validation(_)) => {
            match serde_json::to_string_pretty(&err.field_errors()) {
                Ok(json) => println!("{json}"),
                Err(err) => {
                    tracing::error!(%err, "cannot serialize field errors")
                },
            }
            ExitCode::FAILURE
        },
        Err(err) => {
            tracing::error!(%err, "command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        },
    }
}

fn run(args: Args) -> Result<ExitCode, OtpError> {
    let settings = match args.config {
        Some(path) => Settings::default().path(path),
        None => Settings::default(),
    }
    .read()?;

    match args.cmd {
        Commands::Generate { query, time, json } => {
            let config = Form::from_query(&query).validate(&settings)?;
            tracing::debug!(
                issuer = config.issuer(),
                kind = config.kind().as_str(),
                "credential built"
            );
            print(&Output::new(&config, time.unwrap_or_else(now))?, json);
        },
        Commands::Parse { uri, time, json } => {
            let config: Configuration = uri.parse()?;
            print(&Output::new(&config, time.unwrap_or_else(now))?, json);
        },
        Commands::Verify {
            code,
            uri,
            time,
            window,
        } => {
            let config: Configuration = uri.parse()?;
            let window = window.unwrap_or(settings.window);
            let time = time.unwrap_or_else(now);

            return Ok(match config.delta(code.trim(), time, window)? {
                Some(delta) => {
                    println!("valid (offset {delta})");
                    ExitCode::SUCCESS
                },
                None => {
                    println!("invalid");
                    ExitCode::FAILURE
                },
            });
        },
        Commands::Secret { size, padding } => {
            let size = size.unwrap_or(settings.secret_length);
            let secret = base32::random_secret(size)?;
            println!("{}", base32::encode(secret.as_bytes(), padding));
        },
    }

    Ok(ExitCode::SUCCESS)
}

fn print(output: &Output, json: bool) {
    if let Err(err) = output.print(json) {
        tracing::error!(%err, "cannot write output");
    }
}

/// Current Unix time, read once per command.
fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or_default()
}
