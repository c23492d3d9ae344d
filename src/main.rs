use std::env;
use std::io::{self, Write};
use std::process;

use clap::Parser;
use nullbind_repro::{
    DEFAULT_DRIVER, DEFAULT_TABLE, DEFAULT_URI, Expectation, ParamCase, ReproConfig, RunReport,
    run_reproduction,
};
use nullbind_result::Error;
use nullbind_session::AdbcBackend;

const URI_ENV: &str = "NULLBIND_URI";

const EXIT_OK: i32 = 0;
/// A stage failed before the run could finish.
const EXIT_FATAL: i32 = 1;
/// The run completed but the verdict contradicts `--expect`.
const EXIT_EXPECTATION_FAILED: i32 = 2;

fn parse_expectation(value: &str) -> Result<Expectation, String> {
    value.parse()
}

fn parse_table(value: &str) -> Result<String, String> {
    nullbind_repro::validate_identifier(value)
        .map(|()| value.to_string())
        .map_err(|err| err.to_string())
}

/// Connection URI: the flag wins, then `NULLBIND_URI`, then the placeholder.
fn resolve_uri(flag: Option<String>, env_value: Result<String, env::VarError>) -> String {
    if let Some(uri) = flag {
        return uri;
    }
    match env_value {
        Ok(value) if !value.trim().is_empty() => value,
        Ok(_) | Err(env::VarError::NotPresent) => DEFAULT_URI.to_string(),
        Err(env::VarError::NotUnicode(_)) => {
            tracing::warn!(
                target: "nullbind",
                "{URI_ENV} is not valid UTF-8; using the default URI"
            );
            DEFAULT_URI.to_string()
        }
    }
}

#[derive(Parser)]
#[command(
    name = "nullbind",
    about = "Reproduce ADBC drivers failing to bind NULL parameters typed as Arrow 'na'"
)]
struct Cli {
    /// ADBC driver to load by name.
    #[arg(long, default_value = DEFAULT_DRIVER)]
    driver: String,
    /// Connection URI (or set NULLBIND_URI).
    #[arg(long)]
    uri: Option<String>,
    /// Scratch table to drop, recreate and insert into.
    #[arg(long, default_value = DEFAULT_TABLE, value_parser = parse_table)]
    table: String,
    /// Leave the scratch table in place after the run.
    #[arg(long = "keep-table")]
    keep_table: bool,
    /// Skip printing the table contents after the inserts.
    #[arg(long = "no-inspect")]
    no_inspect: bool,
    /// Fail with exit status 2 unless the NULL probes show this verdict.
    #[arg(
        long,
        value_name = "any|reproduced|fixed",
        default_value = "any",
        value_parser = parse_expectation
    )]
    expect: Expectation,
}

impl Cli {
    fn config(&self) -> ReproConfig {
        ReproConfig {
            driver: self.driver.clone(),
            uri: resolve_uri(self.uri.clone(), env::var(URI_ENV)),
            table: self.table.clone(),
            cases: ParamCase::default_suite(),
            inspect_table: !self.no_inspect,
            keep_table: self.keep_table,
        }
    }
}

fn main() {
    // Logs go to stderr; stdout carries the report.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config();
    let mut backend = AdbcBackend::default();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = run_reproduction(&mut backend, &config, &mut out);
    let code = match finish(result, cli.expect, &mut out) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(target: "nullbind", "writing the report failed: {err}");
            EXIT_FATAL
        }
    };
    process::exit(code);
}

/// Print the closing line for `result` and pick the exit status.
fn finish<W: Write>(
    result: Result<RunReport, Error>,
    expect: Expectation,
    out: &mut W,
) -> Result<i32, Error> {
    let code = match result {
        Err(err) => {
            writeln!(out, "Error: {err}")?;
            tracing::debug!(target: "nullbind", "reproduction aborted: {err:?}");
            EXIT_FATAL
        }
        Ok(report) if expect.is_met(report.bug_reproduced()) => EXIT_OK,
        Ok(report) => {
            writeln!(
                out,
                "Expected the NULL binding bug to be {expect}, but it was {}.",
                if report.bug_reproduced() { "reproduced" } else { "fixed" }
            )?;
            EXIT_EXPECTATION_FAILED
        }
    };
    out.flush()?;
    Ok(code)
}
