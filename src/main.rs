//! Purpose: `rowsink` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, renders result-set streams as delimited text.
//! Invariants: Row data goes to stdout; diagnostics go to stderr or the console.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::io::{self, BufReader};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use clap_complete::aot::Shell;
use tracing_subscriber::EnvFilter;

mod input;

use input::run_stream;
use rowsink::api::{
    to_exit_code, ControlCharMode, DelimitedFormatter, Error, ErrorKind, RenderSettings,
};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = Cli::parse();
    match cli.command {
        Command::Render(args) => render(args),
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "rowsink", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
    }
}

#[derive(Parser)]
#[command(
    name = "rowsink",
    version,
    about = "Render SQL result-set streams as delimiter-separated text",
    long_about = None,
    before_help = r#"Reads a JSON Lines description of one or more result sets and writes
one header line plus one line per row, fields joined by the configured
separator.

Mental model:
  - a schema object line opens a result set
  - an array line is one row
  - rows that fail to scan are reported on stderr and skipped"#,
    after_help = r#"EXAMPLES
  $ rowsink render results.jsonl
  $ rowsink render --separator ';' results.jsonl
  $ generator | rowsink render --redirect-messages > out.csv

LEARN MORE
  $ rowsink <command> --help"#,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Render a result-set stream",
        long_about = r#"Render a JSON Lines result-set description as delimited text.

A schema line `{"columns":[{"name":"id","type":"INT"}…]}` opens a result
set; each following array line is one row. Cells are JSON null/string/
number/bool, or tagged objects: {"hex":"00ff"} for bytes, {"ts":"RFC3339"}
for temporal values, {"str":"…"} for values that only carry display text."#,
        after_help = r#"EXAMPLES
  $ rowsink render results.jsonl
  $ rowsink render - < results.jsonl
  $ rowsink render --control-chars strip --max-var-width 0 results.jsonl

NOTES
  - Binary columns render as 0x-prefixed hex
  - Unique identifiers render in 8-4-4-4-12 form
  - NULL renders as the literal NULL"#
    )]
    Render(RenderArgs),
    #[command(
        about = "Generate shell completions",
        long_about = r#"Print a completion script for the given shell to stdout."#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

#[derive(Args)]
struct RenderArgs {
    #[arg(
        help = "Input file (JSON Lines; use - or omit for stdin)",
        value_hint = ValueHint::FilePath
    )]
    file: Option<PathBuf>,
    #[arg(
        short = 's',
        long,
        default_value = ",",
        help = "Column separator string"
    )]
    separator: String,
    #[arg(
        long = "control-chars",
        value_enum,
        default_value = "pass",
        help = "Control characters in character columns: pass|strip|substitute"
    )]
    control_chars: ControlCharsCli,
    #[arg(
        long = "redirect-messages",
        help = "Route informational messages to stderr instead of the console"
    )]
    redirect_messages: bool,
    #[arg(
        long = "max-fixed-width",
        default_value_t = 0,
        help = "Width cap for fixed-size columns (0 = unlimited)"
    )]
    max_fixed_width: usize,
    #[arg(
        long = "max-var-width",
        default_value_t = 256,
        help = "Width cap for variable-size columns (0 = unlimited)"
    )]
    max_var_width: usize,
    #[arg(long, help = "Print a row summary to stderr after rendering")]
    summary: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ControlCharsCli {
    Pass,
    Strip,
    Substitute,
}

impl From<ControlCharsCli> for ControlCharMode {
    fn from(value: ControlCharsCli) -> Self {
        match value {
            ControlCharsCli::Pass => ControlCharMode::Pass,
            ControlCharsCli::Strip => ControlCharMode::Strip,
            ControlCharsCli::Substitute => ControlCharMode::Substitute,
        }
    }
}

fn render(args: RenderArgs) -> Result<RunOutcome, Error> {
    let settings = RenderSettings {
        column_separator: args.separator,
        max_fixed_col_width: args.max_fixed_width,
        max_var_col_width: args.max_var_width,
        control_chars: args.control_chars.into(),
        redirect_messages: args.redirect_messages,
    };
    let mut formatter = DelimitedFormatter::new(
        settings,
        Box::new(io::stdout()),
        Box::new(io::stderr()),
        Box::new(io::stdout()),
    );

    let outcome = match &args.file {
        Some(path) if path.as_os_str() != std::ffi::OsStr::new("-") => {
            tracing::debug!(path = %path.display(), "rendering from file");
            let file = std::fs::File::open(path).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message(format!("failed to open {}", path.display()))
                    .with_hint("Check the path, or pass - to read from stdin.")
                    .with_source(err)
            })?;
            run_stream(BufReader::new(file), &mut formatter)?
        }
        _ => {
            tracing::debug!("rendering from stdin");
            run_stream(io::stdin().lock(), &mut formatter)?
        }
    };

    tracing::debug!(
        result_sets = outcome.result_sets,
        rows = outcome.rows_rendered,
        dropped = outcome.rows_dropped,
        "stream complete"
    );
    if args.summary {
        eprintln!(
            "{} result set(s), {} row(s) rendered, {} dropped",
            outcome.result_sets, outcome.rows_rendered, outcome.rows_dropped
        );
    }
    Ok(RunOutcome::ok())
}

fn emit_error(err: &Error) {
    eprintln!("error: {err}");
    if let Some(hint) = err.hint() {
        eprintln!("hint: {hint}");
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}
