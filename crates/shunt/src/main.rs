//! Binary entry point for the shunt CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Move a package: every import of old.pkg becomes new.pkg
//! shunt "old.pkg,new.pkg" src/
//!
//! # Several pairs at once, prefix matching enabled
//! shunt "a.b,x.y;a.c,x.z" --partial-matches src/ tools/build.py
//!
//! # Rewrite attribute references and patch up the imports behind them
//! shunt "settings.DEBUG,config.DEBUG" --attributes src/
//!
//! # Preview only, machine-readable output
//! shunt "old.pkg,new.pkg" src/ --dry-run --json
//! ```

use std::collections::BTreeSet;
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use shunt::files::expand_paths;
use shunt::output::{ErrorResponse, RunSummary};
use shunt::{
    move_imports, ImportKind, MoveOptions, Namespace, OutputErrorCode, RewriteRequest,
    ShuntError, ShuntResult,
};

// ============================================================================
// CLI Structure
// ============================================================================

/// Formatting-preserving moves of Python imports between namespaces.
#[derive(Parser, Debug)]
#[command(
    name = "shunt",
    version,
    about = "Move Python imports between namespaces without touching formatting"
)]
struct Cli {
    /// `old,new` namespace pairs, separated by `;`.
    namespaces: String,

    /// Files or directories to rewrite.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Match dotted prefixes of import paths, not just whole namespaces.
    #[arg(long)]
    partial_matches: bool,

    /// Allow rewrites whose new head collides with an import already in the file.
    #[arg(long)]
    aliases: bool,

    /// Restrict rewriting to these statement kinds (`import`, `from-import`).
    #[arg(long, value_delimiter = ',', value_name = "TYPE")]
    types: Vec<String>,

    /// Treat the pairs as attribute references instead of import paths.
    #[arg(long)]
    attributes: bool,

    /// Log and skip files that fail to parse instead of aborting the batch.
    #[arg(long)]
    continue_on_syntax_error: bool,

    /// Report what would change without writing any file.
    #[arg(long)]
    dry_run: bool,

    /// Emit machine-readable JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Log level for tracing output.
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.log_level);

    match execute(&cli) {
        Ok(summary) => {
            if cli.json {
                println!("{}", summary.to_json());
            } else {
                print!("{}", summary.render_human());
            }
            let _ = io::stdout().flush();
            ExitCode::SUCCESS
        }
        Err(err) => {
            let code = OutputErrorCode::from(&err);
            if cli.json {
                println!("{}", ErrorResponse::from_error(&err).to_json());
            } else {
                eprintln!("error: {err}");
            }
            let _ = io::stdout().flush();
            ExitCode::from(code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the run described by the CLI arguments.
fn execute(cli: &Cli) -> ShuntResult<RunSummary> {
    let requests = parse_pairs(&cli.namespaces, cli.attributes)?;
    let import_types = parse_types(&cli.types)?;
    let cwd = env::current_dir().map_err(|err| ShuntError::io(".", err))?;
    let files = expand_paths(&cli.paths, &cwd)?;

    let options = MoveOptions {
        partial: cli.partial_matches,
        aliases: cli.aliases,
        import_types,
        continue_on_syntax_error: cli.continue_on_syntax_error,
        dry_run: cli.dry_run,
    };
    let changed = move_imports(&files, &requests, &options)?;

    let files_changed = changed
        .iter()
        .map(|path| path.display().to_string())
        .collect();
    Ok(RunSummary::new(cli.dry_run, files_changed))
}

/// Parse the `old,new;old2,new2` pair grammar.
fn parse_pairs(text: &str, attributes: bool) -> ShuntResult<Vec<RewriteRequest>> {
    let mut requests = Vec::new();
    for chunk in text.split(';') {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            continue;
        }
        let parts: Vec<&str> = chunk.split(',').map(str::trim).collect();
        if parts.len() != 2 {
            return Err(ShuntError::invalid_args(format!(
                "expected `old,new` in {chunk:?}"
            )));
        }
        let old = Namespace::parse(parts[0])?;
        let new = Namespace::parse(parts[1])?;
        requests.push(if attributes {
            RewriteRequest::attribute(old, new)
        } else {
            RewriteRequest::import(old, new)
        });
    }
    if requests.is_empty() {
        return Err(ShuntError::EmptyRequests);
    }
    Ok(requests)
}

/// Parse the `--types` filter values.
fn parse_types(values: &[String]) -> ShuntResult<Option<BTreeSet<ImportKind>>> {
    if values.is_empty() {
        return Ok(None);
    }
    let mut kinds = BTreeSet::new();
    for value in values {
        kinds.insert(ImportKind::parse(value)?);
    }
    Ok(Some(kinds))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use shunt::RequestKind;

    #[test]
    fn pair_grammar_splits_on_semicolons() {
        let requests = parse_pairs("a.b,x.y;c,d", false).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].old.to_string(), "a.b");
        assert_eq!(requests[0].new.to_string(), "x.y");
        assert_eq!(requests[0].kind, RequestKind::Import);
        assert_eq!(requests[1].old.to_string(), "c");
    }

    #[test]
    fn pair_grammar_tolerates_spaces_and_trailing_separators() {
        let requests = parse_pairs(" a.b , x.y ; ", false).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].old.to_string(), "a.b");
    }

    #[test]
    fn attributes_flag_tags_every_pair() {
        let requests = parse_pairs("a.b,x.y", true).unwrap();
        assert_eq!(requests[0].kind, RequestKind::Attribute);
    }

    #[test]
    fn lone_namespace_is_rejected() {
        assert!(parse_pairs("a.b", false).is_err());
        assert!(parse_pairs("a,b,c", false).is_err());
    }

    #[test]
    fn empty_pair_list_is_rejected() {
        assert!(matches!(
            parse_pairs(";;", false),
            Err(ShuntError::EmptyRequests)
        ));
    }

    #[test]
    fn bad_namespace_text_is_rejected() {
        assert!(parse_pairs("a..b,c", false).is_err());
        assert!(parse_pairs("1bad,c", false).is_err());
    }

    #[test]
    fn type_filter_parses_known_kinds() {
        let kinds = parse_types(&["import".to_string(), "from-import".to_string()])
            .unwrap()
            .unwrap();
        assert!(kinds.contains(&ImportKind::Import));
        assert!(kinds.contains(&ImportKind::FromImport));
        assert!(parse_types(&[]).unwrap().is_none());
    }

    #[test]
    fn unknown_type_filter_is_a_configuration_error() {
        let result = parse_types(&["star-import".to_string()]);
        assert!(matches!(
            result,
            Err(ShuntError::UnknownImportType { .. })
        ));
    }

    #[test]
    fn cli_parses_a_full_invocation() {
        let cli = Cli::try_parse_from([
            "shunt",
            "old.pkg,new.pkg",
            "src",
            "--partial-matches",
            "--types",
            "import,from-import",
            "--dry-run",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.namespaces, "old.pkg,new.pkg");
        assert_eq!(cli.paths, vec![PathBuf::from("src")]);
        assert!(cli.partial_matches);
        assert_eq!(cli.types, vec!["import", "from-import"]);
        assert!(cli.dry_run);
        assert!(cli.json);
    }
}
