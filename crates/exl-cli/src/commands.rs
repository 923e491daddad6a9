use std::path::Path;
use std::process::Command as ProcessCommand;

use colored::Colorize;

use exl_bundle::BundleError;
use exl_capture::{CancelToken, CaptureBudget, OutputCapture, PassthroughRedactor};
use exl_layout::LayoutError;
use exl_ledger::LedgerWriter;
use exl_types::SessionLocation;

use crate::cli::{Cli, Command, ExportArgs, RecordArgs, ResolveArgs, SelectArgs, VerifyArgs};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONTRACT_VIOLATION: i32 = 2;
pub const EXIT_NO_SESSION: i32 = 3;
pub const EXIT_USAGE: i32 = 4;

pub fn run_command(cli: Cli) -> i32 {
    match cli.command {
        Command::Resolve(args) => cmd_resolve(args),
        Command::Verify(args) => cmd_verify(args),
        Command::Export(args) => cmd_export(args),
        Command::Record(args) => cmd_record(args),
    }
}

fn resolve_selection(select: &SelectArgs) -> Result<SessionLocation, LayoutError> {
    match (&select.exec, &select.session) {
        (Some(exec), Some(session)) if !select.latest => {
            exl_layout::find_specific_session(&select.root, exec, session)
        }
        _ => exl_layout::find_latest_session(&select.root),
    }
}

fn layout_exit_code(err: &LayoutError) -> i32 {
    match err {
        LayoutError::NotFound { .. } => EXIT_NO_SESSION,
        LayoutError::ContractViolation { .. } => EXIT_CONTRACT_VIOLATION,
        LayoutError::Io { .. } => EXIT_FAILURE,
    }
}

fn bundle_exit_code(err: &BundleError) -> i32 {
    match err {
        BundleError::ScopeViolation { .. } | BundleError::IntegrityMissing { .. } => {
            EXIT_CONTRACT_VIOLATION
        }
        _ => EXIT_FAILURE,
    }
}

fn fail(message: impl std::fmt::Display, code: i32) -> i32 {
    eprintln!("{} {message}", "error:".red().bold());
    code
}

fn cmd_resolve(args: ResolveArgs) -> i32 {
    let location = match resolve_selection(&args.select) {
        Ok(location) => location,
        Err(err) => return fail(&err, layout_exit_code(&err)),
    };
    let contract = match exl_layout::build_contract(&location) {
        Ok(contract) => contract,
        Err(err) => return fail(&err, layout_exit_code(&err)),
    };
    for warning in &contract.warnings {
        eprintln!("{} {warning}", "warning:".yellow());
    }
    let json = match serde_json::to_string_pretty(&contract) {
        Ok(json) => json,
        Err(err) => return fail(&err, EXIT_FAILURE),
    };
    match &args.out {
        Some(path) => {
            if let Err(err) = std::fs::write(path, format!("{json}\n")) {
                return fail(
                    format_args!("writing {}: {err}", path.display()),
                    EXIT_FAILURE,
                );
            }
            eprintln!(
                "{} contract for {} written to {}",
                "✓".green().bold(),
                contract.session_id.yellow(),
                path.display()
            );
        }
        None => println!("{json}"),
    }
    EXIT_OK
}

fn cmd_verify(args: VerifyArgs) -> i32 {
    let report = match exl_ledger::verify_file(&args.ledger) {
        Ok(report) => report,
        Err(err) => return fail(&err, EXIT_FAILURE),
    };
    if report.valid {
        println!(
            "{} chain valid, head {}",
            "✓".green().bold(),
            report.head_hash.cyan()
        );
        EXIT_OK
    } else {
        let index = report
            .broken_at
            .map(|i| i.to_string())
            .unwrap_or_else(|| "?".into());
        println!(
            "{} chain broken at line {}, recoverable head {}",
            "✗".red().bold(),
            index.red(),
            report.head_hash.cyan()
        );
        EXIT_CONTRACT_VIOLATION
    }
}

fn cmd_export(args: ExportArgs) -> i32 {
    let location = match resolve_selection(&args.select) {
        Ok(location) => location,
        Err(err) => return fail(&err, layout_exit_code(&err)),
    };
    match exl_bundle::pack(&location, &args.source, &args.dest) {
        Ok(archive) => {
            println!(
                "{} exported {} ({}) to {}",
                "✓".green().bold(),
                location.session_id.yellow(),
                location.mode.to_string().cyan(),
                archive.display()
            );
            EXIT_OK
        }
        Err(err) => fail(&err, bundle_exit_code(&err)),
    }
}

fn cmd_record(args: RecordArgs) -> i32 {
    if args.command.is_empty() {
        return fail("record needs a command after `--`", EXIT_USAGE);
    }

    let mut writer = match open_writer(&args.ledger, &args.session) {
        Ok(writer) => writer,
        Err(err) => return fail(&err, EXIT_FAILURE),
    };
    let mut budget = CaptureBudget::default();
    if let Some(max) = args.max_output_bytes {
        budget.max_total_bytes = max;
    }
    let redactor = PassthroughRedactor;
    let mut capture = OutputCapture::new(&mut writer, &redactor, budget);

    let mut command = ProcessCommand::new(&args.command[0]);
    command.args(&args.command[1..]);
    match exl_capture::run_command(command, &mut capture, &CancelToken::new()) {
        Ok(outcome) => {
            if outcome.truncated {
                eprintln!("{} output budget exhausted; tail dropped", "warning:".yellow());
            }
            // Mirror the child's exit code so `record` can wrap commands
            // transparently.
            outcome.exit_code.unwrap_or(EXIT_FAILURE)
        }
        Err(err) => fail(&err, EXIT_FAILURE),
    }
}

fn open_writer(path: &Path, session_id: &str) -> Result<LedgerWriter, exl_ledger::LedgerError> {
    if path.exists() {
        LedgerWriter::resume(session_id, path)
    } else {
        LedgerWriter::create(session_id, path)
    }
}
