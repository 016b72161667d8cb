use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rchor_core::lexer::tokenize;
use rchor_core::{
    ast_print, run, validate, Diagnostic, Frontend, FrontendError, InitBinding, RacePolicy,
    RacingFrontend, SimOptions, SimulationResult, ValidationError, Value,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "rchor")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Emit a machine-readable result envelope instead of plain text.
    #[arg(long, global = true)]
    json: bool,

    /// Write the report to a file (atomically) instead of stdout.
    #[arg(long, global = true)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Parse, validate and execute a choreography.
    Simulate(SimulateArgs),
    /// Parse and validate a choreography, then dump its AST.
    Parse { file: PathBuf },
    /// Dump the token stream of a source file.
    Tokens { file: PathBuf },
}

#[derive(Args)]
struct SimulateArgs {
    file: PathBuf,

    /// Seed for the race-decision PRNG (used with --race random).
    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long = "race", value_enum, default_value = "random")]
    race: RacePolicyArg,

    #[arg(long, default_value_t = 100_000)]
    max_steps: u64,

    #[arg(long, default_value_t = 1_000)]
    max_call_depth: u64,

    /// Pre-populate the store: P.X=V with V one of true, false or an integer.
    #[arg(long = "init", value_parser = parse_init_binding)]
    init: Vec<InitBinding>,

    /// Record trace events (the default).
    #[arg(long, overrides_with = "no_trace")]
    trace: bool,

    /// Do not record trace events.
    #[arg(long, overrides_with = "trace")]
    no_trace: bool,

    /// Print the final store after execution.
    #[arg(long)]
    final_store: bool,

    /// Print the final race memory after execution.
    #[arg(long)]
    final_races: bool,

    /// Suppress trace printing (text mode only).
    #[arg(long)]
    quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum RacePolicyArg {
    Left,
    Right,
    Random,
}

impl From<RacePolicyArg> for RacePolicy {
    fn from(arg: RacePolicyArg) -> Self {
        match arg {
            RacePolicyArg::Left => RacePolicy::Left,
            RacePolicyArg::Right => RacePolicy::Right,
            RacePolicyArg::Random => RacePolicy::Random,
        }
    }
}

impl RacePolicyArg {
    fn as_str(&self) -> &'static str {
        match self {
            RacePolicyArg::Left => "left",
            RacePolicyArg::Right => "right",
            RacePolicyArg::Random => "random",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Status {
    Ok,
    SyntaxError,
    ValidationError,
    RuntimeError,
}

impl Status {
    fn exit_code(&self) -> i32 {
        match self {
            Status::Ok => 0,
            _ => 1,
        }
    }
}

#[derive(Serialize)]
struct ResultJson {
    schema_version: String,
    tool: ToolInfo,
    invocation: Invocation,
    inputs: Vec<InputInfo>,
    status: Status,
    exit_code: i32,
    started_at: String,
    finished_at: String,
    duration_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    simulation: Option<SimulationResult>,
}

#[derive(Serialize)]
struct ToolInfo {
    name: String,
    version: String,
    git_sha: String,
}

#[derive(Serialize)]
struct Invocation {
    command: String,
    file: String,
    seed: u64,
    race: String,
    max_steps: u64,
    max_call_depth: u64,
    trace: bool,
    init: Vec<InitBinding>,
}

#[derive(Serialize)]
struct InputInfo {
    path: String,
    sha256: String,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match dispatch(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            2
        }
    };
    std::process::exit(exit_code);
}

fn dispatch(cli: Cli) -> Result<i32> {
    match &cli.command {
        Command::Simulate(args) => run_simulate(args, cli.json, cli.output.as_deref()),
        Command::Parse { file } => run_parse(file, cli.json, cli.output.as_deref()),
        Command::Tokens { file } => run_tokens(file),
    }
}

fn read_source(file: &Path) -> Result<(String, String, String)> {
    let path = file.to_string_lossy().to_string();
    let bytes = fs::read(file).with_context(|| format!("read {}", file.display()))?;
    let sha256 = hex::encode(Sha256::digest(&bytes));
    let source =
        String::from_utf8(bytes).with_context(|| format!("{}: not valid UTF-8", file.display()))?;
    Ok((source, path, sha256))
}

fn run_simulate(args: &SimulateArgs, json: bool, output: Option<&Path>) -> Result<i32> {
    let started_at = Utc::now();
    let timer = Instant::now();

    let (source, path, sha256) = read_source(&args.file)?;

    let options = SimOptions {
        race_policy: args.race.into(),
        seed: args.seed,
        max_steps: args.max_steps,
        max_call_depth: args.max_call_depth,
        trace: args.trace || !args.no_trace,
        init: args.init.clone(),
    };

    let (status, errors, simulation) = match RacingFrontend.parse(&source, &path) {
        Err(err) => (Status::SyntaxError, vec![frontend_diagnostic(&err)], None),
        Ok(program) => {
            let validation_errors = validate(&program);
            if !validation_errors.is_empty() {
                let errors = validation_errors.iter().map(validation_diagnostic).collect();
                (Status::ValidationError, errors, None)
            } else {
                let result = run(&program, &options);
                let status = if result.ok {
                    Status::Ok
                } else {
                    Status::RuntimeError
                };
                (status, Vec::new(), Some(result))
            }
        }
    };
    let exit_code = status.exit_code();

    if json {
        let finished_at = Utc::now();
        let envelope = ResultJson {
            schema_version: "0.1".to_string(),
            tool: tool_info(),
            invocation: Invocation {
                command: "simulate".to_string(),
                file: path.clone(),
                seed: args.seed,
                race: args.race.as_str().to_string(),
                max_steps: args.max_steps,
                max_call_depth: args.max_call_depth,
                trace: options.trace,
                init: args.init.clone(),
            },
            inputs: vec![InputInfo { path, sha256 }],
            status,
            exit_code,
            started_at: started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            finished_at: finished_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            duration_ms: timer.elapsed().as_millis() as u64,
            errors,
            simulation,
        };
        let payload = serde_json::to_string_pretty(&envelope).context("serialize result json")?;
        emit(&payload, output)?;
        return Ok(exit_code);
    }

    match status {
        Status::SyntaxError => {
            for diagnostic in &errors {
                eprintln!("syntax error: {}", diagnostic_line(diagnostic));
            }
        }
        Status::ValidationError => {
            for diagnostic in &errors {
                eprintln!("validation error: {}", diagnostic_line(diagnostic));
            }
        }
        Status::Ok | Status::RuntimeError => {
            let Some(result) = &simulation else {
                return Ok(exit_code);
            };
            let mut report = String::new();
            if options.trace && !args.quiet {
                for event in &result.trace {
                    report.push_str(&event.to_string());
                    report.push('\n');
                }
            }
            if args.final_store {
                report.push_str("-- store --\n");
                for (process, var, value) in result.store.iter() {
                    report.push_str(&format!("{process}.{var} = {value}\n"));
                }
            }
            if args.final_races {
                report.push_str("-- races --\n");
                for (key, entry) in result.races.iter() {
                    report.push_str(&format!(
                        "{key} winner={} loser={} vWinner={} vLoser={} discharged={}\n",
                        entry.winner_proc,
                        entry.loser_proc,
                        entry.v_winner,
                        entry.v_loser,
                        entry.discharged
                    ));
                }
            }
            if !report.is_empty() {
                emit(report.trim_end_matches('\n'), output)?;
            }
            for diagnostic in &result.diagnostics {
                eprintln!("runtime error: {diagnostic}");
            }
        }
    }

    Ok(exit_code)
}

fn run_parse(file: &Path, json: bool, output: Option<&Path>) -> Result<i32> {
    let (source, path, _sha256) = read_source(file)?;

    let program = match RacingFrontend.parse(&source, &path) {
        Ok(program) => program,
        Err(err) => {
            if json {
                let payload = serde_json::json!({
                    "status": "syntax_error",
                    "errors": [frontend_diagnostic(&err)],
                });
                emit(&serde_json::to_string_pretty(&payload)?, output)?;
            } else {
                eprintln!("syntax error: {err}");
            }
            return Ok(1);
        }
    };

    let validation_errors = validate(&program);
    if !validation_errors.is_empty() {
        if json {
            let errors: Vec<Diagnostic> =
                validation_errors.iter().map(validation_diagnostic).collect();
            let payload = serde_json::json!({
                "status": "validation_error",
                "errors": errors,
            });
            emit(&serde_json::to_string_pretty(&payload)?, output)?;
        } else {
            for err in &validation_errors {
                eprintln!("validation error: {err}");
            }
        }
        return Ok(1);
    }

    if json {
        let payload = serde_json::json!({
            "status": "ok",
            "ast": serde_json::to_value(&program)?,
        });
        emit(&serde_json::to_string_pretty(&payload)?, output)?;
    } else {
        emit(ast_print::pretty(&program).trim_end_matches('\n'), output)?;
    }
    Ok(0)
}

fn run_tokens(file: &Path) -> Result<i32> {
    let (source, path, _sha256) = read_source(file)?;

    let tokens = match tokenize(&source, &path) {
        Ok(tokens) => tokens,
        Err(err) => {
            eprintln!("syntax error: {err}");
            return Ok(1);
        }
    };

    for token in &tokens {
        println!(
            "{}:{}  {}  \"{}\"",
            token.line,
            token.col,
            token.kind.name(),
            token.text
        );
    }
    Ok(0)
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "rchor".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_sha: std::env::var("RCHOR_GIT_SHA").unwrap_or_else(|_| "UNKNOWN".to_string()),
    }
}

fn frontend_diagnostic(err: &FrontendError) -> Diagnostic {
    Diagnostic {
        message: err.message.clone(),
        span: err.span.clone(),
    }
}

fn validation_diagnostic(err: &ValidationError) -> Diagnostic {
    Diagnostic {
        message: err.message.clone(),
        span: Some(err.span.clone()),
    }
}

fn diagnostic_line(diagnostic: &Diagnostic) -> String {
    match &diagnostic.span {
        Some(span) => format!("{span}: {}", diagnostic.message),
        None => diagnostic.message.clone(),
    }
}

fn parse_init_binding(raw: &str) -> Result<InitBinding, String> {
    let (lhs, value_text) = raw
        .split_once('=')
        .ok_or_else(|| format!("invalid init binding '{raw}': expected P.X=V"))?;
    let (process, var) = lhs
        .split_once('.')
        .ok_or_else(|| format!("invalid init binding '{raw}': expected P.X=V"))?;

    if !is_binding_ident(process) || !is_binding_ident(var) {
        return Err(format!(
            "invalid init binding '{raw}': P and X must be identifiers"
        ));
    }

    let value = match value_text {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        other => Value::Int(other.parse::<i64>().map_err(|_| {
            format!("invalid init value '{other}': expected true, false or an integer")
        })?),
    };

    Ok(InitBinding {
        process: process.to_string(),
        var: var.to_string(),
        value,
    })
}

fn is_binding_ident(text: &str) -> bool {
    !text.is_empty() && !text.contains('.') && !text.contains('=')
}

fn emit(payload: &str, output: Option<&Path>) -> Result<()> {
    if let Some(path) = output {
        write_atomic(path, payload.as_bytes())?;
        return Ok(());
    }
    println!("{payload}");
    Ok(())
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents).with_context(|| format!("write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("rename {}", path.display()))?;
    Ok(())
}
