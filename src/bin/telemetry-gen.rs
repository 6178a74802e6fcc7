use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};

use telemetry_gen::{
    check_up_to_date, generate_to_file, validate_from_path, GeneratorConfig, Target,
    TelemetryGenError, WriteOutcome, DEFAULT_SINK, DEFAULT_SINK_IMPORT,
};

/// Generate typed telemetry recording code from a telemetry definitions schema.
#[derive(Parser, Debug)]
#[command(name = "telemetry-gen", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the artifact and write it to the output path
    Generate(GenerateArgs),
    /// Fail if the artifact on disk differs from what the schema generates
    Check(GenerateArgs),
    /// Check the schema without generating anything
    Validate(SchemaArgs),
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Path to the telemetry definitions schema (JSON with comments)
    #[arg(value_name = "SCHEMA")]
    schema: PathBuf,

    /// Require metrics to be listed in strictly ascending order by name
    #[arg(long)]
    require_sorted: bool,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    schema: SchemaArgs,

    /// Path of the generated artifact
    #[arg(long, short = 'o', value_name = "PATH")]
    output: PathBuf,

    /// Language of the generated artifact (typescript or rust)
    #[arg(long, value_name = "TARGET", default_value = "typescript")]
    target: Target,

    /// Call expression the generated TypeScript functions forward to
    #[arg(long, value_name = "EXPR", default_value = DEFAULT_SINK)]
    sink: String,

    /// Import line placed at the top of generated TypeScript
    #[arg(long, value_name = "LINE", default_value = DEFAULT_SINK_IMPORT, conflicts_with = "no_sink_import")]
    sink_import: String,

    /// Do not emit a sink import line
    #[arg(long)]
    no_sink_import: bool,
}

impl GenerateArgs {
    fn config(&self) -> GeneratorConfig {
        GeneratorConfig {
            target: self.target,
            sink: self.sink.clone(),
            sink_import: (!self.no_sink_import).then(|| self.sink_import.clone()),
            require_sorted_metrics: self.schema.require_sorted,
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    /// No logging output
    None,
    /// Only error messages
    Error,
    /// Warning and error messages
    Warn,
    /// Info, warning, and error messages
    Info,
    /// Debug and above messages
    Debug,
    /// All messages including trace
    Trace,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), TelemetryGenError> {
    match command {
        Command::Generate(args) => {
            let outcome = generate_to_file(&args.schema.schema, &args.output, &args.config())?;
            match outcome {
                WriteOutcome::Written => println!("wrote {}", args.output.display()),
                WriteOutcome::Unchanged => println!("{} is up to date", args.output.display()),
            }
        }
        Command::Check(args) => {
            check_up_to_date(&args.schema.schema, &args.output, &args.config())?;
            println!("{} is up to date", args.output.display());
        }
        Command::Validate(args) => {
            let config = GeneratorConfig {
                require_sorted_metrics: args.require_sorted,
                ..GeneratorConfig::default()
            };
            let plan = validate_from_path(&args.schema, &config)?;
            println!(
                "{}: {} metric(s), {} constrained type(s)",
                args.schema.display(),
                plan.metrics.len(),
                plan.constrained_types.len()
            );
        }
    }
    Ok(())
}

fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .init();
}
