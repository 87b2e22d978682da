/// sigconform - Signature Conformance Checker CLI
use sigconform::backend::{run, Report};
use sigconform::config::Config;
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Every report passed
const EXIT_PASS: i32 = 0;
/// Mismatches or fatal call-site errors
const EXIT_FAIL: i32 = 1;
/// Usage, configuration, catalog or parse errors
const EXIT_ERROR: i32 = 2;

fn print_usage() {
    eprintln!("sigconform v{}", VERSION);
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    sigconform [OPTIONS] <FIXTURE>...");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -h, --help             Print this help message");
    eprintln!("    -V, --version          Print version information");
    eprintln!("    -c, --config <FILE>    Run configuration (default: ./sigconform.toml if present)");
    eprintln!("    -d, --decls <FILE>     Additional declarations file (repeatable)");
    eprintln!("    --no-preset            Start from an empty catalog");
    eprintln!("    --sequential           Evaluate call sites on the calling thread");
    eprintln!("    --show-passing         List every call site in the report");
    eprintln!("    -o, --output <FILE>    Write the report to FILE (default: stdout)");
    eprintln!("    --log-level <LEVEL>    error|warn|info|debug|trace");
    eprintln!();
    eprintln!("EXIT STATUS:");
    eprintln!("    0 every fixture passed, 1 mismatches or errors, 2 invalid input");
    eprintln!();
    eprintln!("EXAMPLES:");
    eprintln!("    sigconform fixtures/testing_library.fixture");
    eprintln!("    sigconform -d decls/jest-dom.toml --show-passing tests.fixture");
}

fn print_version() {
    println!("sigconform {}", VERSION);
}

struct Options {
    fixtures: Vec<PathBuf>,
    config: Option<PathBuf>,
    decls: Vec<PathBuf>,
    no_preset: bool,
    sequential: bool,
    show_passing: bool,
    output: Option<String>,
    log_level: Option<String>,
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();

    let mut options = Options {
        fixtures: Vec::new(),
        config: None,
        decls: Vec::new(),
        no_preset: false,
        sequential: false,
        show_passing: false,
        output: None,
        log_level: None,
    };
    let mut i = 1;

    let value = |i: usize, flag: &str| -> Result<String, String> {
        args.get(i)
            .cloned()
            .ok_or_else(|| format!("Missing value after {}", flag))
    };

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(EXIT_PASS);
            }
            "-V" | "--version" => {
                print_version();
                process::exit(EXIT_PASS);
            }
            flag @ ("-c" | "--config") => {
                i += 1;
                options.config = Some(PathBuf::from(value(i, flag)?));
            }
            flag @ ("-d" | "--decls") => {
                i += 1;
                options.decls.push(PathBuf::from(value(i, flag)?));
            }
            flag @ ("-o" | "--output") => {
                i += 1;
                options.output = Some(value(i, flag)?);
            }
            flag @ "--log-level" => {
                i += 1;
                options.log_level = Some(value(i, flag)?);
            }
            "--no-preset" => options.no_preset = true,
            "--sequential" => options.sequential = true,
            "--show-passing" => options.show_passing = true,
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            arg => options.fixtures.push(PathBuf::from(arg)),
        }
        i += 1;
    }

    if options.fixtures.is_empty() {
        return Err("Missing fixture file".to_string());
    }
    Ok(options)
}

/// Configuration file, then command-line overrides
fn load_config(options: &Options) -> Result<Config, String> {
    let mut config = match &options.config {
        Some(path) => Config::load(path),
        None => Config::discover(),
    }
    .map_err(|e| e.to_string())?;

    if options.no_preset {
        config.catalog.preset.clear();
    }
    config.catalog.declarations.extend(options.decls.iter().cloned());
    if options.sequential {
        config.evaluation.parallel = false;
    }
    if options.show_passing {
        config.report.show_passing = true;
    }
    if let Some(level) = &options.log_level {
        config.logging.level = level.clone();
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn init_logging(config: &Config) -> Result<(), String> {
    let level = config.logging.level().map_err(|e| e.to_string())?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn format_reports(reports: &[Report]) -> String {
    reports.iter().map(Report::to_string).collect::<Vec<_>>().join("\n")
}

fn write_output(output: Option<&str>, content: &str) -> Result<(), String> {
    match output {
        Some(path) => {
            let mut file = fs::File::create(path)
                .map_err(|e| format!("Failed to create output file '{}': {}", path, e))?;
            file.write_all(content.as_bytes())
                .map_err(|e| format!("Failed to write to output file '{}': {}", path, e))?;
            Ok(())
        }
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}

fn main() {
    let options = match parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            process::exit(EXIT_ERROR);
        }
    };

    let config = match load_config(&options) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_ERROR);
        }
    };

    if let Err(e) = init_logging(&config) {
        eprintln!("Error: {}", e);
        process::exit(EXIT_ERROR);
    }

    let reports = match run(&config, &options.fixtures) {
        Ok(reports) => reports,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_ERROR);
        }
    };

    if let Err(e) = write_output(options.output.as_deref(), &format_reports(&reports)) {
        eprintln!("Error: {}", e);
        process::exit(EXIT_ERROR);
    }

    if reports.iter().all(Report::passed) {
        process::exit(EXIT_PASS);
    }
    process::exit(EXIT_FAIL);
}
