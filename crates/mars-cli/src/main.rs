//! Reference command-line binding for the MARS engine.
//!
//! Placement policy lives here, not in the engine: warrior 1 sits at
//! offset 0 and the rest are spaced evenly around the core.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use mars_core::{Battle, MarsConfig, Outcome};
use redcode::{parse_warrior_bytes, Dialect, Field, ParseOptions, Warrior};
#[cfg(test)]
use tempfile as _;

const HELP_TEXT: &str = "\
Usage: mars [options] <warrior>...
Options:
  --88              parse '88 loadfiles (modifiers are inferred)
  --core-size <n>   cells in the core (default 8000)
  --cycles <n>      cycles before a tie (default 80000)
  --processes <n>   per-warrior task limit (default 8000)
  --max-length <n>  maximum warrior length (default 100)
  --separation <n>  minimum placement separation (default 100)
  --help            print this help
Exit codes: 0 tie, 1..N winning warrior, >100 usage or load errors.";

const EXIT_USAGE: u8 = 101;
const EXIT_LOAD: u8 = 102;

#[derive(Debug, PartialEq, Eq)]
struct CliArgs {
    dialect: Dialect,
    config: MarsConfig,
    files: Vec<PathBuf>,
}

#[derive(Debug)]
enum ParsedArgs {
    Args(CliArgs),
    Help,
}

fn next_number(args: &mut impl Iterator<Item = OsString>, flag: &str) -> Result<u32, String> {
    let value = args
        .next()
        .ok_or_else(|| format!("missing value for {flag}"))?;
    value
        .to_string_lossy()
        .parse::<u32>()
        .map_err(|_| format!("invalid value for {flag}"))
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParsedArgs, String> {
    let mut dialect = Dialect::Icws94;
    let mut config = MarsConfig::default();
    let mut files = Vec::new();

    while let Some(arg) = args.next() {
        if arg == "--help" {
            return Ok(ParsedArgs::Help);
        }
        if arg == "--88" {
            dialect = Dialect::Icws88;
            continue;
        }
        if arg == "--core-size" {
            config.core_size = next_number(&mut args, "--core-size")?;
            continue;
        }
        if arg == "--cycles" {
            config.cycles_before_tie = next_number(&mut args, "--cycles")?;
            continue;
        }
        if arg == "--processes" {
            config.max_processes = next_number(&mut args, "--processes")?;
            continue;
        }
        if arg == "--max-length" {
            config.max_warrior_size = next_number(&mut args, "--max-length")?;
            continue;
        }
        if arg == "--separation" {
            config.min_separation = next_number(&mut args, "--separation")?;
            continue;
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }
        files.push(PathBuf::from(arg));
    }

    if files.len() < 2 {
        return Err(String::from("at least two warrior files are required"));
    }
    config.warriors = files.len() as u32;

    Ok(ParsedArgs::Args(CliArgs {
        dialect,
        config,
        files,
    }))
}

fn load_warriors(args: &CliArgs) -> Result<Vec<Warrior>, String> {
    let options = ParseOptions {
        dialect: args.dialect,
        strict: false,
        max_instructions: args.config.max_warrior_size as usize,
    };

    args.files
        .iter()
        .map(|path| {
            let bytes =
                std::fs::read(path).map_err(|error| format!("{}: {error}", path.display()))?;
            parse_warrior_bytes(&bytes, &options)
                .map_err(|error| format!("{}:{error}", path.display()))
        })
        .collect()
}

/// Warrior 1 at offset 0, the rest spaced evenly around the core.
fn placements(config: &MarsConfig) -> Vec<Field> {
    let stride = Field::from(config.core_size) / Field::from(config.warriors);
    (0..Field::from(config.warriors)).map(|k| k * stride).collect()
}

fn battle_exit_code(args: &CliArgs) -> Result<u8, String> {
    let warriors = load_warriors(args)?;
    let mut battle = Battle::new(args.config, &warriors, &placements(&args.config))
        .map_err(|error| error.to_string())?;

    // The cycle limit guarantees a terminal outcome within this budget.
    match battle.run(args.config.cycles_before_tie) {
        Outcome::Win(index) => {
            let label = warriors[index]
                .name()
                .map_or_else(|| format!("warrior {}", index + 1), str::to_string);
            println!("{label} wins after {} cycles", battle.cycles());
            Ok((index + 1).min(100) as u8)
        }
        Outcome::Tie => {
            println!("tie after {} cycles", battle.cycles());
            Ok(0)
        }
        Outcome::Paused => unreachable!("the cycle limit bounds the run budget"),
    }
}

fn main() -> ExitCode {
    match parse_args(env::args_os().skip(1)) {
        Ok(ParsedArgs::Help) => {
            println!("{HELP_TEXT}");
            ExitCode::SUCCESS
        }
        Ok(ParsedArgs::Args(args)) => match battle_exit_code(&args) {
            Ok(code) => ExitCode::from(code),
            Err(error) => {
                eprintln!("error: {error}");
                ExitCode::from(EXIT_LOAD)
            }
        },
        Err(error) => {
            eprintln!("error: {error}");
            eprintln!("{HELP_TEXT}");
            ExitCode::from(EXIT_USAGE)
        }
    }
}
