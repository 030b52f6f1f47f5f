mod debug_report;

use std::io::{self, IsTerminal, Read};
use tracing_subscriber::EnvFilter;
use undertone::{AnalysisOptions, Analyzer, AttachmentStyle, EngineConfig, HelperField, RuleSet};

fn main() {
    init_tracing();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let analyzer = Analyzer::new(config.engine, RuleSet::builtin());
    let options = AnalysisOptions { attachment: config.attachment, ..AnalysisOptions::default() };

    let rendered = match config.output {
        Output::Report => {
            debug_report::print_report(&analyzer.analyze(&config.input, &options), config.color);
            return;
        }
        Output::Json => analyzer.process(&config.input, &options).to_json(),
        Output::Rich => analyzer.analyze(&config.input, &options).to_json(),
        Output::Helper(fields) => {
            serde_json::to_string(&*analyzer.helper(&config.input, fields)).map_err(undertone::Error::from)
        }
    };
    match rendered {
        Ok(json) => println!("{json}"),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("UNDERTONE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

enum Output {
    Report,
    Json,
    Rich,
    Helper(HelperField),
}

struct CliConfig {
    input: String,
    engine: EngineConfig,
    attachment: Option<AttachmentStyle>,
    output: Output,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut input: Option<String> = None;
    let mut engine = EngineConfig::default();
    let mut attachment = None;
    let mut output = Output::Report;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1).peekable();

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (arg.clone(), None),
        };
        let mut value = |name: &str| -> Result<String, String> {
            match inline.clone() {
                Some(v) => Ok(v),
                None => args.next().ok_or_else(|| format!("error: {name} expects a value")),
            }
        };

        match flag.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("undertone {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--json" => output = Output::Json,
            "--rich" => output = Output::Rich,
            "--helper" => {
                let fields = HelperField::parse_list(&value("--helper")?).map_err(|err| format!("error: {err}"))?;
                output = Output::Helper(fields);
            }
            "--max-chars" => engine.budget.max_chars = parse_number(&value("--max-chars")?, "--max-chars")?,
            "--max-tokens" => engine.budget.max_tokens = parse_number(&value("--max-tokens")?, "--max-tokens")?,
            "--max-ms" => engine.budget.max_millis = parse_number(&value("--max-ms")?, "--max-ms")?,
            "--attachment" => attachment = Some(parse_attachment(&value("--attachment")?)?),
            "--input" | "-i" => {
                let text = value("--input")?;
                if input.is_some() {
                    return Err("error: input provided multiple times".to_string());
                }
                input = Some(text);
            }
            "--" => {
                let rest = args.collect::<Vec<_>>().join(" ");
                if !rest.trim().is_empty() {
                    if input.is_some() {
                        return Err("error: input provided multiple times".to_string());
                    }
                    input = Some(rest);
                }
                break;
            }
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                let rest = std::iter::once(arg).chain(args).collect::<Vec<_>>().join(" ");
                if input.is_some() {
                    return Err("error: input provided multiple times".to_string());
                }
                input = Some(rest);
                break;
            }
        }
    }

    let input = match input {
        Some(value) => value,
        None => read_stdin_input()?,
    };

    if input.trim().is_empty() {
        return Err(format!("error: no input provided\n\n{}", help_text()));
    }

    Ok(CliConfig { input, engine, attachment, output, color })
}

fn parse_number<T: std::str::FromStr>(value: &str, flag: &str) -> Result<T, String> {
    value.parse().map_err(|_| format!("error: invalid {flag} '{value}' (expected a non-negative integer)"))
}

fn parse_attachment(value: &str) -> Result<AttachmentStyle, String> {
    serde_json::from_value(serde_json::Value::String(value.to_ascii_lowercase()))
        .map_err(|_| format!("error: invalid --attachment '{value}' (secure, anxious, avoidant, disorganized)"))
}

fn read_stdin_input() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    Ok(buffer)
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "undertone {version}

Rule-based message analysis CLI.

Usage:
  undertone [OPTIONS] [--] <input...>
  undertone [OPTIONS] --input <text>

Options:
  -i, --input <text>         Message to analyze. If omitted, reads remaining args
                             or stdin when no args are provided.
  --json                     Print the compact result as JSON.
  --rich                     Print the full result as JSON.
  --helper <fields>          Print a projection, e.g. context,tone,sarcasm or all.
  --attachment <style>       secure, anxious, avoidant or disorganized.
  --max-chars <n>            Character budget. Default: {max_chars}
  --max-tokens <n>           Token budget. Default: {max_tokens}
  --max-ms <n>               Advisory time budget in milliseconds. Default: {max_ms}
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Environment:
  UNDERTONE_LOG              tracing filter, e.g. debug or undertone=trace (default: warn).

Exit codes:
  0  Success.
  1  Internal error.
  2  Invalid arguments or missing input.
",
        version = env!("CARGO_PKG_VERSION"),
        max_chars = EngineConfig::default().budget.max_chars,
        max_tokens = EngineConfig::default().budget.max_tokens,
        max_ms = EngineConfig::default().budget.max_millis,
    )
}
