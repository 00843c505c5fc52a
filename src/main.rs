mod report;

use querulus::{ExpandedQuery, Options, RequestContext, SelectionStrategy, compile_with, parse_query};
use std::io::{self, IsTerminal, Read};

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let rules_text = match std::fs::read_to_string(&config.rules_path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("error: cannot read rules file '{}': {err}", config.rules_path);
            std::process::exit(2);
        }
    };

    let options = Options {
        ignore_case: !config.case_sensitive,
        input_delimiter: config.delimiter.clone(),
        selection: config.selection,
    };
    let rewriter = match compile_with(&rules_text, &options) {
        Ok(rewriter) => rewriter,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };

    let mut query = ExpandedQuery::new(parse_query(&config.query));
    let mut ctx = if config.debug { RequestContext::with_debug() } else { RequestContext::new() };
    if let Err(err) = rewriter.rewrite(&mut query, &mut ctx) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    report::print_rewrite(&config.query, &query, &ctx, config.color);
}

struct CliConfig {
    rules_path: String,
    query: String,
    delimiter: String,
    case_sensitive: bool,
    selection: SelectionStrategy,
    debug: bool,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut rules_path: Option<String> = None;
    let mut query: Option<String> = None;
    let mut delimiter = "\t".to_string();
    let mut case_sensitive = false;
    let mut selection = SelectionStrategy::TopByPriority;
    let mut debug = false;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("querulus {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--debug" => debug = true,
            "--case-sensitive" => case_sensitive = true,
            "--first-match" => selection = SelectionStrategy::FirstMatchWins,
            "--delimiter" => {
                delimiter = args.next().ok_or_else(|| "error: --delimiter expects a value".to_string())?;
            }
            "--rules" | "-r" => {
                let value = args.next().ok_or_else(|| "error: --rules expects a path".to_string())?;
                rules_path = Some(value);
            }
            "--query" | "-q" => {
                let value = args.next().ok_or_else(|| "error: --query expects a value".to_string())?;
                if query.is_some() {
                    return Err("error: query provided multiple times".to_string());
                }
                query = Some(value);
            }
            "--" => {
                let rest = args.collect::<Vec<_>>().join(" ");
                if !rest.is_empty() {
                    if query.is_some() {
                        return Err("error: query provided multiple times".to_string());
                    }
                    query = Some(rest);
                }
                break;
            }
            other if !other.starts_with('-') && query.is_none() => {
                query = Some(other.to_string());
            }
            other => return Err(format!("error: unrecognized argument '{other}'")),
        }
    }

    let rules_path = rules_path.ok_or_else(|| "error: --rules <file> is required".to_string())?;
    let query = match query {
        Some(query) => query,
        None => read_stdin_query()?,
    };

    Ok(CliConfig { rules_path, query, delimiter, case_sensitive, selection, debug, color })
}

fn read_stdin_query() -> Result<String, String> {
    if io::stdin().is_terminal() {
        return Err("error: no query given; pass one as an argument or pipe it on stdin".to_string());
    }
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|err| format!("error: failed to read stdin: {err}"))?;
    let query = buffer.trim().to_string();
    if query.is_empty() {
        return Err("error: empty query on stdin".to_string());
    }
    Ok(query)
}

fn print_help() {
    println!(
        "querulus - rule-based query rewriting

USAGE:
    querulus --rules <file> [OPTIONS] [QUERY]

OPTIONS:
    -r, --rules <file>       rules file (required)
    -q, --query <text>       query to rewrite (also: positional, stdin, or after --)
        --delimiter <s>      input segment delimiter in rule lines (default: tab)
        --case-sensitive     do not lower-case rule keys and lookups
        --first-match        resolve overlaps with first-match-wins instead of
                             longest-match-wins
        --debug              collect and print per-action debug lines
        --color / --no-color force colored output on or off
    -h, --help               print this help
    -V, --version            print the version"
    );
}
