//! wherepath - turn element predicates into XPath location paths
//!
//! This is the CLI entry point: it gathers the predicate, binds variables
//! and prints the translated XPath (or the query model).

mod cli;

use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use wherepath_core::{parse, Bindings, Expr, Translator};

use cli::Args;
use clap::Parser;

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

/// Split `NAME=VALUE`; VALUE is read as JSON when it parses, else as a string
fn parse_binding(binding: &str) -> Result<(String, Value)> {
    let (name, raw) = binding
        .split_once('=')
        .with_context(|| format!("invalid --var '{}', expected NAME=VALUE", binding))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("invalid --var '{}', empty name", binding);
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((name.to_string(), value))
}

fn read_stdin() -> Result<String> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;
    Ok(input)
}

/// Load the predicate tree from the arguments or stdin
fn load_predicate(args: &Args) -> Result<Expr> {
    if let Some(path) = &args.json {
        let json = if path == "-" {
            read_stdin()?
        } else {
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?
        };
        return serde_json::from_str(&json).context("invalid predicate JSON");
    }

    let source = match &args.predicate {
        Some(predicate) => predicate.clone(),
        None if !atty::is(atty::Stream::Stdin) => read_stdin()?,
        None => bail!("no predicate given (pass it as an argument or on stdin)"),
    };

    let mut bindings = Bindings::new();
    for binding in &args.vars {
        let (name, value) = parse_binding(binding)?;
        log::debug!("binding {} = {}", name, value);
        bindings.bind(name, value);
    }

    parse(source.trim(), &bindings).context("invalid predicate")
}

fn run(args: Args) -> Result<String> {
    if args.json.is_some() && !args.vars.is_empty() {
        log::warn!("--var has no effect with --json");
    }

    let predicate = load_predicate(&args)?;
    let translator = Translator::new().with_strict(args.strict);

    if args.model {
        let model = translator.build_model(&predicate)?;
        return Ok(serde_json::to_string_pretty(&model)?);
    }

    Ok(translator.translate(&predicate)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_binding_json_and_plain() {
        assert_eq!(parse_binding("pos=5").unwrap(), ("pos".to_string(), Value::from(5)));
        assert_eq!(
            parse_binding("tag=tr").unwrap(),
            ("tag".to_string(), Value::String("tr".to_string()))
        );
        assert_eq!(
            parse_binding("row={\"index\": 2}").unwrap().1,
            serde_json::json!({"index": 2})
        );
        assert_eq!(parse_binding("eq=a=b").unwrap().1, Value::String("a=b".to_string()));
    }

    #[test]
    fn test_parse_binding_rejects_malformed() {
        assert!(parse_binding("novalue").is_err());
        assert!(parse_binding("=5").is_err());
    }

    #[test]
    fn test_run_translates_with_vars() {
        let args = Args::parse_from([
            "wherepath",
            "TargetElementName == \"td\" && Position == pos",
            "--var",
            "pos=3",
        ]);
        assert_eq!(run(args).unwrap(), "//td[position()=3]");
    }

    #[test]
    fn test_run_strict_reports_unsupported() {
        let args = Args::parse_from([
            "wherepath",
            "TargetElementName == \"td\" && !(Position == 1)",
            "--strict",
        ]);
        let err = run(args).unwrap_err();
        assert!(err.to_string().contains("unsupported predicate"));
    }

    #[test]
    fn test_run_model_output() {
        let args = Args::parse_from(["wherepath", "TargetElementName == \"li\"", "--model"]);
        let output = run(args).unwrap();
        let model: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(model["name"], "li");
    }
}
