use anyhow::{Result, anyhow};
use std::env;

use joboutput::CounterRange;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    First,
    Last,
    Page(u64),
    Range(CounterRange),
}

#[derive(Debug, Clone)]
pub struct CliArgs {
    pub endpoint: String,
    pub selection: Selection,          // --first/--last/--page/--range
    pub filters: Vec<(String, String)>, // --filter key=value
    pub json_output: bool,             // --json
}

impl CliArgs {
    pub fn parse() -> Result<Self> {
        let args: Vec<String> = env::args().collect();
        Self::parse_from(&args[1..])
    }

    /// Parse from a slice of arguments (for testing)
    pub fn parse_from(args: &[String]) -> Result<Self> {
        let mut endpoint = None;
        let mut selection = Selection::Last;
        let mut filters = Vec::new();
        let mut json_output = false;

        let mut i = 0;
        while i < args.len() {
            let arg = &args[i];

            match arg.as_str() {
                "--first" => selection = Selection::First,
                "--last" => selection = Selection::Last,
                "--page" => {
                    let value = value_for(args, &mut i)?;
                    let page = value
                        .parse()
                        .map_err(|_| anyhow!("--page expects a number, got {value}"))?;
                    selection = Selection::Page(page);
                }
                "--range" => {
                    let value = value_for(args, &mut i)?;
                    selection = Selection::Range(parse_range(value)?);
                }
                "--filter" => {
                    let value = value_for(args, &mut i)?;
                    let (key, val) = value
                        .split_once('=')
                        .ok_or_else(|| anyhow!("--filter expects key=value, got {value}"))?;
                    filters.push((key.to_string(), val.to_string()));
                }
                "--json" => json_output = true,
                unknown if unknown.starts_with("--") => {
                    return Err(anyhow!("Unknown argument: {unknown}"));
                }
                positional => {
                    if endpoint.is_some() {
                        return Err(anyhow!("Unexpected argument: {positional}"));
                    }
                    endpoint = Some(positional.to_string());
                }
            }

            i += 1;
        }

        let endpoint = endpoint.ok_or_else(|| anyhow!("Missing event endpoint"))?;
        Ok(CliArgs {
            endpoint,
            selection,
            filters,
            json_output,
        })
    }
}

fn value_for<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("{flag} requires a value"))
}

fn parse_range(value: &str) -> Result<CounterRange> {
    let (low, high) = value
        .split_once(':')
        .ok_or_else(|| anyhow!("--range expects LOW:HIGH, got {value}"))?;
    let low = low.trim().parse().map_err(|_| anyhow!("Bad range start: {low}"))?;
    let high = high.trim().parse().map_err(|_| anyhow!("Bad range end: {high}"))?;
    Ok(CounterRange::new(low, high))
}
