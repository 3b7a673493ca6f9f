use std::env;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context};

use regex_lint::logging::init_tracing;
use regex_lint::{
    AnalysisConfig, ConsumptionMode, Finding, FlagSet, PatternSite, PatternSource, RegexChecker,
    ResolvedPattern,
};

const USAGE: &str =
    "usage: regex-lint [--config FILE] [--flags LETTERS] [--find|--match] [--json] [-E PATTERN]";

struct Options {
    config: Option<PathBuf>,
    flags: FlagSet,
    consumption: ConsumptionMode,
    json: bool,
    pattern: Option<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Options> {
    let mut options = Options {
        config: None,
        flags: FlagSet::empty(),
        consumption: ConsumptionMode::Unknown,
        json: false,
        pattern: None,
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config needs a file")?;
                options.config = Some(PathBuf::from(path));
            }
            "--flags" => {
                let letters = args.next().context("--flags needs letters")?;
                options.flags = FlagSet::from_letters(&letters);
            }
            "--find" => options.consumption = ConsumptionMode::FirstMatch,
            "--match" => options.consumption = ConsumptionMode::FullMatch,
            "--json" => options.json = true,
            "-E" => options.pattern = Some(args.next().context("-E needs a pattern")?),
            other => bail!("unexpected argument '{other}'\n{USAGE}"),
        }
    }
    Ok(options)
}

/// Patterns to check, one per line. Columns are 1-based.
fn sites(options: &Options) -> anyhow::Result<Vec<PatternSite>> {
    let site = |text: String, line: u32| {
        PatternSite::new(
            PatternSource::Known(ResolvedPattern::single_line(text, line, 1)),
            options.flags,
            options.consumption,
        )
    };
    if let Some(pattern) = &options.pattern {
        return Ok(vec![site(pattern.clone(), 1)]);
    }
    let mut sites = Vec::new();
    for (index, line) in io::stdin().lock().lines().enumerate() {
        let line = line.context("failed to read patterns from stdin")?;
        sites.push(site(line, index as u32 + 1));
    }
    Ok(sites)
}

fn print_text(findings: &[Finding]) {
    for finding in findings {
        let start = finding.primary_span.start;
        println!(
            "{}:{}: [{}] {}",
            start.line, start.column, finding.rule_id, finding.primary_message
        );
        for secondary in &finding.secondary {
            let at = secondary.span.start;
            match &secondary.message {
                Some(message) => println!("  {}:{}: {}", at.line, at.column, message),
                None => println!("  {}:{}", at.line, at.column),
            }
        }
    }
}

fn run() -> anyhow::Result<bool> {
    let options = parse_args(env::args().skip(1))?;
    let config = match &options.config {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    let checker = RegexChecker::new(&config).context("invalid configuration")?;

    let findings: Vec<Finding> = checker
        .check_sites(&sites(&options)?)
        .into_iter()
        .flatten()
        .collect();

    if options.json {
        println!("{}", serde_json::to_string_pretty(&findings)?);
    } else {
        print_text(&findings);
    }
    Ok(!findings.is_empty())
}

fn main() {
    init_tracing();
    match run() {
        Ok(true) => process::exit(1),
        Ok(false) => process::exit(0),
        Err(err) => {
            eprintln!("error: {err:#}");
            process::exit(2)
        }
    }
}
