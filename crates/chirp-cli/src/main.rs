//! Chirp suite linker CLI
//!
//! Loads the named root classes and their closure from a classpath,
//! translates them into a suite, strips symbols for the requested suite
//! kind and reports what survived.

use anyhow::Context;
use chirp_suite::{Suite, SuiteKind};
use chirp_translator::options::RECOGNIZED;
use chirp_translator::{Properties, Translator};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod report;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SuiteKindArg {
    Application,
    Library,
    Extendable,
    Debuggable,
}

impl From<SuiteKindArg> for SuiteKind {
    fn from(arg: SuiteKindArg) -> SuiteKind {
        match arg {
            SuiteKindArg::Application => SuiteKind::Application,
            SuiteKindArg::Library => SuiteKind::Library,
            SuiteKindArg::Extendable => SuiteKind::Extendable,
            SuiteKindArg::Debuggable => SuiteKind::Debuggable,
        }
    }
}

#[derive(Parser)]
#[command(name = "chirp-link")]
#[command(about = "Link Chirp class definitions into a suite", long_about = None)]
#[command(version)]
struct Cli {
    /// Root classes to seed the closure with (internal names)
    #[arg(required_unless_present = "help_properties")]
    roots: Vec<String>,

    /// Classpath: ':'-separated list of class definition directories
    #[arg(short, long, default_value = ".")]
    classpath: String,

    /// Kind of suite to produce
    #[arg(short = 'k', long, value_enum, default_value = "application")]
    suite_kind: SuiteKindArg,

    /// Name of the produced suite
    #[arg(short, long, default_value = "suite")]
    name: String,

    /// Set a translator property (may repeat)
    #[arg(short = 'D', value_name = "KEY=VALUE", value_parser = parse_define)]
    define: Vec<(String, String)>,

    /// Write a JSON link report to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// List recognized translator properties and exit
    #[arg(long)]
    help_properties: bool,
}

fn parse_define(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

fn print_properties() {
    println!("Translator properties (set with -D<key>=<value>):");
    for &(key, default, help) in RECOGNIZED {
        println!("    {:<55} {}", format!("{}={}", key, default), help);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut props = Properties::from_env();
    for (key, value) in &cli.define {
        props.set(key, value);
    }

    let mut suite = Suite::bootstrap(&cli.name);
    for root in &cli.roots {
        suite
            .register_stub(root)
            .with_context(|| format!("bad root class '{}'", root))?;
    }

    let translator = Translator::open(suite, &cli.classpath, &props)
        .context("failed to open translation unit")?;
    let kind: SuiteKind = cli.suite_kind.into();
    let closed = translator
        .close(kind)
        .context("translation failed")?;
    let stripped = closed.strip(kind, &cli.name);

    let link_report = report::LinkReport::collect(&closed, &stripped, kind);
    link_report.print_summary();
    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&link_report)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.help_properties {
        print_properties();
        return;
    }
    if cli.roots.is_empty() {
        eprintln!("error: at least one root class is required");
        std::process::exit(2);
    }
    if let Err(e) = run(cli) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
