//! Timesdash CLI - Turn TIMES result workbooks into dashboard charts
//!
//! # Main Commands
//!
//! ```bash
//! timesdash transform results.xlsx           # Chart every known sheet, print report JSON
//! timesdash transform emission.csv --unit mt # Same, values in megatonnes
//! ```
//!
//! # Inspection Commands
//!
//! ```bash
//! timesdash parse results.xlsx      # Decoded sheets as JSON
//! timesdash scenarios results.xlsx  # Scenarios found per sheet
//! timesdash rules                   # Registered category rules
//! timesdash labels                  # Code fragment labels
//! timesdash check-config rules.json # Validate a rules file
//! timesdash example-config          # Print the built-in rules file
//! ```

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use timesdash::api::logs::set_quiet;
use timesdash::rules::default_rules_json;
use timesdash::{
    list_scenarios, parse_file_auto, transform_file, KeyDerivation, PipelineError,
    ReportStatus, RuleRegistry, SourceFormat, TransformOptions, UnitScale,
};

#[derive(Parser)]
#[command(name = "timesdash")]
#[command(about = "Turn TIMES model output into dashboard chart series", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode an upload and chart every sheet with a rule
    Transform {
        /// Input workbook or CSV file
        input: PathBuf,

        /// Unit scale for values: kt, mt or gt
        #[arg(short, long)]
        unit: Option<String>,

        /// Only keep rows of this scenario
        #[arg(short, long)]
        scenario: Option<String>,

        /// Rules file (default: $TIMESDASH_RULES or built-in)
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Output file for the report (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Don't echo progress to stderr
        #[arg(short, long)]
        quiet: bool,
    },

    /// Decode a file and output its sheets as JSON
    Parse {
        /// Input workbook or CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the scenarios of each sheet
    Scenarios {
        /// Input workbook or CSV file
        input: PathBuf,
    },

    /// Show registered category rules
    Rules {
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },

    /// Show code fragment labels
    Labels {
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },

    /// Validate a rules configuration file
    CheckConfig {
        /// Rules JSON file
        path: PathBuf,
    },

    /// Print the built-in rules configuration
    ExampleConfig,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Transform {
            input,
            unit,
            scenario,
            rules,
            output,
            quiet,
        } => cmd_transform(
            &input,
            unit.as_deref(),
            scenario,
            rules.as_deref(),
            output.as_deref(),
            quiet,
        ),

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Scenarios { input } => cmd_scenarios(&input),

        Commands::Rules { rules } => cmd_rules(rules.as_deref()),

        Commands::Labels { rules } => cmd_labels(rules.as_deref()),

        Commands::CheckConfig { path } => cmd_check_config(&path),

        Commands::ExampleConfig => {
            println!("{}", default_rules_json());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn load_registry(path: Option<&Path>) -> Result<RuleRegistry, PipelineError> {
    let registry = match path {
        Some(p) => RuleRegistry::from_file(p)?,
        None => RuleRegistry::from_env()?,
    };
    Ok(registry)
}

fn cmd_transform(
    input: &Path,
    unit: Option<&str>,
    scenario: Option<String>,
    rules: Option<&Path>,
    output: Option<&Path>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    set_quiet(quiet);

    let unit_scale = unit
        .map(|u| u.parse::<UnitScale>())
        .transpose()
        .map_err(PipelineError::InvalidOption)?;
    let options = TransformOptions {
        unit_scale,
        scenario,
    };
    let registry = load_registry(rules)?;

    let report = transform_file(input, &registry, &options);

    if !quiet {
        for sheet in &report.sheets {
            eprintln!(
                "   {:<12} {:<8} {}",
                sheet.sheet,
                sheet.status,
                sheet.detail.as_deref().unwrap_or("")
            );
        }
    }

    let json = serde_json::to_string_pretty(&report)?;
    write_output(&json, output)?;

    if report.status == ReportStatus::Error {
        return Err(report.message.into());
    }
    eprintln!("✨ {}", report.message);
    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing: {}", input.display());

    let workbook = parse_file_auto(input)?;

    if let SourceFormat::Csv {
        encoding,
        delimiter,
    } = &workbook.format
    {
        eprintln!("   Encoding: {}", encoding);
        eprintln!("   Delimiter: '{}'", format_delimiter(*delimiter));
    }
    for table in &workbook.tables {
        eprintln!(
            "   Sheet '{}': {} rows, columns: {}",
            table.name,
            table.len(),
            table.columns.join(", ")
        );
    }
    eprintln!("✅ Parsed {} sheet(s)", workbook.tables.len());

    let json = serde_json::to_string_pretty(&workbook)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_scenarios(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let workbook = parse_file_auto(input)?;

    for table in &workbook.tables {
        let scenarios = list_scenarios(table);
        if scenarios.is_empty() {
            println!("{}: (no scenario column)", table.name);
        } else {
            println!("{}: {}", table.name, scenarios.join(", "));
        }
    }
    Ok(())
}

fn cmd_rules(rules: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let registry = load_registry(rules)?;

    println!("📋 {} category rules:\n", registry.len());
    for rule in registry.rules() {
        let filter = rule
            .row_filter
            .as_ref()
            .map(|f| format!("{} = {}", f.column, f.equals))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<12} {:<28} {:<20} {:?}/{:?}  \"{}\"",
            rule.category,
            describe_key(&rule.key),
            filter,
            rule.aggregation,
            rule.chart.shape,
            rule.chart.title
        );
    }
    Ok(())
}

fn describe_key(key: &KeyDerivation) -> String {
    match key {
        KeyDerivation::FirstN { n } => format!("first {}", n),
        KeyDerivation::LastN { n, strip_suffixes } if strip_suffixes.is_empty() => {
            format!("last {}", n)
        }
        KeyDerivation::LastN { n, strip_suffixes } => {
            format!("strip {}, last {}", strip_suffixes.join("|"), n)
        }
        KeyDerivation::Capture { pattern, .. } => format!("capture {}", pattern),
        KeyDerivation::Total => "total".to_string(),
    }
}

fn cmd_labels(rules: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let registry = load_registry(rules)?;

    for (code, label) in registry.labels().entries().0 {
        println!("  {:<6} {}", code, label);
    }
    Ok(())
}

fn cmd_check_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let registry = RuleRegistry::from_file(path)?;
    eprintln!(
        "✅ {} is valid: {} rules, {} labels",
        path.display(),
        registry.len(),
        registry.labels().len()
    );
    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
