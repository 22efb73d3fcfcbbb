use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use zwo_core::config::DefaultsConfig;
use zwo_core::*;

/// Exit status for validation findings
const EXIT_INVALID: u8 = 1;
/// Exit status for usage, missing input and compile errors
const EXIT_ERROR: u8 = 2;

#[derive(Parser)]
#[command(name = "zwo")]
#[command(about = "Compile and validate Zwift .zwo workout files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

/// Reference catalog locations, overriding the config
#[derive(Args, Clone, Debug, Default)]
struct CatalogArgs {
    /// Path to tag_attr_usage.json
    #[arg(long)]
    tag_attr_usage: Option<PathBuf>,

    /// Path to descriptions.yaml
    #[arg(long)]
    descriptions: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a YAML/JSON plan into a .zwo file
    Compile {
        /// Path to the plan (.json, otherwise YAML)
        #[arg(long)]
        plan: PathBuf,

        /// Output directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Validate the written file
        #[arg(long)]
        validate: bool,

        #[command(flatten)]
        catalog: CatalogArgs,
    },

    /// Create a .zwo file from a plain text description
    Create {
        /// Plain text workout description
        #[arg(long)]
        text: String,

        /// Workout name (defaults to the text)
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        author: Option<String>,

        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Validate the written file
        #[arg(long)]
        validate: bool,

        #[command(flatten)]
        catalog: CatalogArgs,
    },

    /// Validate .zwo files against the reference catalog
    Validate {
        /// File or directory containing .zwo files
        #[arg(long)]
        path: PathBuf,

        /// Warn when attributes are not listed for a tag in tag_attr_usage.json
        #[arg(long)]
        warn_mismatch: bool,

        #[command(flatten)]
        catalog: CatalogArgs,
    },
}

fn main() -> ExitCode {
    // Initialize logging
    zwo_core::logging::init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Compile {
            plan,
            output,
            validate,
            catalog,
        } => {
            let output = output.unwrap_or_else(|| config.output.dir.clone());
            cmd_compile(&plan, &output, validate.then_some(&catalog), &config)
        }
        Commands::Create {
            text,
            name,
            author,
            output_dir,
            validate,
            catalog,
        } => {
            let output = output_dir.unwrap_or_else(|| config.output.dir.clone());
            let mut defaults = config.defaults.clone();
            if let Some(author) = author {
                defaults.author = author;
            }
            let name = name.unwrap_or_else(|| text.clone());
            cmd_create(
                &text,
                &name,
                &defaults,
                &output,
                validate.then_some(&catalog),
                &config,
            )
        }
        Commands::Validate {
            path,
            warn_mismatch,
            catalog,
        } => cmd_validate(&path, warn_mismatch, &catalog, &config),
    }
}

fn cmd_compile(
    plan_path: &Path,
    output: &Path,
    validate_with: Option<&CatalogArgs>,
    config: &Config,
) -> Result<ExitCode> {
    if !plan_path.exists() {
        eprintln!("error: missing plan {}", plan_path.display());
        return Ok(ExitCode::from(EXIT_ERROR));
    }

    // Catalog problems must surface before anything is written
    let catalog = validate_with.map(|args| args.load(config)).transpose()?;

    let plan = load_plan(plan_path)?;
    let document = compile_plan(&plan, &config.defaults)?;
    let path = document.write_to_dir(output)?;

    finish_written(&path, catalog.as_ref())
}

fn cmd_create(
    text: &str,
    name: &str,
    defaults: &DefaultsConfig,
    output: &Path,
    validate_with: Option<&CatalogArgs>,
    config: &Config,
) -> Result<ExitCode> {
    let catalog = validate_with.map(|args| args.load(config)).transpose()?;

    let document = build_workout(text, name, defaults)?;
    let path = document.write_to_dir(output)?;

    finish_written(&path, catalog.as_ref())
}

fn cmd_validate(
    path: &Path,
    warn_mismatch: bool,
    catalog_args: &CatalogArgs,
    config: &Config,
) -> Result<ExitCode> {
    let catalog = catalog_args.load(config)?;
    let files = collect_documents(path)?;
    let reports = validate_documents(&files, &catalog, warn_mismatch);

    if !print_findings(&reports) {
        let count: usize = reports.iter().map(|r| r.findings.errors.len()).sum();
        eprintln!("validation failed: {} error(s)", count);
        return Ok(ExitCode::from(EXIT_INVALID));
    }

    println!("validation ok: {} file(s)", files.len());
    Ok(ExitCode::SUCCESS)
}

/// Optionally validate a freshly written file, then print its path
fn finish_written(path: &Path, catalog: Option<&SchemaCatalog>) -> Result<ExitCode> {
    if let Some(catalog) = catalog {
        let report = zwo_core::validate::validate_file(path, catalog, false);
        if !print_findings(std::slice::from_ref(&report)) {
            return Ok(ExitCode::from(EXIT_INVALID));
        }
    }

    println!("{}", path.display());
    Ok(ExitCode::SUCCESS)
}

/// Print errors, or warnings when there are no errors; true when clean
fn print_findings(reports: &[DocumentReport]) -> bool {
    let errors: Vec<String> = reports.iter().flat_map(DocumentReport::error_lines).collect();
    if !errors.is_empty() {
        for error in &errors {
            eprintln!("{}", error);
        }
        return false;
    }

    for warning in reports.iter().flat_map(DocumentReport::warning_lines) {
        eprintln!("{}", warning);
    }
    true
}

impl CatalogArgs {
    fn load(&self, config: &Config) -> Result<SchemaCatalog> {
        let usage = self
            .tag_attr_usage
            .clone()
            .unwrap_or_else(|| config.catalog.tag_attr_usage.clone());
        let descriptions = self
            .descriptions
            .clone()
            .unwrap_or_else(|| config.catalog.descriptions.clone());

        let catalog = SchemaCatalog::load(&usage, &descriptions)?;
        let errors = catalog.validate();
        if !errors.is_empty() {
            eprintln!("Catalog validation errors:");
            for error in errors {
                eprintln!("  - {}", error);
            }
            return Err(Error::Catalog("Invalid catalog".into()));
        }

        tracing::debug!("Using catalog {:?} + {:?}", usage, descriptions);
        Ok(catalog)
    }
}
