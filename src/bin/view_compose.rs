//! Simple CLI for view composition
//!
//! Compiles, validates and fingerprints views from a JSON source bundle.

use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use view_compose::model::Context;
use view_compose::{LogLevel, MemorySourceStore, SourceBundle, ViewEngine, validation};

#[derive(Parser)]
#[command(name = "view-compose")]
#[command(about = "Compile UI views from base definitions, child views and extensions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a view and print the resulting artifact
    Compile {
        /// Name of the view to compile
        view: String,
        /// JSON file with `views` and `extensions`
        #[arg(short, long)]
        bundle: PathBuf,
        /// Evaluation context: inline JSON object or path to a JSON file
        #[arg(short, long)]
        context: Option<String>,
        /// Pretty-print JSON output
        #[arg(short, long)]
        pretty: bool,
        /// Suppress informational messages
        #[arg(short, long)]
        quiet: bool,
    },
    /// Validate every view and extension of a bundle
    Validate {
        /// JSON file with `views` and `extensions`
        #[arg(short, long)]
        bundle: PathBuf,
        /// Suppress informational messages
        #[arg(short, long)]
        quiet: bool,
    },
    /// Print the input fingerprint of a view
    Fingerprint {
        /// Name of the view
        view: String,
        /// JSON file with `views` and `extensions`
        #[arg(short, long)]
        bundle: PathBuf,
        /// Evaluation context: inline JSON object or path to a JSON file
        #[arg(short, long)]
        context: Option<String>,
    },
}

fn main() {
    human_panic::setup_panic!();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Compile {
            view,
            bundle,
            context,
            pretty,
            quiet,
        } => handle_compile(&view, &bundle, context.as_deref(), pretty, quiet),
        Commands::Validate { bundle, quiet } => handle_validate(&bundle, quiet),
        Commands::Fingerprint {
            view,
            bundle,
            context,
        } => handle_fingerprint(&view, &bundle, context.as_deref()),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn load_bundle(path: &Path) -> Result<SourceBundle> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading bundle '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing bundle '{}'", path.display()))
}

fn load_context(arg: Option<&str>) -> Result<Context> {
    let Some(arg) = arg else {
        return Ok(Context::new());
    };
    let text = if arg.trim_start().starts_with('{') {
        arg.to_string()
    } else {
        fs::read_to_string(arg).with_context(|| format!("reading context '{arg}'"))?
    };
    match serde_json::from_str::<serde_json::Value>(&text).context("parsing context")? {
        serde_json::Value::Object(map) => Ok(map),
        other => bail!("context must be a JSON object, got {other}"),
    }
}

fn engine_for(path: &Path) -> Result<ViewEngine> {
    let store = MemorySourceStore::from_bundle(load_bundle(path)?);
    Ok(ViewEngine::new(Arc::new(store)))
}

fn handle_compile(
    view: &str,
    bundle: &Path,
    context: Option<&str>,
    pretty: bool,
    quiet: bool,
) -> Result<()> {
    let engine = engine_for(bundle)?;
    let context = load_context(context)?;
    let artifact = engine.compile(view, &context)?;

    if !quiet {
        eprintln!("View: {view}");
        eprintln!("Applied extensions: {:?}", artifact.applied_extension_ids);
        for entry in artifact.compile_log.entries() {
            eprintln!("{entry}");
        }
    }

    let output = if pretty {
        serde_json::to_string_pretty(&artifact)?
    } else {
        serde_json::to_string(&artifact)?
    };
    println!("{output}");

    if artifact.compile_log.count(LogLevel::Error) > 0 && !quiet {
        eprintln!("⚠ compiled with errors");
    }
    Ok(())
}

fn handle_validate(bundle: &Path, quiet: bool) -> Result<()> {
    let bundle = load_bundle(bundle)?;
    let mut problems = 0usize;

    for view in &bundle.views {
        for error in validation::validate_view(view) {
            problems += 1;
            eprintln!("✗ view '{}': {error}", view.name);
        }
    }
    for ext in &bundle.extensions {
        for error in validation::validate_extension(ext) {
            problems += 1;
            eprintln!("✗ extension {} ({}): {error}", ext.id, ext.target_name);
        }
    }

    if problems > 0 {
        bail!("{problems} validation problem(s)");
    }
    if quiet {
        println!("VALID");
    } else {
        println!(
            "✓ {} view(s) and {} extension(s) are valid",
            bundle.views.len(),
            bundle.extensions.len()
        );
    }
    Ok(())
}

fn handle_fingerprint(view: &str, bundle: &Path, context: Option<&str>) -> Result<()> {
    let engine = engine_for(bundle)?;
    let context = load_context(context)?;
    println!("{}", engine.fingerprint(view, &context)?);
    Ok(())
}
