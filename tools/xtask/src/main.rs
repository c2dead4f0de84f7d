//! Workspace automation tasks.
//!
//! Run with: `cargo xtask <command>`

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::Path;
use std::process::Command;

/// Template files every deployment flow reads at runtime.
const REQUIRED_TEMPLATES: &[&str] = &[
    "templates/files/Notebooks/CreateLakehouseTables.py",
    "templates/files/Reports/definition.pbir",
    "templates/files/Reports/product_sales_summary.json",
    "templates/files/SemanticModels/definition.pbism",
    "templates/items/Product Sales DirectLake Model on Onelake.SemanticModel/.platform",
    "templates/web/EmbedReport.html",
];

#[derive(Parser)]
#[command(name = "xtask", about = "fabdeploy workspace automation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all CI checks locally
    Ci,
    /// Validate workspace conventions
    Lint,
    /// Verify the bundled template tree is complete
    Templates,
    /// Generate coverage report
    Coverage,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ci => run_ci(),
        Commands::Lint => run_lint(),
        Commands::Templates => check_templates(),
        Commands::Coverage => run_coverage(),
    }
}

fn run_ci() -> Result<()> {
    println!("Running CI checks...\n");

    run_cmd("cargo", &["fmt", "--check"])?;
    run_cmd("cargo", &["clippy", "--workspace", "--", "-D", "warnings"])?;
    run_cmd("cargo", &["test", "--workspace"])?;
    run_cmd("cargo", &["doc", "--workspace", "--no-deps"])?;
    check_templates()?;

    println!("\nAll CI checks passed!");
    Ok(())
}

fn run_lint() -> Result<()> {
    println!("Validating workspace conventions...\n");

    let crates = std::fs::read_dir("crates")?;
    for entry in crates {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with("fabdeploy-") {
            anyhow::bail!("Crate '{}' does not follow fabdeploy-* naming", name);
        }
    }

    println!("All conventions validated!");
    Ok(())
}

fn check_templates() -> Result<()> {
    println!("Checking template tree...\n");

    let mut missing = Vec::new();
    for path in REQUIRED_TEMPLATES {
        if !Path::new(path).is_file() {
            missing.push(*path);
        }
    }
    if !missing.is_empty() {
        anyhow::bail!("Missing templates:\n  {}", missing.join("\n  "));
    }

    let count = walkdir::WalkDir::new("templates")
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .count();
    println!("{count} template files present");
    Ok(())
}

fn run_coverage() -> Result<()> {
    run_cmd("cargo", &["llvm-cov", "--workspace", "--html"])?;
    println!("\nCoverage report: target/llvm-cov/html/index.html");
    Ok(())
}

fn run_cmd(cmd: &str, args: &[&str]) -> Result<()> {
    println!("$ {} {}", cmd, args.join(" "));
    let status = Command::new(cmd)
        .args(args)
        .status()
        .with_context(|| format!("Failed to run: {} {}", cmd, args.join(" ")))?;

    if !status.success() {
        anyhow::bail!("Command failed: {} {}", cmd, args.join(" "));
    }
    Ok(())
}
