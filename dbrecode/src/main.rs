//! Schema-driven batch text recoding tool.
//!
//! Walks every table of a database and rewrites the values of its text
//! columns through a transform, addressing each row by primary key.
//!
//! # Safety Guarantees
//! - Dry run unless `--execute` is given
//! - No credentials stored or logged
//! - Tables without a primary key are never written

use clap::Parser;
use dbrecode::cli::{Cli, Command};
use dbrecode::{commands, output};
use dbrecode_core::{Result, init_logging};

/// Exit code when the run finished but some rows or tables failed.
const EXIT_PARTIAL_FAILURE: i32 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;

    match &cli.command {
        Command::Recode(args) => {
            let report = commands::recode(args).await?;
            if !cli.global.quiet {
                for line in output::summary_lines(&report) {
                    println!("{}", line);
                }
                for diagnostic in &report.diagnostics {
                    println!("warning: {}", diagnostic);
                }
                if report.dry_run {
                    println!(
                        "Dry run: {} changes planned, nothing written",
                        report.planned_count()
                    );
                } else {
                    println!(
                        "{} rows updated, {} failed",
                        report.updated_count(),
                        report.failed_count()
                    );
                }
            }
            if report.has_failures() {
                std::process::exit(EXIT_PARTIAL_FAILURE);
            }
            Ok(())
        }
        Command::Columns(args) => {
            for listing in commands::columns(args).await? {
                println!("{}:", listing.table);
                for column in &listing.columns {
                    println!("  {}", column);
                }
            }
            Ok(())
        }
        Command::Test(args) => {
            commands::test_connection(&args.database_url).await?;
            println!("Connection to MySQL database successful");
            Ok(())
        }
        Command::List => {
            commands::list_supported();
            Ok(())
        }
    }
}
