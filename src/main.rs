mod error;
mod report;
mod uninstall;
mod util;

use std::{ffi::OsString, path::PathBuf};

use ansi_term::Color;
use clap::{error::ErrorKind, Parser};
use color_eyre::eyre::Result;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{
    prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::error::{PreconditionError, EXIT_INCOMPLETE, EXIT_SUCCESS, EXIT_USAGE};

/// Uninstall a cog from a bot installation by removing its files from cogs/ and its data/ directory
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// name of the cog folder, looked up in the source directory
    #[arg(value_name = "cog-name")]
    pub cog_name: OsString,

    /// bot installation directory containing cogs/ and data/
    #[arg(value_name = "install-root")]
    pub install_root: PathBuf,

    /// directory holding the cog folder
    #[arg(long, default_value = ".")]
    pub source: PathBuf,

    /// only report what would be removed
    #[arg(long)]
    pub dry_run: bool,

    /// leave data/<cog-name> in place
    #[arg(long)]
    pub keep_data: bool,

    /// exit with a failure code if any single removal failed
    #[arg(long)]
    pub strict: bool,

    /// print the report as JSON
    #[arg(long)]
    pub json: bool,
}

fn setup_tracing() {
    // logs go to stderr, stdout is reserved for the report

    #[cfg(debug_assertions)]
    {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .compact()
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(false)
            .with_target(true)
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .with(EnvFilter::from(util::get_log_filter("cog_uninstall=debug")))
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .compact()
            .with_file(false)
            .with_line_number(false)
            .with_thread_ids(false)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .with(EnvFilter::from(util::get_log_filter("cog_uninstall=info")))
            .init();
    }
}

fn run(args: &Args) -> Result<i32> {
    let source = util::expand_home(&args.source);
    let install_root = util::expand_home(&args.install_root);
    let plan = uninstall::plan(&source, &args.cog_name, &install_root)?;

    if args.dry_run {
        info!("Dry run, nothing will be deleted");
    }
    info!(
        "Uninstalling {} from {}",
        plan.cog_name.to_string_lossy(),
        install_root.display()
    );
    debug!("Cog folder: {}", plan.cog_folder.display());
    let report = uninstall::uninstall(
        &plan,
        &uninstall::Options {
            dry_run: args.dry_run,
            keep_data: args.keep_data,
        },
    );

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        report.print_summary();
    }

    if report.has_failures() {
        warn!(
            "{} file(s) could not be removed and may need to be removed manually",
            report.failed_count()
        );
        if args.strict {
            return Ok(EXIT_INCOMPLETE);
        }
    }
    Ok(EXIT_SUCCESS)
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                e.exit();
            }
            let _ = e.print();
            std::process::exit(EXIT_USAGE);
        }
    };
    if let Err(e) = color_eyre::install() {
        eprintln!("Failed to install error reporter: {}", e);
    }
    setup_tracing();

    let code = match run(&args) {
        Ok(code) => code,
        Err(report) => match report.downcast_ref::<PreconditionError>() {
            Some(e) => {
                // printed directly so it shows even when the log filter drops it
                eprintln!("{}: {}", Color::Red.paint("error"), e);
                error!("{}", e);
                e.exit_code()
            }
            None => {
                error!("Error uninstalling cog: {:?}", report);
                EXIT_INCOMPLETE
            }
        },
    };
    std::process::exit(code);
}
