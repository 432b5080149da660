//! Command-line entry point. Argument parsing and display glue only; the
//! pipeline itself lives in the library.

use std::path::PathBuf;

use clap::Parser;

use fwscribe::runner::{run_batch, TargetOutcome};
use fwscribe::{init_logging, BrowserKind, RunConfig};

const LIST_FORMAT_HELP: &str = "\
The TARGET-LIST must be a CSV file with a single comma ',' as delimiter.
'|' can be used as a quote character, e.g. around a password containing commas.
Columns: firewall_name,URL,username,password,output-path(optional)";

#[derive(Parser, Debug)]
#[command(
    name = "fwscribe",
    version,
    about = "Retrieve information from firewall admin consoles and save it as an Excel report.",
    after_help = LIST_FORMAT_HELP
)]
struct Cli {
    /// CSV file of firewalls and authentication.
    #[arg(long, value_name = "FILE")]
    target_list: PathBuf,

    /// Which browser to drive.
    #[arg(long, default_value = "chrome", value_name = "chrome|chromium|edge")]
    browser: BrowserKind,

    /// Output directory for the reports. Used over any directory listed in
    /// the CSV file.
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Upper bound in seconds on each page/element wait. If the run fails to
    /// retrieve information, the consoles may be loading slower than this
    /// budget; raise it.
    #[arg(long, default_value_t = 10)]
    delay: u64,

    /// Run the browser headless. Pass false to watch it for debugging.
    #[arg(long, default_value_t = true, value_name = "true/false", action = clap::ArgAction::Set)]
    headless: bool,

    /// Spreadsheet template the reports are rendered from.
    #[arg(long, default_value = "report-template.xlsx", value_name = "FILE")]
    template: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging();

    println!("fwscribe v{}", env!("CARGO_PKG_VERSION"));

    let config = RunConfig {
        browser: cli.browser,
        target_list: cli.target_list,
        out_dir: cli.out_dir,
        wait_secs: cli.delay,
        headless: cli.headless,
        template: cli.template,
    };

    let summary = run_batch(&config).await?;

    for entry in &summary.reports {
        match &entry.outcome {
            TargetOutcome::Success { report } => {
                println!("  {}: ok ({})", entry.target, report.display());
            }
            TargetOutcome::Partial { report, missing } => {
                println!(
                    "  {}: partial, {} metric(s) unknown ({})",
                    entry.target,
                    missing.len(),
                    report.display()
                );
            }
            TargetOutcome::Failed { step, error } => {
                println!("  {}: FAILED at {step}: {error}", entry.target);
            }
        }
    }
    println!(
        "{} succeeded, {} partial, {} failed",
        summary.succeeded(),
        summary.partial(),
        summary.failed()
    );

    if summary.failed() > 0 {
        std::process::exit(1);
    }
    Ok(())
}
