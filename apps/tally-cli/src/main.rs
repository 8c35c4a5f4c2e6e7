//! # tally
//!
//! Command-line replay of a ledger snapshot.
//!
//! ```text
//! tally report --snapshot export.json --customer "Ayesha" --phone 0300-1234567
//! tally report --snapshot export.json --role manager --branch LHR --from 2024-01-01
//! tally config              # print the effective configuration
//! tally config --save       # write it to the default location
//! ```
//!
//! ## Log Levels
//! - `RUST_LOG=debug` - Show debug messages
//! - `RUST_LOG=tally_core=trace` - Trace the engine only
//! - Default: INFO level, written to stderr

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tally_core::query::ALL_CUSTOMERS;
use tally_core::{AccessScope, DateRange, LedgerQuery, PageRequest, Role};
use tally_service::{LedgerConfig, LedgerService, SnapshotSource};

#[derive(Parser, Debug)]
#[command(name = "tally", version, about = "Customer ledger reconciliation")]
struct Cli {
    /// Config file (default: platform config dir / ledger.toml)
    #[arg(short = 'c', long, global = true, env = "TALLY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a ledger report from a snapshot file
    Report(ReportArgs),

    /// Show the effective configuration
    Config {
        /// Write it to the config path
        #[arg(long)]
        save: bool,
    },
}

#[derive(clap::Args, Debug)]
struct ReportArgs {
    /// JSON snapshot with sales, returns and line items
    #[arg(short = 's', long)]
    snapshot: PathBuf,

    /// Customer name, or "all"
    #[arg(long, default_value = ALL_CUSTOMERS)]
    customer: String,

    /// Customer phone
    #[arg(long)]
    phone: Option<String>,

    /// Caller role: admin, manager or cashier
    #[arg(long, default_value = "admin")]
    role: Role,

    /// Branch restriction (manager)
    #[arg(long)]
    branch: Option<String>,

    /// Warehouse restriction (cashier)
    #[arg(long)]
    warehouse: Option<String>,

    /// First day included (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last day included (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Defaults to report.default_page_size
    #[arg(long)]
    page_size: Option<u32>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

impl ReportArgs {
    fn query(&self) -> LedgerQuery {
        let scope = AccessScope {
            role: self.role,
            branch_id: self.branch.clone(),
            warehouse_id: self.warehouse.clone(),
        };
        LedgerQuery::for_customer(&self.customer, self.phone.as_deref())
            .with_scope(scope)
            .with_date_range(DateRange::new(self.from, self.to))
            .with_page(PageRequest {
                page: self.page,
                page_size: self.page_size,
            })
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = LedgerConfig::load(cli.config.clone()).context("loading ledger config")?;

    match cli.command {
        Command::Report(args) => run_report(config, args).await,
        Command::Config { save } => {
            if save {
                config.save(cli.config).context("saving ledger config")?;
            }
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn run_report(config: LedgerConfig, args: ReportArgs) -> Result<()> {
    let source = SnapshotSource::from_path(&args.snapshot)
        .with_context(|| format!("reading snapshot {}", args.snapshot.display()))?;
    let service = LedgerService::new(source, config);

    let report = service.customer_ledger(args.query()).await?;
    info!(
        customer = %report.customer.name,
        transactions = report.transactions.len(),
        outstanding = %report.summary.outstanding_balance,
        "Report ready"
    );

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::CustomerFilter;

    fn report_args(argv: &[&str]) -> ReportArgs {
        match Cli::try_parse_from(argv.iter().copied()).unwrap().command {
            Command::Report(args) => args,
            other => panic!("expected report, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_select_all_customers() {
        let query = report_args(&["tally", "report", "-s", "x.json"]).query();
        assert!(query.customer.is_all());
        assert_eq!(query.scope, AccessScope::admin());
        assert_eq!(query.page.page, 1);
        assert_eq!(query.page.page_size, None);
    }

    #[test]
    fn test_report_flags_build_query() {
        let query = report_args(&[
            "tally", "report", "-s", "x.json", "--customer", "Ayesha", "--phone", " 0300 ",
            "--role", "manager", "--branch", "LHR", "--from", "2024-01-01", "--page", "2",
            "--page-size", "20",
        ])
        .query();

        assert_eq!(
            query.customer,
            CustomerFilter::Customer {
                name: "Ayesha".into(),
                phone: Some("0300".into()),
            }
        );
        assert_eq!(query.scope, AccessScope::manager("LHR"));
        assert_eq!(query.date_range.from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(query.page, PageRequest::new(2, 20));
    }

    #[test]
    fn test_bad_role_rejected() {
        assert!(Cli::try_parse_from(["tally", "report", "-s", "x", "--role", "owner"]).is_err());
    }
}
