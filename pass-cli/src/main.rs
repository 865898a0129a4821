use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use pass_catalog::Booking;
use pass_finance::FinanceLedger;
use pass_reimbursement::{find_all_booking_reimbursements, CustomRuleFinder, ReimbursementRule};
use pass_store::{BookingRepository, Config, CustomRuleRepository, JsonFileStore, LedgerRepository};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "pass", version, about = "pass Culture reimbursement and pricing jobs")]
struct Cli {
    /// Directory holding default.toml and its overrides
    #[arg(long, default_value = "config")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the reimbursement of used bookings
    Reimburse {
        #[arg(long)]
        bookings: PathBuf,
        #[arg(long)]
        custom_rules: Option<PathBuf>,
    },
    /// Price ready finance events and save the ledger back
    PriceEvents {
        #[arg(long)]
        ledger: PathBuf,
        /// Defaults to the current time
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
}

#[derive(Serialize)]
#[serde(untagged)]
enum ReimbursementLine {
    Reimbursed {
        booking_id: Uuid,
        group: &'static str,
        rule: ReimbursementRule,
        reimbursed_amount: i64,
    },
    Failed {
        booking_id: Uuid,
        error: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load_from(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log.filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Command::Reimburse { bookings, custom_rules } => {
            let mut store = JsonFileStore::new().with_bookings(bookings);
            if let Some(path) = custom_rules {
                store = store.with_custom_rules(path);
            }
            let lines = reimburse(&store).await?;
            println!("{}", serde_json::to_string_pretty(&lines)?);
        }
        Command::PriceEvents { ledger, now } => {
            let store = JsonFileStore::new().with_ledger(ledger);
            let snapshot = store.load_ledger().await?;
            let mut ledger = FinanceLedger::from_snapshot(snapshot, config.finance)?;
            let report = ledger.price_events(now.unwrap_or_else(Utc::now));
            store.save_ledger(&ledger.snapshot()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

/// Reimburse bookings pricing point by pricing point, in use order.
/// Bookings that were never used are reported as failures.
async fn reimburse(store: &JsonFileStore) -> anyhow::Result<Vec<ReimbursementLine>> {
    let bookings = store.list_bookings().await?;
    let rules = store.list_custom_rules().await?;
    tracing::info!(bookings = bookings.len(), custom_rules = rules.len(), "Computing reimbursements");
    let finder = CustomRuleFinder::new(rules);

    let mut by_pricing_point: BTreeMap<Option<Uuid>, Vec<Booking>> = BTreeMap::new();
    for booking in bookings {
        by_pricing_point.entry(booking.pricing_point_id).or_default().push(booking);
    }

    let mut lines = Vec::new();
    for (pricing_point_id, mut bookings) in by_pricing_point {
        bookings.sort_by_key(|booking| booking.date_used);
        tracing::debug!(pricing_point = ?pricing_point_id, count = bookings.len(), "Reimbursing pricing point");
        for outcome in find_all_booking_reimbursements(&bookings, &finder) {
            lines.push(match outcome.result {
                Ok(reimbursement) => ReimbursementLine::Reimbursed {
                    booking_id: reimbursement.booking_id,
                    group: reimbursement.rule.group().label(),
                    rule: reimbursement.rule,
                    reimbursed_amount: reimbursement.reimbursed_amount,
                },
                Err(err) => ReimbursementLine::Failed {
                    booking_id: outcome.booking.id,
                    error: err.to_string(),
                },
            });
        }
    }
    Ok(lines)
}
