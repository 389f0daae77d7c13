mod fixture;

use activity_orchestrator::{AssetActivityService, DisplayRecord};
use anyhow::{bail, Context, Result};
use config_manager::SystemConfig;
use csv::Writer;
use fixture::{Fixture, FixtureSource};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const USAGE: &str = "usage: activity_report <fixture.json> [--csv <out.csv>] [--config <config.toml>]";

#[derive(Debug, Default)]
struct Args {
    fixture: PathBuf,
    csv: Option<PathBuf>,
    config: Option<PathBuf>,
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Args> {
    let mut fixture = None;
    let mut args = Args::default();

    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--csv" => args.csv = Some(raw.next().context("--csv needs a path")?.into()),
            "--config" => args.config = Some(raw.next().context("--config needs a path")?.into()),
            "-h" | "--help" => bail!(USAGE),
            _ if fixture.is_none() && !arg.starts_with("--") => fixture = Some(PathBuf::from(arg)),
            _ => bail!("unexpected argument '{}'\n{}", arg, USAGE),
        }
    }

    args.fixture = fixture.context(USAGE)?;
    Ok(args)
}

/// Flat CSV row of a display record
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    account: &'a str,
    id: &'a str,
    kind: String,
    status: &'a str,
    date: &'a str,
    action: &'a str,
    detail: &'a str,
    amount: &'a str,
    symbol: &'a str,
    fiat_value: &'a str,
    total_gas: f64,
    total_gas_fiat: &'a str,
    total_cost: &'a str,
    tx_hash: &'a str,
}

fn write_csv<W: io::Write>(wtr: &mut Writer<W>, records: &[DisplayRecord]) -> Result<()> {
    for record in records {
        wtr.serialize(CsvRow {
            account: &record.account_name,
            id: &record.transaction.id,
            kind: format!("{:?}", record.transaction.kind),
            status: &record.status_label,
            date: &record.date,
            action: &record.action,
            detail: &record.detail,
            amount: &record.amount,
            symbol: &record.symbol,
            fiat_value: &record.fiat_value,
            total_gas: record.total_gas,
            total_gas_fiat: &record.total_gas_fiat,
            total_cost: &record.total_cost,
            tx_hash: record.tx_hash.as_deref().unwrap_or(""),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

fn export_csv(path: &Path, records: &[DisplayRecord]) -> Result<()> {
    let mut wtr = Writer::from_path(path)
        .with_context(|| format!("cannot create {}", path.display()))?;
    write_csv(&mut wtr, records)?;
    info!("💾 Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,activity_orchestrator=debug".into()),
        )
        .init();

    let args = parse_args(std::env::args().skip(1))?;

    let config = match &args.config {
        Some(path) => SystemConfig::load_from_path(path)?,
        None => SystemConfig::load()?,
    };
    info!("Configuration loaded successfully");
    debug!("Configuration: {}", config.to_json_value());

    let fixture = Fixture::from_path(&args.fixture)
        .with_context(|| format!("cannot read fixture {}", args.fixture.display()))?;
    if fixture.accounts.is_empty() {
        warn!("Fixture has no accounts, the report will be empty");
    }

    let source = Arc::new(FixtureSource::new(fixture.clone()));
    let service = AssetActivityService::new(source.clone(), source, &config)?;

    let records = service.asset_activity(&fixture.accounts, &fixture.asset).await;

    println!(
        "{} activity ({} records, prices in {})",
        fixture.asset.symbol,
        records.len(),
        service.settings().fiat_currency.to_uppercase()
    );
    for record in &records {
        println!(
            "{:<10} {:<12} {}  {}\n           {}\n           gas {:.6} {} ({} {}), total cost {}",
            record.status_label,
            record.account_name,
            record.date,
            record.action,
            record.detail,
            record.total_gas,
            config.network.native_symbol,
            record.total_gas_fiat,
            service.settings().fiat_currency.to_uppercase(),
            record.total_cost
        );
    }

    let history = service
        .prices()
        .price_history(&fixture.asset.symbol, service.settings().timeframe)
        .await;
    if !history.is_empty() {
        println!("{} price history ({})", fixture.asset.symbol, service.settings().timeframe);
        for (date, price) in &history {
            println!("  {}  {}", date.format("%Y-%m-%d"), price);
        }
    }

    if let Some(path) = &args.csv {
        export_csv(path, &records)?;
    }

    Ok(())
}
