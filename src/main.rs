use clap::Parser;
use ecoledger::application::{Platform, PlatformSettings};
use ecoledger::config::{Cli, Command, ServeArgs};
use ecoledger::domain::catalog::Catalog;
use ecoledger::domain::ports::Stores;
use ecoledger::infrastructure::in_memory::in_memory_stores;
use ecoledger::infrastructure::seed::builtin_catalog;
use ecoledger::interfaces::csv::catalog_reader::load_catalog_dir;
use ecoledger::interfaces::http;
use miette::{IntoDiagnostic, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("ecoledger={},info", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::CheckCatalog { dir } => check_catalog(&dir),
        #[cfg(feature = "storage-rocksdb")]
        Command::Audit { db_path } => audit(&db_path).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let settings: PlatformSettings = args.settings().into_diagnostic()?;
    if args.dev_mode {
        warn!("Development mode enabled - tokens are signed with a fixed secret");
    }

    let catalog = match &args.catalog_dir {
        Some(dir) => load_catalog_dir(dir),
        None => builtin_catalog(),
    }
    .into_diagnostic()?;
    info!(
        regions = catalog.regions.len(),
        attractions = catalog.attractions.len(),
        hotels = catalog.hotels.len(),
        tasks = catalog.tasks.len(),
        "catalog loaded"
    );

    let stores = open_stores(&args, catalog)?;
    let platform = Platform::new(stores, settings);

    if let Some(admin) = args.admin() {
        let profile = platform
            .accounts
            .bootstrap_admin(admin.name, admin.email, admin.password)
            .await
            .into_diagnostic()?;
        info!(admin = %profile.id, "bootstrap admin ready");
    }

    let listener = TcpListener::bind(args.listen).await.into_diagnostic()?;
    http::run(listener, Arc::new(platform), async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    })
    .await
    .into_diagnostic()
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(args: &ServeArgs, catalog: Catalog) -> Result<Stores> {
    use ecoledger::infrastructure::rocksdb::RocksDBStore;

    match &args.db_path {
        Some(path) => {
            info!(path = %path.display(), "using persistent storage");
            Ok(RocksDBStore::open(path).into_diagnostic()?.stores(catalog))
        }
        None => Ok(in_memory_stores(catalog)),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(_args: &ServeArgs, catalog: Catalog) -> Result<Stores> {
    warn!("persistent storage not compiled in; state is lost on restart");
    Ok(in_memory_stores(catalog))
}

fn check_catalog(dir: &Path) -> Result<()> {
    let catalog = load_catalog_dir(dir).into_diagnostic()?;
    println!("regions: {}", catalog.regions.len());
    println!("attractions: {}", catalog.attractions.len());
    println!("hotels: {}", catalog.hotels.len());
    println!("tasks: {}", catalog.tasks.len());
    println!("stations: {}", catalog.stations.len());
    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
async fn audit(db_path: &Path) -> Result<()> {
    use ecoledger::application::ledger::LedgerService;
    use ecoledger::infrastructure::rocksdb::RocksDBStore;

    let stores = RocksDBStore::open(db_path).into_diagnostic()?.stores(Catalog::default());
    let report = LedgerService::new(stores.ledger, stores.accounts)
        .audit_all()
        .await
        .into_diagnostic()?;
    println!("accounts checked: {}", report.accounts_checked);
    for finding in &report.findings {
        println!(
            "frozen: {} balance={} entries_sum={}{}",
            finding.account_id,
            finding.balance,
            finding.sum_of_entries,
            if finding.newly_frozen { " (new)" } else { "" }
        );
    }
    if report.is_clean() {
        Ok(())
    } else {
        Err(miette::miette!("{} ledger(s) frozen", report.findings.len()))
    }
}
