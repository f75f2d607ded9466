//! `aipsync` - CLI for the local publication mirror
//!
//! This binary syncs the local database with the publication API and browses
//! the stored charts.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;

use aipsync::cli::{
    AirportsCommand, ChartsCommand, Cli, Command, ConfigCommand, ListCategory, ListCommand,
};
use aipsync::integrity;
use aipsync::record::{Category, CircularEntry};
use aipsync::sync::SyncProgress;
use aipsync::{
    init_logging, AirportSummary, Catalog, ChartKind, Config, HttpRemote, Storage, Synchronizer,
    VersionDescriptor,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    match cli.command {
        // Config commands must work even when the configuration is invalid.
        Command::Config(cmd) => handle_config(cli.config, cmd),
        Command::Status(cmd) => handle_status(&Session::open(cli.config)?.storage, cmd.json),
        Command::Check(cmd) => handle_check(&Session::open(cli.config)?, cmd.json).await,
        Command::Sync(cmd) => handle_sync(&Session::open(cli.config)?, cmd.force).await,
        Command::Airports(cmd) => handle_airports(&Session::open(cli.config)?.storage, &cmd),
        Command::Charts(cmd) => handle_charts(&Session::open(cli.config)?.storage, &cmd),
        Command::List(cmd) => handle_list(&Session::open(cli.config)?.storage, &cmd),
    }
}

/// Loaded configuration and the database it points at.
struct Session {
    config: Config,
    storage: Storage,
}

impl Session {
    fn open(config_path: Option<PathBuf>) -> Result<Self> {
        let config = Config::load_from(config_path).context("failed to load configuration")?;
        let db_path = config.database_path();
        let storage = Storage::open(&db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        Ok(Self { config, storage })
    }
}

fn synchronizer(session: &Session) -> Result<Synchronizer<'_, HttpRemote, &Storage>> {
    let remote = HttpRemote::new(session.config.remote.clone())?;
    Ok(Synchronizer::new(&session.storage, remote, &session.storage))
}

fn describe(version: Option<&VersionDescriptor>) -> String {
    version.map_or_else(
        || "none".to_string(),
        |v| format!("{} cycle {} (id {})", v.name, v.cycle, v.version_id),
    )
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn handle_status(storage: &Storage, json: bool) -> Result<()> {
    let stats = storage.stats()?;
    let report = integrity::inspect(storage);

    if json {
        let status = serde_json::json!({
            "database_path": storage.path(),
            "stats": stats,
            "integrity": report,
            "healthy": report.is_healthy(),
        });
        return print_json(&status);
    }

    println!("aipsync status");
    println!("--------------");
    println!("Database:      {}", storage.path().display());
    println!("Version:       {}", describe(stats.version.as_ref()));
    match stats.last_synced_at {
        Some(at) => println!("Last sync:     {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("Last sync:     never"),
    }
    println!("Size:          {} bytes", stats.db_size_bytes);
    println!();
    for (category, count) in &stats.counts {
        println!("  {:<6} {:>8}", category.code(), count);
    }
    println!("  {:<6} {:>8}", "total", stats.total_records());
    println!();
    if report.is_healthy() {
        println!("Integrity:     ok");
    } else {
        let missing: Vec<_> = report.unhealthy().iter().map(|c| c.code()).collect();
        println!("Integrity:     incomplete ({})", missing.join(", "));
    }
    Ok(())
}

async fn handle_check(session: &Session, json: bool) -> Result<()> {
    let sync = synchronizer(session)?;
    let check = sync
        .check_need_update()
        .await
        .context("failed to check the published version")?;

    if json {
        return print_json(&check);
    }

    println!("Local:   {}", describe(check.local.as_ref()));
    println!("Remote:  {}", describe(Some(&check.remote)));
    if check.need_update {
        println!("A new cycle is available. Run `aipsync sync` to download it.");
    } else {
        println!("Up to date.");
    }
    Ok(())
}

async fn handle_sync(session: &Session, force: bool) -> Result<()> {
    let mut sync = synchronizer(session)?;
    let report = |progress: &SyncProgress| {
        println!("[{}/{}] {}", progress.index, progress.total, progress.label);
    };

    let version = if force {
        sync.force_redownload(report).await
    } else {
        sync.run(report).await
    }
    .context("sync failed")?;

    println!("Synced {}", describe(Some(&version)));
    if !sync.check_integrity() {
        bail!("sync finished but some categories are empty");
    }
    Ok(())
}

fn handle_airports(storage: &Storage, cmd: &AirportsCommand) -> Result<()> {
    let catalog = Catalog::new(storage);
    let airports = match cmd.query.as_deref() {
        Some(query) => catalog.search_airports(query),
        None => catalog.airport_directory(),
    };

    if cmd.json {
        return print_json(&airports);
    }

    if airports.is_empty() {
        println!("No airports found.");
        return Ok(());
    }
    for AirportSummary {
        icao,
        name,
        modified,
    } in &airports
    {
        let flag = if *modified { " *" } else { "" };
        println!("{icao}  {name}{flag}");
    }
    Ok(())
}

fn handle_charts(storage: &Storage, cmd: &ChartsCommand) -> Result<()> {
    let charts = Catalog::new(storage).categorized_charts(&cmd.icao);
    let Some(info) = charts.info.as_ref() else {
        bail!("airport {} not found", cmd.icao.trim().to_uppercase());
    };

    if cmd.json {
        return print_json(&charts);
    }

    println!("{}  {}", info.name(), info.name_cn());
    for kind in ChartKind::ALL {
        let list = charts.of_kind(kind);
        if list.is_empty() {
            continue;
        }
        println!();
        println!("{kind} ({})", list.len());
        for chart in list {
            println!("  {}", chart.name());
        }
    }
    Ok(())
}

fn handle_list(storage: &Storage, cmd: &ListCommand) -> Result<()> {
    let catalog = Catalog::new(storage);
    let query = cmd.query.as_deref();

    let rows: Vec<(String, String)> = match cmd.category {
        ListCategory::Enr => {
            let charts =
                query.map_or_else(|| catalog.enroute_charts(), |q| catalog.search_enroute(q));
            if cmd.json {
                return print_json(&charts);
            }
            charts
                .iter()
                .map(|c| (c.name_cn().to_string(), text(c.pdf_path.as_deref())))
                .collect()
        }
        ListCategory::Amdt => {
            let amendments =
                query.map_or_else(|| catalog.amendments(), |q| catalog.search_amendments(q));
            if cmd.json {
                return print_json(&amendments);
            }
            amendments
                .iter()
                .map(|a| (a.name().to_string(), text(a.pdf_path.as_deref())))
                .collect()
        }
        ListCategory::Sup => {
            let sups =
                query.map_or_else(|| catalog.supplements(), |q| catalog.search_circulars(q));
            if cmd.json {
                return print_json(&sups);
            }
            sups.iter().map(|s| circular_row(s)).collect()
        }
        ListCategory::Aic => {
            let aics = query.map_or_else(
                || catalog.information_circulars(),
                |q| catalog.search_circulars(q),
            );
            if cmd.json {
                return print_json(&aics);
            }
            aics.iter().map(|a| circular_row(a)).collect()
        }
        ListCategory::Notam => {
            let notams = query.map_or_else(|| catalog.notams(), |q| catalog.search_notams(q));
            if cmd.json {
                return print_json(&notams);
            }
            notams
                .iter()
                .map(|n| {
                    (
                        text(n.series_name.as_deref()),
                        text(n.document.as_deref()),
                    )
                })
                .collect()
        }
    };

    if rows.is_empty() {
        println!("No {} entries found.", Category::from(cmd.category).code());
        return Ok(());
    }
    for (title, document) in rows {
        println!("{title}\n    {document}");
    }
    Ok(())
}

fn text(field: Option<&str>) -> String {
    field.unwrap_or_default().to_string()
}

fn circular_row(entry: &CircularEntry) -> (String, String) {
    let title = entry
        .local_subject
        .as_deref()
        .or(entry.subject.as_deref())
        .unwrap_or_default();
    let title = match entry.chapter_type.as_deref() {
        Some(chapter) => format!("[{chapter}] {title}"),
        None => title.to_string(),
    };
    (title, text(entry.document.as_deref()))
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path).context("failed to load configuration")?;
            if json {
                return print_json(&config);
            }
            println!("Current Configuration");
            println!("=====================");
            println!();
            println!("[Storage]");
            println!("  Database path:  {}", config.database_path().display());
            println!();
            println!("[Remote]");
            println!("  Base URL:       {}", config.remote.base_url);
            println!("  Timeout (s):    {}", config.remote.timeout_secs);
            println!("  Version:        {}", config.remote.endpoints.version);
            for category in Category::ALL {
                println!(
                    "  {:<16}{}",
                    format!("{}:", category.code()),
                    config.remote.endpoints.for_category(category)
                );
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
