use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::SecondsFormat;
use clap::Parser;
use tapedeck::archive::{self, UnpackOptions};
use tapedeck::{
    util, ArchiveGateway, Config, DirectoryObjectStore, FilePreferences, LocalStorage, Mode,
    SnapshotEngine, SnapshotGateway,
};

mod cli;

use cli::{Cli, Cmd, ModeAction, SnapshotAction};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    util::init_data_dir(cli.data_dir);
    init_logging()?;

    match cli.cmd {
        Cmd::Pack { dir, out } => pack(&dir, &out),
        Cmd::Unpack {
            archive: source,
            dest,
            strict,
        } => unpack(&source, &dest, strict),
        Cmd::Status => {
            let (_, engine) = open_engine().await?;
            status(&engine).await
        }
        Cmd::Mode { action: None } => {
            let (_, engine) = open_engine().await?;
            println!("{}", engine.mode());
            Ok(())
        }
        Cmd::Mode {
            action: Some(ModeAction::Set { mode }),
        } => {
            let (_, engine) = open_engine().await?;
            set_mode(&engine, mode)
        }
        Cmd::Capture { identifier, input } => {
            let (_, engine) = open_engine().await?;
            capture(&engine, &identifier, input.as_deref()).await
        }
        Cmd::Snapshots { action } => {
            let (config, engine) = open_engine().await?;
            snapshots(&engine, &config, action).await
        }
    }
}

/// Log to `<data_dir>/logs/tapedeck.log`; stdout belongs to command output.
fn init_logging() -> Result<()> {
    fs::create_dir_all(util::logs_dir())?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(util::log_file_path())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .init();
    Ok(())
}

async fn open_engine() -> Result<(Config, SnapshotEngine)> {
    let config = Config::load();
    let preferences = Arc::new(FilePreferences::open(&config.preferences_path));
    let engine = SnapshotEngine::initialize(
        config.engine_options(),
        Arc::new(LocalStorage::new()),
        preferences,
    )
    .await;

    for (name, required) in &config.modules {
        engine
            .register(name.clone(), required.iter().cloned())
            .with_context(|| format!("registering module {name}"))?;
    }
    if !config.modules.is_empty() {
        engine.refresh_registry().await;
    }
    Ok((config, engine))
}

fn pack(dir: &Path, out: &Path) -> Result<()> {
    let entries = archive::pack_to_path(dir, out)
        .with_context(|| format!("packing {}", dir.display()))?;
    println!("packed {} entries into {}", entries, out.display());
    Ok(())
}

fn unpack(source: &Path, dest: &Path, strict: bool) -> Result<()> {
    let options = if strict {
        UnpackOptions::strict()
    } else {
        UnpackOptions::default()
    };
    let summary = archive::unpack_with(source, dest, options)
        .with_context(|| format!("unpacking {}", source.display()))?;
    println!(
        "unpacked {} files and {} directories into {}",
        summary.files,
        summary.directories,
        dest.display()
    );
    for skipped in &summary.skipped {
        println!("skipped {}", skipped);
    }
    Ok(())
}

async fn status(engine: &SnapshotEngine) -> Result<()> {
    let inventory = engine.file_inventory().await;
    println!("mode: {}", engine.mode());
    println!("store: {}", engine.base_dir().display());
    println!("files: {}", inventory.len());

    for module in engine.modules() {
        if module.is_unknown() {
            println!(
                "module {}: {} unclaimed files",
                module.name,
                module.file_list.len()
            );
            continue;
        }
        let state = if module.is_complete() {
            "complete".to_string()
        } else {
            format!("missing {}", module.missing().join(", "))
        };
        println!(
            "module {}: {}/{} recorded, {}",
            module.name,
            module.file_list.len(),
            module.required.len(),
            state
        );
    }
    Ok(())
}

fn set_mode(engine: &SnapshotEngine, mode: Mode) -> Result<()> {
    engine
        .set_mode(mode)
        .with_context(|| format!("saving mode {mode}"))?;
    println!("{}", mode);
    Ok(())
}

async fn capture(engine: &SnapshotEngine, identifier: &str, input: Option<&Path>) -> Result<()> {
    let bytes = match input {
        Some(path) => fs::read(path).with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .context("reading stdin")?;
            buf
        }
    };

    let output = engine.capture_or_serve(bytes, identifier).await;

    let mut stdout = io::stdout().lock();
    stdout.write_all(&output)?;
    stdout.flush()?;
    Ok(())
}

async fn snapshots(
    engine: &SnapshotEngine,
    config: &Config,
    action: SnapshotAction,
) -> Result<()> {
    let gateway = ArchiveGateway::new(
        DirectoryObjectStore::new(&config.remote_dir),
        Arc::new(LocalStorage::new()),
    );

    match action {
        SnapshotAction::List => {
            for snapshot in gateway.list().await? {
                println!(
                    "{}\t{}\t{}",
                    snapshot.name,
                    snapshot.date.to_rfc3339_opts(SecondsFormat::Secs, true),
                    snapshot.file_list.join(",")
                );
            }
        }
        SnapshotAction::Upload => {
            let snapshot = engine.export_snapshot(&gateway).await?;
            println!("{}", snapshot.name);
        }
        SnapshotAction::Download { name } => {
            let snapshot = find_snapshot(&gateway, &name).await?;
            engine.import_snapshot(&gateway, &snapshot).await?;
            println!(
                "installed {} ({} files)",
                snapshot.name,
                snapshot.file_list.len()
            );
        }
        SnapshotAction::Remove { name } => {
            let snapshot = find_snapshot(&gateway, &name).await?;
            gateway.remove(&snapshot).await?;
            println!("removed {}", snapshot.name);
        }
    }
    Ok(())
}

async fn find_snapshot(
    gateway: &dyn SnapshotGateway,
    name: &str,
) -> Result<tapedeck::Snapshot> {
    let Some(snapshot) = gateway.list().await?.into_iter().find(|s| s.name == name) else {
        bail!("no remote snapshot named {name}");
    };
    Ok(snapshot)
}
