use std::io::IsTerminal;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use kv_bootstrap::{
    Cli, EtcdSink, Flattener, ImportReport, MemorySink, Node, Settings, Sink, load_document,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Could not initialize logging: {e}");
    }

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// INFO by default, DEBUG with `-v`; `RUST_LOG` takes precedence when set.
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn run(cli: &Cli) -> Result<ExitCode> {
    if cli.settings_template {
        print!("{}", Settings::template());
        return Ok(ExitCode::SUCCESS);
    }

    if cli.print_settings {
        println!("{}", load_settings(cli)?.listing());
        return Ok(ExitCode::SUCCESS);
    }

    let Some(file) = &cli.file else {
        println!("Missing required parameter --file (--file app.yaml).");
        return Ok(ExitCode::FAILURE);
    };
    let settings = load_settings(cli)?;

    let root = match load_document(file) {
        Ok(root) => root,
        Err(e) => {
            println!("Could not open file {}.", file.display());
            eprintln!("{e}");
            return Ok(ExitCode::FAILURE);
        }
    };
    debug!(file = %file.display(), leaves = root.leaf_count(), "document loaded");

    let report = if cli.dry_run {
        info!("dry run: nothing is written to etcd");
        import(MemorySink::new(), &settings, &root)?
    } else {
        let sink = EtcdSink::connect(&settings.etcd)
            .with_context(|| format!("failed to connect to {}", settings.etcd.endpoints))?;
        import(sink, &settings, &root)?
    };

    info!(
        scalars = report.scalars,
        includes = report.includes,
        bytes = report.bytes,
        "import complete"
    );
    Ok(ExitCode::SUCCESS)
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    cli.settings_sources()
        .load()
        .context("failed to resolve settings")
}

fn import<S: Sink>(sink: S, settings: &Settings, root: &Node) -> Result<ImportReport> {
    let mut flattener = Flattener::new(sink);
    if let Some(dir) = &settings.include_root {
        flattener = flattener.include_root(dir);
    }
    flattener.walk(&settings.prefix, root).map_err(|e| {
        warn!("import aborted; keys written before this point are kept");
        anyhow::Error::new(e)
    })
}
