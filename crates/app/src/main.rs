//! FaturAi CLI
//!
//! Usage:
//!   faturai import fatura-jan.csv fatura-fev.csv
//!   faturai list --preset this-month
//!   faturai summary --from 2024-01-01 --to 2024-03-31
//!   faturai categories add Academia "smart fit" bodytech
//!   faturai set-category --date 2024-01-10 --description Netflix.com --amount 55,90 Lazer
//!   faturai serve --port 3000

mod cli;
mod commands;
mod config;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use faturai_core::{SortOrder, TransactionKey};
use faturai_import::{parse_amount, CategoryDetector};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;
use config::{Config, LogFormat};

fn init_tracing(verbose: bool, config: Option<&Config>) {
    // Priority: RUST_LOG env var > --verbose flag > config log_filter > info
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("debug")
    } else if let Some(directives) = config.and_then(|c| c.log_filter.as_deref()) {
        EnvFilter::new(directives)
    } else {
        EnvFilter::new("info")
    };

    let registry = tracing_subscriber::registry().with(filter);
    match config.map(|c| c.log_format).unwrap_or_default() {
        LogFormat::Json => registry
            .with(JsonStorageLayer)
            .with(BunyanFormattingLayer::new("faturai".into(), std::io::stderr))
            .init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .compact(),
            )
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A config that fails to load still gets default logging.
    let config = Config::load(cli.config.as_deref());
    init_tracing(cli.verbose, config.as_ref().ok());
    let config = config?;

    let store = commands::open_store(&config)?;
    let dictionary = commands::load_dictionary(&config, &store)?;

    match cli.command {
        Commands::Import {
            files,
            delimiter,
            absolute,
        } => {
            let mut options = config.import_options()?;
            if let Some(d) = delimiter {
                if !d.is_ascii() {
                    anyhow::bail!("Delimiter must be an ASCII character, got '{d}'");
                }
                options.delimiter = Some(d as u8);
            }
            options.absolute_amounts |= absolute;
            let detector = CategoryDetector::new(&dictionary);
            commands::cmd_import(&store, &detector, &options, &files)
                .await
                .map(|_| ())
        }
        Commands::List {
            period,
            category,
            search,
            sort,
            page,
            per_page,
        } => {
            let sort: SortOrder = sort.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            let options = commands::ListOptions {
                range: commands::resolve_period(&period, commands::today())?,
                category,
                search,
                sort,
                page,
                per_page,
            };
            commands::cmd_list(&store, options)
        }
        Commands::Summary { period, merchants } => {
            let range = commands::resolve_period(&period, commands::today())?;
            commands::cmd_summary(&store, &dictionary, range, merchants)
        }
        Commands::Categories { action } => match action {
            None | Some(CategoriesAction::List) => commands::cmd_categories_list(&dictionary),
            Some(CategoriesAction::Used) => {
                commands::cmd_categories_used(&store, &dictionary).map(|_| ())
            }
            Some(CategoriesAction::Add {
                name,
                keywords,
                color,
            }) => commands::cmd_categories_add(&store, &name, &keywords, color.as_deref()),
            Some(CategoriesAction::Remove { name }) => {
                commands::cmd_categories_remove(&store, &name)
            }
        },
        Commands::Recategorize => {
            let detector = CategoryDetector::new(&dictionary);
            commands::cmd_recategorize(&store, &detector).map(|_| ())
        }
        Commands::SetCategory {
            date,
            description,
            amount,
            category,
        } => {
            let key = TransactionKey {
                date,
                description,
                amount: parse_amount(&amount),
            };
            commands::cmd_set_category(&store, &dictionary, &key, &category).map(|_| ())
        }
        Commands::Remove { source } => commands::cmd_remove_source(&store, &source).map(|_| ()),
        Commands::Clear { yes } => commands::cmd_clear(&store, yes),
        Commands::Serve { port, host } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            commands::cmd_serve(&config, dictionary, &host, port).await
        }
    }
}
