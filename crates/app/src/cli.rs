//! CLI argument definitions using clap

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// FaturAi - make sense of your card statements
#[derive(Parser)]
#[command(name = "faturai")]
#[command(about = "Import bank and card CSV exports, categorize and summarize spending", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to faturai.toml in the platform config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import one or more CSV statements into the local store
    Import {
        /// CSV files, processed in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Field delimiter (sniffed from the header when omitted)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Store amounts as absolute values
        #[arg(long)]
        absolute: bool,
    },

    /// List stored transactions
    List {
        #[command(flatten)]
        period: PeriodArgs,

        /// Only this category
        #[arg(long)]
        category: Option<String>,

        /// Text to look for in description or category
        #[arg(short, long)]
        search: Option<String>,

        /// date-desc, date-asc, amount-desc or amount-asc
        #[arg(long, default_value = "date-desc")]
        sort: String,

        /// Page number (1-based)
        #[arg(short, long, default_value = "1")]
        page: usize,

        /// Rows per page
        #[arg(long, default_value = "20")]
        per_page: usize,
    },

    /// Spending summary: totals, categories and top merchants
    Summary {
        #[command(flatten)]
        period: PeriodArgs,

        /// Number of merchants to show
        #[arg(long, default_value = "5")]
        merchants: usize,
    },

    /// Manage the category dictionary
    Categories {
        #[command(subcommand)]
        action: Option<CategoriesAction>,
    },

    /// Re-run category detection over every stored transaction
    Recategorize,

    /// Move one transaction to another category
    SetCategory {
        /// Transaction date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Description exactly as shown by `list`
        #[arg(long)]
        description: String,

        /// Amount, e.g. 55,90 or 55.90
        #[arg(long, allow_hyphen_values = true)]
        amount: String,

        /// New category
        category: String,
    },

    /// Remove the transactions that came from one file
    Remove {
        /// File name as shown by `list`
        #[arg(long)]
        source: String,
    },

    /// Delete all locally stored data
    Clear {
        /// Skip the confirmation guard
        #[arg(long)]
        yes: bool,
    },

    /// Start the web server
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct PeriodArgs {
    /// this-month, last-month, last-3-months, last-6-months, year-to-date, last-year
    #[arg(long)]
    pub preset: Option<String>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// End date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

#[derive(Subcommand)]
pub enum CategoriesAction {
    /// Show the effective dictionary in match order
    List,

    /// Add a category, or extra keywords to an existing one
    Add {
        /// Category name
        name: String,

        /// Keywords matched against descriptions
        #[arg(required = true)]
        keywords: Vec<String>,

        /// Hex color for charts
        #[arg(long)]
        color: Option<String>,
    },

    /// Show the categories used by stored transactions
    Used,

    /// Remove a category added with `add`
    Remove {
        /// Category name or id
        name: String,
    },
}
