//! Command implementations over the local store

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate, Utc};
use faturai_core::category::category_id;
use faturai_core::query::categories_of;
use faturai_core::summary::{calculate_trend, category_breakdown, merchant_timeline};
use faturai_core::{
    CategoryDefinition, CategoryDictionary, DatePreset, DateRange, Money, Page, SortOrder, Summary,
    Transaction, TransactionKey, TransactionQuery,
};
use faturai_import::{import_files, is_csv_path, CategoryDetector, ImportOptions};
use faturai_storage::LocalStore;
use tracing::{info, warn};

use crate::cli::PeriodArgs;
use crate::config::Config;

const LAST_IMPORT_SETTING: &str = "last_import";

pub fn open_store(config: &Config) -> Result<LocalStore> {
    let dir = config.data_dir()?;
    LocalStore::open(&dir).with_context(|| format!("Failed to open data directory {}", dir.display()))
}

/// Built-in, configured and saved categories, in match order.
pub fn load_dictionary(config: &Config, store: &LocalStore) -> Result<CategoryDictionary> {
    let saved = store
        .load_user_categories()
        .context("Failed to load saved categories")?;
    Ok(config.dictionary(saved))
}

pub fn resolve_period(period: &PeriodArgs, today: NaiveDate) -> Result<Option<DateRange>> {
    if let Some(preset) = &period.preset {
        let preset: DatePreset = preset.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        return Ok(Some(preset.range(today)));
    }
    Ok(match (period.from, period.to) {
        (None, None) => None,
        (from, to) => Some(DateRange::new(
            from.unwrap_or(NaiveDate::MIN),
            to.unwrap_or(NaiveDate::MAX),
        )),
    })
}

/// Truncate a string to `max` characters, marking the cut with `...`.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

// ========== Import ==========

/// Imports `files` in order and appends the results to the store. Returns
/// the number of transactions added.
pub async fn cmd_import(
    store: &LocalStore,
    detector: &CategoryDetector,
    options: &ImportOptions,
    files: &[PathBuf],
) -> Result<usize> {
    let (csv_files, rejected): (Vec<&PathBuf>, Vec<&PathBuf>) =
        files.iter().partition(|p| is_csv_path(p));
    for path in &rejected {
        warn!(file = %path.display(), "Skipping file without .csv extension");
        println!("✗ {} - only .csv files can be imported", path.display());
    }
    if csv_files.is_empty() {
        bail!("No CSV files to import");
    }

    let mut imported = 0;
    let mut failed = 0;
    for file in import_files(&csv_files, detector, options).await {
        match file.result {
            Ok(outcome) => {
                store
                    .append_transactions(&outcome.transactions)
                    .context("Failed to save imported transactions")?;
                println!(
                    "✓ {}: {} transactions ({} rows skipped)",
                    file.source,
                    outcome.transactions.len(),
                    outcome.skipped.len()
                );
                for row in &outcome.skipped {
                    println!("    line {}: {}", row.line, row.reason);
                }
                imported += outcome.transactions.len();
            }
            Err(e) => {
                failed += 1;
                println!("✗ {}: {}", file.source, e);
            }
        }
    }

    if imported > 0 {
        let mut settings = store.load_settings()?;
        settings.insert(
            LAST_IMPORT_SETTING.to_string(),
            serde_json::Value::String(Utc::now().to_rfc3339()),
        );
        store.save_settings(&settings)?;
    }
    info!(imported, failed, "Import finished");

    if imported == 0 {
        bail!("No transactions were imported");
    }
    Ok(imported)
}

// ========== Listing ==========

pub struct ListOptions {
    pub range: Option<DateRange>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: SortOrder,
    pub page: usize,
    pub per_page: usize,
}

pub fn query_transactions(store: &LocalStore, options: ListOptions) -> Result<Page<Transaction>> {
    let transactions = store.load_transactions()?;
    let query = TransactionQuery {
        range: options.range,
        category: options.category,
        search: options.search,
        sort: options.sort,
        page: Some(options.page),
        per_page: Some(options.per_page.max(1)),
    };
    Ok(query.apply(&transactions))
}

pub fn cmd_list(store: &LocalStore, options: ListOptions) -> Result<()> {
    let page = query_transactions(store, options)?;
    if page.total == 0 {
        println!("No transactions found.");
        return Ok(());
    }

    println!(
        "{:<10}  {:<40}  {:>14}  {:<20}  Source",
        "Date", "Description", "Amount", "Category"
    );
    println!("{}", "-".repeat(100));
    for tx in &page.items {
        println!(
            "{:<10}  {:<40}  {:>14}  {:<20}  {}",
            tx.date,
            truncate(&tx.description, 40),
            tx.amount.to_string(),
            truncate(&tx.category, 20),
            tx.source.as_deref().unwrap_or("-"),
        );
    }
    println!(
        "\nPage {} of {} ({} transactions)",
        page.page, page.page_count, page.total
    );
    Ok(())
}

// ========== Summary ==========

/// Sum of expenses in the same-length window right before `range`.
fn previous_period_spending(transactions: &[Transaction], range: DateRange) -> Option<Money> {
    let len = range.end.signed_duration_since(range.start);
    let end = range.start.pred_opt()?;
    let start = end.checked_sub_signed(len)?;
    let previous = TransactionQuery {
        range: Some(DateRange::new(start, end)),
        ..Default::default()
    }
    .apply(transactions)
    .items;
    Some(Summary::compute(&previous).total_spending)
}

pub fn cmd_summary(
    store: &LocalStore,
    dictionary: &CategoryDictionary,
    range: Option<DateRange>,
    merchants: usize,
) -> Result<()> {
    let all = store.load_transactions()?;
    let filtered = TransactionQuery {
        range,
        ..Default::default()
    }
    .apply(&all)
    .items;
    let summary = Summary::compute(&filtered);

    let closed = range.filter(|r| r.start > NaiveDate::MIN && r.end < NaiveDate::MAX);
    match closed {
        Some(r) => println!("Spending summary ({r})"),
        None => println!("Spending summary"),
    }
    println!("{}", "=".repeat(50));
    println!("Total spending:   {}", summary.total_spending);
    println!("Transactions:     {}", summary.transaction_count);
    println!("Average:          {}", summary.average_transaction);
    if let Some(largest) = &summary.largest {
        println!(
            "Largest:          {} ({} on {})",
            largest.amount,
            truncate(&largest.description, 30),
            largest.date
        );
    }

    if let Some(previous) = closed.and_then(|r| previous_period_spending(&all, r)) {
        if !previous.is_zero() {
            let trend = calculate_trend(summary.total_spending, previous);
            let arrow = if trend.is_positive { "▲" } else { "▼" };
            println!("vs previous:      {arrow} {:.1}%", trend.value);
        }
    }

    let categories = category_breakdown(&filtered);
    if !categories.is_empty() {
        println!("\nBy category:");
        for total in &categories {
            println!(
                "  {:<24} {:<8} {:>14}  ({} transactions)",
                total.category,
                dictionary.color_of(&total.category),
                total.amount.to_string(),
                total.count
            );
        }
    }

    let top = merchant_timeline(&filtered, None, merchants);
    if !top.is_empty() {
        println!("\nTop merchants:");
        for merchant in &top {
            println!(
                "  {:<30} {:>14}  ({} purchases)",
                truncate(&merchant.name, 30),
                merchant.total_spent.to_string(),
                merchant.points.len()
            );
        }
    }
    Ok(())
}

// ========== Categories ==========

pub fn cmd_categories_list(dictionary: &CategoryDictionary) -> Result<()> {
    println!("{:<26} {:<8} Keywords", "Category", "Color");
    println!("{}", "-".repeat(70));
    for category in dictionary.categories() {
        let keywords = if category.keywords.is_empty() {
            "(fallback)".to_string()
        } else {
            truncate(&category.keywords.join(", "), 60)
        };
        println!("{:<26} {:<8} {}", category.name, category.color, keywords);
    }
    Ok(())
}

/// Labels present in the store with their chart color. Labels that came
/// from a file's own category column may be missing from the dictionary.
pub fn cmd_categories_used(store: &LocalStore, dictionary: &CategoryDictionary) -> Result<Vec<String>> {
    let used = categories_of(&store.load_transactions()?);
    if used.is_empty() {
        println!("No transactions stored.");
        return Ok(used);
    }
    for name in &used {
        let marker = if dictionary.find_by_name(name).is_some() { "" } else { "  (not in dictionary)" };
        println!("{:<26} {:<8}{marker}", name, dictionary.color_of(name));
    }
    Ok(used)
}

/// Saves a user category. Adding to an existing id extends its keywords.
pub fn cmd_categories_add(
    store: &LocalStore,
    name: &str,
    keywords: &[String],
    color: Option<&str>,
) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Category name cannot be empty");
    }
    let keywords: Vec<&str> = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect();
    if keywords.is_empty() {
        bail!("At least one keyword is required");
    }

    let mut entry = CategoryDefinition::new(name, &keywords);
    if let Some(color) = color {
        entry.color = color.to_string();
    }

    let saved = store.load_user_categories()?;
    let merged = CategoryDictionary::from_definitions(saved).merge([entry]);
    store.save_user_categories(merged.categories())?;
    println!("Saved category '{name}' ({} keywords)", keywords.len());
    Ok(())
}

/// Removes a saved user category by name or id. Built-in entries stay.
pub fn cmd_categories_remove(store: &LocalStore, name: &str) -> Result<()> {
    let id = category_id(name);
    let mut saved = store.load_user_categories()?;
    let before = saved.len();
    saved.retain(|c| c.id != id && c.id != name && c.name != name);
    if saved.len() == before {
        if CategoryDictionary::builtin().get(&id).is_some() {
            bail!("'{name}' is a built-in category and cannot be removed");
        }
        bail!("No saved category named '{name}'");
    }
    store.save_user_categories(&saved)?;
    println!("Removed category '{name}'");
    Ok(())
}

// ========== Maintenance ==========

/// Runs detection again over every stored transaction; returns how many
/// changed category.
pub fn cmd_recategorize(store: &LocalStore, detector: &CategoryDetector) -> Result<usize> {
    let mut transactions = store.load_transactions()?;
    let changed = detector.recategorize(&mut transactions);
    if changed > 0 {
        store.save_transactions(&transactions)?;
    }
    println!("Recategorized {changed} of {} transactions", transactions.len());
    Ok(changed)
}

/// Reassigns the category of the transaction identified by `key`. Fails
/// when nothing matches.
pub fn cmd_set_category(
    store: &LocalStore,
    dictionary: &CategoryDictionary,
    key: &TransactionKey,
    category: &str,
) -> Result<usize> {
    let category = category.trim();
    if category.is_empty() {
        bail!("Category name cannot be empty");
    }
    if dictionary.find_by_name(category).is_none() {
        warn!(category, "Category is not in the dictionary");
        println!("Note: '{category}' is not a known category");
    }

    let changed = store.set_category(key, category)?;
    if changed == 0 {
        bail!(
            "No transaction on {} matching '{}' for {}",
            key.date,
            key.description,
            key.amount
        );
    }
    info!(changed, category, "Category reassigned");
    println!("Moved {changed} transaction(s) to '{category}'");
    Ok(changed)
}

pub fn cmd_remove_source(store: &LocalStore, source: &str) -> Result<usize> {
    let removed = store.remove_source(source)?;
    if removed == 0 {
        println!("No transactions came from '{source}'");
    } else {
        println!("Removed {removed} transactions from '{source}'");
    }
    Ok(removed)
}

pub fn cmd_clear(store: &LocalStore, yes: bool) -> Result<()> {
    if !store.has_saved_data() {
        println!("Nothing to clear.");
        return Ok(());
    }
    if !yes {
        bail!("Refusing to delete {} without --yes", store.dir().display());
    }
    store.clear_all()?;
    println!("All local data cleared.");
    Ok(())
}

// ========== Server ==========

pub async fn cmd_serve(
    config: &Config,
    dictionary: CategoryDictionary,
    host: &str,
    port: u16,
) -> Result<()> {
    let db_path = config.database_path()?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let db = faturai_storage::create_db(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    info!(database = %db_path.display(), "Database ready");

    faturai_server::serve(db, dictionary, host, port, config.server_config()?).await
}

/// Today's date in local time, used to resolve presets.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
