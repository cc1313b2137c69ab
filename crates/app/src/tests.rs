//! CLI command tests

use std::path::PathBuf;

use chrono::NaiveDate;
use faturai_core::{CategoryDictionary, DateRange, Money, SortOrder, TransactionKey};
use faturai_import::{CategoryDetector, ImportOptions};
use faturai_storage::LocalStore;
use tempfile::TempDir;

use crate::cli::PeriodArgs;
use crate::commands::{self, truncate, ListOptions};
use crate::config::Config;

fn setup_store() -> (TempDir, LocalStore, Config) {
    let dir = TempDir::new().unwrap();
    let config = Config {
        data_dir: Some(dir.path().join("data")),
        ..Default::default()
    };
    let store = commands::open_store(&config).unwrap();
    (dir, store, config)
}

fn write_csv(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn list_all() -> ListOptions {
    ListOptions {
        range: None,
        category: None,
        search: None,
        sort: SortOrder::DateAsc,
        page: 1,
        per_page: 100,
    }
}

const JANUARY: &str = "Data;Descrição;Valor\n\
05/01/2024;Uber *Trip;23,90\n\
10/01/2024;Netflix.com;55,90\n\
12/01/2024;Cobasi Pinheiros;120,00\n";

const FEBRUARY: &str = "date,title,amount\n\
2024-02-03,iFood,42.50\n\
2024-02-04,,10.00\n\
2024-02-09,Pagamento recebido,-300.00\n";

// ========== Import ==========

#[tokio::test]
async fn test_cmd_import_appends_files_in_order() {
    let (dir, store, config) = setup_store();
    let jan = write_csv(&dir, "janeiro.csv", JANUARY);
    let feb = write_csv(&dir, "fevereiro.csv", FEBRUARY);
    let detector = CategoryDetector::new(&commands::load_dictionary(&config, &store).unwrap());

    let imported = commands::cmd_import(&store, &detector, &ImportOptions::default(), &[jan, feb])
        .await
        .unwrap();
    assert_eq!(imported, 5);

    let stored = store.load_transactions().unwrap();
    assert_eq!(stored.len(), 5);
    assert_eq!(stored[0].source.as_deref(), Some("janeiro.csv"));
    assert_eq!(stored[0].category, "Transporte");
    assert_eq!(stored[3].source.as_deref(), Some("fevereiro.csv"));
    assert_eq!(stored[3].category, "Alimentação");

    let settings = store.load_settings().unwrap();
    assert!(settings.contains_key("last_import"));
}

#[tokio::test]
async fn test_cmd_import_skips_non_csv_and_failed_files() {
    let (dir, store, _config) = setup_store();
    let good = write_csv(&dir, "ok.csv", JANUARY);
    let broken = write_csv(&dir, "broken.csv", "date,description\n2024-01-01,Padaria\n");
    let pdf = write_csv(&dir, "fatura.pdf", "%PDF-1.4");
    let detector = CategoryDetector::builtin();

    let imported = commands::cmd_import(
        &store,
        &detector,
        &ImportOptions::default(),
        &[pdf, broken, good],
    )
    .await
    .unwrap();
    assert_eq!(imported, 3);
    assert_eq!(store.load_transactions().unwrap().len(), 3);
}

#[tokio::test]
async fn test_cmd_import_without_csv_files_fails() {
    let (dir, store, _config) = setup_store();
    let txt = write_csv(&dir, "notas.txt", JANUARY);
    let result = commands::cmd_import(
        &store,
        &CategoryDetector::builtin(),
        &ImportOptions::default(),
        &[txt],
    )
    .await;
    assert!(result.is_err());
    assert!(!store.has_saved_data());
}

#[tokio::test]
async fn test_cmd_import_absolute_amounts() {
    let (dir, store, _config) = setup_store();
    let feb = write_csv(&dir, "fev.csv", FEBRUARY);
    let options = ImportOptions {
        absolute_amounts: true,
        ..Default::default()
    };
    commands::cmd_import(&store, &CategoryDetector::builtin(), &options, &[feb])
        .await
        .unwrap();
    let stored = store.load_transactions().unwrap();
    assert!(stored.iter().all(|t| t.amount.is_expense()));
}

// ========== Listing ==========

#[tokio::test]
async fn test_query_transactions_filters() {
    let (dir, store, _config) = setup_store();
    let jan = write_csv(&dir, "janeiro.csv", JANUARY);
    let feb = write_csv(&dir, "fevereiro.csv", FEBRUARY);
    commands::cmd_import(
        &store,
        &CategoryDetector::builtin(),
        &ImportOptions::default(),
        &[jan, feb],
    )
    .await
    .unwrap();

    let page = commands::query_transactions(
        &store,
        ListOptions {
            range: Some(DateRange::new(d(2024, 2, 1), d(2024, 2, 29))),
            ..list_all()
        },
    )
    .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].description, "iFood");

    let page = commands::query_transactions(
        &store,
        ListOptions {
            search: Some("netflix".to_string()),
            ..list_all()
        },
    )
    .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].category, "Lazer");

    let page = commands::query_transactions(
        &store,
        ListOptions {
            sort: SortOrder::AmountDesc,
            per_page: 2,
            page: 2,
            ..list_all()
        },
    )
    .unwrap();
    assert_eq!(page.page_count, 3);
    assert_eq!(page.items.len(), 2);

    assert!(commands::cmd_list(&store, list_all()).is_ok());
    assert!(commands::cmd_summary(
        &store,
        &CategoryDictionary::builtin(),
        Some(DateRange::new(d(2024, 1, 1), d(2024, 1, 31))),
        5
    )
    .is_ok());
}

#[test]
fn test_resolve_period() {
    let today = d(2024, 3, 15);

    let preset = PeriodArgs {
        preset: Some("last-month".to_string()),
        ..Default::default()
    };
    let range = commands::resolve_period(&preset, today).unwrap().unwrap();
    assert_eq!(range, DateRange::new(d(2024, 2, 1), d(2024, 2, 29)));

    let open = PeriodArgs {
        from: Some(d(2024, 1, 10)),
        ..Default::default()
    };
    let range = commands::resolve_period(&open, today).unwrap().unwrap();
    assert_eq!(range.start, d(2024, 1, 10));
    assert_eq!(range.end, NaiveDate::MAX);

    assert!(commands::resolve_period(&PeriodArgs::default(), today)
        .unwrap()
        .is_none());

    let bad = PeriodArgs {
        preset: Some("forever".to_string()),
        ..Default::default()
    };
    assert!(commands::resolve_period(&bad, today).is_err());
}

#[test]
fn test_truncate() {
    assert_eq!(truncate("Padaria", 10), "Padaria");
    assert_eq!(truncate("Restaurante do Zé", 10), "Restaur...");
    assert_eq!(truncate("ção ção ção", 6), "ção...");
}

// ========== Categories ==========

#[tokio::test]
async fn test_categories_add_then_recategorize() {
    let (dir, store, config) = setup_store();
    let jan = write_csv(&dir, "janeiro.csv", "date,description,amount\n2024-01-10,Smart Fit Paulista,99.90\n");
    commands::cmd_import(
        &store,
        &CategoryDetector::new(&commands::load_dictionary(&config, &store).unwrap()),
        &ImportOptions::default(),
        &[jan],
    )
    .await
    .unwrap();
    assert_eq!(store.load_transactions().unwrap()[0].category, "Outros");

    commands::cmd_categories_add(&store, "Academia", &["smart fit".to_string()], Some("#00ACC1"))
        .unwrap();
    let dictionary = commands::load_dictionary(&config, &store).unwrap();
    assert_eq!(dictionary.get("academia").unwrap().color, "#00ACC1");

    let changed =
        commands::cmd_recategorize(&store, &CategoryDetector::new(&dictionary)).unwrap();
    assert_eq!(changed, 1);
    assert_eq!(store.load_transactions().unwrap()[0].category, "Academia");

    // Nothing left to change
    let changed =
        commands::cmd_recategorize(&store, &CategoryDetector::new(&dictionary)).unwrap();
    assert_eq!(changed, 0);
}

#[test]
fn test_categories_add_extends_keywords() {
    let (_dir, store, config) = setup_store();
    commands::cmd_categories_add(&store, "Pets", &["petlove".to_string()], None).unwrap();
    commands::cmd_categories_add(&store, "Pets", &["petlove".to_string(), "zee.dog".to_string()], None)
        .unwrap();

    let saved = store.load_user_categories().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].keywords, vec!["petlove", "zee.dog"]);

    let dictionary = commands::load_dictionary(&config, &store).unwrap();
    assert_eq!(dictionary.len(), CategoryDictionary::builtin().len());
    let pets = dictionary.get("pets").unwrap();
    assert!(pets.keywords.contains(&"cobasi".to_string()));
    assert!(pets.keywords.contains(&"zee.dog".to_string()));
}

#[test]
fn test_categories_add_requires_keywords() {
    let (_dir, store, _config) = setup_store();
    assert!(commands::cmd_categories_add(&store, "Vazio", &[" ".to_string()], None).is_err());
    assert!(commands::cmd_categories_add(&store, " ", &["x".to_string()], None).is_err());
}

#[test]
fn test_categories_remove() {
    let (_dir, store, _config) = setup_store();
    commands::cmd_categories_add(&store, "Academia", &["smart fit".to_string()], None).unwrap();
    commands::cmd_categories_remove(&store, "Academia").unwrap();
    assert!(store.load_user_categories().unwrap().is_empty());

    let err = commands::cmd_categories_remove(&store, "Transporte").unwrap_err();
    assert!(err.to_string().contains("built-in"));
    assert!(commands::cmd_categories_remove(&store, "Nada").is_err());
}

#[test]
fn test_categories_list() {
    assert!(commands::cmd_categories_list(&CategoryDictionary::builtin()).is_ok());
}

#[tokio::test]
async fn test_categories_used() {
    let (dir, store, _config) = setup_store();
    let dictionary = CategoryDictionary::builtin();
    assert!(commands::cmd_categories_used(&store, &dictionary).unwrap().is_empty());

    let jan = write_csv(
        &dir,
        "janeiro.csv",
        "date,title,amount,category\n2024-01-05,Uber *Trip,23.90,\n2024-01-06,Livraria,80.00,Livros\n",
    );
    commands::cmd_import(&store, &CategoryDetector::builtin(), &ImportOptions::default(), &[jan])
        .await
        .unwrap();
    let used = commands::cmd_categories_used(&store, &dictionary).unwrap();
    assert_eq!(used, ["Livros", "Transporte"]);
}

// ========== Maintenance ==========

#[tokio::test]
async fn test_set_category_moves_one_transaction() {
    let (dir, store, config) = setup_store();
    let jan = write_csv(&dir, "janeiro.csv", JANUARY);
    commands::cmd_import(&store, &CategoryDetector::builtin(), &ImportOptions::default(), &[jan])
        .await
        .unwrap();
    let dictionary = commands::load_dictionary(&config, &store).unwrap();

    let key = TransactionKey {
        date: d(2024, 1, 10),
        description: "Netflix.com".to_string(),
        amount: Money::from_cents(5590),
    };
    assert_eq!(commands::cmd_set_category(&store, &dictionary, &key, "Assinaturas").unwrap(), 1);

    let stored = store.load_transactions().unwrap();
    assert_eq!(stored[1].category, "Assinaturas");
    assert_eq!(stored[0].category, "Transporte");
    assert_eq!(stored[2].category, "Pets");

    let missing = TransactionKey {
        amount: Money::from_cents(5591),
        ..key.clone()
    };
    assert!(commands::cmd_set_category(&store, &dictionary, &missing, "Lazer").is_err());
    assert!(commands::cmd_set_category(&store, &dictionary, &key, "  ").is_err());
    assert_eq!(store.load_transactions().unwrap()[1].category, "Assinaturas");
}



#[tokio::test]
async fn test_remove_source_and_clear() {
    let (dir, store, _config) = setup_store();
    let jan = write_csv(&dir, "janeiro.csv", JANUARY);
    let feb = write_csv(&dir, "fevereiro.csv", FEBRUARY);
    commands::cmd_import(
        &store,
        &CategoryDetector::builtin(),
        &ImportOptions::default(),
        &[jan, feb],
    )
    .await
    .unwrap();

    assert_eq!(commands::cmd_remove_source(&store, "janeiro.csv").unwrap(), 3);
    assert_eq!(commands::cmd_remove_source(&store, "janeiro.csv").unwrap(), 0);
    assert_eq!(store.load_transactions().unwrap().len(), 2);

    assert!(commands::cmd_clear(&store, false).is_err());
    assert!(store.has_saved_data());
    commands::cmd_clear(&store, true).unwrap();
    assert!(!store.has_saved_data());
    assert!(commands::cmd_clear(&store, false).is_ok());
}
