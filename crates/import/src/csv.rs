use std::borrow::Cow;
use std::fmt;
use std::io::Read;

use chrono::{Local, NaiveDate};
use csv::StringRecord;
use faturai_core::Transaction;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::categorize::CategoryDetector;
use crate::error::ImportError;
use crate::header::{CanonicalField, HeaderMap};
use crate::locale::{parse_amount, parse_date_or};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Field delimiter; sniffed from the header line when `None`.
    #[serde(default)]
    pub delimiter: Option<u8>,
    /// Store every amount as its absolute value.
    #[serde(default)]
    pub absolute_amounts: bool,
    /// Tag written to each transaction's `source`, usually the file name.
    #[serde(default)]
    pub source: Option<String>,
}

impl ImportOptions {
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    MissingDescription,
    MissingField { field: CanonicalField },
    Malformed { message: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingDescription => f.write_str("empty description"),
            SkipReason::MissingField { field } => write!(f, "no value for {field}"),
            SkipReason::Malformed { message } => write!(f, "malformed row: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    /// 1-based line in the file.
    pub line: u64,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub transactions: Vec<Transaction>,
    pub skipped: Vec<SkippedRow>,
}

/// Turns one statement file into transactions.
///
/// The pass is linear: records are read, the header is mapped once, then
/// each row is converted on its own. Rows without a description are
/// skipped; bad dates fall back to `today` and bad amounts to zero.
pub struct CsvImporter {
    today: NaiveDate,
}

impl Default for CsvImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvImporter {
    pub fn new() -> Self {
        Self::with_today(Local::now().date_naive())
    }

    /// Uses a fixed date for rows whose date cannot be parsed.
    pub fn with_today(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn import<R: Read>(
        &self,
        mut data: R,
        detector: &CategoryDetector,
        options: &ImportOptions,
    ) -> Result<ImportOutcome, ImportError> {
        let mut bytes = Vec::new();
        data.read_to_end(&mut bytes)?;
        let text = decode_text(&bytes);
        let text = text.trim_start_matches('\u{feff}');

        let delimiter = options.delimiter.unwrap_or_else(|| sniff_delimiter(text));
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();

        let mut skipped = Vec::new();
        let mut rows: Vec<(u64, StringRecord)> = Vec::new();
        for result in reader.records() {
            match result {
                Ok(record) => {
                    if record.iter().all(|field| field.trim().is_empty()) {
                        continue;
                    }
                    rows.push((line_of(&record), record));
                }
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or_default();
                    skip(&mut skipped, line, SkipReason::Malformed { message: e.to_string() });
                }
            }
        }

        if rows.is_empty() && skipped.is_empty() {
            return Err(ImportError::EmptyFile);
        }

        let map = HeaderMap::from_headers(headers.iter())?;

        let mut transactions = Vec::with_capacity(rows.len());
        for (line, record) in &rows {
            match self.convert(record, &map, detector, options) {
                Ok(tx) => transactions.push(tx),
                Err(reason) => skip(&mut skipped, *line, reason),
            }
        }

        info!(
            source = options.source.as_deref().unwrap_or("-"),
            imported = transactions.len(),
            skipped = skipped.len(),
            "CSV import finished"
        );

        if transactions.is_empty() {
            return Err(ImportError::NoValidTransactions);
        }
        Ok(ImportOutcome {
            transactions,
            skipped,
        })
    }

    fn convert(
        &self,
        record: &StringRecord,
        map: &HeaderMap,
        detector: &CategoryDetector,
        options: &ImportOptions,
    ) -> Result<Transaction, SkipReason> {
        let description = record
            .get(map.description)
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or(SkipReason::MissingDescription)?;
        let raw_date = record.get(map.date).ok_or(SkipReason::MissingField {
            field: CanonicalField::Date,
        })?;
        let raw_amount = record.get(map.amount).ok_or(SkipReason::MissingField {
            field: CanonicalField::Amount,
        })?;

        let date = parse_date_or(raw_date, self.today);
        let mut amount = parse_amount(raw_amount);
        if options.absolute_amounts {
            amount = amount.abs();
        }
        let category = map
            .category
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| detector.detect(description));

        Ok(Transaction::new(date, description, amount, category).with_source(options.source.clone()))
    }
}

fn skip(skipped: &mut Vec<SkippedRow>, line: u64, reason: SkipReason) {
    warn!(line, %reason, "skipping CSV row");
    skipped.push(SkippedRow { line, reason });
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or_default()
}

/// Convenience wrapper returning only the transactions.
pub fn import_csv<R: Read>(
    data: R,
    detector: &CategoryDetector,
    options: &ImportOptions,
) -> Result<Vec<Transaction>, ImportError> {
    CsvImporter::new()
        .import(data, detector, options)
        .map(|outcome| outcome.transactions)
}

/// Statement exports are UTF-8 or a Windows code page; anything that is not
/// valid UTF-8 is read as Windows-1252, which agrees with Latin-1 outside 0x80-0x9F.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => Cow::Owned(bytes.iter().map(|&b| windows_1252(b)).collect()),
    }
}

// 0x80..=0x9F in Windows-1252. Unassigned slots keep their C1 code point.
const CP1252_HIGH: [char; 32] = [
    '\u{20ac}', '\u{81}', '\u{201a}', '\u{192}', '\u{201e}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{2c6}', '\u{2030}', '\u{160}', '\u{2039}', '\u{152}', '\u{8d}', '\u{17d}', '\u{8f}',
    '\u{90}', '\u{2018}', '\u{2019}', '\u{201c}', '\u{201d}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{2dc}', '\u{2122}', '\u{161}', '\u{203a}', '\u{153}', '\u{9d}', '\u{17e}', '\u{178}',
];

fn windows_1252(byte: u8) -> char {
    match byte {
        0x80..=0x9f => CP1252_HIGH[usize::from(byte - 0x80)],
        _ => char::from(byte),
    }
}

/// Picks `;` when the header line has more semicolons than commas.
pub fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().find(|l| !l.trim().is_empty()).unwrap_or_default();
    let semicolons = header.matches(';').count();
    let commas = header.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faturai_core::Money;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn run(data: &str) -> Result<ImportOutcome, ImportError> {
        CsvImporter::with_today(today()).import(
            data.as_bytes(),
            &CategoryDetector::builtin(),
            &ImportOptions::default(),
        )
    }

    #[test]
    fn nubank_export() {
        let data = "date,title,amount\n\
                    2024-01-15,Restaurante do Zé,43.98\n\
                    2024-01-16,Uber *Trip,19.90\n\
                    2024-01-20,Pagamento recebido,-500.00\n";
        let outcome = run(data).unwrap();
        let txs = outcome.transactions;
        assert_eq!(txs.len(), 3);
        assert_eq!(txs[0].date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(txs[0].category, "Alimentação");
        assert_eq!(txs[1].category, "Transporte");
        assert_eq!(txs[2].amount, Money::from_cents(-50000));
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn brazilian_semicolon_export() {
        let data = "Data;Descrição;Valor\n\
                    25/12/2023;PADARIA REAL;R$ 1.234,56\n\
                    26/12/2023;NETFLIX.COM;55,90\n";
        let txs = run(data).unwrap().transactions;
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].date, NaiveDate::from_ymd_opt(2023, 12, 25).unwrap());
        assert_eq!(txs[0].amount, Money::from_cents(123456));
        assert_eq!(txs[1].category, "Lazer");
    }

    #[test]
    fn one_transaction_per_row_in_file_order() {
        let mut data = String::from("Data;Estabelecimento;Valor\n");
        for day in 1..=20 {
            data.push_str(&format!("{day:02}/03/2024;Loja {day};{day},50\n"));
        }
        let txs = run(&data).unwrap().transactions;
        assert_eq!(txs.len(), 20);
        let days: Vec<u32> = txs.iter().map(|t| chrono::Datelike::day(&t.date)).collect();
        assert_eq!(days, (1..=20).collect::<Vec<_>>());
    }

    #[test]
    fn rows_with_empty_description_are_skipped() {
        let mut data = String::from("date,description,amount\n");
        for i in 0..10 {
            let desc = if i % 3 == 0 { "  " } else { "Compra" };
            data.push_str(&format!("2024-02-{:02},{desc},10.00\n", i + 1));
        }
        let outcome = run(&data).unwrap();
        assert_eq!(outcome.transactions.len(), 6);
        assert_eq!(outcome.skipped.len(), 4);
        assert_eq!(outcome.skipped[0].reason, SkipReason::MissingDescription);
        assert_eq!(outcome.skipped[0].line, 2);
    }

    #[test]
    fn ten_rows_three_blank_descriptions_yield_seven() {
        let data = "date,description,amount\n\
                    2024-02-01,A,1.00\n2024-02-02,,1.00\n2024-02-03,C,1.00\n\
                    2024-02-04,D,1.00\n2024-02-05,,1.00\n2024-02-06,F,1.00\n\
                    2024-02-07,G,1.00\n2024-02-08,,1.00\n2024-02-09,I,1.00\n\
                    2024-02-10,J,1.00\n";
        assert_eq!(run(data).unwrap().transactions.len(), 7);
    }

    #[test]
    fn missing_amount_column_is_rejected() {
        let data = "date,description,notes\n2024-01-01,Padaria,x\n";
        let err = run(data).unwrap_err();
        assert!(matches!(&err, ImportError::MissingColumns(f) if f == &[CanonicalField::Amount]));
        assert!(err.to_string().contains("amount"));
    }

    #[test]
    fn header_only_file_is_empty() {
        assert!(matches!(run("date,description,amount\n"), Err(ImportError::EmptyFile)));
        assert!(matches!(run(""), Err(ImportError::EmptyFile)));
    }

    #[test]
    fn blank_lines_do_not_count_as_rows() {
        let data = "date,description,amount\n\n,,\n2024-01-01,Padaria,5.00\n\n";
        let outcome = run(data).unwrap();
        assert_eq!(outcome.transactions.len(), 1);
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn all_rows_skipped_means_no_valid_transactions() {
        let data = "date,description,amount\n2024-01-01,,5.00\n2024-01-02, ,6.00\n";
        assert!(matches!(run(data), Err(ImportError::NoValidTransactions)));
    }

    #[test]
    fn short_row_missing_amount_is_skipped() {
        let data = "date,description,amount\n2024-01-01,Padaria\n2024-01-02,Uber,9.90\n";
        let outcome = run(data).unwrap();
        assert_eq!(outcome.transactions.len(), 1);
        assert_eq!(
            outcome.skipped[0].reason,
            SkipReason::MissingField {
                field: CanonicalField::Amount
            }
        );
    }

    #[test]
    fn lenient_date_and_amount() {
        let data = "date,description,amount\nontem,Padaria,abc\n";
        let txs = run(data).unwrap().transactions;
        assert_eq!(txs[0].date, today());
        assert_eq!(txs[0].amount, Money::zero());
    }

    #[test]
    fn category_from_file_is_kept() {
        let data = "date,title,amount,category\n\
                    2024-01-01,Uber *Trip,10.00,Trabalho\n\
                    2024-01-02,Uber *Trip,10.00,\n";
        let txs = run(data).unwrap().transactions;
        assert_eq!(txs[0].category, "Trabalho");
        assert_eq!(txs[1].category, "Transporte");
    }

    #[test]
    fn absolute_amounts_and_source_tag() {
        let options = ImportOptions {
            absolute_amounts: true,
            ..ImportOptions::default()
        }
        .with_source("fatura.csv");
        let data = "date,title,amount\n2024-01-20,Estorno,-50.00\n";
        let txs = CsvImporter::with_today(today())
            .import(data.as_bytes(), &CategoryDetector::builtin(), &options)
            .unwrap()
            .transactions;
        assert_eq!(txs[0].amount, Money::from_cents(5000));
        assert_eq!(txs[0].source.as_deref(), Some("fatura.csv"));
    }

    #[test]
    fn latin1_with_bom_and_quotes() {
        let latin1: &[u8] = b"Data;Hist\xf3rico;Valor\n01/02/2024;\"A\xe7ougue; Centro\";10,00\n";
        let txs = run(&decode_text(latin1)).unwrap().transactions;
        assert_eq!(txs[0].description, "Açougue; Centro");
        assert_eq!(txs[0].category, "Alimentação");

        let with_bom = "\u{feff}date,title,amount\n2024-01-01,Padaria,1.00\n";
        assert_eq!(run(with_bom).unwrap().transactions.len(), 1);
    }

    #[test]
    fn windows_1252_punctuation() {
        let bytes: &[u8] = b"Data;Descri\xe7\xe3o;Valor\n01/02/2024;\x93Caf\xe9\x94 \x80 Bar;10,00\n";
        let text = decode_text(bytes);
        let txs = run(&text).unwrap().transactions;
        assert_eq!(txs[0].description, "\u{201c}Café\u{201d} \u{20ac} Bar");
        assert_eq!(decode_text(b"\x81\xff"), "\u{81}\u{ff}");
    }

    #[test]
    fn generic_description_header_with_amount_header() {
        let data = "Data;Estabelecimento;Valor da transação\n05/02/2024;Padaria;12,00\n";
        let txs = run(data).unwrap().transactions;
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].description, "Padaria");
        assert_eq!(txs[0].amount, Money::from_cents(1200));
    }

    #[test]
    fn sniffs_delimiter() {
        assert_eq!(sniff_delimiter("a;b;c\n1,5;2;3"), b';');
        assert_eq!(sniff_delimiter("\na,b,c"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn import_csv_returns_transactions_only() {
        let data = "date,title,amount\n2024-01-01,Padaria,1.00\n";
        let txs = import_csv(data.as_bytes(), &CategoryDetector::builtin(), &ImportOptions::default()).unwrap();
        assert_eq!(txs.len(), 1);
    }
}
