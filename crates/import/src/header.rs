use std::fmt;

use faturai_core::text::fold;
use serde::Serialize;

use crate::error::ImportError;

/// Columns the importer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalField {
    Date,
    Description,
    Amount,
    Category,
}

impl CanonicalField {
    pub const REQUIRED: [CanonicalField; 3] = [
        CanonicalField::Date,
        CanonicalField::Description,
        CanonicalField::Amount,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalField::Date => "date",
            CanonicalField::Description => "description",
            CanonicalField::Amount => "amount",
            CanonicalField::Category => "category",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Checked in this order; the first tier with a pattern contained in the
// folded header wins. Generic description words come last so that
// "Valor da transação" stays an amount column.
const PATTERNS: [(CanonicalField, &[&str]); 5] = [
    (CanonicalField::Date, &["data", "date"]),
    (
        CanonicalField::Description,
        &["titulo", "title", "descricao", "description"],
    ),
    (CanonicalField::Amount, &["valor", "amount", "value", "quantia"]),
    (CanonicalField::Category, &["categoria", "category"]),
    (
        CanonicalField::Description,
        &[
            "lancamento",
            "transacao",
            "historico",
            "estabelecimento",
            "memo",
            "merchant",
        ],
    ),
];

/// Maps a raw header to the field it represents, ignoring case, accents,
/// surrounding whitespace and a UTF-8 byte order mark.
pub fn map_header(header: &str) -> Option<CanonicalField> {
    let folded = fold(header.trim_start_matches('\u{feff}').trim());
    if folded.is_empty() {
        return None;
    }
    PATTERNS
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|p| folded.contains(p)))
        .map(|(field, _)| *field)
}

/// Column index assigned to each canonical field of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderMap {
    pub date: usize,
    pub description: usize,
    pub amount: usize,
    pub category: Option<usize>,
}

impl HeaderMap {
    /// The first column mapped to a field claims it. Fails naming every
    /// required field left without a column.
    pub fn from_headers<'a, I>(headers: I) -> Result<Self, ImportError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut date = None;
        let mut description = None;
        let mut amount = None;
        let mut category = None;

        for (index, header) in headers.into_iter().enumerate() {
            let slot = match map_header(header) {
                Some(CanonicalField::Date) => &mut date,
                Some(CanonicalField::Description) => &mut description,
                Some(CanonicalField::Amount) => &mut amount,
                Some(CanonicalField::Category) => &mut category,
                None => continue,
            };
            slot.get_or_insert(index);
        }

        match (date, description, amount) {
            (Some(date), Some(description), Some(amount)) => Ok(HeaderMap {
                date,
                description,
                amount,
                category,
            }),
            _ => {
                let missing = CanonicalField::REQUIRED
                    .into_iter()
                    .zip([date, description, amount])
                    .filter(|(_, index)| index.is_none())
                    .map(|(field, _)| field)
                    .collect();
                Err(ImportError::MissingColumns(missing))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nubank_headers() {
        assert_eq!(map_header("date"), Some(CanonicalField::Date));
        assert_eq!(map_header("title"), Some(CanonicalField::Description));
        assert_eq!(map_header("amount"), Some(CanonicalField::Amount));
        assert_eq!(map_header("category"), Some(CanonicalField::Category));
    }

    #[test]
    fn portuguese_headers_with_accents() {
        assert_eq!(map_header("Data"), Some(CanonicalField::Date));
        assert_eq!(map_header("Título"), Some(CanonicalField::Description));
        assert_eq!(map_header("DESCRIÇÃO"), Some(CanonicalField::Description));
        assert_eq!(map_header("Histórico"), Some(CanonicalField::Description));
        assert_eq!(map_header("Valor (R$)"), Some(CanonicalField::Amount));
        assert_eq!(map_header("Categoria"), Some(CanonicalField::Category));
    }

    #[test]
    fn date_wins_over_description() {
        assert_eq!(map_header("Data do lançamento"), Some(CanonicalField::Date));
    }

    #[test]
    fn amount_and_category_win_over_generic_description_words() {
        assert_eq!(map_header("Valor da transação"), Some(CanonicalField::Amount));
        assert_eq!(
            map_header("Categoria do estabelecimento"),
            Some(CanonicalField::Category)
        );
        assert_eq!(map_header("Estabelecimento"), Some(CanonicalField::Description));
        assert_eq!(
            map_header("Descrição do valor"),
            Some(CanonicalField::Description)
        );
    }

    #[test]
    fn generic_description_column_with_amount_column() {
        let map =
            HeaderMap::from_headers(["Data", "Estabelecimento", "Valor da transação"]).unwrap();
        assert_eq!(map.description, 1);
        assert_eq!(map.amount, 2);
    }

    #[test]
    fn bom_and_unknown_headers() {
        assert_eq!(map_header("\u{feff}date"), Some(CanonicalField::Date));
        assert_eq!(map_header("Parcela"), None);
        assert_eq!(map_header("  "), None);
    }

    #[test]
    fn first_column_claims_field() {
        let map = HeaderMap::from_headers(["Data", "Descrição", "Valor", "Valor em US$"]).unwrap();
        assert_eq!(
            map,
            HeaderMap {
                date: 0,
                description: 1,
                amount: 2,
                category: None,
            }
        );
    }

    #[test]
    fn missing_columns_are_all_named() {
        let err = HeaderMap::from_headers(["date", "foo"]).unwrap_err();
        match &err {
            ImportError::MissingColumns(fields) => {
                assert_eq!(fields, &[CanonicalField::Description, CanonicalField::Amount]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("description, amount"));
    }
}
