use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Local, NaiveDate};
use faturai_core::text::fold;
use faturai_core::Money;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_plain_decimal, r"^-?\d+\.\d+$");
re!(re_numeric_prefix, r"^-?\d+(?:\.\d+)?");

const FALLBACK_FORMATS: &[&str] = &["%Y%m%d", "%d %b %Y", "%b %d, %Y", "%B %d, %Y", "%d %B %Y"];

const PT_MONTHS: [(&str, &str); 12] = [
    ("jan", "jan"),
    ("fev", "feb"),
    ("mar", "mar"),
    ("abr", "apr"),
    ("mai", "may"),
    ("jun", "jun"),
    ("jul", "jul"),
    ("ago", "aug"),
    ("set", "sep"),
    ("out", "oct"),
    ("nov", "nov"),
    ("dez", "dec"),
];

/// Parses a statement date. Day-first numeric dates are tried before ISO,
/// then a handful of textual formats. Returns `None` when nothing fits.
pub fn parse_date_strict(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    // "25/12/2023 10:31" and "2023-12-25T10:31:00" carry a time we ignore.
    let head = s
        .split(|c: char| c.is_whitespace() || c == 'T')
        .next()
        .unwrap_or(s);
    if let Some(date) = parse_numeric_date(head) {
        return Some(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in FALLBACK_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    let translated = translate_months(s)?;
    NaiveDate::parse_from_str(&translated, "%d %b %Y").ok()
}

/// Like [`parse_date_strict`], but an unparseable date becomes `today`.
pub fn parse_date_or(raw: &str, today: NaiveDate) -> NaiveDate {
    parse_date_strict(raw).unwrap_or_else(|| {
        debug!(raw, "unparseable date, using today");
        today
    })
}

pub fn parse_date(raw: &str) -> NaiveDate {
    parse_date_or(raw, Local::now().date_naive())
}

fn parse_numeric_date(s: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.split(['/', '-', '.']).collect();
    let [first, second, third] = parts.as_slice() else {
        return None;
    };
    if !parts
        .iter()
        .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    if first.len() <= 2 && second.len() <= 2 {
        let day = first.parse().ok()?;
        let month = second.parse().ok()?;
        let year = expand_year(third)?;
        NaiveDate::from_ymd_opt(year, month, day)
    } else if first.len() == 4 {
        let year = first.parse().ok()?;
        let month = second.parse().ok()?;
        let day = third.parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    } else {
        None
    }
}

fn expand_year(s: &str) -> Option<i32> {
    let year: i32 = s.parse().ok()?;
    if s.len() <= 2 {
        Some(2000 + year)
    } else {
        Some(year)
    }
}

/// "25 DEZ 2023" / "25/dez/2023" -> "25 dec 2023"
fn translate_months(s: &str) -> Option<String> {
    let tokens: Vec<String> = s
        .split(|c: char| c.is_whitespace() || c == '/' || c == '-')
        .filter(|t| !t.is_empty())
        .map(|t| {
            let t = fold(t.trim_end_matches('.'));
            PT_MONTHS
                .iter()
                .find(|(pt, _)| t.starts_with(pt))
                .map(|(_, en)| en.to_string())
                .unwrap_or(t)
        })
        .collect();
    (tokens.len() == 3).then(|| tokens.join(" "))
}

/// Parses a statement amount, keeping its sign. Plain `43.98` is read as is;
/// anything else is treated as Brazilian formatting (`R$ 1.234,56`).
/// Values that still do not parse become zero.
pub fn parse_amount(raw: &str) -> Money {
    let s = raw.trim();
    if re_plain_decimal().is_match(s) {
        return decimal_or_zero(s, raw);
    }

    let (negative, s) = match s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, s),
    };
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, 'R' | '$' | '.') && !c.is_whitespace())
        .collect();
    let cleaned = cleaned.replacen(',', ".", 1);
    let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);

    let Some(number) = re_numeric_prefix().find(cleaned) else {
        debug!(raw, "non-numeric amount, using zero");
        return Money::zero();
    };
    let amount = decimal_or_zero(number.as_str(), raw);
    if negative {
        -amount
    } else {
        amount
    }
}

fn decimal_or_zero(s: &str, raw: &str) -> Money {
    match Decimal::from_str(s) {
        Ok(d) => Money::from_decimal(d),
        Err(_) => {
            debug!(raw, "amount out of range, using zero");
            Money::zero()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    // ── parse_amount ──────────────────────────────────────────────────────────

    #[test]
    fn amount_brazilian_currency() {
        assert_eq!(parse_amount("R$ 1.234,56"), Money::from_cents(123456));
        assert_eq!(parse_amount("43,98"), Money::from_cents(4398));
        assert_eq!(parse_amount("R$\u{a0}10,00"), Money::from_cents(1000));
    }

    #[test]
    fn amount_plain_decimal_fast_path() {
        assert_eq!(parse_amount("43.98"), Money::from_cents(4398));
        assert_eq!(parse_amount("-12.5"), Money::from_cents(-1250));
    }

    #[test]
    fn amount_keeps_sign() {
        assert_eq!(parse_amount("-R$ 1.000,00"), Money::from_cents(-100000));
        assert_eq!(parse_amount("R$ -50,10"), Money::from_cents(-5010));
        assert_eq!(parse_amount("(75,25)"), Money::from_cents(-7525));
    }

    #[test]
    fn amount_whole_numbers() {
        assert_eq!(parse_amount("100"), Money::from_cents(10000));
        assert_eq!(parse_amount("1.234.567,89"), Money::from_cents(123456789));
        // One dot and digits on both sides always reads as a decimal point.
        assert_eq!(parse_amount("1.500"), Money::from_cents(150));
    }

    #[test]
    fn amount_comma_is_always_the_decimal_separator() {
        // US thousands separators are not recognised.
        assert_eq!(parse_amount("1,234.56"), Money::from_cents(123));
        assert_eq!(parse_amount("R$ 1.234,5"), Money::from_cents(123450));
    }

    #[test]
    fn amount_garbage_is_zero() {
        assert_eq!(parse_amount("abc"), Money::zero());
        assert_eq!(parse_amount(""), Money::zero());
        assert_eq!(parse_amount("R$"), Money::zero());
    }

    #[test]
    fn amount_trailing_text_is_ignored() {
        assert_eq!(parse_amount("12,34 BRL"), Money::from_cents(1234));
    }

    // ── parse_date ────────────────────────────────────────────────────────────

    #[test]
    fn date_day_first() {
        assert_eq!(parse_date_strict("25/12/2023"), Some(d(2023, 12, 25)));
        assert_eq!(parse_date_strict("01-02-2024"), Some(d(2024, 2, 1)));
        assert_eq!(parse_date_strict("5/3/2024"), Some(d(2024, 3, 5)));
        assert_eq!(parse_date_strict("25.12.2023"), Some(d(2023, 12, 25)));
    }

    #[test]
    fn date_two_digit_year() {
        assert_eq!(parse_date_strict("25/12/23"), Some(d(2023, 12, 25)));
    }

    #[test]
    fn date_iso() {
        assert_eq!(parse_date_strict("2023-12-25"), Some(d(2023, 12, 25)));
        assert_eq!(parse_date_strict("2023/12/25"), Some(d(2023, 12, 25)));
    }

    #[test]
    fn date_ignores_time() {
        assert_eq!(parse_date_strict("25/12/2023 14:30"), Some(d(2023, 12, 25)));
        assert_eq!(parse_date_strict("2023-12-25T23:59:00"), Some(d(2023, 12, 25)));
    }

    #[test]
    fn date_textual_fallbacks() {
        assert_eq!(parse_date_strict("20231225"), Some(d(2023, 12, 25)));
        assert_eq!(parse_date_strict("Dec 25, 2023"), Some(d(2023, 12, 25)));
        assert_eq!(parse_date_strict("25 Dec 2023"), Some(d(2023, 12, 25)));
        assert_eq!(parse_date_strict("25 DEZ 2023"), Some(d(2023, 12, 25)));
        assert_eq!(parse_date_strict("03 fev 2024"), Some(d(2024, 2, 3)));
    }

    #[test]
    fn date_invalid_day_month_is_rejected() {
        assert_eq!(parse_date_strict("31/02/2024"), None);
        assert_eq!(parse_date_strict("not-a-date"), None);
    }

    #[test]
    fn date_degrades_to_today() {
        let today = d(2024, 7, 1);
        assert_eq!(parse_date_or("not-a-date", today), today);
        assert_eq!(parse_date_or("", today), today);
        assert_eq!(parse_date_or("25/12/2023", today), d(2023, 12, 25));
    }

    #[test]
    fn date_without_explicit_today_never_fails() {
        assert_eq!(parse_date("not-a-date"), Local::now().date_naive());
    }
}
