use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl DateRange {
    /// Builds an inclusive range; swapped bounds are put back in order.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            DateRange { start, end }
        } else {
            DateRange { start: end, end: start }
        }
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn end_of_month(date: NaiveDate) -> NaiveDate {
    start_of_month(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

fn months_back(date: NaiveDate, n: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(n)).unwrap_or(date)
}

/// Quick date filters offered by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatePreset {
    ThisMonth,
    LastMonth,
    LastThreeMonths,
    LastSixMonths,
    YearToDate,
    LastYear,
}

impl DatePreset {
    pub const ALL: [DatePreset; 6] = [
        DatePreset::ThisMonth,
        DatePreset::LastMonth,
        DatePreset::LastThreeMonths,
        DatePreset::LastSixMonths,
        DatePreset::YearToDate,
        DatePreset::LastYear,
    ];

    pub fn range(self, today: NaiveDate) -> DateRange {
        match self {
            DatePreset::ThisMonth => DateRange::new(start_of_month(today), end_of_month(today)),
            DatePreset::LastMonth => {
                let last = months_back(today, 1);
                DateRange::new(start_of_month(last), end_of_month(last))
            }
            DatePreset::LastThreeMonths => {
                DateRange::new(start_of_month(months_back(today, 3)), end_of_month(today))
            }
            DatePreset::LastSixMonths => {
                DateRange::new(start_of_month(months_back(today, 6)), end_of_month(today))
            }
            DatePreset::YearToDate => {
                let jan1 = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                DateRange::new(jan1, today)
            }
            DatePreset::LastYear => {
                let year = today.year() - 1;
                let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(today);
                let end = NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(today);
                DateRange::new(start, end)
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DatePreset::ThisMonth => "this-month",
            DatePreset::LastMonth => "last-month",
            DatePreset::LastThreeMonths => "last-3-months",
            DatePreset::LastSixMonths => "last-6-months",
            DatePreset::YearToDate => "year-to-date",
            DatePreset::LastYear => "last-year",
        }
    }
}

impl fmt::Display for DatePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatePreset::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("Unknown date preset: '{s}'"))
    }
}

/// Trailing windows used by the spending trend chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeFrame {
    #[serde(rename = "7D")]
    Week,
    #[serde(rename = "30D")]
    Month,
    #[serde(rename = "90D")]
    Quarter,
    #[serde(rename = "12M")]
    Year,
}

impl TimeFrame {
    pub fn days(self) -> u32 {
        match self {
            TimeFrame::Week => 7,
            TimeFrame::Month => 30,
            TimeFrame::Quarter => 90,
            TimeFrame::Year => 365,
        }
    }

    /// The `days()` calendar days ending at `today`, inclusive.
    pub fn range(self, today: NaiveDate) -> DateRange {
        let start = today
            .checked_sub_days(chrono::Days::new(u64::from(self.days() - 1)))
            .unwrap_or(today);
        DateRange::new(start, today)
    }
}

impl FromStr for TimeFrame {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "7D" => Ok(TimeFrame::Week),
            "30D" => Ok(TimeFrame::Month),
            "90D" => Ok(TimeFrame::Quarter),
            "12M" => Ok(TimeFrame::Year),
            other => Err(format!("Unknown time frame: '{other}'")),
        }
    }
}
