use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::core::error::CrmError;

use super::classify::{classify, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl ReportPeriod {
    /// Parsed before any database access; unsupported values are
    /// validation errors.
    pub fn parse(value: &str) -> Result<Self, CrmError> {
        match value {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(CrmError::Validation(format!(
                "Unsupported report period: {other}"
            ))),
        }
    }

    /// Fixed lookback window per period: 7 days, 4 weeks, 12 months, 5 years.
    pub fn bucket_count(&self) -> usize {
        match self {
            Self::Daily => 7,
            Self::Weekly => 4,
            Self::Monthly => 12,
            Self::Yearly => 5,
        }
    }

    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive();
        let start_date = match self {
            Self::Daily => today - Duration::days(6),
            Self::Weekly => monday_of(today - Duration::weeks(3)),
            Self::Monthly => {
                let (year, month) = months_back(today.year(), today.month(), 11);
                NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(today)
            }
            Self::Yearly => NaiveDate::from_ymd_opt(today.year() - 4, 1, 1).unwrap_or(today),
        };
        start_date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(now)
    }

    /// Label for the bucket a timestamp falls into.
    pub fn bucket_label(&self, at: DateTime<Utc>) -> String {
        let date = at.date_naive();
        match self {
            Self::Daily => date.format("%Y-%m-%d").to_string(),
            Self::Weekly => monday_of(date).format("%Y-%m-%d").to_string(),
            Self::Monthly => date.format("%Y-%m").to_string(),
            Self::Yearly => date.format("%Y").to_string(),
        }
    }

    /// All bucket labels of the window, in chronological order.
    pub fn bucket_labels(&self, now: DateTime<Utc>) -> Vec<String> {
        let today = now.date_naive();
        match self {
            Self::Daily => (0..7)
                .rev()
                .map(|i| (today - Duration::days(i)).format("%Y-%m-%d").to_string())
                .collect(),
            Self::Weekly => (0..4)
                .rev()
                .map(|i| {
                    monday_of(today - Duration::weeks(i))
                        .format("%Y-%m-%d")
                        .to_string()
                })
                .collect(),
            Self::Monthly => (0..12)
                .rev()
                .map(|i| {
                    let (year, month) = months_back(today.year(), today.month(), i);
                    format!("{year:04}-{month:02}")
                })
                .collect(),
            Self::Yearly => ((today.year() - 4)..=today.year())
                .map(|y| y.to_string())
                .collect(),
        }
    }
}

fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn months_back(year: i32, month: u32, back: u32) -> (i32, u32) {
    let total = year * 12 + month as i32 - 1 - back as i32;
    (total.div_euclid(12), (total.rem_euclid(12) + 1) as u32)
}

/// The lead fields the aggregation reads.
#[derive(Debug, Clone)]
pub struct LeadSnapshot {
    pub created_at: DateTime<Utc>,
    pub stage: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BucketRow {
    pub bucket: String,
    pub won: i64,
    pub lost: i64,
    pub open: i64,
    pub amount: f64,
}

/// Group leads by the bucket label of their creation time, classify each
/// against the won/lost name sets, and gap-fill so every bucket of the
/// window appears even when empty.
pub fn aggregate_by_bucket(
    leads: &[LeadSnapshot],
    period: ReportPeriod,
    now: DateTime<Utc>,
    won_names: &HashSet<String>,
    lost_names: &HashSet<String>,
) -> Vec<BucketRow> {
    let window_start = period.window_start(now);
    let mut grouped: HashMap<String, BucketRow> = HashMap::new();

    for lead in leads {
        if lead.created_at < window_start || lead.created_at > now {
            continue;
        }
        let label = period.bucket_label(lead.created_at);
        let row = grouped.entry(label.clone()).or_insert_with(|| BucketRow {
            bucket: label,
            won: 0,
            lost: 0,
            open: 0,
            amount: 0.0,
        });
        match classify(&lead.stage, won_names, lost_names) {
            Outcome::Won => row.won += 1,
            Outcome::Lost => row.lost += 1,
            Outcome::Open => row.open += 1,
        }
        row.amount += lead.amount;
    }

    period
        .bucket_labels(now)
        .into_iter()
        .map(|label| {
            grouped.remove(&label).unwrap_or(BucketRow {
                bucket: label,
                won: 0,
                lost: 0,
                open: 0,
                amount: 0.0,
            })
        })
        .collect()
}

pub fn conversion_rate(won: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        won as f64 / total as f64 * 100.0
    }
}
