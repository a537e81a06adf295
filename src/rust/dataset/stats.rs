use std::cmp::Ordering;
use std::collections::BTreeMap;
use serde::Serialize;

use super::{ChurnDataset, CustomerRecord};
use crate::predictor::ChurnLabel;

/// Number of customers carrying one outcome label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

/// Churn rate of one group: the mean of `Exited` over its rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRate {
    pub label: String,
    pub rate: f64,
    pub count: usize,
    pub churned: usize,
}

/// Everything the dashboard charts for one filtered view.
///
/// Series for optional columns are `None` when the dataset lacks the column,
/// and empty when the view has no rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChurnSummary {
    pub total: usize,
    pub churned: usize,
    pub churn_rate: f64,
    pub distribution: Vec<LabelCount>,
    pub by_geography: Vec<GroupRate>,
    pub by_age_group: Option<Vec<GroupRate>>,
    pub by_products: Option<Vec<GroupRate>>,
    pub by_engagement: Option<Vec<GroupRate>>,
}

#[derive(Default, Clone, Copy)]
struct Tally {
    count: usize,
    churned: usize,
}

fn tally_by<K, F>(records: &[CustomerRecord], key: F) -> BTreeMap<K, Tally>
where
    K: Ord,
    F: Fn(&CustomerRecord) -> Option<K>,
{
    let mut groups: BTreeMap<K, Tally> = BTreeMap::new();
    for record in records {
        if let Some(k) = key(record) {
            let tally = groups.entry(k).or_default();
            tally.count += 1;
            tally.churned += usize::from(record.exited);
        }
    }
    groups
}

fn to_rates<K>(groups: BTreeMap<K, Tally>, label: impl Fn(&K) -> String) -> Vec<GroupRate> {
    groups
        .iter()
        .map(|(k, t)| GroupRate {
            label: label(k),
            rate: t.churned as f64 / t.count as f64,
            count: t.count,
            churned: t.churned,
        })
        .collect()
}

/// Highest rate first; equal rates fall back to the label.
fn sort_by_rate(rates: &mut [GroupRate]) {
    rates.sort_by(|a, b| {
        b.rate
            .partial_cmp(&a.rate)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.label.cmp(&b.label))
    });
}

fn engagement_label(engaged: bool) -> &'static str {
    if engaged {
        "Engaged"
    } else {
        "Not Engaged"
    }
}

impl ChurnSummary {
    pub fn from_dataset(dataset: &ChurnDataset) -> Self {
        let records = dataset.records();
        let columns = dataset.columns();
        let total = records.len();
        let churned = records.iter().filter(|r| r.exited).count();

        let mut distribution: Vec<LabelCount> = [
            (ChurnLabel::Stayed, total - churned),
            (ChurnLabel::Churned, churned),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(label, count)| LabelCount {
            label: label.as_str().to_string(),
            count,
        })
        .collect();
        // Stable sort keeps Stayed first on a tie
        distribution.sort_by(|a, b| b.count.cmp(&a.count));

        let mut by_geography = to_rates(tally_by(records, |r| Some(r.geography)), |g| g.to_string());
        sort_by_rate(&mut by_geography);

        let by_age_group = columns.age_group.then(|| {
            let mut rates = to_rates(tally_by(records, |r| r.age_group), |g| g.to_string());
            sort_by_rate(&mut rates);
            rates
        });

        // BTreeMap order is already ascending by product count
        let by_products = columns
            .num_products
            .then(|| to_rates(tally_by(records, |r| r.num_products), |n| n.to_string()));

        // false < true, so Not Engaged comes first
        let by_engagement = columns
            .engaged
            .then(|| to_rates(tally_by(records, |r| r.engaged), |e| engagement_label(*e).to_string()));

        Self {
            total,
            churned,
            churn_rate: if total == 0 {
                0.0
            } else {
                churned as f64 / total as f64
            },
            distribution,
            by_geography,
            by_age_group,
            by_products,
            by_engagement,
        }
    }
}
