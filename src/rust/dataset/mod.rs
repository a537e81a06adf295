//! The churn dataset the dashboard aggregates: loaded once, never mutated.

mod filter;
mod loader;
mod stats;

pub use filter::{DatasetFilter, ALL};
pub use loader::{load_csv, REQUIRED_COLUMNS};
pub use stats::{ChurnSummary, GroupRate, LabelCount};

use serde::Serialize;

use crate::features::{AgeGroup, Gender, Geography};

/// One customer row, reduced to the columns the dashboard groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CustomerRecord {
    pub gender: Gender,
    pub geography: Geography,
    pub exited: bool,
    pub age_group: Option<AgeGroup>,
    pub num_products: Option<u32>,
    pub engaged: Option<bool>,
}

/// Which optional columns the source file carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DatasetColumns {
    pub age_group: bool,
    pub num_products: bool,
    pub engaged: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChurnDataset {
    records: Vec<CustomerRecord>,
    columns: DatasetColumns,
}

impl ChurnDataset {
    pub fn new(records: Vec<CustomerRecord>, columns: DatasetColumns) -> Self {
        Self { records, columns }
    }

    pub fn records(&self) -> &[CustomerRecord] {
        &self.records
    }

    pub fn columns(&self) -> DatasetColumns {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Geographies present in the data, sorted. Used for the filter choices.
    pub fn geographies(&self) -> Vec<Geography> {
        let mut present: Vec<Geography> = self.records.iter().map(|r| r.geography).collect();
        present.sort();
        present.dedup();
        present
    }
}
