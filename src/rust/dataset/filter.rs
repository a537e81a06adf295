use serde::Serialize;

use super::ChurnDataset;
use crate::features::{Gender, Geography};
use crate::predictor::ChurnError;

/// The no-filter sentinel shown in the dropdowns.
pub const ALL: &str = "All";

/// Categorical equality filters. `None` means "All".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DatasetFilter {
    pub gender: Option<Gender>,
    pub geography: Option<Geography>,
}

impl DatasetFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(gender: Option<Gender>, geography: Option<Geography>) -> Self {
        Self { gender, geography }
    }

    /// Parses the two dropdown values. An empty value is treated as "All".
    ///
    /// The geography must be one the dataset actually contains.
    pub fn parse(gender: &str, geography: &str, dataset: &ChurnDataset) -> Result<Self, ChurnError> {
        let gender = match gender.trim() {
            g if g.is_empty() || g.eq_ignore_ascii_case(ALL) => None,
            g => Some(g.parse::<Gender>()?),
        };

        let geography = match geography.trim() {
            g if g.is_empty() || g.eq_ignore_ascii_case(ALL) => None,
            g => {
                let parsed = g.parse::<Geography>()?;
                if !dataset.geographies().contains(&parsed) {
                    return Err(ChurnError::ValidationError(format!(
                        "Geography '{}' does not occur in the dataset",
                        parsed
                    )));
                }
                Some(parsed)
            }
        };

        Ok(Self { gender, geography })
    }

    pub fn is_all(&self) -> bool {
        self.gender.is_none() && self.geography.is_none()
    }

    pub fn gender_label(&self) -> &'static str {
        self.gender.map(|g| g.as_str()).unwrap_or(ALL)
    }

    pub fn geography_label(&self) -> &'static str {
        self.geography.map(|g| g.as_str()).unwrap_or(ALL)
    }
}

impl ChurnDataset {
    /// Returns the rows matching every active filter. The source is left untouched.
    pub fn filter(&self, filter: &DatasetFilter) -> ChurnDataset {
        if filter.is_all() {
            return self.clone();
        }
        let records = self
            .records()
            .iter()
            .filter(|r| filter.gender.map_or(true, |g| r.gender == g))
            .filter(|r| filter.geography.map_or(true, |g| r.geography == g))
            .copied()
            .collect();
        ChurnDataset::new(records, self.columns())
    }
}
