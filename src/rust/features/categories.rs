use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::predictor::ChurnError;

/// Customer gender as recorded in the dataset and accepted by the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ChurnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err(ChurnError::ValidationError(format!(
                "Gender '{}' is not one of Male, Female",
                s
            ))),
        }
    }
}

/// Customer country. France is the reference level of the one-hot encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Geography {
    France,
    Germany,
    Spain,
}

impl Geography {
    pub const ALL: [Geography; 3] = [Geography::France, Geography::Germany, Geography::Spain];

    pub fn as_str(&self) -> &'static str {
        match self {
            Geography::France => "France",
            Geography::Germany => "Germany",
            Geography::Spain => "Spain",
        }
    }
}

impl fmt::Display for Geography {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Geography {
    type Err = ChurnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "france" => Ok(Geography::France),
            "germany" => Ok(Geography::Germany),
            "spain" => Ok(Geography::Spain),
            _ => Err(ChurnError::ValidationError(format!(
                "Geography '{}' is not one of France, Germany, Spain",
                s
            ))),
        }
    }
}

/// Age bucket used both as a model feature and as a dashboard grouping.
///
/// Young covers ages up to and including 30, Adult covers 31 through 50,
/// Senior everything above 50.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgeGroup {
    Young,
    Adult,
    Senior,
}

impl AgeGroup {
    pub fn from_age(age: u32) -> Self {
        if age > 50 {
            AgeGroup::Senior
        } else if age > 30 {
            AgeGroup::Adult
        } else {
            AgeGroup::Young
        }
    }

    /// Resolves a group from the two indicator columns of a prepared dataset.
    /// Senior wins when both flags are set.
    pub fn from_indicators(adult: bool, senior: bool) -> Self {
        if senior {
            AgeGroup::Senior
        } else if adult {
            AgeGroup::Adult
        } else {
            AgeGroup::Young
        }
    }

    pub fn is_adult(&self) -> bool {
        matches!(self, AgeGroup::Adult)
    }

    pub fn is_senior(&self) -> bool {
        matches!(self, AgeGroup::Senior)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::Young => "Young",
            AgeGroup::Adult => "Adult",
            AgeGroup::Senior => "Senior",
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a Yes/No answer. `true`/`false` and `1`/`0` are accepted as well so the
/// HTML form and the JSON API share one parser.
pub fn parse_yes_no(field: &str, value: &str) -> Result<bool, ChurnError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" => Ok(true),
        "no" | "false" | "0" => Ok(false),
        _ => Err(ChurnError::ValidationError(format!(
            "{} '{}' must be Yes or No",
            field, value
        ))),
    }
}
