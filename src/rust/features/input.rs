use std::collections::HashMap;
use serde::{Deserialize, Serialize};

use super::categories::{parse_yes_no, Gender, Geography};
use crate::predictor::ChurnError;

pub const CREDIT_SCORE_RANGE: (i64, i64) = (300, 900);
pub const AGE_RANGE: (i64, i64) = (18, 100);
pub const TENURE_RANGE: (i64, i64) = (0, 10);
pub const NUM_PRODUCTS_RANGE: (i64, i64) = (1, 4);
pub const BALANCE_RANGE: (f64, f64) = (0.0, 300_000.0);
pub const SALARY_RANGE: (f64, f64) = (0.0, 300_000.0);

/// Customer fields exactly as a human enters them, before any validation.
///
/// This is the shape accepted by `POST /api/predict`. Categorical answers stay
/// as text so a bad spelling is reported as a validation error instead of a
/// deserialization failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCustomerInput {
    pub credit_score: i64,
    pub age: i64,
    pub tenure: i64,
    pub balance: f64,
    pub num_products: i64,
    pub has_cr_card: String,
    pub is_active_member: String,
    pub estimated_salary: f64,
    pub geography: String,
    pub gender: String,
}

impl Default for RawCustomerInput {
    /// The values the prediction form starts with.
    fn default() -> Self {
        Self {
            credit_score: 650,
            age: 40,
            tenure: 3,
            balance: 0.0,
            num_products: 1,
            has_cr_card: "Yes".to_string(),
            is_active_member: "Yes".to_string(),
            estimated_salary: 0.0,
            geography: "France".to_string(),
            gender: "Male".to_string(),
        }
    }
}

impl RawCustomerInput {
    /// Builds a raw input from url-encoded form fields. Missing fields fall back to the
    /// form defaults; fields that are present but not numeric are rejected.
    pub fn from_form(fields: &HashMap<String, String>) -> Result<Self, ChurnError> {
        let defaults = Self::default();
        let text = |key: &str, default: &str| -> String {
            fields.get(key).cloned().unwrap_or_else(|| default.to_string())
        };

        Ok(Self {
            credit_score: parse_int_field(fields, "credit_score", "CreditScore", defaults.credit_score)?,
            age: parse_int_field(fields, "age", "Age", defaults.age)?,
            tenure: parse_int_field(fields, "tenure", "Tenure", defaults.tenure)?,
            balance: parse_float_field(fields, "balance", "Balance", defaults.balance)?,
            num_products: parse_int_field(fields, "num_products", "NumOfProducts", defaults.num_products)?,
            has_cr_card: text("has_cr_card", &defaults.has_cr_card),
            is_active_member: text("is_active_member", &defaults.is_active_member),
            estimated_salary: parse_float_field(
                fields,
                "estimated_salary",
                "EstimatedSalary",
                defaults.estimated_salary,
            )?,
            geography: text("geography", &defaults.geography),
            gender: text("gender", &defaults.gender),
        })
    }
}

fn parse_int_field(
    fields: &HashMap<String, String>,
    key: &str,
    label: &str,
    default: i64,
) -> Result<i64, ChurnError> {
    match fields.get(key) {
        None => Ok(default),
        Some(value) => value.trim().parse::<i64>().map_err(|_| {
            ChurnError::ValidationError(format!("{} '{}' is not a whole number", label, value))
        }),
    }
}

fn parse_float_field(
    fields: &HashMap<String, String>,
    key: &str,
    label: &str,
    default: f64,
) -> Result<f64, ChurnError> {
    match fields.get(key) {
        None => Ok(default),
        Some(value) => value.trim().parse::<f64>().map_err(|_| {
            ChurnError::ValidationError(format!("{} '{}' is not a number", label, value))
        }),
    }
}

/// A customer whose every field is inside its allowed domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CustomerInput {
    pub credit_score: u32,
    pub gender: Gender,
    pub age: u32,
    pub tenure: u32,
    pub balance: f64,
    pub num_products: u32,
    pub has_cr_card: bool,
    pub is_active_member: bool,
    pub estimated_salary: f64,
    pub geography: Geography,
}

impl TryFrom<RawCustomerInput> for CustomerInput {
    type Error = ChurnError;

    fn try_from(raw: RawCustomerInput) -> Result<Self, Self::Error> {
        CustomerInput::validate(&raw)
    }
}

impl CustomerInput {
    /// Validates every field of a raw submission.
    ///
    /// # Returns
    /// * `Ok(CustomerInput)` if all fields are in range
    /// * `Err(ChurnError::ValidationError)` naming the first offending field otherwise
    pub fn validate(raw: &RawCustomerInput) -> Result<Self, ChurnError> {
        let credit_score = check_int("CreditScore", raw.credit_score, CREDIT_SCORE_RANGE)?;
        let age = check_int("Age", raw.age, AGE_RANGE)?;
        let tenure = check_int("Tenure", raw.tenure, TENURE_RANGE)?;
        let balance = check_amount("Balance", raw.balance, BALANCE_RANGE)?;
        let num_products = check_int("NumOfProducts", raw.num_products, NUM_PRODUCTS_RANGE)?;
        let has_cr_card = parse_yes_no("HasCrCard", &raw.has_cr_card)?;
        let is_active_member = parse_yes_no("IsActiveMember", &raw.is_active_member)?;
        let estimated_salary = check_amount("EstimatedSalary", raw.estimated_salary, SALARY_RANGE)?;
        let geography = raw.geography.parse::<Geography>()?;
        let gender = raw.gender.parse::<Gender>()?;

        Ok(Self {
            credit_score,
            gender,
            age,
            tenure,
            balance,
            num_products,
            has_cr_card,
            is_active_member,
            estimated_salary,
            geography,
        })
    }
}

fn check_int(field: &str, value: i64, (min, max): (i64, i64)) -> Result<u32, ChurnError> {
    if value < min || value > max {
        return Err(ChurnError::ValidationError(format!(
            "{} {} is outside [{}, {}]",
            field, value, min, max
        )));
    }
    // Bounds above keep the value non-negative and small.
    Ok(value as u32)
}

fn check_amount(field: &str, value: f64, (min, max): (f64, f64)) -> Result<f64, ChurnError> {
    if !value.is_finite() {
        return Err(ChurnError::ValidationError(format!("{} must be a finite amount", field)));
    }
    if value < min || value > max {
        return Err(ChurnError::ValidationError(format!(
            "{} {} is outside [{}, {}]",
            field, value, min, max
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> RawCustomerInput {
        RawCustomerInput {
            credit_score: 650,
            age: 40,
            tenure: 3,
            balance: 50_000.0,
            num_products: 2,
            has_cr_card: "Yes".into(),
            is_active_member: "Yes".into(),
            estimated_salary: 60_000.0,
            geography: "Germany".into(),
            gender: "Male".into(),
        }
    }

    #[test]
    fn test_valid_input() {
        let input = CustomerInput::validate(&example()).unwrap();
        assert_eq!(input.credit_score, 650);
        assert_eq!(input.geography, Geography::Germany);
        assert!(input.has_cr_card);
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let mut raw = example();
        raw.credit_score = 300;
        raw.age = 100;
        raw.tenure = 0;
        raw.balance = 300_000.0;
        raw.num_products = 4;
        assert!(CustomerInput::validate(&raw).is_ok());
    }

    #[test]
    fn test_out_of_range_fields() {
        let cases: Vec<(fn(&mut RawCustomerInput), &str)> = vec![
            (|r| r.credit_score = 299, "CreditScore"),
            (|r| r.credit_score = 901, "CreditScore"),
            (|r| r.age = 17, "Age"),
            (|r| r.age = 101, "Age"),
            (|r| r.tenure = 11, "Tenure"),
            (|r| r.balance = -1.0, "Balance"),
            (|r| r.balance = f64::NAN, "Balance"),
            (|r| r.num_products = 0, "NumOfProducts"),
            (|r| r.num_products = 5, "NumOfProducts"),
            (|r| r.estimated_salary = 300_000.5, "EstimatedSalary"),
            (|r| r.estimated_salary = f64::INFINITY, "EstimatedSalary"),
            (|r| r.geography = "Italy".into(), "Geography"),
            (|r| r.gender = "".into(), "Gender"),
            (|r| r.is_active_member = "sometimes".into(), "IsActiveMember"),
        ];

        for (mutate, field) in cases {
            let mut raw = example();
            mutate(&mut raw);
            match CustomerInput::validate(&raw) {
                Err(ChurnError::ValidationError(msg)) => {
                    assert!(msg.contains(field), "message '{}' should name {}", msg, field)
                }
                other => panic!("expected validation error for {}, got {:?}", field, other),
            }
        }
    }

    #[test]
    fn test_from_form_uses_defaults_and_rejects_text() {
        let mut fields = HashMap::new();
        fields.insert("age".to_string(), "55".to_string());
        fields.insert("geography".to_string(), "Spain".to_string());
        let raw = RawCustomerInput::from_form(&fields).unwrap();
        assert_eq!(raw.age, 55);
        assert_eq!(raw.credit_score, 650);
        assert_eq!(raw.geography, "Spain");

        fields.insert("balance".to_string(), "lots".to_string());
        assert!(matches!(
            RawCustomerInput::from_form(&fields),
            Err(ChurnError::ValidationError(_))
        ));
    }
}
