use ndarray::Array1;

use super::categories::{AgeGroup, Gender, Geography};
use super::input::{CustomerInput, RawCustomerInput};
use super::schema::FeatureSchema;
use crate::predictor::ChurnError;

/// The numeric encoding of one customer, laid out in `CHURN_FEATURES` order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Array1<f32>,
}

impl FeatureVector {
    /// Wraps already-encoded values. The predictor still checks the length
    /// against its schema before using them.
    pub fn from_values(values: Vec<f32>) -> Self {
        Self {
            values: Array1::from_vec(values),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &Array1<f32> {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        self.values.get(index).copied()
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.values.to_vec()
    }

    /// Looks a value up by column name.
    pub fn named(&self, schema: &FeatureSchema, name: &str) -> Option<f32> {
        schema.position(name).and_then(|i| self.get(i))
    }
}

fn flag(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Turns validated customer fields into the classifier's feature vector.
#[derive(Debug, Clone, Default)]
pub struct FeatureEncoder {
    schema: FeatureSchema,
}

impl FeatureEncoder {
    pub fn new() -> Self {
        Self {
            schema: FeatureSchema::churn(),
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Encodes a validated customer.
    ///
    /// Derived columns are computed in this order; engagement reads the encoded
    /// activity flag:
    /// 1. Gender: Male is 1
    /// 2. HasCrCard: Yes is 1
    /// 3. IsActiveMember: Yes is 1
    /// 4. Geography one-hot with France as the all-zero reference
    /// 5. Age group indicators (Adult: 30 < age <= 50, Senior: age > 50)
    /// 6. EngagedCustomer: active and holding more than one product
    pub fn encode(&self, input: &CustomerInput) -> FeatureVector {
        let gender = flag(input.gender == Gender::Male);
        let has_cr_card = flag(input.has_cr_card);
        let is_active = flag(input.is_active_member);
        let geography_germany = flag(input.geography == Geography::Germany);
        let geography_spain = flag(input.geography == Geography::Spain);
        let age_group = AgeGroup::from_age(input.age);
        let age_group_adult = flag(age_group.is_adult());
        let age_group_senior = flag(age_group.is_senior());
        let engaged = flag(is_active == 1.0 && input.num_products > 1);

        FeatureVector::from_values(vec![
            input.credit_score as f32,
            gender,
            input.age as f32,
            input.tenure as f32,
            input.balance as f32,
            input.num_products as f32,
            has_cr_card,
            is_active,
            input.estimated_salary as f32,
            geography_germany,
            geography_spain,
            age_group_adult,
            age_group_senior,
            engaged,
        ])
    }

    /// Validates a raw submission and encodes it.
    pub fn encode_raw(&self, raw: &RawCustomerInput) -> Result<FeatureVector, ChurnError> {
        let input = CustomerInput::validate(raw)?;
        Ok(self.encode(&input))
    }
}
