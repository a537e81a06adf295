mod categories;
mod encoder;
mod input;
mod schema;

pub use categories::{parse_yes_no, AgeGroup, Gender, Geography};
pub use encoder::{FeatureEncoder, FeatureVector};
pub use input::{
    CustomerInput, RawCustomerInput, AGE_RANGE, BALANCE_RANGE, CREDIT_SCORE_RANGE,
    NUM_PRODUCTS_RANGE, SALARY_RANGE, TENURE_RANGE,
};
pub use schema::{FeatureSchema, CHURN_FEATURES};
