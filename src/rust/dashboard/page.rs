//! HTML rendering of the dashboard page.

use std::fmt::Write;

use super::charts::DashboardCharts;
use crate::dataset::{ChurnSummary, DatasetFilter, ALL};
use crate::features::{
    Gender, Geography, RawCustomerInput, AGE_RANGE, BALANCE_RANGE, CREDIT_SCORE_RANGE,
    NUM_PRODUCTS_RANGE, SALARY_RANGE, TENURE_RANGE,
};
use crate::predictor::PredictionResult;

/// What happened to the last form submission.
#[derive(Debug, Clone)]
pub enum PredictionOutcome {
    Predicted(PredictionResult),
    Rejected(String),
    Failed,
}

pub struct PageContext<'a> {
    pub filter: &'a DatasetFilter,
    pub geographies: &'a [Geography],
    pub summary: &'a ChurnSummary,
    pub charts: &'a DashboardCharts,
    pub form: &'a RawCustomerInput,
    pub outcome: Option<&'a PredictionOutcome>,
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

const STYLE: &str = "body{font-family:sans-serif;max-width:960px;margin:0 auto;padding:1rem;color:#222}\
section{margin:2rem 0}\
.filters,.predict{background:#f5f7fa;padding:1rem;border-radius:6px}\
label{display:block;margin:.4rem 0}\
.result{padding:.8rem;border-radius:6px;background:#eef6ee}\
.error{padding:.8rem;border-radius:6px;background:#fbeaea;color:#8a1f1f}\
.muted{color:#666}";

fn options(choices: &[&str], selected: &str) -> String {
    choices
        .iter()
        .map(|choice| {
            let marker = if choice.eq_ignore_ascii_case(selected.trim()) {
                " selected"
            } else {
                ""
            };
            format!(
                "<option value=\"{0}\"{1}>{0}</option>",
                escape_html(choice),
                marker
            )
        })
        .collect()
}

fn chart_section(out: &mut String, heading: &str, svg: Option<&str>) {
    if let Some(svg) = svg {
        let _ = write!(out, "<section><h2>{}</h2>{}</section>", escape_html(heading), svg);
    }
}

fn number_input<T: std::fmt::Display>(label: &str, name: &str, value: T, range: (T, T), step: &str) -> String {
    format!(
        "<label>{label} <input type=\"number\" name=\"{name}\" value=\"{value}\" min=\"{min}\" max=\"{max}\" step=\"{step}\" required></label>",
        label = escape_html(label),
        name = name,
        value = value,
        min = range.0,
        max = range.1,
        step = step,
    )
}

fn render_filters(out: &mut String, ctx: &PageContext<'_>) {
    let genders: Vec<&str> = std::iter::once(ALL)
        .chain(Gender::ALL.iter().map(|g| g.as_str()))
        .collect();
    let geographies: Vec<&str> = std::iter::once(ALL)
        .chain(ctx.geographies.iter().map(|g| g.as_str()))
        .collect();

    let _ = write!(
        out,
        "<section class=\"filters\"><h2>Filter Data</h2><form method=\"get\" action=\"/\">\
<label>Filter by Gender <select name=\"gender\">{}</select></label>\
<label>Filter by Geography <select name=\"geography\">{}</select></label>\
<button type=\"submit\">Apply</button></form>\
<p class=\"muted\">{} customers in view, churn rate {:.2}%</p></section>",
        options(&genders, ctx.filter.gender_label()),
        options(&geographies, ctx.filter.geography_label()),
        ctx.summary.total,
        ctx.summary.churn_rate * 100.0,
    );
}

fn render_outcome(out: &mut String, outcome: &PredictionOutcome) {
    match outcome {
        PredictionOutcome::Predicted(result) => {
            let _ = write!(
                out,
                "<div class=\"result\"><h3>Prediction Result</h3>\
<p><strong>Churn Prediction:</strong> {}</p>\
<p><strong>Probability of Churn:</strong> {}</p></div>",
                result.label,
                result.probability_percent()
            );
        }
        PredictionOutcome::Rejected(message) => {
            let _ = write!(out, "<div class=\"error\">{}</div>", escape_html(message));
        }
        PredictionOutcome::Failed => {
            out.push_str("<div class=\"error\">The prediction could not be computed. Please try again.</div>");
        }
    }
}

fn render_form(out: &mut String, ctx: &PageContext<'_>) {
    let form = ctx.form;
    let products: Vec<String> = (NUM_PRODUCTS_RANGE.0..=NUM_PRODUCTS_RANGE.1)
        .map(|n| n.to_string())
        .collect();
    let products: Vec<&str> = products.iter().map(String::as_str).collect();
    let geographies: Vec<&str> = Geography::ALL.iter().map(|g| g.as_str()).collect();
    let genders: Vec<&str> = Gender::ALL.iter().map(|g| g.as_str()).collect();

    let _ = write!(
        out,
        "<section class=\"predict\"><h2>Customer Churn Predictor</h2>\
<form method=\"post\" action=\"/predict?gender={}&amp;geography={}\">\
<h3>Enter Customer Information:</h3>",
        escape_html(ctx.filter.gender_label()),
        escape_html(ctx.filter.geography_label()),
    );
    out.push_str(&number_input("Credit Score", "credit_score", form.credit_score, CREDIT_SCORE_RANGE, "1"));
    out.push_str(&number_input("Age", "age", form.age, AGE_RANGE, "1"));
    out.push_str(&number_input(
        "Tenure (Years with Bank)",
        "tenure",
        form.tenure,
        TENURE_RANGE,
        "1",
    ));
    out.push_str(&number_input("Balance", "balance", form.balance, BALANCE_RANGE, "any"));
    let _ = write!(
        out,
        "<label>Number of Bank Products <select name=\"num_products\">{}</select></label>\
<label>Has Credit Card? <select name=\"has_cr_card\">{}</select></label>\
<label>Is Active Member? <select name=\"is_active_member\">{}</select></label>",
        options(&products, &form.num_products.to_string()),
        options(&["Yes", "No"], &form.has_cr_card),
        options(&["Yes", "No"], &form.is_active_member),
    );
    out.push_str(&number_input(
        "Estimated Salary",
        "estimated_salary",
        form.estimated_salary,
        SALARY_RANGE,
        "any",
    ));
    let _ = write!(
        out,
        "<label>Geography <select name=\"geography\">{}</select></label>\
<label>Gender <select name=\"gender\">{}</select></label>\
<button type=\"submit\">Predict</button></form>",
        options(&geographies, &form.geography),
        options(&genders, &form.gender),
    );

    if let Some(outcome) = ctx.outcome {
        render_outcome(out, outcome);
    }
    out.push_str("</section>");
}

/// Renders the complete dashboard document.
pub fn render_page(ctx: &PageContext<'_>) -> String {
    let mut out = String::with_capacity(64 * 1024);
    let _ = write!(
        out,
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"UTF-8\">\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\
<title>Customer Churn Dashboard</title><style>{}</style></head><body>\
<h1>Customer Churn Dashboard</h1>",
        STYLE
    );

    render_filters(&mut out, ctx);

    let charts = ctx.charts;
    chart_section(&mut out, "Churn Distribution", Some(&charts.distribution));
    chart_section(&mut out, "Churn Rate by Geography", Some(&charts.by_geography));
    chart_section(&mut out, "Churn Rate by Age Group", charts.by_age_group.as_deref());
    chart_section(
        &mut out,
        "Churn Rate by Number of Bank Products",
        charts.by_products.as_deref(),
    );
    chart_section(&mut out, "Churn Rate by Engagement", charts.by_engagement.as_deref());
    chart_section(&mut out, "Feature Importance (XGBoost)", charts.importance.as_deref());

    render_form(&mut out, ctx);
    out.push_str("</body></html>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{ChurnDataset, DatasetColumns};
    use crate::predictor::ChurnLabel;

    fn empty_context_parts() -> (ChurnSummary, DashboardCharts) {
        let summary = ChurnSummary::from_dataset(&ChurnDataset::new(Vec::new(), DatasetColumns::default()));
        let charts = DashboardCharts::render(&summary, None).unwrap();
        (summary, charts)
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>\"Tom\" & 'Jerry'</b>"),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_page_has_defaults_and_result() {
        let (summary, charts) = empty_context_parts();
        let filter = DatasetFilter::all();
        let form = RawCustomerInput::default();
        let outcome = PredictionOutcome::Predicted(PredictionResult {
            label: ChurnLabel::Churned,
            churn_probability: 0.7345,
        });
        let html = render_page(&PageContext {
            filter: &filter,
            geographies: &[Geography::France],
            summary: &summary,
            charts: &charts,
            form: &form,
            outcome: Some(&outcome),
        });

        assert!(html.contains("name=\"credit_score\" value=\"650\""));
        assert!(html.contains("name=\"age\" value=\"40\""));
        assert!(html.contains("<option value=\"France\" selected>"));
        assert!(html.contains("Churn Prediction:</strong> Churned"));
        assert!(html.contains("73.45%"));
        assert!(!html.contains("Churn Rate by Age Group"));
    }

    #[test]
    fn test_rejection_message_is_escaped() {
        let (summary, charts) = empty_context_parts();
        let filter = DatasetFilter::all();
        let form = RawCustomerInput::default();
        let outcome = PredictionOutcome::Rejected("Gender '<script>' is not one of Male, Female".into());
        let html = render_page(&PageContext {
            filter: &filter,
            geographies: &[],
            summary: &summary,
            charts: &charts,
            form: &form,
            outcome: Some(&outcome),
        });
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("'<script>'"));
    }
}
