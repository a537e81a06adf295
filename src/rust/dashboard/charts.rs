//! SVG bar charts for the dashboard page.

use plotters::coord::ranged1d::SegmentValue;
use plotters::prelude::*;
use serde::Serialize;

use crate::dataset::{ChurnSummary, GroupRate};
use crate::predictor::FeatureImportance;

/// Bars alternate between these two colours.
pub const PALETTE: [RGBColor; 2] = [RGBColor(0x1f, 0x77, 0xb4), RGBColor(0xff, 0x7f, 0x0e)];

const CHART_SIZE: (u32, u32) = (640, 400);
const IMPORTANCE_SIZE: (u32, u32) = (900, 480);

#[derive(Debug, thiserror::Error)]
#[error("Chart rendering failed: {0}")]
pub struct ChartError(String);

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for ChartError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        ChartError(err.to_string())
    }
}

/// Renders labelled values as a vertical bar chart and returns the SVG document.
pub fn bar_chart(title: &str, y_desc: &str, bars: &[(String, f64)]) -> Result<String, ChartError> {
    render_bars(title, y_desc, bars, CHART_SIZE)
}

fn render_bars(
    title: &str,
    y_desc: &str,
    bars: &[(String, f64)],
    size: (u32, u32),
) -> Result<String, ChartError> {
    let max = bars.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
    let top = if max > 0.0 { max * 1.15 } else { 1.0 };
    let slots = bars.len().max(1) as u32;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 22))
            .margin(12)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d((0u32..slots).into_segmented(), 0f64..top)?;

        let label_of = |x: &SegmentValue<u32>| match x {
            SegmentValue::CenterOf(i) => bars
                .get(*i as usize)
                .map(|(label, _)| label.clone())
                .unwrap_or_default(),
            _ => String::new(),
        };

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(bars.len().max(1))
            .x_label_formatter(&label_of)
            .y_desc(y_desc)
            .axis_desc_style(("sans-serif", 15))
            .draw()?;

        chart.draw_series(
            Histogram::vertical(&chart)
                .style_func(|x, _| {
                    let index = match x {
                        SegmentValue::Exact(i) | SegmentValue::CenterOf(i) => *i as usize,
                        SegmentValue::Last => 0,
                    };
                    PALETTE[index % PALETTE.len()].filled()
                })
                .margin(12)
                .data(bars.iter().enumerate().map(|(i, (_, v))| (i as u32, *v))),
        )?;

        root.present()?;
    }
    Ok(svg)
}

fn rate_bars(rates: &[GroupRate]) -> Vec<(String, f64)> {
    rates.iter().map(|r| (r.label.clone(), r.rate)).collect()
}

/// Every chart the page shows for one filtered view.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardCharts {
    pub distribution: String,
    pub by_geography: String,
    pub by_age_group: Option<String>,
    pub by_products: Option<String>,
    pub by_engagement: Option<String>,
    pub importance: Option<String>,
}

impl DashboardCharts {
    pub fn render(
        summary: &ChurnSummary,
        importance: Option<&[FeatureImportance]>,
    ) -> Result<Self, ChartError> {
        let distribution: Vec<(String, f64)> = summary
            .distribution
            .iter()
            .map(|c| (c.label.clone(), c.count as f64))
            .collect();

        Ok(Self {
            distribution: bar_chart("Churn Distribution", "Number of Customers", &distribution)?,
            by_geography: bar_chart(
                "Churn Rate by Geography",
                "Churn Rate",
                &rate_bars(&summary.by_geography),
            )?,
            by_age_group: summary
                .by_age_group
                .as_deref()
                .map(|rates| bar_chart("Churn Rate by Age Group", "Churn Rate", &rate_bars(rates)))
                .transpose()?,
            by_products: summary
                .by_products
                .as_deref()
                .map(|rates| {
                    bar_chart(
                        "Churn Rate by Number of Bank Products",
                        "Churn Rate",
                        &rate_bars(rates),
                    )
                })
                .transpose()?,
            by_engagement: summary
                .by_engagement
                .as_deref()
                .map(|rates| bar_chart("Churn Rate by Engagement", "Churn Rate", &rate_bars(rates)))
                .transpose()?,
            importance: importance.map(importance_chart).transpose()?,
        })
    }
}

pub fn importance_chart(scores: &[FeatureImportance]) -> Result<String, ChartError> {
    let bars: Vec<(String, f64)> = scores.iter().map(|s| (s.feature.clone(), s.score)).collect();
    render_bars("Feature Importance (XGBoost)", "Importance (gain)", &bars, IMPORTANCE_SIZE)
}
