//! Plain-text rendering of a session for the console.

use crate::pipeline::{Scenario, Session};
use crate::record::FeatureVector;
use crate::stats::{ColumnSummary, FeatureCorrelation, Histogram};

const BAR_WIDTH: usize = 40;

/// Inputs the simulator starts from before the user changes anything.
pub fn default_scenario() -> FeatureVector {
    FeatureVector::new(7.0, 250.0, 180.0, 300.0, 600.0)
}

pub fn render_session(session: &Session) -> String {
    let recommendation = match session.recommendation() {
        Some((mean, advice)) => format!(
            "Mean predicted moisture: {mean:.2}%\n-> {}\n\n",
            advice.field_message()
        ),
        None => "No predictions to summarize.\n\n".to_string(),
    };
    let distribution = session
        .histogram()
        .map(|histogram| {
            format!(
                "Soil moisture distribution\n--------------------------\n{}",
                render_histogram(&histogram)
            )
        })
        .unwrap_or_default();

    format!(
        "Soil moisture forecast\n======================\n\n\
         {} rows ({} train / {} test)\n\n\
         Model metrics\n-------------\n{}\n\n\
         Recommendation\n--------------\n{recommendation}\
         Correlation with SOIL_PCT\n-------------------------\n{}\n\
         {distribution}",
        session.data().n_samples(),
        session.split().train.n_samples(),
        session.split().test.n_samples(),
        session.report(),
        render_correlations(&session.correlations()),
    )
}

pub fn render_correlations(correlations: &[FeatureCorrelation]) -> String {
    correlations
        .iter()
        .map(|correlation| match correlation.coefficient {
            Some(r) => format!("{:<8} {:>6.2}\n", correlation.feature.column(), r),
            None => format!("{:<8} {:>6}\n", correlation.feature.column(), "n/a"),
        })
        .collect()
}

pub fn render_histogram(histogram: &Histogram) -> String {
    let peak = histogram.counts.iter().copied().max().unwrap_or(0).max(1);
    histogram
        .counts
        .iter()
        .zip(histogram.edges.windows(2))
        .map(|(&count, edges)| {
            format!(
                "{:>7.2} - {:>7.2} | {:<width$} {}\n",
                edges[0],
                edges[1],
                "#".repeat(count * BAR_WIDTH / peak),
                count,
                width = BAR_WIDTH
            )
        })
        .collect()
}

const SUMMARY_HEADER: [&str; 10] = ["column", "count", "missing", "mean", "std", "min", "25%", "50%", "75%", "max"];

fn summary_row(cells: &[String]) -> String {
    let mut cells = cells.iter();
    let first = cells.next().map_or("", String::as_str);
    let widths = [5, 7, 9, 9, 9, 9, 9, 9, 9];
    let rest: String = cells
        .zip(widths)
        .map(|(cell, width)| format!(" {cell:>width$}"))
        .collect();
    format!("{first:<9}{rest}\n")
}

pub fn render_summary(summaries: &[ColumnSummary]) -> String {
    let cell = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
    let header = summary_row(&SUMMARY_HEADER.map(String::from));
    let rows = summaries.iter().map(|s| {
        summary_row(&[
            s.column.to_string(),
            s.count.to_string(),
            s.missing.to_string(),
            cell(s.mean),
            cell(s.std),
            cell(s.min),
            cell(s.q25),
            cell(s.median),
            cell(s.q75),
            cell(s.max),
        ])
    });
    std::iter::once(header).chain(rows).collect()
}

pub fn render_scenario(vector: &FeatureVector, scenario: &Scenario) -> String {
    let inputs = vector
        .features()
        .iter()
        .zip(vector.values())
        .map(|(feature, value)| format!("{feature} {value}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Scenario [{inputs}]\nPredicted moisture for this scenario: {:.2}%\n-> {}\n",
        scenario.moisture,
        scenario.advice.scenario_message()
    )
}
