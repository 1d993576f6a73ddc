//! Metrics table view model
//!
//! Produces the display-ordered, display-filtered metric list. Sorting is a
//! stable two-way partition (abnormal before normal), never a keyed resort.

use crate::models::Metric;

/// Display flags for the metrics table. The two flags are orthogonal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableOptions {
    pub sort_abnormal_first: bool,
    pub filter_abnormal_only: bool,
}

/// Project the metric list into display order.
///
/// Filtering keeps only High/Low metrics as a stable subset. Sorting is a
/// stable partition: all abnormal metrics precede all Normal ones, and the
/// original relative order is preserved within each side.
pub fn project(metrics: &[Metric], opts: TableOptions) -> Vec<Metric> {
    let filtered = metrics
        .iter()
        .filter(|m| !opts.filter_abnormal_only || m.is_abnormal())
        .cloned();

    if opts.sort_abnormal_first {
        let (mut abnormal, normal): (Vec<Metric>, Vec<Metric>) =
            filtered.partition(|m| m.is_abnormal());
        abnormal.extend(normal);
        abnormal
    } else {
        filtered.collect()
    }
}
