use std::time::Duration;

use crate::outcome::Outcome;

/// Summary statistics over every outcome of a run.
///
/// Latency figures cover failed outcomes too, since their latency is measured up to the failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total_wall_time: Duration,
    pub success_count: usize,
    pub error_count: usize,
    pub min_latency: f64,
    pub max_latency: f64,
    pub mean_latency: f64,
    pub total_estimated_tokens: u64,
}

impl Summary {
    pub fn from_outcomes(outcomes: &[Outcome], total_wall_time: Duration) -> Self {
        let success_count = outcomes.iter().filter(|o| o.success).count();
        let total_estimated_tokens = outcomes.iter().filter(|o| o.success).map(|o| o.estimated_tokens).sum();
        let (mut min, mut max, mut sum) = (f64::INFINITY, 0.0_f64, 0.0_f64);
        for latency in outcomes.iter().map(Outcome::latency_secs) {
            min = min.min(latency);
            max = max.max(latency);
            sum += latency;
        }
        let mean_latency = if outcomes.is_empty() { 0.0 } else { sum / outcomes.len() as f64 };
        Self {
            total_wall_time,
            success_count,
            error_count: outcomes.len() - success_count,
            min_latency: if outcomes.is_empty() { 0.0 } else { min },
            max_latency: max,
            mean_latency,
            total_estimated_tokens,
        }
    }

    pub fn total(&self) -> usize { self.success_count + self.error_count }

    pub fn requests_per_second(&self) -> f64 { per_second(self.total() as f64, self.total_wall_time) }

    pub fn tokens_per_second(&self) -> f64 { per_second(self.total_estimated_tokens as f64, self.total_wall_time) }
}

fn per_second(count: f64, wall: Duration) -> f64 {
    let secs = wall.as_secs_f64();
    if secs > 0.0 { count / secs } else { 0.0 }
}
