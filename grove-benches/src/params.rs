//! Benchmark parameter types, rendered as Criterion ids.

use std::fmt;

/// Parameters for a graph construction run.
#[derive(Clone, Copy, Debug)]
pub struct BuildBenchParams {
    /// Number of points inserted.
    pub point_count: usize,
    /// Edges kept per node while building.
    pub edge_size: usize,
    /// Worker threads.
    pub threads: usize,
}

impl fmt::Display for BuildBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n={},edges={},threads={}",
            self.point_count, self.edge_size, self.threads
        )
    }
}

/// Parameters for a search run.
#[derive(Clone, Copy, Debug)]
pub struct SearchBenchParams {
    /// Number of indexed points.
    pub point_count: usize,
    /// Neighbours requested per query.
    pub size: usize,
    /// Search slack.
    pub epsilon: f32,
}

impl fmt::Display for SearchBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n={},k={},eps={}", self.point_count, self.size, self.epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_params_render_as_benchmark_ids() {
        let params = BuildBenchParams {
            point_count: 1_000,
            edge_size: 10,
            threads: 4,
        };
        assert_eq!(params.to_string(), "n=1000,edges=10,threads=4");
    }

    #[test]
    fn search_params_render_as_benchmark_ids() {
        let params = SearchBenchParams {
            point_count: 500,
            size: 10,
            epsilon: 0.1,
        };
        assert_eq!(params.to_string(), "n=500,k=10,eps=0.1");
    }
}
