// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Aggregation functions over numeric samples, selected by a type tag.

use derive_more::Display;

/// Tag selecting an aggregation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum AggregationKind {
    #[display("MAX")]
    Max,
    #[display("MIN")]
    Min,
    #[display("MEAN")]
    Mean,
    #[display("MEDIAN")]
    Median,
}

impl AggregationKind {
    pub const ALL: [AggregationKind; 4] = [
        AggregationKind::Max,
        AggregationKind::Min,
        AggregationKind::Mean,
        AggregationKind::Median,
    ];
}

/// A pure aggregation over a set of samples. Empty input is undefined
/// and yields `None`.
pub trait AggregationFunction: Send + Sync {
    fn kind(&self) -> AggregationKind;

    fn apply(&self, samples: &[f64]) -> Option<f64>;
}

struct Max;
struct Min;
struct Mean;
struct Median;

impl AggregationFunction for Max {
    fn kind(&self) -> AggregationKind {
        AggregationKind::Max
    }

    fn apply(&self, samples: &[f64]) -> Option<f64> {
        samples.iter().copied().reduce(f64::max)
    }
}

impl AggregationFunction for Min {
    fn kind(&self) -> AggregationKind {
        AggregationKind::Min
    }

    fn apply(&self, samples: &[f64]) -> Option<f64> {
        samples.iter().copied().reduce(f64::min)
    }
}

impl AggregationFunction for Mean {
    fn kind(&self) -> AggregationKind {
        AggregationKind::Mean
    }

    fn apply(&self, samples: &[f64]) -> Option<f64> {
        if samples.is_empty() {
            return None;
        }
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }
}

impl AggregationFunction for Median {
    fn kind(&self) -> AggregationKind {
        AggregationKind::Median
    }

    fn apply(&self, samples: &[f64]) -> Option<f64> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 1 {
            Some(sorted[mid])
        } else {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        }
    }
}

/// All built-in aggregation functions, exactly one per kind.
pub fn builtin_functions() -> Vec<Box<dyn AggregationFunction>> {
    vec![Box::new(Max), Box::new(Min), Box::new(Mean), Box::new(Median)]
}

/// Looks up the single implementation for `kind`.
pub fn function_for(kind: AggregationKind) -> Box<dyn AggregationFunction> {
    match kind {
        AggregationKind::Max => Box::new(Max),
        AggregationKind::Min => Box::new(Min),
        AggregationKind::Mean => Box::new(Mean),
        AggregationKind::Median => Box::new(Median),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn apply(kind: AggregationKind, samples: &[f64]) -> Option<f64> {
        function_for(kind).apply(samples)
    }

    #[test]
    fn test_median_even_count() {
        assert_eq!(apply(AggregationKind::Median, &[2.0, 4.0, 6.0, 8.0]), Some(5.0));
    }

    #[test]
    fn test_median_odd_count() {
        assert_eq!(
            apply(AggregationKind::Median, &[2.0, 4.0, 6.0, 8.0, 100.0]),
            Some(6.0)
        );
    }

    #[test]
    fn test_median_unsorted_input() {
        assert_eq!(
            apply(AggregationKind::Median, &[8.0, 2.0, 6.0, 4.0]),
            Some(5.0)
        );
    }

    #[test]
    fn test_mean() {
        assert_eq!(apply(AggregationKind::Mean, &[2.0, 4.0, 6.0, 8.0]), Some(5.0));
    }

    #[test]
    fn test_max_and_min() {
        assert_eq!(apply(AggregationKind::Max, &[2.0, 8.0, 4.0]), Some(8.0));
        assert_eq!(apply(AggregationKind::Min, &[2.0, 8.0, 4.0]), Some(2.0));
    }

    #[test]
    fn test_empty_input_is_undefined_for_all_kinds() {
        for kind in AggregationKind::ALL {
            assert_eq!(apply(kind, &[]), None, "{kind} of [] must be undefined");
        }
    }

    #[test]
    fn test_exactly_one_implementation_per_kind() {
        let functions = builtin_functions();
        assert_eq!(functions.len(), AggregationKind::ALL.len());

        let kinds: HashSet<AggregationKind> = functions.iter().map(|f| f.kind()).collect();
        assert_eq!(kinds.len(), AggregationKind::ALL.len());
        for kind in AggregationKind::ALL {
            assert!(kinds.contains(&kind), "missing implementation for {kind}");
        }
    }

    #[test]
    fn test_lookup_kind_matches_implementation() {
        for kind in AggregationKind::ALL {
            assert_eq!(function_for(kind).kind(), kind);
        }
    }
}
