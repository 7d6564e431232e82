use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;
use tpf_fusion_model::{TriplePattern, Variable};

/// Selects the next triple pattern of a static join order.
///
/// Every heuristic is a pure function of the candidates, the variables that are already bound by
/// the previous stages, and the cardinalities of the candidates. Unknown cardinalities rank last.
/// Ties are resolved in favor of the candidate that comes first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JoinOrderHeuristic {
    /// The fewest variables that are not yet bound.
    MinUnbound,
    /// The fewest unbound variables, then the lowest cardinality.
    MinUnboundThenMinCardinality,
    /// The most bound variables, then the lowest cardinality.
    #[default]
    MaxBoundThenMinCardinality,
    /// The lowest cardinality.
    MinCardinality,
    /// The most bound variables, then the fewest unbound variables, then the lowest cardinality.
    MaxBoundThenMinUnboundThenMinCardinality,
}

impl JoinOrderHeuristic {
    const ALL: [JoinOrderHeuristic; 5] = [
        JoinOrderHeuristic::MinUnbound,
        JoinOrderHeuristic::MinUnboundThenMinCardinality,
        JoinOrderHeuristic::MaxBoundThenMinCardinality,
        JoinOrderHeuristic::MinCardinality,
        JoinOrderHeuristic::MaxBoundThenMinUnboundThenMinCardinality,
    ];

    /// Returns the index of the candidate that should be evaluated next.
    ///
    /// `cardinalities` is parallel to `candidates`. Missing entries count as unknown. For an empty
    /// candidate list, `0` is returned.
    pub fn select(
        self,
        candidates: &[TriplePattern],
        bound: &HashSet<Variable>,
        cardinalities: &[Option<u64>],
    ) -> usize {
        candidates
            .iter()
            .enumerate()
            .min_by_key(|(index, pattern)| {
                let cardinality = cardinalities
                    .get(*index)
                    .copied()
                    .flatten()
                    .unwrap_or(u64::MAX);
                self.key(
                    pattern.count_bound(bound),
                    pattern.count_unbound(bound),
                    cardinality,
                )
            })
            .map_or(0, |(index, _)| index)
    }

    fn key(self, bound: usize, unbound: usize, cardinality: u64) -> (Reverse<usize>, usize, u64) {
        match self {
            JoinOrderHeuristic::MinUnbound => (Reverse(0), unbound, 0),
            JoinOrderHeuristic::MinUnboundThenMinCardinality => (Reverse(0), unbound, cardinality),
            JoinOrderHeuristic::MaxBoundThenMinCardinality => (Reverse(bound), 0, cardinality),
            JoinOrderHeuristic::MinCardinality => (Reverse(0), 0, cardinality),
            JoinOrderHeuristic::MaxBoundThenMinUnboundThenMinCardinality => {
                (Reverse(bound), unbound, cardinality)
            }
        }
    }

    fn name(self) -> &'static str {
        match self {
            JoinOrderHeuristic::MinUnbound => "min-unbound",
            JoinOrderHeuristic::MinUnboundThenMinCardinality => "min-unbound-then-min-cardinality",
            JoinOrderHeuristic::MaxBoundThenMinCardinality => "max-bound-then-min-cardinality",
            JoinOrderHeuristic::MinCardinality => "min-cardinality",
            JoinOrderHeuristic::MaxBoundThenMinUnboundThenMinCardinality => {
                "max-bound-then-min-unbound-then-min-cardinality"
            }
        }
    }
}

impl Display for JoinOrderHeuristic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown value '{value}' for {kind}, expected one of: {expected}")]
pub struct ParseOptionError {
    kind: &'static str,
    value: String,
    expected: String,
}

impl ParseOptionError {
    pub(crate) fn new(
        kind: &'static str,
        value: &str,
        expected: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            kind,
            value: value.to_owned(),
            expected: expected.into_iter().collect::<Vec<_>>().join(", "),
        }
    }
}

impl FromStr for JoinOrderHeuristic {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|heuristic| heuristic.name() == s)
            .ok_or_else(|| {
                ParseOptionError::new(
                    "join order heuristic",
                    s,
                    Self::ALL.iter().map(ToString::to_string),
                )
            })
    }
}
