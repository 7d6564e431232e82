use crate::{JoinOrderHeuristic, ParseOptionError};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use tpf_fusion_client::FragmentClient;

/// The default maximum number of mappings in a chunk. This is also the maximum number of bindings
/// that restrict a single fragment request.
pub const DEFAULT_CHUNK_SIZE: usize = 30;

/// How the join order of a basic graph pattern is decided.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BgpStrategy {
    /// After the first pattern, greedily evaluate the pattern with the fewest unbound variables.
    Plain,
    /// After the first pattern, order the remainder with a [JoinOrderHeuristic].
    #[default]
    Static,
    /// Plan the first pattern again for every chunk of intermediate results.
    Dynamic,
}

/// Which fragments are requested to estimate the cardinality of a pattern when planning for a
/// chunk of bindings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbePolicy {
    /// Restrict the probes with the chunk of bindings.
    #[default]
    BatchRestricted,
    /// Probe the bare patterns.
    Unrestricted,
}

macro_rules! impl_option_names {
    ($ty:ident, $kind:literal, [$(($variant:ident, $name:literal)),+ $(,)?]) => {
        impl $ty {
            fn name(self) -> &'static str {
                match self {
                    $($ty::$variant => $name,)+
                }
            }
        }

        impl Display for $ty {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $ty {
            type Err = ParseOptionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    _ => Err(ParseOptionError::new(
                        $kind,
                        s,
                        [$($name.to_owned()),+],
                    )),
                }
            }
        }
    };
}

impl_option_names!(
    BgpStrategy,
    "BGP strategy",
    [(Plain, "plain"), (Static, "static"), (Dynamic, "dynamic")]
);
impl_option_names!(
    ProbePolicy,
    "probe policy",
    [
        (BatchRestricted, "batch-restricted"),
        (Unrestricted, "unrestricted")
    ]
);

/// Options for the evaluation of a basic graph pattern.
#[derive(Debug, Clone)]
pub struct BgpOptions {
    /// The client that is used to request fragments.
    pub client: FragmentClient,
    /// The maximum number of mappings in a chunk.
    pub chunk_size: usize,
    pub strategy: BgpStrategy,
    /// Only used by [BgpStrategy::Static].
    pub heuristic: JoinOrderHeuristic,
    pub probe_policy: ProbePolicy,
}

impl BgpOptions {
    /// Creates options with the defaults for everything but the client.
    pub fn new(client: FragmentClient) -> Self {
        Self {
            client,
            chunk_size: DEFAULT_CHUNK_SIZE,
            strategy: BgpStrategy::default(),
            heuristic: JoinOrderHeuristic::default(),
            probe_policy: ProbePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: BgpStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_heuristic(mut self, heuristic: JoinOrderHeuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    #[must_use]
    pub fn with_probe_policy(mut self, probe_policy: ProbePolicy) -> Self {
        self.probe_policy = probe_policy;
        self
    }
}
