use crate::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tpf_fusion_client::{ClientOptions, FragmentClient, DEFAULT_CACHE_CAPACITY};
use tpf_fusion_execution::{
    BgpOptions, BgpStrategy, JoinOrderHeuristic, ProbePolicy, DEFAULT_CHUNK_SIZE,
};

/// The configuration of a [`TpfEngine`](crate::TpfEngine).
///
/// The configuration can be read from JSON. Missing fields take their default value.
///
/// ```
/// use tpf_fusion::EngineConfig;
/// use tpf_fusion::execution::BgpStrategy;
///
/// let config = EngineConfig::from_json(r#"{ "maxNumberOfMappings": 50, "strategy": "dynamic" }"#)?;
/// assert_eq!(config.chunk_size, 50);
/// assert_eq!(config.strategy, BgpStrategy::Dynamic);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// The maximum number of mappings in a chunk and in a single binding restriction.
    #[serde(alias = "maxNumberOfMappings")]
    pub chunk_size: usize,
    pub strategy: BgpStrategy,
    /// The heuristic of [BgpStrategy::Static].
    pub heuristic: JoinOrderHeuristic,
    pub probe_policy: ProbePolicy,
    /// The number of fragments kept in the cache.
    pub cache_capacity: usize,
    /// The timeout of a single HTTP request in seconds.
    pub timeout_secs: Option<u64>,
    /// Namespace prefixes that shorten IRIs in binding restrictions.
    pub prefixes: BTreeMap<String, String>,
}

impl EngineConfig {
    /// Reads a configuration from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns the options of the fragment client.
    pub fn client_options(&self) -> ClientOptions {
        let mut options = ClientOptions::default().with_cache_capacity(self.cache_capacity);
        if let Some(timeout) = self.timeout_secs {
            options = options.with_timeout(Duration::from_secs(timeout));
        }
        for (prefix, namespace) in &self.prefixes {
            options = options.with_prefix(prefix, namespace);
        }
        options
    }

    /// Returns the options for evaluating basic graph patterns with `client`.
    pub fn bgp_options(&self, client: FragmentClient) -> BgpOptions {
        BgpOptions::new(client)
            .with_chunk_size(self.chunk_size)
            .with_strategy(self.strategy)
            .with_heuristic(self.heuristic)
            .with_probe_policy(self.probe_policy)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            strategy: BgpStrategy::default(),
            heuristic: JoinOrderHeuristic::default(),
            probe_policy: ProbePolicy::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            timeout_secs: None,
            prefixes: BTreeMap::new(),
        }
    }
}
