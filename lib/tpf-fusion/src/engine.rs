use crate::query::BgpQuery;
use crate::{EngineConfig, EngineError, QuerySolutionStream};
use futures::{future, stream, StreamExt, TryStreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tpf_fusion_client::{FragmentClient, StatisticsSnapshot};
use tpf_fusion_execution::{create_bgp_iterator, BgpStream, QueryError, SendableMappingStream};
use tpf_fusion_model::{BasicGraphPattern, SolutionMapping, Variable};

/// Evaluates SPARQL queries over a Triple Pattern Fragments interface.
///
/// Usage example:
/// ```no_run
/// use futures::TryStreamExt;
/// use tpf_fusion::{EngineConfig, TpfEngine};
///
/// # tokio_test::block_on(async {
/// let engine = TpfEngine::new("https://fragments.dbpedia.org/2016-04/en", EngineConfig::default())?;
/// let solutions = engine
///     .query("SELECT ?name WHERE { ?p <http://xmlns.com/foaf/0.1/name> ?name } LIMIT 10")?
///     .try_collect::<Vec<_>>()
///     .await?;
/// assert!(solutions.len() <= 10);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// # }).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct TpfEngine {
    client: FragmentClient,
    config: EngineConfig,
}

impl TpfEngine {
    /// Creates an engine for the interface whose start fragment is located at `start_url`.
    ///
    /// Must be called within a Tokio runtime.
    pub fn new(start_url: impl Into<String>, config: EngineConfig) -> Result<Self, EngineError> {
        let client = FragmentClient::new(start_url, config.client_options())?;
        Ok(Self::with_client(client, config))
    }

    /// Creates an engine that uses an existing `client`. The client options of `config` are
    /// ignored.
    pub fn with_client(client: FragmentClient, config: EngineConfig) -> Self {
        Self { client, config }
    }

    /// Returns the fragment client.
    pub fn client(&self) -> &FragmentClient {
        &self.client
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the statistics of all queries evaluated by this engine so far.
    pub fn statistics(&self) -> StatisticsSnapshot {
        self.client.statistics().snapshot()
    }

    /// Evaluates a basic graph pattern. Blank nodes in `bgp` match any term.
    pub fn evaluate_bgp(&self, bgp: BasicGraphPattern) -> BgpStream {
        let input: SendableMappingStream =
            Box::pin(stream::iter([Ok::<_, QueryError>(SolutionMapping::new())]));
        create_bgp_iterator(input, bgp, self.config.bgp_options(self.client.clone()))
    }

    /// Evaluates a SPARQL SELECT query.
    ///
    /// The query pattern must be a basic graph pattern, optionally with a projection, DISTINCT,
    /// LIMIT and OFFSET.
    pub fn query(&self, query: &str) -> Result<QuerySolutionStream, EngineError> {
        let query = BgpQuery::parse(query)?;
        tracing::debug!(
            "Evaluating {} triple patterns for {} variables",
            query.bgp.len(),
            query.variables.len()
        );

        let variables: Arc<[Variable]> = query.variables.into();
        let mut solutions: SendableMappingStream = Box::pin(self.evaluate_bgp(query.bgp));

        if query.distinct {
            let projection = Arc::clone(&variables);
            let mut seen = HashSet::new();
            solutions = Box::pin(
                solutions
                    .map_ok(move |mapping| mapping.project(projection.iter()))
                    .try_filter(move |mapping| future::ready(seen.insert(mapping.clone()))),
            );
        }
        if query.offset > 0 {
            let mut skipped = 0;
            let offset = query.offset;
            solutions = Box::pin(solutions.try_filter(move |_| {
                let keep = skipped >= offset;
                if !keep {
                    skipped += 1;
                }
                future::ready(keep)
            }));
        }
        if let Some(limit) = query.limit {
            solutions = Box::pin(solutions.take(limit));
        }

        Ok(QuerySolutionStream::new(variables, solutions))
    }
}
