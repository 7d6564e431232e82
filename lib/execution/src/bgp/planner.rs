use crate::{
    downgrade_fragment_error, ArrayInputTriplePatternIterator, BgpChunkIterator, BgpOptions,
    BgpStrategy, FirstTriplePatternIterator, JoinOrderHeuristic, ProbePolicy, QueryResult,
    SendableChunkStream,
};
use futures::future::{join_all, BoxFuture};
use futures::{stream, FutureExt};
use itertools::Itertools;
use std::collections::HashSet;
use std::sync::Arc;
use tpf_fusion_model::{
    apply_to_bgp, BasicGraphPattern, MappingChunk, SolutionMapping, TriplePattern, Variable,
};

/// The input of the first stage of a pipeline.
enum Seed {
    Binding(SolutionMapping),
    Batch(MappingChunk),
}

impl Seed {
    fn variables(&self) -> HashSet<Variable> {
        match self {
            Seed::Binding(binding) => binding.variables().cloned().collect(),
            Seed::Batch(batch) => batch
                .iter()
                .flat_map(SolutionMapping::variables)
                .cloned()
                .collect(),
        }
    }
}

/// Plans the join order of a basic graph pattern for a single binding or a chunk of bindings and
/// assembles the pipeline of triple pattern iterators.
#[derive(Debug)]
pub(crate) struct BgpPlanner {
    bgp: BasicGraphPattern,
    options: BgpOptions,
}

impl BgpPlanner {
    pub(crate) fn new(bgp: BasicGraphPattern, options: BgpOptions) -> Arc<Self> {
        Arc::new(Self { bgp, options })
    }

    /// Plans the evaluation of the pattern for a single binding.
    ///
    /// The binding is applied to the pattern and the cardinality of every remaining triple pattern
    /// is probed. The pattern with the lowest cardinality is evaluated first.
    pub(crate) fn plan_binding(
        self: Arc<Self>,
        binding: SolutionMapping,
    ) -> BoxFuture<'static, QueryResult<SendableChunkStream>> {
        async move {
            // Stages receive the unbound patterns and apply the binding themselves.
            let mut bgp = self.bgp.clone();
            match bgp.len() {
                0 => return Ok(single_chunk(vec![binding])),
                1 => {
                    let first = bgp.remove(0);
                    return Ok(self.assemble(Seed::Binding(binding), first, bgp, Vec::new()));
                }
                _ => {}
            }

            let probed = apply_to_bgp(&bgp, &binding);
            let Some(cardinalities) = self.probe(&probed, None).await? else {
                return Ok(empty_chunks());
            };
            Ok(self.assemble_cheapest_first(Seed::Binding(binding), bgp, cardinalities))
        }
        .boxed()
    }

    /// Plans the evaluation of the pattern for a chunk of at least two bindings.
    pub(crate) fn plan_batch(
        self: Arc<Self>,
        batch: MappingChunk,
    ) -> BoxFuture<'static, QueryResult<SendableChunkStream>> {
        async move {
            let bgp = self.bgp.clone();
            let restriction = match self.options.probe_policy {
                ProbePolicy::BatchRestricted => Some(batch.as_slice()),
                ProbePolicy::Unrestricted => None,
            };
            let Some(cardinalities) = self.probe(&bgp, restriction).await? else {
                return Ok(empty_chunks());
            };
            Ok(self.assemble_cheapest_first(Seed::Batch(batch), bgp, cardinalities))
        }
        .boxed()
    }

    /// Plans the evaluation of the pattern for every binding of `chunk`.
    pub(crate) fn plan_chunk(
        self: Arc<Self>,
        mut chunk: MappingChunk,
    ) -> BoxFuture<'static, QueryResult<SendableChunkStream>> {
        match chunk.len() {
            0 => async { Ok(empty_chunks()) }.boxed(),
            1 => {
                let binding = chunk.remove(0);
                self.plan_binding(binding)
            }
            _ => self.plan_batch(chunk),
        }
    }

    /// Requests the fragments of all `patterns` at once and returns their cardinalities.
    ///
    /// Returns `None` if any of the patterns has no match. A fragment that fails is logged and
    /// counts as having no match.
    async fn probe(
        &self,
        patterns: &[TriplePattern],
        batch: Option<&[SolutionMapping]>,
    ) -> QueryResult<Option<Vec<Option<u64>>>> {
        let fragments = patterns
            .iter()
            .map(|pattern| self.options.client.fragment(pattern, batch))
            .collect::<Vec<_>>();

        let probes = fragments
            .into_iter()
            .zip(patterns)
            .map(|(mut fragment, pattern)| async move {
                let metadata = fragment.metadata().await;
                fragment.close();
                match metadata {
                    Ok(metadata) => Ok(metadata.total_triples),
                    Err(error) => {
                        downgrade_fragment_error(pattern, error)?;
                        fragment.force_metadata(0);
                        Ok(Some(0))
                    }
                }
            });
        let cardinalities = join_all(probes)
            .await
            .into_iter()
            .collect::<QueryResult<Vec<_>>>()?;

        if cardinalities.contains(&Some(0)) {
            tracing::debug!("A triple pattern has no matches, skipping evaluation");
            return Ok(None);
        }
        Ok(Some(cardinalities))
    }

    /// Evaluates the pattern with the lowest cardinality first. Ties are resolved in favor of the
    /// pattern that comes first.
    fn assemble_cheapest_first(
        &self,
        seed: Seed,
        mut bgp: BasicGraphPattern,
        mut cardinalities: Vec<Option<u64>>,
    ) -> SendableChunkStream {
        let first = cardinalities
            .iter()
            .position_min_by_key(|cardinality| cardinality.unwrap_or(u64::MAX))
            .unwrap_or(0);
        let first_pattern = bgp.remove(first);
        cardinalities.remove(first);
        self.assemble(seed, first_pattern, bgp, cardinalities)
    }

    /// Builds the pipeline that starts with `first` and joins the `remaining` patterns.
    ///
    /// `cardinalities` is parallel to `remaining`.
    fn assemble(
        &self,
        seed: Seed,
        first: TriplePattern,
        mut remaining: BasicGraphPattern,
        mut cardinalities: Vec<Option<u64>>,
    ) -> SendableChunkStream {
        let client = self.options.client.clone();
        let chunk_size = self.options.chunk_size;

        let mut bound = seed.variables();
        bound.extend(first.variables().into_iter().cloned());
        let mut order = vec![first.to_string()];

        let mut stage: SendableChunkStream = match seed {
            Seed::Binding(binding) => Box::pin(FirstTriplePatternIterator::new(
                Box::pin(stream::iter([QueryResult::Ok(binding)])),
                first,
                chunk_size,
                client.clone(),
            )),
            Seed::Batch(batch) => Box::pin(ArrayInputTriplePatternIterator::new(
                single_chunk(batch),
                first,
                chunk_size,
                client.clone(),
            )),
        };

        let heuristic = match self.options.strategy {
            BgpStrategy::Dynamic => {
                return match remaining.len() {
                    0 => stage,
                    1 => Box::pin(ArrayInputTriplePatternIterator::new(
                        stage,
                        remaining.remove(0),
                        chunk_size,
                        client,
                    )),
                    _ => Box::pin(BgpChunkIterator::new(
                        stage,
                        remaining,
                        self.options.clone(),
                    )),
                };
            }
            BgpStrategy::Plain => JoinOrderHeuristic::MinUnbound,
            BgpStrategy::Static => self.options.heuristic,
        };

        while !remaining.is_empty() {
            let next = heuristic.select(&remaining, &bound, &cardinalities);
            let pattern = remaining.remove(next);
            if next < cardinalities.len() {
                cardinalities.remove(next);
            }
            bound.extend(pattern.variables().into_iter().cloned());
            order.push(pattern.to_string());
            stage = Box::pin(ArrayInputTriplePatternIterator::new(
                stage,
                pattern,
                chunk_size,
                client.clone(),
            ));
        }

        tracing::debug!("Join order: {}", order.join(" . "));
        stage
    }
}

fn single_chunk(chunk: MappingChunk) -> SendableChunkStream {
    Box::pin(stream::iter([QueryResult::Ok(chunk)]))
}

fn empty_chunks() -> SendableChunkStream {
    Box::pin(stream::empty::<QueryResult<MappingChunk>>())
}
