mod heuristics;
mod options;
mod planner;

pub use heuristics::{JoinOrderHeuristic, ParseOptionError};
pub use options::{BgpOptions, BgpStrategy, ProbePolicy, DEFAULT_CHUNK_SIZE};

use crate::{
    ArrayToElementsIterator, QueryResult, SendableChunkStream, SendableMappingStream,
    TriplePatternIterator,
};
use futures::{Stream, TryStreamExt};
use planner::BgpPlanner;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tpf_fusion_model::{BasicGraphPattern, MappingChunk, SolutionMapping};

/// Evaluates a basic graph pattern for every input mapping.
///
/// The join order is planned anew for every input mapping. The results of one input mapping are
/// produced before the next input mapping is planned.
pub struct BgpIterator {
    inner: ArrayToElementsIterator,
}

impl BgpIterator {
    pub fn new(input: SendableMappingStream, bgp: BasicGraphPattern, options: BgpOptions) -> Self {
        let planner = BgpPlanner::new(bgp, options);
        let chunks = input
            .and_then(move |binding| Arc::clone(&planner).plan_binding(binding))
            .try_flatten();
        Self {
            inner: ArrayToElementsIterator::new(Box::pin(chunks)),
        }
    }
}

impl Stream for BgpIterator {
    type Item = QueryResult<SolutionMapping>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Evaluates a basic graph pattern for every chunk of input mappings.
///
/// A chunk with a single mapping is planned like an input of [BgpIterator]. Larger chunks are
/// planned as a whole with fragments that are restricted by the chunk.
pub struct BgpChunkIterator {
    inner: SendableChunkStream,
}

impl BgpChunkIterator {
    pub fn new(input: SendableChunkStream, bgp: BasicGraphPattern, options: BgpOptions) -> Self {
        let planner = BgpPlanner::new(bgp, options);
        let chunks = input
            .and_then(move |chunk| Arc::clone(&planner).plan_chunk(chunk))
            .try_flatten();
        Self {
            inner: Box::pin(chunks),
        }
    }
}

impl Stream for BgpChunkIterator {
    type Item = QueryResult<MappingChunk>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// The stream that evaluates a basic graph pattern, as created by [create_bgp_iterator].
pub enum BgpStream {
    /// The pattern is empty. Every input mapping is a solution.
    PassThrough(SendableMappingStream),
    /// The pattern consists of a single triple pattern.
    SinglePattern(TriplePatternIterator),
    /// The pattern consists of multiple triple patterns that are joined.
    Pipeline(BgpIterator),
}

impl Stream for BgpStream {
    type Item = QueryResult<SolutionMapping>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.get_mut() {
            BgpStream::PassThrough(input) => input.as_mut().poll_next(cx),
            BgpStream::SinglePattern(iterator) => Pin::new(iterator).poll_next(cx),
            BgpStream::Pipeline(iterator) => Pin::new(iterator).poll_next(cx),
        }
    }
}

/// Creates the stream that evaluates `bgp` for every mapping of `input`.
///
/// The solutions of an input mapping are compatible extensions of this mapping.
pub fn create_bgp_iterator(
    input: SendableMappingStream,
    mut bgp: BasicGraphPattern,
    options: BgpOptions,
) -> BgpStream {
    match bgp.len() {
        0 => BgpStream::PassThrough(input),
        1 => BgpStream::SinglePattern(TriplePatternIterator::new(
            input,
            bgp.remove(0),
            options.chunk_size,
            options.client,
        )),
        _ => BgpStream::Pipeline(BgpIterator::new(input, bgp, options)),
    }
}
