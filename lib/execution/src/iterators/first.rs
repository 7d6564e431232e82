use crate::{downgrade_fragment_error, QueryResult, SendableMappingStream};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tpf_fusion_client::{Fragment, FragmentClient};
use tpf_fusion_model::{MappingChunk, SolutionMapping, TriplePattern};

/// Evaluates a triple pattern for one input mapping at a time.
///
/// For every input mapping, the mapping is applied to the pattern and a dedicated fragment is
/// requested without any binding restriction. Every triple of the fragment extends the input
/// mapping. The results are emitted in chunks of at most `chunk_size` mappings. The last chunk of
/// a fragment may be smaller, and no chunk is emitted for a fragment without results.
pub struct FirstTriplePatternIterator {
    /// The input mappings.
    input: SendableMappingStream,
    /// The pattern that is evaluated.
    pattern: TriplePattern,
    /// The maximum number of mappings in an output chunk.
    chunk_size: usize,
    client: FragmentClient,
    /// The fragment that is currently read, the input mapping and the bound pattern.
    current: Option<(Fragment, SolutionMapping, TriplePattern)>,
    /// The chunk that is currently filled.
    chunk: MappingChunk,
    input_finished: bool,
}

impl FirstTriplePatternIterator {
    pub fn new(
        input: SendableMappingStream,
        pattern: TriplePattern,
        chunk_size: usize,
        client: FragmentClient,
    ) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            input,
            pattern,
            chunk_size,
            client,
            current: None,
            chunk: Vec::with_capacity(chunk_size),
            input_finished: false,
        }
    }

    fn take_chunk(&mut self) -> MappingChunk {
        let chunk = std::mem::replace(&mut self.chunk, Vec::with_capacity(self.chunk_size));
        self.client
            .statistics()
            .record_matching_triples(chunk.len());
        chunk
    }
}

impl Stream for FirstTriplePatternIterator {
    type Item = QueryResult<MappingChunk>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some((fragment, mapping, bound)) = this.current.as_mut() {
                match ready!(fragment.poll_next_unpin(cx)) {
                    Some(Ok(triple)) => {
                        // Bound blank nodes match any term in the bound pattern.
                        if let Ok(extended) = mapping.extend(&this.pattern, &triple) {
                            this.chunk.push(extended);
                            if this.chunk.len() >= this.chunk_size {
                                return Poll::Ready(Some(Ok(this.take_chunk())));
                            }
                        }
                    }
                    Some(Err(error)) => {
                        if let Err(error) = downgrade_fragment_error(bound, error) {
                            return Poll::Ready(Some(Err(error)));
                        }
                    }
                    None => {
                        this.current = None;
                        if !this.chunk.is_empty() {
                            return Poll::Ready(Some(Ok(this.take_chunk())));
                        }
                    }
                }
                continue;
            }

            if this.input_finished {
                return Poll::Ready(None);
            }
            match ready!(this.input.poll_next_unpin(cx)) {
                Some(Ok(mapping)) => {
                    let bound = this.pattern.apply(&mapping);
                    let fragment = this.client.fragment(&bound, None);
                    this.current = Some((fragment, mapping, bound));
                }
                Some(Err(error)) => return Poll::Ready(Some(Err(error))),
                None => this.input_finished = true,
            }
        }
    }
}
