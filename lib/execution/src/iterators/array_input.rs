use crate::{downgrade_fragment_error, QueryResult, SendableChunkStream};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tpf_fusion_client::{Fragment, FragmentClient};
use tpf_fusion_model::{MappingChunk, TriplePattern};

/// Evaluates a triple pattern for a chunk of input mappings at a time.
///
/// For every input chunk, a single bindings-restricted fragment is requested. Each triple of this
/// fragment is joined with every mapping of the chunk it is compatible with. Results are emitted in
/// chunks of exactly `chunk_size` mappings, except for the last chunk of the stream.
pub struct ArrayInputTriplePatternIterator {
    input: SendableChunkStream,
    pattern: TriplePattern,
    chunk_size: usize,
    client: FragmentClient,
    /// The fragment that is currently read and the batch it was requested for.
    current: Option<(Fragment, MappingChunk)>,
    /// Results that have not been emitted yet.
    pending: MappingChunk,
    input_finished: bool,
}

impl ArrayInputTriplePatternIterator {
    pub fn new(
        input: SendableChunkStream,
        pattern: TriplePattern,
        chunk_size: usize,
        client: FragmentClient,
    ) -> Self {
        Self {
            input,
            pattern,
            chunk_size: chunk_size.max(1),
            client,
            current: None,
            pending: Vec::new(),
            input_finished: false,
        }
    }

    /// Removes the first `len` pending results.
    fn take_pending(&mut self, len: usize) -> MappingChunk {
        let rest = self.pending.split_off(len.min(self.pending.len()));
        let chunk = std::mem::replace(&mut self.pending, rest);
        self.client
            .statistics()
            .record_matching_triples(chunk.len());
        chunk
    }
}

impl Stream for ArrayInputTriplePatternIterator {
    type Item = QueryResult<MappingChunk>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if this.pending.len() >= this.chunk_size {
                let chunk_size = this.chunk_size;
                return Poll::Ready(Some(Ok(this.take_pending(chunk_size))));
            }

            if let Some((fragment, batch)) = this.current.as_mut() {
                match ready!(fragment.poll_next_unpin(cx)) {
                    Some(Ok(triple)) => {
                        let pattern = &this.pattern;
                        this.pending.extend(
                            batch
                                .iter()
                                .filter_map(|mapping| mapping.extend(pattern, &triple).ok()),
                        );
                    }
                    Some(Err(error)) => {
                        if let Err(error) = downgrade_fragment_error(&this.pattern, error) {
                            return Poll::Ready(Some(Err(error)));
                        }
                    }
                    None => this.current = None,
                }
                continue;
            }

            if this.input_finished {
                if this.pending.is_empty() {
                    return Poll::Ready(None);
                }
                let len = this.pending.len();
                return Poll::Ready(Some(Ok(this.take_pending(len))));
            }

            match ready!(this.input.poll_next_unpin(cx)) {
                Some(Ok(batch)) if batch.is_empty() => {}
                Some(Ok(batch)) => {
                    let fragment = this.client.fragment(&this.pattern, Some(&batch));
                    this.current = Some((fragment, batch));
                }
                Some(Err(error)) => return Poll::Ready(Some(Err(error))),
                None => this.input_finished = true,
            }
        }
    }
}
