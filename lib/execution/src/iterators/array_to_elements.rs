use crate::{QueryResult, SendableChunkStream};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::vec;
use tpf_fusion_model::SolutionMapping;

/// Flattens a stream of chunks into a stream of individual mappings.
pub struct ArrayToElementsIterator {
    input: SendableChunkStream,
    buffer: vec::IntoIter<SolutionMapping>,
}

impl ArrayToElementsIterator {
    pub fn new(input: SendableChunkStream) -> Self {
        Self {
            input,
            buffer: Vec::new().into_iter(),
        }
    }
}

impl Stream for ArrayToElementsIterator {
    type Item = QueryResult<SolutionMapping>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(mapping) = this.buffer.next() {
                return Poll::Ready(Some(Ok(mapping)));
            }
            match ready!(this.input.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => this.buffer = chunk.into_iter(),
                Some(Err(error)) => return Poll::Ready(Some(Err(error))),
                None => return Poll::Ready(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{stream, TryStreamExt};
    use tpf_fusion_model::{NamedNode, Variable};

    fn mapping(value: &str) -> SolutionMapping {
        [(
            Variable::new_unchecked("x"),
            NamedNode::new_unchecked(format!("http://ex.org/{value}")).into(),
        )]
        .into_iter()
        .collect()
    }

    #[tokio::test]
    async fn flattens_chunks_in_order() {
        let input = stream::iter(vec![
            Ok(vec![mapping("a"), mapping("b")]),
            Ok(vec![]),
            Ok(vec![mapping("c")]),
        ]);
        let result = ArrayToElementsIterator::new(Box::pin(input))
            .try_collect::<Vec<_>>()
            .await
            .unwrap();
        assert_eq!(result, vec![mapping("a"), mapping("b"), mapping("c")]);
    }
}
