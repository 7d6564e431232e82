//! Streaming evaluation of basic graph patterns over Triple Pattern Fragments.
//!
//! Every operator is a [Stream](futures::Stream) that pulls its input from an upstream operator.
//! Triple patterns are evaluated by chunked join iterators, while [create_bgp_iterator] plans the
//! join order of a basic graph pattern based on the cardinality estimates of the server.

mod bgp;
mod error;
mod iterators;

pub use bgp::*;
pub use error::*;
pub use iterators::*;
