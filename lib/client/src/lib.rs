//! A client for bindings-restricted Triple Pattern Fragments (brTPF).
//!
//! The [FragmentClient] turns triple patterns, optionally restricted by a batch of solution
//! mappings, into [Fragment]s. A fragment is a stream of the matching triples that is fetched page
//! by page from a remote server.

mod cache;
mod canonical;
mod client;
mod controls;
mod error;
mod fragment;
mod http;
mod metadata;
mod options;
mod page;
mod statistics;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
mod values;

pub use cache::*;
pub use canonical::*;
pub use client::*;
pub use controls::*;
pub use error::*;
pub use fragment::Fragment;
pub use http::*;
pub use metadata::*;
pub use options::*;
pub use page::*;
pub use statistics::*;
pub use values::*;
