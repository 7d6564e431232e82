#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod config;
mod engine;
pub mod error;
mod query;
pub mod results;

pub use config::EngineConfig;
pub use engine::TpfEngine;
pub use error::EngineError;
pub use results::{QueryResultsFormat, QuerySolution, QuerySolutionStream};

pub mod model {
    pub use tpf_fusion_model::*;
}

pub mod client {
    pub use tpf_fusion_client::*;
}

pub mod execution {
    pub use tpf_fusion_execution::*;
}
