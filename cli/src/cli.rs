use clap::{ArgGroup, Parser, ValueHint};
use std::path::PathBuf;
use tpf_fusion::execution::{BgpStrategy, JoinOrderHeuristic, ProbePolicy};

#[derive(Parser)]
#[command(about, version, name = "tpf-fusion")]
#[command(group(ArgGroup::new("input").required(true).args(["query", "file"])))]
/// Evaluates SPARQL queries over a Triple Pattern Fragments interface
pub struct Args {
    /// URL of the start fragment of the interface
    #[arg(value_hint = ValueHint::Url)]
    pub start_fragment: String,
    /// The SPARQL query to evaluate
    #[arg(short, long)]
    pub query: Option<String>,
    /// File that contains the SPARQL query to evaluate
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,
    /// JSON configuration file
    ///
    /// Options given on the command line take precedence over the configuration file.
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// How the join order is planned: plain, static or dynamic
    #[arg(long)]
    pub strategy: Option<BgpStrategy>,
    /// The heuristic of the static strategy
    #[arg(long)]
    pub heuristic: Option<JoinOrderHeuristic>,
    /// Which fragments are requested to estimate cardinalities for a chunk of bindings:
    /// batch-restricted or unrestricted
    #[arg(long)]
    pub probe_policy: Option<ProbePolicy>,
    /// The maximum number of bindings sent along with a single fragment request
    #[arg(long)]
    pub chunk_size: Option<usize>,
    /// The results format
    ///
    /// It can be an extension like "json" or a MIME type like "application/sparql-results+json".
    #[arg(long, default_value = "json")]
    pub format: String,
    /// Prints the number of requests and received triples to stderr once the query is done
    #[arg(long)]
    pub stats: bool,
}
