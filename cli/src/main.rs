#![allow(clippy::print_stderr)]
use crate::cli::Args;
use anyhow::{bail, Context};
use clap::Parser;
use std::fs;
use std::io::{stdout, Write};
use tpf_fusion::{EngineConfig, QueryResultsFormat, TpfEngine};
use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let format = results_format_from_name(&args.format)?;
    let query = match (&args.query, &args.file) {
        (Some(query), _) => query.clone(),
        (None, Some(file)) => fs::read_to_string(file)
            .with_context(|| format!("Could not read the query file {}", file.display()))?,
        (None, None) => bail!("Either --query or --file must be given"),
    };
    let config = engine_config(&args)?;
    tracing::debug!("Using configuration {config:?}");

    let engine = TpfEngine::new(args.start_fragment.as_str(), config)
        .with_context(|| format!("Could not create a client for {}", args.start_fragment))?;
    let solutions = engine.query(&query)?;
    let mut writer = solutions.write(stdout().lock(), format).await?;
    writer.flush()?;

    if args.stats {
        eprintln!("{}", engine.statistics());
    }
    Ok(())
}

/// Reads the configuration file, if any, and applies the command line options.
fn engine_config(args: &Args) -> anyhow::Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path).with_context(|| {
                format!("Could not read the configuration file {}", path.display())
            })?;
            EngineConfig::from_json(&json)
                .with_context(|| format!("Invalid configuration file {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }
    if let Some(heuristic) = args.heuristic {
        config.heuristic = heuristic;
    }
    if let Some(probe_policy) = args.probe_policy {
        config.probe_policy = probe_policy;
    }
    if let Some(chunk_size) = args.chunk_size {
        config.chunk_size = chunk_size;
    }
    Ok(config)
}

fn results_format_from_name(name: &str) -> anyhow::Result<QueryResultsFormat> {
    if let Some(t) = QueryResultsFormat::from_extension(name) {
        return Ok(t);
    }
    if let Some(t) = QueryResultsFormat::from_media_type(name) {
        return Ok(t);
    }
    bail!("The results format '{name}' is unknown")
}

#[cfg(test)]
#[allow(clippy::panic_in_result_fn)]
mod tests {
    use super::*;
    use anyhow::Result;
    use assert_cmd::Command;
    use assert_fs::prelude::*;
    use assert_fs::NamedTempFile;
    use predicates::prelude::*;
    use tpf_fusion::execution::BgpStrategy;

    const START: &str = "http://localhost:1/dataset";

    fn cli_command() -> Command {
        let mut command = Command::new(env!("CARGO"));
        command.arg("run").arg("--bin").arg("tpf-fusion");
        command.arg("--");
        command
    }

    #[test]
    fn cli_help() {
        cli_command()
            .assert()
            .failure()
            .stdout("")
            .stderr(predicate::str::contains("START_FRAGMENT"));
    }

    #[test]
    fn cli_requires_query() {
        cli_command()
            .arg(START)
            .assert()
            .failure()
            .stderr(predicate::str::contains("--query"));
    }

    #[test]
    fn cli_rejects_unsupported_query() {
        cli_command()
            .arg(START)
            .arg("--query")
            .arg("ASK { ?s ?p ?o }")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unsupported query"));
    }

    #[test]
    fn cli_rejects_unknown_format() {
        cli_command()
            .arg(START)
            .arg("--query")
            .arg("SELECT * WHERE { ?s ?p ?o }")
            .arg("--format")
            .arg("yaml")
            .assert()
            .failure()
            .stderr(predicate::str::contains("The results format 'yaml' is unknown"));
    }

    #[test]
    fn cli_rejects_unknown_strategy() {
        cli_command()
            .arg(START)
            .arg("--query")
            .arg("SELECT * WHERE { ?s ?p ?o }")
            .arg("--strategy")
            .arg("greedy")
            .assert()
            .failure()
            .stderr(predicate::str::contains("greedy"));
    }

    #[test]
    fn cli_rejects_invalid_config_file() -> Result<()> {
        let config = NamedTempFile::new("config.json")?;
        config.write_str("{ \"chunkSize\": 3 }")?;
        cli_command()
            .arg(START)
            .arg("--query")
            .arg("SELECT * WHERE { ?s ?p ?o }")
            .arg("--config")
            .arg(config.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration file"));
        Ok(())
    }

    #[test]
    fn command_line_overrides_config_file() -> Result<()> {
        let config = NamedTempFile::new("config.json")?;
        config.write_str("{ \"maxNumberOfMappings\": 7, \"strategy\": \"plain\" }")?;
        let args = Args::try_parse_from([
            "tpf-fusion",
            START,
            "-q",
            "SELECT * WHERE { ?s ?p ?o }",
            "-c",
            config.path().to_str().unwrap_or_default(),
            "--strategy",
            "dynamic",
        ])?;

        let config = engine_config(&args)?;

        assert_eq!(config.chunk_size, 7);
        assert_eq!(config.strategy, BgpStrategy::Dynamic);
        Ok(())
    }

    #[test]
    fn results_formats() -> Result<()> {
        assert_eq!(results_format_from_name("csv")?, QueryResultsFormat::Csv);
        assert_eq!(
            results_format_from_name("application/sparql-results+xml")?,
            QueryResultsFormat::Xml
        );
        Ok(())
    }

    #[test]
    fn clap_debug() {
        use clap::CommandFactory;

        Args::command().debug_assert()
    }
}
