//! Console for trying entity linking on pre-annotated documents.
//!
//! Documents are JSON (see `layered_wikidict::Document`) with tokens and
//! typed mentions already filled in by upstream stages.
//!
//! ```bash
//! # Link a document with a config file, printing JSON
//! wikidict-link --config linker.toml doc.json
//!
//! # Override the dictionary and draw links under the tokens
//! cat doc.json | wikidict-link --wikidict wikidict.tsv --threshold 0.5 --display
//! ```

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use layered_wikidict::{Document, LinkerConfig, SentenceDisplay, WikidictAnnotator};

#[derive(Debug, Parser)]
#[command(name = "wikidict-link")]
#[command(version)]
#[command(about = "Link pre-annotated documents against a Wikidict")]
struct Cli {
    /// TOML config with an [entitylink] table
    #[arg(long, env = "WIKIDICT_CONFIG")]
    config: Option<PathBuf>,

    /// Location of the <text, link, score> TSV file
    #[arg(long)]
    wikidict: Option<PathBuf>,

    /// Number of sentences linked concurrently
    #[arg(long)]
    threads: Option<usize>,

    /// Score threshold under which to discard links
    #[arg(long)]
    threshold: Option<f64>,

    /// Time budget per sentence in milliseconds
    #[arg(long = "timeout-ms")]
    timeout_ms: Option<u64>,

    /// Draw links under the tokens instead of printing JSON
    #[arg(long)]
    display: bool,

    /// Input documents; `-` or none reads stdin
    inputs: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_writer(io::stderr).with_env_filter(filter).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = resolve_config(cli)?;
    let annotator = WikidictAnnotator::from_config(&config).with_context(|| {
        format!(
            "could not start linker with wikidict {}",
            config.dictionary_path.display()
        )
    })?;

    let inputs = if cli.inputs.is_empty() {
        vec![PathBuf::from("-")]
    } else {
        cli.inputs.clone()
    };

    for input in &inputs {
        let mut doc = read_document(input)?;
        let report = annotator.annotate(&mut doc);
        for (idx, err) in report.failed() {
            warn!("{}: sentence {} not linked: {}", input.display(), idx, err);
        }
        info!(
            "{}: linked {} mentions in {} sentences",
            input.display(),
            report.linked_mentions(),
            doc.sentence_count()
        );
        println!("{}", render(&doc, cli.display)?);
    }

    Ok(())
}

/// Config file values, overridden by any flags given on the command line.
fn resolve_config(cli: &Cli) -> Result<LinkerConfig> {
    let mut config = match &cli.config {
        Some(path) => LinkerConfig::load(path)
            .with_context(|| format!("could not load config {}", path.display()))?,
        None => LinkerConfig::default(),
    };

    if let Some(path) = &cli.wikidict {
        config = config.with_dictionary_path(path);
    }
    if let Some(threads) = cli.threads {
        config = config.with_threads(threads);
    }
    if let Some(threshold) = cli.threshold {
        config = config.with_score_threshold(threshold);
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config = config.with_sentence_timeout_ms(timeout_ms);
    }

    Ok(config.validate()?)
}

fn read_document(path: &Path) -> Result<Document> {
    let content = if path == Path::new("-") {
        let mut content = String::new();
        io::stdin()
            .read_to_string(&mut content)
            .context("could not read document from stdin")?;
        content
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("could not read document {}", path.display()))?
    };

    serde_json::from_str(&content)
        .with_context(|| format!("could not parse document {}", path.display()))
}

fn render(doc: &Document, display: bool) -> Result<String> {
    if display {
        Ok(doc
            .sentences
            .iter()
            .map(|sentence| SentenceDisplay::new(sentence).to_string())
            .collect::<Vec<_>>()
            .join("\n\n"))
    } else {
        Ok(serde_json::to_string_pretty(doc)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("wikidict-link").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[entitylink]\nthreads = 2\nwikidict = \"a.tsv\"\nthreshold = 0.3").unwrap();
        let path = file.path().to_str().unwrap();

        let config = resolve_config(&cli(&["--config", path, "--threads", "8"])).unwrap();
        assert_eq!(config.threads, 8);
        assert_eq!(config.dictionary_path, PathBuf::from("a.tsv"));
        assert_eq!(config.score_threshold, 0.3);
        assert_eq!(config.sentence_timeout_ms, None);
    }

    #[test]
    fn test_flags_without_config_file() {
        let config = resolve_config(&cli(&[
            "--wikidict",
            "b.tsv",
            "--threshold",
            "0.5",
            "--timeout-ms",
            "100",
        ]))
        .unwrap();
        assert_eq!(config.threads, 1);
        assert_eq!(config.dictionary_path, PathBuf::from("b.tsv"));
        assert_eq!(config.sentence_timeout_ms, Some(100));
    }

    #[test]
    fn test_invalid_threads_rejected() {
        assert!(resolve_config(&cli(&["--threads", "0"])).is_err());
    }

    #[test]
    fn test_link_document_file() {
        let mut dict = NamedTempFile::new().unwrap();
        writeln!(dict, "Obama\tBarack_Obama\t0.9").unwrap();
        let mut doc_file = NamedTempFile::new().unwrap();
        write!(
            doc_file,
            r#"{{"text":"Obama won.","sentences":[{{"tokens":[{{"text":"Obama"}},{{"text":"won"}},{{"text":"."}}],"mentions":[{{"text":"Obama","entity_type":"PERSON","tokens":{{"start":0,"end":0}}}}]}}]}}"#
        )
        .unwrap();

        let config = resolve_config(&cli(&["--wikidict", dict.path().to_str().unwrap()])).unwrap();
        let annotator = WikidictAnnotator::from_config(&config).unwrap();
        let mut doc = read_document(doc_file.path()).unwrap();
        let report = annotator.annotate(&mut doc);

        assert!(report.is_success());
        assert_eq!(render(&doc, true).unwrap(), "Obama  won  .\n╰───╯Barack_Obama");

        let json: serde_json::Value = serde_json::from_str(&render(&doc, false).unwrap()).unwrap();
        assert_eq!(json["sentences"][0]["tokens"][0]["linked_id"], "Barack_Obama");
        assert_eq!(json["sentences"][0]["tokens"][1]["linked_id"], "O");
        assert_eq!(json["sentences"][0]["mentions"][0]["linked_id"], "Barack_Obama");
    }

    #[test]
    fn test_unparseable_document_names_path() {
        let mut doc_file = NamedTempFile::new().unwrap();
        write!(doc_file, "not json").unwrap();

        let err = read_document(doc_file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains(&doc_file.path().display().to_string()));
    }
}
