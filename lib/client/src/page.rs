use crate::FragmentError;
use oxrdfio::{RdfFormat, RdfParser};
use std::collections::HashSet;
use std::sync::Arc;
use tpf_fusion_model::vocab::{hydra, void};
use tpf_fusion_model::{GraphName, NamedNode, Subject, Term, Triple};

/// The triples of a single fragment page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// The triples that match the requested pattern.
    pub data: Vec<Triple>,
    /// The triples that describe the fragment (counts, controls).
    pub metadata: Vec<Triple>,
}

/// Parses the payload of a fragment page.
///
/// The parser is selected by the media type of `content_type`. For formats that support datasets,
/// the default graph holds the data and named graphs hold the metadata. For other formats, the
/// triples that describe the page, the fragment, the dataset or its search form are metadata and
/// everything else is data.
pub fn parse_page(url: &str, content_type: &str, body: &[u8]) -> Result<ParsedPage, FragmentError> {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim();
    let format = RdfFormat::from_media_type(media_type).ok_or_else(|| FragmentError::NoParser {
        url: url.to_owned(),
        content_type: content_type.to_owned(),
    })?;

    // Relative IRIs cannot be resolved against a malformed page URL.
    let parser = RdfParser::from_format(format)
        .with_base_iri(url)
        .unwrap_or_else(|_| RdfParser::from_format(format));

    let mut page = ParsedPage::default();
    let mut triples = Vec::new();
    for quad in parser.for_reader(body) {
        let quad = quad.map_err(|source| FragmentError::Parse {
            url: url.to_owned(),
            source: Arc::new(source),
        })?;

        if !format.supports_datasets() {
            triples.push(quad.into());
        } else if quad.graph_name == GraphName::DefaultGraph {
            page.data.push(quad.into());
        } else {
            page.metadata.push(quad.into());
        }
    }

    if !triples.is_empty() {
        let controls = control_resources(url, &triples);
        let (metadata, data) = triples.into_iter().partition::<Vec<_>, _>(|triple| {
            is_control_predicate(&triple.predicate) || controls.contains(&triple.subject)
        });
        page.data = data;
        page.metadata = metadata;
    }
    Ok(page)
}

fn is_control_predicate(predicate: &NamedNode) -> bool {
    predicate.as_str().starts_with(hydra::NAMESPACE)
        || *predicate == void::TRIPLES
        || *predicate == void::SUBSET
}

/// Returns the resources whose statements are metadata: the page, every IRI described with a
/// Hydra or VoID property, and the blank nodes reachable from a search form.
fn control_resources(url: &str, triples: &[Triple]) -> HashSet<Subject> {
    let mut resources = HashSet::from([Subject::NamedNode(NamedNode::new_unchecked(url))]);
    for triple in triples {
        if is_control_predicate(&triple.predicate) && matches!(triple.subject, Subject::NamedNode(_))
        {
            resources.insert(triple.subject.clone());
        }
    }

    let mut pending = triples
        .iter()
        .filter(|t| t.predicate == hydra::SEARCH)
        .filter_map(|t| match &t.object {
            Term::BlankNode(node) => Some(Subject::BlankNode(node.clone())),
            _ => None,
        })
        .collect::<Vec<_>>();
    while let Some(node) = pending.pop() {
        if !resources.insert(node.clone()) {
            continue;
        }
        pending.extend(
            triples
                .iter()
                .filter(|t| t.subject == node)
                .filter_map(|t| match &t.object {
                    Term::BlankNode(object) => Some(Subject::BlankNode(object.clone())),
                    _ => None,
                }),
        );
    }
    resources
}
