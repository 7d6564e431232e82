use crate::{FragmentControls, SearchForm, UriTemplate};
use std::fmt::Debug;
use tpf_fusion_model::vocab::{hydra, rdf, void};
use tpf_fusion_model::{NamedNodeRef, Subject, Term, Triple};

/// Metadata that describes a fragment as a whole.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FragmentMetadata {
    /// The estimated number of triples that match the fragment's pattern. `None` if the server did
    /// not provide an estimate.
    pub total_triples: Option<u64>,
}

/// The information that a [MetadataExtractor] found on a single page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub metadata: Option<FragmentMetadata>,
    pub controls: Option<FragmentControls>,
}

/// Extracts metadata and hypermedia controls from the metadata triples of a fragment page.
pub trait MetadataExtractor: Debug + Send + Sync {
    /// Extracts the metadata of the page located at `page_url`.
    fn extract(&self, page_url: &str, triples: &[Triple]) -> PageMetadata;
}

/// Extracts counts and controls described with the Hydra and VoID vocabularies.
///
/// Counts are read from `hydra:totalItems` or `void:triples`, the next page from `hydra:next` or
/// `hydra:nextPage`, and the search form from `hydra:search`. Statements about the page itself are
/// preferred over statements about other resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct HydraMetadataExtractor;

impl MetadataExtractor for HydraMetadataExtractor {
    fn extract(&self, page_url: &str, triples: &[Triple]) -> PageMetadata {
        let metadata = extract_count(page_url, triples).map(|total| FragmentMetadata {
            total_triples: Some(total),
        });
        let controls = FragmentControls {
            next_page: extract_next_page(page_url, triples),
            search: extract_search_form(triples),
        };
        PageMetadata {
            metadata,
            controls: Some(controls),
        }
    }
}

fn extract_count(page_url: &str, triples: &[Triple]) -> Option<u64> {
    let counts = triples
        .iter()
        .filter(|t| t.predicate == hydra::TOTAL_ITEMS || t.predicate == void::TRIPLES)
        .filter_map(|t| match &t.object {
            Term::Literal(literal) => literal
                .value()
                .parse::<u64>()
                .ok()
                .map(|count| (is_about(t, page_url), count)),
            _ => None,
        })
        .collect::<Vec<_>>();
    prefer_page(counts)
}

fn extract_next_page(page_url: &str, triples: &[Triple]) -> Option<String> {
    let links = triples
        .iter()
        .filter(|t| t.predicate == hydra::NEXT || t.predicate == hydra::NEXT_PAGE)
        .filter_map(|t| match &t.object {
            Term::NamedNode(node) => Some((is_about(t, page_url), node.as_str().to_owned())),
            _ => None,
        })
        .collect::<Vec<_>>();
    prefer_page(links)
}

fn extract_search_form(triples: &[Triple]) -> Option<SearchForm> {
    triples
        .iter()
        .filter(|t| t.predicate == hydra::SEARCH)
        .find_map(|t| search_form(triples, &t.object))
}

fn search_form(triples: &[Triple], form: &Term) -> Option<SearchForm> {
    let template = objects(triples, form, hydra::TEMPLATE).find_map(|term| match term {
        Term::Literal(literal) => Some(literal.value()),
        _ => None,
    })?;
    let template = match UriTemplate::parse(template) {
        Ok(template) => template,
        Err(error) => {
            tracing::warn!("Ignoring search form: {error}");
            return None;
        }
    };

    let mut positions: [Option<String>; 3] = Default::default();
    for mapping in objects(triples, form, hydra::MAPPING) {
        let variable = objects(triples, mapping, hydra::VARIABLE).find_map(|term| match term {
            Term::Literal(literal) => Some(literal.value().to_owned()),
            _ => None,
        });
        let property = objects(triples, mapping, hydra::PROPERTY).find_map(|term| match term {
            Term::NamedNode(node) => Some(node.as_ref()),
            _ => None,
        });
        let index = match property {
            Some(property) if property == rdf::SUBJECT => 0,
            Some(property) if property == rdf::PREDICATE => 1,
            Some(property) if property == rdf::OBJECT => 2,
            _ => continue,
        };
        positions[index] = variable;
    }

    let [subject, predicate, object] = positions;
    Some(SearchForm::new(template, subject, predicate, object))
}

/// Returns the objects of all triples with the given `subject` and `predicate`.
fn objects<'a>(
    triples: &'a [Triple],
    subject: &'a Term,
    predicate: NamedNodeRef<'static>,
) -> impl Iterator<Item = &'a Term> + 'a {
    triples
        .iter()
        .filter(move |t| t.predicate == predicate && subject_matches(t, subject))
        .map(|t| &t.object)
}

fn subject_matches(triple: &Triple, term: &Term) -> bool {
    match (&triple.subject, term) {
        (Subject::NamedNode(a), Term::NamedNode(b)) => a == b,
        (Subject::BlankNode(a), Term::BlankNode(b)) => a == b,
        _ => false,
    }
}

fn is_about(triple: &Triple, page_url: &str) -> bool {
    matches!(&triple.subject, Subject::NamedNode(node) if node.as_str() == page_url)
}

/// Picks the first value that is about the page, or the first value otherwise.
fn prefer_page<T>(candidates: Vec<(bool, T)>) -> Option<T> {
    let index = candidates
        .iter()
        .position(|(about_page, _)| *about_page)
        .unwrap_or_default();
    candidates.into_iter().nth(index).map(|(_, value)| value)
}
