//! An in-memory Triple Pattern Fragments server for tests.

use crate::{HttpClient, HttpError, HttpRequest, HttpResponse};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tpf_fusion_model::vocab::{hydra, rdf, void};
use tpf_fusion_model::{
    BlankNode, GraphName, Literal, NamedNode, NamedNodeRef, Quad, Subject, Term, Triple,
};
use url::Url;

const INTEGER: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#integer");

/// An [HttpClient] that answers fragment requests from an in-memory set of triples.
///
/// The server understands the `subject`, `predicate`, `object` and `page` query parameters.
/// Binding restrictions are accepted but not evaluated, so restricted fragments contain a superset
/// of the matching triples. Every request is recorded.
///
/// Pages are N-Quads with the metadata in a named graph, or Turtle with data and metadata in one
/// graph.
#[derive(Debug)]
pub struct MockTpfServer {
    base_url: String,
    triples: Vec<Triple>,
    page_size: usize,
    failures: Vec<(String, u16)>,
    turtle: bool,
    requests: Mutex<Vec<String>>,
}

impl MockTpfServer {
    /// Creates a server for `triples` whose start fragment is located at `base_url`.
    pub fn new(base_url: impl Into<String>, triples: Vec<Triple>) -> Self {
        Self {
            base_url: base_url.into(),
            triples,
            page_size: 100,
            failures: Vec::new(),
            turtle: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Sets the maximum number of triples per page.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Answers every request whose URL contains `fragment` with `status`.
    #[must_use]
    pub fn with_failure(mut self, fragment: impl Into<String>, status: u16) -> Self {
        self.failures.push((fragment.into(), status));
        self
    }

    /// Serves pages as Turtle.
    #[must_use]
    pub fn with_turtle_pages(mut self) -> Self {
        self.turtle = true;
        self
    }

    /// The URL of the start fragment.
    pub fn start_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the URLs of all requests in the order they were received.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the query parameters of every request, decoded.
    pub fn request_parameters(&self) -> Vec<HashMap<String, String>> {
        self.requests()
            .iter()
            .filter_map(|url| Url::parse(url).ok())
            .map(|url| url.query_pairs().into_owned().collect())
            .collect()
    }

    fn respond(&self, url: &str) -> HttpResponse {
        if let Some((_, status)) = self.failures.iter().find(|(f, _)| url.contains(f.as_str())) {
            return error_response(*status);
        }
        if url.split('?').next() != Some(self.base_url.as_str()) {
            return error_response(404);
        }
        let Ok(parsed) = Url::parse(url) else {
            return error_response(400);
        };

        let parameters: HashMap<String, String> = parsed.query_pairs().into_owned().collect();
        let position = |name: &str| match parameters.get(name) {
            Some(value) => parse_term(value).map(Some),
            None => Some(None),
        };
        let (Some(subject), Some(predicate), Some(object)) =
            (position("subject"), position("predicate"), position("object"))
        else {
            return error_response(400);
        };
        let page = parameters
            .get("page")
            .and_then(|page| page.parse::<usize>().ok())
            .unwrap_or(1)
            .max(1);

        let matches = self
            .triples
            .iter()
            .filter(|t| {
                subject
                    .as_ref()
                    .map_or(true, |s| *s == Term::from(t.subject.clone()))
                    && predicate
                        .as_ref()
                        .map_or(true, |p| *p == Term::from(t.predicate.clone()))
                    && object.as_ref().map_or(true, |o| *o == t.object)
            })
            .collect::<Vec<_>>();

        let start = (page - 1).saturating_mul(self.page_size);
        let data = matches
            .iter()
            .skip(start)
            .take(self.page_size)
            .map(|t| (*t).clone().in_graph(GraphName::DefaultGraph))
            .collect::<Vec<_>>();
        let next_page = (start + self.page_size < matches.len()).then(|| {
            let mut next = parsed.clone();
            let pairs = parameters
                .iter()
                .filter(|(name, _)| name.as_str() != "page")
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect::<Vec<_>>();
            next.query_pairs_mut()
                .clear()
                .extend_pairs(pairs)
                .append_pair("page", &(page + 1).to_string());
            next.to_string()
        });

        let mut body = String::new();
        for quad in data
            .into_iter()
            .chain(self.metadata(url, matches.len(), next_page))
        {
            if self.turtle {
                body.push_str(&Triple::from(quad).to_string());
            } else {
                body.push_str(&quad.to_string());
            }
            body.push_str(" .\n");
        }

        let content_type = if self.turtle {
            "text/turtle"
        } else {
            "application/n-quads"
        };
        HttpResponse {
            status: 200,
            content_type: Some(content_type.to_owned()),
            body: body.into_bytes(),
        }
    }

    fn metadata(&self, page_url: &str, total: usize, next_page: Option<String>) -> Vec<Quad> {
        let graph = GraphName::NamedNode(NamedNode::new_unchecked(format!(
            "{}#metadata",
            self.base_url
        )));
        let page = Subject::NamedNode(NamedNode::new_unchecked(page_url));
        let dataset = Subject::NamedNode(NamedNode::new_unchecked(format!(
            "{}#dataset",
            self.base_url
        )));
        let form = BlankNode::new_unchecked("search");
        let count = Literal::new_typed_literal(total.to_string(), INTEGER);

        let quad = |s: Subject, p: NamedNodeRef<'_>, o: Term| Quad::new(s, p, o, graph.clone());
        let mut quads = vec![
            quad(page.clone(), void::TRIPLES, count.clone().into()),
            quad(page.clone(), hydra::TOTAL_ITEMS, count.into()),
            quad(dataset, hydra::SEARCH, form.clone().into()),
            quad(
                form.clone().into(),
                hydra::TEMPLATE,
                Literal::new_simple_literal(format!(
                    "{}{{?subject,predicate,object}}",
                    self.base_url
                ))
                .into(),
            ),
        ];
        for (variable, property) in [
            ("subject", rdf::SUBJECT),
            ("predicate", rdf::PREDICATE),
            ("object", rdf::OBJECT),
        ] {
            let mapping = BlankNode::new_unchecked(format!("mapping_{variable}"));
            quads.push(quad(form.clone().into(), hydra::MAPPING, mapping.clone().into()));
            quads.push(quad(
                mapping.clone().into(),
                hydra::VARIABLE,
                Literal::new_simple_literal(variable).into(),
            ));
            quads.push(quad(mapping.into(), hydra::PROPERTY, property.into_owned().into()));
        }
        if let Some(next_page) = next_page {
            quads.push(quad(page, hydra::NEXT, NamedNode::new_unchecked(next_page).into()));
        }
        quads
    }
}

#[async_trait]
impl HttpClient for MockTpfServer {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.url.clone());
        Ok(self.respond(&request.url))
    }
}

fn error_response(status: u16) -> HttpResponse {
    HttpResponse {
        status,
        content_type: Some("text/plain".to_owned()),
        body: b"error".to_vec(),
    }
}

/// Parses a term in the notation of fragment query parameters.
fn parse_term(value: &str) -> Option<Term> {
    let Some(rest) = value.strip_prefix('"') else {
        return NamedNode::new(value).ok().map(Term::from);
    };
    let end = rest.rfind('"')?;
    let (lexical, suffix) = (&rest[..end], &rest[end + 1..]);

    if let Some(language) = suffix.strip_prefix('@') {
        Literal::new_language_tagged_literal(lexical, language)
            .ok()
            .map(Term::from)
    } else if let Some(datatype) = suffix.strip_prefix("^^") {
        let datatype = NamedNode::new(datatype).ok()?;
        Some(Literal::new_typed_literal(lexical, datatype).into())
    } else {
        Some(Literal::new_simple_literal(lexical).into())
    }
}
