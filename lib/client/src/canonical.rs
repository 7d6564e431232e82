use crate::{values_extension, FragmentControls, FragmentError};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tpf_fusion_model::{PatternElement, SolutionMapping, TriplePattern, Variable};

/// The renaming between the variables of a pattern and the canonical variables `?s`, `?p` and `?o`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableRenaming {
    /// Pairs of (original, canonical) variables.
    pairs: Vec<(Variable, Variable)>,
}

impl VariableRenaming {
    /// Returns the canonical name of `original`.
    pub fn canonical(&self, original: &Variable) -> Option<&Variable> {
        self.pairs
            .iter()
            .find(|(o, _)| o == original)
            .map(|(_, c)| c)
    }

    /// Returns the original name of `canonical`.
    pub fn original(&self, canonical: &Variable) -> Option<&Variable> {
        self.pairs
            .iter()
            .find(|(_, c)| c == canonical)
            .map(|(o, _)| o)
    }

    /// Renames the canonical variables of `mapping` back to their original names. Bindings of
    /// other variables are dropped.
    pub fn restore(&self, mapping: &SolutionMapping) -> SolutionMapping {
        mapping
            .iter()
            .filter_map(|(variable, term)| {
                self.original(variable)
                    .map(|original| (original.clone(), term.clone()))
            })
            .collect()
    }
}

/// Renames the variables of `pattern` to `?s`, `?p` and `?o` according to their first position.
///
/// A variable that occurs in several positions keeps the name of its first position. Hence, two
/// patterns that only differ in the names of their variables have the same canonical form.
pub fn canonicalize_pattern(pattern: &TriplePattern) -> (TriplePattern, VariableRenaming) {
    let mut renaming = VariableRenaming::default();
    let mut rename = |element: &PatternElement, name: &str| match element {
        PatternElement::Variable(variable) => {
            let canonical = match renaming.canonical(variable) {
                Some(canonical) => canonical.clone(),
                None => {
                    let canonical = Variable::new_unchecked(name);
                    renaming.pairs.push((variable.clone(), canonical.clone()));
                    canonical
                }
            };
            PatternElement::Variable(canonical)
        }
        PatternElement::Term(_) => element.clone(),
    };

    let canonical = TriplePattern {
        subject: rename(&pattern.subject, "s"),
        predicate: rename(&pattern.predicate, "p"),
        object: rename(&pattern.object, "o"),
    };
    (canonical, renaming)
}

/// Projects the bindings of `batch` onto the variables of the original pattern and renames them to
/// their canonical names.
///
/// Mappings that become empty are dropped. If more than one mapping remains, the mappings are
/// sorted by their values for `?s`, `?p` and `?o` and duplicates are removed. Returns `None` if no
/// restriction remains.
pub fn canonicalize_bindings(
    renaming: &VariableRenaming,
    batch: Option<&[SolutionMapping]>,
) -> Option<Vec<SolutionMapping>> {
    let batch = batch.filter(|batch| !batch.is_empty())?;
    if renaming.pairs.is_empty() {
        return None;
    }

    let mut reduced = batch
        .iter()
        .map(|mapping| {
            renaming
                .pairs
                .iter()
                .filter_map(|(original, canonical)| {
                    mapping
                        .get(original)
                        .map(|term| (canonical.clone(), term.clone()))
                })
                .collect::<SolutionMapping>()
        })
        .filter(|mapping| !mapping.is_empty())
        .collect::<Vec<_>>();

    match reduced.len() {
        0 => return None,
        1 => return Some(reduced),
        _ => {}
    }

    reduced.sort_by_cached_key(sort_key);
    reduced.dedup();
    Some(reduced)
}

fn sort_key(mapping: &SolutionMapping) -> [Option<String>; 3] {
    ["s", "p", "o"].map(|name| {
        mapping
            .get(&Variable::new_unchecked(name))
            .map(ToString::to_string)
    })
}

/// A fragment request in canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    pub pattern: TriplePattern,
    pub bindings: Option<Vec<SolutionMapping>>,
}

impl CanonicalRequest {
    /// Canonicalizes the request for the matches of `pattern` that are compatible with `batch`.
    ///
    /// A single remaining mapping is applied to the pattern directly.
    pub fn new(pattern: &TriplePattern, batch: Option<&[SolutionMapping]>) -> Self {
        let (canonical, renaming) = canonicalize_pattern(pattern);
        let bindings = canonicalize_bindings(&renaming, batch);
        match bindings {
            Some(bindings) if bindings.len() == 1 => Self {
                pattern: canonical.apply(&bindings[0]),
                bindings: None,
            },
            bindings => Self {
                pattern: canonical,
                bindings,
            },
        }
    }

    /// The number of mappings that restrict this request.
    pub fn batch_size(&self) -> usize {
        self.bindings.as_ref().map_or(0, Vec::len)
    }

    /// Returns a key that is equal for equal canonical requests.
    pub fn cache_key(&self) -> String {
        let pattern = self
            .pattern
            .elements()
            .map(|element| Value::String(element.to_string()));
        let bindings = self.bindings.as_ref().map(|bindings| {
            bindings
                .iter()
                .map(|mapping| {
                    mapping
                        .iter()
                        .map(|(variable, term)| (variable.as_str().to_owned(), json!(term.to_string())))
                        .collect::<serde_json::Map<_, _>>()
                })
                .collect::<Vec<_>>()
        });
        json!({ "pattern": pattern, "bindings": bindings }).to_string()
    }

    /// Builds the URL of the first page of this request.
    ///
    /// Returns `None` if the request cannot have any matches and must not be sent.
    pub fn page_url(
        &self,
        controls: &FragmentControls,
        prefixes: &BTreeMap<String, String>,
    ) -> Result<Option<String>, FragmentError> {
        if self.pattern.is_unsatisfiable() {
            return Ok(None);
        }

        let mut url = controls.fragment_url(&self.pattern)?;
        if let Some(bindings) = &self.bindings {
            let extension = values_extension(bindings, prefixes);
            match extension.strip_prefix('&') {
                Some(parameters) if !url.contains('?') => {
                    url.push('?');
                    url.push_str(parameters);
                }
                _ => url.push_str(&extension),
            }
        }
        Ok(Some(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SearchForm, UriTemplate};
    use tpf_fusion_model::{Literal, NamedNode, Term};

    fn var(name: &str) -> Variable {
        Variable::new_unchecked(name)
    }

    fn iri(iri: &str) -> NamedNode {
        NamedNode::new_unchecked(iri)
    }

    fn mapping(bindings: &[(&str, &str)]) -> SolutionMapping {
        bindings
            .iter()
            .map(|(v, t)| (var(v), Term::from(iri(t))))
            .collect()
    }

    fn controls() -> FragmentControls {
        FragmentControls {
            next_page: None,
            search: Some(SearchForm::new(
                UriTemplate::parse("http://ex.org/f{?subject,predicate,object}").unwrap(),
                Some("subject".to_owned()),
                Some("predicate".to_owned()),
                Some("object".to_owned()),
            )),
        }
    }

    #[test]
    fn repeated_variables_share_canonical_name() {
        let pattern = TriplePattern::new(var("x"), var("y"), var("x"));
        let (canonical, renaming) = canonicalize_pattern(&pattern);

        assert_eq!(canonical, TriplePattern::new(var("s"), var("p"), var("s")));
        assert_eq!(renaming.canonical(&var("y")), Some(&var("p")));
        assert_eq!(renaming.original(&var("s")), Some(&var("x")));
    }

    #[test]
    fn isomorphic_patterns_share_cache_key() {
        let a = TriplePattern::new(var("a"), iri("http://ex.org/p"), var("b"));
        let b = TriplePattern::new(var("person"), iri("http://ex.org/p"), var("name"));
        let c = TriplePattern::new(var("a"), iri("http://ex.org/q"), var("b"));

        let key = |p: &TriplePattern| CanonicalRequest::new(p, None).cache_key();
        assert_eq!(key(&a), key(&b));
        assert_ne!(key(&a), key(&c));
    }

    #[test]
    fn batches_are_projected_sorted_and_deduplicated() {
        let pattern = TriplePattern::new(var("x"), iri("http://ex.org/p"), var("y"));
        let batch = vec![
            mapping(&[("x", "http://ex.org/b"), ("z", "http://ex.org/1")]),
            mapping(&[("x", "http://ex.org/a")]),
            mapping(&[("z", "http://ex.org/2")]),
            mapping(&[("x", "http://ex.org/b"), ("z", "http://ex.org/3")]),
        ];

        let request = CanonicalRequest::new(&pattern, Some(&batch));

        assert_eq!(
            request.bindings,
            Some(vec![
                mapping(&[("s", "http://ex.org/a")]),
                mapping(&[("s", "http://ex.org/b")]),
            ])
        );
        assert_eq!(request.batch_size(), 2);
    }

    #[test]
    fn canonical_batch_round_trips_through_renaming() {
        let pattern = TriplePattern::new(var("x"), iri("http://ex.org/p"), var("y"));
        let (_, renaming) = canonicalize_pattern(&pattern);
        let batch = vec![
            mapping(&[("x", "http://ex.org/a"), ("y", "http://ex.org/b")]),
            mapping(&[("x", "http://ex.org/c")]),
        ];

        let canonical = canonicalize_bindings(&renaming, Some(&batch)).unwrap();
        let restored = canonical
            .iter()
            .map(|m| renaming.restore(m))
            .collect::<Vec<_>>();

        assert_eq!(restored, batch);
    }

    #[test]
    fn absent_values_sort_first() {
        let pattern = TriplePattern::new(var("x"), iri("http://ex.org/p"), var("y"));
        let batch = vec![
            mapping(&[("x", "http://ex.org/a"), ("y", "http://ex.org/b")]),
            mapping(&[("y", "http://ex.org/c")]),
        ];

        let request = CanonicalRequest::new(&pattern, Some(&batch));

        assert_eq!(
            request.bindings.unwrap()[0],
            mapping(&[("o", "http://ex.org/c")])
        );
    }

    #[test]
    fn single_mapping_is_applied_to_pattern() {
        let pattern = TriplePattern::new(var("x"), iri("http://ex.org/p"), var("y"));
        let batch = vec![mapping(&[
            ("x", "http://ex.org/a"),
            ("unrelated", "http://ex.org/u"),
        ])];

        let request = CanonicalRequest::new(&pattern, Some(&batch));

        assert_eq!(request.bindings, None);
        assert_eq!(
            request.pattern,
            TriplePattern::new(iri("http://ex.org/a"), iri("http://ex.org/p"), var("o"))
        );
    }

    #[test]
    fn variable_free_pattern_drops_batch() {
        let pattern = TriplePattern::new(
            iri("http://ex.org/a"),
            iri("http://ex.org/p"),
            iri("http://ex.org/b"),
        );
        let batch = vec![mapping(&[("x", "http://ex.org/a")]), mapping(&[])];
        assert_eq!(CanonicalRequest::new(&pattern, Some(&batch)).bindings, None);
        assert_eq!(CanonicalRequest::new(&pattern, Some(&[])).bindings, None);
    }

    #[test]
    fn page_url_appends_values() {
        let pattern = TriplePattern::new(var("x"), iri("http://ex.org/p"), var("y"));
        let batch = vec![
            mapping(&[("x", "http://ex.org/a")]),
            mapping(&[("x", "http://ex.org/b")]),
        ];
        let request = CanonicalRequest::new(&pattern, Some(&batch));

        let url = request
            .page_url(&controls(), &BTreeMap::new())
            .unwrap()
            .unwrap();

        assert!(url.starts_with("http://ex.org/f?predicate=http%3A%2F%2Fex.org%2Fp&values="));
    }

    #[test]
    fn page_url_starts_query_when_needed() {
        let pattern = TriplePattern::new(var("x"), var("y"), var("z"));
        let batch = vec![
            mapping(&[("x", "http://ex.org/a")]),
            mapping(&[("x", "http://ex.org/b")]),
        ];
        let request = CanonicalRequest::new(&pattern, Some(&batch));

        let url = request
            .page_url(&controls(), &BTreeMap::new())
            .unwrap()
            .unwrap();

        assert!(url.starts_with("http://ex.org/f?values="));
    }

    #[test]
    fn literal_subject_has_no_url() {
        let pattern = TriplePattern::new(
            Literal::new_simple_literal("x"),
            iri("http://ex.org/p"),
            var("o"),
        );
        let request = CanonicalRequest::new(&pattern, None);
        assert_eq!(request.page_url(&controls(), &BTreeMap::new()).unwrap(), None);
    }
}
