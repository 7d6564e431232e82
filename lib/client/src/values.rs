use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::{BTreeMap, BTreeSet};
use tpf_fusion_model::{NamedNode, SolutionMapping, Term, Variable};

/// The characters that `encodeURIComponent` leaves untouched.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const UNDEF: &str = "UNDEF";

/// Renders the binding restriction of a brTPF request.
///
/// The result is a `values` query parameter holding a SPARQL-style VALUES block, followed by a
/// `prefix` parameter for every namespace that was used to abbreviate an IRI. Every parameter
/// starts with `&`.
///
/// ```text
/// &values=(?o ?s) { (<http://ex.org/a> UNDEF) ("x"@en ex:b) }&prefix=ex:http://ex.org/
/// ```
///
/// (The parameter values are percent-encoded in the actual output.)
pub fn values_extension(
    bindings: &[SolutionMapping],
    prefixes: &BTreeMap<String, String>,
) -> String {
    let variables = bindings
        .iter()
        .flat_map(SolutionMapping::variables)
        .collect::<BTreeSet<&Variable>>();

    let mut used_prefixes = BTreeMap::new();
    let tuples = bindings
        .iter()
        .map(|mapping| {
            let values = variables
                .iter()
                .map(|variable| match mapping.get(variable) {
                    Some(term) => render_term(term, prefixes, &mut used_prefixes),
                    None => UNDEF.to_owned(),
                })
                .collect::<Vec<_>>();
            format!("({})", values.join(" "))
        })
        .collect::<Vec<_>>();

    let header = variables
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    let values = format!("({}) {{ {} }}", header.join(" "), tuples.join(" "));

    let mut result = format!("&values={}", utf8_percent_encode(&values, URI_COMPONENT));
    for (prefix, namespace) in used_prefixes {
        let declaration = format!("{prefix}:{namespace}");
        result.push_str("&prefix=");
        result.extend(utf8_percent_encode(&declaration, URI_COMPONENT));
    }
    result
}

fn render_term<'p>(
    term: &Term,
    prefixes: &'p BTreeMap<String, String>,
    used_prefixes: &mut BTreeMap<&'p str, &'p str>,
) -> String {
    match term {
        Term::NamedNode(node) => match abbreviate(node, prefixes) {
            Some((prefix, namespace, local)) => {
                used_prefixes.insert(prefix, namespace);
                format!("{prefix}:{local}")
            }
            None => node.to_string(),
        },
        // Blank nodes cannot be shared with the server.
        Term::BlankNode(_) => UNDEF.to_owned(),
        _ => term.to_string(),
    }
}

/// Finds the longest namespace in `prefixes` that abbreviates `node` to a valid prefixed name.
fn abbreviate<'p, 'n>(
    node: &'n NamedNode,
    prefixes: &'p BTreeMap<String, String>,
) -> Option<(&'p str, &'p str, &'n str)> {
    prefixes
        .iter()
        .filter_map(|(prefix, namespace)| {
            let local = node.as_str().strip_prefix(namespace.as_str())?;
            is_local_name(local).then_some((prefix.as_str(), namespace.as_str(), local))
        })
        .max_by_key(|(_, namespace, _)| namespace.len())
}

fn is_local_name(local: &str) -> bool {
    local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use percent_encoding::percent_decode_str;
    use tpf_fusion_model::{BlankNode, Literal};

    fn var(name: &str) -> Variable {
        Variable::new_unchecked(name)
    }

    fn iri(iri: &str) -> Term {
        NamedNode::new_unchecked(iri).into()
    }

    fn decode(extension: &str) -> String {
        percent_decode_str(extension)
            .decode_utf8()
            .unwrap()
            .into_owned()
    }

    #[test]
    fn renders_sorted_variables_and_undef() {
        let bindings = vec![
            [(var("s"), iri("http://ex.org/a"))].into_iter().collect(),
            [
                (var("s"), iri("http://ex.org/b")),
                (var("o"), Literal::new_language_tagged_literal_unchecked("x", "en").into()),
            ]
            .into_iter()
            .collect(),
        ];

        let extension = values_extension(&bindings, &BTreeMap::new());

        assert_eq!(
            decode(&extension),
            "&values=(?o ?s) { (UNDEF <http://ex.org/a>) (\"x\"@en <http://ex.org/b>) }"
        );
    }

    #[test]
    fn abbreviates_with_longest_namespace() {
        let prefixes = BTreeMap::from([
            ("ex".to_owned(), "http://ex.org/".to_owned()),
            ("exv".to_owned(), "http://ex.org/vocab#".to_owned()),
        ]);
        let bindings = vec![
            [(var("p"), iri("http://ex.org/vocab#name"))].into_iter().collect(),
            [(var("p"), iri("http://ex.org/path/with/slash"))]
                .into_iter()
                .collect(),
        ];

        let extension = values_extension(&bindings, &prefixes);

        assert_eq!(
            decode(&extension),
            "&values=(?p) { (exv:name) (<http://ex.org/path/with/slash>) }&prefix=exv:http://ex.org/vocab#"
        );
    }

    #[test]
    fn typed_literals_and_blank_nodes() {
        let bindings = vec![[
            (
                var("o"),
                Literal::new_typed_literal(
                    "1",
                    NamedNode::new_unchecked("http://www.w3.org/2001/XMLSchema#integer"),
                )
                .into(),
            ),
            (var("s"), BlankNode::new_unchecked("b").into()),
        ]
        .into_iter()
        .collect()];

        let extension = values_extension(&bindings, &BTreeMap::new());

        assert_eq!(
            decode(&extension),
            "&values=(?o ?s) { (\"1\"^^<http://www.w3.org/2001/XMLSchema#integer> UNDEF) }"
        );
    }

    #[test]
    fn output_is_percent_encoded() {
        let bindings = vec![[(var("s"), iri("http://ex.org/a"))].into_iter().collect()];
        let extension = values_extension(&bindings, &BTreeMap::new());
        assert_eq!(
            extension,
            "&values=(%3Fs)%20%7B%20(%3Chttp%3A%2F%2Fex.org%2Fa%3E)%20%7D"
        );
    }
}
