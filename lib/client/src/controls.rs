use crate::FragmentError;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tpf_fusion_model::vocab::xsd;
use tpf_fusion_model::{PatternElement, Term, TriplePattern};

/// Characters that are percent-encoded when expanding URI template variables. Only the
/// unreserved characters of RFC 3986 are kept.
const TEMPLATE_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// The hypermedia controls of a fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentControls {
    /// The URL of the next page of the fragment, if any.
    pub next_page: Option<String>,
    /// The search form for building the URLs of other fragments.
    pub search: Option<SearchForm>,
}

impl FragmentControls {
    /// Returns the URL of the fragment that contains the matches of `pattern`.
    ///
    /// Variables and blank nodes are left unbound.
    pub fn fragment_url(&self, pattern: &TriplePattern) -> Result<String, FragmentError> {
        let search = self.search.as_ref().ok_or(FragmentError::NoSearchForm)?;
        Ok(search.expand(pattern))
    }
}

/// A Hydra search form that maps the positions of a triple pattern to the variables of a URI
/// template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchForm {
    template: UriTemplate,
    subject: Option<String>,
    predicate: Option<String>,
    object: Option<String>,
}

impl SearchForm {
    /// Creates a new search form. The position arguments hold the name of the template variable
    /// that is mapped to the respective position.
    pub fn new(
        template: UriTemplate,
        subject: Option<String>,
        predicate: Option<String>,
        object: Option<String>,
    ) -> Self {
        Self {
            template,
            subject,
            predicate,
            object,
        }
    }

    pub fn template(&self) -> &UriTemplate {
        &self.template
    }

    fn expand(&self, pattern: &TriplePattern) -> String {
        let positions = [
            (&self.subject, &pattern.subject),
            (&self.predicate, &pattern.predicate),
            (&self.object, &pattern.object),
        ];
        let values = positions
            .into_iter()
            .filter_map(|(name, element)| {
                let name = name.as_deref()?;
                match element {
                    PatternElement::Term(term) if !matches!(term, Term::BlankNode(_)) => {
                        Some((name, tpf_term_value(term)))
                    }
                    _ => None,
                }
            })
            .collect::<Vec<_>>();
        self.template.expand(&values)
    }
}

/// Renders `term` in the notation that fragment servers expect in their query parameters.
///
/// IRIs are written as-is, literals in quotes followed by their language tag or, unless it is
/// `xsd:string`, by `^^` and their datatype IRI.
pub fn tpf_term_value(term: &Term) -> String {
    match term {
        Term::NamedNode(node) => node.as_str().to_owned(),
        Term::Literal(literal) => {
            if let Some(language) = literal.language() {
                format!("\"{}\"@{language}", literal.value())
            } else if literal.datatype() == xsd::STRING {
                format!("\"{}\"", literal.value())
            } else {
                format!("\"{}\"^^{}", literal.value(), literal.datatype().as_str())
            }
        }
        _ => term.to_string(),
    }
}

/// A URI template supporting simple string expansion (`{var}`) and form-style query expansion
/// (`{?var}` and `{&var}`) as defined by RFC 6570.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    parts: Vec<TemplatePart>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplatePart {
    Literal(String),
    Expression {
        operator: Option<char>,
        variables: Vec<String>,
    },
}

impl UriTemplate {
    /// Parses a URI template.
    pub fn parse(template: &str) -> Result<Self, FragmentError> {
        let invalid = || FragmentError::InvalidTemplate {
            template: template.to_owned(),
        };

        let mut parts = Vec::new();
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            if start > 0 {
                parts.push(TemplatePart::Literal(rest[..start].to_owned()));
            }
            let end = rest[start..].find('}').ok_or_else(invalid)? + start;
            let mut expression = &rest[start + 1..end];

            let operator = match expression.chars().next() {
                Some(op @ ('?' | '&')) => {
                    expression = &expression[1..];
                    Some(op)
                }
                Some(c) if c.is_alphanumeric() || c == '_' => None,
                _ => return Err(invalid()),
            };
            let variables = expression
                .split(',')
                .map(|variable| variable.trim().to_owned())
                .collect::<Vec<_>>();
            if variables.iter().any(String::is_empty) {
                return Err(invalid());
            }

            parts.push(TemplatePart::Expression {
                operator,
                variables,
            });
            rest = &rest[end + 1..];
        }
        if rest.contains('}') {
            return Err(invalid());
        }
        if !rest.is_empty() {
            parts.push(TemplatePart::Literal(rest.to_owned()));
        }
        Ok(Self { parts })
    }

    /// Returns the names of all variables in this template.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                TemplatePart::Literal(_) => None,
                TemplatePart::Expression { variables, .. } => Some(variables),
            })
            .flatten()
            .map(String::as_str)
    }

    /// Expands the template. Variables without a value are omitted.
    pub fn expand(&self, values: &[(&str, String)]) -> String {
        let lookup = |name: &str| {
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.as_str())
        };

        let mut result = String::new();
        for part in &self.parts {
            match part {
                TemplatePart::Literal(literal) => result.push_str(literal),
                TemplatePart::Expression {
                    operator: None,
                    variables,
                } => {
                    let expanded = variables
                        .iter()
                        .filter_map(|name| lookup(name))
                        .map(|value| utf8_percent_encode(value, TEMPLATE_VALUE).to_string())
                        .collect::<Vec<_>>();
                    result.push_str(&expanded.join(","));
                }
                TemplatePart::Expression {
                    operator: Some(operator),
                    variables,
                } => {
                    let mut separator = *operator;
                    for name in variables {
                        if let Some(value) = lookup(name) {
                            result.push(separator);
                            result.push_str(name);
                            result.push('=');
                            result.extend(utf8_percent_encode(value, TEMPLATE_VALUE));
                            separator = '&';
                        }
                    }
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tpf_fusion_model::{Literal, NamedNode, Variable};

    fn search_form() -> SearchForm {
        SearchForm::new(
            UriTemplate::parse("http://ex.org/dataset{?subject,predicate,object}").unwrap(),
            Some("subject".to_owned()),
            Some("predicate".to_owned()),
            Some("object".to_owned()),
        )
    }

    #[test]
    fn expands_bound_positions_only() {
        let controls = FragmentControls {
            next_page: None,
            search: Some(search_form()),
        };
        let pattern = TriplePattern::new(
            Variable::new_unchecked("s"),
            NamedNode::new_unchecked("http://ex.org/p"),
            Literal::new_simple_literal("a b"),
        );

        let url = controls.fragment_url(&pattern).unwrap();

        assert_eq!(
            url,
            "http://ex.org/dataset?predicate=http%3A%2F%2Fex.org%2Fp&object=%22a%20b%22"
        );
    }

    #[test]
    fn unbound_pattern_yields_plain_url() {
        let controls = FragmentControls {
            next_page: None,
            search: Some(search_form()),
        };
        let pattern = TriplePattern::new(
            Variable::new_unchecked("s"),
            Variable::new_unchecked("p"),
            Variable::new_unchecked("o"),
        );
        assert_eq!(controls.fragment_url(&pattern).unwrap(), "http://ex.org/dataset");
    }

    #[test]
    fn missing_search_form_is_an_error() {
        let pattern = TriplePattern::new(
            Variable::new_unchecked("s"),
            Variable::new_unchecked("p"),
            Variable::new_unchecked("o"),
        );
        let result = FragmentControls::default().fragment_url(&pattern);
        assert!(matches!(result, Err(FragmentError::NoSearchForm)));
    }

    #[test]
    fn term_values_use_fragment_notation() {
        let typed = Literal::new_typed_literal(
            "1",
            NamedNode::new_unchecked("http://www.w3.org/2001/XMLSchema#integer"),
        );
        let tagged = Literal::new_language_tagged_literal_unchecked("chat", "fr");

        assert_eq!(
            tpf_term_value(&typed.into()),
            "\"1\"^^http://www.w3.org/2001/XMLSchema#integer"
        );
        assert_eq!(tpf_term_value(&tagged.into()), "\"chat\"@fr");
        assert_eq!(
            tpf_term_value(&NamedNode::new_unchecked("http://ex.org/a").into()),
            "http://ex.org/a"
        );
    }

    #[test]
    fn template_with_existing_query() {
        let template = UriTemplate::parse("http://ex.org/f?graph=x{&subject}").unwrap();
        assert_eq!(
            template.expand(&[("subject", "http://ex.org/a".to_owned())]),
            "http://ex.org/f?graph=x&subject=http%3A%2F%2Fex.org%2Fa"
        );
        assert_eq!(template.variables().collect::<Vec<_>>(), vec!["subject"]);
    }

    #[test]
    fn unterminated_expression_is_invalid() {
        assert!(matches!(
            UriTemplate::parse("http://ex.org/f{?subject"),
            Err(FragmentError::InvalidTemplate { .. })
        ));
    }
}
