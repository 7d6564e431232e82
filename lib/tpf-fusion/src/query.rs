use crate::EngineError;
use spargebra::algebra::GraphPattern;
use spargebra::term::TermPattern;
use spargebra::Query;
use std::collections::HashMap;
use tpf_fusion_model::{BasicGraphPattern, BlankNode, TriplePattern, Variable};

/// The prefix of the variables that replace blank nodes.
const HIDDEN_PREFIX: &str = "__blank";

/// A SELECT query over a single basic graph pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BgpQuery {
    pub bgp: BasicGraphPattern,
    /// The projected variables.
    pub variables: Vec<Variable>,
    pub distinct: bool,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl BgpQuery {
    /// Parses `query` and extracts its basic graph pattern.
    ///
    /// Supported are SELECT queries whose pattern is a basic graph pattern with an optional
    /// projection, DISTINCT or REDUCED, LIMIT and OFFSET.
    pub(crate) fn parse(query: &str) -> Result<Self, EngineError> {
        let query = Query::parse(query, None)?;
        let Query::Select { pattern, .. } = &query else {
            return Err(EngineError::Unsupported(
                "Only SELECT queries are supported".to_owned(),
            ));
        };
        Self::from_pattern(pattern)
    }

    fn from_pattern(pattern: &GraphPattern) -> Result<Self, EngineError> {
        let mut pattern = pattern;

        let (offset, limit) = match pattern {
            GraphPattern::Slice {
                inner,
                start,
                length,
            } => {
                pattern = inner;
                (*start, *length)
            }
            _ => (0, None),
        };

        let distinct = match pattern {
            GraphPattern::Distinct { inner } => {
                pattern = inner;
                true
            }
            GraphPattern::Reduced { inner } => {
                pattern = inner;
                false
            }
            _ => false,
        };

        let projection = match pattern {
            GraphPattern::Project { inner, variables } => {
                pattern = inner;
                Some(variables.clone())
            }
            _ => None,
        };

        let GraphPattern::Bgp { patterns } = pattern else {
            return Err(EngineError::Unsupported(format!(
                "Only basic graph patterns can be evaluated, found {pattern}"
            )));
        };

        let mut blank_nodes = HiddenVariables::default();
        let bgp = patterns
            .iter()
            .map(|pattern| {
                TriplePattern::from(spargebra::term::TriplePattern {
                    subject: blank_nodes.replace(&pattern.subject),
                    predicate: pattern.predicate.clone(),
                    object: blank_nodes.replace(&pattern.object),
                })
            })
            .collect::<Vec<_>>();

        let variables = projection.unwrap_or_else(|| visible_variables(&bgp));
        Ok(Self {
            bgp,
            variables,
            distinct,
            offset,
            limit,
        })
    }
}

/// Replaces the blank nodes of a query with variables that are never projected.
#[derive(Default)]
struct HiddenVariables {
    variables: HashMap<BlankNode, Variable>,
}

impl HiddenVariables {
    fn replace(&mut self, term: &TermPattern) -> TermPattern {
        let TermPattern::BlankNode(blank_node) = term else {
            return term.clone();
        };
        let next = self.variables.len();
        let variable = self
            .variables
            .entry(blank_node.clone())
            .or_insert_with(|| Variable::new_unchecked(format!("{HIDDEN_PREFIX}{next}")));
        TermPattern::Variable(variable.clone())
    }
}

/// The variables of `bgp` in order of appearance, without the ones that replace blank nodes.
fn visible_variables(bgp: &[TriplePattern]) -> Vec<Variable> {
    let mut variables = Vec::new();
    for variable in bgp.iter().flat_map(TriplePattern::variables) {
        if !variable.as_str().starts_with(HIDDEN_PREFIX) && !variables.contains(variable) {
            variables.push(variable.clone());
        }
    }
    variables
}

#[cfg(test)]
mod tests {
    use super::*;
    use tpf_fusion_model::NamedNode;

    fn var(name: &str) -> Variable {
        Variable::new_unchecked(name)
    }

    #[test]
    fn select_with_slice_and_projection() {
        let query = BgpQuery::parse(
            "SELECT DISTINCT ?s WHERE { ?s <http://ex.org/p> ?o } LIMIT 10 OFFSET 5",
        )
        .unwrap();

        assert_eq!(
            query.bgp,
            vec![TriplePattern::new(
                var("s"),
                NamedNode::new_unchecked("http://ex.org/p"),
                var("o")
            )]
        );
        assert_eq!(query.variables, vec![var("s")]);
        assert!(query.distinct);
        assert_eq!(query.offset, 5);
        assert_eq!(query.limit, Some(10));
    }

    #[test]
    fn select_star_projects_visible_variables() {
        let query = BgpQuery::parse(
            "SELECT * WHERE { ?s <http://ex.org/p> _:b . _:b <http://ex.org/q> ?o }",
        )
        .unwrap();

        assert_eq!(query.variables, vec![var("s"), var("o")]);
        assert_eq!(query.bgp[0].object, query.bgp[1].subject);
        assert!(query.bgp[0].object.is_variable());
    }

    #[test]
    fn rejects_other_query_forms() {
        assert!(matches!(
            BgpQuery::parse("ASK { ?s ?p ?o }"),
            Err(EngineError::Unsupported(_))
        ));
    }

    #[test]
    fn rejects_other_patterns() {
        assert!(matches!(
            BgpQuery::parse("SELECT * WHERE { ?s ?p ?o FILTER(?o = 1) }"),
            Err(EngineError::Unsupported(_))
        ));
    }

    #[test]
    fn reports_syntax_errors() {
        assert!(matches!(
            BgpQuery::parse("SELECT WHERE"),
            Err(EngineError::Syntax(_))
        ));
    }
}
