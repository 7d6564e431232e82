use crate::{PatternElement, ThinError, ThinResult, TriplePattern};
use oxrdf::{Term, Triple, Variable};
use std::collections::btree_map::Iter;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// A chunk of solution mappings that is processed together. Chunks are bounded by the configured
/// chunk size of the operator that produces them.
pub type MappingChunk = Vec<SolutionMapping>;

/// A partial function from variables to RDF terms.
///
/// Solution mappings are values. Extending a mapping creates a new one and never changes the
/// original.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SolutionMapping {
    bindings: BTreeMap<Variable, Term>,
}

impl SolutionMapping {
    /// Creates an empty solution mapping.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, variable: &Variable) -> Option<&Term> {
        self.bindings.get(variable)
    }

    pub fn contains(&self, variable: &Variable) -> bool {
        self.bindings.contains_key(variable)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterates over the bindings ordered by variable name.
    pub fn iter(&self) -> Iter<'_, Variable, Term> {
        self.bindings.iter()
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.bindings.keys()
    }

    /// Returns a new mapping that additionally binds `variable` to `term`. Returns an error if the
    /// variable is already bound to a different term.
    pub fn bind(&self, variable: &Variable, term: &Term) -> ThinResult<Self> {
        let mut result = self.clone();
        result.insert(variable, term)?;
        Ok(result)
    }

    /// Creates a new mapping that binds the variables of `pattern` to the corresponding terms of
    /// `triple`.
    ///
    /// Returns an error if `triple` does not match the constants of `pattern` or if a variable
    /// would be bound to two different terms. The latter happens if the variable is already bound
    /// in `self` or if it occurs in multiple positions of `pattern`.
    pub fn extend(&self, pattern: &TriplePattern, triple: &Triple) -> ThinResult<Self> {
        if !pattern.matches(triple) {
            return ThinError::expected();
        }

        let values = [
            Term::from(triple.subject.clone()),
            Term::from(triple.predicate.clone()),
            triple.object.clone(),
        ];

        let mut result = self.clone();
        for (element, value) in pattern.elements().into_iter().zip(values.iter()) {
            if let PatternElement::Variable(variable) = element {
                result.insert(variable, value)?;
            }
        }
        Ok(result)
    }

    /// Projects this mapping onto `variables`.
    #[must_use]
    pub fn project<'a>(&self, variables: impl IntoIterator<Item = &'a Variable>) -> Self {
        variables
            .into_iter()
            .filter_map(|variable| {
                self.bindings
                    .get(variable)
                    .map(|term| (variable.clone(), term.clone()))
            })
            .collect()
    }

    fn insert(&mut self, variable: &Variable, term: &Term) -> ThinResult<()> {
        match self.bindings.get(variable) {
            Some(existing) if existing != term => ThinError::expected(),
            Some(_) => Ok(()),
            None => {
                self.bindings.insert(variable.clone(), term.clone());
                Ok(())
            }
        }
    }
}

impl FromIterator<(Variable, Term)> for SolutionMapping {
    fn from_iter<T: IntoIterator<Item = (Variable, Term)>>(iter: T) -> Self {
        Self {
            bindings: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a SolutionMapping {
    type Item = (&'a Variable, &'a Term);
    type IntoIter = Iter<'a, Variable, Term>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings.iter()
    }
}

impl Display for SolutionMapping {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (i, (variable, term)) in self.bindings.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{variable} -> {term}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::{BlankNode, NamedNode};

    fn var(name: &str) -> Variable {
        Variable::new_unchecked(name)
    }

    fn iri(iri: &str) -> NamedNode {
        NamedNode::new_unchecked(iri)
    }

    fn triple(s: &str, p: &str, o: &str) -> Triple {
        Triple::new(iri(s), iri(p), iri(o))
    }

    #[test]
    fn extend_binds_pattern_variables() {
        let pattern = TriplePattern::new(var("s"), iri("http://ex.org/p"), var("o"));
        let result = SolutionMapping::new()
            .extend(&pattern, &triple("http://ex.org/a", "http://ex.org/p", "http://ex.org/b"))
            .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result.get(&var("s")), Some(&Term::from(iri("http://ex.org/a"))));
        assert_eq!(result.get(&var("o")), Some(&Term::from(iri("http://ex.org/b"))));
    }

    #[test]
    fn extend_keeps_original_unchanged() {
        let original: SolutionMapping = [(var("x"), Term::from(iri("http://ex.org/x")))]
            .into_iter()
            .collect();
        let pattern = TriplePattern::new(var("s"), var("p"), var("o"));

        let extended = original
            .extend(&pattern, &triple("http://ex.org/a", "http://ex.org/p", "http://ex.org/b"))
            .unwrap();

        assert_eq!(original.len(), 1);
        assert_eq!(extended.len(), 4);
    }

    #[test]
    fn extend_rejects_conflicting_binding() {
        let mapping: SolutionMapping = [(var("s"), Term::from(iri("http://ex.org/other")))]
            .into_iter()
            .collect();
        let pattern = TriplePattern::new(var("s"), var("p"), var("o"));

        let result =
            mapping.extend(&pattern, &triple("http://ex.org/a", "http://ex.org/p", "http://ex.org/b"));

        assert_eq!(result, Err(ThinError::default()));
    }

    #[test]
    fn extend_rejects_repeated_variable_with_different_terms() {
        let pattern = TriplePattern::new(var("x"), iri("http://ex.org/p"), var("x"));

        let same = triple("http://ex.org/a", "http://ex.org/p", "http://ex.org/a");
        let different = triple("http://ex.org/a", "http://ex.org/p", "http://ex.org/b");

        assert!(SolutionMapping::new().extend(&pattern, &same).is_ok());
        assert!(SolutionMapping::new().extend(&pattern, &different).is_err());
    }

    #[test]
    fn extend_treats_blank_nodes_as_wildcards() {
        let pattern = TriplePattern::new(
            var("s"),
            iri("http://ex.org/p"),
            BlankNode::new_unchecked("any"),
        );
        let result = SolutionMapping::new()
            .extend(&pattern, &triple("http://ex.org/a", "http://ex.org/p", "http://ex.org/b"))
            .unwrap();

        assert_eq!(result.len(), 1);
    }

    #[test]
    fn project_drops_other_variables() {
        let mapping: SolutionMapping = [
            (var("a"), Term::from(iri("http://ex.org/a"))),
            (var("b"), Term::from(iri("http://ex.org/b"))),
        ]
        .into_iter()
        .collect();

        let projected = mapping.project([&var("b"), &var("c")]);

        assert_eq!(projected.len(), 1);
        assert!(projected.contains(&var("b")));
    }
}
