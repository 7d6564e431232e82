use crate::SolutionMapping;
use oxrdf::{BlankNode, Literal, NamedNode, Term, Variable};
use spargebra::term::{NamedNodePattern, TermPattern};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};

/// A basic graph pattern. The order of the patterns has no meaning for the query semantics but is
/// used as input for the join-order optimization.
pub type BasicGraphPattern = Vec<TriplePattern>;

/// A single position of a [TriplePattern].
///
/// Contrary to SPARQL's term patterns, any term may appear in any position. Applying a solution
/// mapping to a pattern can, for example, put a literal into the subject position. Such patterns
/// cannot match any triple, which callers check with [TriplePattern::is_unsatisfiable].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternElement {
    /// A concrete RDF term.
    Term(Term),
    /// A variable.
    Variable(Variable),
}

impl PatternElement {
    /// Returns the variable of this element, if any.
    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            PatternElement::Variable(variable) => Some(variable),
            PatternElement::Term(_) => None,
        }
    }

    /// Returns the term of this element, if any.
    pub fn as_term(&self) -> Option<&Term> {
        match self {
            PatternElement::Term(term) => Some(term),
            PatternElement::Variable(_) => None,
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, PatternElement::Variable(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, PatternElement::Term(Term::Literal(_)))
    }

    pub fn is_blank_node(&self) -> bool {
        matches!(self, PatternElement::Term(Term::BlankNode(_)))
    }

    /// Replaces a bound variable with its value in `mapping`.
    fn bind(&self, mapping: &SolutionMapping) -> PatternElement {
        match self {
            PatternElement::Variable(variable) => mapping
                .get(variable)
                .map_or_else(|| self.clone(), |term| PatternElement::Term(term.clone())),
            PatternElement::Term(_) => self.clone(),
        }
    }

    /// Returns whether `term` can occupy this position. Variables and blank nodes match anything.
    fn accepts(&self, term: &Term) -> bool {
        match self {
            PatternElement::Variable(_) | PatternElement::Term(Term::BlankNode(_)) => true,
            PatternElement::Term(expected) => expected == term,
        }
    }
}

impl Display for PatternElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternElement::Term(term) => term.fmt(f),
            PatternElement::Variable(variable) => variable.fmt(f),
        }
    }
}

impl From<Term> for PatternElement {
    fn from(term: Term) -> Self {
        PatternElement::Term(term)
    }
}

impl From<Variable> for PatternElement {
    fn from(variable: Variable) -> Self {
        PatternElement::Variable(variable)
    }
}

impl From<NamedNode> for PatternElement {
    fn from(node: NamedNode) -> Self {
        PatternElement::Term(node.into())
    }
}

impl From<BlankNode> for PatternElement {
    fn from(node: BlankNode) -> Self {
        PatternElement::Term(node.into())
    }
}

impl From<Literal> for PatternElement {
    fn from(literal: Literal) -> Self {
        PatternElement::Term(literal.into())
    }
}

impl From<TermPattern> for PatternElement {
    fn from(pattern: TermPattern) -> Self {
        match pattern {
            TermPattern::NamedNode(nn) => nn.into(),
            TermPattern::BlankNode(bnode) => bnode.into(),
            TermPattern::Literal(lit) => lit.into(),
            TermPattern::Variable(var) => var.into(),
        }
    }
}

impl From<NamedNodePattern> for PatternElement {
    fn from(pattern: NamedNodePattern) -> Self {
        match pattern {
            NamedNodePattern::NamedNode(nn) => nn.into(),
            NamedNodePattern::Variable(var) => var.into(),
        }
    }
}

/// A triple pattern. Patterns are immutable, binding variables creates a new pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TriplePattern {
    pub subject: PatternElement,
    pub predicate: PatternElement,
    pub object: PatternElement,
}

impl TriplePattern {
    pub fn new(
        subject: impl Into<PatternElement>,
        predicate: impl Into<PatternElement>,
        object: impl Into<PatternElement>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// Returns the subject, predicate and object in this order.
    pub fn elements(&self) -> [&PatternElement; 3] {
        [&self.subject, &self.predicate, &self.object]
    }

    /// Returns the variables of this pattern in positional order. A variable that occurs in
    /// multiple positions is returned once.
    pub fn variables(&self) -> Vec<&Variable> {
        let mut variables: Vec<&Variable> = Vec::with_capacity(3);
        for variable in self.elements().into_iter().filter_map(PatternElement::as_variable) {
            if !variables.contains(&variable) {
                variables.push(variable);
            }
        }
        variables
    }

    pub fn has_variables(&self) -> bool {
        self.elements().into_iter().any(PatternElement::is_variable)
    }

    /// Creates a new pattern in which every variable bound by `mapping` is replaced by its value.
    #[must_use]
    pub fn apply(&self, mapping: &SolutionMapping) -> TriplePattern {
        TriplePattern {
            subject: self.subject.bind(mapping),
            predicate: self.predicate.bind(mapping),
            object: self.object.bind(mapping),
        }
    }

    /// Returns whether the shape of this pattern rules out any match. This is the case for literals
    /// in the subject or predicate position.
    pub fn is_unsatisfiable(&self) -> bool {
        self.subject.is_literal() || self.predicate.is_literal()
    }

    /// Returns whether `triple` matches the constants of this pattern. Variable consistency is
    /// checked by [SolutionMapping::extend].
    pub fn matches(&self, triple: &oxrdf::Triple) -> bool {
        self.subject.accepts(&triple.subject.clone().into())
            && self.predicate.accepts(&triple.predicate.clone().into())
            && self.object.accepts(&triple.object)
    }

    /// Counts the positions holding a variable that is not contained in `bound`.
    pub fn count_unbound(&self, bound: &HashSet<Variable>) -> usize {
        self.elements()
            .into_iter()
            .filter_map(PatternElement::as_variable)
            .filter(|variable| !bound.contains(*variable))
            .count()
    }

    /// Counts the positions holding a variable that is contained in `bound`.
    pub fn count_bound(&self, bound: &HashSet<Variable>) -> usize {
        self.elements()
            .into_iter()
            .filter_map(PatternElement::as_variable)
            .filter(|variable| bound.contains(*variable))
            .count()
    }
}

impl Display for TriplePattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

impl From<spargebra::term::TriplePattern> for TriplePattern {
    fn from(pattern: spargebra::term::TriplePattern) -> Self {
        Self {
            subject: pattern.subject.into(),
            predicate: pattern.predicate.into(),
            object: pattern.object.into(),
        }
    }
}

/// Applies `mapping` to every pattern of `bgp`.
pub fn apply_to_bgp(bgp: &[TriplePattern], mapping: &SolutionMapping) -> BasicGraphPattern {
    bgp.iter().map(|pattern| pattern.apply(mapping)).collect()
}
