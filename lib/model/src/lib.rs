mod error;
mod mapping;
mod pattern;
pub mod vocab;

pub use error::*;
pub use mapping::*;
pub use pattern::*;

// Re-export some oxrdf types.
pub use oxrdf::{
    BlankNode, BlankNodeRef, GraphName, Literal, LiteralRef, NamedNode, NamedNodeRef, Quad,
    Subject, Term, TermRef, Triple, TripleRef, Variable, VariableRef,
};
