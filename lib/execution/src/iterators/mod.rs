mod array_input;
mod array_to_elements;
mod first;
mod triple_pattern;

pub use array_input::ArrayInputTriplePatternIterator;
pub use array_to_elements::ArrayToElementsIterator;
pub use first::FirstTriplePatternIterator;
pub use triple_pattern::TriplePatternIterator;
