//! IRIs of the vocabularies used by Triple Pattern Fragments servers.

pub mod hydra {
    use oxrdf::NamedNodeRef;

    pub const NAMESPACE: &str = "http://www.w3.org/ns/hydra/core#";

    pub const TOTAL_ITEMS: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#totalItems");
    pub const NEXT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#next");
    /// Legacy predicate that older servers use instead of [NEXT].
    pub const NEXT_PAGE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#nextPage");
    pub const SEARCH: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#search");
    pub const TEMPLATE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#template");
    pub const MAPPING: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#mapping");
    pub const VARIABLE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#variable");
    pub const PROPERTY: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#property");
}

pub mod void {
    use oxrdf::NamedNodeRef;

    pub const TRIPLES: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://rdfs.org/ns/void#triples");
    pub const SUBSET: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://rdfs.org/ns/void#subset");
}

pub mod rdf {
    use oxrdf::NamedNodeRef;

    pub const SUBJECT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#subject");
    pub const PREDICATE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#predicate");
    pub const OBJECT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#object");
}

pub mod xsd {
    use oxrdf::NamedNodeRef;

    pub const STRING: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#string");
}
