use futures::{stream, TryStreamExt};
use std::sync::Arc;
use tpf_fusion_client::testing::MockTpfServer;
use tpf_fusion_client::{ClientOptions, FragmentClient};
use tpf_fusion_execution::{
    create_bgp_iterator, BgpOptions, BgpStrategy, BgpStream, JoinOrderHeuristic, ProbePolicy,
    QueryError, SendableMappingStream,
};
use tpf_fusion_model::{
    BasicGraphPattern, BlankNode, Literal, NamedNode, SolutionMapping, Term, Triple, TriplePattern, Variable,
};

const START: &str = "http://tpf.test/dataset";

fn iri(value: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("http://ex.org/{value}"))
}

fn var(name: &str) -> Variable {
    Variable::new_unchecked(name)
}

fn person(i: usize) -> NamedNode {
    iri(&format!("person{i}"))
}

/// Five persons that know alice and have a name. Every person has two nicknames. Some other
/// entities have names as well.
fn data() -> Vec<Triple> {
    let mut triples = Vec::new();
    for i in 0..5 {
        triples.push(Triple::new(person(i), iri("knows"), iri("alice")));
        triples.push(Triple::new(
            person(i),
            iri("name"),
            Literal::new_simple_literal(format!("Person {i}")),
        ));
        for nick in ["a", "b"] {
            triples.push(Triple::new(
                person(i),
                iri("nick"),
                Literal::new_simple_literal(format!("{nick}{i}")),
            ));
        }
    }
    triples.push(Triple::new(
        iri("alice"),
        iri("name"),
        Literal::new_simple_literal("Alice"),
    ));
    for i in 0..10 {
        triples.push(Triple::new(
            iri(&format!("other{i}")),
            iri("name"),
            Literal::new_simple_literal(format!("Other {i}")),
        ));
    }
    triples
}

fn client(server: &Arc<MockTpfServer>) -> FragmentClient {
    let options = ClientOptions::default().with_http_client(Arc::clone(server) as _);
    FragmentClient::new(server.start_url(), options).unwrap()
}

fn single_empty_mapping() -> SendableMappingStream {
    Box::pin(stream::iter([Ok::<_, QueryError>(SolutionMapping::new())]))
}

/// `?p ex:knows ?f . ?p ex:name ?name . ?f ex:name ?fname`
fn friends_bgp() -> BasicGraphPattern {
    vec![
        TriplePattern::new(var("p"), iri("knows"), var("f")),
        TriplePattern::new(var("p"), iri("name"), var("name")),
        TriplePattern::new(var("f"), iri("name"), var("fname")),
    ]
}

fn friends_solutions() -> Vec<SolutionMapping> {
    let mut solutions = (0..5)
        .map(|i| {
            [
                (var("p"), Term::from(person(i))),
                (var("f"), iri("alice").into()),
                (var("name"), Literal::new_simple_literal(format!("Person {i}")).into()),
                (var("fname"), Literal::new_simple_literal("Alice").into()),
            ]
            .into_iter()
            .collect::<SolutionMapping>()
        })
        .collect::<Vec<_>>();
    solutions.sort_by_key(ToString::to_string);
    solutions
}

async fn evaluate(bgp: BasicGraphPattern, options: BgpOptions) -> Vec<SolutionMapping> {
    let mut result = create_bgp_iterator(single_empty_mapping(), bgp, options)
        .try_collect::<Vec<_>>()
        .await
        .unwrap();
    result.sort_by_key(ToString::to_string);
    result
}

#[tokio::test]
async fn test_all_strategies_find_all_solutions() {
    for strategy in [BgpStrategy::Plain, BgpStrategy::Static, BgpStrategy::Dynamic] {
        let server = Arc::new(MockTpfServer::new(START, data()));
        let options = BgpOptions::new(client(&server))
            .with_strategy(strategy)
            .with_chunk_size(2);

        let result = evaluate(friends_bgp(), options).await;

        assert_eq!(result, friends_solutions(), "strategy {strategy}");
    }
}

#[tokio::test]
async fn test_all_heuristics_find_all_solutions() {
    for heuristic in [
        JoinOrderHeuristic::MinUnbound,
        JoinOrderHeuristic::MinUnboundThenMinCardinality,
        JoinOrderHeuristic::MaxBoundThenMinCardinality,
        JoinOrderHeuristic::MinCardinality,
        JoinOrderHeuristic::MaxBoundThenMinUnboundThenMinCardinality,
    ] {
        let server = Arc::new(MockTpfServer::new(START, data()));
        let options = BgpOptions::new(client(&server))
            .with_strategy(BgpStrategy::Static)
            .with_heuristic(heuristic)
            .with_chunk_size(3);

        let result = evaluate(friends_bgp(), options).await;

        assert_eq!(result, friends_solutions(), "heuristic {heuristic}");
    }
}

#[tokio::test]
async fn test_zero_cardinality_skips_evaluation() {
    let server = Arc::new(MockTpfServer::new(START, data()));
    let options = BgpOptions::new(client(&server));
    let bgp = vec![
        TriplePattern::new(var("p"), iri("knows"), var("f")),
        TriplePattern::new(var("p"), iri("unknown"), var("v")),
    ];

    let result = evaluate(bgp, options).await;

    assert!(result.is_empty());
    // The start fragment and one probe per pattern.
    let requests = server.requests();
    assert_eq!(requests.len(), 3, "{requests:?}");
    assert!(requests.iter().all(|url| !url.contains("page=")));
}

#[tokio::test]
async fn test_failing_probe_counts_as_empty() {
    let server = Arc::new(MockTpfServer::new(START, data()).with_failure("ex.org%2Fname", 500));
    let options = BgpOptions::new(client(&server));
    let bgp = vec![
        TriplePattern::new(var("p"), iri("knows"), var("f")),
        TriplePattern::new(var("p"), iri("name"), var("name")),
    ];

    let result = evaluate(bgp, options).await;

    assert!(result.is_empty());
}

#[tokio::test]
async fn test_start_fragment_failure_fails_query() {
    let server = Arc::new(MockTpfServer::new(START, data()).with_failure(START, 500));
    let options = BgpOptions::new(client(&server));

    let result = create_bgp_iterator(single_empty_mapping(), friends_bgp(), options)
        .try_collect::<Vec<_>>()
        .await;

    assert!(matches!(result, Err(QueryError::StartFragment(_))));
}

/// `?p ex:knows ex:alice . ?p ex:name ?name . ?p ex:nick ?nick`
///
/// The nicknames are cheaper than the names, so batches are joined with the nicknames first. The
/// names are then requested per person, unless the probes of a batch request them for the batch.
fn nick_bgp() -> BasicGraphPattern {
    vec![
        TriplePattern::new(var("p"), iri("knows"), iri("alice")),
        TriplePattern::new(var("p"), iri("name"), var("name")),
        TriplePattern::new(var("p"), iri("nick"), var("nick")),
    ]
}

fn restricted_name_requests(server: &MockTpfServer) -> usize {
    server
        .request_parameters()
        .iter()
        .filter(|parameters| {
            parameters.get("predicate").map(String::as_str) == Some("http://ex.org/name")
                && parameters.contains_key("values")
        })
        .count()
}

#[tokio::test]
async fn test_batch_restricted_probes() {
    let server = Arc::new(MockTpfServer::new(START, data()));
    let options = BgpOptions::new(client(&server))
        .with_strategy(BgpStrategy::Dynamic)
        .with_probe_policy(ProbePolicy::BatchRestricted)
        .with_chunk_size(2);

    let result = evaluate(nick_bgp(), options).await;

    assert_eq!(result.len(), 10);
    assert!(restricted_name_requests(&server) > 0);
}

#[tokio::test]
async fn test_unrestricted_probes() {
    let server = Arc::new(MockTpfServer::new(START, data()));
    let options = BgpOptions::new(client(&server))
        .with_strategy(BgpStrategy::Dynamic)
        .with_probe_policy(ProbePolicy::Unrestricted)
        .with_chunk_size(2);

    let result = evaluate(nick_bgp(), options).await;

    assert_eq!(result.len(), 10);
    assert_eq!(restricted_name_requests(&server), 0);
}

#[tokio::test]
async fn test_factory_variants() {
    let server = Arc::new(MockTpfServer::new(START, data()));
    let options = BgpOptions::new(client(&server));

    assert!(matches!(
        create_bgp_iterator(single_empty_mapping(), vec![], options.clone()),
        BgpStream::PassThrough(_)
    ));
    assert!(matches!(
        create_bgp_iterator(
            single_empty_mapping(),
            friends_bgp().into_iter().take(1).collect(),
            options.clone()
        ),
        BgpStream::SinglePattern(_)
    ));
    assert!(matches!(
        create_bgp_iterator(single_empty_mapping(), friends_bgp(), options),
        BgpStream::Pipeline(_)
    ));
}

#[tokio::test]
async fn test_empty_bgp_passes_input_through() {
    let server = Arc::new(MockTpfServer::new(START, data()));
    let options = BgpOptions::new(client(&server));

    let result = evaluate(vec![], options).await;

    assert_eq!(result, vec![SolutionMapping::new()]);
}

#[tokio::test]
async fn test_blank_node_bindings_constrain_joins() {
    let data = vec![
        Triple::new(BlankNode::new_unchecked("b1"), iri("q"), iri("c")),
        Triple::new(BlankNode::new_unchecked("b2"), iri("q"), iri("d")),
        Triple::new(iri("c"), iri("r"), iri("e")),
        Triple::new(iri("d"), iri("r"), iri("f")),
    ];
    let bgp = vec![
        TriplePattern::new(var("y"), iri("q"), var("z")),
        TriplePattern::new(var("z"), iri("r"), var("w")),
    ];
    let binding: SolutionMapping = [(var("y"), Term::from(BlankNode::new_unchecked("b1")))]
        .into_iter()
        .collect();

    for strategy in [BgpStrategy::Plain, BgpStrategy::Static, BgpStrategy::Dynamic] {
        let server = Arc::new(MockTpfServer::new(START, data.clone()));
        let options = BgpOptions::new(client(&server)).with_strategy(strategy);
        let input: SendableMappingStream =
            Box::pin(stream::iter([Ok::<_, QueryError>(binding.clone())]));

        let result = create_bgp_iterator(input, bgp.clone(), options)
            .try_collect::<Vec<_>>()
            .await
            .unwrap();

        assert_eq!(result.len(), 1, "strategy {strategy}");
        assert_eq!(result[0].get(&var("z")), Some(&Term::from(iri("c"))));
        assert_eq!(result[0].get(&var("w")), Some(&Term::from(iri("e"))));
    }
}
