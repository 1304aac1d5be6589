use mrf_inference::{
    bp::{
        loopy_bp::{BpState, LoopyBeliefPropagation},
        options::BpOptions,
    },
    errors::MrfError,
    io::{
        output::{MarginalWriter, ResultSink},
        uai::{read_uai, write_uai},
    },
    network::markov_network::MarkovNetwork,
};

const TWO_VARIABLES: &str = "MARKOV
2
2 2
1
2 0 1
4
1 2 3 4
";

const CHAIN: &str = "MARKOV
3
2 3 2
3
2 0 1
2 1 2
1 2

6
 1.0 2.0 3.0
 4.0 5.0 6.0

6
 2.0 1.0
 1.0 3.0
 4.0 1.0

2
 0.3 0.7
";

fn load(input: &str) -> MarkovNetwork {
    MarkovNetwork::from_description(read_uai(input.as_bytes()).unwrap()).unwrap()
}

#[test]
fn elimination_of_two_variable_network() {
    let mut network = load(TWO_VARIABLES);
    network.eliminate(1).unwrap();
    network.eliminate(0).unwrap();
    assert_eq!(network.full_joint_sum().unwrap(), 10.);
    assert_eq!(load(TWO_VARIABLES).partition_function().unwrap(), 10.);
}

#[test]
fn belief_propagation_on_two_variable_network() {
    let network = load(TWO_VARIABLES);
    let outcome = LoopyBeliefPropagation::init(&network)
        .run(&BpOptions::default())
        .unwrap();
    assert!(outcome.converged());
    assert!(outcome.iterations <= 5);

    let expected = [[0.3, 0.7], [0.4, 0.6]];
    for (marginal, expected) in outcome.marginals.iter().zip(expected) {
        for (state, expected) in expected.iter().enumerate() {
            assert!((marginal.value_at(state) - expected).abs() < 1e-12);
        }
    }
}

#[test]
fn belief_propagation_on_chain_matches_elimination() {
    let network = load(CHAIN);
    let outcome = LoopyBeliefPropagation::init(&network)
        .run(&BpOptions::default())
        .unwrap();
    assert_eq!(outcome.state, BpState::Converged);

    for variable in network.variables() {
        let exact = network.exact_marginal(variable).unwrap();
        for state in 0..network.domain_size(variable) {
            assert!(
                (outcome.marginals[variable].value_at(state) - exact.value_at(state)).abs() < 1e-6
            );
        }
    }

    let mut sink = MarginalWriter::new(Vec::new(), 100);
    sink.report_marginals(&outcome).unwrap();
    let text = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(text.lines().count(), 3);
    assert_eq!(text.lines().nth(1).unwrap().split_whitespace().count(), 3);
}

#[test]
fn truncated_domain_sizes_are_malformed() {
    let input = "MARKOV\n3\n2 2\n1\n2 0 1\n4\n1 2 3 4\n";
    match read_uai(input.as_bytes()) {
        Err(MrfError::MalformedInput { line, .. }) => assert_eq!(line, 3),
        other => panic!("expected malformed input error, got {:?}", other),
    }
}

#[test]
fn written_chain_keeps_partition_function() {
    let network = load(CHAIN);
    let mut buffer = Vec::new();
    write_uai(&network, &mut buffer).unwrap();
    let reread = MarkovNetwork::from_description(read_uai(buffer.as_slice()).unwrap()).unwrap();

    let expected = network.full_joint_sum().unwrap();
    let actual = reread.partition_function().unwrap();
    assert!((actual - expected).abs() <= 1e-9 * expected);
}
