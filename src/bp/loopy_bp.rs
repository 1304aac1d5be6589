use std::time::Instant;

use log::{debug, info, warn};

use crate::{
    bp::{factor_graph::FactorGraph, messages::Messages, options::BpOptions},
    errors::{MrfError, Result},
    factors::{
        algebra::{message_difference, product, product_all},
        factor::Factor,
    },
    network::markov_network::MarkovNetwork,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BpState {
    Initializing,
    Iterating,
    Converged,
    IterationCapReached,
}

impl BpState {
    pub fn is_finished(&self) -> bool {
        matches!(self, BpState::Converged | BpState::IterationCapReached)
    }
}

// Result of a belief propagation run
#[derive(Debug)]
pub struct BpOutcome {
    pub marginals: Vec<Factor>, // indexed by variable, each normalized to sum 1
    pub iterations: usize,
    pub state: BpState,
}

impl BpOutcome {
    pub fn converged(&self) -> bool {
        self.state == BpState::Converged
    }
}

/// Loopy sum-product belief propagation over the factor graph of a network.
///
/// Every iteration sends all variable-to-factor messages, then all factor-to-variable
/// messages, max-normalizes the latter and compares them with the previous iteration's.
/// The run ends once no message moved by more than the convergence threshold, or once the
/// iteration count exceeds the cap; either way marginals are produced.
pub struct LoopyBeliefPropagation<'a> {
    network: &'a MarkovNetwork,
    graph: FactorGraph,
    messages: Messages,
    state: BpState,
    iteration: usize,
}

impl<'a> LoopyBeliefPropagation<'a> {
    pub fn init(network: &'a MarkovNetwork) -> Self {
        let graph = FactorGraph::new(network);
        let messages = Messages::new(graph.edge_count());
        LoopyBeliefPropagation {
            network,
            graph,
            messages,
            state: BpState::Initializing,
            iteration: 0,
        }
    }

    pub fn state(&self) -> BpState {
        self.state
    }

    pub fn iterations(&self) -> usize {
        self.iteration
    }

    // Every variable sends to each of its factors the product of a uniform message
    // and the messages it received from all its other factors
    fn send_variable_messages(&mut self, initial_value: f64) -> Result<()> {
        let domains = self.network.domains();
        for variable in self.network.variables() {
            let inbox = self.graph.variable_inbox(variable);
            for &outgoing in inbox {
                let mut message = Factor::uniform(variable, domains.clone(), initial_value);
                for &incoming in inbox.iter().filter(|incoming| **incoming != outgoing) {
                    if let Some(received) = self.messages.to_variable(incoming) {
                        message = product(&message, received)?;
                    }
                }
                self.messages.send_to_factor(outgoing, message);
            }
        }
        Ok(())
    }

    // Every factor sends to each variable in its scope its own table multiplied by the messages
    // from all other variables, with everything but the target variable summed out
    fn send_factor_messages(&mut self) -> Result<()> {
        for (position, &handle) in self.graph.factors().iter().enumerate() {
            let factor = self.network.factor(handle).ok_or_else(|| {
                MrfError::InvalidOperation(format!("factor {:?} left the network", handle))
            })?;

            for &outgoing in self.graph.factor_outbox(position) {
                let target = self.graph.link(outgoing).variable;
                let mut message = factor.clone();
                for &incoming in self.graph.factor_inbox(position) {
                    if self.graph.link(incoming).variable == target {
                        continue;
                    }
                    if let Some(received) = self.messages.to_factor(incoming) {
                        message = product(&message, received)?;
                    }
                }
                for other in message.scope().to_vec() {
                    if other != target {
                        message.sum_out(other);
                    }
                }
                self.messages.send_to_variable(outgoing, message);
            }
        }
        Ok(())
    }

    // Compares every variable's inbox with the baseline, position by position
    fn messages_changed(&self, threshold: f64) -> bool {
        let mut changed = false;
        for variable in self.network.variables() {
            for &edge in self.graph.variable_inbox(variable) {
                let current = self.messages.to_variable(edge);
                let difference = match (current, self.messages.baseline(edge)) {
                    (Some(current), Some(previous)) => message_difference(current, previous),
                    _ => f64::INFINITY,
                };
                if difference > threshold {
                    debug!(
                        "Message to variable {} along edge {} changed by {}",
                        variable,
                        edge.index(),
                        difference
                    );
                    changed = true;
                }
            }
        }
        changed
    }

    // Runs one full iteration and returns the resulting state
    pub fn iterate(&mut self, options: &BpOptions) -> Result<BpState> {
        if self.state == BpState::Initializing {
            self.state = BpState::Iterating;
        }
        debug!("Starting iteration {}", self.iteration);

        self.send_variable_messages(options.initial_message_value())?;
        self.messages.clear_variable_inboxes();
        self.send_factor_messages()?;
        self.messages.normalize_variable_inboxes();

        let converged = match self.iteration {
            0 => false,
            _ => !self.messages_changed(options.convergence_threshold()),
        };
        self.messages.record_baseline();
        self.messages.clear_factor_inboxes();
        self.iteration += 1;

        // The cap wins over convergence detected on the same iteration
        if self.iteration > options.max_iterations() {
            warn!(
                "Exceeded {} iterations... breaking and calculating marginals.",
                options.max_iterations()
            );
            self.state = BpState::IterationCapReached;
        } else if converged {
            self.state = BpState::Converged;
        }
        Ok(self.state)
    }

    // Iterates until convergence or the iteration cap, then computes all marginals
    pub fn run(&mut self, options: &BpOptions) -> Result<BpOutcome> {
        let time_start = Instant::now();
        while !self.state.is_finished() {
            self.iterate(options)?;
        }
        info!(
            "Belief propagation stopped in state {:?} after {} iterations. Elapsed time {:?}.",
            self.state,
            self.iteration,
            time_start.elapsed()
        );

        Ok(BpOutcome {
            marginals: self.marginals()?,
            iterations: self.iteration,
            state: self.state,
        })
    }

    // Multiplies the messages a variable currently holds and normalizes the product to sum 1.
    // A variable without factors gets the uniform distribution.
    pub fn marginal(&self, variable: usize) -> Result<Factor> {
        let received: Vec<Factor> = self
            .graph
            .variable_inbox(variable)
            .iter()
            .filter_map(|edge| self.messages.to_variable(*edge).cloned())
            .collect();
        if received.is_empty() {
            let domain_size = self.network.domain_size(variable);
            return Ok(Factor::uniform(
                variable,
                self.network.domains().clone(),
                1. / domain_size as f64,
            ));
        }

        let mut marginal = product_all(received)?;
        marginal.normalize();
        Ok(marginal)
    }

    pub fn marginals(&self) -> Result<Vec<Factor>> {
        self.network
            .variables()
            .map(|variable| self.marginal(variable))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;
    use crate::network::markov_network::{NetworkDescription, RawFactor};

    fn construct_network(
        domain_sizes: Vec<usize>,
        factors: Vec<(Vec<usize>, Vec<f64>)>,
    ) -> MarkovNetwork {
        MarkovNetwork::from_description(NetworkDescription {
            domain_sizes,
            factors: factors
                .into_iter()
                .map(|(scope, values)| RawFactor { scope, values })
                .collect(),
        })
        .unwrap()
    }

    fn construct_random_tree(seed: u64) -> MarkovNetwork {
        let mut rng = StdRng::seed_from_u64(seed);
        let domain_sizes = vec![2, 3, 2, 2, 3];
        // star around variable 1 with a leaf hanging off variable 3, plus unary terms
        let scopes = vec![vec![0, 1], vec![1, 2], vec![3, 1], vec![3, 4], vec![0], vec![4]];
        let factors = scopes
            .into_iter()
            .map(|scope| {
                let size: usize = scope.iter().map(|v| domain_sizes[*v]).product();
                let values = (0..size).map(|_| rng.gen_range(0.2..3.0)).collect();
                (scope, values)
            })
            .collect();
        construct_network(domain_sizes, factors)
    }

    fn assert_marginals_close(network: &MarkovNetwork, outcome: &BpOutcome, tolerance: f64) {
        for variable in network.variables() {
            let exact = network.exact_marginal(variable).unwrap();
            let approximate = &outcome.marginals[variable];
            for state in 0..network.domain_size(variable) {
                assert!(
                    (exact.value_at(state) - approximate.value_at(state)).abs() < tolerance,
                    "variable {} state {}: {} vs {}",
                    variable,
                    state,
                    exact.value_at(state),
                    approximate.value_at(state)
                );
            }
        }
    }

    #[test]
    fn single_factor_converges_to_table_marginals() {
        let network = construct_network(vec![2, 2], vec![(vec![0, 1], vec![1., 2., 3., 4.])]);
        let mut bp = LoopyBeliefPropagation::init(&network);
        assert_eq!(bp.state(), BpState::Initializing);
        let outcome = bp.run(&BpOptions::default()).unwrap();

        assert!(outcome.converged());
        assert_eq!(outcome.iterations, 2);
        let expected = [vec![0.3, 0.7], vec![0.4, 0.6]];
        for (marginal, expected) in outcome.marginals.iter().zip(expected.iter()) {
            for (value, expected) in marginal.values().iter().zip(expected) {
                assert!((value - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn first_iteration_never_converges() {
        let network = construct_network(vec![2], vec![(vec![0], vec![1., 1.])]);
        let mut bp = LoopyBeliefPropagation::init(&network);
        let options = BpOptions::default();
        assert_eq!(bp.iterate(&options).unwrap(), BpState::Iterating);
        assert_eq!(bp.iterate(&options).unwrap(), BpState::Converged);
    }

    #[test]
    fn chain_matches_exact_marginals() {
        let network = construct_network(
            vec![2, 3, 2],
            vec![
                (vec![0, 1], vec![1., 2., 3., 4., 5., 6.]),
                (vec![1, 2], vec![2., 1., 1., 3., 4., 1.]),
            ],
        );
        let outcome = LoopyBeliefPropagation::init(&network)
            .run(&BpOptions::default())
            .unwrap();
        assert!(outcome.converged());
        assert_marginals_close(&network, &outcome, 1e-6);
    }

    #[test]
    fn trees_match_exact_marginals() {
        for seed in 0..5 {
            let network = construct_random_tree(seed);
            let outcome = LoopyBeliefPropagation::init(&network)
                .run(&BpOptions::default())
                .unwrap();
            assert!(outcome.converged());
            assert_marginals_close(&network, &outcome, 1e-6);
        }
    }

    #[test]
    fn loopy_network_yields_distributions() {
        let network = construct_network(
            vec![2, 2, 2],
            vec![
                (vec![0, 1], vec![2., 1., 1., 2.]),
                (vec![1, 2], vec![2., 1., 1., 2.]),
                (vec![2, 0], vec![2., 1., 1., 2.]),
                (vec![0], vec![1., 3.]),
            ],
        );
        let outcome = LoopyBeliefPropagation::init(&network)
            .run(&BpOptions::default())
            .unwrap();
        for marginal in &outcome.marginals {
            assert!((marginal.sum() - 1.).abs() < 1e-12);
            assert!(marginal.values().iter().all(|value| *value >= 0.));
        }
        // the unary term favors state 1 of variable 0
        assert!(outcome.marginals[0].value_at(1) > outcome.marginals[0].value_at(0));
    }

    #[test]
    fn iteration_cap_stops_the_run() {
        let network = construct_network(
            vec![2, 2, 2],
            vec![
                (vec![0, 1], vec![5., 1., 1., 5.]),
                (vec![1, 2], vec![5., 1., 1., 5.]),
                (vec![2, 0], vec![5., 1., 1., 5.]),
                (vec![0], vec![1., 3.]),
            ],
        );
        let mut options = BpOptions::default();
        options.set_max_iterations(1).set_convergence_threshold(0.);
        let mut bp = LoopyBeliefPropagation::init(&network);
        let outcome = bp.run(&options).unwrap();
        assert_eq!(outcome.state, BpState::IterationCapReached);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.marginals.len(), 3);
    }

    #[test]
    fn iteration_cap_wins_over_convergence() {
        let network = construct_network(vec![2, 2], vec![(vec![0, 1], vec![1., 2., 3., 4.])]);
        let mut options = BpOptions::default();
        options.set_max_iterations(1);
        let mut bp = LoopyBeliefPropagation::init(&network);
        // the messages of the second iteration repeat the first, and that iteration
        // also pushes the count past the cap
        assert_eq!(bp.iterate(&options).unwrap(), BpState::Iterating);
        assert_eq!(bp.iterate(&options).unwrap(), BpState::IterationCapReached);
        assert_eq!(bp.iterations(), 2);
    }

    #[test]
    fn isolated_variable_gets_uniform_marginal() {
        let network = construct_network(vec![2, 4], vec![(vec![0], vec![1., 3.])]);
        let outcome = LoopyBeliefPropagation::init(&network)
            .run(&BpOptions::default())
            .unwrap();
        assert_eq!(outcome.marginals[1].values().to_vec(), vec![0.25; 4]);
        assert!((outcome.marginals[0].value_at(0) - 0.25).abs() < 1e-12);
        assert!((outcome.marginals[0].value_at(1) - 0.75).abs() < 1e-12);
    }
}
