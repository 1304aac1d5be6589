use std::collections::{BTreeMap, VecDeque};

use bitvec::{order::LocalBits, vec::BitVec};
use log::debug;

use crate::{factors::algebra::union, network::markov_network::MarkovNetwork};

// Strategy choosing which variable the elimination engine removes next
pub trait EliminationOrdering {
    // Returns the next variable to eliminate, or `None` once the ordering is exhausted
    fn next_variable(&mut self, network: &MarkovNetwork) -> Option<usize>;
}

/// Min-neighbors ordering computed once from the neighbor map of the network as it was built.
///
/// The counts are never refreshed while variables are eliminated. Ties go to the smallest
/// variable index. Variables that belong to no factor are never proposed.
#[derive(Clone, Debug, Default)]
pub struct StaticMinNeighbors {
    remaining: BitVec<usize, LocalBits>,
    neighbor_counts: Vec<usize>,
}

impl StaticMinNeighbors {
    pub fn new(num_variables: usize, neighbors: &BTreeMap<usize, Vec<usize>>) -> Self {
        let mut remaining = BitVec::<usize, LocalBits>::repeat(false, num_variables);
        let mut neighbor_counts = vec![0; num_variables];
        for (&variable, variable_neighbors) in neighbors {
            remaining.set(variable, true);
            neighbor_counts[variable] = variable_neighbors.len();
        }
        StaticMinNeighbors {
            remaining,
            neighbor_counts,
        }
    }

    pub fn from_network(network: &MarkovNetwork) -> Self {
        StaticMinNeighbors::new(network.num_variables(), network.neighbor_map())
    }
}

impl EliminationOrdering for StaticMinNeighbors {
    fn next_variable(&mut self, _network: &MarkovNetwork) -> Option<usize> {
        let variable = self
            .remaining
            .iter_ones()
            .min_by_key(|variable| self.neighbor_counts[*variable])?;
        self.remaining.set(variable, false);
        debug!(
            "Static min-neighbors picked variable {} with {} neighbors",
            variable, self.neighbor_counts[variable]
        );
        Some(variable)
    }
}

/// Min-neighbors ordering recomputed from the factors currently in the network at every step.
#[derive(Clone, Debug)]
pub struct DynamicMinNeighbors {
    remaining: BitVec<usize, LocalBits>,
}

impl DynamicMinNeighbors {
    pub fn from_network(network: &MarkovNetwork) -> Self {
        let mut remaining = BitVec::<usize, LocalBits>::repeat(false, network.num_variables());
        for variable in network.neighbor_map().keys() {
            remaining.set(*variable, true);
        }
        DynamicMinNeighbors { remaining }
    }

    // Counts the variables sharing a current factor with `variable`, itself included
    fn current_neighbor_count(network: &MarkovNetwork, variable: usize) -> usize {
        network
            .factors()
            .iter()
            .filter(|(_, factor)| factor.in_scope(variable))
            .fold(Vec::new(), |neighbors, (_, factor)| {
                union(&neighbors, factor.scope())
            })
            .len()
    }
}

impl EliminationOrdering for DynamicMinNeighbors {
    fn next_variable(&mut self, network: &MarkovNetwork) -> Option<usize> {
        let variable = self
            .remaining
            .iter_ones()
            .min_by_key(|variable| Self::current_neighbor_count(network, *variable))?;
        self.remaining.set(variable, false);
        debug!("Dynamic min-neighbors picked variable {}", variable);
        Some(variable)
    }
}

// Caller-supplied elimination sequence
#[derive(Clone, Debug)]
pub struct ExplicitOrder {
    sequence: VecDeque<usize>,
}

impl ExplicitOrder {
    pub fn new(sequence: impl IntoIterator<Item = usize>) -> Self {
        ExplicitOrder {
            sequence: sequence.into_iter().collect(),
        }
    }
}

impl EliminationOrdering for ExplicitOrder {
    fn next_variable(&mut self, _network: &MarkovNetwork) -> Option<usize> {
        self.sequence.pop_front()
    }
}
