use std::collections::BTreeMap;

use log::debug;

use crate::{
    data_structures::factor_arena::{FactorArena, FactorHandle},
    elimination::ordering::StaticMinNeighbors,
    errors::{MrfError, Result},
    factors::{algebra::union, domains::Domains, factor::Factor},
};

// Factor as delivered by a loader: scope in file order and values in flat order
#[derive(Clone, Debug, PartialEq)]
pub struct RawFactor {
    pub scope: Vec<usize>,
    pub values: Vec<f64>,
}

// In-memory form of a network definition, before any factor is built
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NetworkDescription {
    pub domain_sizes: Vec<usize>,
    pub factors: Vec<RawFactor>,
}

// Stores a Markov network: variables with their domain sizes, the current collection of factors,
// and the neighbor map computed once at construction time
#[derive(Clone, Debug)]
pub struct MarkovNetwork {
    domains: Domains,
    factors: FactorArena,
    neighbors: BTreeMap<usize, Vec<usize>>, // variable -> union of scopes of factors containing it
    min_neighbors: StaticMinNeighbors,       // ordering state for `eliminate_min_neighbor()`
}

impl MarkovNetwork {
    // Creates a network from already built factors
    pub fn new(domains: Domains, factors: Vec<Factor>) -> Self {
        let factors: FactorArena = factors.into_iter().collect();

        let mut neighbors: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (_, factor) in factors.iter() {
            for &variable in factor.scope() {
                neighbors
                    .entry(variable)
                    .and_modify(|current| *current = union(current, factor.scope()))
                    .or_insert_with(|| factor.scope().to_vec());
            }
        }
        debug!("Computed neighbor map {:?}", neighbors);

        let min_neighbors = StaticMinNeighbors::new(domains.num_variables(), &neighbors);

        MarkovNetwork {
            domains,
            factors,
            neighbors,
            min_neighbors,
        }
    }

    // Builds factors from a loader's description and creates the network
    pub fn from_description(description: NetworkDescription) -> Result<Self> {
        let domains = Domains::new(description.domain_sizes)?;
        for (index, raw) in description.factors.iter().enumerate() {
            check_scope(index, &raw.scope, domains.num_variables())?;
        }
        let factors = description
            .factors
            .into_iter()
            .map(|raw| Factor::from_values(&raw.scope, domains.clone(), raw.values))
            .collect::<Result<Vec<_>>>()?;
        Ok(MarkovNetwork::new(domains, factors))
    }

    pub fn domains(&self) -> &Domains {
        &self.domains
    }

    pub fn num_variables(&self) -> usize {
        self.domains.num_variables()
    }

    pub fn domain_size(&self, variable: usize) -> usize {
        self.domains.domain_size(variable)
    }

    pub fn variables(&self) -> impl Iterator<Item = usize> {
        0..self.num_variables()
    }

    pub fn factors(&self) -> &FactorArena {
        &self.factors
    }

    pub(crate) fn factors_mut(&mut self) -> &mut FactorArena {
        &mut self.factors
    }

    pub fn factor(&self, handle: FactorHandle) -> Option<&Factor> {
        self.factors.get(handle)
    }

    pub fn num_factors(&self) -> usize {
        self.factors.len()
    }

    // Returns the neighbors a variable had when the network was built.
    // Not updated by elimination.
    pub fn neighbors(&self, variable: usize) -> Option<&[usize]> {
        self.neighbors.get(&variable).map(Vec::as_slice)
    }

    pub fn neighbor_map(&self) -> &BTreeMap<usize, Vec<usize>> {
        &self.neighbors
    }

    pub(crate) fn min_neighbors_mut(&mut self) -> &mut StaticMinNeighbors {
        &mut self.min_neighbors
    }
}

// Rejects scopes naming unknown variables or naming a variable twice
fn check_scope(factor: usize, scope: &[usize], num_variables: usize) -> Result<()> {
    for (position, variable) in scope.iter().enumerate() {
        if *variable >= num_variables {
            return Err(MrfError::InvalidOperation(format!(
                "factor {} refers to unknown variable {}",
                factor, variable
            )));
        }
        if scope[..position].contains(variable) {
            return Err(MrfError::InvalidOperation(format!(
                "factor {} repeats variable {} in its scope",
                factor, variable
            )));
        }
    }
    Ok(())
}
