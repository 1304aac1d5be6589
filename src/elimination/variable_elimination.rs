// Exact inference by variable elimination. The factor collection of the network is consumed
// destructively; use the `&self` helpers (which work on a copy) to keep the original.

use std::mem;

use log::debug;

use crate::{
    elimination::ordering::{EliminationOrdering, StaticMinNeighbors},
    errors::Result,
    factors::{
        algebra::{product, product_all},
        factor::Factor,
    },
    network::markov_network::MarkovNetwork,
};

// Value of `full_joint_sum()` for a network without factors
pub const NO_FACTORS_SENTINEL: f64 = -1.;

impl MarkovNetwork {
    // Multiplies all current factors into the full joint table
    pub fn full_joint_distribution(&self) -> Result<Factor> {
        product_all(self.factors().iter().map(|(_, factor)| factor.clone()))
    }

    /// Sums the product of all current factors (the brute-force partition function).
    ///
    /// Returns [`NO_FACTORS_SENTINEL`] when there are no factors, and the lone factor's own
    /// sum when there is exactly one.
    pub fn full_joint_sum(&self) -> Result<f64> {
        let mut factors = self.factors().iter().map(|(_, factor)| factor);
        let Some(first) = factors.next() else {
            return Ok(NO_FACTORS_SENTINEL);
        };
        let joint = factors.try_fold(first.clone(), |joint, factor| product(&joint, factor))?;
        Ok(joint.sum())
    }

    /// Eliminates one variable: removes every factor mentioning it, multiplies them,
    /// sums the variable out and adds the result back. No-op if no factor mentions it.
    pub fn eliminate(&mut self, variable: usize) -> Result<()> {
        let targets = self.factors().handles_containing(variable);
        if targets.is_empty() {
            debug!("Variable {} is in no factor, nothing to eliminate", variable);
            return Ok(());
        }
        debug!(
            "Eliminating variable {} from {} factors",
            variable,
            targets.len()
        );

        let removed: Vec<Factor> = targets
            .into_iter()
            .filter_map(|handle| self.factors_mut().remove(handle))
            .collect();
        let mut reduced = product_all(removed)?;
        reduced.sum_out(variable);
        self.factors_mut().insert(reduced);
        Ok(())
    }

    pub fn eliminate_in_order(&mut self, variables: &[usize]) -> Result<()> {
        for &variable in variables {
            self.eliminate(variable)?;
        }
        Ok(())
    }

    // Eliminates the variable proposed by `ordering` and returns it
    pub fn eliminate_next(
        &mut self,
        ordering: &mut impl EliminationOrdering,
    ) -> Result<Option<usize>> {
        let Some(variable) = ordering.next_variable(self) else {
            return Ok(None);
        };
        self.eliminate(variable)?;
        Ok(Some(variable))
    }

    /// Eliminates the remaining variable with the fewest neighbors in the construction-time
    /// neighbor map. Returns `None` once every variable that had a factor is gone.
    pub fn eliminate_min_neighbor(&mut self) -> Result<Option<usize>> {
        let mut ordering = mem::take(self.min_neighbors_mut());
        let eliminated = self.eliminate_next(&mut ordering);
        *self.min_neighbors_mut() = ordering;
        eliminated
    }

    // Eliminates variables until `ordering` is exhausted and returns the partition function
    // of what is left
    pub fn eliminate_all(&mut self, ordering: &mut impl EliminationOrdering) -> Result<f64> {
        while self.eliminate_next(ordering)?.is_some() {}
        self.full_joint_sum()
    }

    // Computes the partition function by eliminating a copy of this network
    // in static min-neighbors order
    pub fn partition_function(&self) -> Result<f64> {
        let mut network = self.clone();
        let mut ordering = StaticMinNeighbors::from_network(self);
        network.eliminate_all(&mut ordering)
    }

    // Computes the exact marginal distribution of a variable on a copy of this network
    pub fn exact_marginal(&self, variable: usize) -> Result<Factor> {
        if self.factors().handles_containing(variable).is_empty() {
            let domain_size = self.domain_size(variable);
            return Ok(Factor::uniform(
                variable,
                self.domains().clone(),
                1. / domain_size as f64,
            ));
        }

        let mut network = self.clone();
        let others: Vec<usize> = self.variables().filter(|other| *other != variable).collect();
        network.eliminate_in_order(&others)?;

        let mut marginal =
            product_all(network.factors().iter().map(|(_, factor)| factor.clone()))?;
        marginal.normalize();
        Ok(marginal)
    }
}
