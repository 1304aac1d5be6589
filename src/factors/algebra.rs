// Stateless operations combining factors.

use log::debug;

use crate::{
    errors::{MrfError, Result},
    factors::{
        factor::Factor,
        odometer::{Odometer, Tick},
    },
};

// Returns all of `first` followed by the variables of `second` not already present,
// both in their given order
pub fn union(first: &[usize], second: &[usize]) -> Vec<usize> {
    let mut result = Vec::with_capacity(first.len() + second.len());
    for &variable in first.iter().chain(second) {
        if !result.contains(&variable) {
            result.push(variable);
        }
    }
    result
}

/// Multiplies two factors into a new one over the union of their scopes.
///
/// The union scope goes through [`Factor::new`], so it is stored reversed, and the walk
/// follows the stored order. Indices into both operands are maintained incrementally by
/// the same odometer technique as [`Factor::sum_out`]: a variable absent from an operand
/// has step 0 in it.
pub fn product(first: &Factor, second: &Factor) -> Result<Factor> {
    let domains = first.domains().clone();
    let scope = union(first.scope(), second.scope());
    let size = domains.table_size(&scope)?;

    let mut result = Factor::new(&scope, domains);
    result.initialize_values(size);

    let radices: Vec<usize> = result
        .scope()
        .iter()
        .map(|variable| result.domains().domain_size(*variable))
        .collect();
    let first_steps: Vec<usize> = result
        .scope()
        .iter()
        .map(|variable| first.stride(*variable).step())
        .collect();
    let second_steps: Vec<usize> = result
        .scope()
        .iter()
        .map(|variable| second.stride(*variable).step())
        .collect();

    let mut values = Vec::with_capacity(size);
    let mut odometer = Odometer::new(radices.clone());
    let (mut first_index, mut second_index) = (0, 0);
    for _ in 0..size {
        values.push(first.value_at(first_index) * second.value_at(second_index));
        odometer.advance(|tick| match tick {
            Tick::CarryOver(position) => {
                // Cardinality reached, move both indices back
                first_index -= (radices[position] - 1) * first_steps[position];
                second_index -= (radices[position] - 1) * second_steps[position];
            }
            Tick::Advance(position) => {
                first_index += first_steps[position];
                second_index += second_steps[position];
            }
        });
    }

    result.assign_values(values);
    Ok(result)
}

// Left fold of `product()`; a single factor is returned as is
pub fn product_all(factors: impl IntoIterator<Item = Factor>) -> Result<Factor> {
    let mut factors = factors.into_iter();
    let first = factors.next().ok_or_else(|| {
        MrfError::InvalidOperation("cannot multiply an empty list of factors".to_string())
    })?;
    factors.try_fold(first, |accumulated, factor| {
        debug!(
            "Multiplying factor over {:?} into factor over {:?}",
            factor.scope(),
            accumulated.scope()
        );
        product(&accumulated, &factor)
    })
}

// Mean absolute difference between entries at matching positions
pub fn message_difference(first: &Factor, second: &Factor) -> f64 {
    if first.size() == 0 {
        return 0.;
    }
    let total: f64 = first
        .values()
        .iter()
        .zip(second.values().iter())
        .map(|(a, b)| (a - b).abs())
        .sum();
    total / first.size() as f64
}
