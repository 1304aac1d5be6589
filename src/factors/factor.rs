use std::fmt::{self, Display};

use log::debug;
use ndarray::Array1;

use crate::{
    errors::{MrfError, Result},
    factors::{
        domains::Domains,
        odometer::{Odometer, Tick},
    },
    io::uai::vec_to_string,
};

/// Result of looking up a variable's stride.
///
/// `Absent` means the variable was never part of the table. `Pinned` only appears inside
/// a marginalization walk, for the variable being summed out: its digit still moves, but
/// it must not move the output index. Both step by 0, yet they are not interchangeable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stride {
    Absent,
    Pinned,
    Present(usize),
}

impl Stride {
    // Offset this stride contributes when its digit moves by one
    pub fn step(self) -> usize {
        match self {
            Stride::Present(stride) => stride,
            Stride::Pinned | Stride::Absent => 0,
        }
    }
}

/// Potential table over an ordered set of discrete variables.
///
/// The scope is stored in the reverse of the order it was supplied in, and strides follow
/// the stored order: the first stored variable has stride 1 and every next one has the
/// previous stride times the previous domain size. Values are laid out accordingly.
#[derive(Clone, Debug)]
pub struct Factor {
    scope: Vec<usize>,
    strides: Vec<(usize, usize)>, // (variable, stride), same order as `scope`
    values: Array1<f64>,
    filled: usize, // number of values supplied so far through `set_values()`
    domains: Domains,
}

// Computes strides over a scope in its stored order
fn compute_strides(scope: &[usize], domains: &Domains) -> Vec<(usize, usize)> {
    let mut strides = Vec::with_capacity(scope.len());
    let mut stride = 1;
    for &variable in scope {
        strides.push((variable, stride));
        stride *= domains.domain_size(variable);
    }
    strides
}

fn stride_in(strides: &[(usize, usize)], variable: usize) -> Stride {
    strides
        .iter()
        .find(|(scope_variable, _)| *scope_variable == variable)
        .map_or(Stride::Absent, |(_, stride)| Stride::Present(*stride))
}

impl Factor {
    // Creates a factor without values; the scope is stored reversed.
    // Variables in `scope` are expected to be distinct.
    pub fn new(scope: &[usize], domains: Domains) -> Self {
        Factor {
            scope: scope.iter().rev().copied().collect(),
            strides: Vec::new(),
            values: Array1::zeros(0),
            filled: 0,
            domains,
        }
    }

    // Creates a factor and fills it with values given in flat (odometer) order
    pub fn from_values(scope: &[usize], domains: Domains, values: Vec<f64>) -> Result<Self> {
        let expected = domains.table_size(scope)?;
        if values.len() != expected {
            return Err(MrfError::ShapeMismatch {
                expected,
                got: values.len(),
            });
        }
        let mut factor = Factor::new(scope, domains);
        factor.initialize_values(expected);
        factor.assign_values(values);
        Ok(factor)
    }

    // Creates a single-variable factor with every entry set to `value`
    pub fn uniform(variable: usize, domains: Domains, value: f64) -> Self {
        let domain_size = domains.domain_size(variable);
        let mut factor = Factor::new(&[variable], domains);
        factor.initialize_values(domain_size);
        factor.assign_values(vec![value; domain_size]);
        factor
    }

    // Allocates a zeroed value table of given length and computes strides
    pub fn initialize_values(&mut self, len: usize) {
        self.values = Array1::zeros(len);
        self.filled = 0;
        self.strides = compute_strides(&self.scope, &self.domains);
    }

    // Appends values after the ones supplied by earlier calls
    pub fn set_values(&mut self, values: &[f64]) -> Result<()> {
        let end = self.filled + values.len();
        if end > self.values.len() {
            return Err(MrfError::ShapeMismatch {
                expected: self.values.len(),
                got: end,
            });
        }
        for (slot, value) in self.values.iter_mut().skip(self.filled).zip(values) {
            *slot = *value;
        }
        self.filled = end;
        Ok(())
    }

    // Replaces the whole table; `values` must already match the allocated length
    pub(crate) fn assign_values(&mut self, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.values.len());
        self.filled = values.len();
        self.values = Array1::from(values);
    }

    pub fn value_at(&self, index: usize) -> f64 {
        self.values[index]
    }

    // Looks up the value of a full assignment, indexed by variable
    pub fn value_for(&self, assignment: &[usize]) -> f64 {
        let index: usize = self
            .strides
            .iter()
            .map(|(variable, stride)| assignment[*variable] * stride)
            .sum();
        self.values[index]
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn scope(&self) -> &[usize] {
        &self.scope
    }

    // Returns the scope in the order it was originally supplied
    pub fn supplied_scope(&self) -> Vec<usize> {
        self.scope.iter().rev().copied().collect()
    }

    pub fn strides(&self) -> &[(usize, usize)] {
        &self.strides
    }

    pub fn stride(&self, variable: usize) -> Stride {
        stride_in(&self.strides, variable)
    }

    pub fn in_scope(&self, variable: usize) -> bool {
        self.scope.contains(&variable)
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn domains(&self) -> &Domains {
        &self.domains
    }

    pub fn sum(&self) -> f64 {
        self.values.sum()
    }

    /// Divides every entry by the largest one.
    ///
    /// Keeps message magnitudes in range during belief propagation. This is not
    /// probability normalization; see [`Factor::normalize`] for that.
    pub fn normalize_by_max(&mut self) {
        let max = self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if max > 0. {
            self.values.mapv_inplace(|value| value / max);
        } else {
            debug!("Skipped max-normalization of a table with maximum {}", max);
        }
    }

    /// Divides every entry by the sum of all entries and returns that sum.
    pub fn normalize(&mut self) -> f64 {
        let total = self.sum();
        if total > 0. {
            self.values.mapv_inplace(|value| value / total);
        } else {
            debug!("Skipped normalization of a table with total {}", total);
        }
        total
    }

    /// Marginalizes `variable` out of this factor in place. No-op if it is not in scope.
    ///
    /// Walks every original flat index once, keeping the output index up to date with
    /// an odometer over the original scope. The summed-out variable is pinned to stride 0,
    /// so all of its states fall onto the same output cell.
    pub fn sum_out(&mut self, variable: usize) {
        if !self.in_scope(variable) {
            return;
        }

        let new_size = self.size() / self.domains.domain_size(variable);
        let new_scope: Vec<usize> = self
            .scope
            .iter()
            .copied()
            .filter(|scope_variable| *scope_variable != variable)
            .collect();
        let new_strides = compute_strides(&new_scope, &self.domains);

        let radices: Vec<usize> = self
            .scope
            .iter()
            .map(|scope_variable| self.domains.domain_size(*scope_variable))
            .collect();
        let walk_strides: Vec<Stride> = self
            .scope
            .iter()
            .map(|&scope_variable| match scope_variable == variable {
                true => Stride::Pinned,
                false => stride_in(&new_strides, scope_variable),
            })
            .collect();

        let mut summed: Array1<f64> = Array1::zeros(new_size);
        let mut odometer = Odometer::new(radices.clone());
        let mut index = 0;
        for value in self.values.iter() {
            summed[index] += *value;
            odometer.advance(|tick| match tick {
                Tick::CarryOver(position) => {
                    index -= (radices[position] - 1) * walk_strides[position].step()
                }
                Tick::Advance(position) => index += walk_strides[position].step(),
            });
        }

        self.scope = new_scope;
        self.strides = new_strides;
        self.filled = new_size;
        self.values = summed;
    }
}

impl Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", vec_to_string(&self.values.to_vec()))
    }
}
