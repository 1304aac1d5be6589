use std::rc::Rc;

use crate::errors::{MrfError, Result};

// Shared, immutable table of domain sizes indexed by variable.
// Every factor of a network holds a handle to the same table.
#[derive(Clone, Debug, PartialEq)]
pub struct Domains {
    domain_sizes: Rc<[usize]>,
}

impl Domains {
    // Creates the table, rejecting empty domains
    pub fn new(domain_sizes: Vec<usize>) -> Result<Self> {
        if let Some((variable, &domain_size)) = domain_sizes
            .iter()
            .enumerate()
            .find(|(_, domain_size)| **domain_size == 0)
        {
            return Err(MrfError::InvalidDomain {
                variable,
                domain_size,
            });
        }
        Ok(Domains {
            domain_sizes: domain_sizes.into(),
        })
    }

    // Returns the domain size of a variable
    pub fn domain_size(&self, variable: usize) -> usize {
        self.domain_sizes[variable]
    }

    // Returns the number of variables
    pub fn num_variables(&self) -> usize {
        self.domain_sizes.len()
    }

    // Computes the product of domain sizes of given variables, or `None` on overflow
    pub fn product_domain_sizes(&self, variables: &[usize]) -> Option<usize> {
        variables
            .iter()
            .try_fold(1usize, |size, variable| size.checked_mul(self.domain_size(*variable)))
    }

    // Like `product_domain_sizes()`, reporting an overflow as an error
    pub fn table_size(&self, variables: &[usize]) -> Result<usize> {
        self.product_domain_sizes(variables)
            .ok_or_else(|| MrfError::TableTooLarge {
                variables: variables.to_vec(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.domain_sizes.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_domain() {
        let error = Domains::new(vec![2, 0, 3]).unwrap_err();
        assert!(matches!(
            error,
            MrfError::InvalidDomain {
                variable: 1,
                domain_size: 0
            }
        ));
    }

    #[test]
    fn product_of_domain_sizes() {
        let domains = Domains::new(vec![2, 3, 4]).unwrap();
        assert_eq!(domains.product_domain_sizes(&[0, 2]), Some(8));
        assert_eq!(domains.product_domain_sizes(&[]), Some(1));
        assert_eq!(domains.num_variables(), 3);
    }

    #[test]
    fn oversized_product_is_reported() {
        let domains = Domains::new(vec![2; 64]).unwrap();
        let variables: Vec<usize> = (0..64).collect();
        assert_eq!(domains.product_domain_sizes(&variables), None);
        assert_eq!(domains.table_size(&variables[..63]).unwrap(), 1 << 63);
        assert!(matches!(
            domains.table_size(&variables),
            Err(MrfError::TableTooLarge { .. })
        ));
    }
}
