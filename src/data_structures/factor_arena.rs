use log::debug;

use crate::factors::factor::Factor;

// Stable handle of a factor stored in a `FactorArena`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FactorHandle(usize);

impl FactorHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

// Stores factors under handles that stay valid while other factors are added or removed.
// Slots of removed factors are never reused, so a handle never refers to a different factor.
// Iteration follows insertion order of the live factors.
#[derive(Clone, Debug, Default)]
pub struct FactorArena {
    slots: Vec<Option<Factor>>,
    live: Vec<FactorHandle>,
}

impl FactorArena {
    pub fn new() -> Self {
        FactorArena::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        FactorArena {
            slots: Vec::with_capacity(capacity),
            live: Vec::with_capacity(capacity),
        }
    }

    // Adds a factor and returns its handle
    pub fn insert(&mut self, factor: Factor) -> FactorHandle {
        let handle = FactorHandle(self.slots.len());
        debug!("Insert factor over {:?} as {:?}", factor.scope(), handle);
        self.slots.push(Some(factor));
        self.live.push(handle);
        handle
    }

    // Takes a factor out of the arena, if it is still there
    pub fn remove(&mut self, handle: FactorHandle) -> Option<Factor> {
        let factor = self.slots.get_mut(handle.0)?.take()?;
        self.live.retain(|live_handle| *live_handle != handle);
        Some(factor)
    }

    pub fn get(&self, handle: FactorHandle) -> Option<&Factor> {
        self.slots.get(handle.0)?.as_ref()
    }

    // Returns handles of live factors whose scope contains `variable`
    pub fn handles_containing(&self, variable: usize) -> Vec<FactorHandle> {
        self.iter()
            .filter(|(_, factor)| factor.in_scope(variable))
            .map(|(handle, _)| handle)
            .collect()
    }

    pub fn handles(&self) -> &[FactorHandle] {
        &self.live
    }

    // Iterates over live factors in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (FactorHandle, &Factor)> + '_ {
        self.live.iter().filter_map(|handle| {
            self.slots[handle.0]
                .as_ref()
                .map(|factor| (*handle, factor))
        })
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

impl FromIterator<Factor> for FactorArena {
    fn from_iter<I: IntoIterator<Item = Factor>>(iter: I) -> Self {
        let mut arena = FactorArena::new();
        for factor in iter {
            arena.insert(factor);
        }
        arena
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::domains::Domains;

    fn factor(scope: &[usize]) -> Factor {
        let domains = Domains::new(vec![2, 2, 2]).unwrap();
        let size = domains.table_size(scope).unwrap();
        Factor::from_values(scope, domains, vec![1.; size]).unwrap()
    }

    #[test]
    fn handles_survive_removal() {
        let mut arena = FactorArena::new();
        let a = arena.insert(factor(&[0]));
        let b = arena.insert(factor(&[0, 1]));
        let c = arena.insert(factor(&[2]));

        assert!(arena.remove(a).is_some());
        assert!(arena.remove(a).is_none());
        assert!(arena.get(a).is_none());
        assert_eq!(arena.get(c).unwrap().scope(), &[2]);
        assert_eq!(arena.handles(), &[b, c]);

        let d = arena.insert(factor(&[1]));
        assert_ne!(d, a);
        assert_eq!(arena.handles(), &[b, c, d]);
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn finds_factors_by_variable() {
        let arena: FactorArena = vec![factor(&[0]), factor(&[0, 1]), factor(&[2])]
            .into_iter()
            .collect();
        let handles = arena.handles_containing(0);
        assert_eq!(
            handles.iter().map(|h| h.index()).collect::<Vec<_>>(),
            vec![0, 1]
        );
        assert!(arena.handles_containing(1).len() == 1);
    }
}
