use crate::{bp::factor_graph::FactorGraphEdge, factors::factor::Factor};

// Stores the messages of one belief propagation iteration, indexed by factor graph edge.
// `to_factor` holds variable-to-factor messages (the factor inboxes), `to_variable` holds
// factor-to-variable messages (the variable inboxes), and `baseline` keeps the variable
// inboxes of the previous iteration for the convergence check.
pub struct Messages {
    to_factor: Vec<Option<Factor>>,
    to_variable: Vec<Option<Factor>>,
    baseline: Vec<Option<Factor>>,
}

impl Messages {
    // Creates empty inboxes for a graph with the given number of edges
    pub fn new(edge_count: usize) -> Self {
        Messages {
            to_factor: vec![None; edge_count],
            to_variable: vec![None; edge_count],
            baseline: vec![None; edge_count],
        }
    }

    pub fn to_factor(&self, edge: FactorGraphEdge) -> Option<&Factor> {
        self.to_factor[edge.index()].as_ref()
    }

    pub fn to_variable(&self, edge: FactorGraphEdge) -> Option<&Factor> {
        self.to_variable[edge.index()].as_ref()
    }

    pub fn baseline(&self, edge: FactorGraphEdge) -> Option<&Factor> {
        self.baseline[edge.index()].as_ref()
    }

    pub fn send_to_factor(&mut self, edge: FactorGraphEdge, message: Factor) {
        self.to_factor[edge.index()] = Some(message);
    }

    pub fn send_to_variable(&mut self, edge: FactorGraphEdge, message: Factor) {
        self.to_variable[edge.index()] = Some(message);
    }

    pub fn clear_variable_inboxes(&mut self) {
        self.to_variable.iter_mut().for_each(|message| *message = None);
    }

    pub fn clear_factor_inboxes(&mut self) {
        self.to_factor.iter_mut().for_each(|message| *message = None);
    }

    // Divides every factor-to-variable message by its largest entry
    pub fn normalize_variable_inboxes(&mut self) {
        self.to_variable
            .iter_mut()
            .flatten()
            .for_each(Factor::normalize_by_max);
    }

    // Replaces the baseline with the current variable inboxes
    pub fn record_baseline(&mut self) {
        self.baseline.clone_from(&self.to_variable);
    }
}
