use log::debug;
use petgraph::{
    graph::{DiGraph, EdgeIndex, NodeIndex},
    visit::EdgeRef,
    Direction::{self, Incoming, Outgoing},
};

use crate::{data_structures::factor_arena::FactorHandle, network::markov_network::MarkovNetwork};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FactorGraphNode {
    Variable(usize),
    Factor(FactorHandle),
}

// Edge data: the factor (by position in `FactorGraph::factors()`) and the variable it links
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Link {
    pub factor: usize,
    pub variable: usize,
}

pub type FactorGraphEdge = EdgeIndex<usize>;
type Graph = DiGraph<FactorGraphNode, Link, usize>;

/// Bipartite factor graph of a network, with one edge from every factor to every variable
/// in its scope. Each edge carries the messages of both directions.
///
/// Message emission order is fixed here once, so that messages of successive iterations
/// can be compared position by position:
/// - a variable hears from its factors in network factor order;
/// - a factor hears from its variables in increasing variable order;
/// - a factor sends to its variables in its stored scope order.
pub struct FactorGraph {
    graph: Graph,
    factors: Vec<FactorHandle>,
    variable_inboxes: Vec<Vec<FactorGraphEdge>>,
    factor_inboxes: Vec<Vec<FactorGraphEdge>>,
    factor_outboxes: Vec<Vec<FactorGraphEdge>>,
}

impl FactorGraph {
    pub fn new(network: &MarkovNetwork) -> Self {
        debug!("Constructing factor graph");

        let edge_capacity = network
            .factors()
            .iter()
            .map(|(_, factor)| factor.scope().len())
            .sum();
        let mut graph = Graph::with_capacity(
            network.num_variables() + network.num_factors(),
            edge_capacity,
        );

        let variable_nodes: Vec<NodeIndex<usize>> = network
            .variables()
            .map(|variable| graph.add_node(FactorGraphNode::Variable(variable)))
            .collect();

        let mut factors = Vec::with_capacity(network.num_factors());
        let mut factor_nodes = Vec::with_capacity(network.num_factors());
        for (position, (handle, factor)) in network.factors().iter().enumerate() {
            let factor_node = graph.add_node(FactorGraphNode::Factor(handle));
            for &variable in factor.scope() {
                debug!(
                    "Adding edge from factor {:?} to variable {}",
                    handle, variable
                );
                graph.add_edge(
                    factor_node,
                    variable_nodes[variable],
                    Link {
                        factor: position,
                        variable,
                    },
                );
            }
            factors.push(handle);
            factor_nodes.push(factor_node);
        }

        let variable_inboxes = variable_nodes
            .iter()
            .map(|node| sorted_edges(&graph, *node, Incoming, |edge, _| edge.index()))
            .collect();
        let factor_outboxes = factor_nodes
            .iter()
            .map(|node| sorted_edges(&graph, *node, Outgoing, |edge, _| edge.index()))
            .collect();
        let factor_inboxes = factor_nodes
            .iter()
            .map(|node| sorted_edges(&graph, *node, Outgoing, |_, link| link.variable))
            .collect();

        debug!(
            "Factor graph has {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        FactorGraph {
            graph,
            factors,
            variable_inboxes,
            factor_inboxes,
            factor_outboxes,
        }
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, node: NodeIndex<usize>) -> Option<&FactorGraphNode> {
        self.graph.node_weight(node)
    }

    pub fn link(&self, edge: FactorGraphEdge) -> Link {
        self.graph[edge]
    }

    // Factors in network order
    pub fn factors(&self) -> &[FactorHandle] {
        &self.factors
    }

    // Edges delivering factor messages to `variable`, in network factor order
    pub fn variable_inbox(&self, variable: usize) -> &[FactorGraphEdge] {
        &self.variable_inboxes[variable]
    }

    // Edges delivering variable messages to the factor at `position`, by increasing variable
    pub fn factor_inbox(&self, position: usize) -> &[FactorGraphEdge] {
        &self.factor_inboxes[position]
    }

    // Edges the factor at `position` sends along, in its stored scope order
    pub fn factor_outbox(&self, position: usize) -> &[FactorGraphEdge] {
        &self.factor_outboxes[position]
    }
}

// Collects the edges of a node in one direction, sorted by the given key
fn sorted_edges(
    graph: &Graph,
    node: NodeIndex<usize>,
    direction: Direction,
    key: impl Fn(FactorGraphEdge, &Link) -> usize,
) -> Vec<FactorGraphEdge> {
    let mut edges: Vec<(usize, FactorGraphEdge)> = graph
        .edges_directed(node, direction)
        .map(|edge| (key(edge.id(), edge.weight()), edge.id()))
        .collect();
    edges.sort_unstable();
    edges.into_iter().map(|(_, edge)| edge).collect()
}
