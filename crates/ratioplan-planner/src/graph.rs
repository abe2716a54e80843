//! A small directed graph and the flow reconstruction that renders a
//! [`ProductionPlan`] into it.
//!
//! The solver only tracks per-item totals, so which recipe feeds which is a
//! presentation choice: each consumer takes from producers greedily, both
//! visited in name order.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use ratioplan_solver::Rational;

use crate::gamedata::{Item, Recipe};
use crate::plan::ProductionPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(usize);

impl EdgeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge<E> {
    pub source: NodeId,
    pub target: NodeId,
    pub data: E,
}

/// Directed multigraph with nodes and edges stored in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph<N, E> {
    nodes: Vec<N>,
    edges: Vec<Edge<E>>,
}

impl<N, E> Default for Graph<N, E> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }
}

impl<N, E> Graph<N, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, data: N) -> NodeId {
        self.nodes.push(data);
        NodeId(self.nodes.len() - 1)
    }

    pub fn add_edge(&mut self, source: NodeId, target: NodeId, data: E) -> EdgeId {
        self.edges.push(Edge { source, target, data });
        EdgeId(self.edges.len() - 1)
    }

    pub fn node(&self, id: NodeId) -> Option<&N> {
        self.nodes.get(id.0)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge<E>> {
        self.edges.get(id.0)
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge<E>> {
        self.edges.get_mut(id.0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &N)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge<E>> {
        self.edges.iter()
    }

    pub fn outgoing(&self, node: NodeId) -> impl Iterator<Item = &Edge<E>> {
        self.edges.iter().filter(move |e| e.source == node)
    }

    pub fn incoming(&self, node: NodeId) -> impl Iterator<Item = &Edge<E>> {
        self.edges.iter().filter(move |e| e.target == node)
    }

    pub fn find_edge(&self, source: NodeId, target: NodeId) -> Option<EdgeId> {
        self.edges
            .iter()
            .position(|e| e.source == source && e.target == target)
            .map(EdgeId)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// A node of a plan's flow graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// `amount` machine-equivalents of a recipe
    Recipe { recipe: Arc<Recipe>, amount: Rational },
    Input { item: Arc<Item>, amount: Rational },
    /// An output; `byproduct` is set when the planner never asked for it
    Output {
        item: Arc<Item>,
        amount: Rational,
        byproduct: bool,
    },
}

impl NodeData {
    pub fn name(&self) -> &str {
        match self {
            NodeData::Recipe { recipe, .. } => recipe.name(),
            NodeData::Input { item, .. } | NodeData::Output { item, .. } => &item.name,
        }
    }

    /// Matching order: by name, then recipes before inputs before outputs.
    pub fn sort_key(&self) -> (&str, u8) {
        let rank = match self {
            NodeData::Recipe { .. } => 0,
            NodeData::Input { .. } => 1,
            NodeData::Output { .. } => 2,
        };
        (self.name(), rank)
    }

    pub fn amount(&self) -> &Rational {
        match self {
            NodeData::Recipe { amount, .. } | NodeData::Input { amount, .. } | NodeData::Output { amount, .. } => {
                amount
            }
        }
    }
}

/// Items carried by one edge, per minute
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EdgeData {
    flows: BTreeMap<Arc<Item>, Rational>,
}

impl EdgeData {
    pub fn flows(&self) -> &BTreeMap<Arc<Item>, Rational> {
        &self.flows
    }

    pub fn amount(&self, item: &Item) -> Rational {
        self.flows.get(item).cloned().unwrap_or_default()
    }

    pub fn total(&self) -> Rational {
        self.flows.values().sum()
    }

    fn add(&mut self, item: &Arc<Item>, amount: &Rational) {
        let entry = self.flows.entry(Arc::clone(item)).or_default();
        *entry = (&*entry + amount).simplify();
    }
}

pub(crate) fn flow_graph(plan: &ProductionPlan) -> Graph<NodeData, EdgeData> {
    let mut graph = Graph::new();

    let recipe_nodes: Vec<(NodeId, Arc<Recipe>, Rational)> = plan
        .recipe_amounts()
        .iter()
        .map(|(recipe, amount)| {
            let id = graph.add_node(NodeData::Recipe {
                recipe: Arc::clone(recipe),
                amount: amount.clone(),
            });
            (id, Arc::clone(recipe), amount.clone())
        })
        .collect();
    let input_nodes: BTreeMap<Arc<Item>, NodeId> = plan
        .input_item_amounts()
        .iter()
        .map(|(item, amount)| {
            let id = graph.add_node(NodeData::Input {
                item: Arc::clone(item),
                amount: amount.clone(),
            });
            (Arc::clone(item), id)
        })
        .collect();
    let output_nodes: BTreeMap<Arc<Item>, NodeId> = plan
        .output_item_amounts()
        .iter()
        .map(|(item, amount)| {
            let id = graph.add_node(NodeData::Output {
                item: Arc::clone(item),
                amount: amount.clone(),
                byproduct: plan.is_byproduct(item),
            });
            (Arc::clone(item), id)
        })
        .collect();

    let items: BTreeSet<Arc<Item>> = plan.items();
    let mut edges: BTreeMap<(NodeId, NodeId), EdgeId> = BTreeMap::new();

    for item in &items {
        let mut suppliers: Vec<(NodeId, Rational)> = Vec::new();
        let mut demanders: Vec<(NodeId, Rational)> = Vec::new();
        for (id, recipe, amount) in &recipe_nodes {
            if recipe.produces(item) {
                suppliers.push((*id, amount * recipe.produced_per_minute(item)));
            }
            let used = recipe.consumed_per_minute(item);
            if used.is_positive() {
                demanders.push((*id, amount * used));
            }
        }
        if let Some(&id) = input_nodes.get(item) {
            suppliers.push((id, plan.input_amount(item)));
        }
        if let Some(&id) = output_nodes.get(item) {
            demanders.push((id, plan.output_amount(item)));
        }

        let key = |id: &NodeId| graph.node(*id).map(NodeData::sort_key);
        suppliers.sort_by(|a, b| key(&a.0).cmp(&key(&b.0)));
        demanders.sort_by(|a, b| key(&a.0).cmp(&key(&b.0)));

        let mut supplier = 0;
        for (demander, mut need) in demanders {
            while need.is_positive() && supplier < suppliers.len() {
                let (source, remaining) = &mut suppliers[supplier];
                let taken = remaining.clone().min(need.clone());
                if taken.is_positive() {
                    let edge = *edges
                        .entry((*source, demander))
                        .or_insert_with(|| graph.add_edge(*source, demander, EdgeData::default()));
                    if let Some(edge) = graph.edge_mut(edge) {
                        edge.data.add(item, &taken);
                    }
                    *remaining = (&*remaining - &taken).simplify();
                    need = (&need - &taken).simplify();
                }
                if !remaining.is_positive() {
                    supplier += 1;
                }
            }
        }
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamedata::{Building, GameData, RecipeSpec};
    use crate::planner::ProductionPlanner;

    #[test]
    fn test_graph_primitives() {
        let mut graph: Graph<&str, u32> = Graph::new();
        let a = graph.add_node("a");
        let b = graph.add_node("b");
        let c = graph.add_node("c");
        graph.add_edge(a, b, 1);
        graph.add_edge(a, c, 2);
        graph.add_edge(b, c, 3);

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.outgoing(a).map(|e| e.data).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(graph.incoming(c).map(|e| e.data).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(graph.find_edge(b, c).map(EdgeId::index), Some(2));
        assert_eq!(graph.find_edge(c, a), None);
        assert_eq!(graph.node(b), Some(&"b"));
    }

    fn data() -> GameData {
        let mut builder = GameData::builder();
        for name in ["ore", "ingot", "rod", "screw"] {
            builder.add_item(Item::new(name)).unwrap();
        }
        builder.add_building(Building::new("machine", 4)).unwrap();
        builder
            .add_recipe(RecipeSpec::new("ingot", "machine", 2).ingredient("ore", 1).product("ingot", 1))
            .unwrap();
        builder
            .add_recipe(RecipeSpec::new("rod", "machine", 4).ingredient("ingot", 1).product("rod", 1))
            .unwrap();
        builder
            .add_recipe(RecipeSpec::new("screw", "machine", 6).ingredient("rod", 1).product("screw", 4))
            .unwrap();
        builder.build()
    }

    #[test]
    fn test_flow_graph_follows_the_chain() {
        let data = data();
        let ore = data.item("ore").unwrap();
        let rod = data.item("rod").unwrap();
        let screw = data.item("screw").unwrap();
        let plan = ProductionPlanner::builder()
            .input(ore, 30)
            .output(screw, 40)
            .maximize_output(rod, 1)
            .recipes(data.recipes())
            .build()
            .unwrap()
            .create_plan()
            .unwrap();
        // 30 rods: 10 go to screws, 20 leave as output
        assert_eq!(plan.output_amount(rod), Rational::from(20));

        let graph = plan.to_graph();
        // three recipes, one input, two outputs
        assert_eq!(graph.node_count(), 6);

        let find = |name: &str, rank: u8| {
            graph
                .nodes()
                .find(|(_, n)| n.sort_key() == (name, rank))
                .map(|(id, _)| id)
                .unwrap()
        };
        let ore_in = find("ore", 1);
        let smelt = find("ingot", 0);
        let rods = find("rod", 0);
        let screws = find("screw", 0);
        let rod_out = find("rod", 2);
        let screw_out = find("screw", 2);

        let flow = |from: NodeId, to: NodeId, item: &Item| {
            graph
                .find_edge(from, to)
                .and_then(|e| graph.edge(e))
                .map(|e| e.data.amount(item))
                .unwrap_or_default()
        };
        assert_eq!(flow(ore_in, smelt, ore), Rational::from(30));
        assert_eq!(flow(smelt, rods, data.item("ingot").unwrap()), Rational::from(30));
        // demanders sorted by name: the rod output before the screw recipe
        assert_eq!(flow(rods, rod_out, rod), Rational::from(20));
        assert_eq!(flow(rods, screws, rod), Rational::from(10));
        assert_eq!(flow(screws, screw_out, screw), Rational::from(40));

        assert_eq!(graph.outgoing(rods).count(), 2);
        assert_eq!(graph.incoming(screw_out).count(), 1);
        assert!(graph.nodes().all(|(_, n)| !matches!(n, NodeData::Output { byproduct: true, .. })));
    }

    #[test]
    fn test_flows_conserve_node_amounts() {
        let data = data();
        let plan = ProductionPlanner::builder()
            .input(data.item("ore").unwrap(), 45)
            .maximize_output(data.item("screw").unwrap(), 1)
            .recipes(data.recipes())
            .build()
            .unwrap()
            .create_plan()
            .unwrap();
        let graph = plan.to_graph();
        for (id, node) in graph.nodes() {
            match node {
                NodeData::Input { amount, .. } => {
                    let sent: Rational = graph.outgoing(id).map(|e| e.data.total()).sum();
                    assert_eq!(&sent, amount);
                }
                NodeData::Output { amount, .. } => {
                    let received: Rational = graph.incoming(id).map(|e| e.data.total()).sum();
                    assert_eq!(&received, amount);
                }
                NodeData::Recipe { .. } => {}
            }
        }
    }
}
