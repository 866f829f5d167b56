//! Ripple-effect score of a project.
//!
//! The people reached by a project are laid out as a directed network: the
//! project itself, the people who took part in it (first degree), the people
//! they influence (second degree) and the people those influence in turn
//! (third degree). Every person gets a node score (diffusion degree times
//! PageRank), the node scores are summed and discounted per layer, and the
//! total is weighted by how aligned the partners were.

use std::collections::{BTreeMap, HashMap};

use log::{debug, info};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::config::*;

/// A person (or the project, for the root) in the influence network.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct NodeInfo {
    pub name: String,
    /// 0 for the project, then the degree of separation.
    pub layer: u32,
    /// The first-degree group this person descends from.
    pub category: Option<Category>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct InfluenceNode {
    pub name: String,
    pub layer: u32,
    pub category: Option<Category>,
    pub diffusion_degree: f64,
    pub page_rank: f64,
}

impl InfluenceNode {
    pub fn score(&self) -> f64 {
        self.diffusion_degree * self.page_rank
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct LayerScore {
    pub layer: u32,
    pub node_count: usize,
    pub node_score_sum: f64,
    pub discount: f64,
    /// Discounted sum, rounded to 3 decimals.
    pub score: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct PropagationReport {
    pub nodes: Vec<InfluenceNode>,
    pub layers: Vec<LayerScore>,
    pub edge_count: usize,
    pub alignment_score: f64,
    /// Sum of the layer scores times the alignment score, rounded to 3 decimals.
    pub project_score: f64,
}

impl PropagationReport {
    fn empty(alignment_score: f64) -> PropagationReport {
        PropagationReport {
            nodes: Vec::new(),
            layers: Vec::new(),
            edge_count: 0,
            alignment_score,
            project_score: 0.0,
        }
    }

    pub fn layer(&self, layer: u32) -> Option<&LayerScore> {
        self.layers.iter().find(|l| l.layer == layer)
    }
}

/// The directed influence network of one project.
#[derive(Debug, Clone, Default)]
pub struct InfluenceGraph {
    graph: DiGraph<NodeInfo, ()>,
}

impl InfluenceGraph {
    /// Builds the network from head counts.
    ///
    /// Every participant hangs from the project node, every participant of a
    /// category `c` influences `second_degree[c]` people, and each of those
    /// influences `third_degree[c]` more. The people influenced by the same
    /// person form a group. Within a group of size `s`, `round(within * s)`
    /// members are tied to the next member of the group (cyclically). Across
    /// groups, `round(outside * s)` members of each group are tied to members
    /// of the next group of the same layer (cyclically, in creation order).
    pub fn build(inputs: &PropagationInputs) -> InfluenceGraph {
        let mut graph: DiGraph<NodeInfo, ()> = DiGraph::new();
        if inputs.first_degree.total() == 0 {
            return InfluenceGraph { graph };
        }
        let root = graph.add_node(NodeInfo {
            name: "project".to_string(),
            layer: 0,
            category: None,
        });

        let mut first_layer: Vec<NodeIndex> = Vec::new();
        for category in Category::ALL {
            for _ in 0..inputs.first_degree.get(category) {
                let name = format!("1-{}-{}", category.key(), first_layer.len());
                let node = graph.add_node(NodeInfo {
                    name,
                    layer: 1,
                    category: Some(category),
                });
                graph.add_edge(root, node, ());
                first_layer.push(node);
            }
        }

        let second_groups = expand_layer(&mut graph, &first_layer, 2, &inputs.second_degree);
        connect_groups(&mut graph, &second_groups, inputs.second_degree_likelihood);

        let second_layer: Vec<NodeIndex> = second_groups.iter().flatten().cloned().collect();
        let third_groups = expand_layer(&mut graph, &second_layer, 3, &inputs.third_degree);
        connect_groups(&mut graph, &third_groups, inputs.third_degree_likelihood);

        debug!(
            "InfluenceGraph::build: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        InfluenceGraph { graph }
    }

    /// Builds the network from an explicit edge list `(from, to, layer)`.
    ///
    /// The layer of a node is the layer of the first edge pointing to it.
    /// Nodes that no edge points to are roots and are not scored.
    pub fn from_edges(edges: &[(String, String, u32)]) -> Result<InfluenceGraph, ScoringErrors> {
        let mut graph: DiGraph<NodeInfo, ()> = DiGraph::new();
        let mut indices: HashMap<String, NodeIndex> = HashMap::new();
        let mut targeted: Vec<bool> = Vec::new();

        for (from, to, layer) in edges.iter() {
            let (from, to) = (from.trim(), to.trim());
            if from.is_empty() || to.is_empty() {
                return Err(ScoringErrors::InvalidEdge {
                    from: from.to_string(),
                    to: to.to_string(),
                });
            }
            let source = edge_node(&mut graph, &mut indices, &mut targeted, from);
            let target = edge_node(&mut graph, &mut indices, &mut targeted, to);
            if !targeted[target.index()] {
                targeted[target.index()] = true;
                graph[target].layer = *layer;
            }
            graph.add_edge(source, target, ());
        }
        debug!(
            "InfluenceGraph::from_edges: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(InfluenceGraph { graph })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeInfo> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    /// The edges as pairs of node names.
    pub fn edges(&self) -> Vec<(String, String)> {
        self.graph
            .edge_references()
            .map(|e| {
                (
                    self.graph[e.source()].name.clone(),
                    self.graph[e.target()].name.clone(),
                )
            })
            .collect()
    }

    // The other endpoint of every edge of `node` under `mode`, with multiplicity.
    fn neighbors(&self, node: NodeIndex, mode: NeighborMode) -> Vec<NodeIndex> {
        let outgoing = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| e.target());
        let incoming = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .map(|e| e.source());
        match mode {
            NeighborMode::Out => outgoing.collect(),
            NeighborMode::In => incoming.collect(),
            NeighborMode::All => outgoing.chain(incoming).collect(),
        }
    }

    /// The diffusion degree of every node, in node order: the node's own
    /// degree plus the degrees of its neighbours, each scaled by `lambda`.
    pub fn diffusion_degrees(&self, mode: NeighborMode, lambda: f64) -> Vec<f64> {
        let neighborhoods: Vec<Vec<NodeIndex>> = self
            .graph
            .node_indices()
            .map(|v| self.neighbors(v, mode))
            .collect();
        let degrees: Vec<f64> = neighborhoods.iter().map(|n| n.len() as f64).collect();
        neighborhoods
            .iter()
            .enumerate()
            .map(|(v, neighbors)| {
                let mut dd = lambda * degrees[v];
                for u in neighbors.iter() {
                    dd += lambda * degrees[u.index()];
                }
                dd
            })
            .collect()
    }

    /// PageRank of every node, in node order.
    ///
    /// Power iteration with uniform teleportation. The rank held by nodes
    /// without outgoing edges is spread uniformly over all the nodes.
    pub fn page_rank(&self, damping_factor: f64, max_iterations: usize, tolerance: f64) -> Vec<f64> {
        let n = self.graph.node_count();
        if n == 0 {
            return Vec::new();
        }
        let nf = n as f64;
        let out_degrees: Vec<usize> = self
            .graph
            .node_indices()
            .map(|v| self.graph.edges_directed(v, Direction::Outgoing).count())
            .collect();

        let mut ranks: Vec<f64> = vec![1.0 / nf; n];
        for iteration in 0..max_iterations {
            let dangling: f64 = ranks
                .iter()
                .zip(out_degrees.iter())
                .filter(|(_, d)| **d == 0)
                .map(|(r, _)| *r)
                .sum();
            let base = (1.0 - damping_factor) / nf + damping_factor * dangling / nf;
            let mut next: Vec<f64> = vec![base; n];
            for e in self.graph.edge_references() {
                let (s, t) = (e.source().index(), e.target().index());
                next[t] += damping_factor * ranks[s] / out_degrees[s] as f64;
            }
            let total: f64 = next.iter().sum();
            if total > 0.0 {
                for r in next.iter_mut() {
                    *r /= total;
                }
            }
            let delta: f64 = next
                .iter()
                .zip(ranks.iter())
                .map(|(a, b)| (a - b).abs())
                .sum();
            ranks = next;
            if delta < tolerance {
                debug!("page_rank: converged after {} iterations", iteration + 1);
                break;
            }
        }
        ranks
    }
}

fn edge_node(
    graph: &mut DiGraph<NodeInfo, ()>,
    indices: &mut HashMap<String, NodeIndex>,
    targeted: &mut Vec<bool>,
    name: &str,
) -> NodeIndex {
    if let Some(idx) = indices.get(name) {
        return *idx;
    }
    let idx = graph.add_node(NodeInfo {
        name: name.to_string(),
        layer: 0,
        category: None,
    });
    indices.insert(name.to_string(), idx);
    targeted.push(false);
    idx
}

// Creates the children of every parent. Returns one group per parent that has children.
fn expand_layer(
    graph: &mut DiGraph<NodeInfo, ()>,
    parents: &[NodeIndex],
    layer: u32,
    counts: &CategoryCounts,
) -> Vec<Vec<NodeIndex>> {
    let mut groups: Vec<Vec<NodeIndex>> = Vec::new();
    let mut created: usize = 0;
    for parent in parents.iter() {
        let category = match graph[*parent].category {
            Some(c) => c,
            None => continue,
        };
        let mut group: Vec<NodeIndex> = Vec::new();
        for _ in 0..counts.get(category) {
            let name = format!("{}-{}-{}", layer, category.key(), created);
            created += 1;
            let child = graph.add_node(NodeInfo {
                name,
                layer,
                category: Some(category),
            });
            graph.add_edge(*parent, child, ());
            group.push(child);
        }
        if !group.is_empty() {
            groups.push(group);
        }
    }
    groups
}

fn tie_count(likelihood: f64, group_size: usize) -> usize {
    let k = (likelihood * group_size as f64).round();
    (k.max(0.0) as usize).min(group_size)
}

fn connect_groups(
    graph: &mut DiGraph<NodeInfo, ()>,
    groups: &[Vec<NodeIndex>],
    likelihood: GroupLikelihood,
) {
    for group in groups.iter() {
        let s = group.len();
        if s < 2 {
            continue;
        }
        for i in 0..tie_count(likelihood.within_group, s) {
            graph.add_edge(group[i], group[(i + 1) % s], ());
        }
    }

    let m = groups.len();
    if m < 2 {
        return;
    }
    for (j, group) in groups.iter().enumerate() {
        let target = &groups[(j + 1) % m];
        for i in 0..tie_count(likelihood.outside_group, group.len()) {
            graph.add_edge(group[i], target[i % target.len()], ());
        }
    }
}

/// Rounds half away from zero.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Scores a network. The root layer is not scored.
pub fn score_graph(
    graph: &InfluenceGraph,
    alignment_score: f64,
    rules: &PropagationRules,
) -> PropagationReport {
    if graph.node_count() == 0 {
        info!("score_graph: empty influence network, project score is 0");
        return PropagationReport::empty(alignment_score);
    }
    let diffusion = graph.diffusion_degrees(rules.diffusion_mode, rules.diffusion_lambda);
    let ranks = graph.page_rank(
        rules.damping_factor,
        rules.max_iterations,
        rules.tolerance,
    );

    let nodes: Vec<InfluenceNode> = graph
        .nodes()
        .enumerate()
        .map(|(idx, info)| InfluenceNode {
            name: info.name.clone(),
            layer: info.layer,
            category: info.category,
            diffusion_degree: diffusion[idx],
            page_rank: ranks[idx],
        })
        .collect();

    let mut sums: BTreeMap<u32, (usize, f64)> = BTreeMap::new();
    for node in nodes.iter().filter(|n| n.layer >= 1) {
        let entry = sums.entry(node.layer).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += node.score();
    }

    let layers: Vec<LayerScore> = sums
        .iter()
        .map(|(layer, (count, sum))| {
            let discount = rules.layer_discount(*layer);
            LayerScore {
                layer: *layer,
                node_count: *count,
                node_score_sum: *sum,
                discount,
                score: round_to(sum * discount, 3),
            }
        })
        .collect();

    let total: f64 = layers.iter().map(|l| l.score).sum();
    let project_score = round_to(total * alignment_score, 3);
    for l in layers.iter() {
        info!(
            "Layer {}: {} nodes, node score sum {:.6}, discount {} -> {}",
            l.layer, l.node_count, l.node_score_sum, l.discount, l.score
        );
    }
    info!(
        "Project propagation score: {} (alignment {})",
        project_score, alignment_score
    );

    PropagationReport {
        nodes,
        layers,
        edge_count: graph.edge_count(),
        alignment_score,
        project_score,
    }
}

/// Builds and scores the network of checked inputs.
pub fn score_inputs(inputs: &PropagationInputs, rules: &PropagationRules) -> PropagationReport {
    let graph = InfluenceGraph::build(inputs);
    score_graph(&graph, inputs.alignment_score, rules)
}

/// Checks the inputs, then builds and scores the network.
pub fn run_propagation(
    inputs: &PropagationInputs,
    rules: &PropagationRules,
) -> Result<PropagationReport, ScoringErrors> {
    inputs.validate(rules)?;
    Ok(score_inputs(inputs, rules))
}

/// The project propagation score, with the same likelihoods for the second and third degree.
pub fn propagate(
    first_degree: CategoryCounts,
    second_degree: CategoryCounts,
    third_degree: CategoryCounts,
    within_group_likelihood: f64,
    outside_group_likelihood: f64,
    alignment_score: f64,
) -> Result<f64, ScoringErrors> {
    let likelihood = GroupLikelihood {
        within_group: within_group_likelihood,
        outside_group: outside_group_likelihood,
    };
    let inputs = PropagationInputs {
        first_degree,
        second_degree,
        third_degree,
        second_degree_likelihood: likelihood,
        third_degree_likelihood: likelihood,
        alignment_score,
    };
    run_propagation(&inputs, &PropagationRules::DEFAULT_RULES).map(|r| r.project_score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn counts(pairs: &[(Category, u64)]) -> CategoryCounts {
        let mut c = CategoryCounts::default();
        for (category, n) in pairs {
            c.set(*category, *n);
        }
        c
    }

    fn inputs(
        first: CategoryCounts,
        second: CategoryCounts,
        third: CategoryCounts,
        likelihood: GroupLikelihood,
    ) -> PropagationInputs {
        PropagationInputs {
            first_degree: first,
            second_degree: second,
            third_degree: third,
            second_degree_likelihood: likelihood,
            third_degree_likelihood: likelihood,
            alignment_score: 0.75,
        }
    }

    #[test]
    fn zero_counts_score_zero() {
        init();
        let zero = CategoryCounts::default();
        let score = propagate(zero, zero, zero, 0.5, 0.5, 0.75).unwrap();
        assert_eq!(score, 0.0);
    }

    #[test]
    fn zero_first_degree_ignores_further_degrees() {
        let zero = CategoryCounts::default();
        let many = counts(&[(Category::Faculty, 10)]);
        let report = run_propagation(
            &inputs(zero, many, many, GroupLikelihood::DEFAULT),
            &PropagationRules::DEFAULT_RULES,
        )
        .unwrap();
        assert_eq!(report.project_score, 0.0);
        assert!(report.nodes.is_empty());
    }

    #[test]
    fn layer_discounts() {
        let rules = PropagationRules::DEFAULT_RULES;
        assert!((100.0 * rules.layer_discount(1) - 11.0).abs() < 1e-9);
        assert_eq!(round_to(100.0 * rules.layer_discount(1), 3), 11.0);
        assert_eq!(rules.layer_discount(2), 0.051);
        assert_eq!(rules.layer_discount(3), 0.049);
        assert_eq!(100.0 * rules.layer_discount(4), 0.0);
        assert_eq!(rules.layer_discount(0), 0.0);
    }

    #[test]
    fn star_network_scores_leaves_equally() {
        init();
        let zero = CategoryCounts::default();
        let first = counts(&[(Category::Faculty, 3)]);
        let report = run_propagation(
            &inputs(first, zero, zero, GroupLikelihood::DEFAULT),
            &PropagationRules::DEFAULT_RULES,
        )
        .unwrap();
        assert_eq!(report.nodes.len(), 4);
        assert_eq!(report.edge_count, 3);
        let leaves: Vec<&InfluenceNode> = report.nodes.iter().filter(|n| n.layer == 1).collect();
        assert_eq!(leaves.len(), 3);
        for leaf in leaves.iter() {
            assert_eq!(leaf.diffusion_degree, 4.0);
            assert!((leaf.score() - leaves[0].score()).abs() < 1e-12);
        }
        let root = report.nodes.iter().find(|n| n.layer == 0).unwrap();
        assert_eq!(root.diffusion_degree, 6.0);
        assert_eq!(report.layers.len(), 1);
        assert!(report.project_score > 0.0);
    }

    #[test]
    fn page_rank_sums_to_one() {
        let first = counts(&[(Category::Faculty, 2), (Category::Student, 3)]);
        let second = counts(&[(Category::Faculty, 4), (Category::Student, 2)]);
        let third = counts(&[(Category::Student, 2)]);
        let graph = InfluenceGraph::build(&inputs(first, second, third, GroupLikelihood::DEFAULT));
        let ranks = graph.page_rank(0.85, 100, 1e-10);
        let total: f64 = ranks.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(ranks.iter().all(|r| *r > 0.0));
    }

    #[test]
    fn group_ties_follow_the_likelihoods() {
        let zero = CategoryCounts::default();
        let first = counts(&[(Category::Faculty, 2)]);
        let second = counts(&[(Category::Faculty, 3)]);
        let graph = InfluenceGraph::build(&inputs(first, second, zero, GroupLikelihood::DEFAULT));
        // project + 2 participants + 2 groups of 3
        assert_eq!(graph.node_count(), 9);
        // 2 + 6 tree edges, 2 ties within each group, 2 ties from each group to the other
        assert_eq!(graph.edge_count(), 16);

        let none = GroupLikelihood {
            within_group: 0.0,
            outside_group: 0.0,
        };
        let tree = InfluenceGraph::build(&inputs(first, second, zero, none));
        assert_eq!(tree.edge_count(), 8);
    }

    #[test]
    fn constructed_network_is_simple() {
        let first = counts(&[(Category::Faculty, 2), (Category::Staff, 1), (Category::Student, 2)]);
        let second = counts(&[(Category::Faculty, 2), (Category::Staff, 5), (Category::Student, 1)]);
        let third = counts(&[(Category::Faculty, 3), (Category::Staff, 2)]);
        let likelihood = GroupLikelihood {
            within_group: 0.9,
            outside_group: 0.9,
        };
        let graph = InfluenceGraph::build(&inputs(first, second, third, likelihood));
        let edges = graph.edges();
        let unique: HashSet<(String, String)> = edges.iter().cloned().collect();
        assert_eq!(unique.len(), edges.len());
        assert!(edges.iter().all(|(a, b)| a != b));
    }

    #[test]
    fn propagation_is_deterministic() {
        let first = counts(&[(Category::Faculty, 3), (Category::CoreCommunityMember, 4)]);
        let second = counts(&[(Category::Faculty, 5), (Category::CoreCommunityMember, 3)]);
        let third = counts(&[(Category::Faculty, 2), (Category::CoreCommunityMember, 2)]);
        let a = propagate(first, second, third, 0.4, 0.6, 0.8).unwrap();
        let b = propagate(first, second, third, 0.4, 0.6, 0.8).unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn rejects_out_of_range_inputs() {
        let first = counts(&[(Category::Faculty, 1)]);
        let zero = CategoryCounts::default();
        assert!(matches!(
            propagate(first, zero, zero, 0.95, 0.5, 0.75),
            Err(ScoringErrors::LikelihoodOutOfRange { .. })
        ));
        assert!(matches!(
            propagate(first, zero, zero, 0.5, 0.5, 1.5),
            Err(ScoringErrors::AlignmentOutOfRange { .. })
        ));
        let huge = counts(&[(Category::Faculty, 1_000)]);
        assert!(matches!(
            propagate(huge, huge, huge, 0.5, 0.5, 0.75),
            Err(ScoringErrors::GraphTooLarge { .. })
        ));
    }

    #[test]
    fn edge_list_layers() {
        let edges: Vec<(String, String, u32)> = vec![
            ("p".to_string(), "a".to_string(), 1),
            ("p".to_string(), "b".to_string(), 1),
            ("a".to_string(), "c".to_string(), 2),
            ("b".to_string(), "c".to_string(), 2),
            ("c".to_string(), "d".to_string(), 4),
        ];
        let graph = InfluenceGraph::from_edges(&edges).unwrap();
        assert_eq!(graph.node_count(), 5);
        let layers: Vec<(String, u32)> = graph.nodes().map(|n| (n.name.clone(), n.layer)).collect();
        assert_eq!(
            layers,
            vec![
                ("p".to_string(), 0),
                ("a".to_string(), 1),
                ("b".to_string(), 1),
                ("c".to_string(), 2),
                ("d".to_string(), 4),
            ]
        );
        let report = score_graph(&graph, 0.75, &PropagationRules::DEFAULT_RULES);
        assert_eq!(report.layer(4).unwrap().score, 0.0);
        assert!(report.layer(0).is_none());

        let bad = vec![("".to_string(), "a".to_string(), 1)];
        assert!(InfluenceGraph::from_edges(&bad).is_err());
    }
}
