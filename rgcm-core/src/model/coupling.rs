//! The coupling graph of a model.
//!
//! Components never refer to each other. The graph makes their coupling
//! through shared quantities explicit so that conflicts can be found before
//! the first step and the configuration can be drawn with graphviz.

use crate::component::{Declarations, RequirementDefinition, RequirementType};
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

use super::types::{
    AttachedCore, AttachedDiagnostic, AttachedPhysics, ComponentRole, ConfigurationWarning,
    CouplingGraph, CouplingNode, WarningKind,
};

struct GraphBuilder {
    graph: CouplingGraph,
    quantities: HashMap<String, NodeIndex>,
}

impl GraphBuilder {
    fn quantity(&mut self, name: &str) -> NodeIndex {
        if let Some(node) = self.quantities.get(name) {
            return *node;
        }
        let node = self
            .graph
            .add_node(CouplingNode::Quantity(name.to_string()));
        self.quantities.insert(name.to_string(), node);
        node
    }

    fn add_component(&mut self, role: ComponentRole, position: usize, declarations: &Declarations) {
        let node = self.graph.add_node(CouplingNode::Component {
            name: declarations.component.clone(),
            role,
            position,
        });
        for requirement_type in [
            RequirementType::Input,
            RequirementType::Tendency,
            RequirementType::Output,
            RequirementType::Diagnostic,
        ] {
            for q in declarations.of_type(requirement_type) {
                let quantity = self.quantity(&q.name);
                let edge = RequirementDefinition::new(&q.name, &q.units, requirement_type);
                if requirement_type == RequirementType::Input {
                    self.graph.add_edge(quantity, node, edge);
                } else {
                    self.graph.add_edge(node, quantity, edge);
                }
            }
        }
    }
}

pub(crate) fn build_coupling_graph(
    physics: &[AttachedPhysics],
    core: Option<&AttachedCore>,
    diagnostics: &[AttachedDiagnostic],
) -> CouplingGraph {
    let mut builder = GraphBuilder {
        graph: CouplingGraph::new(),
        quantities: HashMap::new(),
    };
    if let Some(core) = core {
        builder.add_component(ComponentRole::DynamicalCore, 0, &core.declarations);
    }
    for (position, attached) in physics.iter().enumerate() {
        builder.add_component(attached.component.role(), position, &attached.declarations);
    }
    for (position, attached) in diagnostics.iter().enumerate() {
        builder.add_component(ComponentRole::Diagnostic, position, &attached.declarations);
    }
    builder.graph
}

/// Order in which a step merges results: physics in list order, then the
/// dynamical core, then diagnostic components in list order.
fn merge_order(node: &CouplingNode) -> (u8, usize) {
    match node {
        CouplingNode::Component { role, position, .. } => match role {
            ComponentRole::Prognostic | ComponentRole::Implicit => (0, *position),
            ComponentRole::DynamicalCore => (1, *position),
            ComponentRole::Diagnostic => (2, *position),
        },
        CouplingNode::Quantity(_) => (3, 0),
    }
}

/// Producers of `quantity` through edges of `requirement_type`, in merge order.
fn producers(
    graph: &CouplingGraph,
    quantity: NodeIndex,
    requirement_type: RequirementType,
    roles: &[ComponentRole],
) -> Vec<CouplingNode> {
    let mut nodes: Vec<CouplingNode> = graph
        .edges_directed(quantity, Direction::Incoming)
        .filter(|e| e.weight().requirement_type == requirement_type)
        .map(|e| graph[e.source()].clone())
        .filter(|n| matches!(n, CouplingNode::Component { role, .. } if roles.contains(role)))
        .collect();
    nodes.sort_by_key(merge_order);
    nodes
}

fn names(nodes: &[CouplingNode]) -> Vec<String> {
    nodes
        .iter()
        .filter_map(|n| match n {
            CouplingNode::Component { name, .. } => Some(name.clone()),
            CouplingNode::Quantity(_) => None,
        })
        .collect()
}

/// Finds the conflicts a step resolves by letting the last producer win.
pub(crate) fn find_conflicts(graph: &CouplingGraph) -> Vec<ConfigurationWarning> {
    let all_roles = [
        ComponentRole::Prognostic,
        ComponentRole::Implicit,
        ComponentRole::DynamicalCore,
        ComponentRole::Diagnostic,
    ];
    let mut warnings = vec![];
    let mut quantities: Vec<(NodeIndex, &String)> = graph
        .node_indices()
        .filter_map(|i| match &graph[i] {
            CouplingNode::Quantity(name) => Some((i, name)),
            CouplingNode::Component { .. } => None,
        })
        .collect();
    quantities.sort_by_key(|(_, name)| *name);

    for (node, name) in quantities {
        let implicit = producers(graph, node, RequirementType::Output, &[ComponentRole::Implicit]);
        if implicit.len() > 1 {
            warnings.push(ConfigurationWarning {
                kind: WarningKind::DuplicateImplicitOutput,
                quantity: name.clone(),
                components: names(&implicit),
            });
        }

        let tendencies = producers(graph, node, RequirementType::Tendency, &all_roles);
        if !implicit.is_empty() && !tendencies.is_empty() {
            let mut involved = tendencies;
            involved.extend(implicit.last().cloned());
            warnings.push(ConfigurationWarning {
                kind: WarningKind::ImplicitOverridesTendency,
                quantity: name.clone(),
                components: names(&involved),
            });
        }

        let diagnostics = producers(graph, node, RequirementType::Diagnostic, &all_roles);
        if diagnostics.len() > 1 {
            warnings.push(ConfigurationWarning {
                kind: WarningKind::DuplicateDiagnostic,
                quantity: name.clone(),
                components: names(&diagnostics),
            });
        }
    }
    warnings
}
