use anyhow::{Context, Result};
use serde::Serialize;

use crate::estimator::Estimate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Node {
    HomeAway,
    Team1Morale,
    Team2Morale,
    Team1Win,
    Team1Goals,
    Team2Goals,
    Team1Shots,
    Team2Shots,
    Team1Cards,
    Team2Cards,
    Team1Subs,
    Team2Subs,
    Team1Aggression,
    Team2Aggression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeGroup {
    Team1,
    Team2,
    HomeAway,
}

impl NodeGroup {
    pub fn color_hex(self) -> &'static str {
        match self {
            NodeGroup::Team1 => "#00AA00",
            NodeGroup::Team2 => "#AA0000",
            NodeGroup::HomeAway => "#FFD700",
        }
    }
}

/// Causal structure of the model: who influences whom.
pub const EDGES: [(Node, Node); 19] = [
    (Node::HomeAway, Node::Team1Morale),
    (Node::HomeAway, Node::Team2Morale),
    (Node::HomeAway, Node::Team1Win),
    (Node::Team1Goals, Node::Team1Win),
    (Node::Team2Goals, Node::Team1Win),
    (Node::Team1Shots, Node::Team1Aggression),
    (Node::Team2Shots, Node::Team2Aggression),
    (Node::Team1Cards, Node::Team1Aggression),
    (Node::Team2Cards, Node::Team2Aggression),
    (Node::Team1Subs, Node::Team1Morale),
    (Node::Team2Subs, Node::Team2Morale),
    (Node::Team1Aggression, Node::Team1Win),
    (Node::Team2Aggression, Node::Team1Win),
    (Node::Team1Morale, Node::Team1Win),
    (Node::Team2Morale, Node::Team1Win),
    (Node::Team1Aggression, Node::Team1Goals),
    (Node::Team1Morale, Node::Team1Goals),
    (Node::Team2Aggression, Node::Team2Goals),
    (Node::Team2Morale, Node::Team2Goals),
];

impl Node {
    pub fn name(self) -> &'static str {
        match self {
            Node::HomeAway => "Home/Away",
            Node::Team1Morale => "Team 1 Morale",
            Node::Team2Morale => "Team 2 Morale",
            Node::Team1Win => "Team 1 Win",
            Node::Team1Goals => "Team 1 Current Goals",
            Node::Team2Goals => "Team 2 Current Goals",
            Node::Team1Shots => "Team 1 Total Shots",
            Node::Team2Shots => "Team 2 Total Shots",
            Node::Team1Cards => "Team 1 Yellow Cards",
            Node::Team2Cards => "Team 2 Yellow Cards",
            Node::Team1Subs => "Team 1 Substitutions",
            Node::Team2Subs => "Team 2 Substitutions",
            Node::Team1Aggression => "Team 1 Aggression",
            Node::Team2Aggression => "Team 2 Aggression",
        }
    }

    pub fn group(self) -> NodeGroup {
        match self {
            Node::HomeAway => NodeGroup::HomeAway,
            Node::Team1Morale
            | Node::Team1Win
            | Node::Team1Goals
            | Node::Team1Shots
            | Node::Team1Cards
            | Node::Team1Subs
            | Node::Team1Aggression => NodeGroup::Team1,
            _ => NodeGroup::Team2,
        }
    }

    /// Derived nodes carry probabilities; the rest are raw counts.
    fn is_probability(self) -> bool {
        matches!(
            self,
            Node::Team1Morale
                | Node::Team2Morale
                | Node::Team1Aggression
                | Node::Team2Aggression
                | Node::Team1Win
        )
    }

    pub fn value(self, est: &Estimate) -> f64 {
        let q = &est.query;
        match self {
            Node::HomeAway => q.home_away.as_f64(),
            Node::Team1Morale => est.team1.morale,
            Node::Team2Morale => est.team2.morale,
            Node::Team1Aggression => est.team1.aggression,
            Node::Team2Aggression => est.team2.aggression,
            Node::Team1Win => est.p_win(),
            Node::Team1Goals => q.team1.goals as f64,
            Node::Team2Goals => q.team2.goals as f64,
            Node::Team1Shots => q.team1.total_shots as f64,
            Node::Team2Shots => q.team2.total_shots as f64,
            Node::Team1Cards => q.team1.yellow_cards as f64,
            Node::Team2Cards => q.team2.yellow_cards as f64,
            Node::Team1Subs => q.team1.substitutions as f64,
            Node::Team2Subs => q.team2.substitutions as f64,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagramNode {
    pub id: Node,
    pub name: &'static str,
    pub label: String,
    pub group: NodeGroup,
    pub color: &'static str,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagram {
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<(&'static str, &'static str)>,
}

impl Diagram {
    pub fn from_estimate(est: &Estimate) -> Self {
        let nodes = node_order()
            .into_iter()
            .map(|id| {
                let value = id.value(est);
                DiagramNode {
                    id,
                    name: id.name(),
                    label: label(id, value),
                    group: id.group(),
                    color: id.group().color_hex(),
                    value,
                }
            })
            .collect();
        let edges = EDGES
            .iter()
            .map(|(from, to)| (from.name(), to.name()))
            .collect();
        Self { nodes, edges }
    }

    pub fn node(&self, id: Node) -> Option<&DiagramNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serialize causal diagram")
    }
}

/// Nodes in the order they first appear in `EDGES`.
pub fn node_order() -> Vec<Node> {
    let mut out: Vec<Node> = Vec::new();
    for (from, to) in EDGES {
        for node in [from, to] {
            if !out.contains(&node) {
                out.push(node);
            }
        }
    }
    out
}

pub fn label(node: Node, value: f64) -> String {
    let name = node.name().to_lowercase();
    if node.is_probability() {
        format!("{name}\n({})", two_places(value))
    } else {
        format!("{name}\n({})", value as u64)
    }
}

/// Rounds to two places without padding: 0.4 stays "0.4", whole numbers keep
/// one decimal.
fn two_places(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.1}")
    } else {
        format!("{rounded}")
    }
}
