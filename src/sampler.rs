//! Constraint-aware sampling from a loaded network.
//!
//! Nodes are visited in topological order and drawn from their conditional
//! distribution, filtered by the active constraint predicates. When a node
//! admits no value under the current ancestry the whole partial assignment
//! is discarded and sampling restarts: a dead end at one node may be rooted
//! in an ancestor choice, so local repair would be unsound.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use tracing::{debug, warn};

use crate::constraints::ConstraintSet;
use crate::error::{ForgeprintError, Result};
use crate::model::{Network, Node};

/// Whole-assignment restarts granted before a constraint set is declared
/// unsatisfiable.
const MAX_ATTEMPTS: usize = 25;

/// One fully sampled set of node values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignment {
    values: HashMap<String, String>,
}

impl Assignment {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn insert(&mut self, name: &str, value: &str) {
        self.values.insert(name.to_string(), value.to_string());
    }
}

/// Samples one consistent assignment from `network` under `constraints`.
///
/// In strict mode an unsatisfiable constraint set fails with
/// [`ForgeprintError::StrictGeneration`] once the retry budget is spent.
/// Otherwise the node that kept failing has its constraint dropped and
/// sampling continues; only failing nodes are relaxed, the rest of the
/// constraint set stays in force.
pub(crate) fn sample(
    network: &Network,
    constraints: &ConstraintSet,
    strict: bool,
    rng: &mut impl Rng,
) -> Result<Assignment> {
    let mut relaxed: HashSet<String> = HashSet::new();
    loop {
        let mut failed_node: Option<String> = None;
        for attempt in 0..MAX_ATTEMPTS {
            match sample_once(network, constraints, &relaxed, rng) {
                Ok(assignment) => {
                    if attempt > 0 || !relaxed.is_empty() {
                        debug!(attempt, relaxed = relaxed.len(), "sampling converged");
                    }
                    return Ok(assignment);
                }
                Err(node) => failed_node = Some(node),
            }
        }
        // The retry budget never runs dry without at least one failure.
        let node = match failed_node {
            Some(node) => node,
            None => return Err(ForgeprintError::StrictGeneration),
        };
        if strict {
            return Err(ForgeprintError::StrictGeneration);
        }
        warn!(node = %node, "constraint admits no value; relaxing it");
        relaxed.insert(node);
    }
}

/// One full pass over the network. Fails with the name of the first node
/// whose filtered distribution came up empty.
fn sample_once(
    network: &Network,
    constraints: &ConstraintSet,
    relaxed: &HashSet<String>,
    rng: &mut impl Rng,
) -> std::result::Result<Assignment, String> {
    let mut assignment = Assignment::default();
    for node in network.nodes() {
        let value = if relaxed.contains(node.name()) {
            draw_unconstrained(node, &assignment, rng)
        } else {
            match draw_constrained(node, &assignment, constraints, rng) {
                Some(value) => value,
                None => return Err(node.name().to_string()),
            }
        };
        assignment.insert(node.name(), &value);
    }
    Ok(assignment)
}

/// Draws from the conditional distribution restricted to the allowed set,
/// renormalized by scaling the uniform anchor to the surviving mass.
fn draw_constrained(
    node: &Node,
    assignment: &Assignment,
    constraints: &ConstraintSet,
    rng: &mut impl Rng,
) -> Option<String> {
    let distribution = node.distribution(assignment)?;
    match constraints.allowed(node.name()) {
        Some(allowed) => draw(
            distribution
                .iter()
                .filter(|(value, _)| allowed.iter().any(|a| a == value))
                .map(|(value, weight)| (value.as_str(), *weight)),
            rng,
        ),
        None => draw(
            distribution.iter().map(|(value, weight)| (value.as_str(), *weight)),
            rng,
        ),
    }
}

/// Unconstrained draw used for relaxed nodes: the conditional distribution
/// when it exists, otherwise a uniform pick from the full catalog.
fn draw_unconstrained(node: &Node, assignment: &Assignment, rng: &mut impl Rng) -> String {
    if let Some(distribution) = node.distribution(assignment) {
        if let Some(value) = draw(distribution.iter().map(|(v, p)| (v.as_str(), *p)), rng) {
            return value;
        }
    }
    let catalog = node.possible_values();
    catalog[rng.gen_range(0..catalog.len())].to_string()
}

/// Inverse-CDF categorical draw from value/weight pairs.
fn draw<'a>(entries: impl Iterator<Item = (&'a str, f64)>, rng: &mut impl Rng) -> Option<String> {
    let entries: Vec<(&str, f64)> = entries.collect();
    let total: f64 = entries.iter().map(|(_, weight)| weight).sum();
    if entries.is_empty() || total <= 0.0 {
        return None;
    }
    let anchor = rng.gen::<f64>() * total;
    let mut cumulative = 0.0;
    for (value, weight) in &entries {
        cumulative += weight;
        if cumulative > anchor {
            return Some(value.to_string());
        }
    }
    // Floating-point slack: fall back to the last entry.
    entries.last().map(|(value, _)| value.to_string())
}
