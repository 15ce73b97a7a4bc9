//! Pretrained Bayesian network model: loading, validation, and lookups.
//!
//! A model artifact is a JSON document (optionally wrapped in a zip archive)
//! listing nodes in sampling order. Each node carries its parent names, its
//! value catalog, and a conditional probability table keyed by parent values,
//! with a wildcard branch for parent combinations unseen in training.

mod bundled;

pub use bundled::{fingerprint_network, header_network, input_network};

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::{ForgeprintError, Result};
use crate::sampler::Assignment;

/// Sentinel the training pipeline emits for attributes absent from a capture.
pub const MISSING_VALUE: &str = "*MISSING_VALUE*";
/// Prefix marking a node value that packs a whole JSON document.
pub const STRINGIFIED_PREFIX: &str = "*STRINGIFIED*";

/// Conditional probability table. Branches consume one parent value per
/// level; the `skip` branch is the wildcard and may collapse the remaining
/// levels into a single distribution.
#[derive(Debug, Clone)]
pub(crate) enum Cpt {
    Branch {
        deeper: HashMap<String, Cpt>,
        skip: Option<Box<Cpt>>,
    },
    /// Value/probability pairs in a stable (sorted) order.
    Leaf(Vec<(String, f64)>),
}

impl Cpt {
    fn from_value(value: &Value, node: &str) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| ForgeprintError::ModelLoad {
            node: node.to_string(),
            reason: "conditional probabilities must be a JSON object".into(),
        })?;
        if obj.contains_key("deeper") || obj.contains_key("skip") {
            let mut deeper = HashMap::new();
            if let Some(map) = obj.get("deeper") {
                let map = map.as_object().ok_or_else(|| ForgeprintError::ModelLoad {
                    node: node.to_string(),
                    reason: "'deeper' must be a JSON object".into(),
                })?;
                for (key, sub) in map {
                    deeper.insert(key.clone(), Cpt::from_value(sub, node)?);
                }
            }
            let skip = match obj.get("skip") {
                Some(sub) => Some(Box::new(Cpt::from_value(sub, node)?)),
                None => None,
            };
            return Ok(Cpt::Branch { deeper, skip });
        }
        let mut entries = Vec::with_capacity(obj.len());
        for (key, prob) in obj {
            let prob = prob.as_f64().ok_or_else(|| ForgeprintError::ModelLoad {
                node: node.to_string(),
                reason: format!("probability for value '{key}' is not a number"),
            })?;
            entries.push((key.clone(), prob));
        }
        Ok(Cpt::Leaf(entries))
    }
}

/// A single attribute node of the network.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    parents: Vec<String>,
    possible_values: Vec<String>,
    cpt: Cpt,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_names(&self) -> &[String] {
        &self.parents
    }

    /// The node's declared value catalog.
    pub fn possible_values(&self) -> &[String] {
        &self.possible_values
    }

    /// Distribution over this node's values given already-sampled parent
    /// values. Falls back to the wildcard branch where the exact parent
    /// combination was never observed; returns `None` when even the wildcard
    /// dead-ends.
    pub(crate) fn distribution(&self, parent_values: &Assignment) -> Option<&[(String, f64)]> {
        let mut cursor = &self.cpt;
        for parent in &self.parents {
            match cursor {
                Cpt::Leaf(_) => break,
                Cpt::Branch { deeper, skip } => {
                    let next = parent_values.get(parent).and_then(|v| deeper.get(v));
                    match next {
                        Some(sub) => cursor = sub,
                        None => cursor = skip.as_deref()?,
                    }
                }
            }
        }
        match cursor {
            Cpt::Leaf(entries) if !entries.is_empty() => Some(entries),
            _ => None,
        }
    }

    /// Collects, per parent level, the union of parent values that lie on a
    /// non-wildcard path ending in any of `wanted`.
    fn paths_to(&self, wanted: &[String]) -> Vec<Vec<String>> {
        let mut levels: Vec<Vec<String>> = vec![Vec::new(); self.parents.len()];
        let mut stack: Vec<String> = Vec::new();
        fn recurse(
            cpt: &Cpt,
            wanted: &[String],
            stack: &mut Vec<String>,
            levels: &mut [Vec<String>],
        ) {
            match cpt {
                Cpt::Leaf(entries) => {
                    if entries.iter().any(|(v, _)| wanted.iter().any(|w| w == v)) {
                        for (level, value) in stack.iter().enumerate() {
                            if !levels[level].contains(value) {
                                levels[level].push(value.clone());
                            }
                        }
                    }
                }
                Cpt::Branch { deeper, .. } => {
                    // Deterministic traversal order so induced sets are stable.
                    let mut keys: Vec<&String> = deeper.keys().collect();
                    keys.sort();
                    for key in keys {
                        stack.push(key.clone());
                        recurse(&deeper[key], wanted, stack, levels);
                        stack.pop();
                    }
                }
            }
        }
        recurse(&self.cpt, wanted, &mut stack, &mut levels);
        levels
    }
}

/// An immutable, validated network of attribute nodes in sampling order
/// (parents strictly precede children).
#[derive(Debug, Clone)]
pub struct Network {
    nodes: Vec<Node>,
    by_name: HashMap<String, usize>,
}

impl Network {
    /// Loads a network from a `.json` artifact or a `.zip` archive holding
    /// one JSON document.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        if path.extension().is_some_and(|ext| ext == "zip") {
            let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))?;
            let name = archive
                .file_names()
                .find(|name| name.ends_with(".json"))
                .map(str::to_string)
                .ok_or_else(|| ForgeprintError::ModelLoad {
                    node: "<archive>".into(),
                    reason: "no JSON document found in model archive".into(),
                })?;
            let mut file = archive.by_name(&name)?;
            let mut json = Vec::new();
            file.read_to_end(&mut json)?;
            Self::from_slice(&json)
        } else {
            Self::from_slice(&bytes)
        }
    }

    /// Parses a network from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let root: Value = serde_json::from_slice(bytes)?;
        Self::from_value(&root)
    }

    fn from_value(root: &Value) -> Result<Self> {
        let defs = root
            .get("nodes")
            .and_then(Value::as_array)
            .ok_or_else(|| ForgeprintError::ModelLoad {
                node: "<root>".into(),
                reason: "model definition has no 'nodes' array".into(),
            })?;

        let mut nodes = Vec::with_capacity(defs.len());
        let mut by_name = HashMap::new();
        for def in defs {
            let name = def
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| ForgeprintError::ModelLoad {
                    node: "<unnamed>".into(),
                    reason: "node definition is missing 'name'".into(),
                })?
                .to_string();
            let parents = string_array(def.get("parentNames"), &name, "parentNames")?;
            let possible_values = string_array(def.get("possibleValues"), &name, "possibleValues")?;
            let cpt = Cpt::from_value(
                def.get("conditionalProbabilities")
                    .unwrap_or(&Value::Null),
                &name,
            )?;
            if by_name.contains_key(&name) {
                return Err(ForgeprintError::ModelLoad {
                    node: name,
                    reason: "duplicate node definition".into(),
                });
            }
            by_name.insert(name.clone(), nodes.len());
            nodes.push(Node {
                name,
                parents,
                possible_values,
                cpt,
            });
        }

        let network = Network { nodes, by_name };
        network.validate()?;
        debug!(nodes = network.nodes.len(), "loaded model network");
        Ok(network)
    }

    /// Structural integrity checks. Declaration order doubles as the
    /// sampling order, so every parent referencing a later (or missing) node
    /// is rejected, which also rules out cycles.
    fn validate(&self) -> Result<()> {
        for (index, node) in self.nodes.iter().enumerate() {
            if node.possible_values.is_empty() {
                return Err(ForgeprintError::ModelLoad {
                    node: node.name.clone(),
                    reason: "empty value catalog".into(),
                });
            }
            for parent in &node.parents {
                match self.by_name.get(parent) {
                    Some(&parent_index) if parent_index < index => {}
                    Some(_) => {
                        return Err(ForgeprintError::ModelLoad {
                            node: node.name.clone(),
                            reason: format!("parent '{parent}' is declared after its child"),
                        })
                    }
                    None => {
                        return Err(ForgeprintError::ModelLoad {
                            node: node.name.clone(),
                            reason: format!("referenced parent '{parent}' does not exist"),
                        })
                    }
                }
            }
            self.validate_cpt(node, &node.cpt, 0)?;
        }
        Ok(())
    }

    /// Closed-world check: every branch key must be a value its parent can
    /// actually produce, and every leaf value must be in the node's own
    /// catalog.
    fn validate_cpt(&self, node: &Node, cpt: &Cpt, level: usize) -> Result<()> {
        match cpt {
            Cpt::Leaf(entries) => {
                for (value, _) in entries {
                    if !node.possible_values.contains(value) {
                        return Err(ForgeprintError::ModelLoad {
                            node: node.name.clone(),
                            reason: format!("CPT value '{value}' is not in the value catalog"),
                        });
                    }
                }
            }
            Cpt::Branch { deeper, skip } => {
                let parent = node.parents.get(level).and_then(|p| self.node(p));
                for (key, sub) in deeper {
                    match parent {
                        Some(parent) if parent.possible_values.contains(key) => {}
                        Some(parent) => {
                            return Err(ForgeprintError::ModelLoad {
                                node: node.name.clone(),
                                reason: format!(
                                    "CPT key '{key}' is not produced by parent '{}'",
                                    parent.name
                                ),
                            })
                        }
                        None => {
                            return Err(ForgeprintError::ModelLoad {
                                node: node.name.clone(),
                                reason: "CPT is deeper than the declared parent list".into(),
                            })
                        }
                    }
                    self.validate_cpt(node, sub, level + 1)?;
                }
                if let Some(skip) = skip {
                    self.validate_skip(node, skip)?;
                }
            }
        }
        Ok(())
    }

    /// Wildcard branches may collapse any number of remaining levels, so
    /// only their leaf values are checked.
    fn validate_skip(&self, node: &Node, cpt: &Cpt) -> Result<()> {
        match cpt {
            Cpt::Leaf(entries) => {
                for (value, _) in entries {
                    if !node.possible_values.contains(value) {
                        return Err(ForgeprintError::ModelLoad {
                            node: node.name.clone(),
                            reason: format!("CPT value '{value}' is not in the value catalog"),
                        });
                    }
                }
            }
            Cpt::Branch { deeper, skip } => {
                for sub in deeper.values() {
                    self.validate_skip(node, sub)?;
                }
                if let Some(skip) = skip {
                    self.validate_skip(node, skip)?;
                }
            }
        }
        Ok(())
    }

    /// Nodes in sampling order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.by_name.get(name).map(|&index| &self.nodes[index])
    }

    /// Extends per-node allowed-value sets with the values **induced** on
    /// their parents by the network structure: a parent value stays allowed
    /// only if some non-wildcard CPT path through it ends in an allowed
    /// child value. Induced sets for the same node are intersected across
    /// constraints; an empty intersection means the constraints contradict
    /// each other.
    pub(crate) fn induced_values(
        &self,
        constraints: &[(String, Vec<String>)],
    ) -> Result<HashMap<String, Vec<String>>> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for (name, allowed) in constraints {
            if allowed.is_empty() {
                return Err(ForgeprintError::Validation(
                    "the current constraints are too restrictive: no possible values remain"
                        .into(),
                ));
            }
            let node = self.node(name).ok_or_else(|| {
                ForgeprintError::Validation(format!("unknown model attribute '{name}'"))
            })?;
            let levels = node.paths_to(allowed);
            let mut induced: Vec<(&str, Vec<String>)> = node
                .parents
                .iter()
                .zip(levels)
                .filter(|(_, values)| !values.is_empty())
                .map(|(parent, values)| (parent.as_str(), values))
                .collect();
            induced.push((name.as_str(), allowed.clone()));

            for (key, values) in induced {
                match result.get_mut(key) {
                    Some(existing) => {
                        existing.retain(|v| values.contains(v));
                        if existing.is_empty() {
                            return Err(ForgeprintError::Validation(
                                "the current constraints are too restrictive: no possible \
                                 values remain"
                                    .into(),
                            ));
                        }
                    }
                    None => {
                        result.insert(key.to_string(), values);
                    }
                }
            }
        }
        Ok(result)
    }
}

fn string_array(value: Option<&Value>, node: &str, field: &str) -> Result<Vec<String>> {
    match value {
        None => Ok(Vec::new()),
        Some(value) => value
            .as_array()
            .ok_or_else(|| ForgeprintError::ModelLoad {
                node: node.to_string(),
                reason: format!("'{field}' must be an array of strings"),
            })?
            .iter()
            .map(|entry| {
                entry
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ForgeprintError::ModelLoad {
                        node: node.to_string(),
                        reason: format!("'{field}' must be an array of strings"),
                    })
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn tiny_network_json() -> &'static str {
        r#"{"nodes":[
            {"name":"os","parentNames":[],"possibleValues":["linux","macos"],
             "conditionalProbabilities":{"linux":0.4,"macos":0.6}},
            {"name":"browser","parentNames":["os"],"possibleValues":["chrome","safari"],
             "conditionalProbabilities":{
                "deeper":{"linux":{"chrome":1.0},"macos":{"chrome":0.5,"safari":0.5}},
                "skip":{"chrome":1.0}}}
        ]}"#
    }

    #[test]
    fn parses_a_minimal_network() {
        let network = Network::from_slice(tiny_network_json().as_bytes()).unwrap();
        assert_eq!(network.nodes().len(), 2);
        assert_eq!(network.node("browser").unwrap().parent_names(), ["os"]);
    }

    #[test]
    fn rejects_missing_parent() {
        let json = r#"{"nodes":[
            {"name":"browser","parentNames":["os"],"possibleValues":["chrome"],
             "conditionalProbabilities":{"chrome":1.0}}
        ]}"#;
        let err = Network::from_slice(json.as_bytes()).unwrap_err();
        match err {
            ForgeprintError::ModelLoad { node, reason } => {
                assert_eq!(node, "browser");
                assert!(reason.contains("does not exist"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_empty_value_catalog() {
        let json = r#"{"nodes":[
            {"name":"os","parentNames":[],"possibleValues":[],
             "conditionalProbabilities":{}}
        ]}"#;
        assert!(matches!(
            Network::from_slice(json.as_bytes()),
            Err(ForgeprintError::ModelLoad { .. })
        ));
    }

    #[test]
    fn rejects_cpt_key_outside_parent_catalog() {
        let json = r#"{"nodes":[
            {"name":"os","parentNames":[],"possibleValues":["linux"],
             "conditionalProbabilities":{"linux":1.0}},
            {"name":"browser","parentNames":["os"],"possibleValues":["chrome"],
             "conditionalProbabilities":{"deeper":{"beos":{"chrome":1.0}}}}
        ]}"#;
        assert!(matches!(
            Network::from_slice(json.as_bytes()),
            Err(ForgeprintError::ModelLoad { .. })
        ));
    }

    #[test]
    fn wildcard_branch_backs_unseen_combinations() {
        let network = Network::from_slice(tiny_network_json().as_bytes()).unwrap();
        let node = network.node("browser").unwrap();
        let mut assignment = Assignment::default();
        assignment.insert("os", "freebsd");
        let dist = node.distribution(&assignment).unwrap();
        assert_eq!(dist, [("chrome".to_string(), 1.0)]);
    }

    #[test]
    fn induced_values_walk_up_to_parents() {
        let network = Network::from_slice(tiny_network_json().as_bytes()).unwrap();
        let induced = network
            .induced_values(&[("browser".into(), vec!["safari".into()])])
            .unwrap();
        assert_eq!(induced["os"], ["macos"]);
        assert_eq!(induced["browser"], ["safari"]);
    }

    #[test]
    fn induced_values_reject_contradictions() {
        let network = Network::from_slice(tiny_network_json().as_bytes()).unwrap();
        let err = network
            .induced_values(&[
                ("browser".into(), vec!["safari".into()]),
                ("os".into(), vec!["linux".into()]),
            ])
            .unwrap_err();
        assert!(matches!(err, ForgeprintError::Validation(_)));
    }

    #[test]
    fn loads_from_zip_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.zip");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        writer.start_file("model.json", options).unwrap();
        writer.write_all(tiny_network_json().as_bytes()).unwrap();
        writer.finish().unwrap();

        let network = Network::from_path(&path).unwrap();
        assert_eq!(network.nodes().len(), 2);
    }

    #[test]
    fn bundled_networks_parse_and_validate() {
        assert!(input_network().is_ok());
        assert!(header_network().is_ok());
        assert!(fingerprint_network().is_ok());
    }
}
