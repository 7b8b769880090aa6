//! Gradient-boosted tree classifier loaded from XGBoost's JSON model format.
//!
//! Reads the document written by `Booster.save_model("model.json")`. Only
//! `gbtree` boosters with numeric splits and a binary objective
//! (`binary:logistic`, `binary:logitraw`) are accepted; anything else is
//! rejected at load time so a wrong artifact never reaches request handling.
//!
//! Evaluation follows XGBoost: features are compared as `f32`, a missing
//! (`NaN`) feature follows the node's default direction, and a sample goes
//! left when `value < split_condition`.

use std::collections::HashMap;
use std::path::Path;

use depresi_core::NUM_FEATURES;
use depresi_core::schema;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info};

use crate::artifact::read_artifact;
use crate::error::{ArtifactError, PredictError};
use crate::predictor::BinaryClassifier;

// ── JSON document ──

#[derive(Debug, Deserialize)]
struct ModelFile {
    #[serde(default)]
    version: Vec<u32>,
    learner: Learner,
}

#[derive(Debug, Deserialize)]
struct Learner {
    #[serde(default)]
    attributes: HashMap<String, String>,
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: GradientBooster,
    objective: ObjectiveSpec,
    learner_model_param: LearnerModelParam,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
enum GradientBooster {
    Gbtree {
        model: GbTreeModel,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
struct GbTreeModel {
    gbtree_model_param: GbTreeModelParam,
    trees: Vec<TreeSpec>,
}

#[derive(Debug, Deserialize)]
struct GbTreeModelParam {
    #[serde(default = "one", deserialize_with = "int_any")]
    num_parallel_tree: i64,
}

#[derive(Debug, Deserialize)]
struct ObjectiveSpec {
    name: String,
}

#[derive(Debug, Deserialize)]
struct LearnerModelParam {
    #[serde(deserialize_with = "base_score_any")]
    base_score: f64,
    #[serde(default, deserialize_with = "int_any")]
    num_class: i64,
    #[serde(default, deserialize_with = "int_any")]
    num_feature: i64,
}

#[derive(Debug, Deserialize)]
struct TreeSpec {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f32>,
    #[serde(deserialize_with = "flags_any")]
    default_left: Vec<bool>,
    #[serde(default)]
    split_type: Vec<i32>,
}

fn one() -> i64 {
    1
}

/// `base_score` appears as `0.5`, `"5E-1"`, `[0.5]` or `"[5E-1]"` depending
/// on the XGBoost version that wrote the file.
fn base_score_any<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let mut cur = Value::deserialize(deserializer)?;
    loop {
        match cur {
            Value::Number(n) => {
                return n
                    .as_f64()
                    .ok_or_else(|| Error::custom("invalid base_score number"));
            }
            Value::String(s) => {
                let t = s.trim();
                let inner = t
                    .strip_prefix('[')
                    .and_then(|rest| rest.strip_suffix(']'))
                    .unwrap_or(t);
                let first = inner.split(',').next().unwrap_or("").trim();
                return first
                    .parse()
                    .map_err(|_| Error::custom(format!("cannot parse base_score from {s:?}")));
            }
            Value::Array(arr) => {
                cur = arr
                    .into_iter()
                    .next()
                    .ok_or_else(|| Error::custom("empty base_score array"))?;
            }
            _ => return Err(Error::custom("base_score must be a number, string or array")),
        }
    }
}

/// Integers are written as strings by `LearnerModelParam::ToJson`.
fn int_any<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| Error::custom(format!("expected an integer, got {n}"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| Error::custom(format!("expected an integer, got {s:?}"))),
        other => Err(Error::custom(format!("expected an integer, got {other}"))),
    }
}

/// `default_left` is `[0, 1, ...]` in JSON models but booleans elsewhere.
fn flags_any<'de, D>(deserializer: D) -> Result<Vec<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let values = Vec::<Value>::deserialize(deserializer)?;
    values
        .into_iter()
        .map(|v| match v {
            Value::Bool(b) => Ok(b),
            Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
            Value::String(s) => match s.trim() {
                "1" | "true" => Ok(true),
                "0" | "false" => Ok(false),
                _ => Err(Error::custom(format!("cannot parse flag from {s:?}"))),
            },
            other => Err(Error::custom(format!("cannot parse flag from {other}"))),
        })
        .collect()
}

// ── Trees ──

const LEAF: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
struct Node {
    left: u32,
    right: u32,
    feature: u32,
    /// Split threshold for internal nodes, leaf value for leaves.
    value: f32,
    default_left: bool,
}

impl Node {
    fn is_leaf(&self) -> bool {
        self.left == LEAF
    }
}

/// A single regression tree in flat array form. Node 0 is the root.
#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn from_spec(spec: TreeSpec, tree: usize, num_features: usize) -> Result<Self, ArtifactError> {
        let invalid = |reason: String| ArtifactError::Invalid(format!("tree {tree}: {reason}"));

        let n = spec.left_children.len();
        if n == 0 {
            return Err(invalid("no nodes".into()));
        }
        if spec.right_children.len() != n
            || spec.split_indices.len() != n
            || spec.split_conditions.len() != n
            || spec.default_left.len() != n
        {
            return Err(invalid("node arrays have different lengths".into()));
        }
        if spec.split_type.iter().any(|&t| t != 0) {
            return Err(invalid("categorical splits are not supported".into()));
        }

        let child = |raw: i32, node: usize| -> Result<u32, ArtifactError> {
            match usize::try_from(raw) {
                Ok(c) if c < n && c != node => Ok(c as u32),
                _ => Err(invalid(format!("node {node} has invalid child {raw}"))),
            }
        };

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let value = spec.split_conditions[i];
            if spec.left_children[i] == -1 {
                nodes.push(Node {
                    left: LEAF,
                    right: LEAF,
                    feature: 0,
                    value,
                    default_left: false,
                });
                continue;
            }

            let feature = spec.split_indices[i];
            if feature < 0 || feature as usize >= num_features {
                return Err(invalid(format!(
                    "node {i} splits on feature {feature}, model has {num_features}"
                )));
            }
            nodes.push(Node {
                left: child(spec.left_children[i], i)?,
                right: child(spec.right_children[i], i)?,
                feature: feature as u32,
                value,
                default_left: spec.default_left[i],
            });
        }

        Ok(Self { nodes })
    }

    #[cfg(test)]
    fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Walk from the root to a leaf and return its value.
    ///
    /// `row` must hold at least as many features as the model was validated
    /// against.
    pub fn leaf_value(&self, row: &[f32]) -> Result<f32, PredictError> {
        let mut idx = 0usize;
        // A well-formed tree reaches a leaf in fewer steps than it has nodes.
        for _ in 0..self.nodes.len() {
            let node = &self.nodes[idx];
            if node.is_leaf() {
                return Ok(node.value);
            }
            let x = row[node.feature as usize];
            let go_left = if x.is_nan() {
                node.default_left
            } else {
                x < node.value
            };
            idx = (if go_left { node.left } else { node.right }) as usize;
        }
        Err(PredictError::Inference(
            "tree traversal did not reach a leaf".into(),
        ))
    }
}

// ── Classifier ──

/// How the summed margin relates to the stored `base_score`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// `base_score` is a probability; the base margin is its logit.
    Logistic,
    /// `base_score` is already a margin.
    LogitRaw,
}

/// Binary gradient-boosted tree ensemble.
#[derive(Debug, Clone)]
pub struct GradientBoostedClassifier {
    trees: Vec<RegressionTree>,
    base_margin: f32,
    objective: Objective,
}

impl GradientBoostedClassifier {
    /// Load an XGBoost JSON model from disk.
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let text = read_artifact(path)?;
        let model = Self::from_json_str(&text)?;
        info!(
            path = %path.display(),
            trees = model.trees.len(),
            objective = ?model.objective,
            "loaded gradient-boosted classifier"
        );
        Ok(model)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ArtifactError> {
        let file: ModelFile = serde_json::from_str(json)?;
        let learner = file.learner;

        let objective = match learner.objective.name.as_str() {
            "binary:logistic" => Objective::Logistic,
            "binary:logitraw" => Objective::LogitRaw,
            other => {
                return Err(ArtifactError::Invalid(format!(
                    "unsupported objective {other:?}, expected binary:logistic or binary:logitraw"
                )));
            }
        };

        let param = &learner.learner_model_param;
        if param.num_class > 1 {
            return Err(ArtifactError::Invalid(format!(
                "multi-class model (num_class = {}) cannot serve a binary label",
                param.num_class
            )));
        }
        if param.num_feature != 0 && param.num_feature != NUM_FEATURES as i64 {
            return Err(ArtifactError::Invalid(format!(
                "model expects {} features, schema has {NUM_FEATURES}",
                param.num_feature
            )));
        }
        if !learner.feature_names.is_empty()
            && let Some(pos) = schema::first_mismatch(&learner.feature_names)
        {
            return Err(ArtifactError::Invalid(format!(
                "model feature_names disagree with the schema at column {pos}"
            )));
        }

        let base_margin = match objective {
            Objective::Logistic => logit(param.base_score)?,
            Objective::LogitRaw => param.base_score as f32,
        };

        let GradientBooster::Gbtree { model } = learner.gradient_booster else {
            return Err(ArtifactError::Invalid(
                "only gbtree boosters are supported".into(),
            ));
        };

        let mut specs = model.trees;
        if let Some(limit) = tree_limit(
            &learner.attributes,
            model.gbtree_model_param.num_parallel_tree,
        ) {
            specs.truncate(limit);
        }

        let trees = specs
            .into_iter()
            .enumerate()
            .map(|(i, spec)| RegressionTree::from_spec(spec, i, NUM_FEATURES))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(version = ?file.version, "parsed XGBoost model document");

        Ok(Self {
            trees,
            base_margin,
            objective,
        })
    }

    #[cfg(test)]
    fn num_trees(&self) -> usize {
        self.trees.len()
    }

    #[cfg(test)]
    fn objective(&self) -> Objective {
        self.objective
    }

    /// Raw (pre-sigmoid) score for one feature vector.
    pub fn margin(&self, features: &[f64]) -> Result<f32, PredictError> {
        if features.len() != NUM_FEATURES {
            return Err(PredictError::Shape {
                expected: NUM_FEATURES,
                got: features.len(),
            });
        }
        let row: Vec<f32> = features.iter().map(|&x| x as f32).collect();

        let mut sum = self.base_margin;
        for tree in &self.trees {
            sum += tree.leaf_value(&row)?;
        }
        Ok(sum)
    }
}

impl BinaryClassifier for GradientBoostedClassifier {
    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2], PredictError> {
        let p1 = sigmoid(f64::from(self.margin(features)?));
        Ok([1.0 - p1, p1])
    }
}

/// Trees to keep when the model was trained with early stopping.
fn tree_limit(attributes: &HashMap<String, String>, num_parallel_tree: i64) -> Option<usize> {
    let best = attributes.get("best_iteration")?.trim().parse::<usize>().ok()?;
    Some((best + 1) * num_parallel_tree.max(1) as usize)
}

fn logit(p: f64) -> Result<f32, ArtifactError> {
    if !(p > 0.0 && p < 1.0) {
        return Err(ArtifactError::Invalid(format!(
            "base_score {p} is not a probability in (0, 1)"
        )));
    }
    Ok((p / (1.0 - p)).ln() as f32)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
