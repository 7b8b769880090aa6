//! In-memory artifacts for tests: a two-stump booster, a standard scaler,
//! and the reference student record.

use depresi_core::FeatureRecord;
use depresi_core::schema::feature_names;
use serde_json::{Value, json};

use crate::encoders::EncoderTable;
use crate::policy::EncodingPolicy;
use crate::predictor::Predictor;
use crate::scaler::Scaler;
use crate::xgboost::GradientBoostedClassifier;

/// One split on `feature` with two leaves, in XGBoost's array layout.
pub fn stump_tree(
    id: usize,
    feature: usize,
    threshold: f32,
    leaves: [f32; 2],
    default_left: bool,
) -> Value {
    json!({
        "base_weights": [0.0, leaves[0], leaves[1]],
        "categories": [],
        "categories_nodes": [],
        "categories_segments": [],
        "categories_sizes": [],
        "default_left": [u8::from(default_left), 0, 0],
        "id": id,
        "left_children": [1, -1, -1],
        "loss_changes": [1.0, 0.0, 0.0],
        "parents": [2147483647, 0, 0],
        "right_children": [2, -1, -1],
        "split_conditions": [threshold, leaves[0], leaves[1]],
        "split_indices": [feature, 0, 0],
        "split_type": [0, 0, 0],
        "sum_hessian": [10.0, 5.0, 5.0],
        "tree_param": {
            "num_deleted": "0",
            "num_feature": "13",
            "num_nodes": "3",
            "size_leaf_vector": "1"
        }
    })
}

/// Wrap trees in a complete XGBoost JSON document.
pub fn model_document(trees: Vec<Value>, objective: &str, base_score: Value) -> Value {
    let n = trees.len();
    json!({
        "version": [2, 0, 3],
        "learner": {
            "attributes": {},
            "feature_names": feature_names().collect::<Vec<_>>(),
            "feature_types": [],
            "gradient_booster": {
                "name": "gbtree",
                "model": {
                    "gbtree_model_param": {
                        "num_parallel_tree": "1",
                        "num_trees": n.to_string()
                    },
                    "iteration_indptr": (0..=n).collect::<Vec<_>>(),
                    "tree_info": vec![0; n],
                    "trees": trees
                }
            },
            "learner_model_param": {
                "base_score": base_score,
                "boost_from_average": "1",
                "num_class": "0",
                "num_feature": "13",
                "num_target": "1"
            },
            "objective": {
                "name": objective,
                "reg_loss_param": { "scale_pos_weight": "1" }
            }
        }
    })
}

/// Two stumps: suicidal thoughts (column 9) and academic pressure (column 2),
/// both on scaled values.
pub fn stump_model() -> Value {
    model_document(
        vec![
            stump_tree(0, 9, 0.5, [-0.8, 0.9], true),
            stump_tree(1, 2, 0.0, [-0.3, 0.4], false),
        ],
        "binary:logistic",
        json!("5E-1"),
    )
}

pub const SCALER_MEAN: [f64; 13] = [
    0.5, 20.0, 3.0, 0.0, 7.0, 3.0, 0.0, 2.5, 1.0, 0.5, 6.0, 3.0, 0.5,
];
pub const SCALER_SCALE: [f64; 13] = [
    0.5, 5.0, 1.5, 1.0, 1.5, 1.5, 1.0, 1.5, 0.8, 0.5, 3.0, 1.4, 0.5,
];

pub fn standard_scaler() -> Value {
    json!({
        "kind": "standard",
        "mean": SCALER_MEAN,
        "scale": SCALER_SCALE,
        "feature_names_in": feature_names().collect::<Vec<_>>()
    })
}

/// Encoders as `LabelEncoder.classes_` would export them.
pub fn fitted_encoders() -> Value {
    json!({
        "Gender": ["Female", "Male"],
        "Sleep Duration": ["'Less than 5 Hours'", "'5-6 hours'", "'7-8 hours'", "'More than 8 hours'", "Others"],
        "Dietary Habits": ["Healthy", "Moderate", "Others", "Unhealthy"],
        "Have you ever had suicidal thoughts ?": ["No", "Yes"],
        "Family History of Mental Illness": ["No", "Yes"]
    })
}

/// The reference record used throughout the API documentation.
pub fn sample_record() -> FeatureRecord {
    let value = json!({
        "Gender": "Male",
        "Age": 33.0,
        "Academic Pressure": 5.0,
        "Work Pressure": 0.0,
        "CGPA": 8.97,
        "Study Satisfaction": 2.0,
        "Job Satisfaction": 0.0,
        "Sleep Duration": "5-6 hours",
        "Dietary Habits": "Healthy",
        "Have you ever had suicidal thoughts ?": "Yes",
        "Work/Study Hours": 3.0,
        "Financial Stress": 1.0,
        "Family History of Mental Illness": "No"
    });
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

/// Predictor over the stump model and standard scaler.
pub fn fixture_predictor(encoders: EncoderTable) -> Predictor {
    let classifier = GradientBoostedClassifier::from_json_str(&stump_model().to_string())
        .expect("fixture model must load");
    let scaler =
        Scaler::from_json_str(&standard_scaler().to_string()).expect("fixture scaler must load");
    let policy = EncodingPolicy::build(encoders).expect("fixture policy must build");
    Predictor::new(classifier, scaler, policy)
}
