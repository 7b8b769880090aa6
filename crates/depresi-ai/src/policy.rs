//! Feature encoding policy.
//!
//! Built once at startup by merging the fitted encoders with the hardcoded
//! fallback rules. Each categorical column gets exactly one tier: its fitted
//! encoder when the artifact has one, otherwise its fallback rule. The tiers
//! are never mixed within a column, so a value the fitted encoder has not
//! seen maps to code 0 rather than to whatever the fallback would say.

use std::borrow::Cow;

use depresi_core::schema::{
    self, DIETARY_HABITS, FAMILY_HISTORY, GENDER, SLEEP_DURATION, SUICIDAL_THOUGHTS,
};
use serde_json::Value;
use tracing::warn;

use crate::encoders::{EncoderTable, LabelEncoder};
use crate::error::{PolicyError, PredictError};

/// Code substituted for categories the fitted encoder never saw.
pub const UNKNOWN_CATEGORY_CODE: u32 = 0;

/// Hardcoded encoding for a column with no fitted encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackRule {
    /// 1 when the value equals `truthy` ignoring case, else 0. Requires a string.
    Flag { truthy: &'static str },
    /// Exact-match lookup; any other scalar gets `default`. Arrays and
    /// objects are rejected.
    Table {
        entries: &'static [(&'static str, u32)],
        default: u32,
    },
}

const SLEEP_DURATION_CODES: &[(&str, u32)] = &[
    ("less than 4 hours", 0),
    ("4-5 hours", 1),
    ("5-6 hours", 2),
    ("6-7 hours", 3),
    ("7-8 hours", 4),
    ("more than 8 hours", 5),
];

const DIETARY_HABIT_CODES: &[(&str, u32)] = &[("Unhealthy", 0), ("Average", 1), ("Healthy", 2)];

/// Fallback rule per categorical column. Must cover exactly the categorical
/// columns of the schema; [`EncodingPolicy::build`] enforces this.
pub const FALLBACK_RULES: &[(&str, FallbackRule)] = &[
    (GENDER, FallbackRule::Flag { truthy: "male" }),
    (
        SLEEP_DURATION,
        FallbackRule::Table {
            entries: SLEEP_DURATION_CODES,
            default: 2,
        },
    ),
    (
        DIETARY_HABITS,
        FallbackRule::Table {
            entries: DIETARY_HABIT_CODES,
            default: 1,
        },
    ),
    (SUICIDAL_THOUGHTS, FallbackRule::Flag { truthy: "yes" }),
    (FAMILY_HISTORY, FallbackRule::Flag { truthy: "yes" }),
];

impl FallbackRule {
    pub fn apply(&self, column: &'static str, value: &Value) -> Result<u32, PredictError> {
        match (self, value) {
            (Self::Flag { truthy }, Value::String(s)) => Ok(u32::from(s.to_lowercase() == *truthy)),
            (Self::Flag { .. }, other) => Err(PredictError::NotAString {
                field: column,
                value: other.to_string(),
            }),
            (Self::Table { entries, default }, Value::String(s)) => Ok(entries
                .iter()
                .find(|(k, _)| *k == s.as_str())
                .map_or(*default, |&(_, code)| code)),
            (Self::Table { .. }, Value::Array(_) | Value::Object(_)) => {
                Err(PredictError::NotAString {
                    field: column,
                    value: value.to_string(),
                })
            }
            (Self::Table { default, .. }, _) => Ok(*default),
        }
    }
}

/// A categorical value the fitted encoder has never seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory {
    pub column: &'static str,
    pub value: String,
}

/// Outcome of encoding one categorical value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub code: u32,
    /// Set when the code is the unknown-category substitute.
    pub warning: Option<UnknownCategory>,
}

impl Encoded {
    fn known(code: u32) -> Self {
        Self {
            code,
            warning: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Fitted,
    Fallback,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fitted => "fitted",
            Self::Fallback => "fallback",
        }
    }
}

/// The single encoding source chosen for one column.
#[derive(Debug, Clone)]
pub enum ColumnEncoding {
    Fitted(LabelEncoder),
    Fallback(FallbackRule),
}

impl ColumnEncoding {
    pub fn tier(&self) -> Tier {
        match self {
            Self::Fitted(_) => Tier::Fitted,
            Self::Fallback(_) => Tier::Fallback,
        }
    }

    pub fn encode(&self, column: &'static str, value: &Value) -> Result<Encoded, PredictError> {
        match self {
            Self::Fitted(encoder) => {
                let text = category_text(value);
                match encoder.transform(&text) {
                    Some(code) => Ok(Encoded::known(code)),
                    None => Ok(Encoded {
                        code: UNKNOWN_CATEGORY_CODE,
                        warning: Some(UnknownCategory {
                            column,
                            value: text.into_owned(),
                        }),
                    }),
                }
            }
            Self::Fallback(rule) => rule.apply(column, value).map(Encoded::known),
        }
    }
}

/// Encoders were fit on stringified columns, so non-strings are looked up
/// by their JSON text.
fn category_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        other => Cow::Owned(other.to_string()),
    }
}

/// Per-column encoding for every categorical column, in schema order.
#[derive(Debug, Clone)]
pub struct EncodingPolicy {
    columns: Vec<(&'static str, ColumnEncoding)>,
}

impl EncodingPolicy {
    /// Merge fitted encoders with [`FALLBACK_RULES`].
    pub fn build(encoders: EncoderTable) -> Result<Self, PolicyError> {
        Self::build_with(encoders, FALLBACK_RULES)
    }

    fn build_with(
        mut encoders: EncoderTable,
        fallbacks: &[(&'static str, FallbackRule)],
    ) -> Result<Self, PolicyError> {
        if let Some((stray, _)) = fallbacks.iter().find(|(c, _)| !schema::is_categorical(c)) {
            return Err(PolicyError::StrayFallback(stray.to_string()));
        }

        let mut columns = Vec::new();
        for column in schema::categorical_columns() {
            let fallback = fallbacks
                .iter()
                .find(|(c, _)| *c == column)
                .map(|&(_, rule)| rule)
                .ok_or_else(|| PolicyError::Uncovered(column.to_string()))?;

            let encoding = match encoders.take(column) {
                Some(encoder) => ColumnEncoding::Fitted(encoder),
                None => ColumnEncoding::Fallback(fallback),
            };
            columns.push((column, encoding));
        }

        for column in encoders.columns() {
            warn!(column, "ignoring label encoder for a non-categorical column");
        }

        Ok(Self { columns })
    }

    /// Categorical columns with their chosen encoding, in schema order.
    pub fn columns(&self) -> impl Iterator<Item = (&'static str, &ColumnEncoding)> {
        self.columns.iter().map(|(c, e)| (*c, e))
    }

    pub fn encoding(&self, column: &str) -> Option<&ColumnEncoding> {
        self.columns
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, e)| e)
    }

    /// Which tier each categorical column uses.
    pub fn tiers(&self) -> impl Iterator<Item = (&'static str, Tier)> + '_ {
        self.columns.iter().map(|(c, e)| (*c, e.tier()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fitted_encoders;
    use serde_json::json;

    fn fallback_policy() -> EncodingPolicy {
        EncodingPolicy::build(EncoderTable::empty()).unwrap()
    }

    fn fitted_policy() -> EncodingPolicy {
        let table = EncoderTable::from_json_str(&fitted_encoders().to_string()).unwrap();
        EncodingPolicy::build(table).unwrap()
    }

    fn encode(policy: &EncodingPolicy, column: &'static str, value: Value) -> Encoded {
        policy
            .encoding(column)
            .unwrap()
            .encode(column, &value)
            .unwrap()
    }

    #[test]
    fn fallback_rules_cover_categorical_columns_exactly() {
        let mut rule_cols: Vec<&str> = FALLBACK_RULES.iter().map(|(c, _)| *c).collect();
        let mut cat_cols: Vec<&str> = schema::categorical_columns().collect();
        rule_cols.sort();
        cat_cols.sort();
        assert_eq!(rule_cols, cat_cols);
    }

    #[test]
    fn empty_table_uses_fallback_everywhere() {
        let policy = fallback_policy();
        assert_eq!(policy.tiers().count(), 5);
        assert!(policy.tiers().all(|(_, t)| t == Tier::Fallback));
    }

    #[test]
    fn fitted_columns_override_fallback_per_column() {
        let table = EncoderTable::from_json_str(r#"{"Gender": ["Female", "Male"]}"#).unwrap();
        let policy = EncodingPolicy::build(table).unwrap();
        let tiers: Vec<(&str, Tier)> = policy.tiers().collect();
        assert_eq!(tiers[0], (GENDER, Tier::Fitted));
        assert!(tiers[1..].iter().all(|(_, t)| *t == Tier::Fallback));
    }

    #[test]
    fn encoders_for_numeric_columns_are_ignored() {
        let table = EncoderTable::from_json_str(r#"{"Age": ["18", "19"]}"#).unwrap();
        let policy = EncodingPolicy::build(table).unwrap();
        assert!(policy.encoding("Age").is_none());
        assert!(policy.tiers().all(|(_, t)| t == Tier::Fallback));
    }

    #[test]
    fn missing_fallback_fails_build() {
        let err = EncodingPolicy::build_with(EncoderTable::empty(), &FALLBACK_RULES[..4])
            .unwrap_err();
        assert!(matches!(err, PolicyError::Uncovered(c) if c == FAMILY_HISTORY));
    }

    #[test]
    fn missing_fallback_fails_even_with_fitted_encoder() {
        let table = EncoderTable::from_json_str(&fitted_encoders().to_string()).unwrap();
        let err = EncodingPolicy::build_with(table, &FALLBACK_RULES[1..]).unwrap_err();
        assert!(matches!(err, PolicyError::Uncovered(c) if c == GENDER));
    }

    #[test]
    fn stray_fallback_fails_build() {
        let mut rules = FALLBACK_RULES.to_vec();
        rules.push(("CGPA", FallbackRule::Flag { truthy: "high" }));
        let err = EncodingPolicy::build_with(EncoderTable::empty(), &rules).unwrap_err();
        assert!(matches!(err, PolicyError::StrayFallback(c) if c == "CGPA"));
    }

    #[test]
    fn fallback_sleep_duration() {
        let policy = fallback_policy();
        assert_eq!(encode(&policy, SLEEP_DURATION, json!("6-7 hours")).code, 3);
        assert_eq!(encode(&policy, SLEEP_DURATION, json!("less than 4 hours")).code, 0);
        assert_eq!(encode(&policy, SLEEP_DURATION, json!("more than 8 hours")).code, 5);
        // Exact match only.
        assert_eq!(encode(&policy, SLEEP_DURATION, json!("6-7 Hours")).code, 2);
        assert_eq!(encode(&policy, SLEEP_DURATION, json!("ten hours")).code, 2);
        assert_eq!(encode(&policy, SLEEP_DURATION, json!(7)).code, 2);
        assert_eq!(encode(&policy, SLEEP_DURATION, json!(null)).code, 2);
    }

    #[test]
    fn fallback_table_rejects_containers() {
        let policy = fallback_policy();
        for (column, value) in [
            (SLEEP_DURATION, json!(["6-7 hours"])),
            (DIETARY_HABITS, json!({"kind": "Healthy"})),
        ] {
            let err = policy
                .encoding(column)
                .unwrap()
                .encode(column, &value)
                .unwrap_err();
            assert!(
                matches!(err, PredictError::NotAString { field, .. } if field == column),
                "{column}: {err:?}"
            );
        }
    }

    #[test]
    fn fallback_dietary_habits() {
        let policy = fallback_policy();
        assert_eq!(encode(&policy, DIETARY_HABITS, json!("Unhealthy")).code, 0);
        assert_eq!(encode(&policy, DIETARY_HABITS, json!("Healthy")).code, 2);
        assert_eq!(encode(&policy, DIETARY_HABITS, json!("Moderate")).code, 1);
    }

    #[test]
    fn fallback_flags_ignore_case() {
        let policy = fallback_policy();
        assert_eq!(encode(&policy, GENDER, json!("MALE")).code, 1);
        assert_eq!(encode(&policy, GENDER, json!("Female")).code, 0);
        assert_eq!(encode(&policy, GENDER, json!("Other")).code, 0);
        assert_eq!(encode(&policy, SUICIDAL_THOUGHTS, json!("Yes")).code, 1);
        assert_eq!(encode(&policy, FAMILY_HISTORY, json!("no")).code, 0);
        assert!(encode(&policy, FAMILY_HISTORY, json!("yes")).warning.is_none());
    }

    #[test]
    fn fallback_flag_requires_string() {
        let policy = fallback_policy();
        let err = policy
            .encoding(GENDER)
            .unwrap()
            .encode(GENDER, &json!(1))
            .unwrap_err();
        assert!(matches!(err, PredictError::NotAString { field: GENDER, .. }));
    }

    #[test]
    fn fitted_encoder_codes() {
        let policy = fitted_policy();
        assert!(policy.tiers().all(|(_, t)| t == Tier::Fitted));
        assert_eq!(encode(&policy, GENDER, json!("Male")).code, 1);
        assert_eq!(encode(&policy, DIETARY_HABITS, json!("Moderate")).code, 1);
        assert_eq!(encode(&policy, SUICIDAL_THOUGHTS, json!("Yes")).code, 1);
    }

    #[test]
    fn unknown_category_substitutes_zero_with_warning() {
        let policy = fitted_policy();
        let encoded = encode(&policy, GENDER, json!("Other"));
        assert_eq!(encoded.code, UNKNOWN_CATEGORY_CODE);
        assert_eq!(
            encoded.warning,
            Some(UnknownCategory {
                column: GENDER,
                value: "Other".into()
            })
        );
    }

    #[test]
    fn fitted_column_never_consults_fallback() {
        let policy = fitted_policy();
        // The fallback would give "male" → 1; the fitted encoder only knows "Male".
        let encoded = encode(&policy, GENDER, json!("male"));
        assert_eq!(encoded.code, 0);
        assert!(encoded.warning.is_some());
    }

    #[test]
    fn fitted_lookup_uses_json_text_for_non_strings() {
        let table = EncoderTable::from_json_str(r#"{"Dietary Habits": ["1", "2"]}"#).unwrap();
        let policy = EncodingPolicy::build(table).unwrap();
        assert_eq!(encode(&policy, DIETARY_HABITS, json!(2)).code, 1);
    }
}
