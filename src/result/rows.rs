//! @ai:module:intent Tabular rows produced from resample and benchmark results
//! @ai:module:layer domain
//! @ai:module:public_api ScoreRow, AggregateRow, ConditionRow, RankRow, Scores
//! @ai:module:stateless true

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Measure id to score; NaN means the score could not be computed.
pub type Scores = BTreeMap<String, f64>;

/// JSON has no NaN, so undefined scores travel as `null`.
mod nan_as_null {
    use super::*;

    pub fn serialize<S: Serializer>(scores: &Scores, serializer: S) -> Result<S::Ok, S::Error> {
        let mapped: BTreeMap<&String, Option<f64>> = scores
            .iter()
            .map(|(k, v)| (k, if v.is_nan() { None } else { Some(*v) }))
            .collect();
        mapped.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Scores, D::Error> {
        let raw: BTreeMap<String, Option<f64>> = BTreeMap::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(k, v)| (k, v.unwrap_or(f64::NAN)))
            .collect())
    }
}

/// @ai:intent Scores of one resampling iteration with its provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub uhash: String,
    pub task_id: String,
    pub learner_id: String,
    pub resampling_id: String,
    pub iteration: usize,
    #[serde(with = "nan_as_null")]
    pub scores: Scores,
}

/// @ai:intent Aggregated scores of one resample result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub nr: usize,
    pub uhash: String,
    pub task_id: String,
    pub learner_id: String,
    pub resampling_id: String,
    pub iters: usize,
    #[serde(with = "nan_as_null")]
    pub scores: Scores,
    pub warnings: usize,
    pub errors: usize,
}

/// @ai:intent A captured warning or error with its origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionRow {
    pub uhash: String,
    pub task_id: String,
    pub learner_id: String,
    pub resampling_id: String,
    pub iteration: usize,
    pub message: String,
}

/// @ai:intent Rank of a learner on a task for one measure; 1 is best
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankRow {
    pub task_id: String,
    pub learner_id: String,
    pub resampling_id: String,
    pub measure: String,
    pub score: Option<f64>,
    pub rank: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_scores_round_trip_through_json() {
        let mut scores = Scores::new();
        scores.insert("classif.auc".to_string(), f64::NAN);
        scores.insert("classif.ce".to_string(), 0.25);
        let row = ScoreRow {
            uhash: "u".to_string(),
            task_id: "t".to_string(),
            learner_id: "l".to_string(),
            resampling_id: "cv".to_string(),
            iteration: 0,
            scores,
        };

        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains("null"));
        let back: ScoreRow = serde_json::from_str(&json).unwrap();
        assert!(back.scores["classif.auc"].is_nan());
        assert_eq!(back.scores["classif.ce"], 0.25);
    }
}
