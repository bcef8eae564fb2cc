//! @ai:module:intent Lookup of built-in learners by id
//! @ai:module:layer domain
//! @ai:module:public_api lrn, lrns, learner_ids
//! @ai:module:stateless true

use crate::error::{Error, Result};
use crate::learner::base::{Algorithm, Learner};
use crate::learner::debug::{DebugClassif, DebugRegr};
use crate::learner::featureless::{FeaturelessClassif, FeaturelessRegr};
use crate::learner::kaplan::KaplanMeier;
use crate::learner::knn::{KnnClassif, KnnRegr};
use std::sync::Arc;

const LEARNERS: [&str; 8] = [
    "classif.debug",
    "classif.featureless",
    "classif.kknn",
    "regr.debug",
    "regr.featureless",
    "regr.kknn",
    "surv.featureless",
    "surv.kaplan",
];

/// @ai:intent Ids accepted by `lrn`, sorted
pub fn learner_ids() -> &'static [&'static str] {
    &LEARNERS
}

/// @ai:intent Construct a fresh, untrained learner with default parameters
/// @ai:effects pure
pub fn lrn(id: &str) -> Result<Learner> {
    let algorithm: Arc<dyn Algorithm> = match id {
        "classif.debug" => Arc::new(DebugClassif),
        "classif.featureless" => Arc::new(FeaturelessClassif),
        "classif.kknn" => Arc::new(KnnClassif),
        "regr.debug" => Arc::new(DebugRegr),
        "regr.featureless" => Arc::new(FeaturelessRegr),
        "regr.kknn" => Arc::new(KnnRegr),
        "surv.featureless" | "surv.kaplan" => Arc::new(KaplanMeier),
        other => return Err(Error::unknown("learner", other)),
    };
    Ok(Learner::new(id, algorithm))
}

pub fn lrns(ids: &[&str]) -> Result<Vec<Learner>> {
    ids.iter().map(|id| lrn(id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskType;

    #[test]
    fn test_every_listed_id_resolves() {
        for id in learner_ids() {
            let learner = lrn(id).unwrap();
            assert_eq!(learner.id(), *id);
            assert!(id.starts_with(learner.task_type().as_str()));
        }
    }

    #[test]
    fn test_unknown_learner() {
        assert!(matches!(lrn("classif.ranger"), Err(Error::UnknownId { .. })));
        assert!(lrns(&["regr.kknn", "nope"]).is_err());
    }

    #[test]
    fn test_survival_alias() {
        let learner = lrn("surv.featureless").unwrap();
        assert_eq!(learner.task_type(), TaskType::Surv);
    }
}
