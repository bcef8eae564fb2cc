//! @ai:module:intent Lookup of built-in measures by id
//! @ai:module:layer domain
//! @ai:module:public_api msr, msrs, measure_ids, default_measure
//! @ai:module:stateless true

use crate::error::{Error, Result};
use crate::measure::classif::{ClassifMeasure, ClassifMetric};
use crate::measure::regr::{RegrMeasure, RegrMetric};
use crate::measure::surv::{CIndex, Graf};
use crate::measure::time::{TimeMeasure, TimePhase};
use crate::measure::Measure;
use crate::task::TaskType;
use std::sync::Arc;

const MEASURES: [&str; 16] = [
    "classif.acc",
    "classif.auc",
    "classif.bacc",
    "classif.bbrier",
    "classif.ce",
    "classif.logloss",
    "classif.mbrier",
    "regr.mae",
    "regr.mse",
    "regr.rmse",
    "regr.rsq",
    "surv.cindex",
    "surv.graf",
    "time_both",
    "time_predict",
    "time_train",
];

pub fn measure_ids() -> &'static [&'static str] {
    &MEASURES
}

/// @ai:intent Construct a built-in measure by id
/// @ai:effects pure
pub fn msr(id: &str) -> Result<Arc<dyn Measure>> {
    let measure: Arc<dyn Measure> = match id {
        "classif.ce" => Arc::new(ClassifMeasure::new(ClassifMetric::Ce)),
        "classif.acc" => Arc::new(ClassifMeasure::new(ClassifMetric::Acc)),
        "classif.bacc" => Arc::new(ClassifMeasure::new(ClassifMetric::Bacc)),
        "classif.logloss" => Arc::new(ClassifMeasure::new(ClassifMetric::Logloss)),
        "classif.bbrier" => Arc::new(ClassifMeasure::new(ClassifMetric::Bbrier)),
        "classif.mbrier" => Arc::new(ClassifMeasure::new(ClassifMetric::Mbrier)),
        "classif.auc" => Arc::new(ClassifMeasure::new(ClassifMetric::Auc)),
        "regr.mse" => Arc::new(RegrMeasure::new(RegrMetric::Mse)),
        "regr.rmse" => Arc::new(RegrMeasure::new(RegrMetric::Rmse)),
        "regr.mae" => Arc::new(RegrMeasure::new(RegrMetric::Mae)),
        "regr.rsq" => Arc::new(RegrMeasure::new(RegrMetric::Rsq)),
        "surv.cindex" => Arc::new(CIndex),
        "surv.graf" => Arc::new(Graf),
        "time_train" => Arc::new(TimeMeasure::new(TimePhase::Train)),
        "time_predict" => Arc::new(TimeMeasure::new(TimePhase::Predict)),
        "time_both" => Arc::new(TimeMeasure::new(TimePhase::Both)),
        other => return Err(Error::unknown("measure", other)),
    };
    Ok(measure)
}

pub fn msrs<S: AsRef<str>>(ids: &[S]) -> Result<Vec<Arc<dyn Measure>>> {
    ids.iter().map(|id| msr(id.as_ref())).collect()
}

/// @ai:intent Measure used when none is configured for a task type
/// @ai:effects pure
pub fn default_measure(task_type: TaskType) -> Arc<dyn Measure> {
    match task_type {
        TaskType::Classif => Arc::new(ClassifMeasure::new(ClassifMetric::Ce)),
        TaskType::Regr => Arc::new(RegrMeasure::new(RegrMetric::Mse)),
        TaskType::Surv => Arc::new(CIndex),
    }
}
