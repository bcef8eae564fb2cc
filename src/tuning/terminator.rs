//! @ai:module:intent Stopping rules for hyperparameter search
//! @ai:module:layer domain
//! @ai:module:public_api Terminator
//! @ai:module:stateless true

use crate::tuning::archive::Archive;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// @ai:intent When a tuning loop stops asking for more evaluations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Terminator {
    /// Never stops on its own; only valid for searches that run out of candidates
    None,
    Evals { n_evals: usize },
    RunTime { secs: f64 },
    /// Stops once the best score reaches `level`
    PerfReached { level: f64 },
    /// Stops when the last `iters` evaluations improved the best score by at most `threshold`
    Stagnation {
        iters: usize,
        #[serde(default)]
        threshold: f64,
    },
    /// Stops as soon as any member stops
    Combo { any: Vec<Terminator> },
}

impl Terminator {
    /// @ai:intent Whether the search described by `archive` should stop
    /// @ai:effects pure
    pub fn is_terminated(&self, archive: &Archive, minimize: bool, elapsed: Duration) -> bool {
        match self {
            Terminator::None => false,
            Terminator::Evals { n_evals } => archive.len() >= *n_evals,
            Terminator::RunTime { secs } => elapsed.as_secs_f64() >= *secs,
            Terminator::PerfReached { level } => match archive.best(minimize) {
                Some(best) if minimize => best.score <= *level,
                Some(best) => best.score >= *level,
                None => false,
            },
            Terminator::Stagnation { iters, threshold } => {
                let n = archive.len();
                if *iters == 0 || n <= *iters {
                    return false;
                }
                let entries = archive.entries();
                let before = Archive::best_of(&entries[..n - iters], minimize);
                let recent = Archive::best_of(&entries[n - iters..], minimize);
                match (before, recent) {
                    (Some(before), Some(recent)) => {
                        let improvement = if minimize {
                            before.score - recent.score
                        } else {
                            recent.score - before.score
                        };
                        improvement <= *threshold
                    }
                    (Some(_), None) => true,
                    _ => false,
                }
            }
            Terminator::Combo { any } => any
                .iter()
                .any(|t| t.is_terminated(archive, minimize, elapsed)),
        }
    }

    /// True when the rule can stop a search that never runs out of candidates.
    pub fn is_bounded(&self) -> bool {
        match self {
            Terminator::None | Terminator::PerfReached { .. } => false,
            Terminator::Combo { any } => any.iter().any(Terminator::is_bounded),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::ParamConfig;
    use crate::tuning::archive::ArchiveEntry;

    fn archive(scores: &[f64]) -> Archive {
        let mut archive = Archive::default();
        for (i, &score) in scores.iter().enumerate() {
            archive.push(ArchiveEntry {
                batch: i,
                config: ParamConfig::new(),
                score,
                warnings: 0,
                errors: 0,
                runtime: Duration::ZERO,
            });
        }
        archive
    }

    #[test]
    fn test_evals_and_perf_reached() {
        let a = archive(&[0.4, 0.3]);
        assert!(Terminator::Evals { n_evals: 2 }.is_terminated(&a, true, Duration::ZERO));
        assert!(!Terminator::Evals { n_evals: 3 }.is_terminated(&a, true, Duration::ZERO));
        assert!(Terminator::PerfReached { level: 0.35 }.is_terminated(&a, true, Duration::ZERO));
        assert!(!Terminator::PerfReached { level: 0.35 }.is_terminated(&a, false, Duration::ZERO));
    }

    #[test]
    fn test_stagnation() {
        let improving = archive(&[0.5, 0.4, 0.3]);
        let flat = archive(&[0.3, 0.4, 0.35]);
        let rule = Terminator::Stagnation { iters: 2, threshold: 0.0 };
        assert!(!rule.is_terminated(&improving, true, Duration::ZERO));
        assert!(rule.is_terminated(&flat, true, Duration::ZERO));
    }

    #[test]
    fn test_combo_and_bounded() {
        let a = archive(&[0.1]);
        let combo = Terminator::Combo {
            any: vec![
                Terminator::None,
                Terminator::RunTime { secs: 10.0 },
                Terminator::Evals { n_evals: 1 },
            ],
        };
        assert!(combo.is_terminated(&a, true, Duration::ZERO));
        assert!(combo.is_bounded());
        assert!(!Terminator::None.is_bounded());
    }
}
