//! @ai:module:intent Archive of evaluated hyperparameter configurations
//! @ai:module:layer domain
//! @ai:module:public_api Archive, ArchiveEntry

use crate::param::ParamConfig;
use serde::Serialize;
use std::time::Duration;

/// @ai:intent One evaluated configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveEntry {
    pub batch: usize,
    pub config: ParamConfig,
    /// Aggregated inner score; NaN when any inner iteration failed
    pub score: f64,
    pub warnings: usize,
    pub errors: usize,
    pub runtime: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Archive {
    entries: Vec<ArchiveEntry>,
}

impl Archive {
    pub fn push(&mut self, entry: ArchiveEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of batches evaluated so far.
    pub fn n_batches(&self) -> usize {
        self.entries.last().map(|e| e.batch + 1).unwrap_or(0)
    }

    /// @ai:intent Best entry among `entries`, ignoring NaN; earliest wins ties
    /// @ai:effects pure
    pub fn best_of(entries: &[ArchiveEntry], minimize: bool) -> Option<&ArchiveEntry> {
        entries
            .iter()
            .filter(|e| !e.score.is_nan())
            .fold(None, |best: Option<&ArchiveEntry>, e| match best {
                Some(b) if (minimize && e.score >= b.score) || (!minimize && e.score <= b.score) => {
                    Some(b)
                }
                _ => Some(e),
            })
    }

    pub fn best(&self, minimize: bool) -> Option<&ArchiveEntry> {
        Self::best_of(&self.entries, minimize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::ParamValue;

    fn entry(k: i64, score: f64) -> ArchiveEntry {
        let mut config = ParamConfig::new();
        config.insert("k".to_string(), ParamValue::Int(k));
        ArchiveEntry {
            batch: 0,
            config,
            score,
            warnings: 0,
            errors: 0,
            runtime: Duration::ZERO,
        }
    }

    #[test]
    fn test_best_ignores_nan_and_keeps_first_tie() {
        let mut archive = Archive::default();
        archive.push(entry(1, f64::NAN));
        archive.push(entry(3, 0.2));
        archive.push(entry(5, 0.2));
        archive.push(entry(7, 0.5));

        let best = archive.best(true).unwrap();
        assert_eq!(best.config["k"], ParamValue::Int(3));
        let best = archive.best(false).unwrap();
        assert_eq!(best.config["k"], ParamValue::Int(7));
        assert!(Archive::default().best(true).is_none());
    }
}
