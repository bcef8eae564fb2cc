//! @ai:module:intent Synthetic task generators for self-contained benchmarks
//! @ai:module:layer domain
//! @ai:module:public_api two_normals, friedman1, sim_surv, generate, generator_ids
//! @ai:module:stateless true

use crate::data::{Column, DataBackend};
use crate::error::{Error, Result};
use crate::task::task::Task;
use rand::prelude::*;
use std::f64::consts::PI;

const GENERATORS: [&str; 3] = ["2dnormals", "friedman1", "simsurv"];

/// @ai:intent Ids accepted by `generate`
pub fn generator_ids() -> &'static [&'static str] {
    &GENERATORS
}

/// @ai:intent Build a generated task by generator id
/// @ai:effects pure
pub fn generate(id: &str, n: usize, seed: u64) -> Result<Task> {
    match id {
        "2dnormals" => two_normals(n, seed),
        "friedman1" => friedman1(n, seed),
        "simsurv" => sim_surv(n, seed),
        other => Err(Error::unknown("task generator", other)),
    }
}

/// Standard normal draw via Box-Muller.
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// @ai:intent Binary classification: two Gaussian clouds centred at (-1,-1) and (1,1)
/// @ai:effects pure
pub fn two_normals(n: usize, seed: u64) -> Result<Task> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut x1 = Vec::with_capacity(n);
    let mut x2 = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);

    for i in 0..n {
        let (centre, label) = if i % 2 == 0 { (-1.0, "A") } else { (1.0, "B") };
        x1.push(centre + standard_normal(&mut rng));
        x2.push(centre + standard_normal(&mut rng));
        labels.push(label);
    }

    let backend = DataBackend::from_columns(vec![
        ("x1".to_string(), Column::Numeric(x1)),
        ("x2".to_string(), Column::Numeric(x2)),
        ("y".to_string(), Column::factor_from_labels(&labels)),
    ])?;
    Task::classif("2dnormals", backend, "y")
}

/// @ai:intent Friedman #1 regression problem with ten uniform inputs
/// @ai:effects pure
pub fn friedman1(n: usize, seed: u64) -> Result<Task> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut features: Vec<Vec<f64>> = vec![Vec::with_capacity(n); 10];
    let mut y = Vec::with_capacity(n);

    for _ in 0..n {
        let x: Vec<f64> = (0..10).map(|_| rng.gen::<f64>()).collect();
        let value = 10.0 * (PI * x[0] * x[1]).sin()
            + 20.0 * (x[2] - 0.5).powi(2)
            + 10.0 * x[3]
            + 5.0 * x[4]
            + standard_normal(&mut rng);
        for (col, v) in features.iter_mut().zip(&x) {
            col.push(*v);
        }
        y.push(value);
    }

    let mut columns: Vec<(String, Column)> = features
        .into_iter()
        .enumerate()
        .map(|(i, col)| (format!("x{}", i + 1), Column::Numeric(col)))
        .collect();
    columns.push(("y".to_string(), Column::Numeric(y)));

    let backend = DataBackend::from_columns(columns)?;
    Task::regr("friedman1", backend, "y")
}

/// @ai:intent Right-censored survival data with exponential event times
///
/// Hazard is `0.1 * exp(0.5 * x1 - 0.5 * x2)`, censoring uniform on `[0, 30]`.
/// @ai:effects pure
pub fn sim_surv(n: usize, seed: u64) -> Result<Task> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut x1 = Vec::with_capacity(n);
    let mut x2 = Vec::with_capacity(n);
    let mut time = Vec::with_capacity(n);
    let mut status = Vec::with_capacity(n);

    for _ in 0..n {
        let a = standard_normal(&mut rng);
        let b = standard_normal(&mut rng);
        let hazard = 0.1 * (0.5 * a - 0.5 * b).exp();
        let u: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
        let event_time = -u.ln() / hazard;
        let censor_time = rng.gen::<f64>() * 30.0;

        x1.push(a);
        x2.push(b);
        time.push(event_time.min(censor_time));
        status.push(event_time <= censor_time);
    }

    let backend = DataBackend::from_columns(vec![
        ("x1".to_string(), Column::Numeric(x1)),
        ("x2".to_string(), Column::Numeric(x2)),
        ("time".to_string(), Column::Numeric(time)),
        ("status".to_string(), Column::Logical(status)),
    ])?;
    Task::surv("simsurv", backend, "time", "status")
}
