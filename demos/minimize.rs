use minimization::scalar::Brent;
use minimization::vector::{ConjugateGradientBuilder, NelderMeadBuilder, Powell};
use minimization::{IterationRecord, Minimizer};
use ndarray::prelude::*;

fn rosenbrock(x: ArrayView1<f64>) -> f64 {
    (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0].powi(2)).powi(2)
}

fn rosenbrock_gradient(x: ArrayView1<f64>) -> Array1<f64> {
    arr1(&[
        -2.0 * (1.0 - x[0]) - 400.0 * x[0] * (x[1] - x[0].powi(2)),
        200.0 * (x[1] - x[0].powi(2)),
    ])
}

fn main() -> minimization::Result<()> {
    let res = Brent::default().minimize(|x| (x - 3.5872).powi(2), 0.0, 5.0)?;
    println!("brent:       {:?}", res);

    let start = arr1(&[-1.2, 1.0]);

    let mut log: Vec<IterationRecord> = Vec::new();
    let res = NelderMeadBuilder::default()
        .epsilon(1e-12)
        .build()?
        .minimizer(rosenbrock, start.view())?
        .with_recorder(&mut log)
        .minimize()?;
    println!("nelder-mead: {:?}", res);
    if let Some(last) = log.last() {
        println!("final simplex:\n{}", last.snapshot);
    }

    let res = ConjugateGradientBuilder::default()
        .absolute_threshold(1e-12)
        .build()?
        .minimize(rosenbrock, rosenbrock_gradient, start.view())?;
    println!("cg:          {:?}", res);

    let res = Powell::default().minimize(rosenbrock, start.view(), None, None)?;
    println!("powell:      {:?}", res);
    Ok(())
}
