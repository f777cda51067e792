//! Linear Relation Discovery
//!
//! This example fits `t = 2x` with a small search budget and prints the
//! expression found. Set `RUST_LOG=rsrm=debug` to follow the epochs.

use rsrm::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rsrm=info".parse()?),
        )
        .init();

    println!("=== Linear Relation Discovery ===\n");

    let x: Vec<f64> = (1..=20).map(|i| f64::from(i) / 4.0).collect();
    let t: Vec<f64> = x.iter().map(|v| 2.0 * v).collect();
    let train = Dataset::new(vec![x.clone()], t.clone())?;
    let test = Dataset::new(vec![x], t)?;

    // Only addition and multiplication: the relation is one product away
    let mut config = RegressorConfig::default();
    config.base.epochs = 10;
    config.base.tokens = vec![Operator::Add, Operator::Mul];
    config.base.reward_end_threshold = 1e-8;
    config.mcts.times = 30;
    config.mcts.max_token = 12;
    config.ga.population_size = 100;
    config.ga.generations = 10;

    let outcome = Pipeline::new(config).with_seed(42).fit(train, test)?;

    println!("Search complete!");
    println!(
        "  Expression:   {}",
        outcome.expression.as_deref().unwrap_or("<none>")
    );
    println!("  Error:        {:.3e}", outcome.error);
    println!("  Evaluations:  {}", outcome.evaluations);
    println!("  Epochs:       {}", outcome.epochs_run);
    println!("  Early stop:   {}", outcome.stopped_early);

    Ok(())
}
