use std::path::PathBuf;
use std::time::Instant;

use refine_policy::{
    ConfigError, PriceTable, RefineRequest, Solution, compare_strategies, load_price_table,
    load_request, save_price_table,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_PRICE_FILE: &str = "prices.json";

fn print_solution(name: &str, solution: &Solution) {
    println!(
        "{name}: expected price={:.1} gold, expected attempts={:.2}",
        solution.price(),
        solution.expected_attempts()
    );
    for step in solution.path().iter() {
        println!(
            "  failures={:>3} boosters={:?} p={:.4}% reach={:.4}% attempt={:.1} cost_to_go={:.1}",
            step.state,
            step.boosters,
            step.success_probability * 100.0,
            step.reach_probability * 100.0,
            step.attempt_cost,
            step.cost_to_go
        );
    }
}

fn run() -> Result<(), ConfigError> {
    let mut args = std::env::args().skip(1);
    let request = match args.next() {
        Some(path) => load_request(&PathBuf::from(path))?,
        None => RefineRequest::default(),
    };
    let price_path = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_PRICE_FILE.to_string()));

    let fallback_prices = if price_path.exists() {
        load_price_table(&price_path)?
    } else {
        PriceTable::market_defaults()
    };

    let start = Instant::now();
    let solver = request.build_solver(&fallback_prices)?;
    let comparison = compare_strategies(&solver, request.start_failures)?;
    let elapsed = start.elapsed();

    println!(
        "{:?} {:?} +{}: {} pity states, solved in {:.3} milliseconds\n",
        request.item_type,
        request.grade,
        request.target,
        comparison.optimal.num_states(),
        elapsed.as_secs_f64() * 1000.0
    );
    print_solution("optimal", &comparison.optimal);
    print_solution("no boosters", &comparison.no_booster);
    print_solution("all boosters", &comparison.full_booster);
    println!(
        "\nsavings: {:.1} over no boosters, {:.1} over all boosters",
        comparison.savings_over_no_booster(),
        comparison.savings_over_full_booster()
    );
    println!("\nexpected consumption:");
    for (item, amount) in comparison.optimal.expected_consumption() {
        println!("  {:<12} {:.1}", item.label(), amount);
    }

    save_price_table(
        &price_path,
        request.prices.as_ref().unwrap_or(&fallback_prices),
    )?;
    tracing::info!(path = %price_path.display(), "price table saved");
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(err) = run() {
        tracing::error!("{err}");
        std::process::exit(1);
    }
}
