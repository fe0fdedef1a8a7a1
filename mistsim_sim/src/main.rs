//! mistsim CLI
//!
//! Runs clustering and placement scenarios over the discrete-event kernel.

use clap::Parser;
use mistsim_core::WeightPolicy;
use mistsim_sim::scenarios::ScenarioId;
use mistsim_sim::{ScenarioResult, ScenarioRunner, SimExport};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// mistsim - edge/mist orchestration simulator
#[derive(Parser, Debug)]
#[command(name = "mistsim")]
#[command(about = "Run deterministic edge/mist clustering scenarios", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of mist devices
    #[arg(short = 'n', long, default_value = "20")]
    devices: usize,

    /// Scenario to run (three_node, random_walk, highway, battery_drain, sparse, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Simulated duration in seconds
    #[arg(short, long, default_value = "300")]
    duration: f64,

    /// Clustering update interval in seconds
    #[arg(short, long, default_value = "1")]
    interval: f64,

    /// Weight policy (unweighted, coefficiented)
    #[arg(short, long, default_value = "unweighted")]
    policy: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export cluster snapshots to a JSON file
    #[arg(long)]
    export: Option<String>,
}

fn fail(msg: &str) -> ! {
    eprintln!("Error: {}", msg);
    std::process::exit(1);
}

fn export_run(runner: &ScenarioRunner, scenario: ScenarioId, policy: &str, path: &str) -> ScenarioResult {
    let (sim, summary) = match runner.execute(scenario) {
        Ok(run) => run,
        Err(e) => fail(&e.to_string()),
    };
    let result = runner.evaluate(scenario, &sim, &summary);

    let mut export = SimExport::new(scenario.name(), runner.seed(), policy);
    export.add_world(sim.world());
    export.finalize(result.passed, Some(result.metrics.clone()));
    match export.write_to_file(path) {
        Ok(()) => info!("Exported {} frames to {}", export.frames.len(), path),
        Err(e) => error!("Failed to write export: {}", e),
    }
    result
}

/// Installs the global subscriber. With `--json` logs go to stderr so stdout
/// carries only the summary.
fn init_logging(verbose: bool, json: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder().with_max_level(level);
    let installed = if json {
        tracing::subscriber::set_global_default(builder.with_writer(std::io::stderr).finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    if let Err(e) = installed {
        fail(&format!("failed to set tracing subscriber: {}", e));
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.json);

    if !args.json {
        info!("mistsim v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse() {
            Ok(id) => vec![id],
            Err(e) => {
                eprintln!("Available scenarios: three_node, random_walk, highway, battery_drain, sparse, all");
                fail(&e.to_string())
            }
        }
    };

    let policy = match WeightPolicy::by_name(&args.policy) {
        Some(policy) => policy,
        None => fail(&format!("unknown policy {} (unweighted, coefficiented)", args.policy)),
    };

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    let runner_for = |seed: u64| {
        ScenarioRunner::new(seed, args.devices)
            .with_duration(args.duration)
            .with_update_interval(args.interval)
            .with_policy(policy)
    };

    if let Some(path) = &args.export {
        if scenarios.len() > 1 {
            fail("--export only supports a single scenario, not 'all'");
        }
        info!("Running with export to: {}", path);
        let result = export_run(&runner_for(base_seed), scenarios[0], policy.name, path);
        if result.passed {
            info!("✓ {} (seed={}) PASSED - exported to {}", scenarios[0].name(), base_seed, path);
        } else {
            error!(
                "✗ {} FAILED: {}",
                scenarios[0].name(),
                result.failure_reason.as_deref().unwrap_or("unknown")
            );
            std::process::exit(1);
        }
        return;
    }

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = runner_for(seed);

        for scenario in &scenarios {
            let result = runner.run(*scenario);

            if !args.json {
                if result.passed {
                    info!(
                        "✓ {} (seed={}) PASSED: {:.1} orchestrators avg, {} parent changes, {}/{} placements",
                        scenario.name(),
                        seed,
                        result.metrics.avg_orchestrators,
                        result.metrics.parent_changes,
                        result.metrics.placements_ok,
                        result.metrics.placements_ok + result.metrics.placements_failed
                    );
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if !result.passed {
                failed_count += 1;
            }
            all_results.push(result);
        }
    }

    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "policy": policy.name,
            "results": all_results,
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => fail(&e.to_string()),
        }
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);
            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
