/// Evaluate a [`PerceptronPredictor`] against a synthetic workload.

use axon::*;
use axon::stats::*;

use rand::prelude::*;
use std::env;

/// Synthesize a workload of conditional branch records.
///
/// Each iteration executes four branches:
/// - a loop branch, not-taken once every 16 iterations
/// - a branch that alternates on every execution
/// - a branch correlated with the loop branch's previous outcome
/// - a weakly-biased random branch
fn synthesize_workload(iters: usize) -> Vec<BranchRecord> {
    let mut rng = rand::thread_rng();
    let mut records = Vec::with_capacity(iters * 4);

    let mut loop_exit_prev = false;
    let mut alternate = false;
    for i in 0..iters {
        let loop_exit = (i % 16) == 15;
        records.push(BranchRecord {
            pc: 0x0000_1000,
            outcome: Outcome::from(!loop_exit),
        });

        alternate = !alternate;
        records.push(BranchRecord {
            pc: 0x0000_2004,
            outcome: Outcome::from(alternate),
        });

        records.push(BranchRecord {
            pc: 0x0000_3008,
            outcome: Outcome::from(loop_exit_prev),
        });
        loop_exit_prev = loop_exit;

        records.push(BranchRecord {
            pc: 0x0000_4010,
            outcome: Outcome::from(rng.gen_bool(0.85)),
        });
    }
    records
}

fn test_perceptron(cfg: PerceptronConfig, records: &[BranchRecord])
    -> BranchStats
{
    let mut stat = BranchStats::new();
    let mut predictor = cfg.build().unwrap();

    for record in records.iter() {
        // Make a prediction
        let prediction = predictor.predict(record.pc);

        // Update global and per-branch statistics
        stat.update_global(record, prediction.outcome);
        stat.update_per_branch(record, prediction.outcome);

        // Retire the branch: train, then advance the global history
        predictor.resolve(record.pc, &prediction, record.outcome);
    }

    stat
}

fn test_simple(model: &impl SimplePredictor, records: &[BranchRecord])
    -> BranchStats
{
    let mut stat = BranchStats::new();
    for record in records.iter() {
        let outcome = model.predict();
        stat.update_global(record, outcome);
    }
    stat
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let iters = if args.len() > 1 {
        match args[1].parse() {
            Ok(n) => n,
            Err(_) => {
                println!("usage: {} [iterations]", args[0]);
                return;
            },
        }
    } else {
        100_000
    };

    let records = synthesize_workload(iters);
    println!("[*] Synthesized {} records", records.len());

    let cfg = PerceptronConfig::new(16, 1024);
    println!("[*] {} perceptrons, {} history bits, ~{} storage bits",
        cfg.table_size, cfg.history_length, cfg.storage_bits(),
    );

    let stat = test_perceptron(cfg, &records);
    println!("[*] Global hit rate: {}/{} ({:.2}% correct) ({} misses)",
        stat.global_hits(),
        stat.global_brns(),
        stat.hit_rate() * 100.0,
        stat.global_miss(),
    );

    println!("Per-branch hit rates:");
    for (pc, data) in stat.get_common_branches(8) {
        println!("  {:016x} {:8}/{:8} {:.4}",
            pc, data.hits, data.occ, data.hit_rate()
        );
    }
    for (pc, data) in stat.get_low_rate_branches(4) {
        println!("  low rate: {:016x} {:8}/{:8} {:.4}",
            pc, data.hits, data.occ, data.hit_rate()
        );
    }
    println!();

    // Stateless baselines for comparison
    let taken = test_simple(&TakenPredictor, &records);
    let random = test_simple(&RandomPredictor, &records);
    println!("[*] {}: {:.2}% correct",
        TakenPredictor.name(), taken.hit_rate() * 100.0);
    println!("[*] {}: {:.2}% correct",
        RandomPredictor.name(), random.hit_rate() * 100.0);
}
