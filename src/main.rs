// SPDX-License-Identifier: Apache-2.0

use clap::{Parser, ValueEnum};
use xlsynth_beta::beta::ReductionMode;
use xlsynth_beta::process_path::{Options, process_path};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Full,
    Chains,
    Cutoff,
    Bounded,
}

/// Reads a node DAG in text form, beta-reduces its root and prints the
/// result.
#[derive(Parser, Debug)]
#[command(name = "beta-reduce", version)]
struct Args {
    /// Reduction strategy.
    #[arg(long, value_enum, default_value_t = Mode::Full)]
    mode: Mode,

    /// Maximum number of nested contractions for `--mode=bounded`.
    #[arg(long, default_value_t = 1)]
    bound: u32,

    /// Whether to fold (simplify) nodes as they are built.
    #[arg(long, default_value_t = true)]
    #[arg(action = clap::ArgAction::Set)]
    fold: bool,

    /// Print the reduction statistics as JSON.
    #[arg(long, default_value_t = false)]
    stats_json: bool,

    /// The path to the node DAG text file.
    input: String,
}

fn main() -> anyhow::Result<()> {
    let _ = env_logger::builder().try_init();
    let args = Args::parse();

    let mode = match args.mode {
        Mode::Full => ReductionMode::Full,
        Mode::Chains => ReductionMode::Chains,
        Mode::Cutoff => ReductionMode::Cutoff,
        Mode::Bounded => ReductionMode::Bounded(args.bound),
    };
    let options = Options {
        mode,
        fold: args.fold,
    };
    let input_path = std::path::Path::new(&args.input);
    let output = process_path(input_path, &options)?;

    print!("{}", output.text);
    if args.stats_json {
        println!("{}", serde_json::to_string_pretty(&output.stats)?);
    } else {
        println!("// nodes: {} -> {}", output.input_nodes, output.output_nodes);
        println!("// normal form: {}", output.is_normal_form);
        println!("// contractions: {}", output.stats.contractions);
        println!(
            "// memo hits: {} misses: {}",
            output.stats.memo_hits, output.stats.memo_misses
        );
        println!("// max depth: {}", output.stats.max_depth);
        println!("// peak memo bytes: {}", output.stats.peak_memo_bytes);
    }
    Ok(())
}
