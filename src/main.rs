use std::{io, path::PathBuf, process, time::Instant};

use clap::Parser;
use env_logger::Env;
use log::info;

use mrf_inference::{
    bp::{loopy_bp::LoopyBeliefPropagation, options::BpOptions},
    io::{
        output::{MarginalWriter, ResultSink},
        uai::read_uai_file,
    },
};

#[derive(Parser)]
#[command(name = "mrf-inference")]
#[command(version)]
#[command(about = "Marginal inference on discrete Markov random fields")]
struct Cli {
    /// Network file in MARKOV format
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Compute the partition function by variable elimination instead of running belief propagation
    #[arg(long)]
    partition: bool,

    /// Belief propagation stops once the iteration count exceeds this
    #[arg(long, default_value_t = 100, value_name = "N")]
    max_iterations: usize,

    /// Largest mean absolute message change still considered converged
    #[arg(long, default_value_t = 1e-6, value_name = "EPS")]
    threshold: f64,
}

// Usage and input errors end the process with status 0
fn quit(message: impl std::fmt::Display) -> ! {
    println!("{}", message);
    process::exit(0);
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            process::exit(0);
        }
    };

    let network = read_uai_file(&cli.file).unwrap_or_else(|err| quit(err));

    let mut options = BpOptions::default();
    options
        .set_max_iterations(cli.max_iterations)
        .set_convergence_threshold(cli.threshold);
    let mut sink = MarginalWriter::new(io::stdout().lock(), options.max_iterations());

    let time_start = Instant::now();
    let reported = if cli.partition {
        let partition = network.partition_function().unwrap_or_else(|err| quit(err));
        info!(
            "Variable elimination complete. Elapsed time {:?}.",
            time_start.elapsed()
        );
        sink.report_partition(partition)
    } else {
        let outcome = LoopyBeliefPropagation::init(&network)
            .run(&options)
            .unwrap_or_else(|err| quit(err));
        info!(
            "Belief propagation complete. Elapsed time {:?}.",
            time_start.elapsed()
        );
        sink.report_marginals(&outcome)
    };

    if let Err(err) = reported {
        quit(err);
    }
}
