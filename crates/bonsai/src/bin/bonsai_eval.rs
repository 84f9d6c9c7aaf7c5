//! Evaluate a Bonsai model on a labeled LIBSVM test set.
//!
//! Usage:
//!   bonsai_eval --model PATH --meanvar PATH --test PATH [options]
//!
//! Options:
//!   --model PATH      Model blob
//!   --meanvar PATH    Mean/variance blob
//!   --test PATH       LIBSVM test set (1-based feature indices)
//!   --out DIR         Results directory (default: BonsaiResults/run)
//!   --dump PATH       Shared result dump (default: <out>/../resultDump)
//!   --threads N       Worker threads, 0 = auto (default: 0)
//!   --block-size N    Points per work unit (default: 64)
//!   --json            Print the summary as JSON on stdout
//!
//! Logging is controlled by `RUST_LOG` (default: info).

use std::path::{Path, PathBuf};

use bonsai::data::load_libsvm;
use bonsai::io::report::{write_reports, RESULT_DUMP_FILE};
use bonsai::{evaluate, BonsaiPredictor, EvalConfig};
use tracing_subscriber::EnvFilter;

struct Args {
    model: PathBuf,
    meanvar: PathBuf,
    test: PathBuf,
    out: PathBuf,
    dump: Option<PathBuf>,
    n_threads: usize,
    block_size: usize,
    json: bool,
}

const USAGE: &str = "bonsai_eval\n\n  --model <path>      Model blob\n  --meanvar <path>    Mean/variance blob\n  --test <path>       LIBSVM test set\n  --out <dir>         Results directory (default: BonsaiResults/run)\n  --dump <path>       Shared result dump (default: <out>/../resultDump)\n  --threads <n>       Worker threads, 0 = auto (default: 0)\n  --block-size <n>    Points per work unit (default: 64)\n  --json              Print the summary as JSON";

fn next_value(it: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    it.next().ok_or_else(|| format!("{flag} expects a value"))
}

fn next_count(it: &mut impl Iterator<Item = String>, flag: &str) -> Result<usize, String> {
    let value = next_value(it, flag)?;
    value
        .parse()
        .map_err(|_| format!("{flag} expects a non-negative integer, got '{value}'"))
}

fn parse_args() -> Result<Args, String> {
    let mut model: Option<PathBuf> = None;
    let mut meanvar: Option<PathBuf> = None;
    let mut test: Option<PathBuf> = None;
    let mut out = PathBuf::from("BonsaiResults/run");
    let mut dump: Option<PathBuf> = None;
    let mut n_threads = 0usize;
    let mut block_size = bonsai::eval::DEFAULT_BLOCK_SIZE;
    let mut json = false;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--model" => model = Some(next_value(&mut it, &arg)?.into()),
            "--meanvar" => meanvar = Some(next_value(&mut it, &arg)?.into()),
            "--test" => test = Some(next_value(&mut it, &arg)?.into()),
            "--out" => out = next_value(&mut it, &arg)?.into(),
            "--dump" => dump = Some(next_value(&mut it, &arg)?.into()),
            "--threads" => n_threads = next_count(&mut it, &arg)?,
            "--block-size" => block_size = next_count(&mut it, &arg)?,
            "--json" => json = true,
            "--help" => {
                eprintln!("{USAGE}");
                std::process::exit(0);
            }
            other => return Err(format!("unknown arg: {other}")),
        }
    }

    let (Some(model), Some(meanvar), Some(test)) = (model, meanvar, test) else {
        return Err("--model, --meanvar and --test are required".to_string());
    };

    Ok(Args {
        model,
        meanvar,
        test,
        out,
        dump,
        n_threads,
        block_size,
        json,
    })
}

fn default_dump(out: &Path) -> PathBuf {
    out.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .join(RESULT_DUMP_FILE)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("error: {msg}\n\n{USAGE}");
            std::process::exit(2);
        }
    };
    let config = EvalConfig::builder()
        .n_threads(args.n_threads)
        .block_size(args.block_size)
        .build()?;

    let predictor = BonsaiPredictor::from_bytes(&std::fs::read(&args.model)?, &std::fs::read(&args.meanvar)?)?;
    let params = *predictor.params();
    tracing::info!(
        data_dim = params.data_dim,
        projection_dim = params.projection_dim,
        tree_depth = params.tree_depth,
        num_classes = params.num_classes,
        total_non_zeros = predictor.total_non_zeros(),
        "loaded model"
    );

    let test = load_libsvm(&args.test, params.data_dim - 1, params.num_classes, params.one_indexed)?;
    let evaluation = evaluate(&predictor, &test.features, &test.labels, &config)?;
    let summary = evaluation.summary(&predictor);

    let dump = args.dump.unwrap_or_else(|| default_dump(&args.out));
    write_reports(&args.out, &dump, &evaluation.predictions, &summary)?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "config": config,
                "summary": summary,
            }))?
        );
    } else {
        println!("Final Test Accuracy = {:.6}", summary.accuracy);
    }

    Ok(())
}
