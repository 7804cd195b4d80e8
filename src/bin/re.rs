//! `re`: the command-line front-end (external collaborator, spec §6).
//!
//! ```text
//! re [--dump-program] MODE ENCODING ( PATTERN STRING | -f queryFile.json )
//! MODE     ∈ { none, full, indeg, loop }
//! ENCODING ∈ { none, neg, rle, rle-tuned }
//! ```
//!
//! `MEMOIZATION_LOGLVL` (`silent` default) selects the `tracing`
//! verbosity: `silent→off, error→error, warn→warn, info→info,
//! verbose→debug, debug→trace`.

use std::fs;
use std::process::ExitCode;

use serde::Deserialize;
use tracing::warn;

use memo_regex::baseline::PikeVm;
use memo_regex::config::{CompileConfig, MemoEncoding, MemoMode};
use memo_regex::regex::Regex;

#[derive(Deserialize)]
struct Query {
    pattern: String,
    input: String,
}

fn init_tracing() {
    let level = std::env::var("MEMOIZATION_LOGLVL").unwrap_or_else(|_| "silent".to_string());
    let filter = match level.as_str() {
        "silent" => None,
        "error" => Some("error"),
        "warn" => Some("warn"),
        "info" => Some("info"),
        "verbose" => Some("debug"),
        "debug" => Some("trace"),
        other => {
            eprintln!("re: unknown MEMOIZATION_LOGLVL {other:?}, defaulting to silent");
            None
        }
    };
    if let Some(filter) = filter {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
            .init();
    }
}

fn usage() -> ExitCode {
    eprintln!("usage: re [--dump-program] MODE ENCODING (PATTERN STRING | -f queryFile.json)");
    eprintln!("  MODE     ∈ {{none, full, indeg, loop}}");
    eprintln!("  ENCODING ∈ {{none, neg, rle, rle-tuned}}");
    ExitCode::from(2)
}

fn main() -> ExitCode {
    init_tracing();
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let dump_program = if args.first().map(String::as_str) == Some("--dump-program") {
        args.remove(0);
        true
    } else {
        false
    };

    if args.len() < 3 {
        return usage();
    }

    let mode: MemoMode = match args[0].parse() {
        Ok(m) => m,
        Err(e) => {
            eprintln!("re: {e}");
            return ExitCode::from(2);
        }
    };
    let encoding: MemoEncoding = match args[1].parse() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("re: {e}");
            return ExitCode::from(2);
        }
    };

    let (pattern, input) = if args[2] == "-f" {
        let Some(path) = args.get(3) else {
            return usage();
        };
        let contents = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("re: failed to read {path}: {e}");
                return ExitCode::FAILURE;
            }
        };
        let query: Query = match serde_json::from_str(&contents) {
            Ok(q) => q,
            Err(e) => {
                eprintln!("re: invalid query file {path}: {e}");
                return ExitCode::from(2);
            }
        };
        (query.pattern, query.input)
    } else {
        if args.len() < 4 {
            return usage();
        }
        (args[2].clone(), args[3].clone())
    };

    if encoding == MemoEncoding::RleTuned {
        warn!("re: RLE_TUNED requested; opting in for this run");
    }

    let config = CompileConfig {
        mode,
        encoding,
        allow_rle_tuned: encoding == MemoEncoding::RleTuned,
    };

    let re = match Regex::with_config(&pattern, &config) {
        Ok(re) => re,
        Err(e) => {
            eprintln!("re: {e}");
            return ExitCode::FAILURE;
        }
    };

    if dump_program {
        print!("{}", re.program().dump());
    }

    let (run, report) = re.run_with_stats(input.as_bytes());
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("re: failed to serialize stats: {e}"),
    }

    report_baseline_opinion(&pattern, &input, run.matched);

    if run.matched {
        println!("matched");
        for (i, group) in run.captures.iter().enumerate() {
            match group {
                Some((from, to)) => println!("  group {i}: ({from},{to})"),
                None => println!("  group {i}: unset"),
            }
        }
        ExitCode::SUCCESS
    } else {
        println!("no match");
        ExitCode::SUCCESS
    }
}

/// Reports whether the baseline Pike VM agrees on the overall match
/// verdict, when `pattern` falls inside its supported (no backref, no
/// lookaround) subset. Silent when `pattern` is outside that subset --
/// the baseline exists only as a second opinion, not a requirement.
fn report_baseline_opinion(pattern: &str, input: &str, matched: bool) {
    match PikeVm::new(pattern) {
        Ok(vm) => {
            let baseline_matched = vm.is_match(input);
            if baseline_matched == matched {
                println!("baseline: agrees ({baseline_matched})");
            } else {
                println!(
                    "baseline: DISAGREES (core={matched}, baseline={baseline_matched})"
                );
            }
        }
        Err(_) => {
            // Pattern uses backreferences/lookaround; outside the
            // baseline's supported subset.
        }
    }
}
