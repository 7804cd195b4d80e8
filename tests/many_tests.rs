//! End-to-end scenarios exercising the full pipeline (parser, compiler,
//! memo-vertex selection, backtracking simulator, memo-table encodings)
//! together, adapted from the documented scenario table.

mod utils;

use memo_regex::baseline::PikeVm;
use memo_regex::config::{CompileConfig, MemoEncoding, MemoMode};
use memo_regex::regex::Regex;

fn compile(mode: MemoMode, encoding: MemoEncoding, pattern: &str) -> Regex {
    let config = CompileConfig {
        mode,
        encoding,
        allow_rle_tuned: false,
    };
    Regex::with_config(pattern, &config).unwrap()
}

#[test]
fn scenario_alternation_group_captures() {
    let re = compile(MemoMode::Full, MemoEncoding::Negative, "a(b|c)d");
    let caps = re.find_captures(b"abd").unwrap();
    assert_eq!((caps.group0().start(), caps.group0().end()), (0, 3));
    assert_eq!((caps.get(1).unwrap().start(), caps.get(1).unwrap().end()), (1, 2));
}

#[test]
fn scenario_catastrophic_pattern_without_trailing_anchor_does_not_match() {
    let re = compile(MemoMode::None, MemoEncoding::None, "(a+)+$");
    assert!(!re.is_match(b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaa!"));
}

#[test]
fn scenario_catastrophic_pattern_completes_in_reasonable_time_when_memoized() {
    let input = "a".repeat(30) + "!";
    let re = compile(MemoMode::Full, MemoEncoding::Rle, "(a+)+$");
    let run = re.run(input.as_bytes());
    assert!(!run.matched);
}

#[test]
fn scenario_backref_triggers_negative_encoding() {
    let re = compile(MemoMode::Full, MemoEncoding::Negative, r"^(\d+)(\w+)\1$");
    assert_eq!(re.program().memo_encoding, MemoEncoding::Negative);
    let caps = re.find_captures(b"123abc123").unwrap();
    assert_eq!((caps.group0().start(), caps.group0().end()), (0, 9));
    assert_eq!((caps.get(1).unwrap().start(), caps.get(1).unwrap().end()), (0, 3));
    assert_eq!((caps.get(2).unwrap().start(), caps.get(2).unwrap().end()), (3, 6));
}

#[test]
fn scenario_loop_dest_bounds_cost_regardless_of_repeat_count() {
    let re = compile(MemoMode::LoopDest, MemoEncoding::Rle, "(a*)*b");
    let short = re.run(b"ab");
    let long_input = "a".repeat(200) + "b";
    let long = re.run(long_input.as_bytes());
    assert!(short.matched && long.matched);

    let short_report = memo_regex::stats::build_report(re.program(), &short);
    let long_report = memo_regex::stats::build_report(re.program(), &long);
    let short_cost = short_report
        .memoization_info
        .results
        .max_observed_asymptotic_costs_per_memoized_vertex;
    let long_cost = long_report
        .memoization_info
        .results
        .max_observed_asymptotic_costs_per_memoized_vertex;
    assert!(short_cost.iter().all(|&c| c <= 3));
    assert!(long_cost.iter().all(|&c| c <= 3));
}

#[test]
fn scenario_four_way_alternation_flattens_and_matches() {
    let re = compile(MemoMode::InDegreeGt1, MemoEncoding::None, "a|b|c|d");
    let m = re.find(b"c").unwrap();
    assert_eq!((m.start(), m.end()), (0, 1));
}

#[test]
fn scenario_lookahead_enters_and_exits_once() {
    let re = compile(MemoMode::Full, MemoEncoding::Negative, "foo(?=bar)baz");
    let m = re.find(b"foobarbaz").unwrap();
    assert_eq!((m.start(), m.end()), (0, 9));
}

#[test]
fn boundary_empty_input_with_star_matches_zero_length() {
    let re = Regex::new("a*").unwrap();
    let m = re.find(b"").unwrap();
    assert_eq!((m.start(), m.end()), (0, 0));
}

#[test]
fn boundary_dollar_matches_empty_input() {
    let re = Regex::new("$").unwrap();
    assert!(re.is_match(b""));
}

#[test]
fn boundary_word_boundary_unsatisfied_at_start_of_empty_input() {
    let re = Regex::new(r"\b").unwrap();
    assert!(!re.is_match(b""));
}

#[test]
fn baseline_pike_vm_agrees_on_plain_pattern_verdicts() {
    const CASES: &[(&str, &str, bool)] = &[
        (r"a(b|c)d", "abd", true),
        (r"a(b|c)d", "axd", false),
        (r"a*(b|c)", "aaab", true),
        (r"colou?r", "color", true),
        (r"colou?r", "colr!", false),
    ];
    for &(pattern, input, expect_match) in CASES {
        let core = compile(MemoMode::Full, MemoEncoding::Negative, pattern);
        let baseline = PikeVm::new(pattern).unwrap();
        assert_eq!(core.is_match(input.as_bytes()), expect_match);
        assert_eq!(baseline.is_match(input), expect_match);
    }
}

#[test]
fn plain_patterns_agree_with_rust_regex_on_prefix_matches() {
    const CASES: &[(&str, &str)] = &[
        (r"foo", "foobar"),
        (r"\d+", "123def"),
        (r"(\w+)-(\d+)", "test-42"),
        (r"[a-z]{3}", "xyz123"),
        (r"colou?r", "colour!"),
        (r"ab{2,4}c", "abbbc"),
        (r"(?:abc)+", "abcabcabcx"),
        (r"[^0-9]+", "abc123"),
    ];
    for (pattern, input) in CASES {
        utils::check_against_rust_regex(pattern, input);
    }
}
