use memo_regex::Regex;
use regex as rust_regex;

/// Matches a pattern against an input on our engine and on `regex`, and
/// compares the overall-match span and every capture group's slice.
/// Limited to the plain-pattern subset both engines understand (no
/// backreferences, no lookaround) -- those are covered by dedicated
/// scenario tests instead, since `regex` can't compile them at all.
pub fn check_against_rust_regex(pattern: &str, input: &str) {
    let rust = rust_regex::Regex::new(pattern);
    let ours = Regex::new(pattern);

    match (rust, ours) {
        (Ok(rust_re), Ok(our_re)) => {
            let rust_match = rust_re.find(input).map(|m| (m.start(), m.end()));
            let our_match = our_re.find(input.as_bytes()).map(|m| (m.start(), m.end()));
            assert_eq!(
                our_match, rust_match,
                "mismatch for pattern {pattern:?} input {input:?} (find)"
            );

            let rust_caps = rust_re.captures(input);
            let rust_groups = rust_caps.as_ref().map(|caps| {
                (0..caps.len())
                    .map(|i| caps.get(i).map(|m| (m.start(), m.end())))
                    .collect::<Vec<_>>()
            });
            let our_caps = our_re.find_captures(input.as_bytes());
            let our_groups = our_caps.as_ref().map(|caps| {
                (0..caps.group_len())
                    .map(|i| caps.get(i).map(|m| (m.start(), m.end())))
                    .collect::<Vec<_>>()
            });
            assert_eq!(
                our_groups, rust_groups,
                "mismatch for pattern {pattern:?} input {input:?} (find_captures)"
            );
        }
        (Err(_), Err(_)) => {}
        (Ok(_), Err(e)) => panic!("rust-regex compiled {pattern:?} but we rejected it: {e}"),
        (Err(e), Ok(_)) => panic!("we compiled {pattern:?} but rust-regex rejected it: {e}"),
    }
}
