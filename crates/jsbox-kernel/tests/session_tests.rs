//! End-to-end session tests over in-memory channels.
//!
//! Each test drives a `Session` the way the engine binary does: a byte
//! stream in, an output channel and an error channel out.

use jsbox_kernel::{Session, SENTINEL};
use rstest::rstest;

/// Encode one request line: a JSON string of expression source.
fn request(source: &str) -> Vec<u8> {
    let mut line = serde_json::to_vec(&source.to_string()).unwrap();
    line.push(b'\n');
    line
}

fn requests(sources: &[&str]) -> Vec<u8> {
    sources.iter().flat_map(|s| request(s)).collect()
}

fn drive(session: &mut Session, input: &[u8]) -> (String, String) {
    let mut out = Vec::new();
    let mut err = Vec::new();
    session.run(input, &mut out, &mut err).unwrap();
    (
        String::from_utf8(out).unwrap(),
        String::from_utf8(err).unwrap(),
    )
}

#[rstest]
#[case("null", "null")]
#[case("true", "true")]
#[case("42", "42")]
#[case("2.5", "2.5")]
#[case("'hello'", "\"hello\"")]
#[case("[1, [2, 3]]", "[1,[2,3]]")]
#[case("(function(){return {a: 'b'}})()", "{\"a\":\"b\"}")]
#[case("1 + 2 * 3", "7")]
#[case("'x' + 1", "\"x1\"")]
#[case("1e3", "1000")]
fn stateless_responses(#[case] source: &str, #[case] expected: &str) {
    let mut session = Session::stateless(false);
    let (out, err) = drive(&mut session, &request(source));
    assert_eq!(out, format!("{}\n{}\n", expected, SENTINEL));
    assert_eq!(err, format!("{}\n", SENTINEL));
}

#[test]
fn each_request_gets_exactly_one_sentinel_pair() {
    let mut session = Session::stateless(false);
    let (out, err) = drive(&mut session, &requests(&["1", "2", "3"]));
    assert_eq!(out.lines().filter(|l| *l == SENTINEL).count(), 3);
    assert_eq!(err.lines().filter(|l| *l == SENTINEL).count(), 3);
    // responses and sentinels alternate on the output channel
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines, vec!["1", SENTINEL, "2", SENTINEL, "3", SENTINEL]);
}

#[test]
fn identical_stateless_requests_are_independent() {
    let mut session = Session::stateless(false);
    let (out, _) = drive(
        &mut session,
        &requests(&["(function(){return this.n = 1})()", "typeof n", "typeof n"]),
    );
    let lines: Vec<&str> = out.lines().collect();
    // the first request's environment write does not leak into later ones
    assert_eq!(lines[2], "\"undefined\"");
    assert_eq!(lines[2], lines[4]);
}

#[rstest]
#[case::whole(usize::MAX)]
#[case::bytes(1)]
#[case::small(3)]
#[case::mid(7)]
fn framing_is_chunk_boundary_independent(#[case] chunk_size: usize) {
    // multi-byte characters straddle boundaries at chunk_size 1 and 3
    let input = requests(&["1 + 2", "'héllo' + '→'", "[1,2,3].length"]);

    let mut reference = Session::stateless(false);
    let (ref_out, ref_err) = drive(&mut reference, &input);

    let mut session = Session::stateless(false);
    let mut out = Vec::new();
    let mut err = Vec::new();
    for chunk in input.chunks(chunk_size.min(input.len())) {
        session.feed(chunk, &mut out, &mut err).unwrap();
    }
    assert_eq!(String::from_utf8(out).unwrap(), ref_out);
    assert_eq!(String::from_utf8(err).unwrap(), ref_err);
}

#[test]
fn malformed_line_yields_diagnostic_and_sentinels_only() {
    let mut session = Session::stateless(false);
    let (out, err) = drive(&mut session, b"{\"not\": \"a string\"}\n");
    assert_eq!(out, format!("{}\n", SENTINEL));
    let err_lines: Vec<&str> = err.lines().collect();
    assert_eq!(err_lines.len(), 2);
    assert!(err_lines[0].contains("malformed message"));
    assert_eq!(err_lines[1], SENTINEL);
}

#[test]
fn faulty_line_does_not_poison_the_session() {
    let mut session = Session::stateless(false);
    let (out, err) = drive(&mut session, &requests(&["missing", "1 + 1"]));
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines, vec![SENTINEL, "2", SENTINEL]);
    assert!(err.contains("missing is not defined"));
}

#[test]
fn context_scenario_binds_reads_and_mutates() {
    let mut session = Session::context();
    let (out, err) = drive(
        &mut session,
        &requests(&[
            "(function(){return {x:1}})()",
            "(function(){return this.x})()",
            "(function(){this.x += 1; return this.x})()",
            "(function(){return this.x})()",
        ]),
    );
    // the context-defining message produces no response and no sentinel
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines, vec!["1", SENTINEL, "2", SENTINEL, "2", SENTINEL]);
    assert_eq!(err.lines().filter(|l| *l == SENTINEL).count(), 3);
}

#[test]
fn context_initialization_failure_still_binds() {
    let mut session = Session::context();
    let (out, err) = drive(
        &mut session,
        &requests(&["syntax error here(", "(function(){return typeof this})()"]),
    );
    // a fresh empty object is bound; pairing starts at the second message
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines, vec!["\"object\"", SENTINEL]);
    assert!(err.contains("syntax error"));
}

#[test]
fn console_routes_to_error_channel_with_prefixes() {
    let mut session = Session::stateless(true);
    let (out, err) = drive(
        &mut session,
        &request("console.log('line one\\nline two'); console.error({code: 1}); 'done'"),
    );
    assert_eq!(out, format!("\"done\"\n{}\n", SENTINEL));
    assert_eq!(
        err,
        format!(
            "[log] line one\n[log] line two\n[err] {{\"code\":1}}\n{}\n",
            SENTINEL
        )
    );
}

#[test]
fn console_is_not_bound_without_the_capability() {
    let mut session = Session::stateless(false);
    let (out, err) = drive(&mut session, &request("console.log('x')"));
    assert_eq!(out, format!("{}\n", SENTINEL));
    assert!(err.contains("console is not defined"));
}

#[rstest]
#[case("null")]
#[case("true")]
#[case("-7")]
#[case("3.25")]
#[case(r#"'text with "quotes"'"#)]
#[case("[null, 1, 'two', [3]]")]
#[case("(function(){return {k: [1, {m: false}]}})()")]
fn responses_round_trip_through_json(#[case] source: &str) {
    let mut session = Session::stateless(false);
    let (out, _) = drive(&mut session, &request(source));
    let response = out.lines().next().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(response).unwrap();
    assert_eq!(serde_json::to_string(&parsed).unwrap(), response);
}

#[test]
fn overflowing_arithmetic_keeps_the_session_alive() {
    // i64::MIN is reachable through checked arithmetic; its division and
    // remainder edge cases must stay contained request cycles
    let mut session = Session::stateless(false);
    let (out, err) = drive(
        &mut session,
        &requests(&[
            "(0 - 9223372036854775807 - 1) % (0 - 1)",
            "(0 - 9223372036854775807 - 1) / (0 - 1)",
            "1 + 1",
        ]),
    );
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "0");
    assert_eq!(lines[4], "2");
    assert_eq!(err.lines().filter(|l| *l == SENTINEL).count(), 3);
}

#[test]
fn non_finite_results_serialize_as_null() {
    let mut session = Session::stateless(false);
    let (out, _) = drive(&mut session, &requests(&["1 / 0", "0 / 0"]));
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines, vec!["null", SENTINEL, "null", SENTINEL]);
}
