//! End-to-end validator tests over in-memory channels.

use jsbox_kernel::{validator, SENTINEL};
use rstest::rstest;

fn request(code: &str, globals: &[&str], include: Option<&[&str]>) -> Vec<u8> {
    let mut body = serde_json::json!({
        "code": code,
        "globals": globals,
        "options": {},
    });
    if let Some(include) = include {
        body["options"]["includewarnings"] = serde_json::json!(include);
    }
    let mut line = serde_json::to_vec(&body).unwrap();
    line.push(b'\n');
    line
}

fn drive(input: &[u8]) -> (String, String) {
    let mut out = Vec::new();
    let mut err = Vec::new();
    validator::run(input, &mut out, &mut err).unwrap();
    (
        String::from_utf8(out).unwrap(),
        String::from_utf8(err).unwrap(),
    )
}

fn reply(input: &[u8]) -> serde_json::Value {
    let (out, _) = drive(input);
    serde_json::from_str(out.lines().next().unwrap()).unwrap()
}

#[test]
fn clean_code_replies_with_no_errors_and_sentinels() {
    let (out, err) = drive(&request("var x = 1;", &[], None));
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[1], SENTINEL);
    assert_eq!(err, format!("{}\n", SENTINEL));

    let reply: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(reply["errors"].as_array().unwrap().len(), 0);
    assert_eq!(reply["globals"], serde_json::json!(["x"]));
}

#[rstest]
#[case("let x = 1;", "W104")]
#[case("const x = 1;", "W104")]
#[case("var f = (a) => a + 1;", "W119")]
#[case("var s = `template`;", "W119")]
fn es6_reasons_always_mention_the_language_constraint(
    #[case] code: &str,
    #[case] expected: &str,
) {
    let reply = reply(&request(code, &[], None));
    let errors = reply["errors"].as_array().unwrap();
    assert!(!errors.is_empty());
    assert_eq!(errors[0]["code"], expected);
    assert!(errors[0]["reason"]
        .as_str()
        .unwrap()
        .ends_with(". CWL only supports ES5.1"));
}

#[test]
fn undefined_names_report_one_based_positions() {
    let reply = reply(&request("var ok = 1;\nok + missing", &["inputs"], None));
    let errors = reply["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["code"], "W117");
    assert_eq!(errors[0]["reason"], "'missing' is not defined.");
    assert_eq!(errors[0]["line"], 2);
    assert_eq!(errors[0]["character"], 6);
}

#[test]
fn permitted_globals_suppress_w117() {
    let reply = reply(&request(
        "inputs.file.path + runtime.cores",
        &["inputs", "runtime"],
        None,
    ));
    assert_eq!(reply["errors"].as_array().unwrap().len(), 0);
}

#[test]
fn includewarnings_keeps_listed_warnings_and_all_errors() {
    // W117 is filtered out, the syntax error is not
    let reply = reply(&request("missing; var = 1;", &[], Some(&["W104"])));
    let errors = reply["errors"].as_array().unwrap();
    assert!(!errors.is_empty());
    assert!(errors
        .iter()
        .all(|e| e["code"].as_str().unwrap().starts_with('E')));
}

#[test]
fn syntax_errors_use_error_codes() {
    let reply = reply(&request("function", &[], None));
    let errors = reply["errors"].as_array().unwrap();
    assert!(!errors.is_empty());
    assert!(errors[0]["code"].as_str().unwrap().starts_with('E'));
}

#[test]
fn requests_are_stateless() {
    let mut input = request("var lib = 1;", &[], None);
    input.extend_from_slice(&request("lib", &[], None));
    let (out, _) = drive(&input);
    let lines: Vec<&str> = out.lines().collect();

    // the second request does not see the first's declaration
    let second: serde_json::Value = serde_json::from_str(lines[2]).unwrap();
    let errors = second["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["code"], "W117");
}

#[test]
fn malformed_request_gets_diagnostic_and_sentinel_pair() {
    let (out, err) = drive(b"[]\n");
    assert_eq!(out, format!("{}\n", SENTINEL));
    assert!(err.contains("malformed lint request"));
    assert!(err.ends_with(&format!("{}\n", SENTINEL)));
}
