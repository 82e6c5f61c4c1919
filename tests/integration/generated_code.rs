use std::fs;

use super::{Project, RecordingFormatter};
use hrmake::batch::main_make;

const SMOKE: &str = r#"
config:
  name: smoke
  base_url: https://postman-echo.com
teststeps:
  - name: ping
    request:
      method: GET
      url: /ping
    validate:
      - eq: [status_code, 200]
"#;

#[tokio::test]
async fn test_end_to_end_smoke() {
    let project = Project::new();
    project.write("testcases/smoke.yml", SMOKE);

    let report = project.make(&["testcases/smoke.yml"]).await.unwrap();
    assert_eq!(
        report.run_set,
        vec![project.root().join("testcases/smoke_test.py")]
    );

    let generated = project.read("testcases/smoke_test.py");
    assert!(generated.starts_with("# NOTE: Generated By HttpRunner v4.3.5\n# FROM: testcases/smoke.yml\n"));
    assert!(generated.contains("from httprunner import HttpRunner, Config, Step, RunRequest\n"));
    assert!(!generated.contains("import pytest"));
    assert!(generated.contains("class TestCaseSmoke(HttpRunner):"));
    assert!(generated.contains(
        r#"Step(RunRequest("ping").get("/ping").validate().assert_equal("status_code", 200))"#
    ));
    assert!(generated.contains("TestCaseSmoke().test_start()"));
}

#[tokio::test]
async fn test_absent_fields_emit_no_calls() {
    let project = Project::new();
    project.write("a.yml", SMOKE);
    project.write(
        "b.yml",
        &SMOKE.replace("url: /ping", "url: /ping\n      timeout: 5"),
    );

    project.make(&["a.yml", "b.yml"]).await.unwrap();
    assert!(!project.read("a_test.py").contains("set_timeout"));
    assert!(project.read("b_test.py").contains(r#".get("/ping").set_timeout(5)"#));
}

#[tokio::test]
async fn test_extraction_kinds() {
    let project = Project::new();
    project.write(
        "extract.yml",
        r#"
config: {name: extract}
teststeps:
  - name: get
    request: {method: GET, url: /get}
    extract:
      num: regex:(\d+)
      id: body.id
      ctype: headers.Content-Type
"#,
    );

    project.make(&["extract.yml"]).await.unwrap();
    let generated = project.read("extract_test.py");
    assert!(generated.contains(r#".with_regex('(\\d+)', 'num')"#));
    assert!(generated.contains(".with_jmespath('body.id', 'id')"));
    assert!(generated.contains(r#".with_jmespath('headers."Content-Type"', 'ctype')"#));
}

#[tokio::test]
async fn test_path_sanitization() {
    let project = Project::new();
    project.write("my tests/2-sample test.yml", SMOKE);

    let report = project.make(&["my tests"]).await.unwrap();
    let expected = project.root().join("my_tests/T2_sample_test_test.py");
    assert_eq!(report.run_set, vec![expected.clone()]);

    let generated = fs::read_to_string(expected).unwrap();
    assert!(generated.contains("class TestCaseT2SampleTest(HttpRunner):"));
    assert!(project.root().join("my_tests/__init__.py").is_file());
}

#[tokio::test]
async fn test_output_is_deterministic() {
    let project = Project::new();
    project.write(
        "vars.yml",
        r#"
config:
  name: vars
  variables: {b: 2, a: 1, nested: {z: null, y: [true, 1.5, "x"]}}
teststeps:
  - name: post
    request:
      method: POST
      url: /post
      headers: {X-B: "2", X-A: "1"}
      json: {k: v}
"#,
    );

    project.make(&["vars.yml"]).await.unwrap();
    let first = project.read("vars_test.py");
    project.make(&["vars.yml"]).await.unwrap();
    let second = project.read("vars_test.py");

    assert_eq!(first, second);
    assert!(first.contains(
        ".variables(**{'b': 2, 'a': 1, 'nested': {'z': None, 'y': [True, 1.5, 'x']}})"
    ));
    assert!(first.contains(".with_headers(**{'X-B': '2', 'X-A': '1'}).with_json({'k': 'v'})"));
}

#[tokio::test]
async fn test_skip_marks_and_parameters() {
    let project = Project::new();
    project.write(
        "param.yml",
        r#"
config:
  name: param
  skip: {reason: not ready}
  marks: [smoke, slow]
  parameters:
    user_agent: [iOS/10.1, iOS/10.2]
teststeps:
  - name: get
    request: {method: GET, url: /get}
"#,
    );

    project.make(&["param.yml"]).await.unwrap();
    let generated = project.read("param_test.py");
    assert!(generated.contains("import pytest\n"));
    assert!(generated.contains("from httprunner import Parameters\n"));
    assert!(generated.contains("    @pytest.mark.skip(reason=\"not ready\")\n"));
    assert!(generated.contains("    @pytest.mark.smoke\n    @pytest.mark.slow\n"));
    assert!(generated.contains(
        "@pytest.mark.parametrize(\"param\", Parameters({'user_agent': ['iOS/10.1', 'iOS/10.2']}))"
    ));
    assert!(generated.contains("def test_start(self, param):\n        super().test_start(param)"));
}

#[tokio::test]
async fn test_legacy_api_document_is_promoted() {
    let project = Project::new();
    project.write(
        "api/get_token.yml",
        r#"
name: get token
request: {method: GET, url: /token}
extract:
  - token: content.token
validate:
  - {check: status_code, comparator: eq, expect: 200}
"#,
    );

    project.make(&["api/get_token.yml"]).await.unwrap();
    let generated = project.read("api/get_token_test.py");
    assert!(generated.contains(r#"Config("get token").export(*['token'])"#));
    assert!(generated.contains(".with_jmespath('body.token', 'token')"));
    assert!(generated.contains(r#".assert_equal("status_code", 200)"#));
}

#[tokio::test]
async fn test_formatter_sees_every_generated_file() {
    let project = Project::new();
    project.write("a.yml", SMOKE);
    project.write("b.json", r#"{"config": {"name": "b"}, "teststeps": []}"#);

    let formatter = RecordingFormatter::default();
    let mut maker = project.maker();
    main_make(&mut maker, &[project.root().to_path_buf()], None, &formatter)
        .await
        .unwrap();

    assert_eq!(
        formatter.formatted(),
        vec![project.root().join("a_test.py"), project.root().join("b_test.py")]
    );
}

#[tokio::test]
async fn test_formatter_failure_aborts() {
    let project = Project::new();
    project.write("a.yml", SMOKE);

    let formatter = RecordingFormatter::default().with_failure(true);
    let mut maker = project.maker();
    let err = main_make(&mut maker, &[project.root().join("a.yml")], None, &formatter)
        .await
        .unwrap_err();
    assert_eq!(err.category(), "formatter_failed");
}
