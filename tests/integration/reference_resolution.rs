use super::Project;

const LOGIN: &str = r#"
config:
  name: login
  export: [token, uid]
teststeps:
  - name: login
    request: {method: POST, url: /login}
    extract:
      token: body.token
      uid: body.uid
"#;

fn caller(name: &str) -> String {
    format!(
        r#"
config:
  name: {name}
teststeps:
  - name: login first
    testcase: testcases/common/login.yml
    export: [uid]
  - name: profile
    request: {{method: GET, url: /profile}}
"#
    )
}

#[tokio::test]
async fn test_shared_reference_is_compiled_once() {
    let project = Project::new();
    project.write("testcases/common/login.yml", LOGIN);
    project.write("testcases/a.yml", &caller("a"));
    project.write("testcases/b.yml", &caller("b"));

    let report = project
        .make(&["testcases/a.yml", "testcases/b.yml"])
        .await
        .unwrap();

    let login = project.root().join("testcases/common/login_test.py");
    assert_eq!(
        report.generated.iter().filter(|p| **p == login).count(),
        1
    );
    assert_eq!(report.generated.len(), 3);
    // referenced only, so not run on its own
    assert!(!report.run_set.contains(&login));
    assert_eq!(report.run_set.len(), 2);
}

#[tokio::test]
async fn test_reference_step_rendering() {
    let project = Project::new();
    project.write("testcases/common/login.yml", LOGIN);
    project.write("testcases/a.yml", &caller("a"));

    project.make(&["testcases/a.yml"]).await.unwrap();
    let generated = project.read("testcases/a_test.py");

    assert!(generated.contains("from httprunner import RunTestCase\n"));
    assert!(generated.contains("import sys\nfrom pathlib import Path\n"));
    assert!(generated.contains("sys.path.insert(0, str(Path(__file__).parent.parent))"));
    assert!(generated.contains(
        "from testcases.common.login_test import TestCaseLogin as Login\n"
    ));
    assert!(generated.contains(
        r#"Step(RunTestCase("login first").call(Login).export(*['uid', 'token']))"#
    ));
}

#[tokio::test]
async fn test_reference_listed_in_batch_is_run() {
    let project = Project::new();
    project.write("testcases/common/login.yml", LOGIN);
    project.write("testcases/a.yml", &caller("a"));

    let report = project.make(&["testcases"]).await.unwrap();
    assert!(report
        .run_set
        .contains(&project.root().join("testcases/common/login_test.py")));
    assert_eq!(report.generated.len(), 2);
}

#[tokio::test]
async fn test_output_dir_keeps_references_in_place() {
    let project = Project::new();
    project.write("testcases/common/login.yml", LOGIN);
    project.write("testcases/a.yml", &caller("a"));
    let out = project.root().join("out");

    let report = project
        .make_into(&["testcases/a.yml"], Some(&out))
        .await
        .unwrap();

    assert_eq!(report.run_set, vec![out.join("a_test.py")]);
    assert!(project
        .root()
        .join("testcases/common/login_test.py")
        .is_file());
    assert!(!out.join("login_test.py").exists());
}

#[tokio::test]
async fn test_missing_reference_aborts_batch() {
    let project = Project::new();
    project.write(
        "testcases/a.yml",
        "config: {name: a}\nteststeps:\n  - {name: gone, testcase: testcases/missing.yml}\n",
    );

    let err = project.make(&["testcases/a.yml"]).await.unwrap_err();
    assert_eq!(err.category(), "testcase_not_found");
}

#[tokio::test]
async fn test_invalid_reference_skips_only_its_caller() {
    let project = Project::new();
    project.write("testcases/common/list.yml", "- not\n- a mapping\n");
    project.write(
        "testcases/a.yml",
        "config: {name: a}\nteststeps:\n  - {name: bad, testcase: testcases/common/list.yml}\n",
    );
    project.write(
        "testcases/b.yml",
        "config: {name: b}\nteststeps:\n  - {name: ok, request: {method: GET, url: /}}\n",
    );

    let report = project
        .make(&["testcases/a.yml", "testcases/b.yml"])
        .await
        .unwrap();
    assert_eq!(
        report.run_set,
        vec![project.root().join("testcases/b_test.py")]
    );
    assert_eq!(report.skipped.len(), 1);
}

#[tokio::test]
async fn test_reference_cycle_aborts_batch() {
    let project = Project::new();
    project.write(
        "a.yml",
        "config: {name: a}\nteststeps:\n  - {name: to b, testcase: b.yml}\n",
    );
    project.write(
        "b.yml",
        "config: {name: b}\nteststeps:\n  - {name: to a, testcase: a.yml}\n",
    );

    let err = project.make(&["a.yml"]).await.unwrap_err();
    assert_eq!(err.category(), "cyclic_reference");
    assert!(err.to_string().contains(" -> "));
}

#[tokio::test]
async fn test_same_named_references_get_distinct_aliases() {
    let project = Project::new();
    project.write("testcases/a/login.yml", LOGIN);
    project.write("testcases/b/login.yml", LOGIN);
    project.write(
        "testcases/both.yml",
        r#"
config:
  name: both
teststeps:
  - name: login a
    testcase: testcases/a/login.yml
  - name: login b
    testcase: testcases/b/login.yml
  - name: login a again
    testcase: testcases/a/login.yml
"#,
    );

    project.make(&["testcases/both.yml"]).await.unwrap();
    let generated = project.read("testcases/both_test.py");

    assert!(generated.contains("from testcases.a.login_test import TestCaseLogin as Login\n"));
    assert!(generated.contains(
        "from testcases.b.login_test import TestCaseLogin as TestcasesBLoginTest\n"
    ));
    assert_eq!(generated.matches("import TestCaseLogin as").count(), 2);
    assert!(generated.contains(r#"RunTestCase("login a").call(Login)"#));
    assert!(generated.contains(r#"RunTestCase("login b").call(TestcasesBLoginTest)"#));
    assert!(generated.contains(r#"RunTestCase("login a again").call(Login)"#));
}
