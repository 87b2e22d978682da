//! The `sigconform` binary: configuration, flags and exit status

mod common;

use common::{fixture_path, scratch_dir, write_file};
use sigconform::backend::run;
use sigconform::config::Config;
use std::process::{Command, Output};

fn sigconform(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sigconform"))
        .args(args)
        .output()
        .expect("failed to start sigconform")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_passing_fixture_exits_zero() {
    let fixture = fixture_path("testing_library.fixture");
    let output = sigconform(&[fixture.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(0), "{}", stdout(&output));
    assert!(stdout(&output).contains("PASS:"));
}

#[test]
fn test_mismatch_exits_one() {
    let dir = scratch_dir("cli-mismatch");
    let fixture = write_file(
        &dir,
        "bad.fixture",
        "import {cleanup} from '@testing-library/react';\n// $ExpectError[extra-arg]\ncleanup();\n",
    );
    let output = sigconform(&["--sequential", fixture.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("MISMATCH 3:1 cleanup: expected rejected [extra-arg], got accepted: void"));
    assert!(stdout(&output).contains("FAIL: 2 call sites"));
}

#[test]
fn test_usage_errors_exit_two() {
    assert_eq!(sigconform(&[]).status.code(), Some(2));
    assert_eq!(sigconform(&["--frobnicate", "x"]).status.code(), Some(2));
    assert_eq!(sigconform(&["-d"]).status.code(), Some(2));
    assert_eq!(sigconform(&["/nonexistent/a.fixture"]).status.code(), Some(2));
}

#[test]
fn test_parse_error_exits_two() {
    let dir = scratch_dir("cli-parse");
    let fixture = write_file(&dir, "broken.fixture", "// $ExpectError[not-a-kind]\ncleanup();\n");
    let output = sigconform(&[fixture.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("broken.fixture"));
}

#[test]
fn test_trailing_marker_exits_two() {
    let dir = scratch_dir("cli-trailing");
    let fixture = write_file(
        &dir,
        "trailing.fixture",
        "import {cleanup} from '@testing-library/react';\ncleanup(1); // $ExpectError[extra-arg]\n",
    );
    let output = sigconform(&[fixture.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("trailing.fixture"));
    assert!(stderr.contains("own line"));
}

#[test]
fn test_decls_flag_and_output_file() {
    let dir = scratch_dir("cli-decls");
    let report = dir.join("report.txt");
    let decls = fixture_path("decls/jest_dom.toml");
    let fixture = fixture_path("jest_dom.fixture");
    let output = sigconform(&[
        "-d",
        decls.to_str().unwrap(),
        "--show-passing",
        "-o",
        report.to_str().unwrap(),
        fixture.to_str().unwrap(),
    ]);

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).is_empty());
    let written = std::fs::read_to_string(&report).unwrap();
    assert!(written.contains("  ok       "));
    assert!(written.contains("PASS:"));
}

#[test]
fn test_no_preset_makes_library_symbols_unknown() {
    let fixture = fixture_path("testing_library.fixture");
    let output = sigconform(&["--no-preset", fixture.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("Unknown symbol: act"));
}

#[test]
fn test_config_file_sets_prefixes_and_declarations() {
    let dir = scratch_dir("cli-config");
    let decls_dir = dir.join("decls");
    std::fs::create_dir_all(&decls_dir).unwrap();
    write_file(
        &decls_dir,
        "greet.toml",
        "[[functions]]\nname = \"greet\"\noverloads = [\"(name: string) => string\"]\n",
    );
    let config_path = write_file(
        &dir,
        "sigconform.toml",
        r#"
[catalog]
preset = ""
declarations = ["decls/greet.toml"]

[evaluation]
workers = 2

[markers]
prefixes = ["$ExpectError", "$FlowExpectedError"]
"#,
    );
    let fixture = write_file(
        &dir,
        "greet.fixture",
        "greet('a');\n// $FlowExpectedError[incompatible-call]\ngreet(1);\n// $ExpectError[extra-arg]\ngreet('a', 'b');\n",
    );

    let config = Config::load(&config_path).unwrap();
    assert_eq!(config.catalog.declarations, vec![dir.join("decls/greet.toml")]);
    let reports = run(&config, &[fixture.clone()]).unwrap();
    assert!(reports[0].passed(), "{}", reports[0]);
    assert_eq!(reports[0].rejected, 2);

    let output = sigconform(&["-c", config_path.to_str().unwrap(), fixture.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(0), "{}", stdout(&output));
}

#[test]
fn test_invalid_config_exits_two() {
    let dir = scratch_dir("cli-bad-config");
    let config_path = write_file(&dir, "sigconform.toml", "[logging]\nlevel = \"loud\"\n");
    let fixture = fixture_path("testing_library.fixture");
    let output = sigconform(&["-c", config_path.to_str().unwrap(), fixture.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown log level"));
}

#[test]
fn test_multiple_fixtures_report_in_argument_order() {
    let dir = scratch_dir("cli-multi");
    let first = write_file(&dir, "first.fixture", "import {cleanup} from '@testing-library/react';\ncleanup();\n");
    let second = write_file(&dir, "second.fixture", "import {act} from '@testing-library/react';\nact(() => {});\n");
    let output = sigconform(&[first.to_str().unwrap(), second.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    let a = text.find("first.fixture").unwrap();
    let b = text.find("second.fixture").unwrap();
    assert!(a < b);
}
