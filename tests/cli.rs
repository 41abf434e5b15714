//! Integration test suite for the `jshake` CLI
use assert_cmd::Command;

const USERS: &str = "tests/data/users.json";

/// Helper function to run the `main` binary with the given arguments and return a
/// [`assert_cmd::assert::Assert`].
fn run_main(args: &[&str]) -> assert_cmd::assert::Assert {
    let mut cmd =
        Command::cargo_bin("jshake").expect("Failed to find main binary");
    cmd.args(args);
    cmd.assert()
}

/// Runs the binary expecting success and returns STDOUT.
fn stdout_of(args: &[&str]) -> String {
    let assert = run_main(args).success().code(0);
    String::from_utf8(assert.get_output().stdout.clone())
        .expect("Invalid UTF-8 output")
}

/// Runs the binary expecting failure and returns STDERR.
fn stderr_of(args: &[&str]) -> String {
    let assert = run_main(args).failure().code(1);
    String::from_utf8(assert.get_output().stderr.clone())
        .expect("Invalid UTF-8 output")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn include_fields() {
        let out = stdout_of(&["-p", "$.name", "-p", "$.email", USERS]);
        assert_eq!(out, "{\"name\":\"John\",\"email\":\"john@example.com\"}\n");
    }

    #[test]
    fn exclude_recursive_descent() {
        let out =
            stdout_of(&["--mode", "exclude", "-p", "$..password", USERS]);
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["profile"], json!({"bio": "hi", "links": [{"url": "a"}]}));
        assert!(value.get("password").is_none());
        assert!(out.contains("123456789012345678901234567890"));
    }

    #[test]
    fn exclude_missing_field_keeps_document() {
        let out = stdout_of(&["-m", "exclude", "-p", "$.nope", USERS]);
        let original: Value =
            serde_json::from_str(&std::fs::read_to_string(USERS).unwrap())
                .unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value, original);
    }

    #[test]
    fn slice_and_indices() {
        assert_eq!(
            stdout_of(&["-p", "$.scores[0:3]", USERS]),
            "{\"scores\":[10,20,30]}\n"
        );
        assert_eq!(
            stdout_of(&["-p", "$.scores[0,2,-1]", USERS]),
            "{\"scores\":[10,30,50]}\n"
        );
    }

    #[test]
    fn large_numbers_are_preserved() {
        assert_eq!(
            stdout_of(&["-p", "$.id", USERS]),
            "{\"id\":123456789012345678901234567890}\n"
        );
    }

    #[test]
    fn no_match_prints_empty_object() {
        assert_eq!(stdout_of(&["-p", "$.does.not.exist", USERS]), "{}\n");
    }

    #[test]
    fn prefix_scopes_relative_paths() {
        let out = stdout_of(&[
            "--prefix", "$.profile", "-p", ".bio", "-p", "$.name", USERS,
        ]);
        assert_eq!(out, "{\"name\":\"John\",\"profile\":{\"bio\":\"hi\"}}\n");
    }

    #[test]
    fn reads_stdin() {
        let mut cmd = Command::cargo_bin("jshake").unwrap();
        cmd.args(["-p", "$[0:3]"]).write_stdin("[0,1,2,3,4,5]");
        cmd.assert().success().stdout("[0,1,2]\n");
    }

    #[test]
    fn pretty_output() {
        let out = stdout_of(&["--pretty", "-p", "$.scores[:2]", USERS]);
        assert_eq!(out, "{\n  \"scores\": [\n    10,\n    20\n  ]\n}\n");
    }

    #[test]
    fn output_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.json");
        let out = stdout_of(&[
            "-p",
            "$.age",
            "-o",
            target.to_str().unwrap(),
            USERS,
        ]);
        assert!(out.is_empty());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "{\"age\":30}\n");
    }

    #[test]
    fn reports_input_depth() {
        let assert = run_main(&["--depth", "-p", "$.age", USERS]).success();
        let stderr =
            String::from_utf8(assert.get_output().stderr.clone()).unwrap();
        assert!(stderr.contains("Depth: 4"), "{stderr}");
    }

    #[test]
    fn invalid_path() {
        let stderr = stderr_of(&["-p", "$.valid", "-p", "$.invalid[", USERS]);
        assert!(stderr.contains("parse error at position 10"), "{stderr}");
        assert!(stderr.contains("unexpected end in bracket"), "{stderr}");
    }

    #[test]
    fn missing_path_argument() {
        let stderr = stderr_of(&[USERS]);
        assert!(stderr.contains("--path"), "{stderr}");
    }

    #[test]
    fn nonexistent_file() {
        let stderr = stderr_of(&["-p", "$.a", "tests/data/missing.json"]);
        assert!(stderr.contains("Failed to read file"), "{stderr}");
    }

    #[test]
    fn malformed_json() {
        let mut cmd = Command::cargo_bin("jshake").unwrap();
        cmd.args(["-p", "$.a"]).write_stdin("{\"a\":");
        cmd.assert().failure().code(1);
    }

    #[test]
    fn depth_limit() {
        let stderr = stderr_of(&["--max-depth", "1", "-p", "$..url", USERS]);
        assert!(stderr.contains("maximum depth 1 exceeded"), "{stderr}");
        // 0 disables the bound
        let out = stdout_of(&["--max-depth", "0", "-p", "$..url", USERS]);
        assert_eq!(out, "{\"profile\":{\"links\":[{\"url\":\"a\"}]}}\n");
    }

    #[test]
    fn deeply_nested_input_within_default_limit() {
        let doc = format!("{}1{}", "[".repeat(300), "]".repeat(300));
        let mut cmd = Command::cargo_bin("jshake").unwrap();
        cmd.args(["--mode", "exclude", "-p", "$..zzz"]).write_stdin(doc.clone());
        cmd.assert().success().stdout(format!("{doc}\n"));
    }

    #[test]
    fn path_count_limit() {
        let stderr =
            stderr_of(&["--max-path-count", "1", "-p", "$.a", "-p", "$.b", USERS]);
        assert!(stderr.contains("maximum path count of 1"), "{stderr}");
    }

    #[test]
    fn path_length_limit() {
        let stderr = stderr_of(&["--max-path-length", "3", "-p", "$.name", USERS]);
        assert!(stderr.contains("path exceeds maximum length"), "{stderr}");
    }

    #[test]
    fn generate_shell_completions() {
        let out = stdout_of(&["generate", "shell", "bash"]);
        assert!(out.contains("jshake"));
    }

    #[test]
    fn generate_man_pages() {
        let dir = tempfile::tempdir().unwrap();
        let out = stdout_of(&[
            "generate",
            "man",
            "--output-dir",
            dir.path().to_str().unwrap(),
        ]);
        assert!(out.contains("Generated:"));
        assert!(dir.path().join("jshake.1").exists());
        assert!(dir.path().join("jshake-generate.1").exists());
    }
}
