//! Golden tests for JSON output stability
//!
//! These run offline: they only touch the alias configuration and the
//! argument checks that precede any remote call.
//!
//! Run with: `cargo test -p snapstore-cli --features golden`

#![cfg(feature = "golden")]

use std::process::{Command, Output};

use tempfile::TempDir;

fn run_snap(args: &[&str], config_dir: &TempDir) -> Output {
    Command::new(env!("CARGO_BIN_EXE_snap"))
        .args(args)
        .env("SNAP_CONFIG_DIR", config_dir.path())
        .output()
        .expect("Failed to execute snap")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be valid JSON")
}

fn stderr_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stderr).expect("stderr should be valid JSON")
}

mod alias_tests {
    use super::*;

    #[test]
    fn test_alias_list_empty_json() {
        let config_dir = TempDir::new().unwrap();
        let output = run_snap(&["alias", "list", "--json"], &config_dir);
        assert!(output.status.success());

        insta::assert_json_snapshot!(stdout_json(&output), @r#"
        {
          "aliases": []
        }
        "#);
    }

    #[test]
    fn test_alias_set_json() {
        let config_dir = TempDir::new().unwrap();
        let output = run_snap(
            &[
                "alias",
                "set",
                "local",
                "http://localhost:9000",
                "accesskey",
                "secretkey",
                "--json",
            ],
            &config_dir,
        );
        assert!(output.status.success());

        insta::assert_json_snapshot!(stdout_json(&output), @r#"
        {
          "alias": "local",
          "message": "Alias 'local' configured successfully",
          "success": true
        }
        "#);
    }

    #[test]
    fn test_alias_list_with_aliases_json() {
        let config_dir = TempDir::new().unwrap();
        run_snap(
            &["alias", "set", "local", "http://localhost:9000", "a", "b"],
            &config_dir,
        );
        run_snap(
            &[
                "alias",
                "set",
                "backup",
                "https://s3.example.com",
                "c",
                "d",
                "--region",
                "eu-west-1",
                "--bucket-lookup",
                "dns",
                "--max-attempts",
                "5",
            ],
            &config_dir,
        );

        let output = run_snap(&["alias", "list", "--json"], &config_dir);
        assert!(output.status.success());

        insta::assert_json_snapshot!(stdout_json(&output), @r#"
        {
          "aliases": [
            {
              "bucket_lookup": "dns",
              "endpoint": "https://s3.example.com",
              "max_attempts": 5,
              "name": "backup",
              "region": "eu-west-1"
            },
            {
              "bucket_lookup": "auto",
              "endpoint": "http://localhost:9000",
              "max_attempts": 3,
              "name": "local",
              "region": "us-east-1"
            }
          ]
        }
        "#);
    }

    #[test]
    fn test_alias_remove_not_found_json() {
        let config_dir = TempDir::new().unwrap();
        let output = run_snap(&["alias", "remove", "nope", "--json"], &config_dir);
        assert_eq!(output.status.code(), Some(5));

        insta::assert_json_snapshot!(stderr_json(&output), @r#"
        {
          "error": "Failed to remove alias: Alias not found: nope",
          "exit_code": 5
        }
        "#);
    }

    #[test]
    fn test_alias_set_rejects_bad_endpoint() {
        let config_dir = TempDir::new().unwrap();
        let output = run_snap(
            &["alias", "set", "local", "ftp://host", "a", "b", "--json"],
            &config_dir,
        );
        assert_eq!(output.status.code(), Some(2));
        assert!(stderr_json(&output)["error"].is_string());
    }
}

mod usage_tests {
    use super::*;

    #[test]
    fn test_cat_prefix_is_usage_error() {
        let config_dir = TempDir::new().unwrap();
        let output = run_snap(&["cat", "local/snapshots/indices/", "--json"], &config_dir);
        assert_eq!(output.status.code(), Some(2));
        assert_eq!(stderr_json(&output)["exit_code"], 2);
    }

    #[test]
    fn test_rm_prefix_requires_recursive() {
        let config_dir = TempDir::new().unwrap();
        let output = run_snap(&["rm", "local/snapshots/indices/"], &config_dir);
        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn test_mv_across_buckets_is_usage_error() {
        let config_dir = TempDir::new().unwrap();
        let output = run_snap(&["mv", "local/a/key", "local/b/key"], &config_dir);
        assert_eq!(output.status.code(), Some(2));
    }
}
