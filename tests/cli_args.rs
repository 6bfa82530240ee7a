//! Integration tests for the grokipedia binary
//!
//! Runs the built CLI against a mock API server and checks output and exit
//! codes.

use std::path::Path;
use std::process::Command;

use httpmock::prelude::*;
use tempfile::TempDir;

/// Runs the CLI with `home` as its home directory and no GROKIPEDIA_* variables
fn run_cli(home: &Path, args: &[&str]) -> std::process::Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_grokipedia"));
    cmd.args(args).env("HOME", home).env_remove("RUST_LOG");
    for (key, _) in std::env::vars() {
        if key.starts_with("GROKIPEDIA_") {
            cmd.env_remove(key);
        }
    }
    cmd.output().expect("Failed to execute grokipedia")
}

fn exit_code(output: &std::process::Output) -> i32 {
    output.status.code().expect("process exited with a code")
}

#[test]
fn test_help_flag_exits_successfully() {
    let home = TempDir::new().unwrap();
    let output = run_cli(home.path(), &["--help"]);
    assert!(output.status.success(), "Expected --help to exit successfully");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("grokipedia"));
    assert!(stdout.contains("search"));
    assert!(stdout.contains("edits-by-slug"));
}

#[test]
fn test_version_flag_exits_successfully() {
    let home = TempDir::new().unwrap();
    let output = run_cli(home.path(), &["--version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_usage_errors_exit_with_invalid_args() {
    let home = TempDir::new().unwrap();
    for args in [
        vec!["search", "rust", "--format", "xml"],
        vec!["search", "rust", "--limit", "0"],
        vec!["typeahead", "ru", "--limit", "99"],
        vec!["bogus"],
        vec![],
    ] {
        let output = run_cli(home.path(), &args);
        assert_eq!(exit_code(&output), 4, "args {:?}", args);
        assert!(!output.stderr.is_empty());
    }
}

#[test]
fn test_missing_explicit_config_is_invalid_args() {
    let home = TempDir::new().unwrap();
    let output = run_cli(
        home.path(),
        &["--config", "/nonexistent/grokipedia.yml", "constants"],
    );
    assert_eq!(exit_code(&output), 4);
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}

#[test]
fn test_empty_status_list_is_invalid_args() {
    let home = TempDir::new().unwrap();
    let output = run_cli(
        home.path(),
        &["--api-url", "http://127.0.0.1:9", "edits", "--status", "pending,,approved"],
    );
    assert_eq!(exit_code(&output), 4);
}

#[test]
fn test_cache_clear_succeeds_on_missing_directory() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join("cache");
    let dir_arg = dir.to_string_lossy().into_owned();

    for _ in 0..2 {
        let output = run_cli(home.path(), &["--cache-dir", dir_arg.as_str(), "cache", "clear"]);
        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("Cache cleared"));
    }
}

#[test]
fn test_completion_prints_script() {
    let home = TempDir::new().unwrap();
    let output = run_cli(home.path(), &["completion", "bash"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("grokipedia"));
}

#[test]
fn test_search_json_end_to_end_uses_cache() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/full-text-search")
            .query_param("q", "rust")
            .query_param("limit", "3");
        then.status(200)
            .body(r#"{"results":[{"title":"Rust","slug":"Rust","relevanceScore":0.9,"viewCount":4}],"totalCount":1}"#);
    });

    let home = TempDir::new().unwrap();
    let cache_dir = home.path().join("cache").to_string_lossy().into_owned();
    let base = server.base_url();
    let args = [
        "--api-url", base.as_str(), "--cache-dir", cache_dir.as_str(), "search", "rust", "--limit", "3",
        "--format", "json",
    ];

    let first = run_cli(home.path(), &args);
    assert!(first.status.success(), "{}", String::from_utf8_lossy(&first.stderr));
    let second = run_cli(home.path(), &args);
    assert!(second.status.success());

    mock.assert_hits(1);
    assert_eq!(first.stdout, second.stdout);
    assert!(String::from_utf8_lossy(&first.stdout).contains("\"slug\": \"Rust\""));
}

#[test]
fn test_missing_page_exits_not_found() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/page");
        then.status(404);
    });

    let home = TempDir::new().unwrap();
    let base = server.base_url();
    let output = run_cli(home.path(), &["--api-url", base.as_str(), "--no-cache", "page", "Missing"]);
    assert_eq!(exit_code(&output), 2);
    assert!(String::from_utf8_lossy(&output.stderr).contains("Missing"));
}

#[test]
fn test_rate_limited_exits_three_after_retries() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/api/constants");
        then.status(429).header("Retry-After", "60");
    });

    let home = TempDir::new().unwrap();
    let base = server.base_url();
    let output = run_cli(
        home.path(),
        &["--api-url", base.as_str(), "--no-cache", "--max-retry-delay-ms", "10", "constants"],
    );
    assert_eq!(exit_code(&output), 3);
    mock.assert_hits(3);
    assert!(String::from_utf8_lossy(&output.stderr).contains("60"));
}

#[test]
fn test_config_file_supplies_api_url() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/typeahead");
        then.status(200).body(r#"{"suggestions":["Rust"]}"#);
    });

    let home = TempDir::new().unwrap();
    let config_path = home.path().join("config.yml");
    std::fs::write(
        &config_path,
        format!("api:\n  url: {}\ncache:\n  enabled: false\n", server.base_url()),
    )
    .unwrap();

    let output = run_cli(
        home.path(),
        &["--config", config_path.to_str().unwrap(), "typeahead", "ru"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "Rust\n");
}

#[cfg(test)]
mod unit_tests {
    //! Unit tests for CLI parsing that don't require running the binary

    use clap::Parser;
    use grokipedia::api::ApiError;
    use grokipedia::cli::{Cli, Command};
    use grokipedia::config::Config;

    #[test]
    fn test_overrides_flow_into_config() {
        let cli = Cli::parse_from([
            "grokipedia",
            "--api-url",
            "http://localhost:1234",
            "--no-cache",
            "search",
            "rust",
        ]);
        let mut config = Config::default();
        config.apply(&cli.globals.overrides());
        assert_eq!(config.api.url, "http://localhost:1234");
        assert!(!config.cache_enabled());
    }

    #[test]
    fn test_edits_by_slug_defaults() {
        let cli = Cli::parse_from(["grokipedia", "edits-by-slug", "Rust"]);
        match cli.command {
            Command::EditsBySlug(args) => {
                assert_eq!(args.slug, "Rust");
                assert_eq!(args.offset, 0);
                assert!(args.limit.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_status_errors_map_to_invalid_args() {
        let cli = Cli::parse_from(["grokipedia", "edits", "--status", ","]);
        let Command::Edits(args) = cli.command else {
            panic!("expected edits");
        };
        let err: ApiError = args.statuses().unwrap_err().into();
        assert_eq!(err.exit_code().code(), 4);
    }
}
