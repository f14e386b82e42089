use anyhow::Result;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const PROFILES: &str = r#"
config:
  send_anonymous_usage_stats: false

jaffle_shop:
  target: dev
  outputs:
    dev:
      type: duckdb
      path: jaffle.duckdb
      threads: 8
    prod:
      type: postgres
      host: db.internal
      user: dbt
      password: "{{ env_var('JAFFLE_PG_PASSWORD') }}"
      port: 5432
      dbname: analytics
      schema: marts
      threads: 4
    broken:
      type: oracle
      host: h
"#;

/// Temporary directory holding a profiles.yml.
struct ProfilesEnv {
    dir: TempDir,
}

impl ProfilesEnv {
    fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("profiles.yml"), PROFILES)?;
        Ok(Self { dir })
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn targetry(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("targetry"));
        cmd.env("TARGETRY_PROFILES_DIR", self.path())
            .env("JAFFLE_PG_PASSWORD", "hunter2")
            .env_remove("TARGETRY_PROFILE")
            .env_remove("TARGETRY_TARGET")
            .env_remove("RUST_LOG");
        cmd
    }
}

#[test]
fn test_connection_masks_secrets_by_default() -> Result<()> {
    let env = ProfilesEnv::new()?;

    env.targetry()
        .args(["connection", "-p", "jaffle_shop", "-t", "prod"])
        .assert()
        .success()
        .stdout(predicate::str::contains("type: postgres"))
        .stdout(predicate::str::contains("host: db.internal"))
        .stdout(predicate::str::contains("********"))
        .stdout(predicate::str::contains("hunter2").not());
    Ok(())
}

#[test]
fn test_connection_show_secrets_as_json() -> Result<()> {
    let env = ProfilesEnv::new()?;

    let output = env
        .targetry()
        .args([
            "connection",
            "-p",
            "jaffle_shop",
            "-t",
            "prod",
            "--format",
            "json",
            "--show-secrets",
        ])
        .output()?;
    assert!(output.status.success());

    let connection: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(connection["type"], "postgres");
    assert_eq!(connection["password"], "hunter2");
    assert_eq!(connection["port"], 5432);
    assert_eq!(connection["concurrent_tasks"], 4);
    Ok(())
}

#[test]
fn test_duckdb_default_target_is_clamped() -> Result<()> {
    let env = ProfilesEnv::new()?;

    env.targetry()
        .args(["connection", "-p", "jaffle_shop", "--dbt-version", "1.5.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("type: duckdb"))
        .stdout(predicate::str::is_match(r"(?m)^database: jaffle\.duckdb$")?)
        .stdout(predicate::str::is_match(r"(?m)^concurrent_tasks: 1$")?)
        .stderr(predicate::str::contains("DuckDB does not support concurrency"));
    Ok(())
}

#[test]
fn test_duckdb_catalog_depends_on_dbt_version() -> Result<()> {
    let env = ProfilesEnv::new()?;

    let catalog = |version: &str| -> Result<serde_json::Value> {
        let output = env
            .targetry()
            .args(["metadata", "-p", "jaffle_shop", "--dbt-version", version])
            .output()?;
        assert!(output.status.success());
        let metadata: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        Ok(metadata["database"].clone())
    };
    assert_eq!(catalog("1.5.0")?, "jaffle");
    assert_eq!(catalog("1.4.9")?, "main");
    Ok(())
}

#[test]
fn test_metadata_is_credential_free() -> Result<()> {
    let env = ProfilesEnv::new()?;

    let output = env
        .targetry()
        .args(["metadata", "-p", "jaffle_shop", "-t", "prod"])
        .output()?;
    assert!(output.status.success());

    let metadata: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(metadata["type"], "postgres");
    assert_eq!(metadata["name"], "prod");
    assert_eq!(metadata["database"], "analytics");
    assert_eq!(metadata["schema"], "marts");
    assert!(!String::from_utf8(output.stdout)?.contains("hunter2"));
    Ok(())
}

#[test]
fn test_strategy_for_unique_key() -> Result<()> {
    let env = ProfilesEnv::new()?;

    env.targetry()
        .args(["strategy", "-t", "prod", "--kind", "incremental_by_unique_key"])
        .env("TARGETRY_PROFILE", "jaffle_shop")
        .assert()
        .success()
        .stdout(predicate::str::diff("delete+insert\n"));
    Ok(())
}

#[test]
fn test_backends_lists_every_type() -> Result<()> {
    let env = ProfilesEnv::new()?;

    let mut assert = env.targetry().arg("backends").assert().success();
    for tag in [
        "databricks",
        "duckdb",
        "postgres",
        "redshift",
        "snowflake",
        "bigquery",
        "sqlserver",
        "tsql",
        "trino",
        "athena",
        "clickhouse",
    ] {
        assert = assert.stdout(predicate::str::contains(tag));
    }
    Ok(())
}

#[test]
fn test_unsupported_type_fails() -> Result<()> {
    let env = ProfilesEnv::new()?;

    env.targetry()
        .args(["connection", "-p", "jaffle_shop", "-t", "broken"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("oracle not supported."));
    Ok(())
}

#[test]
fn test_missing_env_var_fails() -> Result<()> {
    let env = ProfilesEnv::new()?;

    env.targetry()
        .env_remove("JAFFLE_PG_PASSWORD")
        .args(["metadata", "-p", "jaffle_shop", "-t", "prod"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("JAFFLE_PG_PASSWORD"));
    Ok(())
}

#[test]
fn test_unknown_target_lists_available() -> Result<()> {
    let env = ProfilesEnv::new()?;

    env.targetry()
        .args(["metadata", "-p", "jaffle_shop", "-t", "staging"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken, dev, prod"));
    Ok(())
}
