//! Common utilities for integration tests
//!
//! Cleanup guards plus helpers for talking to a PostgreSQL container.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;

/// Guard that ensures Docker container cleanup on drop (even on panic)
pub struct ContainerGuard {
    name: String,
}

impl ContainerGuard {
    pub fn new(name: String) -> Self {
        Self { name }
    }
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        // -v also removes the anonymous data volume
        let _ = Command::new("docker").args(["stop", &self.name]).output();
        let _ = Command::new("docker").args(["rm", "-v", &self.name]).output();
    }
}

pub fn is_docker_available() -> bool {
    Command::new("docker")
        .args(["ps"])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

pub const POSTGRES_PASSWORD: &str = "testpass";

/// Start a PostgreSQL container and wait until it accepts connections
pub fn start_postgres_container(name: &str) -> Result<ContainerGuard> {
    let output = Command::new("docker")
        .args([
            "run",
            "-d",
            "--name",
            name,
            "-e",
            &format!("POSTGRES_PASSWORD={}", POSTGRES_PASSWORD),
            "-e",
            "POSTGRES_DB=testdb",
            "postgres:15-alpine",
        ])
        .output()?;
    if !output.status.success() {
        anyhow::bail!(
            "Failed to start container: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
    let guard = ContainerGuard::new(name.to_string());

    for _ in 0..30 {
        let ready = Command::new("docker")
            .args(["exec", name, "pg_isready", "-U", "postgres", "-h", "localhost"])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        if ready {
            return Ok(guard);
        }
        thread::sleep(Duration::from_secs(1));
    }

    Err(anyhow::anyhow!("PostgreSQL failed to become ready"))
}

pub fn exec_sql(container: &str, sql: &str) -> Result<String> {
    let output = Command::new("docker")
        .args([
            "exec", container, "psql", "-U", "postgres", "-d", "testdb", "-t", "-c", sql,
        ])
        .output()?;

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Write an executable script that runs `pg_dumpall` inside the container,
/// passing through whatever arguments it was given
#[cfg(unix)]
pub fn write_dump_wrapper(dir: &Path, container: &str) -> Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("pg_dumpall-in-docker");
    let script = format!(
        "#!/bin/sh\nexec docker exec -e PGPASSWORD={} {} pg_dumpall -U postgres \"$@\"\n",
        POSTGRES_PASSWORD, container
    );
    std::fs::write(&path, script)?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(path)
}
