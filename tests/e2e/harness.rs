//! Runs the built `depscout` binary with an isolated HOME per scenario

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};

static ENV_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Variables that would leak a real token or log filter into a run
const SCRUBBED_VARS: [&str; 3] = ["GITHUB_TOKEN", "GITLAB_TOKEN", "RUST_LOG"];

pub struct TestContext {
    bin: PathBuf,
    tmp_root: PathBuf,
}

/// A scratch home directory; the binary reads its config from `.config/depscout`
pub struct TestEnv {
    home: PathBuf,
}

pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl TestContext {
    pub fn new() -> Result<Self, String> {
        let tmp_root =
            std::env::temp_dir().join(format!("depscout-e2e-{}", std::process::id()));
        fs::create_dir_all(&tmp_root)
            .map_err(|e| format!("Failed to create {}: {}", tmp_root.display(), e))?;
        Ok(Self {
            bin: PathBuf::from(env!("CARGO_BIN_EXE_depscout")),
            tmp_root,
        })
    }

    pub fn create_env(&self, name: &str) -> Result<TestEnv, String> {
        let n = ENV_COUNTER.fetch_add(1, Ordering::SeqCst);
        let env = TestEnv {
            home: self.tmp_root.join(format!("{:02}-{}", n, name)),
        };
        fs::create_dir_all(env.config_home())
            .map_err(|e| format!("Failed to create {}: {}", env.home.display(), e))?;
        Ok(env)
    }

    pub fn run_depscout(&self, env: &TestEnv, args: &[&str]) -> Result<CommandOutput, String> {
        let mut command = Command::new(&self.bin);
        command
            .args(args)
            .current_dir(&env.home)
            .env("HOME", &env.home)
            .env("XDG_CONFIG_HOME", env.config_home())
            .env("NO_COLOR", "1");
        for var in SCRUBBED_VARS {
            command.env_remove(var);
        }

        let output = command
            .output()
            .map_err(|e| format!("Failed to run {}: {}", self.bin.display(), e))?;
        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl TestEnv {
    fn config_home(&self) -> PathBuf {
        self.home.join(".config")
    }

    /// Write `config.json` where the binary looks for it
    pub fn write_config(&self, json: &str) -> Result<(), String> {
        let dir = self.config_home().join("depscout");
        fs::create_dir_all(&dir).map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;
        fs::write(dir.join("config.json"), json).map_err(|e| format!("Failed to write config: {}", e))
    }
}

impl CommandOutput {
    fn check(&self, ok: bool, expected: impl FnOnce() -> String) -> Result<(), String> {
        if ok {
            return Ok(());
        }
        Err(format!(
            "{}\nexit: {}\nstdout: {}\nstderr: {}",
            expected(),
            self.status,
            self.stdout,
            self.stderr
        ))
    }

    pub fn assert_success(&self) -> Result<(), String> {
        self.check(self.status == 0, || "Expected success".to_string())
    }

    pub fn assert_failure(&self) -> Result<(), String> {
        self.check(self.status != 0, || "Expected failure".to_string())
    }

    pub fn assert_exit_code(&self, code: i32) -> Result<(), String> {
        self.check(self.status == code, || format!("Expected exit {}", code))
    }

    pub fn assert_stdout_contains(&self, needle: &str) -> Result<(), String> {
        self.check(self.stdout.contains(needle), || {
            format!("Expected stdout to contain {:?}", needle)
        })
    }

    pub fn assert_stderr_contains(&self, needle: &str) -> Result<(), String> {
        self.check(self.stderr.contains(needle), || {
            format!("Expected stderr to contain {:?}", needle)
        })
    }

    /// The JSON report printed on stdout
    pub fn report(&self) -> Result<serde_json::Value, String> {
        serde_json::from_str(&self.stdout)
            .map_err(|e| format!("Invalid JSON report: {}\nstdout: {}", e, self.stdout))
    }
}
