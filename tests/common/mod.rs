use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Runs the issuedeck binary in an isolated temp directory.
///
/// HOME and XDG_CONFIG_HOME point into the temp directory so a developer's
/// own config never leaks into a test.
pub struct DeckTest {
    pub temp_dir: TempDir,
}

impl DeckTest {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        DeckTest { temp_dir }
    }

    pub fn run(&self, args: &[&str]) -> Output {
        let home = self.temp_dir.path().join("home");
        Command::new(env!("CARGO_BIN_EXE_issuedeck"))
            .args(args)
            .current_dir(self.temp_dir.path())
            .env("HOME", &home)
            .env("XDG_CONFIG_HOME", home.join(".config"))
            .env_remove("ISSUEDECK_TOKEN")
            .env_remove("ISSUEDECK_BASE_URL")
            .env_remove("ISSUEDECK_LOG")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute issuedeck command")
    }

    pub fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if !output.status.success() {
            panic!(
                "Command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
                args,
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub fn run_failure(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            !output.status.success(),
            "Expected command {:?} to fail, but it succeeded",
            args
        );
        String::from_utf8_lossy(&output.stderr).to_string()
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join(".issuedeck").join("config.yaml")
    }

    pub fn write_config(&self, content: &str) {
        let path = self.config_path();
        fs::create_dir_all(path.parent().unwrap()).expect("Failed to create config dir");
        fs::write(path, content).expect("Failed to write config");
    }

    pub fn read_config(&self) -> String {
        fs::read_to_string(self.config_path()).expect("Failed to read config file")
    }
}
