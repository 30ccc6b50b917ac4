// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Harness configuration.
//!
//! Configuration is layered: the embedded [`HarnessConfig::DEFAULT_CONFIG`] comes first, then the
//! workspace's [`HarnessConfig::CONFIG_PATH`] (or an explicitly passed file).

use crate::errors::ConfigParseError;
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, File, FileFormat};
use serde::Deserialize;
use std::{env, ffi::OsStr};
use tracing::debug;

/// Settings shared by every launch of the runner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarnessConfig {
    program: String,
    startup_args: Vec<String>,
    entry_point: Option<Utf8PathBuf>,
    fixtures_dir: Utf8PathBuf,
    forward_diagnostics: bool,
}

impl HarnessConfig {
    /// The name of the config file, relative to the workspace root.
    pub const CONFIG_PATH: &'static str = ".config/status-harness.toml";

    /// Contains the default config as a TOML file.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Setting this environment variable to a non-empty value turns on diagnostic forwarding.
    pub const DEBUG_ENV: &'static str = "STATUS_HARNESS_DEBUG";

    /// Creates a config that runs `program` in `fixtures_dir`, with every other setting at its
    /// default.
    ///
    /// Diagnostic forwarding is off unless [`Self::DEBUG_ENV`] is set.
    pub fn new(program: impl Into<String>, fixtures_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            program: program.into(),
            startup_args: Vec::new(),
            entry_point: None,
            fixtures_dir: fixtures_dir.into(),
            forward_diagnostics: debug_env_enabled(),
        }
    }

    /// Reads the config for the workspace at `workspace_root`.
    ///
    /// If `file` is passed, it is read instead of [`Self::CONFIG_PATH`] and must exist. Relative
    /// paths in the config are resolved against `workspace_root`.
    pub fn from_sources(
        workspace_root: impl AsRef<Utf8Path>,
        file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let workspace_root = workspace_root.as_ref();
        let (config_file, source) = match file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = workspace_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let deserialized: HarnessConfigDeserialize = Config::builder()
            .add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(source)
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|err| ConfigParseError::new(&config_file, err))?;
        debug!(%config_file, "read harness config");

        let HarnessConfigDeserialize {
            runner,
            fixtures,
            diagnostics,
        } = deserialized;
        Ok(Self {
            program: runner.program,
            startup_args: runner.startup_args,
            entry_point: runner.entry_point.map(|path| workspace_root.join(path)),
            fixtures_dir: workspace_root.join(fixtures.dir),
            forward_diagnostics: diagnostics.forward || debug_env_enabled(),
        })
    }

    /// Sets the program used to start the runner.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Sets the arguments passed to the program ahead of everything else.
    pub fn with_startup_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.startup_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the runner's entry point.
    pub fn with_entry_point(mut self, entry_point: impl Into<Utf8PathBuf>) -> Self {
        self.entry_point = Some(entry_point.into());
        self
    }

    /// Sets whether diagnostic output is forwarded.
    pub fn with_forward_diagnostics(mut self, forward: bool) -> Self {
        self.forward_diagnostics = forward;
        self
    }

    /// Returns the program used to start the runner.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the arguments passed to the program ahead of everything else.
    pub fn startup_args(&self) -> &[String] {
        &self.startup_args
    }

    /// Returns the runner's entry point, if one is configured.
    pub fn entry_point(&self) -> Option<&Utf8Path> {
        self.entry_point.as_deref()
    }

    /// Returns the default working directory for runs.
    pub fn fixtures_dir(&self) -> &Utf8Path {
        &self.fixtures_dir
    }

    /// Returns whether diagnostic output is forwarded.
    pub fn forward_diagnostics(&self) -> bool {
        self.forward_diagnostics
    }

    /// Joins `parts` onto the fixtures directory.
    pub fn fixture_dir<I>(&self, parts: I) -> Utf8PathBuf
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut dir = self.fixtures_dir.clone();
        for part in parts {
            dir.push(part.as_ref());
        }
        dir
    }
}

fn debug_env_enabled() -> bool {
    is_debug_value(env::var_os(HarnessConfig::DEBUG_ENV).as_deref())
}

/// Any non-empty value turns debugging on.
fn is_debug_value(value: Option<&OsStr>) -> bool {
    value.is_some_and(|value| !value.is_empty())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct HarnessConfigDeserialize {
    runner: RunnerDeserialize,
    fixtures: FixturesDeserialize,
    diagnostics: DiagnosticsDeserialize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RunnerDeserialize {
    program: String,
    #[serde(default)]
    startup_args: Vec<String>,
    #[serde(default)]
    entry_point: Option<Utf8PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct FixturesDeserialize {
    dir: Utf8PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DiagnosticsDeserialize {
    forward: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn write_config(dir: &Utf8TempDir, contents: &str) -> Utf8PathBuf {
        let path = dir.path().join(HarnessConfig::CONFIG_PATH);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn defaults_without_config_file() {
        let dir = Utf8TempDir::new().unwrap();
        let config = HarnessConfig::from_sources(dir.path(), None).unwrap();

        assert_eq!(config.program(), "node");
        assert!(config.startup_args().is_empty());
        assert_eq!(config.entry_point(), None);
        assert_eq!(config.fixtures_dir(), dir.path().join("fixtures"));
        assert_eq!(
            config.fixture_dir(["basic", "nested"]),
            dir.path().join("fixtures").join("basic").join("nested")
        );
    }

    #[test]
    fn workspace_config_is_layered() {
        let dir = Utf8TempDir::new().unwrap();
        write_config(
            &dir,
            indoc! {r#"
                [runner]
                startup-args = ["--require", "shim.js"]
                entry-point = "bin/cli.mjs"

                [fixtures]
                dir = "test/fixtures"
            "#},
        );

        let config = HarnessConfig::from_sources(dir.path(), None).unwrap();
        assert_eq!(config.program(), "node", "unset keys keep their defaults");
        assert_eq!(config.startup_args(), ["--require", "shim.js"]);
        assert_eq!(
            config.entry_point(),
            Some(dir.path().join("bin/cli.mjs").as_path())
        );
        assert_eq!(config.fixtures_dir(), dir.path().join("test/fixtures"));
    }

    #[test]
    fn explicit_file_must_exist() {
        let dir = Utf8TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = HarnessConfig::from_sources(dir.path(), Some(&missing)).unwrap_err();
        assert_eq!(err.config_file(), &missing);
    }

    #[test]
    fn invalid_config_is_an_error() {
        let dir = Utf8TempDir::new().unwrap();
        let path = write_config(&dir, "[diagnostics]\nforward = \"sometimes\"\n");
        let err = HarnessConfig::from_sources(dir.path(), None).unwrap_err();
        assert_eq!(err.config_file(), &path);
    }

    #[test_case(None, false; "unset")]
    #[test_case(Some(""), false; "empty")]
    #[test_case(Some("1"), true; "one")]
    #[test_case(Some("0"), true; "any value")]
    fn debug_env_values(value: Option<&str>, enabled: bool) {
        assert_eq!(is_debug_value(value.map(OsStr::new)), enabled);
    }

    #[test]
    fn builder_overrides() {
        let config = HarnessConfig::new("node", "/fixtures")
            .with_program("runner")
            .with_startup_args(["--flag"])
            .with_entry_point("/cli.js")
            .with_forward_diagnostics(true);
        assert_eq!(config.program(), "runner");
        assert_eq!(config.startup_args(), ["--flag"]);
        assert_eq!(config.entry_point(), Some(Utf8Path::new("/cli.js")));
        assert!(config.forward_diagnostics());
    }
}
