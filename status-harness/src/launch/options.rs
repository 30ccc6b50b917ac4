// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    config::HarnessConfig,
    errors::LaunchError,
    helpers::absolute_utf8,
    ipc::{EMIT_STATUS_ENV, EMIT_STATUS_HANDSHAKE, SerializationMode},
};
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Per-launch overrides.
///
/// These are deep-merged over the launch defaults: environment maps merge key by key, and any
/// option left unset keeps its default.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LaunchOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cwd: Option<Utf8PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    runtime_args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inherit_env: Option<bool>,
}

impl LaunchOptions {
    /// Creates options that keep every default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs in `cwd` instead of the fixtures directory.
    pub fn cwd(&mut self, cwd: impl Into<Utf8PathBuf>) -> &mut Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Sets an environment variable for the runner.
    pub fn env(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Sets several environment variables for the runner.
    pub fn envs(
        &mut self,
        vars: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> &mut Self {
        for (key, value) in vars {
            self.env(key, value);
        }
        self
    }

    /// Replaces the runtime arguments, which are passed after the startup arguments.
    pub fn runtime_args(&mut self, args: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.runtime_args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Sets whether the runner inherits the harness's environment. Defaults to true.
    pub fn inherit_env(&mut self, inherit_env: bool) -> &mut Self {
        self.inherit_env = Some(inherit_env);
        self
    }
}

/// The settings for a single launch, after merging [`LaunchOptions`] over the defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LaunchSettings {
    /// The working directory of the runner. Test files are reported relative to it.
    pub cwd: Utf8PathBuf,

    /// Environment variables set for the runner, on top of the inherited environment if any.
    pub env: BTreeMap<String, String>,

    /// Arguments passed after the startup arguments.
    pub runtime_args: Vec<String>,

    /// Whether the runner inherits the harness's environment.
    pub inherit_env: bool,

    /// Arguments passed ahead of everything else. Always taken from the config.
    pub startup_args: Vec<String>,

    /// How status messages are framed. Always [`SerializationMode::Advanced`].
    pub serialization: SerializationMode,
}

impl LaunchSettings {
    /// Returns the defaults every launch starts from.
    pub fn defaults(config: &HarnessConfig) -> Self {
        Self {
            cwd: config.fixtures_dir().to_owned(),
            env: BTreeMap::from([(
                EMIT_STATUS_ENV.to_owned(),
                EMIT_STATUS_HANDSHAKE.to_owned(),
            )]),
            runtime_args: Vec::new(),
            inherit_env: true,
            startup_args: config.startup_args().to_vec(),
            serialization: SerializationMode::Advanced,
        }
    }

    /// Merges `options` over the defaults for `config`.
    ///
    /// The startup arguments and serialization mode are applied after the merge, so they can't be
    /// overridden. A relative working directory is resolved against the current directory, so the
    /// runner and the report agree on it.
    pub fn resolve(config: &HarnessConfig, options: &LaunchOptions) -> Result<Self, LaunchError> {
        let defaults = Self::defaults(config);
        let mut merged = serde_json::to_value(&defaults).map_err(LaunchError::InvalidOptions)?;
        let overrides = serde_json::to_value(options).map_err(LaunchError::InvalidOptions)?;
        merge_json(&mut merged, overrides);

        let mut settings: Self =
            serde_json::from_value(merged).map_err(LaunchError::InvalidOptions)?;
        settings.startup_args = defaults.startup_args;
        settings.serialization = defaults.serialization;
        settings.cwd = absolute_utf8(&settings.cwd).map_err(|err| LaunchError::ResolveCwd {
            cwd: settings.cwd.clone(),
            err,
        })?;
        Ok(settings)
    }
}

/// Merges `overrides` into `base`.
///
/// Objects merge key by key. Any other value in `overrides` replaces the one in `base`, except
/// for nulls, which leave `base` as it is.
pub(crate) fn merge_json(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (_, Value::Null) => {}
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        if !value.is_null() {
                            base.insert(key, value);
                        }
                    }
                }
            }
        }
        (base, overrides) => *base = overrides,
    }
}
