//! Runner configuration, read from YAML or JSON.
//!
//! ```yaml
//! model:
//!   path: models/detector.tflite
//! num_threads: 4
//! delegates:
//!   - kind: gpu
//!     precision_loss_allowed: true
//!   - kind: nnapi
//!     accelerator_name: qti-dsp
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::delegate::DelegateOptions;
use crate::engine::Engine;
use crate::error::RunnerError;
use crate::runner::{ModelRunner, OwnedModelSource};

/// Where to load the model from. Exactly one field must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model file path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// ID of a model registered with [`register_model`](crate::register_model).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered: Option<String>,
}

impl ModelConfig {
    /// Returns the configured source, or a config error unless exactly one
    /// field is set.
    pub fn source(&self) -> Result<OwnedModelSource, RunnerError> {
        match (&self.path, &self.registered) {
            (Some(path), None) => Ok(OwnedModelSource::File(path.clone())),
            (None, Some(id)) => Ok(OwnedModelSource::Registered(id.clone())),
            (Some(_), Some(_)) => Err(RunnerError::Config(
                "model: set either path or registered, not both".into(),
            )),
            (None, None) => Err(RunnerError::Config("model: path or registered is required".into())),
        }
    }
}

/// Configuration for [`ModelRunner::from_config`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelConfig>,

    /// Interpreter threads. Unset means engine default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_threads: Option<i32>,

    /// Delegates, attached in this order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delegates: Vec<DelegateOptions>,
}

impl RunnerConfig {
    /// Parses a YAML document.
    pub fn from_yaml_str(s: &str) -> Result<Self, RunnerError> {
        serde_yaml::from_str(s).map_err(|e| RunnerError::Config(e.to_string()))
    }

    /// Parses a JSON document.
    pub fn from_json_str(s: &str) -> Result<Self, RunnerError> {
        serde_json::from_str(s).map_err(|e| RunnerError::Config(e.to_string()))
    }

    /// Reads a config file. `.json` files are parsed as JSON, anything else
    /// as YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RunnerError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| RunnerError::Config(format!("read {}: {e}", path.display())))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Renders the config as YAML; [`from_yaml_str`](Self::from_yaml_str)
    /// reads it back.
    pub fn to_yaml_string(&self) -> Result<String, RunnerError> {
        serde_yaml::to_string(self).map_err(|e| RunnerError::Config(e.to_string()))
    }
}

impl<E: Engine> ModelRunner<E> {
    /// Builds a ready runner from `config`: loads the model, applies the
    /// thread count, attaches delegates in order and builds the interpreter.
    pub fn from_config(engine: E, config: &RunnerConfig) -> Result<Self, RunnerError> {
        let model = config
            .model
            .as_ref()
            .ok_or_else(|| RunnerError::Config("model is required".into()))?
            .source()?;

        let mut runner = ModelRunner::new(engine);
        runner.build_model(model.as_source())?;
        if let Some(n) = config.num_threads {
            runner.set_num_threads(n)?;
        }
        for delegate in &config.delegates {
            runner.attach_delegate(delegate.clone())?;
        }
        runner.build_interpreter()?;
        tracing::debug!("modelrt: runner built from config");
        Ok(runner)
    }
}
