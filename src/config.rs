use crate::{
    error::GradCheckError,
    tool_overrides::{Tool, set_tool_override},
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

/// Optional JSON settings; command-line flags take precedence over every field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckConfig {
    /// Executable path per tool name, e.g. `"tckgen": "/opt/mrtrix3/bin/tckgen"`.
    pub tools: BTreeMap<String, String>,
    pub streamlines: Option<usize>,
    pub nthreads: Option<usize>,
    pub scratch: Option<PathBuf>,
}

impl CheckConfig {
    pub fn from_json_str(text: &str) -> Result<Self, GradCheckError> {
        let config: Self = serde_json::from_str(text).map_err(|e| GradCheckError::Parse {
            context: "configuration JSON".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, GradCheckError> {
        let text = fs::read_to_string(path)
            .map_err(|e| GradCheckError::io("Could not read configuration file", path, e))?;
        Self::from_json_str(&text)
    }

    fn validate(&self) -> Result<(), GradCheckError> {
        for name in self.tools.keys() {
            name.parse::<Tool>().map_err(|message| GradCheckError::Parse {
                context: "configuration JSON".to_string(),
                message,
            })?;
        }
        if self.streamlines == Some(0) {
            return Err(GradCheckError::invalid_input(
                "configured streamline count must be positive",
            ));
        }
        Ok(())
    }

    /// Registers every configured executable path as a process-wide override.
    pub fn apply_tool_overrides(&self) -> Result<(), GradCheckError> {
        for (name, path) in &self.tools {
            let tool = name.parse::<Tool>().map_err(|message| GradCheckError::Parse {
                context: "configuration JSON".to_string(),
                message,
            })?;
            set_tool_override(tool, path);
        }
        Ok(())
    }
}
