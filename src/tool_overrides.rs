use std::{
    collections::HashMap,
    fmt,
    str::FromStr,
    sync::{LazyLock, PoisonError, RwLock},
};

/// External executables the check drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    MrInfo,
    MrConvert,
    Dwi2Mask,
    TckGen,
    TckStats,
}

impl Tool {
    pub const ALL: [Tool; 5] = [
        Tool::MrInfo,
        Tool::MrConvert,
        Tool::Dwi2Mask,
        Tool::TckGen,
        Tool::TckStats,
    ];

    pub fn default_bin(self) -> &'static str {
        match self {
            Tool::MrInfo => "mrinfo",
            Tool::MrConvert => "mrconvert",
            Tool::Dwi2Mask => "dwi2mask",
            Tool::TckGen => "tckgen",
            Tool::TckStats => "tckstats",
        }
    }

    pub fn env_var(self) -> &'static str {
        match self {
            Tool::MrInfo => "DWIGRADCHECK_MRINFO",
            Tool::MrConvert => "DWIGRADCHECK_MRCONVERT",
            Tool::Dwi2Mask => "DWIGRADCHECK_DWI2MASK",
            Tool::TckGen => "DWIGRADCHECK_TCKGEN",
            Tool::TckStats => "DWIGRADCHECK_TCKSTATS",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_bin())
    }
}

impl FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tool::ALL
            .into_iter()
            .find(|tool| tool.default_bin() == s.trim())
            .ok_or_else(|| format!("Unknown tool '{s}'"))
    }
}

static TOOL_OVERRIDES: LazyLock<RwLock<HashMap<Tool, String>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

fn normalized_non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// A blank value removes the override.
pub fn set_tool_override(tool: Tool, configured: &str) {
    let mut guard = TOOL_OVERRIDES
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(value) = normalized_non_empty(configured) {
        guard.insert(tool, value);
    } else {
        guard.remove(&tool);
    }
}

pub fn get_tool_override(tool: Tool) -> Option<String> {
    TOOL_OVERRIDES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&tool)
        .cloned()
}

fn configured_or_env(tool: Tool) -> Option<String> {
    get_tool_override(tool).or_else(|| {
        std::env::var(tool.env_var())
            .ok()
            .and_then(|v| normalized_non_empty(&v))
    })
}

pub fn resolve_tool_executable(tool: Tool) -> String {
    configured_or_env(tool).unwrap_or_else(|| tool.default_bin().to_string())
}

pub fn active_resolution_label(tool: Tool) -> String {
    configured_or_env(tool).unwrap_or_else(|| format!("PATH lookup: {}", tool.default_bin()))
}
