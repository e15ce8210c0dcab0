use std::env;
use std::fmt;

/// Environment variable naming the C compiler driver used for linking.
pub const LINKER_ENV: &str = "TL_LINKER";
const DEFAULT_LINKER: &str = "cc";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptLevel {
    None,
    #[default]
    Speed,
    SpeedAndSize,
}

impl OptLevel {
    /// Value of Cranelift's `opt_level` setting.
    pub fn as_setting(self) -> &'static str {
        match self {
            OptLevel::None => "none",
            OptLevel::Speed => "speed",
            OptLevel::SpeedAndSize => "speed_and_size",
        }
    }
}

impl fmt::Display for OptLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_setting())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenOptions {
    pub opt_level: OptLevel,
    pub linker: String,
}

impl CodegenOptions {
    /// Defaults, with the linker taken from `TL_LINKER` when set.
    pub fn from_env() -> Self {
        let linker = env::var(LINKER_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LINKER.to_string());
        CodegenOptions {
            opt_level: OptLevel::default(),
            linker,
        }
    }
}

impl Default for CodegenOptions {
    fn default() -> Self {
        CodegenOptions {
            opt_level: OptLevel::default(),
            linker: DEFAULT_LINKER.to_string(),
        }
    }
}
