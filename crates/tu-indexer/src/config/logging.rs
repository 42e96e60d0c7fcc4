use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    /// Raise the level by `steps` (one per `-v`).
    pub fn raised(
        self,
        steps: u8,
    ) -> Self {
        const ORDER: [LogLevel; 5] = [LogLevel::Error, LogLevel::Warn, LogLevel::Info, LogLevel::Debug, LogLevel::Trace];
        let current = ORDER.iter().position(|l| *l == self).unwrap_or(2);
        ORDER[(current + steps as usize).min(ORDER.len() - 1)]
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoggingSettings {
    pub level: LogLevel,
}

impl LoggingSettings {
    pub(crate) fn apply_patch(
        &mut self,
        patch: LoggingSettingsPatch,
    ) {
        if let Some(v) = patch.level {
            self.level = v;
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub(crate) struct LoggingSettingsPatch {
    pub(crate) level: Option<LogLevel>,
    #[serde(flatten)]
    pub(crate) _extra: HashMap<String, toml::Value>,
}
