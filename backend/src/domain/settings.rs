use shared::{Settings, Theme};
use std::fmt;
use std::str::FromStr;

/// The settings a profile carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    Theme,
    Currency,
}

impl SettingKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::Theme => "theme",
            SettingKey::Currency => "currency",
        }
    }

    /// Read this setting as text
    pub fn read(&self, settings: &Settings) -> String {
        match self {
            SettingKey::Theme => settings.theme.to_string(),
            SettingKey::Currency => settings.currency.clone(),
        }
    }

    /// Write `value` into `settings`; returns whether anything changed
    pub fn write(&self, settings: &mut Settings, value: &str) -> Result<bool, SettingError> {
        match self {
            SettingKey::Theme => {
                let theme: Theme = value
                    .parse()
                    .map_err(|_| SettingError::InvalidTheme(value.to_string()))?;
                let changed = settings.theme != theme;
                settings.theme = theme;
                Ok(changed)
            }
            SettingKey::Currency => {
                let currency = normalize_currency(value)?;
                let changed = settings.currency != currency;
                settings.currency = currency;
                Ok(changed)
            }
        }
    }
}

impl FromStr for SettingKey {
    type Err = SettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "theme" => Ok(SettingKey::Theme),
            "currency" => Ok(SettingKey::Currency),
            _ => Err(SettingError::UnknownKey(s.to_string())),
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Currency codes are three ASCII letters, stored upper case
fn normalize_currency(value: &str) -> Result<String, SettingError> {
    let code = value.trim();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code.to_ascii_uppercase())
    } else {
        Err(SettingError::InvalidCurrency(value.to_string()))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SettingError {
    #[error("Unknown setting: {0}")]
    UnknownKey(String),
    #[error("Theme must be light, dark or auto, got {0:?}")]
    InvalidTheme(String),
    #[error("Currency must be a three letter ISO 4217 code, got {0:?}")]
    InvalidCurrency(String),
}
