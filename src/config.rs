use std::{env, str::FromStr};

use remoting::envelope::{DEFAULT_RESPONSE_URI, DEFAULT_VERSION};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub logger: LoggerConfig,
    pub amf_version: u16,
    pub response_uri: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggerConfig {
    pub level: String,
    pub format: LoggerFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerFormat {
    Pretty,
    Json,
    Compact,
}

impl FromStr for LoggerFormat {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(LoggerFormat::Json),
            "pretty" => Ok(LoggerFormat::Pretty),
            "compact" => Ok(LoggerFormat::Compact),
            _ => Err("invalid logger format"),
        }
    }
}

pub fn read_config() -> Config {
    config_from(|name| env::var(name).ok())
}

fn config_from(var: impl Fn(&str) -> Option<String>) -> Config {
    let level = var("AMFKIT_LOGGER_LEVEL").unwrap_or_else(|| "info".to_string());

    let default_logger_format = LoggerFormat::Compact;
    let format = match var("AMFKIT_LOGGER_FORMAT") {
        Some(format) => LoggerFormat::from_str(&format).unwrap_or(default_logger_format),
        None => default_logger_format,
    };

    let amf_version = match var("AMFKIT_AMF_VERSION") {
        Some(version) => version.parse::<u16>().unwrap_or(DEFAULT_VERSION),
        None => DEFAULT_VERSION,
    };

    let response_uri =
        var("AMFKIT_RESPONSE_URI").unwrap_or_else(|| DEFAULT_RESPONSE_URI.to_string());

    Config {
        logger: LoggerConfig { level, format },
        amf_version,
        response_uri,
    }
}
