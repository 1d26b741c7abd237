//! # Configuration Module
//!
//! This module defines the application configuration and the limits applied
//! to user input. Values come from the environment (a `.env` file is loaded
//! first when present).

use anyhow::{anyhow, Context, Result};
use std::env;
use std::str::FromStr;

// Input limits
pub const MAX_ITEM_NAME_LENGTH: usize = 100;
pub const MAX_UNIT_LENGTH: usize = 20;
pub const MAX_RECIPE_NAME_LENGTH: usize = 200;
pub const MAX_POST_TITLE_LENGTH: usize = 200;

// Defaults
pub const DEFAULT_SEARCH_LIMIT: usize = 50;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Log output format for the binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" | "" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow!("Unknown log format: {other}")),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL connection string; required unless running in memory
    pub database_url: Option<String>,
    /// Connection pool size
    pub max_connections: u32,
    /// Maximum items returned by a catalog search
    pub search_limit: usize,
    /// Seed grocery types, starter items and sample recipes after schema init
    pub seed_on_start: bool,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            search_limit: DEFAULT_SEARCH_LIMIT,
            seed_on_start: true,
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Load from the process environment, after reading `.env` if present
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                defaults.max_connections,
            )?,
            search_limit: parse_or(&lookup, "SEARCH_LIMIT", defaults.search_limit)?,
            seed_on_start: parse_bool_or(&lookup, "SEED_ON_START", defaults.seed_on_start)?,
            log_format: parse_or(&lookup, "LOG_FORMAT", defaults.log_format)?,
        })
    }

    /// The database URL, or an error naming the missing variable
    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| anyhow!("DATABASE_URL must be set"))
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("Invalid value for {key}: '{raw}'")),
    }
}

fn parse_bool_or<F>(lookup: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(anyhow!("Invalid value for {key}: '{v}'")),
    }
}
