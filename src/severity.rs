//! Alert severity levels and severity-driven lookup tables.
//!
//! Every backend encodes severity differently (a chat room color, a subject
//! prefix, a syslog priority). `SeverityMap` is the shared lookup: a partial
//! map whose constructor demands the `Info`-level value, so a lookup for an
//! unmapped severity always resolves to something sensible.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ordinal urgency level attached to an alert.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Severity {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// The string representation used in log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }
}

/// A severity-keyed table that is total by construction: entries may be
/// supplied for any subset of severities, and lookups for a severity without
/// an entry fall back to the mandatory `Info` value.
#[derive(Debug, Clone)]
pub struct SeverityMap<T> {
    info: T,
    entries: HashMap<Severity, T>,
}

impl<T> SeverityMap<T> {
    /// Creates a map with the given `Info`-level value and no other entries.
    pub fn new(info: T) -> Self {
        Self {
            info,
            entries: HashMap::new(),
        }
    }

    /// Adds (or replaces) the entry for one severity.
    pub fn with(mut self, severity: Severity, value: T) -> Self {
        self.entries.insert(severity, value);
        self
    }

    /// Looks up the value for `severity`, falling back to the `Info` value
    /// when no entry exists.
    pub fn resolve(&self, severity: Severity) -> &T {
        if severity == Severity::Info {
            return &self.info;
        }
        self.entries.get(&severity).unwrap_or(&self.info)
    }
}

/// Background color understood by the chat service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatColor {
    Yellow,
    Red,
    Green,
    Purple,
    Gray,
    Random,
}

impl ChatColor {
    /// The wire representation expected by the chat API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yellow => "yellow",
            Self::Red => "red",
            Self::Green => "green",
            Self::Purple => "purple",
            Self::Gray => "gray",
            Self::Random => "random",
        }
    }
}

/// The default severity-to-color table for the chat backend.
pub fn color_map() -> SeverityMap<ChatColor> {
    SeverityMap::new(ChatColor::Purple)
        .with(Severity::Debug, ChatColor::Gray)
        .with(Severity::Warning, ChatColor::Yellow)
        .with(Severity::Error, ChatColor::Red)
        .with(Severity::Critical, ChatColor::Red)
}

/// The severity-to-prefix table used when deriving a summary line.
pub fn summary_prefix_map() -> SeverityMap<&'static str> {
    SeverityMap::new("")
        .with(Severity::Debug, "(debug info) ")
        .with(Severity::Warning, "WARNING: ")
        .with(Severity::Error, "ERROR: ")
        .with(Severity::Critical, "**CRITICAL ERROR**: ")
}
