use std::net::IpAddr;

use crate::error::{Error, Result};

/// Targets compared when the user adds none of their own.
pub const DEFAULT_COMPARE_TARGETS: [&str; 5] = [
    "8.8.8.8",
    "1.1.1.1",
    "github.com",
    "stackoverflow.com",
    "aws.amazon.com",
];

/// Sanitize a host by keeping only valid characters (alphanumeric, dots, hyphens).
/// IP literals pass through untouched; a trailing `:port` on a hostname is dropped.
pub fn sanitize_target(target: &str) -> Result<String> {
    let trimmed = target.trim();
    if let Ok(ip) = trimmed.parse::<IpAddr>() {
        return Ok(ip.to_string());
    }

    // Also handle case where user included port like "example.com:8080"
    let host = trimmed.split(':').next().unwrap_or(trimmed);

    let sanitized: String = host
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '.' || *c == '-')
        .collect();

    if sanitized.is_empty() || sanitized.starts_with('-') {
        Err(Error::InvalidTarget(target.to_string()))
    } else {
        Ok(sanitized)
    }
}

/// Ordered, duplicate-free list of hosts to compare.
///
/// Built up during setup; runs only ever borrow it immutably.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetList {
    targets: Vec<String>,
}

impl TargetList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut list = Self::new();
        for target in DEFAULT_COMPARE_TARGETS {
            // Defaults are valid and unique
            let _ = list.push(target);
        }
        list
    }

    /// Adds a target. Returns `Ok(false)` if it was already present.
    pub fn push(&mut self, target: &str) -> Result<bool> {
        let target = sanitize_target(target)?;
        if self.contains(&target) {
            log::debug!("Skipping duplicate target {target}");
            return Ok(false);
        }
        self.targets.push(target);
        Ok(true)
    }

    pub fn contains(&self, target: &str) -> bool {
        self.targets.iter().any(|t| t == target)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl<'a> TryFrom<&'a [&'a str]> for TargetList {
    type Error = Error;

    fn try_from(targets: &'a [&'a str]) -> Result<Self> {
        let mut list = Self::new();
        for target in targets {
            list.push(target)?;
        }
        Ok(list)
    }
}
