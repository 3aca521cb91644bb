//! Visitor exclusion policy

use regex::{Regex, RegexBuilder};

use super::context::VisitorContext;
use crate::domain::DomainError;

/// User agents treated as robots unless configured otherwise
pub const DEFAULT_ROBOT_PATTERN: &str = "trivial|facebook|MetaURI|butterfly|google|amazon|goldfire|sleuth|xenu|msnbot|SiteUptime|Slurp|WordPress|ZIBB|ZyBorg|pingdom|bot|yahoo|slurp|java|fetch|spider|url|crawl|oneriot|abby|commentreader|twiceler";

/// Decides whether a visitor is kept out of experiment accounting
///
/// Robots (matched on user agent, case-insensitive) and ignored IP addresses
/// always see the control and are never counted.
#[derive(Debug, Clone)]
pub struct VisitorFilter {
    robot_pattern: Option<Regex>,
    ignored_ip_addresses: Vec<String>,
}

impl VisitorFilter {
    /// Build a filter; an empty pattern disables robot detection
    pub fn new(
        robot_pattern: &str,
        ignored_ip_addresses: Vec<String>,
    ) -> Result<Self, DomainError> {
        let robot_pattern = if robot_pattern.is_empty() {
            None
        } else {
            let regex = RegexBuilder::new(robot_pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    DomainError::configuration(format!("Invalid robot user agent pattern: {}", e))
                })?;
            Some(regex)
        };

        Ok(Self {
            robot_pattern,
            ignored_ip_addresses,
        })
    }

    /// A filter that excludes nobody
    pub fn allow_all() -> Self {
        Self {
            robot_pattern: None,
            ignored_ip_addresses: Vec::new(),
        }
    }

    /// Check if the user agent belongs to a robot; absent or empty agents are not robots
    pub fn is_robot(&self, visitor: &VisitorContext) -> bool {
        match (&self.robot_pattern, visitor.user_agent()) {
            (Some(pattern), Some(agent)) if !agent.is_empty() => pattern.is_match(agent),
            _ => false,
        }
    }

    /// Check if the visitor's IP address is on the ignore list
    pub fn is_ignored_ip_address(&self, visitor: &VisitorContext) -> bool {
        visitor
            .ip_address()
            .is_some_and(|ip| self.ignored_ip_addresses.iter().any(|ignored| ignored == ip))
    }

    /// Check if the visitor must not be counted
    pub fn is_excluded(&self, visitor: &VisitorContext) -> bool {
        self.is_robot(visitor) || self.is_ignored_ip_address(visitor)
    }
}

impl Default for VisitorFilter {
    fn default() -> Self {
        Self {
            robot_pattern: RegexBuilder::new(DEFAULT_ROBOT_PATTERN)
                .case_insensitive(true)
                .build()
                .ok(),
            ignored_ip_addresses: Vec::new(),
        }
    }
}
