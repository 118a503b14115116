//! Tier classification: decides which processing path an event takes.
//!
//! Classification is a pure function of the channel name and the routing
//! configuration, so every transport reaches the same decision for the
//! same event.

use serde::{Deserialize, Serialize};

/// Channel namespaces routed to the delegated tier.
const DELEGATED_PREFIXES: [&[u8]; 2] = [b"ticker:", b"match:"];

/// Channels shorter than this never carry a delegated prefix.
const MIN_PREFIX_LEN: usize = 6;

/// Processing path chosen for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// In-process handling.
    Standard,
    /// Handed to the external native component.
    Delegated,
}

impl Tier {
    /// Stable lowercase name, used as a log field and metric label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Delegated => "delegated",
        }
    }
}

/// Immutable routing configuration, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingConfig {
    /// Whether delegated-prefix channels are sent to the native component.
    pub delegation_enabled: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            delegation_enabled: true,
        }
    }
}

impl RoutingConfig {
    /// Classifies `channel` under this configuration.
    #[must_use]
    pub fn classify(&self, channel: &str) -> Tier {
        classify(channel, self.delegation_enabled)
    }
}

/// Classifies a channel into a processing tier.
///
/// Returns `Delegated` only when `enabled` is set and the channel starts
/// with `ticker:` or `match:`. Total: never panics, including on short or
/// multi-byte channels, because prefixes are compared as bytes after the
/// length guard.
#[must_use]
pub fn classify(channel: &str, enabled: bool) -> Tier {
    if !enabled || channel.len() < MIN_PREFIX_LEN {
        return Tier::Standard;
    }
    let bytes = channel.as_bytes();
    let delegated = DELEGATED_PREFIXES
        .iter()
        .any(|prefix| bytes.get(..prefix.len()) == Some(*prefix));
    if delegated {
        Tier::Delegated
    } else {
        Tier::Standard
    }
}
