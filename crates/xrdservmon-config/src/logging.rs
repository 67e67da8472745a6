//! Output format of the reconciler's log lines.
//!
//! Cron mails stderr to an operator, so the default is the compact human
//! format; `json` suits hosts that ship logs to a collector.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How log events are rendered on stderr.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One line per event, timestamp first.
    #[default]
    Compact,
    /// One flattened JSON object per event.
    Json,
}
