//! Core MMS message type and direction enum.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{Local, TimeZone};
use regex::Regex;

use crate::error::{MmsError, Result};
use super::attachment::Attachment;

/// Message direction.
///
/// Closed set: every site that cares about direction matches exhaustively,
/// so an out-of-range value cannot exist past the parse boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    /// Sent by the device owner.
    #[serde(rename = "OUT")]
    Outgoing,
    /// Received from another party.
    #[serde(rename = "INC")]
    Incoming,
    /// MMS notification (an incoming record without retrieved content).
    #[serde(rename = "NTF")]
    Notification,
}

impl Direction {
    /// Wire token used in metadata files and directory names.
    pub fn token(self) -> &'static str {
        match self {
            Direction::Outgoing => "OUT",
            Direction::Incoming => "INC",
            Direction::Notification => "NTF",
        }
    }

    /// Parse a wire token. Only valid at the archive boundary.
    pub fn from_token(token: &str) -> Result<Self> {
        match token {
            "OUT" => Ok(Direction::Outgoing),
            "INC" => Ok(Direction::Incoming),
            "NTF" => Ok(Direction::Notification),
            other => Err(MmsError::InvalidDirection(other.to_string())),
        }
    }

    /// Outgoing messages address their recipients.
    pub fn is_outgoing(self) -> bool {
        matches!(self, Direction::Outgoing)
    }

    /// Notifications count as incoming: their counterpart is the sender.
    pub fn is_incoming(self) -> bool {
        matches!(self, Direction::Incoming | Direction::Notification)
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// A single MMS message as loaded from the archive or the database boundary.
///
/// Identity is `(date_millis, direction, checksum)`. The attachment map is
/// keyed by logical name in a `BTreeMap` so every iteration is already in
/// the sorted order the checksum and the metadata file require.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MmsMessage {
    /// Sender number (cleaned). Empty for some outgoing records.
    pub from_number: Option<String>,

    /// Recipient numbers (cleaned), in received order.
    pub to_numbers: Vec<String>,

    /// Received/stored timestamp in epoch milliseconds.
    pub date_millis: i64,

    /// Sent timestamp in epoch milliseconds. `0` means unknown and falls
    /// back to `date_millis` wherever the value is rendered.
    pub date_sent_millis: i64,

    pub direction: Direction,

    /// Subject text. `None` and `""` hash identically absent.
    pub subject: Option<String>,

    /// Body text from the message's single text part.
    pub body: Option<String>,

    /// Attachments keyed by logical name.
    pub attachments: BTreeMap<String, Attachment>,

    /// Integrity digest over subject, body, and sorted attachment
    /// names + bytes. `None` until computed or loaded.
    pub checksum: Option<String>,

    /// Set by the reconciliation pipeline once every attachment is bound
    /// to an authoritative target path.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reconciled: bool,
}

impl MmsMessage {
    /// Sent timestamp with the zero fallback applied.
    pub fn effective_date_sent(&self) -> i64 {
        if self.date_sent_millis == 0 {
            self.date_millis
        } else {
            self.date_sent_millis
        }
    }

    /// Participant numbers relevant for naming: recipients when outgoing,
    /// the sender otherwise.
    pub fn participants(&self) -> Vec<&str> {
        if self.direction.is_outgoing() {
            self.to_numbers.iter().map(String::as_str).collect()
        } else {
            self.from_number.as_deref().into_iter().collect()
        }
    }

    /// Archive directory name:
    /// `<date_millis>_<participants-joined-by-dash>_<DIR>_<checksum>`.
    ///
    /// Requires the checksum to be present.
    pub fn dir_name(&self) -> Result<String> {
        let checksum = self
            .checksum
            .as_deref()
            .ok_or_else(|| MmsError::MissingChecksum(self.identity()))?;
        Ok(format!(
            "{}_{}_{}_{}",
            self.date_millis,
            self.participants().join("-"),
            self.direction.token(),
            checksum
        ))
    }

    /// Short human identity used in error messages and logs.
    pub fn identity(&self) -> String {
        format!("{}_{}", self.date_millis, self.direction.token())
    }

    /// Local-time rendering of `date_millis` for display.
    pub fn date_formatted(&self) -> String {
        match Local.timestamp_millis_opt(self.date_millis).single() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => self.date_millis.to_string(),
        }
    }
}

static NON_NUMBER_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^+0-9]").expect("valid regex"));
static NANP_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?1(\d{10})$").expect("valid regex"));

/// Normalize a phone number for matching: strip formatting characters and
/// the NANP country prefix from 11-digit numbers.
pub fn clean_number(number: &str) -> String {
    let stripped = NON_NUMBER_CHARS.replace_all(number, "");
    match NANP_PREFIX.captures(&stripped) {
        Some(caps) => caps[1].to_string(),
        None => stripped.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn message(direction: Direction) -> MmsMessage {
        MmsMessage {
            from_number: Some("5551112222".to_string()),
            to_numbers: vec!["5553334444".to_string(), "5555556666".to_string()],
            date_millis: 1500000000000,
            date_sent_millis: 0,
            direction,
            subject: Some("Hi".to_string()),
            body: Some("there".to_string()),
            attachments: BTreeMap::new(),
            checksum: Some("abc123".to_string()),
            reconciled: false,
        }
    }

    #[test]
    fn test_direction_token_roundtrip() {
        for dir in [
            Direction::Outgoing,
            Direction::Incoming,
            Direction::Notification,
        ] {
            assert_eq!(Direction::from_token(dir.token()).unwrap(), dir);
        }
        assert!(Direction::from_token("SENT").is_err());
    }

    #[test]
    fn test_notification_counts_as_incoming() {
        assert!(Direction::Notification.is_incoming());
        assert!(Direction::Incoming.is_incoming());
        assert!(!Direction::Outgoing.is_incoming());
    }

    #[test]
    fn test_dir_name_outgoing_joins_recipients() {
        let msg = message(Direction::Outgoing);
        assert_eq!(
            msg.dir_name().unwrap(),
            "1500000000000_5553334444-5555556666_OUT_abc123"
        );
    }

    #[test]
    fn test_dir_name_incoming_uses_sender() {
        let msg = message(Direction::Incoming);
        assert_eq!(
            msg.dir_name().unwrap(),
            "1500000000000_5551112222_INC_abc123"
        );
    }

    #[test]
    fn test_dir_name_requires_checksum() {
        let mut msg = message(Direction::Incoming);
        msg.checksum = None;
        assert!(matches!(
            msg.dir_name(),
            Err(MmsError::MissingChecksum(_))
        ));
    }

    #[test]
    fn test_effective_date_sent_zero_falls_back() {
        let mut msg = message(Direction::Incoming);
        assert_eq!(msg.effective_date_sent(), 1500000000000);
        msg.date_sent_millis = 1499999999000;
        assert_eq!(msg.effective_date_sent(), 1499999999000);
    }

    #[test]
    fn test_clean_number() {
        assert_eq!(clean_number("(555) 111-2222"), "5551112222");
        assert_eq!(clean_number("+15551112222"), "5551112222");
        assert_eq!(clean_number("15551112222"), "5551112222");
        assert_eq!(clean_number("+445551112222"), "+445551112222");
        assert_eq!(clean_number("555-1212"), "5551212");
    }

    #[test]
    fn test_attachment_map_iterates_sorted() {
        let mut msg = message(Direction::Incoming);
        for name in ["zebra.png", "alpha.jpg", "mid.gif"] {
            msg.attachments.insert(
                name.to_string(),
                Attachment::new(name, name, PathBuf::from(name)),
            );
        }
        let names: Vec<&str> = msg.attachments.keys().map(String::as_str).collect();
        assert_eq!(names, ["alpha.jpg", "mid.gif", "zebra.png"]);
    }
}
