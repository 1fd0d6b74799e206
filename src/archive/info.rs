//! The `info` metadata file: newline-separated `key=value` pairs.
//!
//! Text fields (`subject`, `body`) are double-quoted and escaped; `to`
//! and `att` repeat once per value. Key order on render is fixed so the
//! file is byte-stable for a given message.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::error::{MmsError, Result};
use crate::escape::{escape, unescape};
use crate::model::attachment::Attachment;
use crate::model::message::{Direction, MmsMessage};

static KEY_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*(\w+)\s*=\s*"?(.*?)"?\s*$"#).expect("valid regex"));

/// Parse an `info` file's contents into a message.
///
/// `info_path` is used for error context only; `msg_dir` anchors the
/// attachment files listed under `att` keys.
pub fn parse_info(info_path: &Path, contents: &str, msg_dir: &Path) -> Result<MmsMessage> {
    let mut from_number = None;
    let mut to_numbers = Vec::new();
    let mut date_millis = None;
    let mut date_sent_millis = 0;
    let mut direction = None;
    let mut subject = None;
    let mut body = None;
    let mut attachments = BTreeMap::new();
    let mut checksum = None;

    for line in contents.lines() {
        if line.is_empty() {
            continue;
        }
        let caps = KEY_VALUE.captures(line).ok_or_else(|| {
            MmsError::MalformedInfoLine {
                path: info_path.to_path_buf(),
                line: line.to_string(),
            }
        })?;
        let key = &caps[1];
        let val = &caps[2];
        match key {
            "from" => from_number = Some(val.to_string()),
            "to" => to_numbers.push(val.to_string()),
            "dir" => direction = Some(Direction::from_token(val)?),
            "date" => date_millis = Some(parse_millis(info_path, line, val)?),
            "date_sent" => date_sent_millis = parse_millis(info_path, line, val)?,
            "subject" => subject = Some(unescape(val)),
            "body" => body = Some(unescape(val)),
            "att" => {
                attachments.insert(
                    val.to_string(),
                    Attachment::new(val, val, msg_dir.join(val)),
                );
            }
            "checksum" => checksum = Some(val.to_string()),
            other => {
                warn!(path = %info_path.display(), key = other, "Ignoring unknown info key");
            }
        }
    }

    let date_millis = date_millis.ok_or(MmsError::MissingInfoKey {
        path: info_path.to_path_buf(),
        key: "date",
    })?;
    let direction = direction.ok_or(MmsError::MissingInfoKey {
        path: info_path.to_path_buf(),
        key: "dir",
    })?;

    Ok(MmsMessage {
        from_number,
        to_numbers,
        date_millis,
        date_sent_millis,
        direction,
        subject,
        body,
        attachments,
        checksum,
        reconciled: false,
    })
}

fn parse_millis(info_path: &Path, line: &str, val: &str) -> Result<i64> {
    val.parse().map_err(|_| MmsError::MalformedInfoLine {
        path: info_path.to_path_buf(),
        line: line.to_string(),
    })
}

/// Render a message's `info` file contents.
pub fn render_info(msg: &MmsMessage) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "from={}\n",
        msg.from_number.as_deref().unwrap_or_default()
    ));
    for to in &msg.to_numbers {
        out.push_str(&format!("to={to}\n"));
    }
    out.push_str(&format!("dir={}\n", msg.direction.token()));
    out.push_str(&format!("date={}\n", msg.date_millis));
    out.push_str(&format!("date_sent={}\n", msg.effective_date_sent()));
    out.push_str(&format!(
        "subject=\"{}\"\n",
        escape(msg.subject.as_deref().unwrap_or_default())
    ));
    out.push_str(&format!(
        "body=\"{}\"\n",
        escape(msg.body.as_deref().unwrap_or_default())
    ));
    for name in msg.attachments.keys() {
        out.push_str(&format!("att={name}\n"));
    }
    out.push_str(&format!(
        "checksum={}\n",
        msg.checksum.as_deref().unwrap_or_default()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sample_info() -> &'static str {
        "from=5551112222\n\
         to=5553334444\n\
         to=5555556666\n\
         dir=OUT\n\
         date=1500000000000\n\
         date_sent=1499999999000\n\
         subject=\"Hi\"\n\
         body=\"there\"\n\
         att=photo.jpg\n\
         checksum=431c0c340b151b4f085a948d267889a9\n"
    }

    #[test]
    fn test_parse_basic_fields() {
        let msg_dir = PathBuf::from("/archive/msg1");
        let msg = parse_info(&msg_dir.join("info"), sample_info(), &msg_dir).unwrap();
        assert_eq!(msg.from_number.as_deref(), Some("5551112222"));
        assert_eq!(msg.to_numbers, ["5553334444", "5555556666"]);
        assert_eq!(msg.direction, Direction::Outgoing);
        assert_eq!(msg.date_millis, 1500000000000);
        assert_eq!(msg.date_sent_millis, 1499999999000);
        assert_eq!(msg.subject.as_deref(), Some("Hi"));
        assert_eq!(msg.body.as_deref(), Some("there"));
        assert_eq!(
            msg.checksum.as_deref(),
            Some("431c0c340b151b4f085a948d267889a9")
        );
        assert!(!msg.reconciled);
    }

    #[test]
    fn test_parse_binds_attachments_to_msg_dir() {
        let msg_dir = PathBuf::from("/archive/msg1");
        let msg = parse_info(&msg_dir.join("info"), sample_info(), &msg_dir).unwrap();
        let att = &msg.attachments["photo.jpg"];
        assert_eq!(att.local_path, msg_dir.join("photo.jpg"));
        assert_eq!(att.raw_path, "photo.jpg");
        assert!(att.remote_path.is_none());
    }

    #[test]
    fn test_render_parse_roundtrip_with_escapes() {
        let msg_dir = PathBuf::from("/archive/msg1");
        let mut msg = parse_info(&msg_dir.join("info"), sample_info(), &msg_dir).unwrap();
        msg.subject = Some("re: \"lunch\" & stuff".to_string());
        msg.body = Some("line one\nline two\\with backslash".to_string());

        let rendered = render_info(&msg);
        let reparsed = parse_info(&msg_dir.join("info"), &rendered, &msg_dir).unwrap();
        assert_eq!(reparsed.subject, msg.subject);
        assert_eq!(reparsed.body, msg.body);
        assert_eq!(reparsed.to_numbers, msg.to_numbers);
        assert_eq!(
            reparsed.attachments.keys().collect::<Vec<_>>(),
            msg.attachments.keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_render_date_sent_zero_falls_back() {
        let msg_dir = PathBuf::from("/a");
        let mut msg = parse_info(&msg_dir.join("info"), sample_info(), &msg_dir).unwrap();
        msg.date_sent_millis = 0;
        let rendered = render_info(&msg);
        assert!(rendered.contains("date_sent=1500000000000\n"));
    }

    #[test]
    fn test_malformed_line_fails() {
        let msg_dir = PathBuf::from("/a");
        let err = parse_info(
            &msg_dir.join("info"),
            "from=5551112222\nnot a key value pair!\n",
            &msg_dir,
        )
        .unwrap_err();
        assert!(matches!(err, MmsError::MalformedInfoLine { .. }));
    }

    #[test]
    fn test_missing_date_fails() {
        let msg_dir = PathBuf::from("/a");
        let err = parse_info(&msg_dir.join("info"), "dir=INC\n", &msg_dir).unwrap_err();
        assert!(matches!(
            err,
            MmsError::MissingInfoKey { key: "date", .. }
        ));
    }

    #[test]
    fn test_invalid_direction_fails() {
        let msg_dir = PathBuf::from("/a");
        let err =
            parse_info(&msg_dir.join("info"), "dir=SENT\ndate=1\n", &msg_dir).unwrap_err();
        assert!(matches!(err, MmsError::InvalidDirection(_)));
    }

    #[test]
    fn test_unknown_key_is_ignored() {
        let msg_dir = PathBuf::from("/a");
        let contents = "dir=INC\ndate=1\nfuture_key=whatever\n";
        let msg = parse_info(&msg_dir.join("info"), contents, &msg_dir).unwrap();
        assert_eq!(msg.date_millis, 1);
    }

    #[test]
    fn test_parse_tolerates_padding_whitespace() {
        let msg_dir = PathBuf::from("/a");
        let contents = "  dir = INC  \n date= 1\n";
        let msg = parse_info(&msg_dir.join("info"), contents, &msg_dir).unwrap();
        assert_eq!(msg.direction, Direction::Incoming);
    }
}
