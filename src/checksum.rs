//! Message integrity digest.
//!
//! The digest covers the escaped subject, the escaped body, and every
//! attachment as `\n<name>\n` followed by the file's raw bytes, with
//! attachments taken in lexicographic name order. It is an integrity
//! fingerprint for detecting out-of-band edits, not a security boundary.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use md5::{Digest, Md5};

use crate::error::{MmsError, Result};
use crate::escape::escape;
use crate::model::message::MmsMessage;

const READ_BUF_SIZE: usize = 8192;

/// Compute the digest over a message's text fields and attachment set.
///
/// Attachment order is irrelevant: pairs are sorted by name before
/// hashing. Fails with [`MmsError::MissingAttachment`] when any
/// attachment file cannot be opened; a moved or deleted file makes the
/// digest meaningless, so there is nothing to fall back to.
pub fn compute_checksum<'a, I>(
    subject: Option<&str>,
    body: Option<&str>,
    attachments: I,
) -> Result<String>
where
    I: IntoIterator<Item = (&'a str, &'a Path)>,
{
    let mut pairs: Vec<(&str, &Path)> = attachments.into_iter().collect();
    pairs.sort_by_key(|(name, _)| *name);

    let mut hasher = Md5::new();
    if let Some(subject) = subject {
        hasher.update(escape(subject).as_bytes());
    }
    if let Some(body) = body {
        hasher.update(escape(body).as_bytes());
    }
    for (name, path) in pairs {
        hasher.update(format!("\n{name}\n").as_bytes());
        hash_file_into(&mut hasher, path)?;
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Digest for a message as currently loaded, over its local attachment files.
pub fn message_checksum(msg: &MmsMessage) -> Result<String> {
    compute_checksum(
        msg.subject.as_deref(),
        msg.body.as_deref(),
        msg.attachments
            .iter()
            .map(|(name, att)| (name.as_str(), att.local_path.as_path())),
    )
}

/// Stream a file's bytes into an open digest.
fn hash_file_into<D: Digest>(hasher: &mut D, path: &Path) -> Result<()> {
    let mut file =
        File::open(path).map_err(|_| MmsError::MissingAttachment(path.to_path_buf()))?;
    let mut buf = [0u8; READ_BUF_SIZE];
    loop {
        let n = file.read(&mut buf).map_err(|e| MmsError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn test_empty_message_digest() {
        let digest = compute_checksum(None, None, std::iter::empty()).unwrap();
        // MD5 of the empty input.
        assert_eq!(digest, "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_fixed_digest_subject_body_attachment() {
        let dir = TempDir::new().unwrap();
        let photo = write_file(&dir, "photo.jpg", b"JPEGDATA");

        let digest = compute_checksum(
            Some("Hi"),
            Some("there"),
            [("photo.jpg", photo.as_path())],
        )
        .unwrap();
        // md5("Hithere\nphoto.jpg\nJPEGDATA")
        assert_eq!(digest, "431c0c340b151b4f085a948d267889a9");
    }

    #[test]
    fn test_attachment_order_is_irrelevant() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.txt", b"AAA");
        let b = write_file(&dir, "b.txt", b"BBB");

        let forward = compute_checksum(
            None,
            Some("x"),
            [("a.txt", a.as_path()), ("b.txt", b.as_path())],
        )
        .unwrap();
        let reversed = compute_checksum(
            None,
            Some("x"),
            [("b.txt", b.as_path()), ("a.txt", a.as_path())],
        )
        .unwrap();
        assert_eq!(forward, reversed);
        // md5("x\na.txt\nAAA\nb.txt\nBBB")
        assert_eq!(forward, "6a993ec9594d0135dc1d4d1c41970207");
    }

    #[test]
    fn test_digest_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.txt", b"same bytes");
        let once =
            compute_checksum(Some("s"), Some("b"), [("a.txt", a.as_path())]).unwrap();
        let twice =
            compute_checksum(Some("s"), Some("b"), [("a.txt", a.as_path())]).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_text_is_hashed_escaped() {
        // A body containing a real newline and one containing the two-char
        // sequence backslash-n must produce different digests only if the
        // escape transform keeps them distinct.
        let real = compute_checksum(None, Some("a\nb"), std::iter::empty()).unwrap();
        let literal = compute_checksum(None, Some("a\\nb"), std::iter::empty()).unwrap();
        assert_ne!(real, literal);
    }

    #[test]
    fn test_missing_attachment_fails() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("gone.jpg");
        let err = compute_checksum(None, None, [("gone.jpg", gone.as_path())]).unwrap_err();
        assert!(matches!(err, MmsError::MissingAttachment(p) if p == gone));
    }

    #[test]
    fn test_subject_none_vs_empty_differ_from_content() {
        // None and "" both contribute nothing; a non-empty subject changes
        // the digest.
        let none = compute_checksum(None, None, std::iter::empty()).unwrap();
        let empty = compute_checksum(Some(""), None, std::iter::empty()).unwrap();
        let some = compute_checksum(Some("Hi"), None, std::iter::empty()).unwrap();
        assert_eq!(none, empty);
        assert_ne!(none, some);
    }
}
