//! Content-type resolution by remote path suffix
//!
//! Rules are an ordered table keyed by the canonical suffix (text after the
//! last `.` of the remote path). The first rule with an equal suffix wins.
//! Certificate and key rules also structurally validate the local source
//! file; the others only tag the content type.

use std::fmt;
use std::path::Path;

use pkcs1::der::Decode;
use tracing::debug;
use x509_parser::pem::{parse_x509_pem, Pem};

use crate::types::{RelayError, Result};

/// Declared content type of a file object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Yaml,
    Json,
    Text,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Yaml => "application/yaml",
            ContentType::Json => "application/json",
            ContentType::Text => "plain/text",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Check = fn(&Path) -> Result<()>;

struct Rule {
    suffix: &'static str,
    content_type: ContentType,
    check: Check,
}

const RULES: &[Rule] = &[
    Rule {
        suffix: "yml",
        content_type: ContentType::Yaml,
        check: tag_only,
    },
    Rule {
        suffix: "json",
        content_type: ContentType::Json,
        check: tag_only,
    },
    Rule {
        suffix: "crt",
        content_type: ContentType::Text,
        check: check_certificate,
    },
    Rule {
        suffix: "key",
        content_type: ContentType::Text,
        check: check_rsa_key,
    },
];

/// Resolve the content type for `remote_path`, running the matching rule's
/// check against the local source file.
pub fn resolve(local_source: &Path, remote_path: &str) -> Result<ContentType> {
    let suffix = remote_path
        .rsplit_once('.')
        .map(|(_, suffix)| suffix)
        .filter(|suffix| !suffix.contains('/'))
        .ok_or_else(|| RelayError::UnsupportedFileType(remote_path.to_string()))?;

    let rule = RULES
        .iter()
        .find(|rule| rule.suffix == suffix)
        .ok_or_else(|| RelayError::UnsupportedFileType(remote_path.to_string()))?;

    (rule.check)(local_source)?;
    debug!(
        source = %local_source.display(),
        remote_path,
        content_type = %rule.content_type,
        "resolved content type"
    );
    Ok(rule.content_type)
}

fn tag_only(_source: &Path) -> Result<()> {
    Ok(())
}

fn check_certificate(source: &Path) -> Result<()> {
    let pem = read_pem(source)?;
    pem.parse_x509()
        .map(|_| ())
        .map_err(|e| invalid(source, format!("not an X.509 certificate: {}", e)))
}

fn check_rsa_key(source: &Path) -> Result<()> {
    let pem = read_pem(source)?;
    pkcs1::RsaPrivateKey::from_der(&pem.contents)
        .map(|_| ())
        .map_err(|e| invalid(source, format!("not a PKCS#1 RSA private key: {}", e)))
}

fn read_pem(source: &Path) -> Result<Pem> {
    let raw = std::fs::read(source).map_err(|e| invalid(source, e.to_string()))?;
    parse_x509_pem(&raw)
        .map(|(_, pem)| pem)
        .map_err(|e| invalid(source, format!("failed to decode PEM: {}", e)))
}

fn invalid(source: &Path, reason: String) -> RelayError {
    RelayError::InvalidCertificate {
        path: source.to_path_buf(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    fn self_signed_pem() -> String {
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        certified.cert.pem()
    }

    /// Replace one base64 character in the body of a PEM document.
    fn corrupt_body(pem: &str) -> String {
        let mut lines: Vec<String> = pem.lines().map(str::to_string).collect();
        let body = &mut lines[1];
        body.replace_range(0..1, "!");
        lines.join("\n")
    }

    /// Keep the base64 valid but change the outer DER tag from SEQUENCE
    /// (0x30) to 0x34, so only the X.509 parser can notice.
    fn corrupt_der(pem: &str) -> String {
        let mut lines: Vec<String> = pem.lines().map(str::to_string).collect();
        let body = &mut lines[1];
        assert!(body.starts_with('M'));
        body.replace_range(0..1, "N");
        lines.join("\n")
    }

    #[test]
    fn test_yaml_and_json_ignore_contents() {
        let dir = tempfile::tempdir().unwrap();
        let junk = dir.path().join("junk.bin");
        std::fs::write(&junk, b"\x00\x01 not yaml { nor json").unwrap();

        assert_eq!(resolve(&junk, "conf/app.yml").unwrap(), ContentType::Yaml);
        assert_eq!(resolve(&junk, "conf/app.json").unwrap(), ContentType::Json);
    }

    #[test]
    fn test_tag_only_rules_do_not_touch_the_source() {
        let missing = Path::new("/definitely/not/here.yml");
        assert_eq!(resolve(missing, "app.yml").unwrap(), ContentType::Yaml);
        assert_eq!(resolve(missing, "app.json").unwrap(), ContentType::Json);
    }

    #[test]
    fn test_self_signed_certificate_is_text() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("web.crt");
        std::fs::write(&cert, self_signed_pem()).unwrap();

        let content_type = resolve(&cert, "certs/web.crt").unwrap();
        assert_eq!(content_type, ContentType::Text);
        assert_eq!(content_type.as_str(), "plain/text");
    }

    #[test]
    fn test_corrupted_certificate_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("web.crt");
        std::fs::write(&cert, corrupt_body(&self_signed_pem())).unwrap();

        match resolve(&cert, "certs/web.crt") {
            Err(RelayError::InvalidCertificate { path, .. }) => assert_eq!(path, cert),
            other => panic!("expected InvalidCertificate, got {:?}", other),
        }
    }

    #[test]
    fn test_corrupted_der_is_rejected_by_x509_parser() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("web.crt");
        std::fs::write(&cert, corrupt_der(&self_signed_pem())).unwrap();

        match resolve(&cert, "certs/web.crt") {
            Err(RelayError::InvalidCertificate { path, reason }) => {
                assert_eq!(path, cert);
                assert!(reason.starts_with("not an X.509 certificate"), "{}", reason);
            }
            other => panic!("expected InvalidCertificate, got {:?}", other),
        }
    }

    #[test]
    fn test_certificate_without_pem_block() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("web.crt");
        std::fs::write(&cert, "hello").unwrap();

        assert!(matches!(
            resolve(&cert, "certs/web.crt"),
            Err(RelayError::InvalidCertificate { .. })
        ));
    }

    #[test]
    fn test_missing_certificate_source() {
        let missing = Path::new("/definitely/not/here.crt");
        match resolve(missing, "certs/web.crt") {
            Err(RelayError::InvalidCertificate { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected InvalidCertificate, got {:?}", other),
        }
    }

    #[test]
    fn test_pkcs1_key_is_text() {
        let key = fixture("id_rsa.key");
        assert_eq!(resolve(&key, "keys/web.key").unwrap(), ContentType::Text);
    }

    #[test]
    fn test_certificate_pushed_as_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("web.crt");
        std::fs::write(&cert, self_signed_pem()).unwrap();

        assert!(matches!(
            resolve(&cert, "keys/web.key"),
            Err(RelayError::InvalidCertificate { .. })
        ));
    }

    #[test]
    fn test_key_pushed_as_certificate_is_rejected() {
        let key = fixture("id_rsa.key");
        assert!(matches!(
            resolve(&key, "certs/web.crt"),
            Err(RelayError::InvalidCertificate { .. })
        ));
    }

    #[test]
    fn test_unknown_suffix() {
        let missing = Path::new("whatever");
        for remote in ["notes.txt", "no_suffix", "dir.d/file"] {
            assert!(
                matches!(resolve(missing, remote), Err(RelayError::UnsupportedFileType(_))),
                "{} should be unsupported",
                remote
            );
        }
    }

    #[test]
    fn test_suffix_is_last_extension() {
        let missing = Path::new("whatever");
        assert_eq!(resolve(missing, "a.crt.yml").unwrap(), ContentType::Yaml);
    }
}
