//! Risk classification
//!
//! Pure lookup of identified service names against a static taxonomy of
//! insecure and legacy protocols. The taxonomy is loaded once at process
//! start and never mutated during a scan; every classified endpoint gets
//! exactly one annotation, matched or sentinel.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::core::RiskAnnotation;

/// Sentinel annotation for services outside the taxonomy.
pub const NO_KNOWN_RISK: &str = "no known risk";

/// Known-risk taxonomy: service name (lowercase) to risk description.
static RISK_TAXONOMY: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("ftp", "FTP - Unencrypted file transfer"),
        ("telnet", "Telnet - Unencrypted communication"),
        ("http", "HTTP - Unencrypted web traffic"),
        ("http-alt", "HTTP - Unencrypted web traffic"),
        ("http-proxy", "HTTP - Unencrypted web traffic"),
        ("smtp", "SMTP - Open relay or misconfigurations"),
        ("snmp", "SNMP - Weak community strings"),
        ("rdp", "RDP - Weak credentials or misconfigurations"),
        ("ms-wbt-server", "RDP - Weak credentials or misconfigurations"),
        ("vnc", "VNC - Unencrypted remote access"),
        ("ssh1", "SSHv1 - Insecure and outdated"),
        ("tftp", "TFTP - Unauthenticated file transfer"),
        ("netbios-ssn", "NetBIOS - Legacy file sharing exposure"),
        ("pop3", "POP3 - Unencrypted mail retrieval"),
        ("imap", "IMAP - Unencrypted mail retrieval"),
    ])
});

/// Classify a service name against the taxonomy.
///
/// Case-insensitive; unmatched names produce the sentinel rather than an
/// absence, so callers never have to branch on a missing annotation.
pub fn classify(service_name: &str) -> RiskAnnotation {
    let description = RISK_TAXONOMY
        .get(service_name.to_lowercase().as_str())
        .copied()
        .unwrap_or(NO_KNOWN_RISK);
    RiskAnnotation {
        description: description.to_string(),
    }
}

/// The taxonomy description for a service, if it has one. Exposed so the
/// presentation layer can distinguish matched entries without string
/// comparison against the sentinel.
pub fn taxonomy_entry(service_name: &str) -> Option<&'static str> {
    RISK_TAXONOMY
        .get(service_name.to_lowercase().as_str())
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_is_pure_and_idempotent() {
        let first = classify("ftp");
        let second = classify("ftp");
        assert_eq!(first, second);
    }

    #[test]
    fn classify_is_case_insensitive() {
        assert_eq!(classify("FTP"), classify("ftp"));
        assert_eq!(classify("Telnet"), classify("telnet"));
    }

    #[test]
    fn ftp_matches_the_unencrypted_transfer_entry() {
        let annotation = classify("ftp");
        assert_eq!(annotation.description, taxonomy_entry("ftp").unwrap());
        assert!(annotation.description.contains("Unencrypted file transfer"));
        assert!(annotation.is_flagged());
    }

    #[test]
    fn rdp_aliases_share_one_entry() {
        assert_eq!(classify("rdp"), classify("ms-wbt-server"));
    }

    #[test]
    fn unknown_service_gets_the_sentinel() {
        let annotation = classify("ssh");
        assert_eq!(annotation.description, NO_KNOWN_RISK);
        assert!(!annotation.is_flagged());

        let annotation = classify("unknown");
        assert_eq!(annotation.description, NO_KNOWN_RISK);
    }
}
