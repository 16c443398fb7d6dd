use std::fs;
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{ClassificationError, EdgeError, Result};
use crate::network::is_valid_address;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum TargetKind {
    #[value(name = "domains", help = "Domain names")]
    Domain,
    #[value(name = "ips", help = "IPv4 addresses")]
    Address,
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetKind::Domain => write!(f, "domains"),
            TargetKind::Address => write!(f, "ips"),
        }
    }
}

/// A homogeneous, ordered list of targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedBatch {
    pub kind: TargetKind,
    pub targets: Vec<String>,
}

impl ClassifiedBatch {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Reads one target per line, trimming whitespace and dropping blank lines.
pub fn read_targets(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .map_err(|e| EdgeError::InvalidInput(format!("cannot read {}: {}", path.display(), e)))?;
    Ok(parse_targets(&content))
}

pub fn parse_targets(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Labels a batch as domains or addresses.
///
/// A declared kind is trusted, but the batch must still be homogeneous: an
/// invalid line in an address batch, or an address in a domain batch, rejects
/// the whole batch. Without a declared kind the content decides, and anything
/// that is neither all-addresses nor all-dotted-names is ambiguous.
pub fn classify(
    lines: Vec<String>,
    declared: Option<TargetKind>,
) -> std::result::Result<ClassifiedBatch, ClassificationError> {
    let kind = match declared {
        Some(TargetKind::Address) => {
            if let Some(bad) = lines.iter().find(|l| !is_valid_address(l)) {
                return Err(ClassificationError::Mismatch {
                    line: bad.clone(),
                    declared: TargetKind::Address,
                });
            }
            TargetKind::Address
        }
        Some(TargetKind::Domain) => {
            if let Some(bad) = lines.iter().find(|l| is_valid_address(l)) {
                return Err(ClassificationError::Mismatch {
                    line: bad.clone(),
                    declared: TargetKind::Domain,
                });
            }
            TargetKind::Domain
        }
        None => infer_kind(&lines)?,
    };

    Ok(ClassifiedBatch { kind, targets: lines })
}

fn infer_kind(lines: &[String]) -> std::result::Result<TargetKind, ClassificationError> {
    if lines.iter().all(|l| is_valid_address(l)) {
        return Ok(TargetKind::Address);
    }

    match lines.iter().find(|l| is_valid_address(l) || !l.contains('.')) {
        Some(line) => Err(ClassificationError::Ambiguous { line: line.clone() }),
        None => Ok(TargetKind::Domain),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_infers_addresses() {
        let batch = classify(lines(&["8.8.8.8", "1.1.1.1"]), None).unwrap();
        assert_eq!(batch.kind, TargetKind::Address);
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_infers_domains() {
        let batch = classify(lines(&["example.com", "test.org"]), None).unwrap();
        assert_eq!(batch.kind, TargetKind::Domain);
    }

    #[test]
    fn test_mixed_batch_is_ambiguous() {
        let err = classify(lines(&["8.8.8.8", "example.com"]), None).unwrap_err();
        assert_eq!(err, ClassificationError::Ambiguous { line: "8.8.8.8".into() });
    }

    #[test]
    fn test_dotless_line_is_ambiguous() {
        let err = classify(lines(&["example.com", "localhost"]), None).unwrap_err();
        assert!(matches!(err, ClassificationError::Ambiguous { .. }));
    }

    #[test]
    fn test_declared_address_rejects_malformed_line() {
        let err = classify(lines(&["8.8.8.8", "999.1.1.1"]), Some(TargetKind::Address)).unwrap_err();
        assert_eq!(
            err,
            ClassificationError::Mismatch {
                line: "999.1.1.1".into(),
                declared: TargetKind::Address,
            }
        );
    }

    #[test]
    fn test_declared_domain_trusts_single_labels() {
        let batch = classify(lines(&["intranet", "example.com"]), Some(TargetKind::Domain)).unwrap();
        assert_eq!(batch.kind, TargetKind::Domain);
    }

    #[test]
    fn test_declared_domain_rejects_address() {
        let err = classify(lines(&["example.com", "10.0.0.1"]), Some(TargetKind::Domain)).unwrap_err();
        assert!(matches!(err, ClassificationError::Mismatch { declared: TargetKind::Domain, .. }));
    }

    #[test]
    fn test_empty_batch() {
        assert!(classify(Vec::new(), None).unwrap().is_empty());
        let batch = classify(Vec::new(), Some(TargetKind::Domain)).unwrap();
        assert_eq!(batch.kind, TargetKind::Domain);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_unreadable_targets_file_is_invalid_input() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, &[0x66, 0x6f, 0xff, 0xfe, b'\n']).unwrap();

        let err = read_targets(file.path()).unwrap_err();
        assert!(matches!(err, EdgeError::InvalidInput(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_parse_targets_trims_and_skips_blanks() {
        let targets = parse_targets("  example.com \n\n\ttest.org\r\n   \n");
        assert_eq!(targets, vec!["example.com", "test.org"]);
    }
}
