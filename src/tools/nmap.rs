use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::Invoker;
use crate::error::ToolError;
use crate::network::target_slug;

/// Structured output nmap writes next to the results file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum NmapFormat {
    #[value(name = "all", help = "Normal, XML and grepable (-oA)")]
    All,
    #[value(name = "normal", help = "Normal output only (-oN)")]
    Normal,
    #[value(name = "xml", help = "XML output only (-oX)")]
    Xml,
}

impl NmapFormat {
    /// Whether this format leaves an XML file that can be imported later.
    pub fn writes_xml(self) -> bool {
        matches!(self, NmapFormat::All | NmapFormat::Xml)
    }
}

/// Where nmap should write its own files for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutput {
    pub base: PathBuf,
    pub format: NmapFormat,
}

impl ScanOutput {
    /// Derives a per-target base path from the results file: `out/results.txt`
    /// scanned against `10.0.0.1` becomes `out/results_10.0.0.1`.
    pub fn for_target(results: &Path, target: &str, format: NmapFormat) -> Self {
        let stem = results
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "scan".to_string());
        let base = results.with_file_name(format!("{}_{}", stem, target_slug(target)));
        Self { base, format }
    }

    pub fn xml_path(&self) -> Option<PathBuf> {
        self.format
            .writes_xml()
            .then(|| with_suffix(&self.base, ".xml"))
    }

    fn args(&self) -> Vec<String> {
        match self.format {
            NmapFormat::All => vec!["-oA".to_string(), self.base.display().to_string()],
            NmapFormat::Normal => vec![
                "-oN".to_string(),
                with_suffix(&self.base, ".nmap").display().to_string(),
            ],
            NmapFormat::Xml => vec![
                "-oX".to_string(),
                with_suffix(&self.base, ".xml").display().to_string(),
            ],
        }
    }
}

// The base already contains dots from the address, so `with_extension`
// would eat the last octet.
fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut os = base.as_os_str().to_os_string();
    os.push(suffix);
    PathBuf::from(os)
}

pub fn scan_args(flags: &[String], target: &str, output: Option<&ScanOutput>) -> Vec<String> {
    let mut args = flags.to_vec();
    if let Some(output) = output {
        args.extend(output.args());
    }
    args.push(target.to_string());
    args
}

/// Runs nmap against one address and returns its raw console output.
pub async fn scan(
    invoker: &dyn Invoker,
    binary: &str,
    flags: &[String],
    target: &str,
    output: Option<&ScanOutput>,
    timeout: Option<Duration>,
) -> Result<String, ToolError> {
    invoker
        .invoke(binary, &scan_args(flags, target, output), timeout)
        .await
}
