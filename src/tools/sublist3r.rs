use std::path::{Path, PathBuf};
use std::time::Duration;

use super::Invoker;
use crate::error::ToolError;
use crate::network::target_slug;

/// File sublist3r writes its subdomain list to, kept apart from the results
/// artifact so the two never overwrite each other.
pub fn subdomains_path(results: &Path, domain: &str) -> PathBuf {
    let stem = results
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "results".to_string());
    results.with_file_name(format!("{}_{}_subdomains.txt", stem, target_slug(domain)))
}

pub fn enumerate_args(domain: &str, output: Option<&Path>) -> Vec<String> {
    let mut args = vec!["-d".to_string(), domain.to_string()];
    if let Some(path) = output {
        args.push("-o".to_string());
        args.push(path.display().to_string());
    }
    args
}

pub async fn enumerate(
    invoker: &dyn Invoker,
    binary: &str,
    domain: &str,
    output: Option<&Path>,
    timeout: Option<Duration>,
) -> Result<String, ToolError> {
    invoker
        .invoke(binary, &enumerate_args(domain, output), timeout)
        .await
}
