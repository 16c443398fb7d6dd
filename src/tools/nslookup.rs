use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;

use super::Invoker;
use crate::error::ToolError;

lazy_static! {
    static ref ADDRESS_MARKER: Regex = Regex::new(r"^\s*Address(es)?:").unwrap();
}

/// Resolves `domain` and returns the first answer address, or `None` when
/// the lookup produced no answer.
pub async fn lookup(
    invoker: &dyn Invoker,
    binary: &str,
    domain: &str,
    timeout: Option<Duration>,
) -> Result<Option<String>, ToolError> {
    let output = invoker.invoke(binary, &[domain.to_string()], timeout).await?;
    Ok(extract_address(&output))
}

/// Picks the last field of the first `Address:` line in the answer section.
/// Output without a `Name:` line has no answer section, so the resolver's
/// own address is never returned.
pub fn extract_address(output: &str) -> Option<String> {
    let lines: Vec<&str> = output.lines().collect();
    let answer_start = lines
        .iter()
        .position(|line| line.trim_start().starts_with("Name:"))?;

    lines[answer_start..]
        .iter()
        .filter(|line| ADDRESS_MARKER.is_match(line))
        .filter_map(|line| line.split_whitespace().last())
        .find(|field| !field.contains('#') && !field.ends_with(':'))
        .map(str::to_string)
}
