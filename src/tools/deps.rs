use std::time::Duration;

use tracing::{info, warn};

use super::Invoker;
use crate::config::ToolPaths;
use crate::error::ToolError;

/// One advisory check: run `command args` and see whether it exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub label: &'static str,
    pub command: String,
    pub args: Vec<String>,
}

impl Probe {
    fn new(label: &'static str, command: &str, args: &[&str]) -> Self {
        Self {
            label,
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Available,
    Missing,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub label: &'static str,
    pub command: String,
    pub status: ProbeStatus,
}

/// Which collaborators a run is going to touch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Needs {
    pub nslookup: bool,
    pub nmap: bool,
    pub sublist3r: bool,
    pub msfconsole: bool,
}

pub fn probes(tools: &ToolPaths, needs: Needs) -> Vec<Probe> {
    let mut list = Vec::new();
    if needs.nslookup {
        list.push(Probe::new("DNS lookup (nslookup)", &tools.nslookup, &["-version"]));
    }
    if needs.nmap {
        list.push(Probe::new("Port scanner (nmap)", &tools.nmap, &["--version"]));
    }
    if needs.sublist3r {
        list.push(Probe::new("Subdomain enumeration (sublist3r)", &tools.sublist3r, &["--help"]));
    }
    if needs.msfconsole {
        list.push(Probe::new("Metasploit console (msfconsole)", &tools.msfconsole, &["--version"]));
    }
    list
}

/// Runs each probe once. Results are advisory: a tool that exits nonzero
/// still exists, and nothing here aborts the run.
pub async fn preflight(
    invoker: &dyn Invoker,
    probes: &[Probe],
    timeout: Duration,
) -> Vec<ProbeOutcome> {
    let mut outcomes = Vec::with_capacity(probes.len());

    for probe in probes {
        let status = match invoker.invoke(&probe.command, &probe.args, Some(timeout)).await {
            Ok(_) | Err(ToolError::ExecutionFailed { .. }) => ProbeStatus::Available,
            Err(ToolError::NotFound { .. }) => ProbeStatus::Missing,
            Err(ToolError::Timeout { .. }) | Err(ToolError::Io { .. }) => ProbeStatus::Unknown,
        };

        match status {
            ProbeStatus::Available => info!(tool = %probe.command, "{} available", probe.label),
            ProbeStatus::Missing => warn!(tool = %probe.command, "{} not found", probe.label),
            ProbeStatus::Unknown => {
                warn!(tool = %probe.command, "{} did not answer its probe", probe.label)
            }
        }

        outcomes.push(ProbeOutcome {
            label: probe.label,
            command: probe.command.clone(),
            status,
        });
    }

    outcomes
}
