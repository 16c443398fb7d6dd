use clap::Parser;
use std::path::PathBuf;

use crate::batch::TargetKind;
use crate::dispatch::{Actions, Mode, RunRequest};
use crate::error::{EdgeError, Result};
use crate::tools::nmap::NmapFormat;

#[derive(Parser, Debug)]
#[command(name = "edgefinder")]
#[command(author = "EdgeFinder")]
#[command(version = "0.1.0")]
#[command(about = "Run nslookup, sublist3r, nmap and msfconsole over lists of domains or IPs", long_about = None)]
pub struct Cli {
    #[arg(short = 'f', long, conflicts_with_all = ["domain", "import_dir"], help = "File with one domain or IPv4 address per line")]
    pub file: Option<PathBuf>,

    #[arg(short = 't', long = "type", value_enum, requires = "file", help = "What the file holds. Inferred from content when omitted")]
    pub target_type: Option<TargetKind>,

    #[arg(short = 'n', long, help = "Resolve each domain with nslookup")]
    pub lookup: bool,

    #[arg(short = 's', long, help = "Scan each address with nmap")]
    pub scan: bool,

    #[arg(short = 'e', long, help = "Enumerate subdomains of each domain with sublist3r")]
    pub enumerate: bool,

    #[arg(short = 'd', long, conflicts_with = "import_dir", help = "Enumerate subdomains of a single domain; results are appended to the output file")]
    pub domain: Option<String>,

    #[arg(short = 'i', long, help = "Import every nmap XML file in this directory into Metasploit")]
    pub import_dir: Option<PathBuf>,

    #[arg(short = 'o', long, help = "Results file. Printed to the console when omitted")]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum, help = "Structured nmap output written next to the results file (default: all)")]
    pub nmap_format: Option<NmapFormat>,

    #[arg(long, help = "Give up on a single tool call after this many seconds")]
    pub timeout: Option<u64>,

    #[arg(short = 'j', long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..=64), help = "Tool calls allowed to run at once")]
    pub jobs: u16,

    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,

    #[arg(short = 'q', long, help = "Only print results and errors")]
    pub quiet: bool,

    #[arg(long, help = "Skip the dependency check at start-up")]
    pub skip_checks: bool,

    #[arg(long, help = "Prompt for the run settings instead of reading flags")]
    pub interactive: bool,

    #[arg(long, help = "Config file (default: <config dir>/edgefinder/config.json)")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn actions(&self) -> Actions {
        Actions {
            lookup: self.lookup,
            enumerate: self.enumerate,
            scan: self.scan,
        }
    }

    /// Builds the run described by the flags. Interactive runs build theirs
    /// from prompts instead.
    pub fn to_request(&self) -> Result<RunRequest> {
        if self.target_type.is_some() && self.file.is_none() {
            return Err(EdgeError::InvalidInput("--type only applies to a targets file (--file)".into()));
        }

        let mode = if let Some(file) = &self.file {
            Mode::Batch {
                file: file.clone(),
                declared: self.target_type,
                actions: self.actions(),
            }
        } else if let Some(domain) = &self.domain {
            Mode::SingleDomain { domain: domain.clone() }
        } else if let Some(dir) = &self.import_dir {
            Mode::ImportDir { dir: dir.clone() }
        } else {
            return Err(EdgeError::InvalidInput(
                "no targets: pass --file, --domain or --import-dir (or use --interactive)".into(),
            ));
        };

        Ok(RunRequest {
            mode,
            output: self.output.clone(),
            nmap_format: self.nmap_format,
            jobs: usize::from(self.jobs),
            show_progress: !self.quiet,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_mode_flags() {
        let cli = Cli::try_parse_from([
            "edgefinder", "-f", "targets.txt", "-t", "ips", "-s", "-o", "out.txt", "--nmap-format", "xml",
        ])
        .unwrap();
        assert_eq!(cli.file, Some(PathBuf::from("targets.txt")));
        assert_eq!(cli.target_type, Some(TargetKind::Address));
        assert!(cli.scan);
        assert_eq!(cli.nmap_format, Some(NmapFormat::Xml));
        assert_eq!(cli.jobs, 1);
    }

    #[test]
    fn test_type_requires_file() {
        let cli = Cli::try_parse_from(["edgefinder", "-t", "domains", "-d", "example.com"]).unwrap();
        assert!(matches!(cli.to_request(), Err(EdgeError::InvalidInput(_))));
        assert!(Cli::try_parse_from(["edgefinder", "-t", "domains"]).is_err());
    }

    #[test]
    fn test_modes_conflict() {
        assert!(Cli::try_parse_from(["edgefinder", "-f", "a.txt", "-d", "example.com"]).is_err());
        assert!(Cli::try_parse_from(["edgefinder", "-f", "a.txt", "-i", "scans"]).is_err());
    }

    #[test]
    fn test_jobs_range() {
        assert!(Cli::try_parse_from(["edgefinder", "-f", "a.txt", "-j", "0"]).is_err());
        let cli = Cli::try_parse_from(["edgefinder", "-f", "a.txt", "-j", "8"]).unwrap();
        assert_eq!(cli.jobs, 8);
    }

    #[test]
    fn test_to_request_batch() {
        let cli = Cli::try_parse_from(["edgefinder", "-f", "hosts.txt", "-n", "-e", "-o", "out.txt"]).unwrap();
        let request = cli.to_request().unwrap();
        assert_eq!(
            request.mode,
            Mode::Batch {
                file: PathBuf::from("hosts.txt"),
                declared: None,
                actions: Actions { lookup: true, enumerate: true, scan: false },
            }
        );
        assert_eq!(request.output, Some(PathBuf::from("out.txt")));
        assert!(request.show_progress);
    }

    #[test]
    fn test_to_request_needs_a_mode() {
        let cli = Cli::try_parse_from(["edgefinder", "-n"]).unwrap();
        assert!(matches!(cli.to_request(), Err(EdgeError::InvalidInput(_))));
    }
}
