//! Prompt-driven front-end. Collects the same settings as the flags and
//! hands back a `RunRequest`; it never runs anything itself.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use colored::*;

use crate::batch::TargetKind;
use crate::dispatch::{Actions, Mode, RunRequest};
use crate::error::{EdgeError, Result};
use crate::tools::nmap::NmapFormat;

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn collect(&mut self) -> Result<RunRequest> {
        let mode = self.choose(
            "What do you want to run?",
            &["process a file of domains or IPs", "enumerate subdomains of one domain", "import nmap XML files into Metasploit"],
        )?;

        let mut request = match mode {
            0 => {
                let file = PathBuf::from(self.required("Path to the targets file")?);
                let declared = match self.choose("What does the file hold?", &["detect automatically", "domains", "ips"])? {
                    1 => Some(TargetKind::Domain),
                    2 => Some(TargetKind::Address),
                    _ => None,
                };
                let actions = Actions {
                    lookup: self.confirm("Resolve domains with nslookup?")?,
                    enumerate: self.confirm("Enumerate subdomains with sublist3r?")?,
                    scan: self.confirm("Scan addresses with nmap?")?,
                };
                RunRequest::new(Mode::Batch { file, declared, actions })
            }
            1 => RunRequest::new(Mode::SingleDomain {
                domain: self.required("Domain to enumerate")?,
            }),
            _ => RunRequest::new(Mode::ImportDir {
                dir: PathBuf::from(self.required("Directory holding the XML files")?),
            }),
        };

        request.output = self.optional("Results file (leave empty to print)")?.map(PathBuf::from);

        let scans = matches!(&request.mode, Mode::Batch { actions, .. } if actions.scan);
        if scans && request.output.is_some() {
            request.nmap_format = match self.choose("nmap output to keep", &["all formats", "normal", "xml"])? {
                1 => Some(NmapFormat::Normal),
                2 => Some(NmapFormat::Xml),
                _ => Some(NmapFormat::All),
            };
        }

        Ok(request)
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{} {} ", "?".truecolor(0, 212, 255).bold(), prompt)
            .and_then(|_| self.output.flush())
            .map_err(stdin_error)?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line).map_err(stdin_error)?;
        if read == 0 {
            return Err(EdgeError::InvalidInput("input closed before all questions were answered".into()));
        }
        Ok(line.trim().to_string())
    }

    fn required(&mut self, prompt: &str) -> Result<String> {
        loop {
            let answer = self.ask(&format!("{}:", prompt))?;
            if !answer.is_empty() {
                return Ok(answer);
            }
        }
    }

    fn optional(&mut self, prompt: &str) -> Result<Option<String>> {
        let answer = self.ask(&format!("{}:", prompt))?;
        Ok((!answer.is_empty()).then_some(answer))
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        loop {
            match self.ask(&format!("{} [y/N]", prompt))?.to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "" | "n" | "no" => return Ok(false),
                _ => continue,
            }
        }
    }

    /// Returns the zero-based index of the picked option. Empty picks the first.
    fn choose(&mut self, prompt: &str, options: &[&str]) -> Result<usize> {
        loop {
            writeln!(self.output, "{}", prompt.bold()).map_err(stdin_error)?;
            for (i, option) in options.iter().enumerate() {
                writeln!(self.output, "  {}) {}", i + 1, option).map_err(stdin_error)?;
            }
            let answer = self.ask(&format!("Choice [1-{}]:", options.len()))?;
            if answer.is_empty() {
                return Ok(0);
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Ok(n - 1),
                _ => continue,
            }
        }
    }
}

fn stdin_error(err: io::Error) -> EdgeError {
    EdgeError::io("<stdin>", err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn collect(script: &str) -> Result<RunRequest> {
        let mut sink = Vec::<u8>::new();
        Prompter::new(Cursor::new(script.to_string()), &mut sink).collect()
    }

    #[test]
    fn test_file_mode() {
        let request = collect("1\ntargets.txt\n3\nn\nn\ny\nout.txt\n3\n").unwrap();
        assert_eq!(
            request.mode,
            Mode::Batch {
                file: PathBuf::from("targets.txt"),
                declared: Some(TargetKind::Address),
                actions: Actions { lookup: false, enumerate: false, scan: true },
            }
        );
        assert_eq!(request.output, Some(PathBuf::from("out.txt")));
        assert_eq!(request.nmap_format, Some(NmapFormat::Xml));
    }

    #[test]
    fn test_single_domain_retries_bad_answers() {
        let request = collect("7\n2\n\nexample.com\n\n").unwrap();
        assert_eq!(request.mode, Mode::SingleDomain { domain: "example.com".into() });
        assert_eq!(request.output, None);
    }

    #[test]
    fn test_import_mode() {
        let request = collect("3\nscans\nimported.txt\n").unwrap();
        assert_eq!(request.mode, Mode::ImportDir { dir: PathBuf::from("scans") });
        assert_eq!(request.nmap_format, None);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_menu_write_failure_is_reported() {
        let result = Prompter::new(Cursor::new("1\n".to_string()), BrokenPipe).collect();
        assert!(matches!(result, Err(EdgeError::Io { .. })));
    }

    #[test]
    fn test_closed_input() {
        assert!(matches!(collect("1\n"), Err(EdgeError::InvalidInput(_))));
    }
}
