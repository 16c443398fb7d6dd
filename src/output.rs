use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use colored::*;

use crate::error::{EdgeError, Result};

/// Destination for the collected result lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputArtifact {
    /// Truncated and rewritten on every flush.
    File(PathBuf),
    /// Grows across runs; each flush adds the run's lines at the end.
    Append(PathBuf),
    Console,
}

impl OutputArtifact {
    pub fn path(&self) -> Option<&Path> {
        match self {
            OutputArtifact::File(path) | OutputArtifact::Append(path) => Some(path),
            OutputArtifact::Console => None,
        }
    }
}

/// Ordered, append-only store of result lines for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Aggregator {
    lines: Vec<String>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn flush(&self, artifact: &OutputArtifact) -> Result<()> {
        self.flush_with_console(artifact, &mut io::stdout().lock())
    }

    /// Like `flush`, with the console stream injected.
    pub fn flush_with_console(&self, artifact: &OutputArtifact, console: &mut dyn Write) -> Result<()> {
        match artifact {
            OutputArtifact::File(path) => {
                let file = File::create(path).map_err(|e| EdgeError::io(path, e))?;
                self.write_file(file, path, false)
            }
            OutputArtifact::Append(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| EdgeError::io(path, e))?;
                self.write_file(file, path, true)
            }
            OutputArtifact::Console => self.print(console),
        }
    }

    /// Flushes to `artifact`; if that fails, prints everything to `console`
    /// before handing the original error back.
    pub fn flush_or_fallback(&self, artifact: &OutputArtifact, console: &mut dyn Write) -> Result<()> {
        match self.flush_with_console(artifact, console) {
            Ok(()) => Ok(()),
            Err(err) if artifact.path().is_some() => {
                // Console output is best effort here; the flush error wins.
                let _ = self.print(console);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    fn write_file(&self, file: File, path: &Path, trailing_newline: bool) -> Result<()> {
        let mut writer = BufWriter::new(file);
        let mut body = self.lines.join("\n");
        if trailing_newline && !self.lines.is_empty() {
            body.push('\n');
        }
        writer
            .write_all(body.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|e| EdgeError::io(path, e))
    }

    fn print(&self, console: &mut dyn Write) -> Result<()> {
        write_lines(&self.lines, console).map_err(|e| EdgeError::io("<stdout>", e))
    }
}

fn write_lines(lines: &[String], console: &mut dyn Write) -> io::Result<()> {
    for line in lines {
        writeln!(console, "{}", line)?;
    }
    console.flush()
}

/// What happened during one run, for the closing status line.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    pub targets: usize,
    pub failures: usize,
    pub artifact: Option<PathBuf>,
}

impl RunSummary {
    pub fn render(&self) -> String {
        let elapsed = (self.finished - self.started).num_milliseconds();
        let destination = match &self.artifact {
            Some(path) => format!("results written to {}", path.display()),
            None => "results printed above".to_string(),
        };
        let failures = if self.failures == 0 {
            "0 failed".green()
        } else {
            format!("{} failed", self.failures).red().bold()
        };

        format!(
            "{} {} {} {} {} {}ms {} {}",
            "⚡".truecolor(0, 255, 65).bold(),
            format!("{} targets", self.targets).truecolor(255, 255, 255).bold(),
            "•".truecolor(64, 64, 64),
            failures,
            "•".truecolor(64, 64, 64),
            elapsed,
            "•".truecolor(64, 64, 64),
            destination.truecolor(128, 128, 128),
        )
    }
}

pub fn banner() -> String {
    let art = r"
  _____    _            _____ _           _
 | ____|__| | __ _  ___|  ___(_)_ __   __| | ___ _ __
 |  _| / _` |/ _` |/ _ \ |_  | | '_ \ / _` |/ _ \ '__|
 | |__| (_| | (_| |  __/  _| | | | | | (_| |  __/ |
 |_____\__,_|\__, |\___|_|   |_|_| |_|\__,_|\___|_|
             |___/
";
    format!("{}", art.truecolor(0, 255, 65).bold())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sample() -> Aggregator {
        let mut agg = Aggregator::new();
        agg.append("example.com -> 93.184.216.34");
        agg.append("test.org -> lookup failed");
        agg
    }

    #[test]
    fn test_file_flush_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.txt");
        fs::write(&path, "stale content that is longer than the new one\n".repeat(10)).unwrap();

        let artifact = OutputArtifact::File(path.clone());
        sample().flush(&artifact).unwrap();
        let first = fs::read(&path).unwrap();
        sample().flush(&artifact).unwrap();
        let second = fs::read(&path).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            String::from_utf8(first).unwrap(),
            "example.com -> 93.184.216.34\ntest.org -> lookup failed"
        );
    }

    #[test]
    fn test_append_flush_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subs.txt");
        let artifact = OutputArtifact::Append(path.clone());

        sample().flush(&artifact).unwrap();
        sample().flush(&artifact).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 4);
        assert!(content.ends_with('\n'));
    }

    #[test]
    fn test_console_matches_file_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.txt");
        let agg = sample();

        let mut console = Vec::<u8>::new();
        agg.flush_with_console(&OutputArtifact::Console, &mut console).unwrap();
        agg.flush(&OutputArtifact::File(path.clone())).unwrap();

        let printed = String::from_utf8(console).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(printed.lines().collect::<Vec<_>>(), written.lines().collect::<Vec<_>>());
    }

    #[test]
    fn test_fallback_prints_when_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = OutputArtifact::File(dir.path().join("missing").join("results.txt"));

        let mut console = Vec::<u8>::new();
        let err = sample().flush_or_fallback(&artifact, &mut console).unwrap_err();

        assert!(matches!(err, EdgeError::Io { .. }));
        let printed = String::from_utf8(console).unwrap();
        assert_eq!(printed, "example.com -> 93.184.216.34\ntest.org -> lookup failed\n");
    }

    #[test]
    fn test_empty_flush_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        Aggregator::new().flush(&OutputArtifact::File(path.clone())).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}
