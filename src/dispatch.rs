//! Batch orchestration: classify the targets, call the right tool for each
//! one, and collect the results in input order.
//!
//! A run moves through `Idle → Classifying → Dispatching → Aggregating →
//! Done`, and can drop into `Failed` from any of the non-terminal states.
//! Per-target tool failures are turned into result lines and never stop the
//! run; only a missing tool or a failing flush does.

use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::batch::{classify, read_targets, ClassifiedBatch, TargetKind};
use crate::config::Config;
use crate::error::{EdgeError, Result, ToolError};
use crate::network::is_valid_address;
use crate::output::{Aggregator, OutputArtifact, RunSummary};
use crate::tools::deps::Needs;
use crate::tools::nmap::{self, NmapFormat, ScanOutput};
use crate::tools::{msfconsole, nslookup, sublist3r, Invoker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Classifying,
    Dispatching,
    Aggregating,
    Done,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Lookup,
    Enumerate,
    Scan,
}

impl Action {
    fn applies_to(self, kind: TargetKind) -> bool {
        match self {
            Action::Lookup | Action::Enumerate => kind == TargetKind::Domain,
            Action::Scan => kind == TargetKind::Address,
        }
    }

    fn failure_label(self) -> &'static str {
        match self {
            Action::Lookup => "lookup",
            Action::Enumerate => "enumeration",
            Action::Scan => "scan",
        }
    }
}

/// Actions asked for on the command line or at the prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Actions {
    pub lookup: bool,
    pub enumerate: bool,
    pub scan: bool,
}

impl Actions {
    pub fn any(&self) -> bool {
        self.lookup || self.enumerate || self.scan
    }

    fn requested(&self) -> Vec<Action> {
        let mut list = Vec::new();
        if self.lookup {
            list.push(Action::Lookup);
        }
        if self.enumerate {
            list.push(Action::Enumerate);
        }
        if self.scan {
            list.push(Action::Scan);
        }
        list
    }

    /// Actions to run for a batch of `kind`. Nothing requested means the
    /// natural default: lookup for domains, scan for addresses.
    pub fn plan(&self, kind: TargetKind) -> Result<Vec<Action>> {
        if !self.any() {
            return Ok(match kind {
                TargetKind::Domain => vec![Action::Lookup],
                TargetKind::Address => vec![Action::Scan],
            });
        }

        let (planned, skipped): (Vec<Action>, Vec<Action>) =
            self.requested().into_iter().partition(|a| a.applies_to(kind));

        for action in &skipped {
            warn!(?action, %kind, "requested action does not apply to this batch, skipping");
        }

        if planned.is_empty() {
            return Err(EdgeError::InvalidInput(format!(
                "none of the requested actions apply to a batch of {}",
                kind
            )));
        }
        Ok(planned)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Batch {
        file: PathBuf,
        declared: Option<TargetKind>,
        actions: Actions,
    },
    SingleDomain {
        domain: String,
    },
    ImportDir {
        dir: PathBuf,
    },
}

/// Everything a front-end has to decide before a run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub mode: Mode,
    pub output: Option<PathBuf>,
    pub nmap_format: Option<NmapFormat>,
    pub jobs: usize,
    pub show_progress: bool,
}

impl RunRequest {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            output: None,
            nmap_format: None,
            jobs: 1,
            show_progress: false,
        }
    }

    /// Rejects flag combinations that can never lead to a useful run.
    pub fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            return Err(EdgeError::InvalidInput("jobs must be at least 1".into()));
        }

        match &self.mode {
            Mode::Batch { file, .. } => {
                if !file.is_file() {
                    return Err(EdgeError::InvalidInput(format!(
                        "file not found: {}",
                        file.display()
                    )));
                }
                if self.nmap_format.is_some() && self.output.is_none() {
                    return Err(EdgeError::InvalidInput(
                        "--nmap-format needs an output file to derive scan paths from".into(),
                    ));
                }
            }
            _ if self.nmap_format.is_some() => {
                return Err(EdgeError::InvalidInput(
                    "--nmap-format only applies to scans of a targets file".into(),
                ));
            }
            Mode::SingleDomain { domain } => {
                if domain.trim().is_empty() {
                    return Err(EdgeError::InvalidInput("domain is empty".into()));
                }
                if is_valid_address(domain.trim()) {
                    return Err(EdgeError::InvalidInput(format!(
                        "{} is an address, subdomain enumeration needs a domain",
                        domain.trim()
                    )));
                }
            }
            Mode::ImportDir { dir } => {
                if !dir.is_dir() {
                    return Err(EdgeError::InvalidInput(format!(
                        "not a directory: {}",
                        dir.display()
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn artifact(&self) -> OutputArtifact {
        match (&self.mode, &self.output) {
            (_, None) => OutputArtifact::Console,
            (Mode::SingleDomain { .. }, Some(path)) => OutputArtifact::Append(path.clone()),
            (_, Some(path)) => OutputArtifact::File(path.clone()),
        }
    }

    /// Collaborators worth probing before this run.
    pub fn needs(&self) -> Needs {
        match &self.mode {
            Mode::Batch { declared, actions, .. } => {
                let defaulted = !actions.any();
                Needs {
                    nslookup: actions.lookup || (defaulted && *declared != Some(TargetKind::Address)),
                    nmap: actions.scan || (defaulted && *declared != Some(TargetKind::Domain)),
                    sublist3r: actions.enumerate,
                    msfconsole: false,
                }
            }
            Mode::SingleDomain { .. } => Needs {
                sublist3r: true,
                ..Needs::default()
            },
            Mode::ImportDir { .. } => Needs {
                msfconsole: true,
                ..Needs::default()
            },
        }
    }

    fn effective_nmap_format(&self) -> NmapFormat {
        self.nmap_format.unwrap_or(NmapFormat::All)
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub kind: Option<TargetKind>,
    pub results: Aggregator,
    pub summary: RunSummary,
}

/// Result lines produced for one target. `fatal` is set when a missing tool
/// cut the target short; the lines gathered before that still count.
#[derive(Debug, Default)]
struct TargetReport {
    lines: Vec<String>,
    failures: usize,
    fatal: Option<EdgeError>,
}

impl TargetReport {
    fn record_failure(&mut self, target: &str, what: &str, err: ToolError) {
        match recover(target, what, err) {
            Ok(line) => {
                self.lines.push(line);
                self.failures += 1;
            }
            Err(fatal) => self.fatal = Some(fatal),
        }
    }
}

/// Borrowed view of what each per-target call needs.
#[derive(Clone, Copy)]
struct Worker<'a> {
    invoker: &'a dyn Invoker,
    config: &'a Config,
    output: Option<&'a Path>,
    nmap_format: NmapFormat,
}

impl<'a> Worker<'a> {
    async fn process_target(&self, target: &str, actions: &[Action]) -> TargetReport {
        let mut report = TargetReport::default();
        for &action in actions {
            match self.run_action(target, action).await {
                Ok(line) => report.lines.push(line),
                Err(err) => report.record_failure(target, action.failure_label(), err),
            }
            if report.fatal.is_some() {
                break;
            }
        }
        report
    }

    async fn run_action(&self, target: &str, action: Action) -> std::result::Result<String, ToolError> {
        let tools = &self.config.tools;
        let timeout = self.config.tool_timeout();

        match action {
            Action::Lookup => {
                match nslookup::lookup(self.invoker, &tools.nslookup, target, timeout).await? {
                    Some(address) => Ok(format!("{} -> {}", target, address)),
                    None => Err(ToolError::ExecutionFailed {
                        command: tools.nslookup.clone(),
                        status: "no address in answer".to_string(),
                        output: String::new(),
                    }),
                }
            }
            Action::Enumerate => {
                let path = self.output.map(|out| sublist3r::subdomains_path(out, target));
                let raw = sublist3r::enumerate(self.invoker, &tools.sublist3r, target, path.as_deref(), timeout)
                    .await?;
                Ok(format!("Sublist3r result for {}:\n{}", target, raw.trim_end()))
            }
            Action::Scan => {
                let scan_output = self
                    .output
                    .map(|out| ScanOutput::for_target(out, target, self.nmap_format));
                let raw = nmap::scan(
                    self.invoker,
                    &tools.nmap,
                    &self.config.nmap_flags,
                    target,
                    scan_output.as_ref(),
                    timeout,
                )
                .await?;
                if let Some(xml) = scan_output.as_ref().and_then(ScanOutput::xml_path) {
                    info!(subject = %target, xml = %xml.display(), "nmap XML saved, import it later with --import-dir");
                }
                Ok(format!("Scan result for {}:\n{}", target, raw.trim_end()))
            }
        }
    }

    async fn import(&self, xml: &Path) -> TargetReport {
        let tools = &self.config.tools;
        let name = xml.display().to_string();
        let mut report = TargetReport::default();

        match msfconsole::import(self.invoker, &tools.msfconsole, xml, self.config.tool_timeout()).await {
            Ok(()) => report.lines.push(format!("{} -> imported", name)),
            Err(err) => report.record_failure(&name, "import", err),
        }
        report
    }
}

/// Downgrades a tool failure to a result line. A missing binary is the one
/// failure that ends the run, since every later target would hit it too.
fn recover(target: &str, what: &str, err: ToolError) -> Result<String> {
    if let ToolError::NotFound { .. } = err {
        return Err(err.into());
    }

    match err.diagnostic() {
        Some(text) => warn!(subject = %target, tool = err.command(), "{}: {}\n{}", what, err, text),
        None => warn!(subject = %target, tool = err.command(), "{}: {}", what, err),
    }
    Ok(format!("{} -> {} failed", target, what))
}

pub struct Dispatcher<'a> {
    invoker: &'a dyn Invoker,
    config: &'a Config,
    state: RunState,
}

impl<'a> Dispatcher<'a> {
    pub fn new(invoker: &'a dyn Invoker, config: &'a Config) -> Self {
        Self {
            invoker,
            config,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "run state");
        self.state = next;
    }

    fn fail(&mut self, err: EdgeError) -> EdgeError {
        self.transition(RunState::Failed);
        err
    }

    /// Executes one run. `console` receives console-artifact output and
    /// the fallback copy when the results file cannot be written.
    pub async fn run(&mut self, request: &RunRequest, console: &mut dyn Write) -> Result<RunReport> {
        let started = Utc::now();
        self.state = RunState::Idle;

        if let Err(err) = request.validate() {
            return Err(self.fail(err));
        }

        let worker = Worker {
            invoker: self.invoker,
            config: self.config,
            output: request.output.as_deref(),
            nmap_format: request.effective_nmap_format(),
        };
        let mut results = Aggregator::new();

        let (kind, targets, failures) = match &request.mode {
            Mode::Batch { file, declared, actions } => {
                self.transition(RunState::Classifying);
                let classified = read_targets(file)
                    .and_then(|lines| classify(lines, *declared).map_err(EdgeError::from));
                let batch = match classified {
                    Ok(batch) => batch,
                    Err(err) => return Err(self.fail(err)),
                };
                info!(kind = %batch.kind, targets = batch.len(), "batch classified");

                let actions = if batch.is_empty() {
                    Vec::new()
                } else {
                    match actions.plan(batch.kind) {
                        Ok(actions) => actions,
                        Err(err) => return Err(self.fail(err)),
                    }
                };

                self.transition(RunState::Dispatching);
                let failures = self
                    .dispatch_batch(&worker, &batch, &actions, request, &mut results, console)
                    .await?;
                (Some(batch.kind), batch.len(), failures)
            }
            Mode::SingleDomain { domain } => {
                self.transition(RunState::Dispatching);
                let batch = ClassifiedBatch {
                    kind: TargetKind::Domain,
                    targets: vec![domain.trim().to_string()],
                };
                let failures = self
                    .dispatch_batch(&worker, &batch, &[Action::Enumerate], request, &mut results, console)
                    .await?;
                (Some(TargetKind::Domain), 1, failures)
            }
            Mode::ImportDir { dir } => {
                self.transition(RunState::Dispatching);
                let files = match msfconsole::xml_files(dir) {
                    Ok(files) => files,
                    Err(err) => return Err(self.fail(err)),
                };
                info!(files = files.len(), dir = %dir.display(), "importing scan results");

                let total = files.len();
                let pb = progress_bar(total, request.show_progress);
                let outcome = drain(files, request.jobs, &pb, &mut results, move |xml| async move {
                    worker.import(&xml).await
                })
                .await;
                pb.finish_and_clear();
                let failures = self.after_dispatch(outcome, &results, console)?;
                (None, total, failures)
            }
        };

        self.transition(RunState::Aggregating);
        let artifact = request.artifact();
        if let Err(err) = results.flush_or_fallback(&artifact, console) {
            warn!(error = %err, "could not write results, printed them to the console instead");
            return Err(self.fail(err));
        }
        self.transition(RunState::Done);

        let summary = RunSummary {
            started,
            finished: Utc::now(),
            targets,
            failures,
            artifact: artifact.path().map(Path::to_path_buf),
        };
        info!(targets, failures, "run complete");

        Ok(RunReport { kind, results, summary })
    }

    async fn dispatch_batch(
        &mut self,
        worker: &Worker<'_>,
        batch: &ClassifiedBatch,
        actions: &[Action],
        request: &RunRequest,
        results: &mut Aggregator,
        console: &mut dyn Write,
    ) -> Result<usize> {
        let pb = progress_bar(batch.len(), request.show_progress);
        let outcome = drain(batch.targets.clone(), request.jobs, &pb, results, move |target| async move {
            worker.process_target(&target, actions).await
        })
        .await;
        pb.finish_and_clear();
        self.after_dispatch(outcome, results, console)
    }

    fn after_dispatch(
        &mut self,
        outcome: Result<usize>,
        results: &Aggregator,
        console: &mut dyn Write,
    ) -> Result<usize> {
        outcome.map_err(|err| {
            if !results.is_empty() {
                warn!("run aborted, printing {} gathered results", results.len());
                let _ = results.flush_with_console(&OutputArtifact::Console, console);
            }
            self.fail(err)
        })
    }
}

/// Runs `work` over `items` with at most `jobs` in flight and appends the
/// lines in item order. Stops at the first fatal error, after appending the
/// lines that target produced before it.
async fn drain<I, F, Fut>(
    items: Vec<I>,
    jobs: usize,
    pb: &ProgressBar,
    results: &mut Aggregator,
    work: F,
) -> Result<usize>
where
    F: FnMut(I) -> Fut,
    Fut: Future<Output = TargetReport>,
{
    let mut reports = stream::iter(items).map(work).buffered(jobs.max(1));
    let mut failures = 0;

    while let Some(report) = reports.next().await {
        failures += report.failures;
        for line in report.lines {
            results.append(line);
        }
        if let Some(fatal) = report.fatal {
            return Err(fatal);
        }
        pb.inc(1);
    }

    Ok(failures)
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("⟦{spinner:.bright_magenta}⟧ [{elapsed_precise}] ⟨{bar:40.bright_green/bright_black}⟩ {pos}/{len} targets ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ");
    pb.set_style(style);
    pb
}
