//! Ingestion driver.
//!
//! Feeds runtime events into the [`Interpreter`] from one of two sources: a
//! closed log file (decoded in one pass and globally sorted by timestamp,
//! since multi-capability logs are only cap-locally ordered at source), or a
//! live handle such as a named pipe, decoded incrementally and polled on
//! end-of-file according to an [`EofPolicy`].

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context};

use crate::event::{DecodeStep, EventDecoder, EventLogSource, EventSpec};
use crate::export::{MetricExporter, SpanExporter};
use crate::interp::{Interpreter, Output};

const READ_CHUNK: usize = 4096;
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// What to do when a tailed handle reports end-of-file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EofPolicy {
    /// Terminate cleanly.
    Stop,
    /// Sleep briefly and retry the read, indefinitely.
    SleepRetry,
}

/// Where the event log comes from.
#[derive(Debug)]
pub enum Source<R> {
    File(PathBuf),
    Handle(R, EofPolicy),
}

impl Source<fs::File> {
    /// Select a source by path convention: a `.pipe` suffix opens the file
    /// for tailing, anything else is read as a closed log.
    pub fn from_path(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        if path.extension().is_some_and(|ext| ext == "pipe") {
            let handle = fs::File::open(&path)?;
            Ok(Source::Handle(handle, EofPolicy::SleepRetry))
        } else {
            Ok(Source::File(path))
        }
    }
}

/// Interpret an event log, exporting spans and metrics as they finish.
///
/// `origin` is the wall-clock nanosecond timestamp the caller captured at
/// startup, corresponding to the log's `t = 0`; it is superseded by any
/// wall-clock marks inside the log itself.
pub fn run<R: Read>(
    origin: u64,
    spans: &mut impl SpanExporter,
    metrics: &mut impl MetricExporter,
    source: Source<R>,
    log_source: &impl EventLogSource,
) -> anyhow::Result<()> {
    let mut interp = Interpreter::new(origin);
    run_with(&mut interp, spans, metrics, source, log_source)
}

/// Like [`run`], but over a caller-constructed interpreter. This is the seam
/// for injecting a deterministic span-id seed.
pub fn run_with<R: Read>(
    interp: &mut Interpreter,
    spans: &mut impl SpanExporter,
    metrics: &mut impl MetricExporter,
    source: Source<R>,
    log_source: &impl EventLogSource,
) -> anyhow::Result<()> {
    match source {
        Source::File(path) => run_file(interp, spans, metrics, &path, log_source)?,
        Source::Handle(handle, policy) => {
            run_handle(interp, spans, metrics, handle, policy, log_source)?
        }
    }
    log::info!(
        "processed {} events, emitted {} spans ({} still in flight)",
        interp.events_processed(),
        interp.spans_emitted(),
        interp.in_flight(),
    );
    Ok(())
}

fn run_file(
    interp: &mut Interpreter,
    spans: &mut impl SpanExporter,
    metrics: &mut impl MetricExporter,
    path: &Path,
    log_source: &impl EventLogSource,
) -> anyhow::Result<()> {
    let mut events = log_source
        .decode_file(path)
        .map_err(|msg| anyhow!("decoding {}: {msg}", path.display()))?;
    events.sort_by_key(|event| event.ts);

    for event in &events {
        let out = interp
            .process(event)
            .with_context(|| format!("interpreting {}", path.display()))?;
        dispatch(spans, metrics, out);
    }
    Ok(())
}

fn run_handle<R: Read>(
    interp: &mut Interpreter,
    spans: &mut impl SpanExporter,
    metrics: &mut impl MetricExporter,
    mut handle: R,
    policy: EofPolicy,
    log_source: &impl EventLogSource,
) -> anyhow::Result<()> {
    let mut decoder = log_source.decoder();
    let mut chunk = [0u8; READ_CHUNK];
    let mut input: Option<Vec<u8>> = None;

    loop {
        match decoder.step(input.take().as_deref()) {
            DecodeStep::Produce(event) => {
                if matches!(
                    event.spec,
                    EventSpec::Shutdown | EventSpec::CapDelete | EventSpec::CapsetDelete
                ) {
                    log::debug!("runtime teardown event at t={}ns, continuing", event.ts);
                }
                let out = interp.process(&event).context("interpreting event log")?;
                dispatch(spans, metrics, out);
            }
            DecodeStep::NeedInput => {
                let n = loop {
                    match handle.read(&mut chunk) {
                        Ok(0) => match policy {
                            EofPolicy::Stop => return Ok(()),
                            EofPolicy::SleepRetry => thread::sleep(POLL_INTERVAL),
                        },
                        Ok(n) => break n,
                        Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
                        Err(err) => return Err(err).context("reading event log handle"),
                    }
                };
                input = Some(chunk[..n].to_vec());
            }
            DecodeStep::Done => {
                log::debug!("event log complete");
                return Ok(());
            }
            DecodeStep::Error { leftover, message } => {
                log::error!("event log decode error ({leftover} bytes unconsumed): {message}");
                return Ok(());
            }
        }
    }
}

fn dispatch(spans: &mut impl SpanExporter, metrics: &mut impl MetricExporter, out: Output) {
    if !out.spans.is_empty() {
        let _ = spans.export(&out.spans);
    }
    if !out.metrics.is_empty() {
        let _ = metrics.export(&out.metrics);
    }
}
