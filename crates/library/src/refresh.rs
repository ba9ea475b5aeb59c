//! Background refresh of the feed index.
//!
//! A single task owns everything about refreshing: the timer, whether a cycle
//! is running, and whether another one was asked for meanwhile. Callers only
//! talk to it through a [`RefreshHandle`], so nothing they do ever waits for
//! the network.

use crate::cache::FeedCache;
use crate::error::{ErrorKind, Result};
use crate::import;
use castdex_store::Repository;
use futures::future::OptionFuture;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use time::UtcDateTime;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, sleep_until};
use tracing::instrument;

/// What a refresh cycle needs to know and touch.
pub struct RefreshContext {
    /// Configured feed URIs, refreshed before any imported ones.
    pub feeds: Vec<String>,
    /// Directory of OPML subscription lists, rescanned every cycle.
    pub import_dir: Option<PathBuf>,
    pub interval: Duration,
    pub cache: Arc<FeedCache>,
    pub repository: Repository,
}

/// Outcome of one refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Cycles completed since the scheduler started, this one included.
    pub sequence: u64,
    pub started: UtcDateTime,
    pub elapsed: Duration,
    /// Size of the active feed set.
    pub feeds: usize,
    pub updated: usize,
    /// Feeds whose publication date hadn't moved.
    pub unchanged: usize,
    pub failed: usize,
}

enum Command {
    Refresh,
    Stop(oneshot::Sender<()>),
}

/// Control over a running [`RefreshScheduler`]. Cheap to clone.
#[derive(Clone)]
pub struct RefreshHandle {
    commands: mpsc::UnboundedSender<Command>,
    reports: watch::Receiver<Option<CycleReport>>,
}

impl RefreshHandle {
    /// Ask for a refresh cycle. If one is already running, a single
    /// follow-up cycle is queued no matter how often this is called.
    pub fn refresh(&self) -> Result<()> {
        self.commands.send(Command::Refresh).map_err(|_| exn::Exn::from(ErrorKind::Stopped))
    }

    /// Stop the scheduler. A cycle already in flight runs to completion
    /// first; a queued follow-up doesn't run at all.
    pub async fn stop(&self) {
        let (ack, stopped) = oneshot::channel();
        if self.commands.send(Command::Stop(ack)).is_ok() {
            // Dropped without an answer only when the task is gone anyway.
            let _ = stopped.await;
        }
    }

    /// Reports of completed cycles, starting with `None` until the first
    /// cycle ends.
    pub fn reports(&self) -> watch::Receiver<Option<CycleReport>> {
        self.reports.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.commands.is_closed()
    }
}

type Cycle<'a> = Pin<Box<dyn Future<Output = CycleReport> + Send + 'a>>;

enum Event {
    Tick,
    Refresh,
    Stop(Option<oneshot::Sender<()>>),
    Finished(CycleReport),
}

pub struct RefreshScheduler {
    context: RefreshContext,
    reports: watch::Sender<Option<CycleReport>>,
}

impl RefreshScheduler {
    /// Spawn the scheduler task onto the current tokio runtime. The first
    /// cycle starts straight away.
    pub fn start(context: RefreshContext) -> RefreshHandle {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (reports, watcher) = watch::channel(None);
        let scheduler = Self { context, reports };
        tokio::spawn(scheduler.run(receiver));
        RefreshHandle { commands, reports: watcher }
    }

    async fn run(self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let interval = self.context.interval;
        let mut deadline = Instant::now();
        let mut sequence = 0;
        let mut pending = false;
        let mut stopping = false;
        let mut acks = Vec::new();
        let mut cycle: Option<Cycle<'_>> = None;

        tracing::info!(interval = ?interval, "refresh scheduler started");
        loop {
            let event = tokio::select! {
                biased;
                command = commands.recv(), if !stopping => match command {
                    Some(Command::Refresh) => Event::Refresh,
                    Some(Command::Stop(ack)) => Event::Stop(Some(ack)),
                    None => Event::Stop(None),
                },
                () = sleep_until(deadline), if !stopping => Event::Tick,
                Some(report) = OptionFuture::from(cycle.as_mut()), if cycle.is_some() => Event::Finished(report),
            };

            if matches!(event, Event::Tick) {
                deadline = Instant::now() + interval;
            }
            match event {
                Event::Tick | Event::Refresh => {
                    if cycle.is_some() {
                        tracing::info!("already refreshing");
                        pending = true;
                    } else {
                        deadline = Instant::now() + interval;
                        sequence += 1;
                        cycle = Some(Box::pin(self.cycle(sequence)));
                    }
                },
                Event::Finished(report) => {
                    cycle = None;
                    self.reports.send_replace(Some(report));
                    if stopping {
                        break;
                    }
                    if pending {
                        pending = false;
                        deadline = Instant::now() + interval;
                        sequence += 1;
                        cycle = Some(Box::pin(self.cycle(sequence)));
                    }
                },
                Event::Stop(ack) => {
                    stopping = true;
                    pending = false;
                    acks.extend(ack);
                    if cycle.is_none() {
                        break;
                    }
                    tracing::info!("waiting for refresh cycle to finish");
                },
            }
        }

        drop(commands);
        for ack in acks {
            let _ = ack.send(());
        }
        tracing::info!("refresh scheduler stopped");
    }

    #[instrument("refresh cycle", skip(self))]
    async fn cycle(&self, sequence: u64) -> CycleReport {
        let started = UtcDateTime::now();
        let clock = Instant::now();
        let imported = match &self.context.import_dir {
            Some(dir) => import::scan(dir).await,
            None => Vec::new(),
        };
        let feeds = import::merge(&self.context.feeds, &imported);
        tracing::info!(feeds = feeds.len(), "refreshing feeds");

        let mut report = CycleReport {
            sequence,
            started,
            elapsed: Duration::ZERO,
            feeds: feeds.len(),
            updated: 0,
            unchanged: 0,
            failed: 0,
        };
        match self.context.repository.cleanup(&feeds).await {
            Ok(removed) => {
                if removed > 0 {
                    tracing::info!(removed, "removed feeds no longer subscribed to");
                }
                for feed in feeds.iter().map(String::as_str) {
                    let clock = Instant::now();
                    match self.update(feed).await {
                        Ok(true) => report.updated += 1,
                        Ok(false) => report.unchanged += 1,
                        Err(err) => {
                            tracing::warn!(feed, error = ?err, "skipping feed");
                            report.failed += 1;
                            continue;
                        },
                    }
                    tracing::debug!(feed, elapsed = ?clock.elapsed(), "refreshed feed");
                }
            },
            Err(err) => {
                tracing::error!(error = ?err, "cannot remove stale feeds, skipping update");
                report.failed = feeds.len();
            },
        }

        report.elapsed = clock.elapsed();
        tracing::info!(
            elapsed = ?report.elapsed,
            updated = report.updated,
            unchanged = report.unchanged,
            failed = report.failed,
            "refresh finished"
        );
        report
    }

    async fn update(&self, uri: &str) -> Result<bool> {
        // No timeout in the background, a slow feed only delays the next one.
        let podcast = self.context.cache.get_or_compute(uri, None).await?;
        self.context.repository.update(&podcast).await.map_err(ErrorKind::store)
    }
}
