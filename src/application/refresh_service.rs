// Refresh session - Periodic retrieval and chart publication
use crate::application::chart_pipeline::{ChartError, ChartPipeline};
use crate::application::sensor_source::{RetrievalError, SensorSource};
use crate::domain::chart::ChartState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const COMMAND_QUEUE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshTrigger {
    Startup,
    Timer,
    Resume,
}

/// The published result of the latest completed refresh.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSnapshot {
    /// Zero until the first refresh completes, then +1 per refresh.
    pub sequence: u64,
    pub trigger: Option<RefreshTrigger>,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub state: ChartState,
}

impl ChartSnapshot {
    fn loading() -> Self {
        Self {
            sequence: 0,
            trigger: None,
            refreshed_at: None,
            state: ChartState::Loading,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("chart session has shut down")]
    Closed,
}

#[derive(Debug)]
enum SessionCommand {
    Resume,
    Suspend,
}

/// Cheap, cloneable access to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshots: watch::Receiver<Arc<ChartSnapshot>>,
}

impl SessionHandle {
    pub fn latest(&self) -> Arc<ChartSnapshot> {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ChartSnapshot>> {
        self.snapshots.clone()
    }

    /// Refreshes immediately and restarts the periodic timer.
    pub fn resume(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Resume)
    }

    /// Stops periodic refreshes until the next resume.
    pub fn suspend(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Suspend)
    }

    fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        match self.commands.try_send(command) {
            // A full queue already holds pending work for the driver.
            Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SessionError::Closed),
        }
    }
}

/// Owns the driver task of one chart.
///
/// Refreshes run one at a time on that task. Timer ticks that fall due while
/// a refresh is in flight are skipped, so an older result never replaces a
/// newer one.
pub struct ChartSession {
    handle: SessionHandle,
    shutdown: watch::Sender<bool>,
    driver: JoinHandle<()>,
}

impl ChartSession {
    pub fn spawn(pipeline: ChartPipeline, source: Arc<dyn SensorSource>) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(ChartSnapshot::loading()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tracing::info!(
            "Starting chart session {} (source: {}, every {:?})",
            pipeline.settings().chart_id,
            source.describe(),
            pipeline.settings().update_interval()
        );

        let driver = SessionDriver {
            pipeline,
            source,
            commands: command_rx,
            shutdown: shutdown_rx,
            snapshots: snapshot_tx,
            sequence: 0,
        };

        Self {
            handle: SessionHandle {
                commands: command_tx,
                snapshots: snapshot_rx,
            },
            shutdown: shutdown_tx,
            driver: tokio::spawn(driver.run()),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Stops the timer and waits for the driver. A refresh still in flight is
    /// abandoned and never published.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.driver.await {
            tracing::error!("Chart session driver failed: {}", e);
        }
    }
}

enum Wake {
    Shutdown,
    Command(Option<SessionCommand>),
    Tick,
}

struct SessionDriver {
    pipeline: ChartPipeline,
    source: Arc<dyn SensorSource>,
    commands: mpsc::Receiver<SessionCommand>,
    shutdown: watch::Receiver<bool>,
    snapshots: watch::Sender<Arc<ChartSnapshot>>,
    sequence: u64,
}

impl SessionDriver {
    async fn run(mut self) {
        let chart_id = self.pipeline.settings().chart_id.clone();
        let mut ticker = tokio::time::interval(self.pipeline.settings().update_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut started = false;
        let mut suspended = false;

        loop {
            let wake = tokio::select! {
                biased;
                _ = self.shutdown.changed() => Wake::Shutdown,
                command = self.commands.recv() => Wake::Command(command),
                _ = ticker.tick(), if !suspended => Wake::Tick,
            };

            let trigger = match wake {
                Wake::Shutdown | Wake::Command(None) => break,
                Wake::Command(Some(SessionCommand::Suspend)) => {
                    if !suspended {
                        tracing::info!("Chart {}: periodic refresh suspended", chart_id);
                    }
                    suspended = true;
                    continue;
                }
                Wake::Command(Some(SessionCommand::Resume)) => {
                    tracing::info!("Chart {}: resumed, fetching data", chart_id);
                    suspended = false;
                    started = true;
                    ticker.reset();
                    RefreshTrigger::Resume
                }
                Wake::Tick if !started => {
                    started = true;
                    RefreshTrigger::Startup
                }
                Wake::Tick => RefreshTrigger::Timer,
            };

            let outcome = tokio::select! {
                biased;
                _ = self.shutdown.changed() => None,
                state = refresh(&self.pipeline, self.source.as_ref()) => Some(state),
            };

            match outcome {
                Some(state) => self.publish(trigger, state),
                None => {
                    tracing::info!("Chart {}: shutdown during refresh, result discarded", chart_id);
                    break;
                }
            }
        }

        tracing::info!("Chart session {} stopped", chart_id);
    }

    fn publish(&mut self, trigger: RefreshTrigger, state: ChartState) {
        self.sequence += 1;
        let snapshot = ChartSnapshot {
            sequence: self.sequence,
            trigger: Some(trigger),
            refreshed_at: Some(Utc::now()),
            state,
        };
        self.snapshots.send_replace(Arc::new(snapshot));
    }
}

/// One refresh cycle: fetch, then run the pipeline to completion.
async fn refresh(pipeline: &ChartPipeline, source: &dyn SensorSource) -> ChartState {
    let settings = pipeline.settings();
    let timeout = settings.fetch_timeout();

    let fetched = match tokio::time::timeout(timeout, source.fetch()).await {
        Ok(result) => result,
        Err(_) => Err(RetrievalError::Timeout(timeout)),
    };

    let result = fetched
        .map_err(ChartError::from)
        .and_then(|payload| pipeline.run(payload, Utc::now()));

    match &result {
        Ok(chart) => tracing::info!(
            "Chart {}: {} datasets ready",
            settings.chart_id,
            chart.datasets.len()
        ),
        Err(ChartError::NoData(reason)) => {
            tracing::info!("Chart {}: {}", settings.chart_id, reason)
        }
        Err(ChartError::Retrieval(e)) => {
            tracing::warn!("Chart {}: error fetching sensor data: {}", settings.chart_id, e)
        }
    }

    ChartState::from(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chart::{FailureKind, NoDataReason};
    use async_trait::async_trait;
    use chrono::Duration;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticSource {
        payload: Value,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl SensorSource for StaticSource {
        fn describe(&self) -> String {
            "static".to_string()
        }

        async fn fetch(&self) -> Result<Value, RetrievalError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.payload.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl SensorSource for FailingSource {
        fn describe(&self) -> String {
            "failing".to_string()
        }

        async fn fetch(&self) -> Result<Value, RetrievalError> {
            Err(RetrievalError::Status {
                url: "http://sensors.local".to_string(),
                status: 503,
            })
        }
    }

    struct PendingSource;

    #[async_trait]
    impl SensorSource for PendingSource {
        fn describe(&self) -> String {
            "pending".to_string()
        }

        async fn fetch(&self) -> Result<Value, RetrievalError> {
            futures::future::pending().await
        }
    }

    fn pipeline() -> ChartPipeline {
        pipeline_every(3600)
    }

    fn pipeline_every(update_interval_secs: u64) -> ChartPipeline {
        let settings = serde_json::from_value(json!({
            "data_source": "memory",
            "update_interval_secs": update_interval_secs,
            "series": [{ "data_id": "v" }]
        }))
        .unwrap();
        ChartPipeline::new(Arc::new(settings))
    }

    fn empty_source() -> Arc<StaticSource> {
        Arc::new(StaticSource {
            payload: json!([]),
            fetches: AtomicUsize::new(0),
        })
    }

    /// Lets the driver drain its command queue without moving the clock.
    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    fn recent_payload() -> Value {
        json!([{ "timestamp": (Utc::now() - Duration::hours(1)).to_rfc3339(), "v": 4.2 }])
    }

    async fn wait_for_sequence(handle: &SessionHandle, sequence: u64) -> Arc<ChartSnapshot> {
        let mut rx = handle.subscribe();
        let snapshot = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            rx.wait_for(|s| s.sequence >= sequence),
        )
        .await
        .expect("timed out waiting for refresh")
        .expect("session closed");
        snapshot.clone()
    }

    #[tokio::test]
    async fn test_startup_refresh_publishes_chart() {
        let source = Arc::new(StaticSource {
            payload: recent_payload(),
            fetches: AtomicUsize::new(0),
        });
        let session = ChartSession::spawn(pipeline(), source.clone());
        let handle = session.handle();

        let snapshot = wait_for_sequence(&handle, 1).await;

        assert_eq!(snapshot.sequence, 1);
        assert_eq!(snapshot.trigger, Some(RefreshTrigger::Startup));
        assert!(snapshot.refreshed_at.is_some());
        assert!(snapshot.state.is_ready());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_resume_triggers_new_refresh() {
        let source = Arc::new(StaticSource {
            payload: json!([]),
            fetches: AtomicUsize::new(0),
        });
        let session = ChartSession::spawn(pipeline(), source.clone());
        let handle = session.handle();
        wait_for_sequence(&handle, 1).await;

        handle.suspend().unwrap();
        handle.resume().unwrap();
        let snapshot = wait_for_sequence(&handle, 2).await;

        assert_eq!(snapshot.trigger, Some(RefreshTrigger::Resume));
        assert!(matches!(
            snapshot.state,
            ChartState::NoData { reason: NoDataReason::EmptyWindow, .. }
        ));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);

        session.shutdown().await;
        assert_eq!(handle.resume(), Err(SessionError::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_suspend_pauses_timer_and_resume_restarts_period() {
        let period = std::time::Duration::from_secs(10);
        let source = empty_source();
        let session = ChartSession::spawn(pipeline_every(10), source.clone());
        let handle = session.handle();
        wait_for_sequence(&handle, 1).await;

        handle.suspend().unwrap();
        settle().await;
        tokio::time::advance(period * 4).await;
        settle().await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(handle.latest().sequence, 1);

        handle.resume().unwrap();
        let resumed = wait_for_sequence(&handle, 2).await;
        assert_eq!(resumed.trigger, Some(RefreshTrigger::Resume));

        // The period restarts at the resume, not at the last missed tick.
        tokio::time::advance(period - std::time::Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);

        tokio::time::advance(std::time::Duration::from_secs(1)).await;
        let ticked = wait_for_sequence(&handle, 3).await;
        assert_eq!(ticked.trigger, Some(RefreshTrigger::Timer));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 3);

        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_before_first_tick_counts_as_start() {
        let period = std::time::Duration::from_secs(10);
        let source = empty_source();
        let session = ChartSession::spawn(pipeline_every(10), source.clone());
        let handle = session.handle();

        // Queued before the driver first runs, so it wins over the first tick.
        handle.resume().unwrap();
        let first = wait_for_sequence(&handle, 1).await;
        assert_eq!(first.trigger, Some(RefreshTrigger::Resume));

        tokio::time::advance(period).await;
        let next = wait_for_sequence(&handle, 2).await;
        assert_eq!(next.trigger, Some(RefreshTrigger::Timer));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_retrieval_failure_is_published() {
        let session = ChartSession::spawn(pipeline(), Arc::new(FailingSource));
        let snapshot = wait_for_sequence(&session.handle(), 1).await;

        match &snapshot.state {
            ChartState::Error { kind, message } => {
                assert_eq!(*kind, FailureKind::Retrieval);
                assert!(message.contains("503"), "{message}");
            }
            other => panic!("unexpected state {other:?}"),
        }

        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_discards_in_flight_refresh() {
        let session = ChartSession::spawn(pipeline(), Arc::new(PendingSource));
        let handle = session.handle();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        tokio::time::timeout(std::time::Duration::from_secs(5), session.shutdown())
            .await
            .expect("shutdown should not wait for the pending fetch");

        let latest = handle.latest();
        assert_eq!(latest.sequence, 0);
        assert_eq!(latest.state, ChartState::Loading);
        assert_eq!(handle.suspend(), Err(SessionError::Closed));
    }

    #[test]
    fn test_snapshot_serialization() {
        let snapshot = ChartSnapshot::loading();
        assert_eq!(
            serde_json::to_value(&snapshot).unwrap(),
            json!({
                "sequence": 0,
                "trigger": null,
                "refreshed_at": null,
                "state": { "status": "loading" }
            })
        );
    }
}
