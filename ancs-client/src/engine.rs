//! Async engine - runs a [`Dispatcher`] against a live transport
//!
//! One task owns the dispatcher, so the pending table needs no lock. Control
//! Point writes are spawned onto a `JoinSet` instead of being awaited inline,
//! which keeps notifications flowing while a write is in flight; their
//! outcome, including a panic, comes back into the same loop.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use ancs_proto::NotificationEvent;
use data_encoding::HEXLOWER;
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, warn};

use crate::{
    ControlPoint, Dispatcher, DispatcherConfig, EngineError, NotificationSummary, OutgoingRequest,
    TransportError, TransportEvent,
};

/// Something for the presentation side
#[derive(Debug)]
pub enum EngineOutput {
    /// A decoded Notification Source event
    Notice(NotificationEvent),
    /// Attributes of a notification arrived
    Summary(NotificationSummary),
    /// A packet was dropped or a write failed; the engine keeps going
    Error(EngineError),
}

enum WriteOutcome {
    Done(Result<(), TransportError>),
    Panicked,
}

struct WriteDone {
    uid: u32,
    seq: u64,
    outcome: WriteOutcome,
}

pub struct Engine<C: ControlPoint> {
    dispatcher: Dispatcher,
    control_point: Arc<C>,
    writes: JoinSet<WriteDone>,
    output: mpsc::Sender<EngineOutput>,
}

impl<C: ControlPoint> Engine<C> {
    pub fn new(config: DispatcherConfig, control_point: Arc<C>, output: mpsc::Sender<EngineOutput>) -> Self {
        Self {
            dispatcher: Dispatcher::new(config),
            control_point,
            writes: JoinSet::new(),
            output,
        }
    }

    /// Process transport events until the channel closes, then wait for the
    /// writes still in flight.
    ///
    /// Returns the dispatcher so callers can inspect what was left pending.
    pub async fn run(mut self, mut events: mpsc::Receiver<TransportEvent>) -> Dispatcher {
        loop {
            tokio::select! {
                Some(done) = self.writes.join_next(), if !self.writes.is_empty() => {
                    self.on_write_done(done).await;
                }
                event = events.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => break,
                },
            }
        }

        while let Some(done) = self.writes.join_next().await {
            self.on_write_done(done).await;
        }

        self.dispatcher
    }

    async fn handle(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => self.dispatcher.on_connected(),
            TransportEvent::Disconnected => self.dispatcher.on_disconnected(),
            TransportEvent::NotificationSource(data) => {
                debug!(packet = %HEXLOWER.encode(&data), "ns");
                match self.dispatcher.on_notification_source(&data) {
                    Ok(outcome) => {
                        if let Some(request) = outcome.request {
                            self.spawn_write(request);
                        }
                        self.emit(EngineOutput::Notice(outcome.event)).await;
                    }
                    Err(e) => {
                        warn!(packet = %HEXLOWER.encode(&data), "dropped notification source packet: {e}");
                        self.emit(EngineOutput::Error(e.into())).await;
                    }
                }
            }
            TransportEvent::DataSource(data) => {
                debug!(packet = %HEXLOWER.encode(&data), "ds");
                match self.dispatcher.on_data_source(&data) {
                    Ok(summary) => self.emit(EngineOutput::Summary(summary)).await,
                    Err(e) => {
                        warn!(packet = %HEXLOWER.encode(&data), "dropped data source packet: {e}");
                        self.emit(EngineOutput::Error(e.into())).await;
                    }
                }
            }
        }
    }

    fn spawn_write(&mut self, request: OutgoingRequest) {
        let control_point = Arc::clone(&self.control_point);
        let OutgoingRequest { uid, seq, payload } = request;

        self.writes.spawn(async move {
            let outcome = match AssertUnwindSafe(async { control_point.write(payload).await })
                .catch_unwind()
                .await
            {
                Ok(result) => WriteOutcome::Done(result),
                Err(_) => WriteOutcome::Panicked,
            };
            WriteDone { uid, seq, outcome }
        });
    }

    async fn on_write_done(&mut self, done: Result<WriteDone, JoinError>) {
        let done = match done {
            Ok(done) => done,
            Err(e) => {
                // Only reachable if the task was cancelled; panics are caught inside it
                warn!("control point write task ended abnormally: {e}");
                return;
            }
        };

        let error = match done.outcome {
            WriteOutcome::Done(result) => self.dispatcher.on_write_complete(done.uid, done.seq, result).err(),
            WriteOutcome::Panicked => Some(self.dispatcher.on_write_panicked(done.uid, done.seq)),
        };

        if let Some(e) = error {
            warn!("{e}");
            self.emit(EngineOutput::Error(e)).await;
        }
    }

    async fn emit(&self, output: EngineOutput) {
        if self.output.send(output).await.is_err() {
            debug!("output receiver closed, dropping engine output");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct FakeControlPoint {
        writes: Mutex<Vec<Vec<u8>>>,
        fail: bool,
        panic: bool,
    }

    impl ControlPoint for FakeControlPoint {
        async fn write(&self, data: Vec<u8>) -> Result<(), TransportError> {
            if self.panic {
                panic!("control point exploded");
            }
            self.writes.lock().unwrap().push(data);
            if self.fail {
                Err(TransportError::Rejected("att error 0xA2".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn ns(kind: u8, uid: u32) -> TransportEvent {
        let mut packet = vec![kind, 0x00, 0x04, 0x01];
        packet.extend_from_slice(&uid.to_le_bytes());
        TransportEvent::NotificationSource(packet)
    }

    fn ds(uid: u32) -> TransportEvent {
        let mut data = uid.to_le_bytes().to_vec();
        data.extend_from_slice(&[0x01, 0x05, 0x00]);
        data.extend_from_slice(b"Hello");
        data.extend_from_slice(&[0x03, 0x03, 0x00]);
        data.extend_from_slice(b"Hi!");
        TransportEvent::DataSource(data)
    }

    async fn run_engine(
        control_point: Arc<FakeControlPoint>,
        events: Vec<TransportEvent>,
    ) -> (Dispatcher, Vec<EngineOutput>) {
        let (event_tx, event_rx) = mpsc::channel(16);
        let (output_tx, mut output_rx) = mpsc::channel(16);
        let engine = Engine::new(DispatcherConfig::default(), control_point, output_tx);
        let task = tokio::spawn(engine.run(event_rx));

        for event in events {
            event_tx.send(event).await.unwrap();
        }
        drop(event_tx);

        let dispatcher = task.await.unwrap();
        let mut outputs = Vec::new();
        while let Some(output) = output_rx.recv().await {
            outputs.push(output);
        }
        (dispatcher, outputs)
    }

    #[tokio::test]
    async fn test_added_then_response() {
        let control_point = Arc::new(FakeControlPoint::default());
        let (dispatcher, outputs) = run_engine(control_point.clone(), vec![ns(0, 7), ds(7)]).await;

        assert_eq!(control_point.writes.lock().unwrap().len(), 1);
        assert_eq!(control_point.writes.lock().unwrap()[0][1..5], [0x07u8, 0x00, 0x00, 0x00]);
        assert!(dispatcher.pending().is_empty());

        assert!(matches!(&outputs[0], EngineOutput::Notice(e) if e.uid == 7));
        let summary = outputs
            .iter()
            .find_map(|o| match o {
                EngineOutput::Summary(s) => Some(s),
                _ => None,
            })
            .unwrap();
        assert_eq!(summary.uid, 7);
        assert_eq!(summary.title.as_deref(), Some("Hello"));
        assert_eq!(summary.message.as_deref(), Some("Hi!"));
        assert_eq!(summary.app_id, None);
    }

    #[tokio::test]
    async fn test_added_stays_pending_without_response() {
        let control_point = Arc::new(FakeControlPoint::default());
        let (dispatcher, outputs) = run_engine(control_point.clone(), vec![ns(0, 7)]).await;

        assert_eq!(control_point.writes.lock().unwrap().len(), 1);
        assert!(dispatcher.pending().contains(7));
        assert_eq!(outputs.len(), 1);
    }

    #[tokio::test]
    async fn test_removed_then_late_response() {
        let control_point = Arc::new(FakeControlPoint::default());
        let (dispatcher, outputs) = run_engine(control_point, vec![ns(0, 7), ns(2, 7), ds(7)]).await;

        assert!(dispatcher.pending().is_empty());
        assert!(!outputs.iter().any(|o| matches!(o, EngineOutput::Error(_))));
    }

    #[tokio::test]
    async fn test_write_failure_is_reported_and_rolled_back() {
        let control_point = Arc::new(FakeControlPoint { fail: true, ..Default::default() });
        let (dispatcher, outputs) = run_engine(control_point, vec![ns(0, 7)]).await;

        assert!(dispatcher.pending().is_empty());
        assert!(outputs.iter().any(|o| matches!(o, EngineOutput::Error(EngineError::Write { uid: 7, .. }))));
    }

    #[tokio::test]
    async fn test_write_panic_is_observed() {
        let control_point = Arc::new(FakeControlPoint { panic: true, ..Default::default() });
        let (dispatcher, outputs) = run_engine(control_point, vec![ns(0, 3)]).await;

        assert!(dispatcher.pending().is_empty());
        assert!(outputs.iter().any(|o| matches!(o, EngineOutput::Error(EngineError::WriteTaskPanicked { uid: 3 }))));
    }

    #[tokio::test]
    async fn test_malformed_packets_do_not_stop_engine() {
        let control_point = Arc::new(FakeControlPoint::default());
        let events = vec![
            TransportEvent::NotificationSource(vec![0x00, 0x01]),
            TransportEvent::DataSource(vec![0x07]),
            ns(0, 9),
        ];
        let (dispatcher, outputs) = run_engine(control_point, events).await;

        assert!(matches!(outputs[0], EngineOutput::Error(EngineError::Protocol(_))));
        assert!(matches!(outputs[1], EngineOutput::Error(EngineError::Protocol(_))));
        assert!(dispatcher.pending().contains(9));
    }

    #[tokio::test]
    async fn test_disconnect_resets_pending() {
        let control_point = Arc::new(FakeControlPoint::default());
        let events = vec![ns(0, 1), ns(0, 2), TransportEvent::Disconnected];
        let (dispatcher, _) = run_engine(control_point, events).await;

        assert!(dispatcher.pending().is_empty());
    }
}
