use log::{debug, error, info};
use rand::Rng;
use thiserror::Error;

use crate::cadence::Cadence;
use crate::generator::EventGenerator;
use crate::shutdown::StopSignal;
use crate::sink::{EventSink, SinkError};

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("failed to serialize event: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to publish event on cycle {cycle}: {source}")]
    Publish {
        cycle: u64,
        #[source]
        source: SinkError,
    },

    #[error("{0}")]
    Close(#[source] SinkError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Connected, nothing sent yet.
    Idle,
    Running,
    /// Releasing the broker connection after a stop request.
    Draining,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub published: u64,
    pub state: LoopState,
}

/// Drives generate, serialize, publish, wait until a stop is requested or a
/// cycle fails.
pub struct PublisherLoop<R, S> {
    generator: EventGenerator<R>,
    sink: S,
    cadence: Cadence,
    stop: StopSignal,
    state: LoopState,
    published: u64,
}

impl<R, S> PublisherLoop<R, S>
where
    R: Rng,
    S: EventSink,
{
    pub fn new(generator: EventGenerator<R>, sink: S, cadence: Cadence, stop: StopSignal) -> Self {
        PublisherLoop {
            generator,
            sink,
            cadence,
            stop,
            state: LoopState::Idle,
            published: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Runs until stopped. The sink is closed exactly once on every exit path.
    pub async fn run(mut self) -> Result<RunSummary, PublishError> {
        enter(&mut self.state, LoopState::Running);
        let outcome = self.drive().await;

        let PublisherLoop {
            sink,
            mut state,
            published,
            ..
        } = self;

        match outcome {
            Ok(()) => {
                enter(&mut state, LoopState::Draining);
                let closed = sink.close();
                enter(&mut state, LoopState::Stopped);
                closed.map_err(PublishError::Close)?;
                Ok(RunSummary { published, state })
            }
            Err(err) => {
                if let Err(close_err) = sink.close() {
                    error!("Failed to close broker connection: {}", close_err);
                }
                enter(&mut state, LoopState::Stopped);
                Err(err)
            }
        }
    }

    async fn drive(&mut self) -> Result<(), PublishError> {
        let delay = self.cadence.delay();

        loop {
            if self.stop.is_requested() {
                info!("Stop requested, closing the producer");
                return Ok(());
            }

            let event = self.generator.next();
            let payload = event.to_payload().map_err(PublishError::Serialize)?;

            // A publish in progress is never interrupted by a stop request.
            let cycle = self.published + 1;
            self.sink
                .publish(&event.key(), &payload)
                .await
                .map_err(|source| PublishError::Publish { cycle, source })?;
            self.published = cycle;
            info!("Event sent: {}", event);

            tokio::select! {
                _ = self.stop.requested() => {
                    info!("Stop requested, closing the producer");
                    return Ok(());
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

fn enter(state: &mut LoopState, next: LoopState) {
    debug!("Publisher loop {:?} -> {:?}", state, next);
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::shutdown::{stop_channel, StopTrigger};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct Recorder {
        sent: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
        closes: Arc<AtomicUsize>,
    }

    impl Recorder {
        fn sent(&self) -> Vec<(String, Vec<u8>)> {
            self.sent.lock().unwrap().clone()
        }

        fn attempts(&self) -> usize {
            self.sent.lock().unwrap().len()
        }

        fn closes(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    struct FakeSink {
        recorder: Recorder,
        fail_on: Option<usize>,
        stop_after: Option<(usize, StopTrigger)>,
        fail_close: bool,
    }

    impl FakeSink {
        fn new(recorder: &Recorder) -> Self {
            FakeSink {
                recorder: recorder.clone(),
                fail_on: None,
                stop_after: None,
                fail_close: false,
            }
        }
    }

    impl EventSink for FakeSink {
        async fn publish(&mut self, key: &str, payload: &[u8]) -> Result<(), SinkError> {
            let attempt = {
                let mut sent = self.recorder.sent.lock().unwrap();
                sent.push((key.to_owned(), payload.to_vec()));
                sent.len()
            };

            if self.fail_on == Some(attempt) {
                return Err(SinkError::Rejected("broker unavailable".to_owned()));
            }
            if let Some((after, trigger)) = &self.stop_after {
                if *after == attempt {
                    trigger.fire();
                }
            }
            Ok(())
        }

        fn close(self) -> Result<(), SinkError> {
            self.recorder.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                return Err(SinkError::Rejected("close failed".to_owned()));
            }
            Ok(())
        }
    }

    fn publisher(sink: FakeSink, rate: i64, stop: StopSignal) -> PublisherLoop<StdRng, FakeSink> {
        PublisherLoop::new(
            EventGenerator::new(StdRng::seed_from_u64(1)),
            sink,
            Cadence::per_minute(rate).unwrap(),
            stop,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_delay_ends_the_loop() {
        let recorder = Recorder::default();
        let (trigger, stop) = stop_channel();
        let publisher = publisher(FakeSink::new(&recorder), 60, stop);
        assert_eq!(publisher.state(), LoopState::Idle);

        let handle = tokio::spawn(publisher.run());

        // Ticks at 0s, 1s and 2s; the stop lands in the wait before 3s.
        tokio::time::sleep(Duration::from_millis(2500)).await;
        trigger.fire();

        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.published, 3);
        assert_eq!(summary.state, LoopState::Stopped);
        assert_eq!(recorder.attempts(), 3);
        assert_eq!(recorder.closes(), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(recorder.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_does_not_wait_out_the_delay() {
        let recorder = Recorder::default();
        let (trigger, stop) = stop_channel();
        let handle = tokio::spawn(publisher(FakeSink::new(&recorder), 1, stop).run());

        tokio::time::sleep(Duration::from_secs(1)).await;
        let fired_at = tokio::time::Instant::now();
        trigger.fire();

        handle.await.unwrap().unwrap();
        assert!(fired_at.elapsed() < Duration::from_secs(1));
        assert_eq!(recorder.attempts(), 1);
        assert_eq!(recorder.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_requested_mid_publish_lets_the_publish_finish() {
        let recorder = Recorder::default();
        let (trigger, stop) = stop_channel();
        let mut sink = FakeSink::new(&recorder);
        sink.stop_after = Some((2, trigger));

        let summary = publisher(sink, 600, stop).run().await.unwrap();
        assert_eq!(summary.published, 2);
        assert_eq!(recorder.attempts(), 2);
        assert_eq!(recorder.closes(), 1);
    }

    #[tokio::test]
    async fn stop_before_start_publishes_nothing() {
        let recorder = Recorder::default();
        let (trigger, stop) = stop_channel();
        trigger.fire();

        let summary = publisher(FakeSink::new(&recorder), 60, stop).run().await.unwrap();
        assert_eq!(summary.published, 0);
        assert_eq!(summary.state, LoopState::Stopped);
        assert_eq!(recorder.attempts(), 0);
        assert_eq!(recorder.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn publish_failure_is_fatal() {
        let recorder = Recorder::default();
        let (_trigger, stop) = stop_channel();
        let mut sink = FakeSink::new(&recorder);
        sink.fail_on = Some(3);

        let err = publisher(sink, 120, stop).run().await.unwrap_err();
        assert!(matches!(
            err,
            PublishError::Publish {
                cycle: 3,
                source: SinkError::Rejected(_)
            }
        ));
        assert_eq!(recorder.attempts(), 3);
        assert_eq!(recorder.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn close_failure_after_publish_failure_keeps_the_publish_error() {
        let recorder = Recorder::default();
        let (_trigger, stop) = stop_channel();
        let mut sink = FakeSink::new(&recorder);
        sink.fail_on = Some(1);
        sink.fail_close = true;

        let err = publisher(sink, 60, stop).run().await.unwrap_err();
        assert!(matches!(err, PublishError::Publish { cycle: 1, .. }));
        assert_eq!(recorder.closes(), 1);
    }

    #[tokio::test]
    async fn close_failure_on_shutdown_is_reported() {
        let recorder = Recorder::default();
        let (trigger, stop) = stop_channel();
        trigger.fire();
        let mut sink = FakeSink::new(&recorder);
        sink.fail_close = true;

        let err = publisher(sink, 60, stop).run().await.unwrap_err();
        assert!(matches!(err, PublishError::Close(SinkError::Rejected(_))));
        assert_eq!(recorder.closes(), 1);
    }

    #[tokio::test]
    async fn dropped_trigger_stops_the_loop() {
        let recorder = Recorder::default();
        let (trigger, stop) = stop_channel();
        drop(trigger);

        let summary = publisher(FakeSink::new(&recorder), 60, stop).run().await.unwrap();
        assert_eq!(summary.published, 0);
        assert_eq!(recorder.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn messages_are_keyed_by_user_id() {
        let recorder = Recorder::default();
        let (trigger, stop) = stop_channel();
        let mut sink = FakeSink::new(&recorder);
        sink.stop_after = Some((20, trigger));

        publisher(sink, 6000, stop).run().await.unwrap();

        let sent = recorder.sent();
        assert_eq!(sent.len(), 20);
        for (key, payload) in sent {
            let event = Event::from_payload(&payload).unwrap();
            assert_eq!(key, event.user_id.to_string());
        }
    }
}
