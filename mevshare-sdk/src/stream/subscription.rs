//! Subscription handle and the background read loop it controls.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{Event, EventSender, LineSource, StreamError};
use crate::codec;

/// Lifecycle of a subscription's engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Reading and delivering events.
    Running,
    /// The stream ended or failed; the final error is being handed off.
    Draining,
    /// The line source and the event channel have been released.
    Closed,
}

/// Handle to a running subscription.
///
/// Dropping the handle does not stop the engine; it keeps delivering until
/// the stream ends or the receiver is dropped. Call [`stop`](Self::stop) to
/// end it early.
#[derive(Debug)]
pub struct Subscription {
    stop_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<SubscriptionState>,
}

impl Subscription {
    /// Start the engine on a new tokio task.
    ///
    /// The engine takes ownership of both `source` and `events`. It is the
    /// only writer to the channel and closes it by dropping `events` when it
    /// terminates.
    pub fn spawn<S>(source: S, events: EventSender) -> Self
    where
        S: LineSource + 'static,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(SubscriptionState::Running);

        let engine = Engine {
            source,
            events,
            stop_rx,
            state_tx,
        };
        tokio::spawn(engine.run());

        Self { stop_tx, state_rx }
    }

    /// Ask the engine to stop.
    ///
    /// Returns immediately. The engine closes the event channel once it
    /// observes the request; keep receiving until `recv()` returns `None`.
    /// Calling this more than once, or after the engine has closed, does
    /// nothing.
    pub fn stop(&self) {
        let first = self.stop_tx.send_if_modified(|stopped| {
            if *stopped {
                false
            } else {
                *stopped = true;
                true
            }
        });
        if first {
            debug!("Subscription stop requested");
        }
    }

    /// Current engine state.
    pub fn state(&self) -> SubscriptionState {
        *self.state_rx.borrow()
    }

    /// Wait until the engine has released its resources.
    pub async fn closed(&self) {
        let mut state_rx = self.state_rx.clone();
        // `Closed` is published after the source and the event sender are
        // dropped. A closed state channel also means the engine is gone.
        let _ = state_rx
            .wait_for(|state| *state == SubscriptionState::Closed)
            .await;
    }
}

/// Why the engine stopped. Only used for logging.
#[derive(Debug)]
enum CloseReason {
    Stopped,
    ReceiverDropped,
    StreamEnded,
}

/// The read loop. Owns everything it touches; dropping it at the end of
/// [`run`](Engine::run) is what releases the stream and closes the channel.
struct Engine<S> {
    source: S,
    events: EventSender,
    stop_rx: watch::Receiver<bool>,
    state_tx: watch::Sender<SubscriptionState>,
}

impl<S: LineSource> Engine<S> {
    async fn run(mut self) {
        debug!("Subscription engine started");

        let reason = loop {
            // Stop is polled first so that a pending request always wins
            // over a line that happens to be ready.
            let line = tokio::select! {
                biased;
                _ = stop_requested(&mut self.stop_rx) => break CloseReason::Stopped,
                line = self.source.next_line() => line,
            };

            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => break self.drain(StreamError::EndOfStream).await,
                Err(e) => break self.drain(e).await,
            };

            if codec::is_noise(&line) {
                continue;
            }

            let event = codec::decode_frame(&line).map_err(StreamError::from);
            if let Err(e) = &event {
                debug!(error = %e, "Failed to decode event frame");
            }

            if let Err(reason) = self.deliver(event).await {
                break reason;
            }
        };

        self.close(reason);
    }

    /// Hand one event to the consumer.
    ///
    /// Blocks while the channel slot is occupied. A stop request that is
    /// already pending, or that arrives while blocked, wins and the event is
    /// dropped.
    async fn deliver(&mut self, event: Event) -> Result<(), CloseReason> {
        tokio::select! {
            biased;
            _ = stop_requested(&mut self.stop_rx) => {
                debug!("Dropping in-flight event, subscription is stopping");
                Err(CloseReason::Stopped)
            }
            sent = self.events.send(event) => sent.map_err(|_| CloseReason::ReceiverDropped),
        }
    }

    /// Deliver the terminal error that ends the stream.
    async fn drain(&mut self, error: StreamError) -> CloseReason {
        self.state_tx.send_replace(SubscriptionState::Draining);
        match &error {
            StreamError::EndOfStream => info!("Event stream ended by server"),
            e => warn!(error = %e, "Event stream failed"),
        }

        match self.deliver(Err(error)).await {
            Ok(()) => CloseReason::StreamEnded,
            Err(reason) => reason,
        }
    }

    fn close(self, reason: CloseReason) {
        let Engine {
            source,
            events,
            stop_rx,
            state_tx,
        } = self;

        drop(source);
        drop(events);
        drop(stop_rx);

        state_tx.send_replace(SubscriptionState::Closed);
        info!(reason = ?reason, "Subscription closed");
    }
}

/// Resolves once a stop has been requested.
///
/// Never resolves if the handle was dropped without stopping; the engine then
/// runs until the stream or the consumer goes away.
async fn stop_requested(stop_rx: &mut watch::Receiver<bool>) {
    let observed = stop_rx.wait_for(|stopped| *stopped).await.map(|_| ());
    if observed.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_frame;
    use crate::objects::MatchMakerEvent;
    use crate::stream::{EventReceiver, event_channel};
    use alloy_primitives::B256;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, duplex};
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    fn frame(byte: u8) -> String {
        let event = MatchMakerEvent {
            hash: B256::repeat_byte(byte),
            logs: vec![],
            txs: vec![],
            mev_gas_price: None,
            gas_used: None,
        };
        encode_frame(&event).unwrap()
    }

    /// Spawn an engine over a fixed in-memory stream.
    fn spawn_static(body: String) -> (Subscription, EventReceiver) {
        let body: &'static [u8] = Box::leak(body.into_bytes().into_boxed_slice());
        let (tx, rx) = event_channel();
        (Subscription::spawn(body.lines(), tx), rx)
    }

    /// Spawn an engine over a pipe the test writes into.
    fn spawn_pipe() -> (Subscription, EventReceiver, DuplexStream) {
        let (reader, writer) = duplex(4096);
        let (tx, rx) = event_channel();
        let sub = Subscription::spawn(BufReader::new(reader).lines(), tx);
        (sub, rx, writer)
    }

    async fn recv(rx: &mut EventReceiver) -> Option<Event> {
        timeout(WAIT, rx.recv()).await.expect("timed out waiting for event")
    }

    #[tokio::test]
    async fn test_keep_alives_and_blank_lines_are_skipped() {
        let body = format!(
            ":ping\n{}\n\n:ping\n{}\n\n{}\n:ping\n",
            frame(1),
            frame(2),
            frame(3)
        );
        let (_sub, mut rx) = spawn_static(body);

        for byte in 1..=3 {
            let event = recv(&mut rx).await.unwrap().unwrap();
            assert_eq!(event.hash, B256::repeat_byte(byte));
        }

        let last = recv(&mut rx).await.unwrap();
        assert!(matches!(last, Err(StreamError::EndOfStream)));
        assert!(recv(&mut rx).await.is_none());
    }

    #[tokio::test]
    async fn test_end_of_stream_is_delivered_once_then_closed() {
        let (sub, mut rx) = spawn_static(String::new());

        let last = recv(&mut rx).await.unwrap();
        let error = last.unwrap_err();
        assert!(error.is_terminal());
        assert!(matches!(error, StreamError::EndOfStream));

        assert!(recv(&mut rx).await.is_none());
        assert!(recv(&mut rx).await.is_none());

        timeout(WAIT, sub.closed()).await.unwrap();
        assert_eq!(sub.state(), SubscriptionState::Closed);
    }

    #[tokio::test]
    async fn test_decode_error_does_not_end_stream() {
        let body = format!("data: {{broken\n{}\n", frame(7));
        let (_sub, mut rx) = spawn_static(body);

        let first = recv(&mut rx).await.unwrap().unwrap_err();
        assert!(matches!(first, StreamError::Decode(_)));
        assert!(!first.is_terminal());

        let second = recv(&mut rx).await.unwrap().unwrap();
        assert_eq!(second.hash, B256::repeat_byte(7));

        assert!(matches!(
            recv(&mut rx).await.unwrap(),
            Err(StreamError::EndOfStream)
        ));
        assert!(recv(&mut rx).await.is_none());
    }

    #[tokio::test]
    async fn test_read_error_is_terminal() {
        // Invalid UTF-8 makes tokio's line reader fail.
        let body: &'static [u8] = b"\xff\xfe\n";
        let (tx, mut rx) = event_channel();
        let _sub = Subscription::spawn(body.lines(), tx);

        let error = recv(&mut rx).await.unwrap().unwrap_err();
        assert!(matches!(error, StreamError::Io(_)));
        assert!(error.is_terminal());
        assert!(recv(&mut rx).await.is_none());
    }

    #[tokio::test]
    async fn test_stop_while_waiting_for_line() {
        let (sub, mut rx, mut writer) = spawn_pipe();

        writer.write_all(format!("{}\n", frame(1)).as_bytes()).await.unwrap();
        let first = recv(&mut rx).await.unwrap().unwrap();
        assert_eq!(first.hash, B256::repeat_byte(1));

        // The engine is now parked in the line read with nothing to read.
        sub.stop();
        timeout(WAIT, sub.closed()).await.unwrap();

        // A line arriving after the stop is never delivered.
        let _ = writer.write_all(format!("{}\n", frame(2)).as_bytes()).await;
        assert!(recv(&mut rx).await.is_none());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (sub, mut rx, _writer) = spawn_pipe();

        sub.stop();
        sub.stop();
        assert!(recv(&mut rx).await.is_none());

        timeout(WAIT, sub.closed()).await.unwrap();
        sub.stop();
        assert_eq!(sub.state(), SubscriptionState::Closed);
    }

    #[tokio::test]
    async fn test_stop_after_stream_closed() {
        let (sub, mut rx) = spawn_static(frame(1) + "\n");

        assert!(recv(&mut rx).await.unwrap().is_ok());
        assert!(recv(&mut rx).await.unwrap().is_err());
        assert!(recv(&mut rx).await.is_none());

        sub.stop();
        sub.stop();
        timeout(WAIT, sub.closed()).await.unwrap();
    }

    /// Wait until the engine has put an event in the channel slot.
    async fn wait_for_slot(rx: &EventReceiver) {
        timeout(WAIT, async {
            while rx.is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("timed out waiting for the channel slot");
    }

    #[tokio::test]
    async fn test_stop_unblocks_pending_handoff() {
        let (sub, mut rx, mut writer) = spawn_pipe();

        let body = format!("{}\n{}\n{}\n", frame(1), frame(2), frame(3));
        writer.write_all(body.as_bytes()).await.unwrap();

        // Taking the first event lets the second into the slot; the third is
        // then held by the engine in the handoff.
        let first = recv(&mut rx).await.unwrap().unwrap();
        assert_eq!(first.hash, B256::repeat_byte(1));
        wait_for_slot(&rx).await;

        sub.stop();
        timeout(WAIT, sub.closed()).await.unwrap();

        let second = recv(&mut rx).await.unwrap().unwrap();
        assert_eq!(second.hash, B256::repeat_byte(2));
        assert!(recv(&mut rx).await.is_none());
    }

    #[tokio::test]
    async fn test_stop_drops_pending_decode_error() {
        let (sub, mut rx, mut writer) = spawn_pipe();

        let body = format!("{}\n{}\ndata: {{broken\n", frame(1), frame(2));
        writer.write_all(body.as_bytes()).await.unwrap();

        let first = recv(&mut rx).await.unwrap().unwrap();
        assert_eq!(first.hash, B256::repeat_byte(1));
        wait_for_slot(&rx).await;

        sub.stop();
        timeout(WAIT, sub.closed()).await.unwrap();

        let mut rest = Vec::new();
        while let Some(event) = recv(&mut rx).await {
            rest.push(event);
        }
        assert_eq!(rest.len(), 1);
        assert!(!rest.iter().any(|e| matches!(e, Err(StreamError::Decode(_)))));
        assert_eq!(rest[0].as_ref().unwrap().hash, B256::repeat_byte(2));
    }

    #[tokio::test]
    async fn test_dropped_receiver_closes_engine() {
        let (sub, rx, mut writer) = spawn_pipe();
        drop(rx);

        let _ = writer.write_all(format!("{}\n", frame(1)).as_bytes()).await;
        timeout(WAIT, sub.closed()).await.unwrap();
        assert_eq!(sub.state(), SubscriptionState::Closed);
    }

    #[tokio::test]
    async fn test_closing_releases_source() {
        let (sub, mut rx, mut writer) = spawn_pipe();

        sub.stop();
        assert!(recv(&mut rx).await.is_none());
        timeout(WAIT, sub.closed()).await.unwrap();

        // The read half was dropped with the engine.
        let result = writer.write_all(b"late\n").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_dropped_handle_keeps_delivering() {
        let (sub, mut rx, mut writer) = spawn_pipe();
        drop(sub);

        writer.write_all(format!("{}\n", frame(9)).as_bytes()).await.unwrap();
        let event = recv(&mut rx).await.unwrap().unwrap();
        assert_eq!(event.hash, B256::repeat_byte(9));

        drop(writer);
        assert!(matches!(
            recv(&mut rx).await.unwrap(),
            Err(StreamError::EndOfStream)
        ));
        assert!(recv(&mut rx).await.is_none());
    }
}
