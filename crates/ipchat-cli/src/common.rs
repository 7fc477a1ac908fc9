use crate::output::Output;
use ipchat_transport::CoreEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// Upper bound on waiting for in-flight connections to hand over their
/// events once the runtime is shut down.
const PRINTER_DRAIN: Duration = Duration::from_secs(10);

/// Resolves on Ctrl+C.
pub async fn ctrl_c() {
    let _ = tokio::signal::ctrl_c().await;
    eprintln!("\nCtrl+C received, shutting down...");
}

/// Spawn a background task that presents runtime events.
///
/// Outcomes are skipped here: senders render them from the dispatch
/// report, which also carries the payload. The task ends once every
/// sender of the channel is gone and the queue is empty.
pub fn spawn_event_printer(
    mut events: UnboundedReceiver<CoreEvent>,
    output: Arc<Output>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                CoreEvent::Inbound(inbound) => output.inbound(&inbound),
                CoreEvent::Malformed { source, error } => output.malformed(&source, &error),
                CoreEvent::Outcome { peer, outcome } => {
                    tracing::trace!("outcome for {peer}: {outcome}");
                }
            }
        }
    })
}

/// Wait for the printer to flush queued events.
///
/// Call after every sink holder (runtime handle, server) is dropped,
/// otherwise this waits out the full [`PRINTER_DRAIN`].
pub async fn finish_printer(printer: JoinHandle<()>) {
    let abort = printer.abort_handle();
    match tokio::time::timeout(PRINTER_DRAIN, printer).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("event printer ended abnormally: {e}"),
        Err(_) => {
            tracing::warn!("event printer still busy after {PRINTER_DRAIN:?}, dropping the rest");
            abort.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{Transcript, LOG_FILE};
    use ipchat_transport::{ChannelSink, EventSink, InboundEvent, PeerAddress};

    #[tokio::test]
    async fn queued_events_are_printed_before_exit() {
        let dir = tempfile::tempdir().unwrap();
        let output = Arc::new(Output::new(Some(Transcript::open(dir.path()).unwrap())));
        let (sink, events) = ChannelSink::channel();

        // Queue everything before the printer gets a chance to run.
        let source = PeerAddress::new("10.0.0.7", 12345);
        for text in ["first", "second", "third"] {
            sink.on_inbound_message(InboundEvent::new(source.clone(), 40000, text.into(), false));
        }
        let printer = spawn_event_printer(events, output);
        drop(sink);

        finish_printer(printer).await;

        let log = std::fs::read_to_string(dir.path().join(LOG_FILE)).unwrap();
        let lines: Vec<&str> = log.lines().map(|l| &l[11..]).collect();
        assert_eq!(
            lines,
            vec!["10.0.0.7 says: first", "10.0.0.7 says: second", "10.0.0.7 says: third"]
        );
    }
}
