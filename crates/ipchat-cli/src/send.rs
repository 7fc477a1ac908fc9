use crate::events::{emit, EventStarted, EventSummary};
use crate::output::Output;
use ipchat_protocol::{Dispatcher, GroupRoster, TcpTransport};
use ipchat_transport::{NullSink, OutboundMessage, TransportConfig};
use std::sync::Arc;

/// One-shot send (text or file) to an address or `group:<name>`.
///
/// No listener is bound, so this works next to a running `listen`.
pub async fn run(
    config: TransportConfig,
    roster: Arc<dyn GroupRoster>,
    output: &Output,
    target: &str,
    message: OutboundMessage,
) -> anyhow::Result<()> {
    let mode = if message.is_file() { "send-file" } else { "send" };
    emit(&EventStarted::new(&message.sender_name, mode, None));

    let port = config.port();
    let dispatcher = Dispatcher::new(Arc::new(TcpTransport::new(config)), roster, Arc::new(NullSink));
    let report = dispatcher.dispatch_str(target, port, &message).await?;

    if report.is_empty() {
        eprintln!("{target} has no members, nothing sent.");
    }
    output.report(&report, &message);

    emit(&EventSummary {
        event: "summary",
        mode: mode.into(),
        delivery: Some(dispatcher.stats().snapshot()),
        server: None,
        elapsed_s: output.elapsed_s(),
    });
    Ok(())
}
