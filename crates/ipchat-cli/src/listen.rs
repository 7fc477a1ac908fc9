use crate::common::{ctrl_c, finish_printer, spawn_event_printer};
use crate::events::{emit, EventStarted, EventSummary};
use crate::output::Output;
use ipchat_protocol::RuntimeChannels;
use std::sync::Arc;

/// Receive only: print every inbound message until Ctrl+C.
pub async fn run(channels: RuntimeChannels, name: &str, output: Arc<Output>) -> anyhow::Result<()> {
    let RuntimeChannels { handle, events } = channels;
    let local = handle.local_addr();

    emit(&EventStarted::new(name, "listen", Some(local.to_string())));
    eprintln!("Listening as {name} on {local}");
    eprintln!("Press Ctrl+C to stop.\n");

    let printer = spawn_event_printer(events, output.clone());
    ctrl_c().await;

    handle.shutdown().await;
    let server_stats = handle.server_stats();
    // Last sink holder; the printer drains and exits once it is gone.
    drop(handle);
    finish_printer(printer).await;

    let stats = server_stats.snapshot();
    eprintln!("\n{name}: received {} messages ({} malformed).", stats.received, stats.malformed);
    emit(&EventSummary {
        event: "summary",
        mode: "listen".into(),
        delivery: None,
        server: Some(stats),
        elapsed_s: output.elapsed_s(),
    });
    Ok(())
}
