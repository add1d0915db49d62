use std::time::Duration;

use anyhow::Context;
use mushio::batch::{MessageReader, Received};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::session::{Connector, Event, Link, LinkId};

/// Dials the MUSH over plain TCP telnet.
#[derive(Clone, Debug)]
pub struct TelnetConnector {
    host: String,
    batch_window: Duration,
}

impl TelnetConnector {
    pub fn new(host: String, batch_window: Duration) -> Self {
        Self { host, batch_window }
    }
}

impl Connector for TelnetConnector {
    fn connect(&self, link: LinkId, events: mpsc::Sender<Event>) -> Link {
        let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        tokio::spawn(link_task(
            self.host.clone(),
            self.batch_window,
            link,
            events,
            out_rx,
            cancel_rx,
        ));
        Link::new(link, out_tx, cancel_tx)
    }
}

async fn link_task(
    host: String,
    batch_window: Duration,
    link: LinkId,
    events: mpsc::Sender<Event>,
    outbound: mpsc::UnboundedReceiver<String>,
    cancel: oneshot::Receiver<()>,
) {
    let res = tokio::select! {
        res = run_link(&host, batch_window, link, &events, outbound) => res,
        // Fired or dropped: either way the session is done with this link.
        _ = cancel => {
            info!(link = %link, "link cancelled");
            return;
        }
    };

    if let Err(e) = res {
        let _ = events
            .send(Event::LinkError {
                link,
                error: format!("{e:#}"),
            })
            .await;
    }
}

async fn run_link(
    host: &str,
    batch_window: Duration,
    link: LinkId,
    events: &mpsc::Sender<Event>,
    mut outbound: mpsc::UnboundedReceiver<String>,
) -> anyhow::Result<()> {
    let stream = TcpStream::connect(host)
        .await
        .with_context(|| format!("connect {host}"))?;
    let _ = stream.set_nodelay(true);
    info!(link = %link, host = %host, "connected to mush");

    let (rd, mut wr) = stream.into_split();
    let mut reader = MessageReader::new(rd, batch_window);

    loop {
        tokio::select! {
            line = outbound.recv() => {
                let Some(line) = line else {
                    // Session dropped the link.
                    return Ok(());
                };
                debug!(link = %link, line = %redact_login(&line), "send");
                wr.write_all(line.as_bytes()).await.context("write")?;
                wr.write_all(b"\r\n").await.context("write")?;
            }
            got = reader.next() => {
                match got.context("read")? {
                    Some(Received::Message(text)) => {
                        debug!(link = %link, bytes = text.len(), "recv");
                        if events.send(Event::Message { link, text }).await.is_err() {
                            return Ok(());
                        }
                    }
                    Some(Received::Reply(b)) => {
                        wr.write_all(&b).await.context("write negotiation")?;
                    }
                    None => anyhow::bail!("connection closed by {host}"),
                }
            }
        }
    }
}

/// Keep passwords out of debug logs: `connect <name> <password>`.
fn redact_login(line: &str) -> std::borrow::Cow<'_, str> {
    let mut words = line.split_whitespace();
    match (words.next(), words.next()) {
        (Some(cmd), Some(name)) if cmd.eq_ignore_ascii_case("connect") => {
            format!("{cmd} {name} ***").into()
        }
        _ => line.into(),
    }
}
