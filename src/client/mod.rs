//! Submission client
//!
//! Drives the full client run: assemble batches from the record source,
//! send each one over a fresh connection, wait out the inter-batch period,
//! and once the source is exhausted poll the service for winner results.
//! Cancellation is cooperative, checked before each send and raced against
//! every sleep and every in-flight response read.

pub mod query;

pub use query::*;

use crate::{
    next_batch, Batch, BatchLimits, Message, Packet, ProtocolError, Result,
};
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info};

/// Client configuration
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ClientConfig {
    /// Agency identifier, sent with every batch and consulta
    pub agency_id: String,
    /// Address of the aggregation service
    pub server_address: String,
    /// Pause between consecutive batch sends
    pub loop_period: Duration,
    /// Maximum records per batch
    pub batch_max_amount: usize,
    /// First delay of the winner-query backoff
    pub backoff_initial: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            agency_id: "0".to_string(),
            server_address: "127.0.0.1:12345".to_string(),
            loop_period: Duration::from_secs(1),
            batch_max_amount: 100,
            backoff_initial: Duration::from_secs(2),
        }
    }
}

/// How a client run ended, cancellation included. Cancellation is a clean
/// stop, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientOutcome {
    /// The draw finished; these are the winning documents for the agency.
    Winners(Vec<u32>),
    /// The cancellation signal fired before the run completed.
    Cancelled,
}

/// One submission client. Opens exactly one connection at a time and tears
/// it down after each exchange.
pub struct Client {
    config: ClientConfig,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Run the whole client: submission phase, then winner query.
    pub async fn run<I>(
        &self,
        lines: &mut I,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<ClientOutcome>
    where
        I: Iterator<Item = io::Result<String>>,
    {
        let limits = BatchLimits {
            max_amount: self.config.batch_max_amount,
            ..BatchLimits::default()
        };
        let mut leftover = None;

        loop {
            if *cancel.borrow() {
                info!("Cancelled before batch assembly, stopping");
                return Ok(ClientOutcome::Cancelled);
            }

            let batch = next_batch(lines, &self.config.agency_id, &limits, &mut leftover)?;
            if batch.is_empty() {
                info!("No more bets to send, submission finished");
                break;
            }

            match self.send_batch(&batch, cancel).await? {
                ClientStep::Continue => {}
                ClientStep::Cancelled => return Ok(ClientOutcome::Cancelled),
            }

            // Inter-batch pause, abandoned as soon as cancellation fires
            tokio::select! {
                _ = cancelled(cancel) => {
                    info!("Cancelled during the inter-batch pause, stopping");
                    return Ok(ClientOutcome::Cancelled);
                }
                _ = tokio::time::sleep(self.config.loop_period) => {}
            }
        }

        self.query_winners(cancel).await
    }

    /// Send one batch over a fresh connection and wait for the ack packet.
    async fn send_batch(
        &self,
        batch: &Batch,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<ClientStep> {
        let mut stream = TcpStream::connect(&self.config.server_address)
            .await
            .map_err(|e| {
                error!("Failed to connect to {}: {}", self.config.server_address, e);
                ProtocolError::Transport(e)
            })?;

        batch.to_message().write(&mut stream).await.map_err(|e| {
            error!("Failed to send batch of {} bets: {}", batch.count, e);
            e
        })?;
        debug!(
            "Batch sent: {} bets, {} payload bytes",
            batch.count,
            batch.payload.len()
        );

        match read_ack_cancellable(stream, cancel).await {
            Ok(ack) => {
                info!(
                    "Batch of {} bets acknowledged ({} ack bytes)",
                    batch.count,
                    ack.data.len()
                );
                Ok(ClientStep::Continue)
            }
            Err(ProtocolError::Cancelled) => {
                info!("Cancelled while waiting for the batch ack, stopping");
                Ok(ClientStep::Cancelled)
            }
            Err(e) => {
                error!("Failed to read batch ack: {}", e);
                Err(e)
            }
        }
    }
}

enum ClientStep {
    Continue,
    Cancelled,
}

/// Resolves once cancellation has been requested. A dropped sender counts
/// as a stop request.
pub(crate) async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    while !*cancel.borrow() {
        if cancel.changed().await.is_err() {
            return;
        }
    }
}

/// Read the ack packet for a batch on a task of its own, racing the result
/// against cancellation. The connection moves into the task; on
/// cancellation the task is abandoned and the connection drops with it,
/// so the caller never blocks on an in-flight read.
async fn read_ack_cancellable(
    stream: TcpStream,
    cancel: &mut watch::Receiver<bool>,
) -> Result<Packet> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let mut stream = stream;
        let result = Packet::read(&mut stream).await;
        let _ = tx.send(result);
    });
    race_cancel(rx, cancel).await
}

/// Same race for a message envelope response.
pub(crate) async fn read_message_cancellable(
    stream: TcpStream,
    cancel: &mut watch::Receiver<bool>,
) -> Result<Message> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let mut stream = stream;
        let result = Message::read(&mut stream).await;
        let _ = tx.send(result);
    });
    race_cancel(rx, cancel).await
}

async fn race_cancel<T>(
    rx: oneshot::Receiver<Result<T>>,
    cancel: &mut watch::Receiver<bool>,
) -> Result<T> {
    tokio::select! {
        _ = cancelled(cancel) => Err(ProtocolError::Cancelled),
        result = rx => result.unwrap_or_else(|_| {
            Err(ProtocolError::Transport(io::Error::new(
                io::ErrorKind::Other,
                "reader task exited without a result",
            )))
        }),
    }
}
