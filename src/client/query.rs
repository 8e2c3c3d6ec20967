//! Winner-query loop
//!
//! After submission finishes the client repeatedly asks the service for the
//! draw results. A RespuestaWait response means the draw is still running:
//! the client sleeps out the current backoff delay, doubles it, and asks
//! again over a fresh connection. A RespuestaWinner response is final. Any
//! other response type, and any I/O failure, ends the run without retry.

use super::{cancelled, read_message_cancellable, Client, ClientOutcome};
use crate::{parse_winners, Message, MessageType, ProtocolError, Result};
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, error, info};

/// Doubling backoff. No upper bound: the delay keeps growing for as long
/// as the service keeps answering RespuestaWait.
#[derive(Debug, Clone)]
pub struct Backoff {
    delay: Duration,
}

impl Backoff {
    pub fn new(initial: Duration) -> Self {
        Self { delay: initial }
    }

    /// The delay to sleep now; the next one will be twice as long.
    pub fn next_delay(&mut self) -> Duration {
        let current = self.delay;
        self.delay *= 2;
        current
    }
}

impl Client {
    /// Poll the service until it reports the draw results.
    pub(super) async fn query_winners(
        &self,
        cancel: &mut tokio::sync::watch::Receiver<bool>,
    ) -> Result<ClientOutcome> {
        let mut backoff = Backoff::new(self.config.backoff_initial);

        loop {
            if *cancel.borrow() {
                info!("Cancelled before the winner query, stopping");
                return Ok(ClientOutcome::Cancelled);
            }

            let mut stream = TcpStream::connect(&self.config.server_address)
                .await
                .map_err(|e| {
                    error!(
                        "Failed to connect for the winner query to {}: {}",
                        self.config.server_address, e
                    );
                    ProtocolError::Transport(e)
                })?;

            Message::consulta(&self.config.agency_id)
                .write(&mut stream)
                .await?;
            debug!("Consulta sent for agency {}", self.config.agency_id);

            let response = match read_message_cancellable(stream, cancel).await {
                Ok(response) => response,
                Err(ProtocolError::Cancelled) => {
                    info!("Cancelled while waiting for the winner response, stopping");
                    return Ok(ClientOutcome::Cancelled);
                }
                Err(e) => {
                    error!("Failed to read the winner response: {}", e);
                    return Err(e);
                }
            };

            match MessageType::try_from(response.msg_type) {
                Ok(MessageType::RespuestaWinner) => {
                    let winners = parse_winners(&response.payload)?;
                    info!(
                        "Draw finished: {} winners for agency {}",
                        winners.len(),
                        self.config.agency_id
                    );
                    return Ok(ClientOutcome::Winners(winners));
                }
                Ok(MessageType::RespuestaWait) => {
                    let delay = backoff.next_delay();
                    debug!("Draw still running, asking again in {:?}", delay);
                    tokio::select! {
                        _ = cancelled(cancel) => {
                            info!("Cancelled during the query backoff, stopping");
                            return Ok(ClientOutcome::Cancelled);
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                _ => {
                    error!(
                        "Unexpected response type {} to the winner query",
                        response.msg_type
                    );
                    return Err(ProtocolError::UnexpectedMessage(response.msg_type));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_delays_strictly_double() {
        let mut backoff = Backoff::new(Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(4));
        assert_eq!(backoff.next_delay(), Duration::from_secs(8));
        assert_eq!(backoff.next_delay(), Duration::from_secs(16));
    }

    #[test]
    fn backoff_growth_is_unbounded() {
        let mut backoff = Backoff::new(Duration::from_secs(2));
        for _ in 0..20 {
            backoff.next_delay();
        }
        assert_eq!(backoff.next_delay(), Duration::from_secs(2 << 20));
    }
}
