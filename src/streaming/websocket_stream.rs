//! WebSocket log subscription for real-time program events
//!
//! Uses the node's native `logsSubscribe` through `solana-client`'s
//! `PubsubClient`, filtered to transactions that mention the program.

use super::{forward_logs, EventFilter};
use crate::curve::PumpEvent;
use crate::errors::EngineError;
use futures_util::StreamExt;
use solana_client::nonblocking::pubsub_client::PubsubClient;
use solana_client::rpc_config::{RpcTransactionLogsConfig, RpcTransactionLogsFilter};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Log subscription to one program
pub struct LogStream {
    ws_url: String,
    program_id: Pubkey,
    commitment: CommitmentConfig,
}

impl LogStream {
    pub fn new(ws_url: String, program_id: Pubkey, commitment: CommitmentConfig) -> Self {
        Self {
            ws_url,
            program_id,
            commitment,
        }
    }

    /// Connect to the WebSocket endpoint
    pub async fn connect(&self) -> Result<Arc<PubsubClient>, EngineError> {
        info!(url = %self.ws_url, "Connecting to WebSocket");
        let client = PubsubClient::new(&self.ws_url)
            .await
            .map_err(|e| EngineError::transport(format!("websocket {}: {}", self.ws_url, e)))?;
        debug!(url = %self.ws_url, "WebSocket connected");
        Ok(Arc::new(client))
    }

    /// Spawn the forwarding task
    ///
    /// Returns once the node acknowledged the subscription. The task ends on
    /// `cancel`, when the receiver is dropped, or when the node closes the
    /// stream, and always sends the websocket unsubscribe before exiting.
    pub async fn spawn(
        self,
        client: Arc<PubsubClient>,
        filter: EventFilter,
        tx: mpsc::UnboundedSender<PumpEvent>,
        mut cancel: oneshot::Receiver<()>,
    ) -> Result<JoinHandle<()>, EngineError> {
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), EngineError>>();
        let program_id = self.program_id;
        let commitment = self.commitment;

        let task = tokio::spawn(async move {
            // The stream borrows the client, which lives in this task
            let (mut notifications, unsubscribe) = match client
                .logs_subscribe(
                    RpcTransactionLogsFilter::Mentions(vec![program_id.to_string()]),
                    RpcTransactionLogsConfig {
                        commitment: Some(commitment),
                    },
                )
                .await
            {
                Ok(subscription) => {
                    let _ = ready_tx.send(Ok(()));
                    subscription
                }
                Err(e) => {
                    error!(program = %program_id, error = %e, "Failed to subscribe to program logs");
                    let _ = ready_tx.send(Err(EngineError::transport(e.to_string())));
                    return;
                }
            };

            loop {
                tokio::select! {
                    _ = &mut cancel => {
                        debug!(program = %program_id, "Log subscription cancelled");
                        break;
                    }
                    notification = notifications.next() => match notification {
                        Some(response) => {
                            // Reverted transactions emitted nothing durable
                            if response.value.err.is_some() {
                                continue;
                            }
                            if !forward_logs(&filter, &response.value.logs, &tx) {
                                warn!(program = %program_id, "Receiver dropped, unsubscribing");
                                break;
                            }
                        }
                        None => {
                            warn!(program = %program_id, "Log stream closed by node");
                            break;
                        }
                    }
                }
            }
            unsubscribe().await;
        });

        match ready_rx.await {
            Ok(Ok(())) => Ok(task),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(EngineError::transport("log subscription task ended before subscribing")),
        }
    }
}
