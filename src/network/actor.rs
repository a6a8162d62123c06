//! Network actor - runs backend calls in the Tokio async runtime

use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::messages::{NetworkCommand, NetworkResponse};
use crate::network::client::ApiClient;

/// Network actor that executes API calls, one task per call
pub struct NetworkActor {
    client: ApiClient,
    response_tx: mpsc::UnboundedSender<NetworkResponse>,
    active_requests: JoinSet<()>,
}

impl NetworkActor {
    pub fn new(client: ApiClient, response_tx: mpsc::UnboundedSender<NetworkResponse>) -> Self {
        NetworkActor {
            client,
            response_tx,
            active_requests: JoinSet::new(),
        }
    }

    /// Run the network actor message loop
    pub async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<NetworkCommand>) {
        loop {
            tokio::select! {
                biased;

                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(NetworkCommand::Execute { id, call, credentials }) => {
                            let response_tx = self.response_tx.clone();
                            let client = self.client.clone();

                            self.active_requests.spawn(async move {
                                let what = call.describe();
                                tracing::info!(id, call = %what, "Executing request");
                                let start = Instant::now();
                                let result = client.execute(call, credentials.as_ref()).await;
                                let time_ms = start.elapsed().as_millis() as u64;
                                match &result {
                                    Ok(_) => tracing::info!(id, call = %what, time_ms, "Request completed"),
                                    Err(e) => tracing::warn!(id, call = %what, time_ms, status = ?e.status(), error = %e, "Request failed"),
                                }
                                let _ = response_tx.send(NetworkResponse { id, result, time_ms });
                            });
                        }

                        Some(NetworkCommand::Shutdown) => {
                            // In-flight calls are abandoned
                            self.active_requests.abort_all();
                            break;
                        }

                        None => break,
                    }
                }

                // Reap completed tasks
                Some(_result) = self.active_requests.join_next() => {}
            }
        }
    }
}
