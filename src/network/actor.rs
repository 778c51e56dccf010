//! Network actor - runs HTTP requests in the Tokio runtime
//!
//! One task per execution; executions share the engine's connection pool and
//! nothing else. Cancelling drops the in-flight future.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

use crate::interpolate::resolve;
use crate::messages::{NetworkCommand, NetworkResponse};
use crate::models::{RequestDefinition, VariableMap};
use crate::network::client::HttpEngine;

/// Network actor that processes execution commands
pub struct NetworkActor {
    engine: HttpEngine,
    response_tx: mpsc::UnboundedSender<NetworkResponse>,
    active_requests: JoinSet<u64>,
    cancel_handles: HashMap<u64, oneshot::Sender<()>>,
}

impl NetworkActor {
    pub fn new(engine: HttpEngine, response_tx: mpsc::UnboundedSender<NetworkResponse>) -> Self {
        NetworkActor {
            engine,
            response_tx,
            active_requests: JoinSet::new(),
            cancel_handles: HashMap::new(),
        }
    }

    /// Number of executions still tracked
    pub fn in_flight(&self) -> usize {
        self.cancel_handles.len()
    }

    /// Run the network actor message loop until `Shutdown` or the command
    /// channel closes. Pending executions are cancelled on the way out.
    pub async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<NetworkCommand>) {
        loop {
            tokio::select! {
                biased;

                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(NetworkCommand::Execute { id, request, variables }) => {
                            self.spawn_execution(id, request, variables);
                        }

                        Some(NetworkCommand::Cancel(id)) => {
                            if let Some(cancel_tx) = self.cancel_handles.remove(&id) {
                                tracing::info!(id, "Cancelling request");
                                let _ = cancel_tx.send(());
                            }
                        }

                        Some(NetworkCommand::Shutdown) | None => break,
                    }
                }

                Some(joined) = self.active_requests.join_next() => {
                    match joined {
                        // a newer execution may have reused the id
                        Ok(id) => {
                            if self.cancel_handles.get(&id).is_some_and(|tx| tx.is_closed()) {
                                self.cancel_handles.remove(&id);
                            }
                        }
                        Err(e) => tracing::error!(error = %e, "Execution task failed"),
                    }
                }
            }
        }

        for (_, cancel_tx) in self.cancel_handles.drain() {
            let _ = cancel_tx.send(());
        }
        while self.active_requests.join_next().await.is_some() {}
    }

    fn spawn_execution(&mut self, id: u64, request: RequestDefinition, variables: VariableMap) {
        let (cancel_tx, mut cancel_rx) = oneshot::channel();
        if self.cancel_handles.insert(id, cancel_tx).is_some() {
            tracing::warn!(id, "Superseding in-flight request with the same id");
        }

        let engine = self.engine.clone();
        let response_tx = self.response_tx.clone();

        self.active_requests.spawn(async move {
            let resolved = resolve(&request, &variables);
            tokio::select! {
                biased;

                _ = &mut cancel_rx => {
                    let _ = response_tx.send(NetworkResponse::Cancelled { id });
                }
                result = engine.execute(resolved) => {
                    let _ = response_tx.send(NetworkResponse::Completed { id, result });
                }
            }
            id
        });
    }
}
