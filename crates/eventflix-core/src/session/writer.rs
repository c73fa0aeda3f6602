use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::store::{keys, KeyValueStore};

/// Keys that survive a session clear
const PRESERVED_KEYS: &[&str] = &[keys::SELECTED_LANGUAGE];

pub(crate) enum WriteOp {
    Set { key: &'static str, value: String },
    ClearSession,
    Flush(oneshot::Sender<()>),
}

/// Applies session writes to the store in submission order.
///
/// Inside a Tokio runtime the writes are drained by one spawned task, and the
/// store is committed whenever the queue runs empty. Without a runtime they are
/// applied and committed inline on the caller.
pub(crate) struct Writer {
    store: Arc<dyn KeyValueStore>,
    tx: Option<mpsc::UnboundedSender<WriteOp>>,
}

impl Writer {
    pub(crate) fn start(store: Arc<dyn KeyValueStore>) -> Self {
        let tx = match Handle::try_current() {
            Ok(handle) => {
                let (tx, rx) = mpsc::unbounded_channel();
                handle.spawn(run(store.clone(), rx));
                Some(tx)
            }
            Err(_) => {
                debug!("No async runtime, session writes will be applied inline");
                None
            }
        };
        Self { store, tx }
    }

    /// Queue a write without waiting for it
    pub(crate) fn submit(&self, op: WriteOp) {
        let op = match &self.tx {
            Some(tx) => match tx.send(op) {
                Ok(()) => return,
                // Writer task is gone (runtime shut down); fall back to inline
                Err(mpsc::error::SendError(op)) => op,
            },
            None => op,
        };
        apply_inline(self.store.as_ref(), op);
    }

    /// Wait until every write submitted so far is committed
    pub(crate) async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        self.submit(WriteOp::Flush(ack));
        if done.await.is_err() {
            warn!("Session writer stopped before flush completed");
        }
    }
}

async fn run(store: Arc<dyn KeyValueStore>, mut rx: mpsc::UnboundedReceiver<WriteOp>) {
    while let Some(op) = rx.recv().await {
        match op {
            WriteOp::Flush(ack) => {
                commit(store.as_ref());
                let _ = ack.send(());
            }
            op => {
                apply(store.as_ref(), op);
                if rx.is_empty() {
                    commit(store.as_ref());
                }
            }
        }
    }
    commit(store.as_ref());
    debug!("Session writer stopped");
}

fn apply_inline(store: &dyn KeyValueStore, op: WriteOp) {
    match op {
        WriteOp::Flush(ack) => {
            commit(store);
            let _ = ack.send(());
        }
        op => {
            apply(store, op);
            commit(store);
        }
    }
}

fn apply(store: &dyn KeyValueStore, op: WriteOp) {
    let (target, result) = match &op {
        WriteOp::Set { key, value } => (*key, store.set(key, value)),
        WriteOp::ClearSession => ("session", store.clear_except(PRESERVED_KEYS)),
        WriteOp::Flush(_) => return,
    };
    if let Err(e) = result {
        warn!(error = %e, key = target, "Failed to apply session write");
    }
}

fn commit(store: &dyn KeyValueStore) {
    if let Err(e) = store.commit() {
        warn!(error = %e, "Failed to commit session store");
    }
}
