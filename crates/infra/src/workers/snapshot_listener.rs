use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::warn;

use licensedesk_events::Subscription;

const TICK: Duration = Duration::from_millis(50);

/// Handle to stop and join a listener thread.
///
/// Dropping the handle also stops the listener.
#[derive(Debug)]
pub struct ListenerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    /// Cancel the subscription and wait for the listener to stop.
    ///
    /// Once this returns the callback will not run again.
    pub fn shutdown(self) {
        drop(self);
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map(|j| j.is_finished()).unwrap_or(true)
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            // Shutting down from inside the callback cannot join itself.
            if j.thread().id() != thread::current().id() {
                let _ = j.join();
            }
        }
    }
}

/// Callback-style consumer of a snapshot subscription.
///
/// - Runs the callback on a dedicated thread, once per snapshot
/// - Callback failures are logged and do not stop the listener
/// - The subscription is cancelled when the listener stops
#[derive(Debug)]
pub struct SnapshotListener;

impl SnapshotListener {
    pub fn spawn<M, H, E>(
        name: &'static str,
        subscription: Subscription<M>,
        mut handler: H,
    ) -> std::io::Result<ListenerHandle>
    where
        M: Send + 'static,
        H: FnMut(M) -> Result<(), E> + Send + 'static,
        E: core::fmt::Debug + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || listen(name, subscription, shutdown_rx, &mut handler))?;

        Ok(ListenerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn listen<M, H, E>(
    name: &'static str,
    subscription: Subscription<M>,
    shutdown_rx: mpsc::Receiver<()>,
    handler: &mut H,
) where
    H: FnMut(M) -> Result<(), E>,
    E: core::fmt::Debug,
{
    loop {
        if !matches!(shutdown_rx.try_recv(), Err(mpsc::TryRecvError::Empty)) {
            break;
        }

        match subscription.recv_timeout(TICK) {
            Ok(snapshot) => {
                // Re-check so a snapshot racing with shutdown is dropped.
                if !matches!(shutdown_rx.try_recv(), Err(mpsc::TryRecvError::Empty)) {
                    break;
                }
                if let Err(err) = handler(snapshot) {
                    warn!(listener = name, error = ?err, "snapshot listener callback failed");
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    subscription.cancel();
}
