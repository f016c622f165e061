//! Cooperative cancellation

use async_channel::{Receiver, Sender};

/// Token shared between a waiting launch sequence and whoever may cancel it
///
/// Clones observe the same cancellation. Cancelling is idempotent.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    sender: Sender<()>,
    receiver: Receiver<()>,
}

impl CancellationToken {
    /// A token that is not cancelled
    pub fn new() -> Self {
        let (sender, receiver) = async_channel::bounded(1);
        Self { sender, receiver }
    }

    /// Cancel every waiter holding a clone of this token
    pub fn cancel(&self) {
        self.sender.close();
    }

    /// Whether [`cancel`](Self::cancel) has been called
    pub fn is_cancelled(&self) -> bool {
        self.sender.is_closed()
    }

    /// Resolves once the token is cancelled
    pub async fn cancelled(&self) {
        // Nothing is ever sent; recv only returns when the channel closes
        let _ = self.receiver.recv().await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
