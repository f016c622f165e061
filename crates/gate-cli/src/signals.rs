//! Turning SIGINT and SIGTERM into cancellation

use anyhow::Result;
use text_gate::CancellationToken;

/// Cancels a token when the process is asked to stop
///
/// While the guard is alive SIGINT and SIGTERM no longer end the process;
/// they cancel the token instead. Dropping the guard stops listening.
pub struct InterruptGuard {
    #[cfg(unix)]
    handle: signal_hook::iterator::Handle,
}

/// Cancel `token` on SIGINT or SIGTERM
#[cfg(unix)]
pub fn cancel_on_interrupt(token: CancellationToken) -> Result<InterruptGuard> {
    use anyhow::Context;
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;
    use tracing::warn;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Failed to install signal handler")?;
    let handle = signals.handle();
    std::thread::Builder::new()
        .name("launch-gate-signals".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                warn!(signal, "interrupted, stopping launch");
                token.cancel();
            }
        })
        .context("Failed to start signal thread")?;
    Ok(InterruptGuard { handle })
}

/// Cancel `token` on SIGINT or SIGTERM
#[cfg(not(unix))]
pub fn cancel_on_interrupt(_token: CancellationToken) -> Result<InterruptGuard> {
    Ok(InterruptGuard {})
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        self.handle.close();
    }
}
