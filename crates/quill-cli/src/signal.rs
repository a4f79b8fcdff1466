//! Ctrl+C handling

use tokio_util::sync::CancellationToken;

/// Token cancelled on the first Ctrl+C.
///
/// The listener task ends once the token is cancelled, so callers hold a
/// `drop_guard` for the duration of the request.
pub fn interrupt_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = trigger.cancelled() => {}
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    eprintln!("\nInterrupted, cancelling the current request...");
                    trigger.cancel();
                }
            }
        }
    });
    token
}
