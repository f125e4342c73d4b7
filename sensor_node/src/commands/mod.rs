pub mod handler;

pub use handler::{Dispatcher, Outcome};

use crate::errors::NodeError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::info;

/// Feed every newline-terminated line from `reader` to the dispatcher until
/// EOF. A read error or a failed write to the sink ends the loop.
///
/// Bytes that are not UTF-8 (line noise on a serial link) are replaced and
/// then rejected as an unknown command instead of killing the loop.
pub async fn run_console<R>(mut reader: R, dispatcher: &Dispatcher) -> Result<(), NodeError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::with_capacity(64);
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        dispatcher.dispatch(&line).await?;
    }
    info!("command input closed");
    Ok(())
}
