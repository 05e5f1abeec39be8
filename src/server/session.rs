//! Per-connection echo loop.

use crate::net::TcpStream;

/// Echoes everything read from `stream` back to it until the peer closes or
/// the transport fails.
///
/// One buffer of `buffer_size` bytes is allocated up front and moved through
/// every read and write; larger messages are echoed over several rounds.
pub async fn session(stream: TcpStream, buffer_size: usize) {
    let peer = stream.peer_addr().ok();
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut echoed = 0usize;

    loop {
        let (result, returned) = stream.read(buf).await;
        buf = returned;
        let n = match result {
            Ok(n) => n,
            Err(err) => {
                log::debug!("session {peer:?} ended while reading after {echoed} bytes: {err}");
                break;
            }
        };

        let (result, returned) = stream.write_all(buf, n).await;
        buf = returned;
        if let Err(err) = result {
            log::debug!("session {peer:?} ended while writing after {echoed} bytes: {err}");
            break;
        }

        echoed += n;
    }
}
