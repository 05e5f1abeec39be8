//! The echo workload: one listener task plus one task per connection.

mod listener;
mod session;

pub use listener::listen;
pub use session::session;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::net::TcpListener;
use crate::runtime::Handle;

use std::net::SocketAddr;

/// Binds `config.addr` and spawns the accept loop on `handle`.
///
/// Returns the bound address (useful when the port is 0). Nothing is
/// accepted until the runtime is driven. If the accept loop ever gives up,
/// the error is logged and the runtime is asked to stop.
pub fn serve(handle: &Handle, config: ServerConfig) -> Result<SocketAddr> {
    let listener = TcpListener::bind_with(config.addr, handle)?;
    serve_listener(handle, listener, config)
}

/// Like [`serve`], for a listener that is already bound. `config.addr` is
/// not used.
pub fn serve_listener(handle: &Handle, listener: TcpListener, config: ServerConfig) -> Result<SocketAddr> {
    let addr = listener.local_addr()?;
    log::info!("listening on {addr}");

    let stop = handle.stop_handle();
    let accept_loop = listen(handle.clone(), listener, config);
    let id = handle.spawn(async move {
        if let Err(err) = accept_loop.await {
            log::error!("listener on {addr} stopped: {err}");
            stop.request_stop();
        }
    });
    log::debug!("accept loop running as {id}");

    Ok(addr)
}
