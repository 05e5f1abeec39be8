//! Shutdown on SIGINT / SIGTERM.
//!
//! The handler only writes one byte into a non-blocking socket pair, which
//! is async-signal-safe. The reading end is an ordinary reactor read whose
//! completion requests a runtime stop.

use crate::error::{Error, Result};
use crate::reactor::operation::{Operation, Source};
use crate::runtime::Handle;

use libc::{SA_RESTART, c_int, c_void, sigaction, sigemptyset, sighandler_t};
use std::io;
use std::mem;
use std::os::unix::io::{FromRawFd, IntoRawFd, OwnedFd};
use std::os::unix::net::UnixStream;
use std::ptr;
use std::rc::Rc;
use std::sync::atomic::{AtomicI32, Ordering};

static SIGNAL_PIPE: AtomicI32 = AtomicI32::new(-1);

#[cfg(target_os = "linux")]
unsafe fn errno_location() -> *mut c_int {
    unsafe { libc::__errno_location() }
}

#[cfg(target_os = "macos")]
unsafe fn errno_location() -> *mut c_int {
    unsafe { libc::__error() }
}

extern "C" fn on_signal(_signal: c_int) {
    let fd = SIGNAL_PIPE.load(Ordering::Relaxed);
    if fd < 0 {
        return;
    }

    unsafe {
        let errno = errno_location();
        let saved = *errno;
        let byte = 1u8;
        libc::write(fd, &byte as *const u8 as *const c_void, 1);
        *errno = saved;
    }
}

fn install(signal: c_int) -> io::Result<()> {
    unsafe {
        let mut action: libc::sigaction = mem::zeroed();
        action.sa_sigaction = on_signal as extern "C" fn(c_int) as sighandler_t;
        action.sa_flags = SA_RESTART;
        sigemptyset(&mut action.sa_mask);

        if sigaction(signal, &action, ptr::null_mut()) != 0 {
            return Err(io::Error::last_os_error());
        }
    }

    Ok(())
}

/// Stops `handle`'s runtime on SIGINT or SIGTERM.
pub fn stop_on_shutdown(handle: &Handle) -> Result<()> {
    stop_on(handle, &[libc::SIGINT, libc::SIGTERM])
}

/// Stops `handle`'s runtime when any of `signals` is delivered.
///
/// Handlers are process-wide: the most recent call decides which runtime is
/// stopped, and the pipe of the previous call is closed. The first
/// delivered signal completes the registration; later ones are ignored.
pub fn stop_on(handle: &Handle, signals: &[c_int]) -> Result<()> {
    let (sender, receiver) = UnixStream::pair().map_err(Error::Signal)?;
    sender.set_nonblocking(true).map_err(Error::Signal)?;
    receiver.set_nonblocking(true).map_err(Error::Signal)?;

    let previous = SIGNAL_PIPE.swap(sender.into_raw_fd(), Ordering::SeqCst);
    if previous >= 0 {
        // Handlers now write to the new pipe; the old sender has no users.
        drop(unsafe { OwnedFd::from_raw_fd(previous) });
    }

    for &signal in signals {
        install(signal).map_err(Error::Signal)?;
    }

    let stop = handle.stop_handle();
    let receiver: Rc<dyn Source> = Rc::new(receiver);
    handle.register(Operation::read(
        receiver,
        vec![0u8; 16],
        Box::new(move |(result, _buf)| match result {
            // The sender was closed by a later call.
            Ok(0) => log::debug!("signal pipe superseded"),
            Ok(_) => {
                log::info!("shutdown signal received");
                stop.request_stop();
            }
            Err(err) => log::warn!("signal pipe failed, signals will not stop the runtime: {err}"),
        }),
    ));

    log::debug!("shutdown handlers installed for signals {signals:?}");
    Ok(())
}
