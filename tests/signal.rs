use reactor_echo::time::sleep;
use reactor_echo::{Runtime, signal};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

// Signal dispositions are process-wide.
static SIGNALS: Mutex<()> = Mutex::new(());

#[test]
fn sigterm_stops_the_runtime() {
    let _guard = SIGNALS.lock().unwrap_or_else(PoisonError::into_inner);
    let mut runtime = Runtime::new().unwrap();
    signal::stop_on_shutdown(&runtime.handle()).unwrap();

    let raiser = thread::spawn(|| {
        thread::sleep(Duration::from_millis(50));
        unsafe { libc::raise(libc::SIGTERM) };
    });

    runtime.run().unwrap();
    raiser.join().unwrap();
}

#[test]
fn reinstalling_releases_the_previous_pipe() {
    let _guard = SIGNALS.lock().unwrap_or_else(PoisonError::into_inner);
    let mut runtime = Runtime::new().unwrap();
    let handle = runtime.handle();

    signal::stop_on_shutdown(&handle).unwrap();
    signal::stop_on_shutdown(&handle).unwrap();
    assert_eq!(handle.pending_operations(), 2);

    // The first pipe reads end of stream, which must not count as a signal.
    let outcome = runtime.block_on(sleep(Duration::from_millis(20)));
    assert!(outcome.is_ok(), "superseded pipe stopped the runtime: {outcome:?}");
    assert_eq!(handle.pending_operations(), 1);

    let raiser = thread::spawn(|| {
        thread::sleep(Duration::from_millis(50));
        unsafe { libc::raise(libc::SIGINT) };
    });

    runtime.run().unwrap();
    raiser.join().unwrap();
}
