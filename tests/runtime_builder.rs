use reactor_echo::time::sleep;
use reactor_echo::{Error, Handle, RuntimeBuilder};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_builder_creation() {
    let rt = RuntimeBuilder::new().build();
    assert!(rt.is_ok());
}

#[test]
fn test_builder_zero_capacity_still_builds() {
    let mut rt = RuntimeBuilder::new().event_capacity(0).build().unwrap();
    assert_eq!(rt.block_on(async { 7 }).unwrap(), 7);
}

#[test]
fn test_builder_immediate_result() {
    let mut rt = RuntimeBuilder::new().build().unwrap();
    let value = 42;

    let result = rt.block_on(async { value }).unwrap();

    assert_eq!(result, 42, "Future should return correct value");
}

#[test]
fn test_builder_multiple_instances() {
    let mut rt1 = RuntimeBuilder::new().build().unwrap();
    let mut rt2 = RuntimeBuilder::new().build().unwrap();

    let result1 = rt1.block_on(async { 10 }).unwrap();
    let result2 = rt2.block_on(async { 20 }).unwrap();

    assert_eq!(result1, 10);
    assert_eq!(result2, 20);
}

#[test]
fn test_builder_with_async_function() {
    let mut rt = RuntimeBuilder::new().build().unwrap();
    let counter = Arc::new(Mutex::new(0));

    async fn increment_counter(counter: Arc<Mutex<i32>>) -> i32 {
        let mut val = counter.lock().unwrap();
        *val += 1;
        *val
    }

    let result = rt.block_on(increment_counter(counter.clone())).unwrap();

    assert_eq!(result, 1, "Counter should be incremented");
    assert_eq!(*counter.lock().unwrap(), 1, "Shared counter should be 1");
}

#[test]
fn test_spawn_multiple_tasks() {
    let mut rt = RuntimeBuilder::new().build().unwrap();
    let counter = Rc::new(Cell::new(0));

    for _ in 0..5 {
        let counter = counter.clone();
        rt.spawn(async move {
            counter.set(counter.get() + 1);
        });
    }

    rt.block_on(async {}).unwrap();

    assert_eq!(counter.get(), 5, "All 5 tasks should have run");
    assert_eq!(rt.handle().active_tasks(), 0);
}

#[test]
fn test_current_handle_inside_block_on() {
    let mut rt = RuntimeBuilder::new().build().unwrap();
    assert!(Handle::try_current().is_none());

    let inside = rt.block_on(async { Handle::try_current().is_some() }).unwrap();

    assert!(inside);
    assert!(Handle::try_current().is_none());
}

#[test]
fn test_sleep_waits_at_least_the_duration() {
    let mut rt = RuntimeBuilder::new().build().unwrap();
    let start = Instant::now();

    rt.block_on(sleep(Duration::from_millis(30))).unwrap();

    assert!(start.elapsed() >= Duration::from_millis(30));
    assert_eq!(rt.handle().pending_operations(), 0);
}

#[test]
fn test_sleeps_finish_in_deadline_order() {
    let mut rt = RuntimeBuilder::new().build().unwrap();
    let order = Rc::new(std::cell::RefCell::new(Vec::new()));

    for (label, millis) in [("slow", 40), ("fast", 5), ("medium", 20)] {
        let order = order.clone();
        rt.spawn(async move {
            sleep(Duration::from_millis(millis)).await;
            order.borrow_mut().push(label);
        });
    }

    rt.block_on(sleep(Duration::from_millis(80))).unwrap();

    assert_eq!(*order.borrow(), ["fast", "medium", "slow"]);
}

#[test]
fn test_stop_from_another_thread_ends_run() {
    let mut rt = RuntimeBuilder::new().build().unwrap();
    let stop = rt.stop_handle();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        stop.request_stop();
    });

    rt.run().unwrap();
    stopper.join().unwrap();

    assert!(!rt.stop_handle().is_stop_requested(), "stop request is consumed");
}

#[test]
fn test_block_on_reports_stop() {
    let mut rt = RuntimeBuilder::new().build().unwrap();
    let stop = rt.stop_handle();

    let result = rt.block_on(async move {
        stop.request_stop();
        sleep(Duration::from_secs(10)).await;
    });

    assert!(matches!(result, Err(Error::Stopped)));
}
