use proptest::prelude::*;
use reactor_echo::time::sleep;
use reactor_echo::{Runtime, ServerConfig, StopHandle, serve};
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, mpsc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Echo server running on its own thread until dropped.
struct Server {
    addr: SocketAddr,
    stop: StopHandle,
    thread: Option<JoinHandle<()>>,
}

impl Server {
    fn start(buffer_size: usize) -> Self {
        let (tx, rx) = mpsc::channel();
        let thread = thread::spawn(move || {
            let mut runtime = Runtime::new().expect("runtime");
            let config = ServerConfig::default()
                .with_addr("127.0.0.1:0".parse().unwrap())
                .with_buffer_size(buffer_size);
            let addr = serve(&runtime.handle(), config).expect("serve");
            tx.send((addr, runtime.stop_handle())).unwrap();
            runtime.run().expect("run");
        });

        let (addr, stop) = rx.recv().expect("server thread failed to start");
        Self {
            addr,
            stop,
            thread: Some(thread),
        }
    }

    fn connect(&self) -> TcpStream {
        let stream = TcpStream::connect(self.addr).expect("connect");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop.request_stop();
        if let Some(thread) = self.thread.take() {
            thread.join().unwrap();
        }
    }
}

fn echo(stream: &mut TcpStream, payload: &[u8]) -> Vec<u8> {
    stream.write_all(payload).unwrap();
    let mut received = vec![0u8; payload.len()];
    stream.read_exact(&mut received).unwrap();
    received
}

#[test]
fn ping_is_echoed_and_connection_stays_open() {
    let server = Server::start(1024);
    let mut client = server.connect();

    assert_eq!(echo(&mut client, b"ping"), b"ping");
    assert_eq!(echo(&mut client, b"ping again"), b"ping again");
}

#[test]
fn payload_larger_than_the_buffer_is_echoed_in_rounds() {
    let server = Server::start(1024);
    let mut client = server.connect();
    let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();

    assert_eq!(echo(&mut client, &payload), payload);
}

#[test]
fn tiny_buffer_still_echoes_everything() {
    let server = Server::start(1);
    let mut client = server.connect();

    assert_eq!(echo(&mut client, b"one byte at a time"), b"one byte at a time");
}

#[test]
fn concurrent_clients_are_independent() {
    let server = Server::start(64);
    let addr = server.addr;

    let clients: Vec<_> = (0..16u8)
        .map(|id| {
            thread::spawn(move || {
                let mut stream = TcpStream::connect(addr).unwrap();
                stream
                    .set_read_timeout(Some(Duration::from_secs(5)))
                    .unwrap();
                for round in 0..20u8 {
                    let payload = vec![id ^ round; 100 + id as usize];
                    assert_eq!(echo(&mut stream, &payload), payload);
                }
            })
        })
        .collect();

    for client in clients {
        client.join().unwrap();
    }
}

#[test]
fn disconnect_mid_exchange_keeps_the_server_alive() {
    let server = Server::start(16);

    {
        let mut quitter = server.connect();
        quitter.write_all(&[9u8; 4096]).unwrap();
        quitter.shutdown(Shutdown::Both).unwrap();
    }

    let mut client = server.connect();
    assert_eq!(echo(&mut client, b"still here"), b"still here");
}

#[test]
fn closed_session_releases_its_task() {
    let mut runtime = Runtime::new().unwrap();
    let handle = runtime.handle();
    let config = ServerConfig::default().with_addr("127.0.0.1:0".parse().unwrap());
    let addr = serve(&handle, config).unwrap();

    let seen = Arc::new(AtomicBool::new(false));
    let closed = Arc::new(AtomicBool::new(false));
    let client = {
        let seen = seen.clone();
        let closed = closed.clone();
        thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            let reply = echo(&mut stream, b"hello");
            while !seen.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
            drop(stream);
            closed.store(true, Ordering::SeqCst);
            reply
        })
    };

    let (connected, after_close) = runtime
        .block_on(async {
            let mut connected = handle.active_tasks();
            for _ in 0..2_500 {
                connected = handle.active_tasks();
                if connected == 2 {
                    break;
                }
                sleep(Duration::from_millis(2)).await;
            }
            seen.store(true, Ordering::SeqCst);

            while !closed.load(Ordering::SeqCst) {
                sleep(Duration::from_millis(2)).await;
            }
            let mut after_close = handle.active_tasks();
            for _ in 0..2_500 {
                after_close = handle.active_tasks();
                if after_close == 1 {
                    break;
                }
                sleep(Duration::from_millis(2)).await;
            }
            (connected, after_close)
        })
        .unwrap();

    assert_eq!(client.join().unwrap(), b"hello");
    assert_eq!(connected, 2, "listener plus one session while connected");
    assert_eq!(after_close, 1, "only the listener is left");
}

#[test]
fn port_in_use_is_a_bind_error() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let runtime = Runtime::new().unwrap();
    let config = ServerConfig::default().with_addr(taken.local_addr().unwrap());

    let err = serve(&runtime.handle(), config).unwrap_err();

    assert!(matches!(err, reactor_echo::Error::Bind { .. }), "got {err:?}");
}

fn shared_server() -> SocketAddr {
    static SERVER: OnceLock<SocketAddr> = OnceLock::new();
    *SERVER.get_or_init(|| {
        let server = Server::start(1024);
        let addr = server.addr;
        // Lives for the rest of the test binary.
        std::mem::forget(server);
        addr
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn payload_within_the_buffer_is_echoed(payload in prop::collection::vec(any::<u8>(), 1..=1024)) {
        let mut stream = TcpStream::connect(shared_server()).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        prop_assert_eq!(echo(&mut stream, &payload), payload);
    }

    #[test]
    fn payload_beyond_the_buffer_is_reassembled(payload in prop::collection::vec(any::<u8>(), 1025..8192)) {
        let mut stream = TcpStream::connect(shared_server()).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        prop_assert_eq!(echo(&mut stream, &payload), payload);
    }
}
