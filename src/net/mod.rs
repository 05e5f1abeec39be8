//! TCP networking primitives.
//!
//! - [`TcpListener`]: accepts connections, one suspension per accept
//! - [`TcpStream`]: reads and writes with owned buffers, one suspension per operation
//!
//! # Example
//!
//! ```ignore
//! use reactor_echo::net::TcpListener;
//!
//! async fn server() {
//!     let listener = TcpListener::bind("127.0.0.1:8080".parse().unwrap()).unwrap();
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         println!("New connection from {}", addr);
//!     }
//! }
//! ```

mod tcp_listener;
mod tcp_stream;

pub use tcp_listener::TcpListener;
pub use tcp_stream::TcpStream;
