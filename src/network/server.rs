//! TCP Server
//!
//! Single-threaded readiness event loop.
//!
//! One mio poller multiplexes the listening socket and every client socket.
//! Each readiness event drives the owning connection's state machine as far
//! as it can go without blocking; connections that reach END are
//! deregistered and destroyed. The poll wait is bounded so a shutdown
//! request is observed within one timeout window.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Registry, Token};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{Result, StoreError};

use super::Connection;

const LISTENER: Token = Token(0);

/// TCP server for Lodestone
///
/// ## Architecture
/// - Single thread, readiness-driven
/// - The engine and every connection live on that one thread, so no locks
/// - Level-style processing: every event handler drains until `WouldBlock`
pub struct Server {
    /// Server configuration
    config: Config,

    /// The request executor and its store
    engine: Engine,

    /// Readiness poller
    poll: Poll,

    /// Listening socket, registered as `LISTENER`
    listener: TcpListener,

    /// Shutdown flag, observed between poll rounds
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Bind the listening socket and set up the poller.
    ///
    /// Failures here are fatal and reach `main` as errors.
    pub fn bind(config: Config) -> Result<Server> {
        let addr: SocketAddr = config.listen_addr.parse().map_err(|e| {
            StoreError::Config(format!("invalid listen address {}: {}", config.listen_addr, e))
        })?;

        let mut listener = bind_listener(addr)?;
        let poll = Poll::new()?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)?;

        Ok(Server {
            config,
            engine: Engine::new(),
            poll,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The bound address (useful when the config asked for port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle that flips the server into shutdown from another thread
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Signal the server to stop after the current poll round
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Run the event loop (blocking).
    ///
    /// Returns on shutdown after tearing down every live connection, or with
    /// an error on an unrecoverable poll failure.
    pub fn run(&mut self) -> Result<()> {
        tracing::info!("listening on {}", self.config.listen_addr);

        let mut events = Events::with_capacity(256);
        let mut connections: HashMap<Token, Connection<TcpStream>> = HashMap::new();
        let mut next_token = LISTENER.0 + 1;
        let timeout = Duration::from_millis(self.config.poll_timeout_ms);

        while !self.shutdown.load(Ordering::Relaxed) {
            if let Err(err) = self.poll.poll(&mut events, Some(timeout)) {
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err.into());
            }

            for event in events.iter() {
                match event.token() {
                    LISTENER => accept_connections(
                        &mut self.listener,
                        self.poll.registry(),
                        &mut connections,
                        &mut next_token,
                        self.config.max_connections,
                    ),
                    token => {
                        let Some(conn) = connections.get_mut(&token) else {
                            continue;
                        };
                        conn.drive(&mut self.engine);
                        if conn.is_closed() {
                            if let Some(mut conn) = connections.remove(&token) {
                                let _ = self.poll.registry().deregister(conn.stream_mut());
                            }
                            tracing::debug!("connection {} closed", token.0);
                        }
                    }
                }
            }
        }

        // teardown: destroy every live connection before the listener goes
        tracing::info!("shutting down, dropping {} connection(s)", connections.len());
        for (_, mut conn) in connections.drain() {
            let _ = self.poll.registry().deregister(conn.stream_mut());
        }

        tracing::info!("server stopped");
        Ok(())
    }
}

/// Accept every pending connection on the listener.
///
/// Accept errors other than `WouldBlock` are logged and ignored; the loop
/// keeps serving.
fn accept_connections(
    listener: &mut TcpListener,
    registry: &Registry,
    connections: &mut HashMap<Token, Connection<TcpStream>>,
    next_token: &mut usize,
    max_connections: usize,
) {
    loop {
        match listener.accept() {
            Ok((mut stream, peer)) => {
                if connections.len() >= max_connections {
                    tracing::warn!(
                        "connection limit reached ({}/{}), rejecting {}",
                        connections.len(),
                        max_connections,
                        peer
                    );
                    drop(stream);
                    continue;
                }

                let token = Token(*next_token);
                *next_token += 1;

                if let Err(err) =
                    registry.register(&mut stream, token, Interest::READABLE | Interest::WRITABLE)
                {
                    tracing::error!("failed to register {}: {}", peer, err);
                    continue;
                }

                tracing::debug!("accepted connection from {} as {}", peer, token.0);
                connections.insert(token, Connection::new(stream));
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                tracing::error!("accept error: {}", err);
                break;
            }
        }
    }
}

/// Build the non-blocking listener with `SO_REUSEPORT` so a restarted
/// server can bind while old sockets linger
fn bind_listener(addr: SocketAddr) -> Result<TcpListener> {
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;
    Ok(TcpListener::from_std(socket.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_on_ephemeral_port() {
        let config = Config::builder().listen_addr("127.0.0.1:0").build();
        let server = Server::bind(config).unwrap();
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
    }

    #[test]
    fn test_invalid_listen_address() {
        let config = Config::builder().listen_addr("not-an-address").build();
        assert!(Server::bind(config).is_err());
    }
}
