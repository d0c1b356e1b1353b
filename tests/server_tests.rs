//! Server Tests
//!
//! End-to-end tests over a real TCP socket: a server runs on an ephemeral
//! port on its own thread while the test drives it with a blocking client
//! stream. The documented byte-level scenarios are asserted literally.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use lodestone::protocol::{read_response, write_request, Request, Response, HEADER_SIZE, MAX_MSG};
use lodestone::{Config, Server};

struct TestServer {
    addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    fn start() -> TestServer {
        let config = Config::builder()
            .listen_addr("127.0.0.1:0")
            .poll_timeout_ms(20)
            .build();
        let mut server = Server::bind(config).expect("bind test server");
        let addr = server.local_addr().expect("local addr");
        let shutdown = server.shutdown_handle();
        let handle = std::thread::spawn(move || {
            server.run().expect("server run");
        });
        TestServer {
            addr,
            shutdown,
            handle: Some(handle),
        }
    }

    fn connect(&self) -> TcpStream {
        let stream = TcpStream::connect(self.addr).expect("connect");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("read timeout");
        stream
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Send raw frame bytes and read back one framed response payload
fn round_trip_raw(stream: &mut TcpStream, frame: &[u8]) -> Vec<u8> {
    stream.write_all(frame).expect("write frame");
    read_payload(stream)
}

fn read_payload(stream: &mut TcpStream) -> Vec<u8> {
    let mut header = [0u8; HEADER_SIZE];
    stream.read_exact(&mut header).expect("read header");
    let len = u32::from_le_bytes(header) as usize;
    assert!(len <= MAX_MSG, "response frame over the limit");
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).expect("read payload");
    payload
}

// =============================================================================
// Literal Byte Scenarios
// =============================================================================

#[test]
fn test_scenario_bytes_end_to_end() {
    let server = TestServer::start();
    let mut stream = server.connect();

    // GET of an absent key replies with the key only
    let payload = round_trip_raw(
        &mut stream,
        &[
            0x08, 0x00, 0x00, 0x00, // frame length 8
            0x01, 0x05, 0x00, b'a', b'_', b'k', b'e', b'y',
        ],
    );
    assert_eq!(payload, [0x01, 0x05, 0x00, b'a', b'_', b'k', b'e', b'y']);

    // LIST on an empty store is the bare command byte
    let payload = round_trip_raw(&mut stream, &[0x01, 0x00, 0x00, 0x00, 0x04]);
    assert_eq!(payload, [0x04]);

    // SET echoes key and value as stored
    let payload = round_trip_raw(
        &mut stream,
        &[
            0x07, 0x00, 0x00, 0x00, // frame length 7
            0x02, 0x01, 0x00, b'a', 0x01, 0x00, b'1',
        ],
    );
    assert_eq!(payload, [0x02, 0x01, 0x00, b'a', 0x01, 0x00, b'1']);

    // GET now returns the value
    let payload = round_trip_raw(
        &mut stream,
        &[0x04, 0x00, 0x00, 0x00, 0x01, 0x01, 0x00, b'a'],
    );
    assert_eq!(payload, [0x01, 0x01, 0x00, b'a', 0x01, 0x00, b'1']);

    // LIST shows the stored pair
    let payload = round_trip_raw(&mut stream, &[0x01, 0x00, 0x00, 0x00, 0x04]);
    assert_eq!(payload, [0x04, 0x01, 0x00, b'a', 0x01, 0x00, b'1']);

    // DELETE echoes the key; GET goes back to key-only
    let payload = round_trip_raw(
        &mut stream,
        &[0x04, 0x00, 0x00, 0x00, 0x03, 0x01, 0x00, b'a'],
    );
    assert_eq!(payload, [0x03, 0x01, 0x00, b'a']);
    let payload = round_trip_raw(
        &mut stream,
        &[0x04, 0x00, 0x00, 0x00, 0x01, 0x01, 0x00, b'a'],
    );
    assert_eq!(payload, [0x01, 0x01, 0x00, b'a']);

    // an unknown command byte is echoed with its payload
    let payload = round_trip_raw(
        &mut stream,
        &[0x04, 0x00, 0x00, 0x00, 0xFF, 0x01, 0x02, 0x03],
    );
    assert_eq!(payload, [0xFF, 0x01, 0x02, 0x03]);
}

// =============================================================================
// Protocol-level Client Tests
// =============================================================================

#[test]
fn test_typed_client_round_trip() {
    let server = TestServer::start();
    let mut stream = server.connect();

    write_request(
        &mut stream,
        &Request::Set {
            key: b"user:1".to_vec(),
            value: b"Alice".to_vec(),
        },
    )
    .unwrap();
    assert_eq!(
        read_response(&mut stream).unwrap(),
        Response::Set {
            key: b"user:1".to_vec(),
            value: b"Alice".to_vec(),
        }
    );

    write_request(
        &mut stream,
        &Request::Get {
            key: b"user:1".to_vec(),
        },
    )
    .unwrap();
    assert_eq!(
        read_response(&mut stream).unwrap(),
        Response::Get {
            key: b"user:1".to_vec(),
            value: Some(b"Alice".to_vec()),
        }
    );

    write_request(
        &mut stream,
        &Request::Delete {
            key: b"user:1".to_vec(),
        },
    )
    .unwrap();
    assert_eq!(
        read_response(&mut stream).unwrap(),
        Response::Delete {
            key: b"user:1".to_vec(),
        }
    );

    // deleting again still succeeds
    write_request(
        &mut stream,
        &Request::Delete {
            key: b"user:1".to_vec(),
        },
    )
    .unwrap();
    assert_eq!(
        read_response(&mut stream).unwrap(),
        Response::Delete {
            key: b"user:1".to_vec(),
        }
    );
}

#[test]
fn test_pipelined_requests_in_one_write() {
    let server = TestServer::start();
    let mut stream = server.connect();

    // two complete frames in a single socket write
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&[
        0x07, 0x00, 0x00, 0x00, 0x02, 0x01, 0x00, b'p', 0x01, 0x00, b'9',
    ]);
    bytes.extend_from_slice(&[0x04, 0x00, 0x00, 0x00, 0x01, 0x01, 0x00, b'p']);
    stream.write_all(&bytes).unwrap();

    // responses come back in request order
    assert_eq!(
        read_payload(&mut stream),
        [0x02, 0x01, 0x00, b'p', 0x01, 0x00, b'9']
    );
    assert_eq!(
        read_payload(&mut stream),
        [0x01, 0x01, 0x00, b'p', 0x01, 0x00, b'9']
    );
}

#[test]
fn test_many_keys_across_connections() {
    let server = TestServer::start();

    {
        let mut stream = server.connect();
        for i in 0..500u32 {
            write_request(
                &mut stream,
                &Request::Set {
                    key: format!("key-{i}").into_bytes(),
                    value: format!("value-{i}").into_bytes(),
                },
            )
            .unwrap();
            read_response(&mut stream).unwrap();
        }
    }

    // the store outlives the first connection
    let mut stream = server.connect();
    for i in (0..500u32).step_by(17) {
        write_request(
            &mut stream,
            &Request::Get {
                key: format!("key-{i}").into_bytes(),
            },
        )
        .unwrap();
        assert_eq!(
            read_response(&mut stream).unwrap(),
            Response::Get {
                key: format!("key-{i}").into_bytes(),
                value: Some(format!("value-{i}").into_bytes()),
            }
        );
    }
}

// =============================================================================
// Error Path Tests
// =============================================================================

#[test]
fn test_oversized_frame_closes_connection() {
    let server = TestServer::start();
    let mut stream = server.connect();

    stream
        .write_all(&((MAX_MSG + 1) as u32).to_le_bytes())
        .unwrap();

    // no response; the server closes without replying
    let mut buf = [0u8; 1];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(_) => panic!("unexpected bytes after protocol error"),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => panic!("expected clean close, got {e}"),
        }
    }

    // the server keeps serving new connections afterwards
    let mut stream = server.connect();
    write_request(&mut stream, &Request::List).unwrap();
    assert_eq!(
        read_response(&mut stream).unwrap(),
        Response::List { entries: vec![] }
    );
}

#[test]
fn test_malformed_body_gets_invalid_request_reply() {
    let server = TestServer::start();
    let mut stream = server.connect();

    // GET whose key length field runs past the payload
    let payload = round_trip_raw(
        &mut stream,
        &[0x04, 0x00, 0x00, 0x00, 0x01, 0x09, 0x00, b'k'],
    );
    assert_eq!(payload, b"Invalid request");

    // connection survives and keeps working
    write_request(&mut stream, &Request::List).unwrap();
    assert_eq!(
        read_response(&mut stream).unwrap(),
        Response::List { entries: vec![] }
    );
}

#[test]
fn test_list_larger_than_response_buffer() {
    let server = TestServer::start();
    let mut stream = server.connect();

    // ~40 pairs of ~200 bytes overflow the 4096-byte response payload
    for i in 0..40u32 {
        write_request(
            &mut stream,
            &Request::Set {
                key: format!("key-{i:04}").into_bytes(),
                value: vec![b'x'; 200],
            },
        )
        .unwrap();
        read_response(&mut stream).unwrap();
    }

    write_request(&mut stream, &Request::List).unwrap();
    assert_eq!(
        read_response(&mut stream).unwrap(),
        Response::Unknown {
            raw: b"Response too large".to_vec(),
        }
    );

    // the failure reply left the connection usable
    write_request(
        &mut stream,
        &Request::Get {
            key: b"key-0000".to_vec(),
        },
    )
    .unwrap();
    assert_eq!(
        read_response(&mut stream).unwrap(),
        Response::Get {
            key: b"key-0000".to_vec(),
            value: Some(vec![b'x'; 200]),
        }
    );
}

#[test]
fn test_shutdown_tears_down_open_connections() {
    let server = TestServer::start();
    let _stream = server.connect();
    // Drop shuts the server down and joins its thread; the open connection
    // must not keep it alive past the bounded poll wait.
}
