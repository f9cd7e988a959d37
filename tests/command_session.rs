//! End-to-end command session tests
//!
//! Runs the real server against real localhost TCP clients with the mock
//! GPIO bank, and checks the dead-man behavior from the outside:
//! - each command drives the documented pin assignment
//! - unknown input changes nothing
//! - every way a session can end leaves the motors stopped
//! - the server keeps accepting after timeouts and bad peers
//!
//! Run with: `cargo test --test command_session`

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use vahana_io::config::{AppConfig, NetworkConfig};
use vahana_io::controller::Controller;
use vahana_io::hal::MockGpio;
use vahana_io::server::CommandServer;

const DRIVE_PINS: [u8; 4] = [19, 21, 22, 23];
const AUX_PINS: [u8; 2] = [16, 14];

const STOPPED: [u8; 4] = [0, 0, 0, 0];
const FORWARD: [u8; 4] = [1, 0, 1, 0];
const BACKWARD: [u8; 4] = [0, 1, 0, 1];
const ROTATE_LEFT: [u8; 4] = [0, 1, 1, 0];
const ROTATE_RIGHT: [u8; 4] = [1, 0, 0, 1];

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    addr: SocketAddr,
    probe: MockGpio,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

/// Start a server on an ephemeral localhost port with a mock GPIO bank
fn start_server(send_ack: bool, timeout_secs: u64) -> Harness {
    let mock = MockGpio::new();
    let probe = mock.clone();
    let pins = AppConfig::vehicle_defaults().pins;
    let mut controller = Controller::new(Box::new(mock), pins).unwrap();

    let network = NetworkConfig {
        bind_address: "127.0.0.1:0".to_string(),
        read_timeout_secs: timeout_secs,
        send_ack,
    };
    let running = Arc::new(AtomicBool::new(true));
    let server = CommandServer::bind(&network, Arc::clone(&running)).unwrap();
    let addr = server.local_addr().unwrap();

    let handle = thread::spawn(move || {
        server.run(&mut controller).unwrap();
    });

    Harness {
        addr,
        probe,
        running,
        handle: Some(handle),
    }
}

impl Harness {
    fn connect(&self) -> TcpStream {
        let stream = TcpStream::connect(self.addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream
    }

    fn drive_levels(&self) -> [u8; 4] {
        let v = self.probe.levels(&DRIVE_PINS);
        [v[0], v[1], v[2], v[3]]
    }

    fn aux_levels(&self) -> [u8; 2] {
        let v = self.probe.levels(&AUX_PINS);
        [v[0], v[1]]
    }

    /// Signal shutdown and join the server thread
    fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
    }
}

/// Poll a condition until it holds or the deadline passes
fn wait_until<F: FnMut() -> bool>(what: &str, timeout: Duration, mut predicate: F) {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("timed out waiting for {}", what);
}

/// Read one `\n`-terminated acknowledgement token
fn read_ack(stream: &mut TcpStream) -> String {
    let mut out = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = stream.read(&mut byte).expect("ack read failed");
        if n == 0 {
            break;
        }
        out.push(byte[0]);
        if byte[0] == b'\n' {
            break;
        }
    }
    String::from_utf8(out).expect("ack not utf8")
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn forward_command_drives_forward_pins() {
    let harness = start_server(true, 5);

    let mut client = harness.connect();
    client.write_all(b"F").unwrap();
    assert_eq!(read_ack(&mut client), "OK\n");
    assert_eq!(harness.drive_levels(), FORWARD);

    drop(client);
    wait_until("stop after disconnect", Duration::from_secs(5), || {
        harness.drive_levels() == STOPPED
    });
    harness.stop();
}

#[test]
fn unknown_command_changes_nothing() {
    let harness = start_server(true, 5);

    let mut client = harness.connect();
    client.write_all(b"F").unwrap();
    assert_eq!(read_ack(&mut client), "OK\n");

    client.write_all(b"Z").unwrap();
    assert_eq!(read_ack(&mut client), "ERR\n");

    // Still driving forward, aux untouched
    assert_eq!(harness.drive_levels(), FORWARD);
    assert_eq!(harness.aux_levels(), [0, 0]);

    drop(client);
    wait_until("stop after disconnect", Duration::from_secs(5), || {
        harness.drive_levels() == STOPPED
    });
    harness.stop();
}

#[test]
fn disconnect_forces_stop_and_leaves_aux() {
    // Acks off here: this is the default-config shape of the protocol
    let harness = start_server(false, 5);

    let mut client = harness.connect();
    client.write_all(b"Q").unwrap();
    wait_until("aux1 on", Duration::from_secs(5), || {
        harness.aux_levels() == [1, 0]
    });

    client.write_all(b"L").unwrap();
    wait_until("rotate left", Duration::from_secs(5), || {
        harness.drive_levels() == ROTATE_LEFT
    });

    drop(client);
    wait_until("stop after disconnect", Duration::from_secs(5), || {
        harness.drive_levels() == STOPPED
    });
    // Dead-man stop only touches the drive pins
    assert_eq!(harness.aux_levels(), [1, 0]);
    harness.stop();
}

#[test]
fn silent_session_times_out_and_server_recovers() {
    let harness = start_server(true, 1);

    let mut first = harness.connect();
    first.write_all(b"F").unwrap();
    assert_eq!(read_ack(&mut first), "OK\n");

    // Say nothing past the dead-man window: motors must stop
    wait_until("stop after timeout", Duration::from_secs(5), || {
        harness.drive_levels() == STOPPED
    });

    // And the next client is served
    let mut second = harness.connect();
    second.write_all(b"B").unwrap();
    assert_eq!(read_ack(&mut second), "OK\n");
    assert_eq!(harness.drive_levels(), BACKWARD);

    drop(second);
    drop(first);
    wait_until("stop after disconnect", Duration::from_secs(5), || {
        harness.drive_levels() == STOPPED
    });
    harness.stop();
}

#[test]
fn only_first_chunk_character_is_significant() {
    let harness = start_server(true, 5);

    let mut client = harness.connect();
    client.write_all(b"Qq").unwrap();
    assert_eq!(read_ack(&mut client), "OK\n");

    // 'Q' executed, trailing 'q' discarded with the rest of the chunk
    assert_eq!(harness.aux_levels(), [1, 0]);
    assert_eq!(harness.drive_levels(), STOPPED);

    drop(client);
    harness.stop();
}

#[test]
fn no_acks_when_disabled() {
    let harness = start_server(false, 5);

    let mut client = harness.connect();
    client.write_all(b"F").unwrap();
    wait_until("forward", Duration::from_secs(5), || {
        harness.drive_levels() == FORWARD
    });

    // Nothing comes back on the wire
    client
        .set_read_timeout(Some(Duration::from_millis(300)))
        .unwrap();
    let mut buf = [0u8; 8];
    match client.read(&mut buf) {
        Ok(0) => panic!("server closed a healthy session"),
        Ok(n) => panic!("unexpected {} response bytes", n),
        Err(e) => assert!(
            matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            ),
            "unexpected error: {}",
            e
        ),
    }

    drop(client);
    wait_until("stop after disconnect", Duration::from_secs(5), || {
        harness.drive_levels() == STOPPED
    });
    harness.stop();
}

#[test]
fn undecodable_payload_ends_session_safely() {
    let harness = start_server(false, 5);

    let mut client = harness.connect();
    client.write_all(b"R").unwrap();
    wait_until("rotate right", Duration::from_secs(5), || {
        harness.drive_levels() == ROTATE_RIGHT
    });

    // Invalid UTF-8: transient connection error, session dropped, motors stopped
    client.write_all(&[0xFF, 0xC0, 0x80]).unwrap();
    wait_until("stop after bad payload", Duration::from_secs(5), || {
        harness.drive_levels() == STOPPED
    });

    // Server side has shut the connection down
    let mut buf = [0u8; 8];
    wait_until("peer close", Duration::from_secs(5), || {
        matches!(client.read(&mut buf), Ok(0) | Err(_))
    });

    // And keeps serving new clients
    let mut next = harness.connect();
    next.write_all(b"B").unwrap();
    wait_until("backward", Duration::from_secs(5), || {
        harness.drive_levels() == BACKWARD
    });

    drop(next);
    drop(client);
    wait_until("stop after disconnect", Duration::from_secs(5), || {
        harness.drive_levels() == STOPPED
    });
    harness.stop();
}
