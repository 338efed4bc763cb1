//! Detection relay client against a scripted loopback service

use airlink_console::correction::CorrectionConfig;
use airlink_console::detection::{DetectionRelayClient, MAGIC};
use airlink_console::shared::{OperatorSettings, SharedState};
use airlink_console::threads::DetectionThread;
use airlink_io::core::types::{Frame, Method};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// What the fake service does with one request
enum Reply {
    Json(&'static str),
    /// Read the request, then close without answering
    Hangup,
    BadMagic,
}

fn read_request(stream: &mut TcpStream) -> Vec<u8> {
    let mut header = [0u8; 6];
    stream.read_exact(&mut header).unwrap();
    assert_eq!(header[..2], MAGIC);
    let len = u32::from_be_bytes([header[2], header[3], header[4], header[5]]) as usize;
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).unwrap();
    payload
}

fn write_response(stream: &mut TcpStream, magic: [u8; 2], body: &[u8]) {
    let mut out = magic.to_vec();
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(body);
    stream.write_all(&out).unwrap();
}

/// Serve each connection's script in turn; returns the payloads received
fn service(connections: Vec<Vec<Reply>>) -> (String, JoinHandle<Vec<Vec<u8>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        for script in connections {
            let (mut stream, _) = listener.accept().unwrap();
            for reply in script {
                seen.push(read_request(&mut stream));
                match reply {
                    Reply::Json(body) => write_response(&mut stream, MAGIC, body.as_bytes()),
                    Reply::BadMagic => write_response(&mut stream, [0xDE, 0xAD], b"{}"),
                    Reply::Hangup => break,
                }
            }
        }
        seen
    });
    (addr, handle)
}

fn client(addr: &str) -> DetectionRelayClient {
    DetectionRelayClient::new(addr, Duration::from_millis(500), Duration::from_secs(2))
}

const HIT: &str = r#"{"center_px":{"x":320,"y":240},"object_px":{"x":250,"y":240},
    "polar_coordinates":{"r_px":70.0,"theta_deg":180.0},"image_size":{"width":640,"height":480}}"#;
const MISS: &str = r#"{"center_px":{"x":320,"y":240},"object_px":null}"#;

#[test]
fn detection_and_no_detection() {
    let (addr, handle) = service(vec![vec![Reply::Json(HIT), Reply::Json(MISS)]]);
    let mut client = client(&addr);

    let hit = client.detect(b"frame-1").unwrap().unwrap();
    assert_eq!(hit.object_px.x, 250.0);
    assert_eq!(hit.image_size.width, 640);

    assert!(client.detect(b"frame-2").unwrap().is_none());
    assert!(client.is_connected());

    drop(client);
    let seen = handle.join().unwrap();
    assert_eq!(seen, vec![b"frame-1".to_vec(), b"frame-2".to_vec()]);
}

#[test]
fn reconnects_after_mid_round_trip_drop() {
    let (addr, handle) = service(vec![vec![Reply::Hangup], vec![Reply::Json(HIT)]]);
    let mut client = client(&addr);

    assert!(client.detect(b"lost").is_err());
    assert!(!client.is_connected());

    let hit = client.detect(b"retry").unwrap();
    assert!(hit.is_some());

    drop(client);
    assert_eq!(handle.join().unwrap().len(), 2);
}

#[test]
fn bad_magic_drops_connection() {
    let (addr, handle) = service(vec![vec![Reply::BadMagic], vec![Reply::Json(MISS)]]);
    let mut client = client(&addr);

    assert!(client.detect(b"one").is_err());
    assert!(!client.is_connected());
    assert!(client.detect(b"two").unwrap().is_none());

    drop(client);
    handle.join().unwrap();
}

#[test]
fn unreachable_service_is_an_error() {
    let addr = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .to_string();
    let mut client = client(&addr);
    assert!(client.detect(b"frame").is_err());
    assert!(!client.is_connected());
}

/// Push one frame through a detection thread and wait for it to finish
fn run_detection_thread(addr: &str, policy: CorrectionConfig) -> Arc<SharedState> {
    let state = Arc::new(SharedState::new(OperatorSettings::default()));
    let (tx, rx) = crossbeam_channel::bounded(1);
    let mut worker = DetectionThread::new(client(addr), policy, Arc::clone(&state), rx);
    let handle = thread::spawn(move || worker.run());

    tx.send(Frame::new(b"jpeg".to_vec())).unwrap();
    // Closing the channel ends the thread once the frame is handled
    drop(tx);
    handle.join().unwrap();
    state
}

#[test]
fn off_center_target_queues_a_correction() {
    let (addr, service) = service(vec![vec![Reply::Json(HIT)]]);
    let state = run_detection_thread(&addr, CorrectionConfig::default());
    service.join().unwrap();

    // Object 70 px left of center: slow left turn
    let cmd = state.slot.take().expect("correction queued");
    assert_eq!(cmd.method, Method::RotateLeft);
    assert!(cmd.yaw_is_rate);
    assert_eq!(cmd.yaw_or_rate, CorrectionConfig::default().low_yaw_rate);
    assert_eq!(state.corrections.load(Ordering::Relaxed), 1);
}

#[test]
fn disabled_corrections_leave_the_slot_empty() {
    let (addr, service) = service(vec![vec![Reply::Json(HIT)]]);
    let policy = CorrectionConfig {
        enabled: false,
        ..CorrectionConfig::default()
    };
    let state = run_detection_thread(&addr, policy);
    service.join().unwrap();

    assert!(state.slot.is_empty());
    assert_eq!(state.corrections.load(Ordering::Relaxed), 0);
}

#[test]
fn failed_round_trip_leaves_the_slot_empty() {
    let (addr, service) = service(vec![vec![Reply::Hangup]]);
    let state = run_detection_thread(&addr, CorrectionConfig::default());
    service.join().unwrap();

    assert!(state.slot.is_empty());
    assert_eq!(state.corrections.load(Ordering::Relaxed), 0);
}
