//! Video relay TCP sink against a loopback listener

use airlink_io::streaming::framing::{MAX_VIDEO_FRAME, read_frame};
use airlink_io::streaming::{FrameSink, TcpFrameSink};
use std::net::TcpListener;
use std::time::Duration;

#[test]
fn sink_connects_lazily_and_frames_payloads() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let mut sink = TcpFrameSink::new(addr.to_string(), Duration::from_millis(500), MAX_VIDEO_FRAME);

    sink.send(b"frame-one").unwrap();
    sink.send(b"frame-two").unwrap();

    let (mut conn, _) = listener.accept().unwrap();
    conn.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    assert_eq!(read_frame(&mut conn, MAX_VIDEO_FRAME).unwrap().unwrap(), b"frame-one");
    assert_eq!(read_frame(&mut conn, MAX_VIDEO_FRAME).unwrap().unwrap(), b"frame-two");
}

#[test]
fn sink_reconnects_after_peer_restart() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let mut sink = TcpFrameSink::new(addr.to_string(), Duration::from_millis(500), MAX_VIDEO_FRAME);

    sink.send(b"before").unwrap();
    let (conn, _) = listener.accept().unwrap();
    drop(conn);

    // Writes into a closed socket fail eventually; the sink then drops the stream
    let mut failed = false;
    for _ in 0..50 {
        if sink.send(&[7u8; 4096]).is_err() {
            failed = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(failed);

    sink.send(b"after").unwrap();
    let (mut conn, _) = listener.accept().unwrap();
    conn.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    assert_eq!(read_frame(&mut conn, MAX_VIDEO_FRAME).unwrap().unwrap(), b"after");
}

#[test]
fn sink_reports_unreachable_console() {
    // Bind then drop to get a port with nobody listening
    let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let mut sink = TcpFrameSink::new(addr.to_string(), Duration::from_millis(200), MAX_VIDEO_FRAME);
    assert!(sink.send(b"lost").is_err());
}
