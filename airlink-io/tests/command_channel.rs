//! Command channel over loopback with the simulated drone

use airlink_io::config::{ManeuverConfig, SimulationConfig};
use airlink_io::core::driver::share;
use airlink_io::core::types::{CameraId, CameraRequest, Command, FlightParams, Method, Reply};
use airlink_io::core::wire::{COMMAND_LEN, REPLY_LEN, decode_reply, encode_command};
use airlink_io::devices::sim::SimDrone;
use airlink_io::pilot::Pilot;
use airlink_io::streaming::framing::{MAX_COMMAND_FRAME, read_frame, write_frame};
use airlink_io::streaming::{CommandChannel, Dispatcher, VideoControl};
use airlink_io::telemetry::TelemetrySnapshotBuilder;
use std::io::Read;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

struct Daemon {
    addr: SocketAddr,
    running: Arc<AtomicBool>,
    video: Arc<VideoControl>,
    handle: Option<JoinHandle<()>>,
}

impl Daemon {
    fn start() -> Self {
        Self::start_with_speed(1000.0)
    }

    /// Lower `speed_factor` makes maneuvers take real wall-clock time
    fn start_with_speed(speed_factor: f32) -> Self {
        let sim = SimDrone::new(SimulationConfig {
            speed_factor,
            random_seed: 3,
            ..SimulationConfig::default()
        });
        let flight = share(Box::new(sim));
        let video = Arc::new(VideoControl::new());
        let running = Arc::new(AtomicBool::new(true));

        let pilot = Pilot::new(Arc::clone(&flight), ManeuverConfig::default(), speed_factor);
        let dispatcher = Dispatcher::new(
            pilot,
            TelemetrySnapshotBuilder::new(flight),
            Arc::clone(&video),
        );
        let mut channel = CommandChannel::bind(
            "127.0.0.1:0",
            dispatcher,
            Arc::clone(&running),
            MAX_COMMAND_FRAME,
        )
        .unwrap();
        let addr = channel.local_addr().unwrap();
        let handle = thread::spawn(move || channel.run().unwrap());

        Self {
            addr,
            running,
            video,
            handle: Some(handle),
        }
    }

    fn connect(&self) -> TcpStream {
        let stream = TcpStream::connect(self.addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
    }
}

fn command(method: Method) -> Command {
    Command::new(method, &FlightParams::default(), &CameraRequest::default())
}

fn request(stream: &mut TcpStream, cmd: &Command) -> Reply {
    write_frame(stream, &encode_command(cmd)).unwrap();
    let bytes = read_frame(stream, 4096).unwrap().expect("reply");
    assert_eq!(bytes.len(), REPLY_LEN);
    decode_reply(&bytes).unwrap()
}

#[test]
fn connect_then_fly_then_query() {
    let daemon = Daemon::start();
    let mut stream = daemon.connect();

    let reply = request(&mut stream, &command(Method::Connect));
    assert_eq!(reply, Reply::empty(Method::Connect));

    assert_eq!(request(&mut stream, &command(Method::Arm)).method, Method::Arm);
    let takeoff = request(&mut stream, &command(Method::Takeoff));
    assert_eq!(takeoff.method, Method::Takeoff);
    assert!(takeoff.gps.is_valid);
    assert!(takeoff.barometer.altitude > 124.0);

    let up = request(&mut stream, &command(Method::Up));
    assert_eq!(up.method, Method::Up);
    assert!(up.barometer.altitude > takeoff.barometer.altitude + 0.5);

    let gps = request(&mut stream, &command(Method::GpsData));
    assert_eq!(gps.method, Method::GpsData);
    assert!(gps.gps.latitude != 0.0);
}

#[test]
fn replies_follow_request_order() {
    let daemon = Daemon::start();
    let mut stream = daemon.connect();
    request(&mut stream, &command(Method::Connect));

    // Pipeline several requests; replies still come back one per request, in order
    let methods = [
        Method::BarometerData,
        Method::ImuData,
        Method::MagnetometerData,
        Method::GpsData,
    ];
    for m in methods {
        write_frame(&mut stream, &encode_command(&command(m))).unwrap();
    }
    for m in methods {
        let bytes = read_frame(&mut stream, 4096).unwrap().unwrap();
        assert_eq!(decode_reply(&bytes).unwrap().method, m);
    }
}

#[test]
fn malformed_buffer_is_dropped_without_reply() {
    let daemon = Daemon::start();
    let mut stream = daemon.connect();

    let good = encode_command(&command(Method::Connect));
    write_frame(&mut stream, &good[..COMMAND_LEN - 3]).unwrap();

    let mut bad_method = encode_command(&command(Method::Connect));
    bad_method[0..4].copy_from_slice(&99u32.to_le_bytes());
    write_frame(&mut stream, &bad_method).unwrap();

    // First reply seen belongs to the next well-formed command
    let reply = request(&mut stream, &command(Method::BarometerData));
    assert_eq!(reply.method, Method::BarometerData);
}

#[test]
fn failed_maneuver_gets_empty_reply() {
    let daemon = Daemon::start();
    let mut stream = daemon.connect();
    request(&mut stream, &command(Method::Connect));

    // Not airborne: the move fails, the reply is still full length
    let reply = request(&mut stream, &command(Method::Forward));
    assert_eq!(reply, Reply::empty(Method::Forward));

    // Channel keeps serving
    let reply = request(&mut stream, &command(Method::ImuData));
    assert_eq!(reply.method, Method::ImuData);
}

#[test]
fn camera_request_reaches_video_control() {
    let daemon = Daemon::start();
    let mut stream = daemon.connect();
    let cmd = Command::new(
        Method::Connect,
        &FlightParams::default(),
        &CameraRequest {
            enabled: true,
            camera: CameraId::BottomCenter,
        },
    );
    request(&mut stream, &cmd);
    assert!(daemon.video.enabled());
    assert_eq!(daemon.video.camera(), CameraId::BottomCenter);

    request(&mut stream, &command(Method::Connect));
    assert!(!daemon.video.enabled());
}

#[test]
fn second_operator_is_rejected() {
    let daemon = Daemon::start();
    let mut first = daemon.connect();
    request(&mut first, &command(Method::Connect));

    let mut second = daemon.connect();
    let mut buf = [0u8; 1];
    let n = second.read(&mut buf).unwrap_or(0);
    assert_eq!(n, 0);

    // First session unaffected
    assert_eq!(
        request(&mut first, &command(Method::GpsData)).method,
        Method::GpsData
    );
}

#[test]
fn new_session_after_disconnect() {
    let daemon = Daemon::start();
    {
        let mut first = daemon.connect();
        request(&mut first, &command(Method::Connect));
    }
    thread::sleep(Duration::from_millis(200));
    let mut second = daemon.connect();
    assert_eq!(
        request(&mut second, &command(Method::Connect)).method,
        Method::Connect
    );
}

#[test]
fn operator_reconnect_during_maneuver_is_served() {
    // Takeoff settles for 5 s of simulated time: 0.5 s here
    let daemon = Daemon::start_with_speed(10.0);
    let mut first = daemon.connect();
    request(&mut first, &command(Method::Connect));
    request(&mut first, &command(Method::Arm));

    // Give up on the takeoff reply and reconnect at once, the way a client
    // does after its reply deadline passes
    write_frame(&mut first, &encode_command(&command(Method::Takeoff))).unwrap();
    thread::sleep(Duration::from_millis(100));
    first.shutdown(Shutdown::Both).unwrap();
    drop(first);

    let mut second = daemon.connect();
    let reply = request(&mut second, &command(Method::GpsData));
    assert_eq!(reply.method, Method::GpsData);
    assert!(reply.gps.is_valid);
}
