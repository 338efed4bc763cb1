//! Synthetic camera frames
//!
//! Each camera renders a JPEG test pattern from the vehicle's pose so that
//! downstream consumers see frames that change as the vehicle moves:
//!
//! | Camera        | Scene                                              |
//! |---------------|----------------------------------------------------|
//! | front_*       | Horizon plus a red beacon at a fixed world bearing |
//! | back_center   | Horizon only                                       |
//! | bottom_center | Ground checkerboard scrolling with position        |

use crate::core::types::CameraId;
use crate::error::{Error, Result};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// Horizontal field of view of every camera (deg)
const HFOV_DEG: f32 = 90.0;
/// Beacon bearing, clockwise from north (deg)
const BEACON_BEARING_DEG: f32 = 0.0;
/// Beacon altitude above ground (m)
const BEACON_HEIGHT_M: f32 = 3.0;
/// Beacon half-size (px)
const BEACON_RADIUS_PX: i64 = 6;
/// Ground checker size (m)
const CHECKER_M: f32 = 1.0;

const SKY: Rgb<u8> = Rgb([120, 170, 230]);
const GROUND: Rgb<u8> = Rgb([90, 120, 70]);
const GROUND_DARK: Rgb<u8> = Rgb([60, 85, 50]);
const BEACON: Rgb<u8> = Rgb([230, 30, 30]);

/// Pose the frame is rendered from
#[derive(Debug, Clone, Copy)]
pub struct CameraPose {
    /// NED position (m)
    pub position: [f32; 3],
    pub yaw_deg: f32,
}

/// Mounting yaw of each camera relative to the nose (deg)
fn mount_yaw(camera: CameraId) -> f32 {
    match camera {
        CameraId::FrontCenter | CameraId::BottomCenter => 0.0,
        CameraId::FrontRight => 30.0,
        CameraId::FrontLeft => -30.0,
        CameraId::BackCenter => 180.0,
    }
}

/// Render and JPEG-encode one frame
pub fn render(camera: CameraId, pose: &CameraPose, width: u32, height: u32) -> Result<Vec<u8>> {
    let img = match camera {
        CameraId::BottomCenter => render_ground(pose, width, height),
        _ => render_horizon(camera, pose, width, height),
    };

    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Jpeg)
        .map_err(|e| Error::Flight(format!("JPEG encode failed: {}", e)))?;
    Ok(out.into_inner())
}

/// Pixel column of the beacon, if it is inside the field of view
pub fn beacon_column(camera: CameraId, yaw_deg: f32, width: u32) -> Option<i64> {
    if camera == CameraId::BackCenter || camera == CameraId::BottomCenter {
        return None;
    }
    let heading = yaw_deg + mount_yaw(camera);
    let offset = super::kinematics::wrap_deg(BEACON_BEARING_DEG - heading);
    if offset.abs() > HFOV_DEG / 2.0 {
        return None;
    }
    let half = width as f32 / 2.0;
    Some((half + offset / (HFOV_DEG / 2.0) * half) as i64)
}

fn render_horizon(camera: CameraId, pose: &CameraPose, width: u32, height: u32) -> RgbImage {
    let altitude = -pose.position[2];
    // Horizon drops slightly as the vehicle climbs
    let horizon = (height as f32 * (0.5 + (altitude * 0.01).min(0.3))) as u32;

    let mut img = RgbImage::from_fn(width, height, |_, y| if y < horizon { SKY } else { GROUND });

    if let Some(col) = beacon_column(camera, pose.yaw_deg, width) {
        // Beacon rises in the frame while the vehicle is below it
        let px_per_m = height as f32 / 10.0;
        let row = (height as f32 / 2.0 + (altitude - BEACON_HEIGHT_M) * px_per_m) as i64;
        for dy in -BEACON_RADIUS_PX..=BEACON_RADIUS_PX {
            for dx in -BEACON_RADIUS_PX..=BEACON_RADIUS_PX {
                let (x, y) = (col + dx, row + dy);
                if x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height {
                    img.put_pixel(x as u32, y as u32, BEACON);
                }
            }
        }
    }
    img
}

fn render_ground(pose: &CameraPose, width: u32, height: u32) -> RgbImage {
    let altitude = (-pose.position[2]).max(0.5);
    // Ground footprint grows with altitude
    let m_per_px = altitude / width as f32;
    let (north, east) = (pose.position[0], pose.position[1]);
    let (sin_y, cos_y) = pose.yaw_deg.to_radians().sin_cos();

    RgbImage::from_fn(width, height, |x, y| {
        let right = (x as f32 - width as f32 / 2.0) * m_per_px;
        let fwd = (height as f32 / 2.0 - y as f32) * m_per_px;
        let n = north + fwd * cos_y - right * sin_y;
        let e = east + fwd * sin_y + right * cos_y;
        let cell = (n / CHECKER_M).floor() as i64 + (e / CHECKER_M).floor() as i64;
        if cell.rem_euclid(2) == 0 {
            GROUND
        } else {
            GROUND_DARK
        }
    })
}
