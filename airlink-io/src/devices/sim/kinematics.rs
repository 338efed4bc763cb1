//! Kinematic integration for the simulated multirotor
//!
//! No dynamics: commanded velocities apply instantly and hold for the
//! commanded duration. Frame is NED with the ground at z = 0.

/// Active translation command
#[derive(Debug, Clone, Copy)]
struct Translation {
    velocity: [f32; 3],
    remaining_s: f32,
}

/// Active yaw-rate command
#[derive(Debug, Clone, Copy)]
struct Rotation {
    rate_deg: f32,
    remaining_s: f32,
}

/// Position, heading and the commands driving them
#[derive(Debug, Clone)]
pub struct Kinematics {
    position: [f32; 3],
    velocity: [f32; 3],
    acceleration: [f32; 3],
    yaw_deg: f32,
    yaw_rate_deg: f32,
    translation: Option<Translation>,
    rotation: Option<Rotation>,
}

impl Default for Kinematics {
    fn default() -> Self {
        Self::new()
    }
}

impl Kinematics {
    /// At rest on the ground at the origin, nose north
    pub fn new() -> Self {
        Self {
            position: [0.0; 3],
            velocity: [0.0; 3],
            acceleration: [0.0; 3],
            yaw_deg: 0.0,
            yaw_rate_deg: 0.0,
            translation: None,
            rotation: None,
        }
    }

    #[inline]
    pub fn position(&self) -> [f32; 3] {
        self.position
    }

    #[inline]
    pub fn velocity(&self) -> [f32; 3] {
        self.velocity
    }

    #[inline]
    pub fn acceleration(&self) -> [f32; 3] {
        self.acceleration
    }

    /// Heading in degrees, clockwise from north, in (-180, 180]
    #[inline]
    pub fn yaw_deg(&self) -> f32 {
        self.yaw_deg
    }

    #[inline]
    pub fn yaw_rate_deg(&self) -> f32 {
        self.yaw_rate_deg
    }

    pub fn set_yaw_deg(&mut self, yaw: f32) {
        self.yaw_deg = wrap_deg(yaw);
    }

    /// Fly at `velocity` for `duration_s`, replacing any active translation
    pub fn command_velocity(&mut self, velocity: [f32; 3], duration_s: f32) {
        self.translation = (duration_s > 0.0).then_some(Translation {
            velocity,
            remaining_s: duration_s,
        });
    }

    /// Turn at `rate_deg` for `duration_s`, replacing any active rotation
    pub fn command_yaw_rate(&mut self, rate_deg: f32, duration_s: f32) {
        self.rotation = (duration_s > 0.0).then_some(Rotation {
            rate_deg,
            remaining_s: duration_s,
        });
    }

    /// Cancel all motion
    pub fn hold(&mut self) {
        self.translation = None;
        self.rotation = None;
        self.velocity = [0.0; 3];
        self.yaw_rate_deg = 0.0;
    }

    /// True while a translation or rotation is running
    pub fn is_moving(&self) -> bool {
        self.translation.is_some() || self.rotation.is_some()
    }

    /// Advance by `dt` seconds of simulated time
    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let previous_velocity = self.velocity;

        self.velocity = [0.0; 3];
        if let Some(t) = self.translation.as_mut() {
            let active = dt.min(t.remaining_s);
            for (p, v) in self.position.iter_mut().zip(t.velocity) {
                *p += v * active;
            }
            t.remaining_s -= active;
            if t.remaining_s > 0.0 {
                self.velocity = t.velocity;
            } else {
                self.translation = None;
            }
        }

        self.yaw_rate_deg = 0.0;
        if let Some(r) = self.rotation.as_mut() {
            let active = dt.min(r.remaining_s);
            self.yaw_deg = wrap_deg(self.yaw_deg + r.rate_deg * active);
            r.remaining_s -= active;
            if r.remaining_s > 0.0 {
                self.yaw_rate_deg = r.rate_deg;
            } else {
                self.rotation = None;
            }
        }

        // Ground
        if self.position[2] > 0.0 {
            self.position[2] = 0.0;
            self.velocity[2] = self.velocity[2].min(0.0);
        }

        for i in 0..3 {
            self.acceleration[i] = (self.velocity[i] - previous_velocity[i]) / dt;
        }
    }
}

/// Wrap an angle in degrees to (-180, 180]
pub fn wrap_deg(angle: f32) -> f32 {
    let mut a = angle % 360.0;
    if a > 180.0 {
        a -= 360.0;
    } else if a <= -180.0 {
        a += 360.0;
    }
    a
}
