use glam::{Mat3, Mat4, Vec3};

use crate::input::{InputFrame, InputState, Key, MouseButton};

/// Direction the point light's colour is currently fading in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FadeDirection {
    Down,
    Up,
}

/// A light as seen by shaders: a direction toward the light and a colour.
///
/// The directional light's vector is unit length. The point light's is not
/// normalized; it sits at `direction * orbit_radius` in world space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Light {
    pub direction: Vec3,
    pub color: Vec3,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LightRigConfig {
    pub directional: Light,
    pub point: Light,

    /// Milliseconds that map to one unit of animation time `t`.
    pub time_scale_ms: f32,
    /// Directional light orbit, radians per `t`.
    pub directional_orbit: f32,
    /// Point light orbit, radians per `t`.
    pub point_orbit: f32,
    /// Radians per pixel of mouse motion while steering.
    pub steer_rate: f32,

    /// Fade turns around once any channel is at or below this value...
    pub fade_low: f32,
    /// ...and turns back down once every channel is above this one.
    pub fade_high: f32,

    /// Distance of light markers (and the point light) from the origin.
    pub orbit_radius: f32,
    pub marker_scale: f32,
}

impl Default for LightRigConfig {
    fn default() -> Self {
        Self {
            directional: Light {
                direction: Vec3::new(-0.577, 0.577, -0.577),
                color: Vec3::splat(0.85),
            },
            point: Light {
                direction: Vec3::new(0.0, 0.2, -1.0),
                color: Vec3::new(0.7, 0.2, 0.2),
            },
            time_scale_ms: 1500.0,
            directional_orbit: 0.5,
            point_orbit: -2.0,
            steer_rate: -0.0125,
            fade_low: 0.01,
            fade_high: 0.8,
            orbit_radius: 5.0,
            marker_scale: 0.2,
        }
    }
}

/// The scene's two animated lights.
///
/// Light 0 is directional and slowly orbits the Y axis unless it is being
/// steered by hand. Light 1 is a point light orbiting faster in the opposite
/// direction while its colour fades down and up.
#[derive(Debug, Clone)]
pub struct LightRig {
    pub directional: Light,
    pub point: Light,
    fade: FadeDirection,
    steering: bool,
    config: LightRigConfig,
}

impl LightRig {
    pub fn new(config: LightRigConfig) -> Self {
        Self {
            directional: config.directional,
            point: config.point,
            fade: FadeDirection::Down,
            steering: false,
            config,
        }
    }

    pub fn config(&self) -> &LightRigConfig {
        &self.config
    }

    pub fn fade(&self) -> FadeDirection {
        self.fade
    }

    pub fn steering(&self) -> bool {
        self.steering
    }

    pub fn toggle_steering(&mut self) -> bool {
        self.steering = !self.steering;
        log::debug!("light steering {}", if self.steering { "on" } else { "off" });
        self.steering
    }

    /// Animation step for `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        let t = dt * 1000.0 / self.config.time_scale_ms;

        let c = &mut self.point.color;
        match self.fade {
            FadeDirection::Down => {
                *c -= Vec3::splat(t);
                if c.min_element() <= self.config.fade_low {
                    self.fade = FadeDirection::Up;
                }
            }
            FadeDirection::Up => {
                *c += Vec3::splat(t);
                if c.cmpgt(Vec3::splat(self.config.fade_high)).all() {
                    self.fade = FadeDirection::Down;
                }
            }
        }

        if !self.steering {
            self.directional.direction =
                rotate_y(self.directional.direction, self.config.directional_orbit * t);
        }
        self.point.direction = rotate_y(self.point.direction, self.config.point_orbit * t);
    }

    /// Rotates the directional light by mouse motion. No-op unless steering is on.
    pub fn steer(&mut self, dx: f32, dy: f32) {
        if !self.steering {
            return;
        }
        let angle = self.config.steer_rate * (dx + dy);
        if angle != 0.0 {
            self.directional.direction = rotate_y(self.directional.direction, angle);
        }
    }

    /// Per-frame control handling: Z toggles steering, LMB + mouse motion steers.
    pub fn update(&mut self, input: &InputState, frame: &InputFrame, dt: f32) {
        if frame.key_pressed(Key::Z) {
            self.toggle_steering();
        }
        if input.button_down(MouseButton::Left) {
            let (dx, dy) = frame.mouse_delta;
            self.steer(dx, dy);
        }
        self.step(dt);
    }

    /// World-space position of the point light.
    pub fn point_position(&self) -> Vec3 {
        self.point.direction * self.config.orbit_radius
    }

    /// Marker transform for a light: scaled down, then pushed out along its direction.
    pub fn marker_transform(&self, light: &Light) -> Mat4 {
        Mat4::from_translation(light.direction * self.config.orbit_radius)
            * Mat4::from_scale(Vec3::splat(self.config.marker_scale))
    }
}

impl Default for LightRig {
    fn default() -> Self {
        Self::new(LightRigConfig::default())
    }
}

fn rotate_y(v: Vec3, angle: f32) -> Vec3 {
    Mat3::from_rotation_y(angle) * v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputEvent, KeyState, Modifiers, MouseButtonState, PointerButtonEvent};

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn default_rig_matches_initial_lights() {
        let rig = LightRig::default();
        assert_eq!(rig.directional.color, Vec3::splat(0.85));
        assert_eq!(rig.point.color, Vec3::new(0.7, 0.2, 0.2));
        assert_eq!(rig.fade(), FadeDirection::Down);
        assert!(!rig.steering());
    }

    #[test]
    fn point_colour_fades_down_then_up() {
        let mut rig = LightRig::default();

        // 150 ms -> t = 0.1
        rig.step(0.15);
        assert!(close(rig.point.color.x, 0.6));
        assert!(close(rig.point.color.y, 0.1));
        assert_eq!(rig.fade(), FadeDirection::Down);

        // Green channel reaches zero; fade turns around.
        rig.step(0.15);
        assert_eq!(rig.fade(), FadeDirection::Up);
        assert!(rig.point.color.y <= 0.01);

        // Keeps rising until every channel clears the upper bound.
        let mut steps = 0;
        while rig.fade() == FadeDirection::Up {
            rig.step(0.15);
            steps += 1;
            assert!(steps < 100);
        }
        assert!(rig.point.color.min_element() > 0.8);
    }

    #[test]
    fn lights_orbit_in_opposite_directions() {
        let mut rig = LightRig::default();
        let d0 = rig.directional.direction;
        let p0 = rig.point.direction;

        rig.step(1.5); // t = 1
        let d1 = rig.directional.direction;
        let p1 = rig.point.direction;

        // Rotation about Y keeps height and length.
        assert!(close(d1.y, d0.y));
        assert!(close(d1.length(), d0.length()));
        assert!(close(p1.y, p0.y));

        let angle = |a: Vec3, b: Vec3| a.z.atan2(a.x) - b.z.atan2(b.x);
        let da = angle(d1, d0).rem_euclid(std::f32::consts::TAU);
        let pa = angle(p1, p0).rem_euclid(std::f32::consts::TAU);
        // glam's rotation_y(+a) turns +X toward -Z, so z/x angle decreases.
        assert!(close(da, std::f32::consts::TAU - 0.5));
        assert!(close(pa, 2.0));
    }

    #[test]
    fn steering_freezes_directional_orbit() {
        let mut rig = LightRig::default();
        rig.toggle_steering();
        let before = rig.directional.direction;
        rig.step(1.0);
        assert_eq!(rig.directional.direction, before);

        rig.steer(10.0, 0.0);
        assert!(rig.directional.direction != before);
    }

    #[test]
    fn steer_is_ignored_when_not_steering() {
        let mut rig = LightRig::default();
        let before = rig.directional.direction;
        rig.steer(100.0, 100.0);
        assert_eq!(rig.directional.direction, before);
    }

    #[test]
    fn z_key_toggles_steering() {
        let mut rig = LightRig::default();
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(
            &mut frame,
            InputEvent::Key {
                key: Key::Z,
                state: KeyState::Pressed,
                modifiers: Modifiers::default(),
                code: 0,
                repeat: false,
            },
        );
        rig.update(&state, &frame, 0.0);
        assert!(rig.steering());

        frame.clear();
        rig.update(&state, &frame, 0.0);
        assert!(rig.steering());
    }

    #[test]
    fn steer_turns_by_rate_times_motion() {
        let mut rig = LightRig::default();
        rig.toggle_steering();
        let before = rig.directional.direction;

        rig.steer(6.0, 4.0);
        let expected = Mat3::from_rotation_y(-0.125) * before;
        assert!((rig.directional.direction - expected).length() < 1e-5);
    }

    #[test]
    fn steering_needs_left_button() {
        let mut rig = LightRig::default();
        rig.toggle_steering();
        let before = rig.directional.direction;

        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, InputEvent::MouseMotion { dx: 6.0, dy: 4.0 });
        rig.update(&state, &frame, 0.0);
        assert_eq!(rig.directional.direction, before);

        state.apply_event(
            &mut frame,
            InputEvent::PointerButton(PointerButtonEvent {
                button: MouseButton::Left,
                state: MouseButtonState::Pressed,
                x: 0.0,
                y: 0.0,
                modifiers: Modifiers::default(),
            }),
        );
        rig.update(&state, &frame, 0.0);
        let expected = Mat3::from_rotation_y(-0.125) * before;
        assert!((rig.directional.direction - expected).length() < 1e-5);
    }

    #[test]
    fn marker_sits_at_orbit_radius() {
        let rig = LightRig::default();
        let m = rig.marker_transform(&rig.point);
        let centre = m.transform_point3(Vec3::ZERO);
        assert!((centre - Vec3::new(0.0, 1.0, -5.0)).length() < 1e-5);

        let corner = m.transform_point3(Vec3::ONE);
        assert!(((corner - centre) - Vec3::splat(0.2)).length() < 1e-5);
        assert_eq!(rig.point_position(), centre);
    }
}
