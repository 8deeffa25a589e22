use glam::{Mat4, Vec3};

use crate::input::{InputFrame, InputState, Key, MouseButton};

/// Camera tuning constants.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraConfig {
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    /// Translation speed in world units per second.
    pub move_speed: f32,
    /// Q/E turn rate in radians per second.
    pub turn_speed: f32,
    /// Radians of rotation per unit of raw mouse motion.
    pub look_sensitivity: f32,
    /// Maximum absolute pitch in radians. Must stay below 90°.
    pub pitch_limit: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y: std::f32::consts::FRAC_PI_2,
            near: 0.01,
            far: 100.0,
            move_speed: 6.0,
            turn_speed: 3.0,
            look_sensitivity: 0.0025,
            pitch_limit: 89.0_f32.to_radians(),
        }
    }
}

/// Immutable camera snapshot consumed by renderers.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraView {
    pub view: Mat4,
    pub proj: Mat4,
    pub eye: Vec3,
}

impl CameraView {
    /// Fixed camera at `eye` looking at `target`.
    pub fn look_at(eye: Vec3, target: Vec3, fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        // look_at with a vertical forward degenerates; nudge the up vector.
        let forward = (target - eye).normalize_or_zero();
        let up = if forward.cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };

        Self {
            view: Mat4::look_at_rh(eye, target, up),
            proj: Mat4::perspective_rh(fov_y, aspect.max(f32::EPSILON), near, far),
            eye,
        }
    }

    pub fn view_proj(&self) -> Mat4 {
        self.proj * self.view
    }
}

/// First-person fly camera.
///
/// Orientation is stored as yaw/pitch and rebuilt every frame. Yaw turns about
/// world +Y, pitch about the camera's right axis; pitch is clamped short of the
/// poles, so repeated mouse deltas never accumulate roll.
///
/// Yaw 0 / pitch 0 looks down world +Z.
#[derive(Debug, Clone)]
pub struct FlyCamera {
    pub position: Vec3,
    yaw: f32,
    pitch: f32,
    config: CameraConfig,
}

impl FlyCamera {
    /// Starting pose: one unit up, five units back, looking toward the origin column.
    pub fn new(config: CameraConfig) -> Self {
        Self::looking_at(Vec3::new(0.0, 1.0, -5.0), Vec3::new(0.0, 1.0, 0.0), config)
    }

    pub fn looking_at(eye: Vec3, target: Vec3, config: CameraConfig) -> Self {
        let mut cam = Self {
            position: eye,
            yaw: 0.0,
            pitch: 0.0,
            config,
        };
        cam.face(target - eye);
        cam
    }

    /// Points the camera along `dir`. Zero-length directions are ignored.
    pub fn face(&mut self, dir: Vec3) {
        let Some(d) = dir.try_normalize() else { return };
        self.yaw = d.x.atan2(d.z);
        self.pitch = d.y.clamp(-1.0, 1.0).asin();
        self.clamp_pitch();
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(sy * cp, sp, cy * cp)
    }

    /// Screen-right in world space (horizontal, never affected by pitch).
    pub fn right(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        Vec3::new(-cy, 0.0, sy)
    }

    pub fn up(&self) -> Vec3 {
        self.right().cross(self.forward())
    }

    /// Applies raw mouse motion. Positive `dx` turns right, positive `dy` looks down.
    pub fn look(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * self.config.look_sensitivity;
        self.pitch -= dy * self.config.look_sensitivity;
        self.yaw = wrap_angle(self.yaw);
        self.clamp_pitch();
    }

    /// Rotates about world +Y; positive turns left.
    pub fn turn(&mut self, radians: f32) {
        self.yaw = wrap_angle(self.yaw + radians);
    }

    /// Moves along the view direction, screen-right and world-up.
    pub fn translate_local(&mut self, forward: f32, right: f32, up: f32) {
        self.position += self.forward() * forward + self.right() * right + Vec3::Y * up;
    }

    /// Per-frame control handling.
    ///
    /// - right mouse held + mouse motion: look around
    /// - W/S: forward/back, A/D: strafe, Space/C: up/down
    /// - Q/E: quick turn left/right
    pub fn update(&mut self, input: &InputState, frame: &InputFrame, dt: f32) {
        if input.button_down(MouseButton::Right) {
            let (dx, dy) = frame.mouse_delta;
            self.look(dx, dy);
        }

        let turn = input.axis(Key::E, Key::Q);
        if turn != 0.0 {
            self.turn(turn * self.config.turn_speed * dt);
        }

        let step = self.config.move_speed * dt;
        let forward = input.axis(Key::S, Key::W);
        let right = input.axis(Key::A, Key::D);
        let up = input.axis(Key::C, Key::Space);

        if forward != 0.0 || right != 0.0 || up != 0.0 {
            self.translate_local(forward * step, right * step, up * step);
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), Vec3::Y)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(
            self.config.fov_y,
            aspect.max(f32::EPSILON),
            self.config.near,
            self.config.far,
        )
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view_matrix()
    }

    pub fn view(&self, aspect: f32) -> CameraView {
        CameraView {
            view: self.view_matrix(),
            proj: self.projection(aspect),
            eye: self.position,
        }
    }

    fn clamp_pitch(&mut self) {
        let limit = self.config.pitch_limit;
        self.pitch = self.pitch.clamp(-limit, limit);
    }
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}

fn wrap_angle(a: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    (a + PI).rem_euclid(TAU) - PI
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputEvent, KeyState, Modifiers, MouseButtonState, PointerButtonEvent};

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    fn press(state: &mut InputState, frame: &mut InputFrame, key: Key) {
        state.apply_event(
            frame,
            InputEvent::Key {
                key,
                state: KeyState::Pressed,
                modifiers: Modifiers::default(),
                code: 0,
                repeat: false,
            },
        );
    }

    #[test]
    fn starts_looking_down_positive_z() {
        let cam = FlyCamera::default();
        assert!(approx(cam.position, Vec3::new(0.0, 1.0, -5.0)));
        assert!(approx(cam.forward(), Vec3::Z));
        // Right-handed: facing +Z, screen-right is -X.
        assert!(approx(cam.right(), Vec3::NEG_X));
        assert!(approx(cam.up(), Vec3::Y));
    }

    #[test]
    fn view_matrix_maps_target_onto_negative_z() {
        let cam = FlyCamera::default();
        let p = cam.view_matrix().transform_point3(Vec3::new(0.0, 1.0, 0.0));
        assert!(approx(p, Vec3::new(0.0, 0.0, -5.0)));
    }

    #[test]
    fn pitch_is_clamped_below_the_pole() {
        let mut cam = FlyCamera::default();
        cam.look(0.0, -1.0e6);
        assert!((cam.pitch() - cam.config().pitch_limit).abs() < 1e-6);
        assert!(cam.forward().y < 1.0);
        assert!(cam.right().length() > 0.99);
    }

    #[test]
    fn mouse_right_turns_right() {
        let mut cam = FlyCamera::default();
        cam.look(100.0, 0.0);
        // Turning right while facing +Z swings forward toward -X.
        assert!(cam.forward().x < 0.0);
    }

    #[test]
    fn look_round_trip_has_no_roll() {
        let mut cam = FlyCamera::default();
        for _ in 0..50 {
            cam.look(37.0, 11.0);
            cam.look(-37.0, -11.0);
        }
        assert!(approx(cam.forward(), Vec3::Z));
        assert!(cam.right().y.abs() < 1e-6);
    }

    #[test]
    fn face_recovers_yaw_and_pitch() {
        let mut cam = FlyCamera::default();
        let dir = Vec3::new(1.0, 1.0, 0.0).normalize();
        cam.face(dir);
        assert!(approx(cam.forward(), dir));
    }

    #[test]
    fn w_moves_forward_scaled_by_dt() {
        let mut cam = FlyCamera::default();
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        press(&mut state, &mut frame, Key::W);

        cam.update(&state, &frame, 0.5);
        let expected = Vec3::new(0.0, 1.0, -5.0 + cam.config().move_speed * 0.5);
        assert!(approx(cam.position, expected));
    }

    #[test]
    fn space_and_c_move_along_world_up() {
        let mut cam = FlyCamera::default();
        cam.look(0.0, -200.0);
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        press(&mut state, &mut frame, Key::Space);

        let before = cam.position;
        cam.update(&state, &frame, 1.0);
        let moved = cam.position - before;
        assert!(approx(moved, Vec3::Y * cam.config().move_speed));
    }

    #[test]
    fn mouse_look_requires_right_button() {
        let mut cam = FlyCamera::default();
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        frame.mouse_delta = (200.0, 0.0);

        cam.update(&state, &frame, 0.016);
        assert_eq!(cam.yaw(), 0.0);

        state.apply_event(
            &mut frame,
            InputEvent::PointerButton(PointerButtonEvent {
                button: MouseButton::Right,
                state: MouseButtonState::Pressed,
                x: 0.0,
                y: 0.0,
                modifiers: Modifiers::default(),
            }),
        );
        cam.update(&state, &frame, 0.016);
        assert!(cam.yaw() < 0.0);
    }

    #[test]
    fn look_at_handles_straight_down() {
        let v = CameraView::look_at(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO, 1.0, 1.0, 0.1, 50.0);
        assert!(v.view.is_finite());
        let p = v.view.transform_point3(Vec3::ZERO);
        assert!(approx(p, Vec3::new(0.0, 0.0, -10.0)));
    }
}
