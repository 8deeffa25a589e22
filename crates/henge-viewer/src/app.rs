use henge_engine::assets::{load_cube_faces, load_obj, TextureData};
use henge_engine::coords::ColorRgba;
use henge_engine::core::{App, AppControl, FrameCtx};
use henge_engine::input::{InputState, Key, MouseButton};
use henge_engine::render::{SceneAssets, SceneFrame, SceneLayout, SceneRenderer};
use henge_engine::scene::{FlyCamera, LightRig, ModelSpin};
use henge_engine::time::PulseTimer;

use crate::config::ViewerConfig;

/// Loads everything the scene needs, substituting procedural stand-ins for
/// anything missing or unreadable.
pub fn load_scene_assets(cfg: &ViewerConfig) -> SceneAssets {
    let fallback = SceneAssets::fallback();

    let model = load_obj(cfg.model_path(), cfg.model_scale).unwrap_or_else(|e| {
        log::warn!("model unavailable ({e:#}); using a cube");
        fallback.model
    });

    let diffuse = TextureData::load(cfg.diffuse_path()).unwrap_or_else(|e| {
        log::warn!("diffuse texture unavailable ({e:#}); using a checkerboard");
        fallback.diffuse
    });

    let normal_map = TextureData::load(cfg.normal_map_path()).unwrap_or_else(|e| {
        log::warn!("normal map unavailable ({e:#}); using flat normals");
        fallback.normal_map
    });

    let sky = match load_cube_faces(cfg.skybox_path()) {
        Ok(Some(faces)) => {
            log::info!("skybox loaded from {}", cfg.skybox_path().display());
            faces
        }
        Ok(None) => {
            log::info!("no skybox in {}; using a gradient sky", cfg.skybox_path().display());
            fallback.sky
        }
        Err(e) => {
            log::warn!("skybox unreadable ({e:#}); using a gradient sky");
            fallback.sky
        }
    };

    SceneAssets {
        model,
        diffuse,
        normal_map,
        sky,
    }
}

pub fn log_controls() {
    log::info!("controls:");
    log::info!("  right mouse + move   look around");
    log::info!("  W/S A/D              move forward/back, strafe");
    log::info!("  Space / C            move up / down");
    log::info!("  Q / E                turn left / right");
    log::info!("  J / L                spin the model");
    log::info!("  Z                    toggle light steering (then left mouse + move)");
    log::info!("  Escape               quit");
}

/// Whether a mouse-driven mode is active: looking around (RMB) or steering
/// the light (LMB while steering is on).
fn wants_cursor_grab(input: &InputState, steering: bool) -> bool {
    input.button_down(MouseButton::Right) || (steering && input.button_down(MouseButton::Left))
}

/// The demo scene: a fly camera, two animated lights and a spinning model.
pub struct ViewerApp {
    camera: FlyCamera,
    lights: LightRig,
    spin: ModelSpin,
    pulse: PulseTimer,
    renderer: SceneRenderer,
    clear: ColorRgba,
    title: String,
}

impl ViewerApp {
    pub fn new(cfg: &ViewerConfig, title: &str) -> Self {
        Self {
            camera: FlyCamera::default(),
            lights: LightRig::default(),
            // Scale is already baked into the loaded mesh.
            spin: ModelSpin::new(1.0),
            pulse: PulseTimer::default(),
            renderer: SceneRenderer::new(load_scene_assets(cfg), SceneLayout::default()),
            clear: cfg.clear,
            title: title.to_string(),
        }
    }
}

impl App for ViewerApp {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let input = ctx.input;
        let frame = ctx.input_frame;
        let dt = ctx.time.dt;

        if frame.key_pressed(Key::Escape) {
            return AppControl::Exit;
        }

        let was_steering = self.lights.steering();
        self.camera.update(input, frame, dt);
        self.lights.update(input, frame, dt);
        self.spin.update(input, dt);
        let pulse = self.pulse.advance(dt);

        // The runtime drops repeated requests, so this can go out every frame.
        ctx.runtime
            .set_cursor_grab(wants_cursor_grab(input, self.lights.steering()));

        if self.lights.steering() != was_steering {
            let title = if self.lights.steering() {
                format!("{} (light steering)", self.title)
            } else {
                self.title.clone()
            };
            ctx.runtime.set_title(title);
        }

        let scene = SceneFrame {
            camera: self.camera.view(ctx.aspect()),
            lights: &self.lights,
            model: self.spin.world(),
            elapsed: ctx.time.elapsed,
            pulse,
        };

        let renderer = &mut self.renderer;
        ctx.render(self.clear, |rctx, target| {
            renderer.render(rctx, target, &scene);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use henge_engine::input::{
        InputEvent, InputFrame, Modifiers, MouseButtonState, PointerButtonEvent,
    };

    #[test]
    fn missing_assets_fall_back_to_procedural_data() {
        let cfg = ViewerConfig::from_env_and_args(
            None,
            vec!["/nonexistent/henge/assets".to_string()],
        );
        let assets = load_scene_assets(&cfg);

        assert_eq!(assets.model.vertices.len(), 24);
        assert_eq!(assets.normal_map, TextureData::flat_normal());
        assert!(assets.sky.iter().all(|f| f.is_square()));
    }

    #[test]
    fn cursor_grab_follows_steering_while_left_button_is_held() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
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

        // Z toggled mid-drag, with no button change that frame.
        assert!(!wants_cursor_grab(&state, false));
        assert!(wants_cursor_grab(&state, true));
        assert!(!wants_cursor_grab(&state, false));
    }

    #[test]
    fn right_button_always_grabs() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
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
        assert!(wants_cursor_grab(&state, false));
    }
}
