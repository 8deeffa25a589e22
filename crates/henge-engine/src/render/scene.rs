use glam::{Mat4, Vec3, Vec4};

use crate::assets::{gradient_sky, TextureData};
use crate::coords::{ColorRgba, Viewport, ViewportRect};
use crate::render::mesh::{GpuLines, GpuMesh};
use crate::render::texture::{
    linear_sampler, GpuTexture, OffscreenTarget, COLOR_TEXTURE_FORMAT, DATA_TEXTURE_FORMAT,
};
use crate::render::uniforms::{ObjectUniform, SceneUniform, UniformArena};
use crate::render::{RenderCtx, RenderTarget};
use crate::scene::{CameraView, LightRig, LineVertex, MeshData, Vertex};

/// CPU data the scene renderer uploads on first use.
pub struct SceneAssets {
    pub model: MeshData,
    pub diffuse: TextureData,
    pub normal_map: TextureData,
    pub sky: [TextureData; 6],
}

impl SceneAssets {
    /// Everything procedural: a cube model, checkerboard, flat normals, gradient sky.
    pub fn fallback() -> Self {
        Self {
            model: MeshData::cube(),
            diffuse: TextureData::checkerboard(256, 8),
            normal_map: TextureData::flat_normal(),
            sky: gradient_sky(128),
        }
    }
}

/// Placement of the fixed scene objects and the secondary cameras.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SceneLayout {
    pub triangle: Mat4,

    pub wave: Mat4,
    pub wave_size: f32,
    pub wave_subdivisions: u32,
    /// x = amplitude, y = spatial frequency, z = speed.
    pub wave_params: Vec4,
    pub wave_tint: Vec3,

    pub grid_half: f32,
    pub grid_step: f32,

    /// Cube textured with the render-to-texture output.
    pub monitor: Mat4,
    pub monitor_eye: Vec3,
    pub monitor_target: Vec3,
    pub offscreen_size: u32,
    pub offscreen_clear: ColorRgba,

    /// Height of the top-down inset camera above the main camera.
    pub top_down_height: f32,
    pub top_down_fov: f32,
    /// Gap between the inset and the window edges, in logical pixels.
    pub inset_margin: f32,
}

impl Default for SceneLayout {
    fn default() -> Self {
        Self {
            triangle: Mat4::from_translation(Vec3::new(-3.0, 1.0, 0.0)),

            wave: Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)),
            wave_size: 40.0,
            wave_subdivisions: 96,
            wave_params: Vec4::new(0.3, 0.6, 1.5, 0.0),
            wave_tint: Vec3::new(0.15, 0.35, 0.55),

            grid_half: 10.0,
            grid_step: 1.0,

            monitor: Mat4::from_translation(Vec3::new(3.5, 1.5, 2.0))
                * Mat4::from_scale(Vec3::splat(0.9)),
            monitor_eye: Vec3::new(0.0, 2.5, -6.0),
            monitor_target: Vec3::new(0.0, 0.5, 0.0),
            offscreen_size: 512,
            offscreen_clear: ColorRgba::rgb(0.05, 0.05, 0.08),

            top_down_height: 14.0,
            top_down_fov: std::f32::consts::FRAC_PI_3,
            inset_margin: 10.0,
        }
    }
}

/// Per-frame inputs for `SceneRenderer::render`.
pub struct SceneFrame<'a> {
    pub camera: CameraView,
    pub lights: &'a LightRig,
    /// World transform of the imported model.
    pub model: Mat4,
    pub elapsed: f32,
    pub pulse: f32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum PassKind {
    /// Monitor camera into the offscreen texture.
    Offscreen,
    /// Main camera, full window.
    Main,
    /// Top-down camera, inset viewport.
    Inset,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum DrawKind {
    Skybox,
    Grid,
    Model,
    Triangle,
    Wave,
    MarkerSolid,
    MarkerPulse,
    Monitor,
}

impl PassKind {
    /// Draw order for the pass. The skybox goes first; it writes no depth.
    pub(crate) fn draws(self) -> &'static [DrawKind] {
        use DrawKind::*;
        match self {
            // Never the monitor: it samples this pass's own target.
            PassKind::Offscreen => &[Skybox, Model, MarkerSolid, MarkerPulse],
            PassKind::Main => &[
                Skybox,
                Grid,
                Model,
                Triangle,
                Wave,
                MarkerSolid,
                MarkerPulse,
                Monitor,
            ],
            PassKind::Inset => &[Skybox, Grid, Model, MarkerSolid, MarkerPulse],
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct Draw {
    kind: DrawKind,
    object_offset: u32,
}

struct PassPlan {
    scene_offset: u32,
    draws: Vec<Draw>,
}

/// Physical-pixel rectangle of the top-down inset.
pub(crate) fn inset_rect(layout: &SceneLayout, viewport: Viewport, scale_factor: f32) -> ViewportRect {
    ViewportRect::inset_quarter(viewport, layout.inset_margin * scale_factor)
}

/// Top-down camera hovering over the main camera.
pub(crate) fn top_down_camera(layout: &SceneLayout, main_eye: Vec3, aspect: f32) -> CameraView {
    let ground = Vec3::new(main_eye.x, 0.0, main_eye.z);
    CameraView::look_at(
        ground + Vec3::Y * layout.top_down_height,
        ground,
        layout.top_down_fov,
        aspect,
        0.1,
        layout.top_down_height * 4.0,
    )
}

/// Object uniform for a draw, or `None` when the pipeline has no object group.
fn object_for(kind: DrawKind, layout: &SceneLayout, frame: &SceneFrame<'_>) -> Option<ObjectUniform> {
    let lights = frame.lights;
    match kind {
        DrawKind::Skybox | DrawKind::Grid => None,
        DrawKind::Model => Some(ObjectUniform::new(frame.model, Vec3::ONE)),
        DrawKind::Triangle => Some(ObjectUniform::new(layout.triangle, Vec3::new(1.0, 0.85, 0.5))),
        DrawKind::Wave => Some(
            ObjectUniform::new(layout.wave, layout.wave_tint).with_params(layout.wave_params),
        ),
        DrawKind::MarkerSolid => Some(ObjectUniform::new(
            lights.marker_transform(&lights.point),
            lights.point.color,
        )),
        DrawKind::MarkerPulse => Some(ObjectUniform::new(
            lights.marker_transform(&lights.directional),
            lights.directional.color,
        )),
        DrawKind::Monitor => Some(ObjectUniform::new(layout.monitor, Vec3::ONE)),
    }
}

fn plan_pass(
    kind: PassKind,
    camera: &CameraView,
    layout: &SceneLayout,
    frame: &SceneFrame<'_>,
    scenes: &mut UniformArena<SceneUniform>,
    objects: &mut UniformArena<ObjectUniform>,
) -> PassPlan {
    let scene_offset = scenes.push(&SceneUniform::new(camera, frame.lights, frame.elapsed, frame.pulse));
    let draws = kind
        .draws()
        .iter()
        .map(|&k| Draw {
            kind: k,
            object_offset: object_for(k, layout, frame).map_or(0, |u| objects.push(&u)),
        })
        .collect();

    PassPlan { scene_offset, draws }
}

// ── GPU-side state ────────────────────────────────────────────────────────

/// Layouts and shader modules shared by every pipeline set.
struct Shared {
    scene_bgl: wgpu::BindGroupLayout,
    object_bgl: wgpu::BindGroupLayout,
    material_bgl: wgpu::BindGroupLayout,
    sky_bgl: wgpu::BindGroupLayout,

    lit_layout: wgpu::PipelineLayout,
    object_layout: wgpu::PipelineLayout,
    grid_layout: wgpu::PipelineLayout,
    sky_layout: wgpu::PipelineLayout,

    lit_shader: wgpu::ShaderModule,
    marker_shader: wgpu::ShaderModule,
    wave_shader: wgpu::ShaderModule,
    grid_shader: wgpu::ShaderModule,
    skybox_shader: wgpu::ShaderModule,
}

/// Pipelines compiled for one (colour, depth) attachment pair.
struct PipelineSet {
    color_format: wgpu::TextureFormat,
    depth_format: Option<wgpu::TextureFormat>,

    lit: wgpu::RenderPipeline,
    screen: wgpu::RenderPipeline,
    marker_solid: wgpu::RenderPipeline,
    marker_pulse: wgpu::RenderPipeline,
    wave: wgpu::RenderPipeline,
    grid: wgpu::RenderPipeline,
    skybox: wgpu::RenderPipeline,
}

impl PipelineSet {
    fn matches(&self, color: wgpu::TextureFormat, depth: Option<wgpu::TextureFormat>) -> bool {
        self.color_format == color && self.depth_format == depth
    }
}

struct Meshes {
    model: GpuMesh,
    cube: GpuMesh,
    triangle: GpuMesh,
    wave: GpuMesh,
    grid: GpuLines,
}

struct Materials {
    model: wgpu::BindGroup,
    plain: wgpu::BindGroup,
    monitor: wgpu::BindGroup,
    sky: wgpu::BindGroup,
}

struct Textures {
    diffuse: GpuTexture,
    normal_map: GpuTexture,
    checker: GpuTexture,
    flat_normal: GpuTexture,
    sky: GpuTexture,
    wrap: wgpu::Sampler,
    clamp: wgpu::Sampler,
}

/// Renders the demo scene: imported model, triangle, wave surface, grid,
/// light markers, skybox and a monitor cube showing a render-to-texture view,
/// plus a top-down inset viewport.
///
/// GPU resources are created lazily on the first `render` call and rebuilt
/// when the attachment formats change.
pub struct SceneRenderer {
    layout: SceneLayout,
    pending: Option<SceneAssets>,

    shared: Option<Shared>,
    main_pipelines: Option<PipelineSet>,
    offscreen_pipelines: Option<PipelineSet>,

    meshes: Option<Meshes>,
    textures: Option<Textures>,
    offscreen: Option<OffscreenTarget>,
    offscreen_depth: Option<wgpu::TextureFormat>,
    materials: Option<Materials>,

    scene_arena: Option<UniformArena<SceneUniform>>,
    object_arena: Option<UniformArena<ObjectUniform>>,
    scene_bg: Option<wgpu::BindGroup>,
    object_bg: Option<wgpu::BindGroup>,
    uniform_generation: (u64, u64),

    warned_inset: bool,
}

impl SceneRenderer {
    pub fn new(assets: SceneAssets, layout: SceneLayout) -> Self {
        Self {
            layout,
            pending: Some(assets),
            shared: None,
            main_pipelines: None,
            offscreen_pipelines: None,
            meshes: None,
            textures: None,
            offscreen: None,
            offscreen_depth: None,
            materials: None,
            scene_arena: None,
            object_arena: None,
            scene_bg: None,
            object_bg: None,
            uniform_generation: (0, 0),
            warned_inset: false,
        }
    }

    /// Records all three passes into `target.encoder`.
    ///
    /// Expects `target` to be cleared already; the main pass loads colour and depth.
    pub fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>, frame: &SceneFrame<'_>) {
        if !ctx.viewport.is_valid() {
            return;
        }

        let main_depth = target.depth_view.and(ctx.depth_format);

        self.ensure_shared(ctx);
        self.ensure_static_resources(ctx);
        self.ensure_offscreen(ctx);
        self.ensure_pipelines(ctx, main_depth);
        self.ensure_materials(ctx);
        self.ensure_arenas(ctx);

        // Plan every pass up front so all uniforms land in one upload.
        let inset = inset_rect(&self.layout, ctx.viewport, ctx.scale_factor);
        let offscreen_aspect = self.offscreen.as_ref().map_or(1.0, OffscreenTarget::aspect);
        let (Some(scenes), Some(objects)) = (self.scene_arena.as_mut(), self.object_arena.as_mut())
        else {
            return;
        };
        scenes.clear();
        objects.clear();

        let monitor_cam = CameraView::look_at(
            self.layout.monitor_eye,
            self.layout.monitor_target,
            frame.camera_fov(),
            offscreen_aspect,
            0.01,
            100.0,
        );
        let offscreen_plan = plan_pass(PassKind::Offscreen, &monitor_cam, &self.layout, frame, scenes, objects);
        let main_plan = plan_pass(PassKind::Main, &frame.camera, &self.layout, frame, scenes, objects);
        let inset_plan = (!inset.is_empty()).then(|| {
            let cam = top_down_camera(&self.layout, frame.camera.eye, inset.aspect());
            plan_pass(PassKind::Inset, &cam, &self.layout, frame, scenes, objects)
        });

        scenes.upload(ctx.device, ctx.queue);
        objects.upload(ctx.device, ctx.queue);

        if inset_plan.is_none() && !self.warned_inset {
            log::debug!("SceneRenderer: window too small for the inset viewport; skipped");
            self.warned_inset = true;
        }

        self.ensure_uniform_bindings(ctx);

        let Some(bound) = self.bound() else { return };

        // 1. Render-to-texture.
        if let (Some(offscreen), Some(pipelines)) = (self.offscreen.as_ref(), self.offscreen_pipelines.as_ref()) {
            let mut rpass = begin_pass(
                target.encoder,
                "henge offscreen pass",
                offscreen.color().view(),
                offscreen.depth_view(),
                Some(self.layout.offscreen_clear.to_wgpu()),
                true,
            );
            record_draws(&mut rpass, pipelines, &bound, &offscreen_plan);
        }

        let Some(pipelines) = self.main_pipelines.as_ref() else { return };

        // 2. Main view.
        {
            let mut rpass = begin_pass(
                target.encoder,
                "henge main pass",
                target.color_view,
                target.depth_view.filter(|_| main_depth.is_some()),
                None,
                false,
            );
            record_draws(&mut rpass, pipelines, &bound, &main_plan);
        }

        // 3. Second viewport over the top-right corner.
        if let Some(plan) = inset_plan.as_ref() {
            let mut rpass = begin_pass(
                target.encoder,
                "henge inset pass",
                target.color_view,
                target.depth_view.filter(|_| main_depth.is_some()),
                None,
                true,
            );
            rpass.set_viewport(inset.x, inset.y, inset.width, inset.height, 0.0, 1.0);
            rpass.set_scissor_rect(inset.x as u32, inset.y as u32, inset.width as u32, inset.height as u32);
            record_draws(&mut rpass, pipelines, &bound, plan);
        }
    }

    fn bound(&self) -> Option<Bound<'_>> {
        Some(Bound {
            meshes: self.meshes.as_ref()?,
            materials: self.materials.as_ref()?,
            scene_bg: self.scene_bg.as_ref()?,
            object_bg: self.object_bg.as_ref()?,
        })
    }

    fn ensure_shared(&mut self, ctx: &RenderCtx<'_>) {
        if self.shared.is_some() {
            return;
        }
        let device = ctx.device;

        let uniform_entry = |min_binding_size| wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size,
            },
            count: None,
        };
        let texture_entry = |binding, view_dimension| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension,
                multisampled: false,
            },
            count: None,
        };
        let sampler_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };

        let scene_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("henge scene bgl"),
            entries: &[uniform_entry(UniformArena::<SceneUniform>::binding_size())],
        });
        let object_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("henge object bgl"),
            entries: &[uniform_entry(UniformArena::<ObjectUniform>::binding_size())],
        });
        let material_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("henge material bgl"),
            entries: &[
                texture_entry(0, wgpu::TextureViewDimension::D2),
                texture_entry(1, wgpu::TextureViewDimension::D2),
                sampler_entry(2),
            ],
        });
        let sky_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("henge sky bgl"),
            entries: &[texture_entry(0, wgpu::TextureViewDimension::Cube), sampler_entry(1)],
        });

        let pipeline_layout = |label, groups: &[&wgpu::BindGroupLayout]| {
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: groups,
                immediate_size: 0,
            })
        };
        let lit_layout = pipeline_layout("henge lit layout", &[&scene_bgl, &object_bgl, &material_bgl]);
        let object_layout = pipeline_layout("henge object layout", &[&scene_bgl, &object_bgl]);
        let grid_layout = pipeline_layout("henge grid layout", &[&scene_bgl]);
        let sky_layout = pipeline_layout("henge sky layout", &[&scene_bgl, &sky_bgl]);

        let common = include_str!("shaders/common.wgsl");
        let shader = |label, body: &str| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl([common, body].concat().into()),
            })
        };

        self.shared = Some(Shared {
            lit_shader: shader("henge lit shader", include_str!("shaders/lit.wgsl")),
            marker_shader: shader("henge marker shader", include_str!("shaders/marker.wgsl")),
            wave_shader: shader("henge wave shader", include_str!("shaders/wave.wgsl")),
            grid_shader: shader("henge grid shader", include_str!("shaders/grid.wgsl")),
            skybox_shader: shader("henge skybox shader", include_str!("shaders/skybox.wgsl")),
            scene_bgl,
            object_bgl,
            material_bgl,
            sky_bgl,
            lit_layout,
            object_layout,
            grid_layout,
            sky_layout,
        });

        // Bind groups reference the layouts above.
        self.materials = None;
        self.scene_bg = None;
        self.object_bg = None;
    }

    fn ensure_pipelines(&mut self, ctx: &RenderCtx<'_>, main_depth: Option<wgpu::TextureFormat>) {
        let Some(shared) = self.shared.as_ref() else { return };

        if !self
            .main_pipelines
            .as_ref()
            .is_some_and(|p| p.matches(ctx.surface_format, main_depth))
        {
            log::debug!(
                "SceneRenderer: building pipelines for {:?} / {:?}",
                ctx.surface_format,
                main_depth
            );
            self.main_pipelines = Some(build_pipelines(ctx.device, shared, ctx.surface_format, main_depth));
        }

        if !self
            .offscreen_pipelines
            .as_ref()
            .is_some_and(|p| p.matches(COLOR_TEXTURE_FORMAT, ctx.depth_format))
        {
            self.offscreen_pipelines =
                Some(build_pipelines(ctx.device, shared, COLOR_TEXTURE_FORMAT, ctx.depth_format));
        }
    }

    fn ensure_static_resources(&mut self, ctx: &RenderCtx<'_>) {
        if self.meshes.is_some() && self.textures.is_some() {
            return;
        }
        let assets = self.pending.take().unwrap_or_else(SceneAssets::fallback);
        let (device, queue) = (ctx.device, ctx.queue);

        let grid: Vec<LineVertex> = MeshData::grid_lines(self.layout.grid_half, self.layout.grid_step);
        self.meshes = Some(Meshes {
            model: GpuMesh::upload(device, &assets.model, "henge model"),
            cube: GpuMesh::upload(device, &MeshData::cube(), "henge cube"),
            triangle: GpuMesh::upload(device, &MeshData::triangle(), "henge triangle"),
            wave: GpuMesh::upload(
                device,
                &MeshData::plane(self.layout.wave_size, self.layout.wave_subdivisions),
                "henge wave",
            ),
            grid: GpuLines::upload(device, &grid, "henge grid"),
        });

        self.textures = Some(Textures {
            diffuse: GpuTexture::from_data(device, queue, &assets.diffuse, COLOR_TEXTURE_FORMAT, "henge diffuse"),
            normal_map: GpuTexture::from_data(device, queue, &assets.normal_map, DATA_TEXTURE_FORMAT, "henge normal map"),
            checker: GpuTexture::from_data(
                device,
                queue,
                &TextureData::checkerboard(64, 4),
                COLOR_TEXTURE_FORMAT,
                "henge checker",
            ),
            flat_normal: GpuTexture::from_data(
                device,
                queue,
                &TextureData::flat_normal(),
                DATA_TEXTURE_FORMAT,
                "henge flat normal",
            ),
            sky: GpuTexture::cube(device, queue, &assets.sky, "henge skybox"),
            wrap: linear_sampler(device, wgpu::AddressMode::Repeat, "henge wrap sampler"),
            clamp: linear_sampler(device, wgpu::AddressMode::ClampToEdge, "henge clamp sampler"),
        });

        log::info!(
            "SceneRenderer: uploaded model ({} indices) and textures",
            assets.model.indices.len()
        );
        self.materials = None;
    }

    fn ensure_offscreen(&mut self, ctx: &RenderCtx<'_>) {
        if self.offscreen.is_some() && self.offscreen_depth == ctx.depth_format {
            return;
        }
        self.offscreen = Some(OffscreenTarget::new(
            ctx.device,
            self.layout.offscreen_size,
            COLOR_TEXTURE_FORMAT,
            ctx.depth_format,
        ));
        self.offscreen_depth = ctx.depth_format;
        self.materials = None;
    }

    fn ensure_materials(&mut self, ctx: &RenderCtx<'_>) {
        if self.materials.is_some() {
            return;
        }
        let Some(shared) = self.shared.as_ref() else { return };
        let Some(tex) = self.textures.as_ref() else { return };
        let Some(offscreen) = self.offscreen.as_ref() else { return };

        let material = |label, diffuse: &wgpu::TextureView, normal: &wgpu::TextureView, sampler| {
            ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &shared.material_bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(diffuse),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(normal),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            })
        };

        let sky = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("henge sky bind group"),
            layout: &shared.sky_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(tex.sky.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&tex.clamp),
                },
            ],
        });

        self.materials = Some(Materials {
            model: material("henge model material", tex.diffuse.view(), tex.normal_map.view(), &tex.wrap),
            plain: material("henge plain material", tex.checker.view(), tex.flat_normal.view(), &tex.wrap),
            monitor: material(
                "henge monitor material",
                offscreen.color().view(),
                tex.flat_normal.view(),
                &tex.clamp,
            ),
            sky,
        });
    }

    fn ensure_arenas(&mut self, ctx: &RenderCtx<'_>) {
        let alignment = ctx.uniform_alignment();
        if self.scene_arena.is_none() {
            self.scene_arena = Some(UniformArena::new("henge scene uniforms", alignment));
        }
        if self.object_arena.is_none() {
            self.object_arena = Some(UniformArena::new("henge object uniforms", alignment));
        }
    }

    fn ensure_uniform_bindings(&mut self, ctx: &RenderCtx<'_>) {
        let Some(shared) = self.shared.as_ref() else { return };
        let (Some(scenes), Some(objects)) = (self.scene_arena.as_ref(), self.object_arena.as_ref())
        else {
            return;
        };

        let generation = (scenes.generation(), objects.generation());
        if generation == self.uniform_generation && self.scene_bg.is_some() && self.object_bg.is_some() {
            return;
        }
        let (Some(scene_buf), Some(object_buf)) = (scenes.buffer(), objects.buffer()) else {
            return;
        };

        let bind = |label, layout, buffer, size| {
            ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer,
                        offset: 0,
                        size,
                    }),
                }],
            })
        };

        self.scene_bg = Some(bind(
            "henge scene bind group",
            &shared.scene_bgl,
            scene_buf,
            UniformArena::<SceneUniform>::binding_size(),
        ));
        self.object_bg = Some(bind(
            "henge object bind group",
            &shared.object_bgl,
            object_buf,
            UniformArena::<ObjectUniform>::binding_size(),
        ));
        self.uniform_generation = generation;
    }
}

impl SceneFrame<'_> {
    /// Vertical field of view recovered from the projection matrix.
    fn camera_fov(&self) -> f32 {
        let y_scale = self.camera.proj.y_axis.y;
        if y_scale > 0.0 {
            2.0 * (1.0 / y_scale).atan()
        } else {
            std::f32::consts::FRAC_PI_2
        }
    }
}

struct Bound<'a> {
    meshes: &'a Meshes,
    materials: &'a Materials,
    scene_bg: &'a wgpu::BindGroup,
    object_bg: &'a wgpu::BindGroup,
}

struct PipelineSpec<'a> {
    label: &'a str,
    layout: &'a wgpu::PipelineLayout,
    shader: &'a wgpu::ShaderModule,
    fs_entry: &'a str,
    vertex: wgpu::VertexBufferLayout<'static>,
    topology: wgpu::PrimitiveTopology,
    depth_write: bool,
    depth_compare: wgpu::CompareFunction,
}

fn build_pipeline(
    device: &wgpu::Device,
    spec: PipelineSpec<'_>,
    color_format: wgpu::TextureFormat,
    depth_format: Option<wgpu::TextureFormat>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(spec.label),
        layout: Some(spec.layout),

        vertex: wgpu::VertexState {
            module: spec.shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[spec.vertex],
        },

        fragment: Some(wgpu::FragmentState {
            module: spec.shader,
            entry_point: Some(spec.fs_entry),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: spec.topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // Imported meshes and the built-in cube disagree on winding.
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: spec.depth_write,
            depth_compare: spec.depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),

        multiview_mask: None,
        cache: None,
    })
}

fn build_pipelines(
    device: &wgpu::Device,
    shared: &Shared,
    color_format: wgpu::TextureFormat,
    depth_format: Option<wgpu::TextureFormat>,
) -> PipelineSet {
    let solid = |label, layout, shader, fs_entry, vertex| PipelineSpec {
        label,
        layout,
        shader,
        fs_entry,
        vertex,
        topology: wgpu::PrimitiveTopology::TriangleList,
        depth_write: true,
        depth_compare: wgpu::CompareFunction::Less,
    };
    let build = |spec| build_pipeline(device, spec, color_format, depth_format);

    PipelineSet {
        color_format,
        depth_format,
        lit: build(solid("henge lit pipeline", &shared.lit_layout, &shared.lit_shader, "fs_main", Vertex::layout())),
        screen: build(solid(
            "henge screen pipeline",
            &shared.lit_layout,
            &shared.lit_shader,
            "fs_screen",
            Vertex::layout(),
        )),
        marker_solid: build(solid(
            "henge marker solid pipeline",
            &shared.object_layout,
            &shared.marker_shader,
            "fs_solid",
            Vertex::layout(),
        )),
        marker_pulse: build(solid(
            "henge marker pulse pipeline",
            &shared.object_layout,
            &shared.marker_shader,
            "fs_pulse",
            Vertex::layout(),
        )),
        wave: build(solid(
            "henge wave pipeline",
            &shared.object_layout,
            &shared.wave_shader,
            "fs_main",
            Vertex::layout(),
        )),
        grid: build(PipelineSpec {
            topology: wgpu::PrimitiveTopology::LineList,
            ..solid("henge grid pipeline", &shared.grid_layout, &shared.grid_shader, "fs_main", LineVertex::layout())
        }),
        skybox: build(PipelineSpec {
            depth_write: false,
            depth_compare: wgpu::CompareFunction::LessEqual,
            ..solid("henge skybox pipeline", &shared.sky_layout, &shared.skybox_shader, "fs_main", Vertex::layout())
        }),
    }
}

fn begin_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    color_view: &wgpu::TextureView,
    depth_view: Option<&wgpu::TextureView>,
    clear_color: Option<wgpu::Color>,
    clear_depth: bool,
) -> wgpu::RenderPass<'e> {
    let load = match clear_color {
        Some(c) => wgpu::LoadOp::Clear(c),
        None => wgpu::LoadOp::Load,
    };
    let depth_load = if clear_depth {
        wgpu::LoadOp::Clear(1.0)
    } else {
        wgpu::LoadOp::Load
    };

    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: color_view,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: depth_view.map(|view| wgpu::RenderPassDepthStencilAttachment {
            view,
            depth_ops: Some(wgpu::Operations {
                load: depth_load,
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    })
}

fn record_draws(rpass: &mut wgpu::RenderPass<'_>, p: &PipelineSet, b: &Bound<'_>, plan: &PassPlan) {
    let m = b.meshes;
    let scene = [plan.scene_offset];

    for draw in &plan.draws {
        let object = [draw.object_offset];
        match draw.kind {
            DrawKind::Skybox => {
                rpass.set_pipeline(&p.skybox);
                rpass.set_bind_group(0, b.scene_bg, &scene);
                rpass.set_bind_group(1, &b.materials.sky, &[]);
                m.cube.draw(rpass);
            }
            DrawKind::Grid => {
                rpass.set_pipeline(&p.grid);
                rpass.set_bind_group(0, b.scene_bg, &scene);
                m.grid.draw(rpass);
            }
            DrawKind::Model | DrawKind::Triangle | DrawKind::Monitor => {
                let (pipeline, material, mesh) = match draw.kind {
                    DrawKind::Model => (&p.lit, &b.materials.model, &m.model),
                    DrawKind::Triangle => (&p.lit, &b.materials.plain, &m.triangle),
                    _ => (&p.screen, &b.materials.monitor, &m.cube),
                };
                rpass.set_pipeline(pipeline);
                rpass.set_bind_group(0, b.scene_bg, &scene);
                rpass.set_bind_group(1, b.object_bg, &object);
                rpass.set_bind_group(2, material, &[]);
                mesh.draw(rpass);
            }
            DrawKind::Wave | DrawKind::MarkerSolid | DrawKind::MarkerPulse => {
                let (pipeline, mesh) = match draw.kind {
                    DrawKind::Wave => (&p.wave, &m.wave),
                    DrawKind::MarkerSolid => (&p.marker_solid, &m.cube),
                    _ => (&p.marker_pulse, &m.cube),
                };
                rpass.set_pipeline(pipeline);
                rpass.set_bind_group(0, b.scene_bg, &scene);
                rpass.set_bind_group(1, b.object_bg, &object);
                mesh.draw(rpass);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(rig: &LightRig) -> SceneFrame<'_> {
        SceneFrame {
            camera: CameraView::look_at(Vec3::new(0.0, 1.0, -5.0), Vec3::Y, 1.2, 1.5, 0.01, 100.0),
            lights: rig,
            model: Mat4::IDENTITY,
            elapsed: 1.0,
            pulse: 0.5,
        }
    }

    #[test]
    fn offscreen_pass_never_samples_its_own_target() {
        assert!(!PassKind::Offscreen.draws().contains(&DrawKind::Monitor));
        assert!(PassKind::Main.draws().contains(&DrawKind::Monitor));
    }

    #[test]
    fn skybox_is_drawn_first_in_every_pass() {
        for pass in [PassKind::Offscreen, PassKind::Main, PassKind::Inset] {
            assert_eq!(pass.draws()[0], DrawKind::Skybox);
        }
    }

    #[test]
    fn main_pass_draws_everything_once() {
        let draws = PassKind::Main.draws();
        assert_eq!(draws.len(), 8);
        for kind in [DrawKind::Grid, DrawKind::Triangle, DrawKind::Wave, DrawKind::MarkerPulse] {
            assert_eq!(draws.iter().filter(|&&d| d == kind).count(), 1);
        }
    }

    #[test]
    fn plan_assigns_one_object_slot_per_object_draw() {
        let rig = LightRig::default();
        let f = frame(&rig);
        let layout = SceneLayout::default();
        let mut scenes = UniformArena::<SceneUniform>::new("s", 256);
        let mut objects = UniformArena::<ObjectUniform>::new("o", 256);

        let a = plan_pass(PassKind::Main, &f.camera, &layout, &f, &mut scenes, &mut objects);
        let b = plan_pass(PassKind::Offscreen, &f.camera, &layout, &f, &mut scenes, &mut objects);

        assert_eq!(a.scene_offset, 0);
        assert_eq!(b.scene_offset, 256);
        // Skybox and grid carry no object data.
        assert_eq!(objects.len(), 6 + 3);

        let offsets: Vec<u32> = a
            .draws
            .iter()
            .filter(|d| !matches!(d.kind, DrawKind::Skybox | DrawKind::Grid))
            .map(|d| d.object_offset)
            .collect();
        let mut unique = offsets.clone();
        unique.dedup();
        assert_eq!(unique.len(), offsets.len());
    }

    #[test]
    fn markers_use_light_colours() {
        let rig = LightRig::default();
        let f = frame(&rig);
        let layout = SceneLayout::default();
        let solid = object_for(DrawKind::MarkerSolid, &layout, &f).unwrap();
        let pulse = object_for(DrawKind::MarkerPulse, &layout, &f).unwrap();
        assert_eq!(solid.tint, [0.7, 0.2, 0.2, 1.0]);
        assert_eq!(pulse.tint, [0.85, 0.85, 0.85, 1.0]);
        assert!(object_for(DrawKind::Skybox, &layout, &f).is_none());
    }

    #[test]
    fn top_down_camera_looks_straight_down_at_the_viewer() {
        let cam = top_down_camera(&SceneLayout::default(), Vec3::new(2.0, 1.0, 3.0), 4.0 / 3.0);
        assert_eq!(cam.eye, Vec3::new(2.0, 14.0, 3.0));
        let below = cam.view.transform_point3(Vec3::new(2.0, 0.0, 3.0));
        assert!((below - Vec3::new(0.0, 0.0, -14.0)).length() < 1e-4);
    }

    #[test]
    fn inset_margin_scales_with_the_window() {
        let layout = SceneLayout::default();
        let r1 = inset_rect(&layout, Viewport::new(800.0, 600.0), 1.0);
        assert_eq!(r1, ViewportRect::new(590.0, 10.0, 200.0, 150.0));

        let r2 = inset_rect(&layout, Viewport::new(1600.0, 1200.0), 2.0);
        assert_eq!(r2, ViewportRect::new(1180.0, 20.0, 400.0, 300.0));
    }

    #[test]
    fn camera_fov_is_recovered_from_projection() {
        let rig = LightRig::default();
        let f = frame(&rig);
        assert!((f.camera_fov() - 1.2).abs() < 1e-5);
    }
}
