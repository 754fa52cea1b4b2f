/// Visibility and sort pipeline
///
/// One call transforms a mesh through view and screen space, culls faces,
/// orders the survivors back to front (painter's algorithm) and emits one
/// draw command per face or edge. There is no depth buffer: submission
/// order alone decides what ends up on top.
///
/// Faces are processed independently until the sort, so a bad face (zero
/// area, or a vertex on the camera plane) is counted and skipped without
/// affecting the rest of the frame.
use nalgebra::{Matrix4, Point2, Vector3, Vector4};
use tracing::{trace, warn};

use crate::camera::Camera;
use crate::context::{RenderContext, RenderMode};
use crate::draw::{Color, DrawCommand, DrawSurface};
use crate::error::GeometryResult;
use crate::geometry::Mesh;
use crate::light::Light;
use crate::transform::{normalize, perspective_divide, Transform};

/// Ambient share of the flat-shading intensity range.
pub const AMBIENT_INTENSITY: f32 = 100.0;

/// Depth ranges narrower than this give every face full brightness.
const DEPTH_RANGE_EPSILON: f32 = 1e-6;

/// Everything the pipeline reads for one frame.
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    pub mesh: &'a Mesh,
    pub model: Matrix4<f32>,
    pub camera: &'a Camera,
    pub light: &'a Light,
}

/// Per-frame counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub faces: usize,
    pub degenerate: usize,
    pub invalid_w: usize,
    pub culled_backface: usize,
    pub culled_viewport: usize,
    pub drawn_faces: usize,
    pub commands: usize,
}

/// A face that survived culling.
#[derive(Debug, Clone, Copy)]
struct VisibleFace {
    face: usize,
    depth: f32,
    normal: Vector3<f32>,
}

/// Scratch buffers reused from frame to frame.
#[derive(Debug, Default)]
struct FrameBuffers {
    view_points: Vec<Vector4<f32>>,
    screen_points: Vec<GeometryResult<Vector3<f32>>>,
    visible: Vec<VisibleFace>,
    edges: Vec<(Point2<f32>, Point2<f32>, f32)>,
}

/// Owns the draw sink and the per-frame buffers.
///
/// Build one per output target and keep it across frames.
#[derive(Debug)]
pub struct RenderSurface<S: DrawSurface> {
    sink: S,
    buffers: FrameBuffers,
    gouraud_warned: bool,
}

impl<S: DrawSurface> RenderSurface<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            buffers: FrameBuffers::default(),
            gouraud_warned: false,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_inner(self) -> S {
        self.sink
    }

    /// Run the pipeline once, submitting draw commands to the sink in
    /// back-to-front order.
    pub fn render(&mut self, scene: &Scene<'_>, ctx: &RenderContext) -> FrameStats {
        let mut stats = FrameStats {
            faces: scene.mesh.face_count(),
            ..FrameStats::default()
        };

        let view = scene.camera.view_matrix();
        let obj2view = Transform::compose(&[scene.model, view]);
        let view2screen = ctx.view_to_screen();

        let depth = collect_visible(
            &mut self.buffers,
            scene.mesh,
            &obj2view,
            &view2screen,
            ctx,
            &mut stats,
        );
        if ctx.z_sorting {
            sort_back_to_front(&mut self.buffers.visible);
        }
        stats.drawn_faces = self.buffers.visible.len();

        let emitter = Emitter {
            mesh: scene.mesh,
            ctx,
            view2screen: &view2screen,
            depth,
        };
        stats.commands = match ctx.mode {
            RenderMode::Wireframe => {
                emitter.wireframe(&mut self.buffers, &obj2view, &mut self.sink)
            }
            RenderMode::Flat => {
                let light = light_in_view_space(scene.light, &view);
                emitter.flat(&self.buffers, light, &mut self.sink)
            }
            RenderMode::Gouraud => {
                if !self.gouraud_warned {
                    warn!("Gouraud shading is not implemented, rendering flat shading instead");
                    self.gouraud_warned = true;
                }
                let light = light_in_view_space(scene.light, &view);
                emitter.flat(&self.buffers, light, &mut self.sink)
            }
        };

        trace!(
            faces = stats.faces,
            degenerate = stats.degenerate,
            invalid_w = stats.invalid_w,
            culled_backface = stats.culled_backface,
            culled_viewport = stats.culled_viewport,
            commands = stats.commands,
            "Frame rendered"
        );
        stats
    }
}

/// Run the pipeline into a fresh command list.
pub fn build_draw_list(scene: &Scene<'_>, ctx: &RenderContext) -> (Vec<DrawCommand>, FrameStats) {
    let mut surface = RenderSurface::new(Vec::new());
    let stats = surface.render(scene, ctx);
    (surface.into_inner(), stats)
}

/// Range of view-space depths used for depth shading.
#[derive(Debug, Clone, Copy)]
struct DepthRange {
    min: f32,
    max: f32,
}

impl DepthRange {
    fn from_depths(depths: impl Iterator<Item = f32>) -> Self {
        let (min, max) = depths.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), z| {
            (lo.min(z), hi.max(z))
        });
        Self {
            min: min.max(0.0),
            max,
        }
    }

    /// 1 at the nearest depth, 0 at the farthest.
    fn factor(&self, z: f32) -> f32 {
        let range = self.max - self.min;
        if !range.is_finite() || range < DEPTH_RANGE_EPSILON {
            return 1.0;
        }
        ((self.max - z) / range).clamp(0.0, 1.0)
    }
}

/// Transform, cull and collect the visible faces in input order.
///
/// Returns the depth range of every face with usable geometry.
fn collect_visible(
    buffers: &mut FrameBuffers,
    mesh: &Mesh,
    obj2view: &Matrix4<f32>,
    view2screen: &Matrix4<f32>,
    ctx: &RenderContext,
    stats: &mut FrameStats,
) -> DepthRange {
    buffers.view_points.clear();
    buffers
        .view_points
        .extend(mesh.generate_faces().iter().map(|p| obj2view * p));

    buffers.screen_points.clear();
    buffers.screen_points.extend(
        buffers
            .view_points
            .iter()
            .map(|p| perspective_divide(&(view2screen * p))),
    );

    let normals = mesh.face_normals(&buffers.view_points, ctx.ccw_normals);
    let centers = mesh.face_centers(&buffers.view_points);

    buffers.visible.clear();
    let mut depths = Vec::with_capacity(mesh.face_count());
    for (face, (normal, center)) in normals.into_iter().zip(&centers).enumerate() {
        let normal = match normal {
            Ok(n) => n.xyz(),
            Err(e) => {
                stats.degenerate += 1;
                trace!(error = %e, "Skipping face");
                continue;
            }
        };
        let start = mesh.offsets()[face];
        let screen = &buffers.screen_points[start..start + mesh.num_vertices()[face]];
        if screen.iter().any(Result::is_err) {
            stats.invalid_w += 1;
            continue;
        }
        depths.push(center.z);

        if ctx.backface_culling && center.xyz().dot(&normal) > 0.0 {
            stats.culled_backface += 1;
            continue;
        }
        if ctx.viewport_culling && outside_viewport(screen, ctx.width(), ctx.height()) {
            stats.culled_viewport += 1;
            continue;
        }
        buffers.visible.push(VisibleFace {
            face,
            depth: center.z,
            normal,
        });
    }
    DepthRange::from_depths(depths.into_iter())
}

/// A face is off screen when every vertex is outside the screen rectangle,
/// or when any vertex is outside the `0..1` depth range. Faces are never
/// clipped, only accepted or rejected.
fn outside_viewport(screen: &[GeometryResult<Vector3<f32>>], width: f32, height: f32) -> bool {
    let points = screen.iter().filter_map(|p| p.as_ref().ok());
    let mut all_outside_xy = true;
    for p in points {
        if !(0.0..=1.0).contains(&p.z) {
            return true;
        }
        if (0.0..=width).contains(&p.x) && (0.0..=height).contains(&p.y) {
            all_outside_xy = false;
        }
    }
    all_outside_xy
}

/// Stable sort, farthest first.
fn sort_back_to_front(visible: &mut [VisibleFace]) {
    visible.sort_by(|a, b| b.depth.total_cmp(&a.depth));
}

/// Light direction rotated into view space, or `None` when it vanishes.
fn light_in_view_space(light: &Light, view: &Matrix4<f32>) -> Option<Vector3<f32>> {
    match normalize(&view.transform_vector(&light.direction())) {
        Ok(dir) => Some(dir),
        Err(_) => {
            warn!("Light direction degenerate in view space, using ambient light only");
            None
        }
    }
}

/// Flat-shading intensity: ambient plus the clamped Lambert term.
pub fn flat_intensity(light: Option<&Vector3<f32>>, normal: &Vector3<f32>) -> f32 {
    let lambert = light.map_or(0.0, |l| l.dot(normal).max(0.0));
    lambert * (255.0 - AMBIENT_INTENSITY) + AMBIENT_INTENSITY
}

struct Emitter<'a> {
    mesh: &'a Mesh,
    ctx: &'a RenderContext,
    view2screen: &'a Matrix4<f32>,
    depth: DepthRange,
}

impl Emitter<'_> {
    fn face_points(&self, buffers: &FrameBuffers, face: usize) -> Vec<Point2<f32>> {
        let start = self.mesh.offsets()[face];
        buffers.screen_points[start..start + self.mesh.num_vertices()[face]]
            .iter()
            .filter_map(|p| p.as_ref().ok())
            .map(|p| Point2::new(p.x, p.y))
            .collect()
    }

    fn project(&self, p: &Vector4<f32>) -> Option<Point2<f32>> {
        perspective_divide(&(self.view2screen * p))
            .ok()
            .map(|p| Point2::new(p.x, p.y))
    }

    fn flat<S: DrawSurface>(
        &self,
        buffers: &FrameBuffers,
        light: Option<Vector3<f32>>,
        sink: &mut S,
    ) -> usize {
        let mut commands = 0;
        for visible in &buffers.visible {
            let mut intensity = flat_intensity(light.as_ref(), &visible.normal);
            if self.ctx.depth_shading {
                intensity *= self.depth.factor(visible.depth);
            }
            sink.submit(DrawCommand::FilledPolygon {
                points: self.face_points(buffers, visible.face),
                color: Color::gray(intensity),
            });
            commands += 1;

            if self.ctx.show_normals {
                commands += self.normal_overlay(buffers, visible, sink);
            }
        }
        commands
    }

    fn normal_overlay<S: DrawSurface>(
        &self,
        buffers: &FrameBuffers,
        visible: &VisibleFace,
        sink: &mut S,
    ) -> usize {
        let start = self.mesh.offsets()[visible.face];
        let face = &buffers.view_points[start..start + self.mesh.num_vertices()[visible.face]];
        let center = crate::geometry::face_center(face);
        let tip = center + (visible.normal * self.ctx.normal_length).to_homogeneous();
        match (self.project(&center), self.project(&tip)) {
            (Some(from), Some(to)) => {
                sink.submit(DrawCommand::LineSegment {
                    from,
                    to,
                    color: Color::RED,
                });
                1
            }
            _ => 0,
        }
    }

    /// Edges of the visible faces, ordered by their mean view depth and
    /// shaded by depth.
    fn wireframe<S: DrawSurface>(
        &self,
        buffers: &mut FrameBuffers,
        obj2view: &Matrix4<f32>,
        sink: &mut S,
    ) -> usize {
        let edge_points = self.mesh.generate_edges();
        buffers.edges.clear();
        for visible in &buffers.visible {
            let start = self.mesh.offsets()[visible.face];
            for j in 0..self.mesh.num_vertices()[visible.face] {
                let a = obj2view * edge_points[2 * (start + j)];
                let b = obj2view * edge_points[2 * (start + j) + 1];
                if let (Some(from), Some(to)) = (self.project(&a), self.project(&b)) {
                    buffers.edges.push((from, to, (a.z + b.z) / 2.0));
                }
            }
        }
        if self.ctx.z_sorting {
            buffers.edges.sort_by(|a, b| b.2.total_cmp(&a.2));
        }

        let range = DepthRange::from_depths(buffers.edges.iter().map(|e| e.2));
        for &(from, to, z) in &buffers.edges {
            sink.submit(DrawCommand::LineSegment {
                from,
                to,
                color: Color::gray(255.0 * range.factor(z)),
            });
        }
        buffers.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::RotationState;
    use approx::assert_relative_eq;
    use nalgebra::Point3;
    use std::f32::consts::FRAC_PI_4;

    fn camera_at(z: f32) -> Camera {
        Camera::new(Point3::new(0.0, 0.0, z), Vector3::z()).unwrap()
    }

    fn mesh(vertices: Vec<Point3<f32>>, indices: Vec<usize>, counts: Vec<usize>) -> Mesh {
        Mesh::new("test", vertices, indices, counts).unwrap()
    }

    fn facing_triangle(z: f32, offset_x: f32) -> [Point3<f32>; 3] {
        [
            Point3::new(offset_x, 0.0, z),
            Point3::new(offset_x + 1.0, 0.0, z),
            Point3::new(offset_x, 1.0, z),
        ]
    }

    fn polygons(commands: &[DrawCommand]) -> Vec<(&[Point2<f32>], Color)> {
        commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::FilledPolygon { points, color } => Some((points.as_slice(), *color)),
                _ => None,
            })
            .collect()
    }

    /// Rotation that turns the (-1, -1, -1) corner of a cube towards -z.
    fn corner_towards_camera() -> Matrix4<f32> {
        Transform::compose(&[
            Transform::rotation_y(-FRAC_PI_4),
            Transform::rotation_x((1.0f32 / 2f32.sqrt()).atan()),
        ])
    }

    #[test]
    fn test_single_triangle_full_brightness() {
        let [a, b, c] = facing_triangle(5.0, 0.0);
        let mesh = mesh(vec![a, b, c], vec![0, 1, 2], vec![3]);
        let camera = Camera::new(Point3::origin(), Vector3::z()).unwrap();
        let light = Light::directional(Vector3::new(0.0, 0.0, -1.0)).unwrap();
        let ctx = RenderContext::new(800, 600);
        let scene = Scene {
            mesh: &mesh,
            model: Matrix4::identity(),
            camera: &camera,
            light: &light,
        };

        let (commands, stats) = build_draw_list(&scene, &ctx);
        assert_eq!(stats.drawn_faces, 1);
        let polys = polygons(&commands);
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].1, Color::gray(255.0));
        assert_eq!(polys[0].0.len(), 3);
    }

    #[test]
    fn test_light_from_behind_gives_ambient() {
        let normal = Vector3::new(0.0, 0.0, -1.0);
        assert_relative_eq!(flat_intensity(Some(&Vector3::new(0.0, 0.0, 1.0)), &normal), 100.0);
        assert_relative_eq!(flat_intensity(None, &normal), 100.0);
        assert_relative_eq!(
            flat_intensity(Some(&Vector3::new(0.0, 0.6, -0.8)), &normal),
            0.8 * 155.0 + 100.0,
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_axis_aligned_cube_shows_front_face_only() {
        let mut cube = Mesh::cube(1.0);
        cube.triangulate().unwrap();
        assert_eq!(cube.face_count(), 12);
        let camera = camera_at(-10.0);
        let light = Light::default();
        let ctx = RenderContext::new(800, 600);
        let scene = Scene {
            mesh: &cube,
            model: Matrix4::identity(),
            camera: &camera,
            light: &light,
        };

        let (commands, stats) = build_draw_list(&scene, &ctx);
        assert_eq!(stats.culled_backface, 10);
        assert_eq!(polygons(&commands).len(), 2);
    }

    #[test]
    fn test_cube_corner_shows_three_faces() {
        let cube = Mesh::cube(1.0);
        let camera = camera_at(-10.0);
        let light = Light::default();
        let ctx = RenderContext::new(800, 600);
        let scene = Scene {
            mesh: &cube,
            model: corner_towards_camera(),
            camera: &camera,
            light: &light,
        };

        for _ in 0..3 {
            let (commands, stats) = build_draw_list(&scene, &ctx);
            assert_eq!(stats.drawn_faces, 3);
            assert_eq!(stats.culled_backface, 3);
            assert_eq!(polygons(&commands).len(), 3);
        }

        let mut triangulated = cube.clone();
        triangulated.triangulate().unwrap();
        let scene = Scene {
            mesh: &triangulated,
            ..scene
        };
        let (commands, _) = build_draw_list(&scene, &ctx);
        assert_eq!(polygons(&commands).len(), 6);
    }

    #[test]
    fn test_nearest_face_drawn_last() {
        let cube = Mesh::cube(1.0);
        let camera = camera_at(-10.0);
        let light = Light::default();
        let mut ctx = RenderContext::new(800, 600);
        ctx.backface_culling = false;
        let model = Transform::rotation_matrix(&RotationState::new(0.4, 0.7, 0.1));
        let scene = Scene {
            mesh: &cube,
            model,
            camera: &camera,
            light: &light,
        };

        let mut surface = RenderSurface::new(Vec::new());
        surface.render(&scene, &ctx);
        let order: Vec<usize> = surface.buffers.visible.iter().map(|v| v.face).collect();
        assert_eq!(order.len(), 6);
        let depths: Vec<f32> = surface.buffers.visible.iter().map(|v| v.depth).collect();
        assert!(depths.windows(2).all(|w| w[0] >= w[1]));

        let faces = cube.generate_faces();
        let view = Transform::compose(&[model, camera.view_matrix()]);
        let nearest = (0..6)
            .min_by(|&a, &b| {
                let za = (view * cube.face_centers(&faces)[a]).z;
                let zb = (view * cube.face_centers(&faces)[b]).z;
                za.total_cmp(&zb)
            })
            .unwrap();
        assert_eq!(*order.last().unwrap(), nearest);
    }

    #[test]
    fn test_backface_is_never_drawn() {
        // Seen from z = 0 the triangle at z = 5 is wound CCW; flipping the
        // winding convention turns it into a back face.
        let [a, b, c] = facing_triangle(5.0, 0.0);
        let mesh = mesh(vec![a, b, c], vec![0, 1, 2], vec![3]);
        let light = Light::default();
        let mut ctx = RenderContext::new(800, 600);
        ctx.ccw_normals = false;

        for z in [-20.0, -5.0, 0.0, 3.0] {
            let camera = camera_at(z);
            let scene = Scene {
                mesh: &mesh,
                model: Matrix4::identity(),
                camera: &camera,
                light: &light,
            };
            let (commands, stats) = build_draw_list(&scene, &ctx);
            assert!(commands.is_empty());
            assert_eq!(stats.culled_backface, 1);
        }
    }

    #[test]
    fn test_farther_face_emitted_first() {
        let near = facing_triangle(4.0, -2.0);
        let far = facing_triangle(9.0, 1.0);
        // Near face first in the input, so sorting has to move it.
        let mesh = mesh(
            near.iter().chain(far.iter()).copied().collect(),
            vec![0, 1, 2, 3, 4, 5],
            vec![3, 3],
        );
        let camera = camera_at(0.0);
        let light = Light::default();
        let mut ctx = RenderContext::new(800, 600);
        ctx.depth_shading = true;
        let scene = Scene {
            mesh: &mesh,
            model: Matrix4::identity(),
            camera: &camera,
            light: &light,
        };

        let (commands, _) = build_draw_list(&scene, &ctx);
        let polys = polygons(&commands);
        assert_eq!(polys.len(), 2);
        // The far triangle sits right of center.
        assert!(polys[0].0[0].x > 400.0);
        assert!(polys[1].0[0].x < 400.0);
        // Depth shading darkens the far face completely.
        assert_eq!(polys[0].1, Color::gray(0.0));
        assert_eq!(polys[1].1, Color::gray(255.0));

        ctx.z_sorting = false;
        let (commands, _) = build_draw_list(&scene, &ctx);
        assert!(polygons(&commands)[0].0[0].x < 400.0);
    }

    #[test]
    fn test_equal_depths_keep_input_order() {
        let mut vertices = Vec::new();
        for i in 0..4 {
            vertices.extend(facing_triangle(6.0, i as f32 * 0.5 - 1.0));
        }
        let mesh = mesh(vertices, (0..12).collect(), vec![3; 4]);
        let camera = camera_at(0.0);
        let light = Light::default();
        let ctx = RenderContext::new(800, 600);
        let scene = Scene {
            mesh: &mesh,
            model: Matrix4::identity(),
            camera: &camera,
            light: &light,
        };
        let mut surface = RenderSurface::new(Vec::new());
        surface.render(&scene, &ctx);
        let order: Vec<usize> = surface.buffers.visible.iter().map(|v| v.face).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_viewport_culling_all_outside_xy() {
        // Wide FOV keeps the math simple: x_screen = 400 + 400 * x / z.
        let off = [
            Point3::new(30.0, 0.0, 10.0),
            Point3::new(31.0, 0.0, 10.0),
            Point3::new(30.0, 1.0, 10.0),
        ];
        let mesh = mesh(off.to_vec(), vec![0, 1, 2], vec![3]);
        let camera = camera_at(0.0);
        let light = Light::default();
        let mut ctx = RenderContext::new(800, 800);
        let scene = Scene {
            mesh: &mesh,
            model: Matrix4::identity(),
            camera: &camera,
            light: &light,
        };
        let (commands, stats) = build_draw_list(&scene, &ctx);
        assert!(commands.is_empty());
        assert_eq!(stats.culled_viewport, 1);

        ctx.viewport_culling = false;
        let (commands, _) = build_draw_list(&scene, &ctx);
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn test_viewport_culling_keeps_partially_visible() {
        // Only the first vertex projects inside the screen.
        let partial = [
            Point3::new(5.0, 0.0, 10.0),
            Point3::new(40.0, 0.0, 10.0),
            Point3::new(5.0, 40.0, 10.0),
        ];
        let mesh = mesh(partial.to_vec(), vec![0, 1, 2], vec![3]);
        let camera = camera_at(0.0);
        let light = Light::default();
        let ctx = RenderContext::new(800, 800);
        let scene = Scene {
            mesh: &mesh,
            model: Matrix4::identity(),
            camera: &camera,
            light: &light,
        };
        let (commands, stats) = build_draw_list(&scene, &ctx);
        assert_eq!(stats.culled_viewport, 0);
        assert_eq!(polygons(&commands).len(), 1);
    }

    #[test]
    fn test_viewport_culling_any_vertex_beyond_depth() {
        // Centered on screen, but one vertex lies past the far plane.
        let deep = [
            Point3::new(0.0, 0.0, 10.0),
            Point3::new(1.0, 0.0, 10.0),
            Point3::new(0.0, 1.0, 150.0),
        ];
        let mesh = mesh(deep.to_vec(), vec![0, 1, 2], vec![3]);
        let camera = camera_at(0.0);
        let light = Light::default();
        let mut ctx = RenderContext::new(800, 800);
        ctx.backface_culling = false;
        let scene = Scene {
            mesh: &mesh,
            model: Matrix4::identity(),
            camera: &camera,
            light: &light,
        };
        let (commands, stats) = build_draw_list(&scene, &ctx);
        assert!(commands.is_empty());
        assert_eq!(stats.culled_viewport, 1);
    }

    #[test]
    fn test_bad_faces_are_skipped_not_fatal() {
        let [a, b, c] = facing_triangle(5.0, 0.0);
        let vertices = vec![
            a,
            b,
            c,
            // Collinear.
            Point3::new(0.0, 0.0, 5.0),
            Point3::new(1.0, 1.0, 5.0),
            Point3::new(2.0, 2.0, 5.0),
            // Touches the camera plane (w = 0).
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 5.0),
            Point3::new(0.0, 1.0, 5.0),
        ];
        let mesh = mesh(vertices, (0..9).collect(), vec![3, 3, 3]);
        let camera = camera_at(0.0);
        let light = Light::default();
        let ctx = RenderContext::new(800, 600);
        let scene = Scene {
            mesh: &mesh,
            model: Matrix4::identity(),
            camera: &camera,
            light: &light,
        };
        let (commands, stats) = build_draw_list(&scene, &ctx);
        assert_eq!(stats.degenerate, 1);
        assert_eq!(stats.invalid_w, 1);
        assert_eq!(polygons(&commands).len(), 1);
        for (points, _) in polygons(&commands) {
            assert!(points.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
        }
    }

    #[test]
    fn test_wireframe_edges_far_to_near() {
        let cube = Mesh::cube(1.0);
        let camera = camera_at(-10.0);
        let light = Light::default();
        let mut ctx = RenderContext::new(800, 600);
        ctx.mode = RenderMode::Wireframe;
        ctx.backface_culling = false;
        let scene = Scene {
            mesh: &cube,
            model: corner_towards_camera(),
            camera: &camera,
            light: &light,
        };

        let (commands, stats) = build_draw_list(&scene, &ctx);
        assert_eq!(stats.commands, 24);
        assert!(commands
            .iter()
            .all(|c| matches!(c, DrawCommand::LineSegment { .. })));
        // Brightness grows as the edges get closer.
        let levels: Vec<u8> = commands.iter().map(|c| c.color().r).collect();
        assert!(levels.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(levels[0], 0);
        assert_eq!(*levels.last().unwrap(), 255);
    }

    #[test]
    fn test_wireframe_respects_culling() {
        let cube = Mesh::cube(1.0);
        let camera = camera_at(-10.0);
        let light = Light::default();
        let mut ctx = RenderContext::new(800, 600);
        ctx.mode = RenderMode::Wireframe;
        let scene = Scene {
            mesh: &cube,
            model: corner_towards_camera(),
            camera: &camera,
            light: &light,
        };
        let (commands, _) = build_draw_list(&scene, &ctx);
        assert_eq!(commands.len(), 12);
    }

    #[test]
    fn test_gouraud_falls_back_to_flat() {
        let cube = Mesh::cube(1.0);
        let camera = camera_at(-10.0);
        let light = Light::default();
        let mut ctx = RenderContext::new(800, 600);
        let scene = Scene {
            mesh: &cube,
            model: corner_towards_camera(),
            camera: &camera,
            light: &light,
        };
        let (flat, _) = build_draw_list(&scene, &ctx);
        ctx.mode = RenderMode::Gouraud;
        let mut surface = RenderSurface::new(Vec::new());
        surface.render(&scene, &ctx);
        assert!(surface.gouraud_warned);
        assert_eq!(surface.into_inner(), flat);
    }

    #[test]
    fn test_show_normals_adds_red_segments() {
        let cube = Mesh::cube(1.0);
        let camera = camera_at(-10.0);
        let light = Light::default();
        let mut ctx = RenderContext::new(800, 600);
        ctx.show_normals = true;
        let scene = Scene {
            mesh: &cube,
            model: corner_towards_camera(),
            camera: &camera,
            light: &light,
        };
        let (commands, stats) = build_draw_list(&scene, &ctx);
        assert_eq!(stats.commands, 6);
        for pair in commands.chunks(2) {
            assert!(matches!(pair[0], DrawCommand::FilledPolygon { .. }));
            assert_eq!(pair[1].color(), Color::RED);
        }
    }

    #[test]
    fn test_surface_reuse_matches_fresh_run() {
        let cube = Mesh::cube(1.0);
        let camera = camera_at(-10.0);
        let light = Light::default();
        let ctx = RenderContext::new(800, 600);
        let scene = Scene {
            mesh: &cube,
            model: corner_towards_camera(),
            camera: &camera,
            light: &light,
        };
        let mut surface = RenderSurface::new(Vec::new());
        surface.render(&scene, &ctx);
        surface.sink_mut().clear();
        let stats = surface.render(&scene, &ctx);
        let (fresh, fresh_stats) = build_draw_list(&scene, &ctx);
        assert_eq!(stats, fresh_stats);
        assert_eq!(surface.sink(), &fresh);
    }

    #[test]
    fn test_depth_range_factor() {
        let range = DepthRange::from_depths([2.0, 4.0, 6.0].into_iter());
        assert_relative_eq!(range.factor(6.0), 0.0);
        assert_relative_eq!(range.factor(4.0), 0.5);
        assert_relative_eq!(range.factor(2.0), 1.0);

        // Negative depths floor the minimum at zero.
        let range = DepthRange::from_depths([-2.0, 4.0].into_iter());
        assert_relative_eq!(range.factor(2.0), 0.5);
        assert_relative_eq!(range.factor(-2.0), 1.0);

        let single = DepthRange::from_depths([3.0].into_iter());
        assert_relative_eq!(single.factor(3.0), 1.0);
        let empty = DepthRange::from_depths(std::iter::empty());
        assert_relative_eq!(empty.factor(3.0), 1.0);
    }
}
