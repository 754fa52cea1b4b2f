/// Terminal front-end for the SW3D software renderer
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute, queue,
    style::{Color as TermColor, Print, ResetColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use nalgebra::{Point3, Vector3};
use std::io::{self, stdout, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use sw3d_core::{
    config::RenderSettings, obj, Camera, FrameStats, Light, Mesh, ModelTransform, RenderContext,
    RenderMode, RenderSurface, Scene, Settings,
};
use tracing::{debug, info, warn};

pub mod canvas;
pub mod fps;

pub use canvas::AsciiCanvas;
pub use fps::FpsMeter;

/// Terminal cells are roughly twice as tall as they are wide.
const CELL_ASPECT: f32 = 2.0;

/// Degrees added or removed per FOV key press.
const FOV_STEP_DEGREES: f32 = 5.0;

/// Model spin per frame, in radians.
const SPIN_PER_FRAME: f32 = 0.015;

/// Factor applied to the near or far plane per key press.
const PLANE_STEP: f32 = 1.5;

/// Main application struct for terminal 3D rendering
pub struct TerminalApp {
    mesh: Mesh,
    models: Vec<PathBuf>,
    current_model: Option<usize>,
    model: ModelTransform,
    spin: bool,
    camera: Camera,
    light: Light,
    settings: Settings,
    context: RenderContext,
    surface: RenderSurface<AsciiCanvas>,
    fps: FpsMeter,
    stats: FrameStats,
    drag_from: Option<(u16, u16)>,
    running: bool,
}

impl TerminalApp {
    /// App sized to the current terminal.
    pub fn new(mesh: Mesh, settings: Settings) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        Ok(Self::with_size(mesh, settings, width, height))
    }

    pub fn with_size(mesh: Mesh, settings: Settings, width: u16, height: u16) -> Self {
        let mut camera = frame_mesh(&mesh);
        camera.set_pitch_clamp(settings.camera.pitch_clamp_degrees);
        let context = build_context(&settings.render, width, height);
        let models = settings.list_models();

        Self {
            mesh,
            models,
            current_model: None,
            model: ModelTransform::default(),
            spin: true,
            camera,
            light: Light::default(),
            settings,
            context,
            surface: RenderSurface::new(AsciiCanvas::new(width as usize, height as usize)),
            fps: FpsMeter::default(),
            stats: FrameStats::default(),
            drag_from: None,
            running: true,
        }
    }

    /// Mark `path` as the model on screen, so model cycling continues from it.
    pub fn set_model_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        let index = match self.models.iter().position(|p| *p == path) {
            Some(index) => index,
            None => {
                self.models.push(path);
                self.models.len() - 1
            }
        };
        self.current_model = Some(index);
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn canvas(&self) -> &AsciiCanvas {
        self.surface.sink()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            cursor::Hide,
            EnableMouseCapture
        )?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(
            stdout(),
            DisableMouseCapture,
            terminal::LeaveAlternateScreen,
            cursor::Show
        )?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?);
            }

            self.update();
            self.render_frame();
            self.present()?;

            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }
            self.fps.tick(Instant::now());
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press | KeyEventKind::Repeat,
                ..
            }) => self.handle_key(code),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(width, height) => self.resize(width, height),
            _ => {}
        }
    }

    fn handle_key(&mut self, code: KeyCode) {
        let speed = self.settings.camera.cam_speed;
        let turn = self.settings.camera.cam_sensitivity;
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.running = false;
            }
            KeyCode::Char('w') => self.camera.move_by(self.camera.forward() * speed),
            KeyCode::Char('s') => self.camera.move_by(-self.camera.forward() * speed),
            KeyCode::Char('d') => self.camera.move_by(self.camera.right() * speed),
            KeyCode::Char('a') => self.camera.move_by(-self.camera.right() * speed),
            KeyCode::Char('r') => self.camera.move_by(Vector3::y() * speed),
            KeyCode::Char('f') => self.camera.move_by(-Vector3::y() * speed),
            KeyCode::Up => {
                self.camera.change_pitch(turn);
            }
            KeyCode::Down => {
                self.camera.change_pitch(-turn);
            }
            KeyCode::Left => self.camera.change_yaw(-turn),
            KeyCode::Right => self.camera.change_yaw(turn),
            KeyCode::Char('1') => self.context.mode = RenderMode::Wireframe,
            KeyCode::Char('2') => self.context.mode = RenderMode::Flat,
            KeyCode::Char('3') => self.context.mode = RenderMode::Gouraud,
            KeyCode::Char('m') => self.context.mode = self.context.mode.next(),
            KeyCode::Char('b') => toggle(&mut self.context.backface_culling),
            KeyCode::Char('v') => toggle(&mut self.context.viewport_culling),
            KeyCode::Char('z') => toggle(&mut self.context.z_sorting),
            KeyCode::Char('c') => toggle(&mut self.context.depth_shading),
            KeyCode::Char('n') => toggle(&mut self.context.show_normals),
            KeyCode::Char('o') => toggle(&mut self.context.ccw_normals),
            KeyCode::Char(' ') => toggle(&mut self.spin),
            KeyCode::Tab => self.cycle_model(1),
            KeyCode::BackTab => self.cycle_model(-1),
            KeyCode::Char('x') => {
                toggle(&mut self.settings.exchange_axes);
                if let Some(index) = self.current_model {
                    self.load_model(index);
                }
            }
            KeyCode::Char(',') => {
                let z_near = self.context.z_near() / PLANE_STEP;
                self.context.set_z_near(z_near);
            }
            KeyCode::Char('.') => {
                let z_near = self.context.z_near() * PLANE_STEP;
                self.context.set_z_near(z_near);
            }
            KeyCode::Char('<') => {
                let z_far = self.context.z_far() / PLANE_STEP;
                self.context.set_z_far(z_far);
            }
            KeyCode::Char('>') => {
                let z_far = self.context.z_far() * PLANE_STEP;
                self.context.set_z_far(z_far);
            }
            KeyCode::Char('[') => {
                let fov = self.context.fov_degrees() - FOV_STEP_DEGREES;
                self.context.set_fov_degrees(fov);
            }
            KeyCode::Char(']') => {
                let fov = self.context.fov_degrees() + FOV_STEP_DEGREES;
                self.context.set_fov_degrees(fov);
            }
            _ => {}
        }
    }

    /// Dragging with the left button looks around.
    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.drag_from = Some((mouse.column, mouse.row));
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some((column, row)) = self.drag_from {
                    let scale =
                        self.settings.camera.mouse_sensitivity * self.settings.camera.cam_sensitivity;
                    let dx = mouse.column as f32 - column as f32;
                    let dy = mouse.row as f32 - row as f32;
                    self.camera.change_yaw(dx * scale);
                    self.camera.change_pitch(-dy * scale * CELL_ASPECT);
                }
                self.drag_from = Some((mouse.column, mouse.row));
            }
            MouseEventKind::Up(_) => self.drag_from = None,
            _ => {}
        }
    }

    /// Show the next (`step` > 0) or previous model from the model
    /// directories, skipping files that fail to load.
    fn cycle_model(&mut self, step: isize) {
        if self.models.is_empty() {
            warn!("No models found in the model directories");
            return;
        }
        let count = self.models.len() as isize;
        let start = match self.current_model {
            Some(index) => index as isize,
            None if step > 0 => -1,
            None => count,
        };
        for attempt in 1..=count {
            let index = (start + step * attempt).rem_euclid(count) as usize;
            if self.load_model(index) {
                return;
            }
        }
    }

    /// Replace the mesh wholesale and reframe the camera. On failure the
    /// current mesh stays.
    fn load_model(&mut self, index: usize) -> bool {
        let path = self.models[index].clone();
        match obj::load_obj(&path, self.settings.exchange_axes) {
            Ok(mesh) => {
                self.camera = frame_mesh(&mesh);
                self.camera
                    .set_pitch_clamp(self.settings.camera.pitch_clamp_degrees);
                self.mesh = mesh;
                self.current_model = Some(index);
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping model");
                false
            }
        }
    }

    /// A new viewport needs a new context; the toggles carry over.
    fn resize(&mut self, width: u16, height: u16) {
        self.context = build_context(&self.context.render_settings(), width, height);
        self.surface
            .sink_mut()
            .resize(width as usize, height as usize);
        debug!(width, height, "Terminal resized");
    }

    fn update(&mut self) {
        if self.spin {
            self.model.rotation.rotate(0.0, SPIN_PER_FRAME, 0.0);
        }
    }

    fn render_frame(&mut self) {
        self.surface.sink_mut().clear();
        let scene = Scene {
            mesh: &self.mesh,
            model: self.model.matrix(),
            camera: &self.camera,
            light: &self.light,
        };
        self.stats = self.surface.render(&scene, &self.context);
    }

    fn present(&self) -> io::Result<()> {
        let mut stdout = stdout();
        self.surface.sink().draw(&mut stdout)?;

        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            Clear(ClearType::CurrentLine),
            SetForegroundColor(TermColor::Yellow),
            Print(self.hud()),
            ResetColor
        )?;

        stdout.flush()
    }

    /// Status line: mode, toggles, FPS and camera.
    pub fn hud(&self) -> String {
        let flag = |on: bool, c: char| if on { c.to_ascii_uppercase() } else { c };
        let ctx = &self.context;
        let p = self.camera.position;
        let f = self.camera.forward();
        format!(
            "{} [{}{}{}{}{}{}{}] fov {:.0} z {:.2}..{:.0} | {} | {} fps | faces {}/{} | pos ({:.1} {:.1} {:.1}) fwd ({:.2} {:.2} {:.2}) | q quits",
            ctx.mode,
            flag(ctx.backface_culling, 'b'),
            flag(ctx.viewport_culling, 'v'),
            flag(ctx.z_sorting, 'z'),
            flag(ctx.depth_shading, 'c'),
            flag(ctx.show_normals, 'n'),
            flag(ctx.ccw_normals, 'o'),
            flag(self.settings.exchange_axes, 'x'),
            ctx.fov_degrees(),
            ctx.z_near(),
            ctx.z_far(),
            self.mesh.name,
            self.fps
                .fps()
                .map_or_else(|| "--".to_string(), |fps| format!("{fps:.1}")),
            self.stats.drawn_faces,
            self.stats.faces,
            p.x,
            p.y,
            p.z,
            f.x,
            f.y,
            f.z,
        )
    }
}

fn toggle(flag: &mut bool) {
    *flag = !*flag;
}

/// Render context for a terminal of `width` x `height` cells.
fn build_context(settings: &RenderSettings, width: u16, height: u16) -> RenderContext {
    let mut context = RenderContext::from_settings(settings, width as u32, height as u32);
    context.set_aspect(width.max(1) as f32 / (height.max(1) as f32 * CELL_ASPECT));
    context
}

/// Camera on the -z side of the mesh, far enough back to see all of it.
fn frame_mesh(mesh: &Mesh) -> Camera {
    let vertices = mesh.vertices();
    if vertices.is_empty() {
        return Camera::default();
    }
    let (min, max) = vertices.iter().fold(
        (Vector3::repeat(f32::MAX), Vector3::repeat(f32::MIN)),
        |(min, max), v| (min.inf(&v.coords), max.sup(&v.coords)),
    );
    let center = Point3::from((min + max) / 2.0);
    let radius = ((max - min).norm() / 2.0).max(0.5);
    let position = center - Vector3::z() * radius * 2.5;
    info!(radius, "Framing mesh");
    Camera::new(position, Vector3::z()).unwrap_or_default()
}
