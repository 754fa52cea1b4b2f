/// Draw commands handed to an immediate-mode 2D surface
use nalgebra::Point2;

/// 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Grey level from an intensity in `0.0..=255.0`, clamped and rounded.
    pub fn gray(intensity: f32) -> Self {
        let v = if intensity.is_nan() {
            0
        } else {
            intensity.clamp(0.0, 255.0).round() as u8
        };
        Self::rgb(v, v, v)
    }

    /// Perceived brightness in `0.0..=1.0`.
    pub fn luma(&self) -> f32 {
        (0.299 * self.r as f32 + 0.587 * self.g as f32 + 0.114 * self.b as f32) / 255.0
    }
}

/// One shape in screen space, carrying its own colour.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    FilledPolygon {
        points: Vec<Point2<f32>>,
        color: Color,
    },
    LineSegment {
        from: Point2<f32>,
        to: Point2<f32>,
        color: Color,
    },
}

impl DrawCommand {
    pub fn color(&self) -> Color {
        match self {
            DrawCommand::FilledPolygon { color, .. } | DrawCommand::LineSegment { color, .. } => {
                *color
            }
        }
    }
}

/// A 2D surface that draws shapes in submission order.
///
/// Every call carries its colour; implementations must not rely on colour
/// state from an earlier call.
pub trait DrawSurface {
    fn fill_polygon(&mut self, points: &[Point2<f32>], color: Color);

    fn draw_line(&mut self, from: Point2<f32>, to: Point2<f32>, color: Color);

    fn submit(&mut self, command: DrawCommand) {
        match command {
            DrawCommand::FilledPolygon { points, color } => self.fill_polygon(&points, color),
            DrawCommand::LineSegment { from, to, color } => self.draw_line(from, to, color),
        }
    }
}

/// Records commands instead of drawing them.
impl DrawSurface for Vec<DrawCommand> {
    fn fill_polygon(&mut self, points: &[Point2<f32>], color: Color) {
        self.push(DrawCommand::FilledPolygon {
            points: points.to_vec(),
            color,
        });
    }

    fn draw_line(&mut self, from: Point2<f32>, to: Point2<f32>, color: Color) {
        self.push(DrawCommand::LineSegment { from, to, color });
    }

    fn submit(&mut self, command: DrawCommand) {
        self.push(command);
    }
}
