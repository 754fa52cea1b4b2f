/// ASCII canvas for terminal rendering
use crossterm::{
    cursor,
    style::{Color as TermColor, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::Point2;
use std::io::Write;
use sw3d_core::{Color, DrawSurface};

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Character/colour buffer that draws in submission order.
///
/// There is no depth buffer: a later shape overwrites an earlier one.
pub struct AsciiCanvas {
    width: usize,
    height: usize,
    char_buffer: Vec<char>,
    color_buffer: Vec<Color>,
}

impl AsciiCanvas {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            char_buffer: vec![' '; size],
            color_buffer: vec![Color::default(); size],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self) {
        self.char_buffer.fill(' ');
        self.color_buffer.fill(Color::default());
    }

    /// Resize and clear.
    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self::new(width, height);
    }

    /// Character and colour at a cell.
    pub fn cell(&self, x: usize, y: usize) -> Option<(char, Color)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y * self.width + x;
        Some((self.char_buffer[idx], self.color_buffer[idx]))
    }

    /// One text row, for tests and snapshots.
    pub fn row(&self, y: usize) -> String {
        self.char_buffer[y * self.width..(y + 1) * self.width]
            .iter()
            .collect()
    }

    fn plot(&mut self, x: i32, y: i32, character: char, color: Color) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        self.char_buffer[idx] = character;
        self.color_buffer[idx] = color;
    }

    fn rasterize_triangle(&mut self, v0: Point2<f32>, v1: Point2<f32>, v2: Point2<f32>, color: Color) {
        let character = shade_char(color);

        // Bounding box
        let min_x = v0.x.min(v1.x).min(v2.x).floor() as i32;
        let max_x = v0.x.max(v1.x).max(v2.x).ceil() as i32;
        let min_y = v0.y.min(v1.y).min(v2.y).floor() as i32;
        let max_y = v0.y.max(v1.y).max(v2.y).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = Point2::new(x as f32 + 0.5, y as f32 + 0.5);
                if let Some((w0, w1, w2)) = barycentric(v0, v1, v2, p) {
                    if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                        self.plot(x, y, character, color);
                    }
                }
            }
        }
    }

    /// Write the whole buffer, one `MoveTo` per row so raw mode is fine.
    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut current: Option<Color> = None;
        for y in 0..self.height {
            writer.queue(cursor::MoveTo(0, y as u16))?;
            for x in 0..self.width {
                let idx = y * self.width + x;
                let c = self.char_buffer[idx];
                let color = self.color_buffer[idx];
                if c != ' ' && current != Some(color) {
                    writer.queue(SetForegroundColor(TermColor::Rgb {
                        r: color.r,
                        g: color.g,
                        b: color.b,
                    }))?;
                    current = Some(color);
                }
                writer.queue(Print(c))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

impl DrawSurface for AsciiCanvas {
    /// Convex polygons are drawn as a fan around the first point.
    fn fill_polygon(&mut self, points: &[Point2<f32>], color: Color) {
        if let Some((&first, rest)) = points.split_first() {
            for pair in rest.windows(2) {
                self.rasterize_triangle(first, pair[0], pair[1], color);
            }
        }
    }

    fn draw_line(&mut self, from: Point2<f32>, to: Point2<f32>, color: Color) {
        let Some((from, to)) = clip_line(from, to, self.width as f32, self.height as f32) else {
            return;
        };
        let character = shade_char(color);
        let cell = |v: f32, size: usize| (v.floor() as i32).min(size as i32 - 1);

        // Bresenham
        let (mut x0, mut y0) = (cell(from.x, self.width), cell(from.y, self.height));
        let (x1, y1) = (cell(to.x, self.width), cell(to.y, self.height));
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.plot(x0, y0, character, color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }
}

/// Ramp character for a colour's brightness.
fn shade_char(color: Color) -> char {
    let last = LUMINOSITY_RAMP.len() - 1;
    let index = (color.luma() * last as f32).round() as usize;
    LUMINOSITY_RAMP[index.min(last)]
}

/// Clip a segment to `[0, width] x [0, height]` (Liang-Barsky).
fn clip_line(
    from: Point2<f32>,
    to: Point2<f32>,
    width: f32,
    height: f32,
) -> Option<(Point2<f32>, Point2<f32>)> {
    if !(from.x.is_finite() && from.y.is_finite() && to.x.is_finite() && to.y.is_finite()) {
        return None;
    }
    let d = to - from;
    let mut t0 = 0.0f32;
    let mut t1 = 1.0f32;
    for (p, q) in [
        (-d.x, from.x),
        (d.x, width - from.x),
        (-d.y, from.y),
        (d.y, height - from.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let t = q / p;
            if p < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
        }
    }
    if t0 > t1 {
        return None;
    }
    Some((from + d * t0, from + d * t1))
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: Point2<f32>,
    v1: Point2<f32>,
    v2: Point2<f32>,
    p: Point2<f32>,
) -> Option<(f32, f32, f32)> {
    let denom = (v1.y - v2.y) * (v0.x - v2.x) + (v2.x - v1.x) * (v0.y - v2.y);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.y - v2.y) * (p.x - v2.x) + (v2.x - v1.x) * (p.y - v2.y)) / denom;
    let w1 = ((v2.y - v0.y) * (p.x - v2.x) + (v0.x - v2.x) * (p.y - v2.y)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f32, y0: f32, x1: f32, y1: f32) -> Vec<Point2<f32>> {
        vec![
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x1, y1),
            Point2::new(x0, y1),
        ]
    }

    #[test]
    fn test_fill_quad_as_fan() {
        let mut canvas = AsciiCanvas::new(8, 4);
        canvas.fill_polygon(&square(2.0, 1.0, 6.0, 3.0), Color::WHITE);
        assert_eq!(canvas.row(0), "        ");
        assert_eq!(canvas.row(1), "  @@@@  ");
        assert_eq!(canvas.row(2), "  @@@@  ");
        assert_eq!(canvas.cell(3, 2), Some(('@', Color::WHITE)));
    }

    #[test]
    fn test_winding_does_not_matter() {
        let mut canvas = AsciiCanvas::new(8, 4);
        let mut points = square(2.0, 1.0, 6.0, 3.0);
        points.reverse();
        canvas.fill_polygon(&points, Color::WHITE);
        assert_eq!(canvas.row(1), "  @@@@  ");
    }

    #[test]
    fn test_later_commands_overwrite() {
        let mut canvas = AsciiCanvas::new(8, 4);
        canvas.fill_polygon(&square(0.0, 0.0, 8.0, 4.0), Color::gray(100.0));
        canvas.fill_polygon(&square(4.0, 0.0, 8.0, 4.0), Color::WHITE);
        let (dim, _) = canvas.cell(1, 1).unwrap();
        let (bright, _) = canvas.cell(6, 1).unwrap();
        assert_ne!(dim, bright);
        assert_eq!(bright, '@');
    }

    #[test]
    fn test_shade_char_ramp() {
        assert_eq!(shade_char(Color::default()), ' ');
        assert_eq!(shade_char(Color::WHITE), '@');
        assert_eq!(shade_char(Color::gray(128.0)), '+');
    }

    #[test]
    fn test_horizontal_and_diagonal_lines() {
        let mut canvas = AsciiCanvas::new(6, 6);
        canvas.draw_line(Point2::new(0.5, 0.5), Point2::new(5.5, 0.5), Color::WHITE);
        assert_eq!(canvas.row(0), "@@@@@@");

        canvas.clear();
        canvas.draw_line(Point2::new(0.5, 0.5), Point2::new(5.5, 5.5), Color::WHITE);
        for i in 0..6 {
            assert_eq!(canvas.cell(i, i).map(|(c, _)| c), Some('@'));
        }
        assert_eq!(canvas.cell(1, 0).map(|(c, _)| c), Some(' '));
    }

    #[test]
    fn test_lines_are_clipped() {
        let mut canvas = AsciiCanvas::new(4, 4);
        canvas.draw_line(Point2::new(-100.0, 2.5), Point2::new(100.0, 2.5), Color::WHITE);
        assert_eq!(canvas.row(2), "@@@@");

        canvas.clear();
        canvas.draw_line(Point2::new(-10.0, -10.0), Point2::new(-1.0, -5.0), Color::WHITE);
        canvas.draw_line(Point2::new(f32::NAN, 0.0), Point2::new(1.0, 1.0), Color::WHITE);
        assert!((0..4).all(|y| canvas.row(y) == "    "));
    }

    #[test]
    fn test_offscreen_polygon_is_ignored() {
        let mut canvas = AsciiCanvas::new(4, 4);
        canvas.fill_polygon(&square(10.0, 10.0, 20.0, 20.0), Color::WHITE);
        canvas.fill_polygon(&[], Color::WHITE);
        assert!((0..4).all(|y| canvas.row(y) == "    "));
    }

    #[test]
    fn test_draw_writes_every_cell() {
        let mut canvas = AsciiCanvas::new(3, 2);
        canvas.draw_line(Point2::new(0.0, 0.5), Point2::new(3.0, 0.5), Color::RED);
        let mut out = Vec::new();
        canvas.draw(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches(' ').count(), 3);
        assert!(text.contains("\u{1b}[38;2;255;0;0m"));
    }
}
