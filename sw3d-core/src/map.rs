/// Quake `.map` loader
///
/// Reads entities, their `"key" "value"` properties and their brushes. Each
/// brush face line `( x y z ) ( x y z ) ( x y z ) texture ...` becomes a
/// [`Plane`]; texture fields are ignored. Brushes are not converted to meshes.
use std::fs;
use std::path::Path;

use nalgebra::{Point3, Vector3};
use nom::{
    bytes::complete::take_till,
    character::complete::{char, space0, space1},
    combinator::{all_consuming, rest},
    sequence::{delimited, preceded, terminated, tuple},
    IResult,
};
use tracing::{debug, info};

use crate::error::{GeometryResult, LoadError, LoadResult};
use crate::obj::finite_float;
use crate::transform::normalize;

/// Infinite plane `normal . p = distance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f32>,
    pub distance: f32,
}

impl Plane {
    /// Plane through three points, facing along `(b - a) x (c - a)`.
    ///
    /// Fails with `DegenerateVector` when the points are collinear.
    pub fn from_points(a: &Point3<f32>, b: &Point3<f32>, c: &Point3<f32>) -> GeometryResult<Self> {
        let normal = normalize(&(b - a).cross(&(c - a)))?;
        Ok(Self {
            normal,
            distance: normal.dot(&a.coords),
        })
    }

    /// Positive on the side the normal points to.
    pub fn signed_distance(&self, p: &Point3<f32>) -> f32 {
        self.normal.dot(&p.coords) - self.distance
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Brush {
    pub planes: Vec<Plane>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entity {
    /// Properties in file order; keys may repeat.
    pub properties: Vec<(String, String)>,
    pub brushes: Vec<Brush>,
}

impl Entity {
    /// First value stored under `key`.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn classname(&self) -> Option<&str> {
        self.property("classname")
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuakeMap {
    pub entities: Vec<Entity>,
}

impl QuakeMap {
    pub fn brush_count(&self) -> usize {
        self.entities.iter().map(|e| e.brushes.len()).sum()
    }

    /// The `worldspawn` entity, if the map has one.
    pub fn worldspawn(&self) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|e| e.classname() == Some("worldspawn"))
    }
}

/// Block nesting while reading a map.
enum Level {
    Root,
    Entity(Entity),
    Brush(Entity, Brush),
}

/// Parse `.map` text.
pub fn parse_map(input: &str) -> LoadResult<QuakeMap> {
    let mut map = QuakeMap::default();
    let mut level = Level::Root;
    let mut entity_line = 0;
    let mut brush_line = 0;

    for (i, raw) in input.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        level = match (level, line.as_bytes()[0]) {
            (Level::Root, b'{') => {
                entity_line = line_no;
                Level::Entity(Entity::default())
            }
            (Level::Entity(entity), b'{') => {
                brush_line = line_no;
                Level::Brush(entity, Brush::default())
            }
            (Level::Brush(..), b'{') => {
                return Err(LoadError::map_structure(line_no, "blocks nest deeper than brushes"));
            }
            (Level::Root, b'}') => {
                return Err(LoadError::map_structure(line_no, "'}' at root level"));
            }
            (Level::Entity(entity), b'}') => {
                debug!(line = line_no, brushes = entity.brushes.len(), "Closed entity");
                map.entities.push(entity);
                Level::Root
            }
            (Level::Brush(mut entity, brush), b'}') => {
                entity.brushes.push(brush);
                Level::Entity(entity)
            }
            (Level::Entity(mut entity), b'"') => {
                let (key, value) =
                    parse_line(property, line, line_no, "expected '\"key\" \"value\"'")?;
                entity.properties.push((key.to_string(), value.to_string()));
                Level::Entity(entity)
            }
            (_, b'"') => {
                return Err(LoadError::map_structure(line_no, "property outside an entity"));
            }
            (Level::Brush(entity, mut brush), b'(') => {
                let (a, b, c) =
                    parse_line(plane_points, line, line_no, "expected '( x y z ) ( x y z ) ( x y z )'")?;
                let plane = Plane::from_points(&a, &b, &c)
                    .map_err(|_| LoadError::parse(line_no, "brush plane points are collinear"))?;
                brush.planes.push(plane);
                Level::Brush(entity, brush)
            }
            (_, b'(') => {
                return Err(LoadError::map_structure(line_no, "brush plane outside a brush"));
            }
            _ => {
                return Err(LoadError::parse(line_no, format!("unexpected line '{line}'")));
            }
        };
    }

    match level {
        Level::Root => Ok(map),
        Level::Entity(_) => Err(LoadError::map_structure(entity_line, "entity is never closed")),
        Level::Brush(..) => Err(LoadError::map_structure(brush_line, "brush is never closed")),
    }
}

/// Load a `.map` file.
pub fn load_map<P: AsRef<Path>>(path: P) -> LoadResult<QuakeMap> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LoadError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            LoadError::Io(e)
        }
    })?;
    let map = parse_map(&text)?;
    info!(
        path = %path.display(),
        entities = map.entities.len(),
        brushes = map.brush_count(),
        "Loaded MAP"
    );
    Ok(map)
}

fn parse_line<'a, T>(
    parser: impl FnMut(&'a str) -> IResult<&'a str, T>,
    input: &'a str,
    line: usize,
    message: &str,
) -> LoadResult<T> {
    all_consuming(terminated(parser, space0))(input)
        .map(|(_, value)| value)
        .map_err(|_| LoadError::parse(line, message))
}

fn quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_till(|c: char| c == '"'), char('"'))(input)
}

fn property(input: &str) -> IResult<&str, (&str, &str)> {
    tuple((quoted, preceded(space1, quoted)))(input)
}

fn point(input: &str) -> IResult<&str, Point3<f32>> {
    let (input, (x, y, z)) = delimited(
        char('('),
        tuple((
            preceded(space0, finite_float),
            preceded(space1, finite_float),
            preceded(space1, finite_float),
        )),
        preceded(space0, char(')')),
    )(input)?;
    Ok((input, Point3::new(x, y, z)))
}

fn plane_points(input: &str) -> IResult<&str, (Point3<f32>, Point3<f32>, Point3<f32>)> {
    let (input, points) = tuple((point, preceded(space0, point), preceded(space0, point)))(input)?;
    // Texture name and alignment follow.
    let (input, _) = rest(input)?;
    Ok((input, points))
}
