/// Wavefront OBJ loader
///
/// Reads the subset of OBJ the renderer needs: `v` positions, `vn` normals,
/// `f` faces (position index only, 1-based or negative/relative) and the `o`
/// object name. Everything else is skipped.
use std::fs;
use std::path::Path;

use nalgebra::{Point3, Vector3};
use nom::{
    bytes::complete::take_till,
    character::complete::{char, i64 as integer, space0, space1},
    combinator::{all_consuming, opt, verify},
    multi::{many0, many1},
    number::complete::float,
    sequence::{pair, preceded, terminated, tuple},
    IResult,
};
use tracing::{info, trace};

use crate::error::{LoadError, LoadResult};
use crate::geometry::Mesh;

/// Parse OBJ text into a validated mesh.
///
/// With `exchange_axes` set, positions are rotated from a z-up source into
/// the renderer's y-up frame (`y' = -z`, `z' = y`).
pub fn parse_obj(input: &str, exchange_axes: bool) -> LoadResult<Mesh> {
    let mut name = String::new();
    let mut vertices: Vec<Point3<f32>> = Vec::new();
    let mut normals: Vec<Vector3<f32>> = Vec::new();
    let mut indices: Vec<usize> = Vec::new();
    let mut num_vertices: Vec<usize> = Vec::new();

    for (i, raw) in input.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (args, record) = keyword(line)
            .map_err(|_| LoadError::parse(line_no, "missing record keyword"))?;

        match record {
            "v" => {
                let (x, y, z) = parse_with(vector3, args, line_no, "expected 'v x y z'")?;
                let p = if exchange_axes {
                    Point3::new(x, -z, y)
                } else {
                    Point3::new(x, y, z)
                };
                vertices.push(p);
            }
            "vn" => {
                let (x, y, z) = parse_with(vector3, args, line_no, "expected 'vn x y z'")?;
                let n = if exchange_axes {
                    Vector3::new(x, -z, y)
                } else {
                    Vector3::new(x, y, z)
                };
                normals.push(n);
            }
            "f" => {
                let refs = parse_with(face_refs, args, line_no, "expected 'f i j k ...'")?;
                num_vertices.push(refs.len());
                for index in refs {
                    indices.push(resolve_index(index, vertices.len(), line_no)?);
                }
            }
            "o" => name = args.trim().to_string(),
            other => trace!(line = line_no, record = other, "Skipping OBJ record"),
        }
    }

    let mut mesh = Mesh::new(name, vertices, indices, num_vertices)?;
    mesh.normals = normals;
    mesh.validate()?;
    Ok(mesh)
}

/// Load an OBJ file. The mesh is named after the file when the file has no
/// `o` record.
pub fn load_obj<P: AsRef<Path>>(path: P, exchange_axes: bool) -> LoadResult<Mesh> {
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
    let mut mesh = parse_obj(&text, exchange_axes)?;
    if mesh.name.is_empty() {
        if let Some(stem) = path.file_stem() {
            mesh.name = stem.to_string_lossy().into_owned();
        }
    }
    info!(
        path = %path.display(),
        name = %mesh.name,
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        "Loaded OBJ mesh"
    );
    Ok(mesh)
}

fn parse_with<'a, T>(
    parser: impl FnMut(&'a str) -> IResult<&'a str, T>,
    input: &'a str,
    line: usize,
    message: &str,
) -> LoadResult<T> {
    all_consuming(terminated(parser, space0))(input)
        .map(|(_, value)| value)
        .map_err(|_| LoadError::parse(line, message))
}

/// Convert a 1-based or negative (relative) OBJ index to a 0-based one.
fn resolve_index(index: i64, vertex_count: usize, line: usize) -> LoadResult<usize> {
    let resolved = match index {
        i if i > 0 => Some(i as usize - 1),
        i if i < 0 => vertex_count.checked_sub(i.unsigned_abs() as usize),
        _ => None,
    };
    match resolved {
        Some(r) if r < vertex_count => Ok(r),
        _ => Err(LoadError::InvalidIndex { line, index }),
    }
}

fn keyword(input: &str) -> IResult<&str, &str> {
    take_till(|c: char| c.is_whitespace())(input)
}

/// A float that is neither NaN nor infinite.
pub(crate) fn finite_float(input: &str) -> IResult<&str, f32> {
    verify(float, |v: &f32| v.is_finite())(input)
}

fn vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    let (input, (x, y, z)) = tuple((
        preceded(space1, finite_float),
        preceded(space1, finite_float),
        preceded(space1, finite_float),
    ))(input)?;
    // Optional w / colour components are ignored.
    let (input, _) = many0(preceded(space1, finite_float))(input)?;
    Ok((input, (x, y, z)))
}

/// `i`, `i/t`, `i/t/n` or `i//n`; only the position index is kept.
fn face_ref(input: &str) -> IResult<&str, i64> {
    terminated(
        integer,
        opt(pair(char('/'), take_till(|c: char| c.is_whitespace()))),
    )(input)
}

fn face_refs(input: &str) -> IResult<&str, Vec<i64>> {
    many1(preceded(space1, face_ref))(input)
}
