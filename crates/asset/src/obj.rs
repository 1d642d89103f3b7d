//! Wavefront OBJ parser: positions, texture coordinates, normals, faces and
//! material references.

use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use crate::{
    builder::build_mesh,
    error::{AssetError, AssetResult, AttributeKind},
    mesh::{AttributePool, Face, FaceCorner, MeshData},
    mtl::{self, Material},
};

/// Everything a single pass over an OBJ file produces, before triangulation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjDocument {
    pub pool: AttributePool,
    pub faces: Vec<Face>,
    /// `mtllib` names in file order.
    pub material_libs: Vec<String>,
    /// Distinct `usemtl` names in first-use order; [`Face::material`] indexes this.
    pub material_names: Vec<String>,
}

/// Mesh plus the materials its submeshes refer to.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedModel {
    pub mesh: MeshData,
    /// Aligned with [`ObjDocument::material_names`].
    pub materials: Vec<Material>,
}

/// Load an OBJ mesh from a file path. Material records are parsed but not resolved.
pub fn load_obj_from_path(path: impl AsRef<Path>) -> AssetResult<MeshData> {
    load_obj_from_reader(open(path.as_ref())?)
}

/// Load an OBJ mesh from a [`BufRead`] implementation.
pub fn load_obj_from_reader<R: BufRead>(reader: R) -> AssetResult<MeshData> {
    let doc = parse_obj(reader)?;
    build_mesh(&doc.pool, &doc.faces)
}

/// Convenience helper to parse an OBJ string literal.
pub fn load_obj_from_str(contents: &str) -> AssetResult<MeshData> {
    load_obj_from_reader(io::Cursor::new(contents))
}

/// Load an OBJ file together with the material libraries it names.
///
/// Library paths resolve against the OBJ file's directory. A missing library
/// only costs the materials it would have defined.
pub fn load_model(path: impl AsRef<Path>) -> AssetResult<LoadedModel> {
    let path = path.as_ref();
    log::info!("Loading model from {:?}", path);

    let doc = parse_obj(open(path)?)?;
    let mesh = build_mesh(&doc.pool, &doc.faces)?;

    let base_dir = path.parent().unwrap_or(Path::new(""));
    let mut library: HashMap<String, Material> = HashMap::new();
    for lib in &doc.material_libs {
        match mtl::load_mtl_from_path(base_dir.join(lib)) {
            Ok(materials) => {
                // Later definitions of the same name replace earlier ones.
                library.extend(materials.into_iter().map(|m| (m.name.clone(), m)));
            }
            Err(AssetError::FileNotFound { path, source }) => {
                log::warn!("Material library {:?} unavailable: {}", path, source);
            }
            Err(e) => return Err(e),
        }
    }

    let materials = doc
        .material_names
        .iter()
        .map(|name| {
            library.remove(name).unwrap_or_else(|| {
                log::warn!("Material '{}' is not defined; using default", name);
                Material::named(name)
            })
        })
        .collect();

    log::info!(
        "Loaded {} vertices and {} triangles ({} submeshes)",
        mesh.vertices.len(),
        mesh.triangle_count(),
        mesh.submeshes.len()
    );
    Ok(LoadedModel { mesh, materials })
}

pub(crate) fn open(path: &Path) -> AssetResult<BufReader<File>> {
    let file = File::open(path).map_err(|source| AssetError::FileNotFound {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Source line being parsed, for error reporting.
#[derive(Clone, Copy)]
pub(crate) struct Record<'a> {
    pub line: usize,
    pub text: &'a str,
}

impl Record<'_> {
    pub fn malformed(&self, reason: impl Into<String>) -> AssetError {
        AssetError::malformed(self.line, self.text, reason)
    }

    pub fn f32(&self, value: Option<&str>, what: &str) -> AssetResult<f32> {
        let token = value.ok_or_else(|| self.malformed(format!("missing {what}")))?;
        let value = token
            .parse::<f32>()
            .map_err(|_| self.malformed(format!("invalid {what} '{token}'")))?;
        if !value.is_finite() {
            return Err(self.malformed(format!("non-finite {what} '{token}'")));
        }
        Ok(value)
    }
}

/// Cut a `#` comment. `#` only opens a comment at the start of a token, so
/// names such as `usemtl mat#2` survive.
pub(crate) fn strip_comment(line: &[u8]) -> &[u8] {
    let start = line
        .iter()
        .enumerate()
        .position(|(i, &b)| b == b'#' && (i == 0 || line[i - 1].is_ascii_whitespace()));
    match start {
        Some(end) => &line[..end],
        None => line,
    }
}

/// Feed every non-empty, comment-free line of `reader` to `handle`.
///
/// Lines are only required to be UTF-8 when their tag is in `known`; other
/// lines (exporter banners, unsupported records) are skipped whatever their
/// encoding.
pub(crate) fn read_records<R, F>(mut reader: R, known: &[&str], mut handle: F) -> AssetResult<()>
where
    R: BufRead,
    F: FnMut(Record<'_>) -> AssetResult<()>,
{
    let mut buf = Vec::new();
    let mut line_no = 0;
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|source| AssetError::Io {
                line: line_no + 1,
                source,
            })?;
        if read == 0 {
            return Ok(());
        }
        line_no += 1;

        let raw = strip_comment(&buf);
        let text = match std::str::from_utf8(raw) {
            Ok(text) => text.trim(),
            Err(_) => {
                let lossy = String::from_utf8_lossy(raw);
                let text = lossy.trim();
                let tag = text.split_whitespace().next().unwrap_or_default();
                if known.contains(&tag) {
                    return Err(AssetError::malformed(line_no, text, "record is not valid UTF-8"));
                }
                log::trace!("Skipping non-UTF-8 line {}", line_no);
                continue;
            }
        };
        if text.is_empty() {
            continue;
        }
        handle(Record { line: line_no, text })?;
    }
}

const OBJ_RECORDS: &[&str] = &["v", "vt", "vn", "f", "mtllib", "usemtl"];

/// Parse OBJ text into an attribute pool and face list, failing on the first
/// malformed record.
pub fn parse_obj<R: BufRead>(reader: R) -> AssetResult<ObjDocument> {
    let mut doc = ObjDocument::default();
    let mut current_material: Option<usize> = None;

    read_records(reader, OBJ_RECORDS, |rec| {
        let mut parts = rec.text.split_whitespace();
        let Some(tag) = parts.next() else {
            return Ok(());
        };

        match tag {
            "v" => {
                let x = rec.f32(parts.next(), "x coordinate")?;
                let y = rec.f32(parts.next(), "y coordinate")?;
                let z = rec.f32(parts.next(), "z coordinate")?;
                doc.pool.positions.push([x, y, z]);
            }
            "vt" => {
                let u = rec.f32(parts.next(), "u coordinate")?;
                let v = rec.f32(parts.next(), "v coordinate")?;
                doc.pool.texcoords.push([u, v]);
            }
            "vn" => {
                let nx = rec.f32(parts.next(), "nx coordinate")?;
                let ny = rec.f32(parts.next(), "ny coordinate")?;
                let nz = rec.f32(parts.next(), "nz coordinate")?;
                doc.pool.normals.push([nx, ny, nz]);
            }
            "f" => {
                let corners = parse_face(&rec, parts, &doc.pool)?;
                doc.faces.push(Face {
                    corners,
                    line: rec.line,
                    material: current_material,
                });
            }
            "mtllib" => {
                let before = doc.material_libs.len();
                doc.material_libs.extend(parts.map(str::to_owned));
                if doc.material_libs.len() == before {
                    return Err(rec.malformed("missing material library name"));
                }
            }
            "usemtl" => {
                let name = parts
                    .next()
                    .ok_or_else(|| rec.malformed("missing material name"))?;
                let index = match doc.material_names.iter().position(|n| n == name) {
                    Some(index) => index,
                    None => {
                        doc.material_names.push(name.to_owned());
                        doc.material_names.len() - 1
                    }
                };
                current_material = Some(index);
            }
            other => {
                log::trace!("Ignoring OBJ record '{}' on line {}", other, rec.line);
            }
        }
        Ok(())
    })?;

    log::debug!(
        "Parsed OBJ: {} positions, {} texcoords, {} normals, {} faces",
        doc.pool.positions.len(),
        doc.pool.texcoords.len(),
        doc.pool.normals.len(),
        doc.faces.len()
    );
    Ok(doc)
}

/// Raw 1-based indices of one corner token, before range checks.
struct RawCorner {
    position: i64,
    texcoord: Option<i64>,
    normal: Option<i64>,
}

fn parse_face<'a>(
    rec: &Record<'_>,
    tokens: impl Iterator<Item = &'a str>,
    pool: &AttributePool,
) -> AssetResult<Vec<FaceCorner>> {
    // Syntax first, then arity, then index ranges.
    let raw = tokens
        .map(|token| parse_corner_token(rec, token))
        .collect::<AssetResult<Vec<_>>>()?;

    if !(3..=4).contains(&raw.len()) {
        return Err(AssetError::UnsupportedFaceArity {
            line: rec.line,
            corners: raw.len(),
        });
    }

    raw.iter()
        .map(|c| -> AssetResult<FaceCorner> {
            Ok(FaceCorner {
                position: resolve_index(
                    rec,
                    c.position,
                    pool.positions.len(),
                    AttributeKind::Position,
                )?,
                texcoord: c
                    .texcoord
                    .map(|i| resolve_index(rec, i, pool.texcoords.len(), AttributeKind::Texcoord))
                    .transpose()?,
                normal: c
                    .normal
                    .map(|i| resolve_index(rec, i, pool.normals.len(), AttributeKind::Normal))
                    .transpose()?,
            })
        })
        .collect()
}

/// Accepts `v`, `v/t`, `v/t/n` and `v//n`.
fn parse_corner_token(rec: &Record<'_>, token: &str) -> AssetResult<RawCorner> {
    let mut split = token.split('/');
    let position = match split.next() {
        Some(value) if !value.is_empty() => parse_index(rec, value, AttributeKind::Position)?,
        _ => return Err(rec.malformed(format!("face corner '{token}' has no position index"))),
    };

    let texcoord = match split.next() {
        Some(value) if !value.is_empty() => Some(parse_index(rec, value, AttributeKind::Texcoord)?),
        _ => None,
    };

    let normal = match split.next() {
        Some(value) if !value.is_empty() => Some(parse_index(rec, value, AttributeKind::Normal)?),
        Some(_) => {
            return Err(rec.malformed(format!("face corner '{token}' has an empty normal index")));
        }
        None => None,
    };

    if split.next().is_some() {
        return Err(rec.malformed(format!("face corner '{token}' has too many components")));
    }

    Ok(RawCorner {
        position,
        texcoord,
        normal,
    })
}

fn parse_index(rec: &Record<'_>, token: &str, attribute: AttributeKind) -> AssetResult<i64> {
    token
        .parse::<i64>()
        .map_err(|_| rec.malformed(format!("invalid {attribute} index '{token}'")))
}

/// Map a 1-based index into the populated pool. Zero and negative
/// (relative) indices are rejected.
fn resolve_index(
    rec: &Record<'_>,
    raw: i64,
    len: usize,
    attribute: AttributeKind,
) -> AssetResult<usize> {
    if raw < 1 || raw as u64 > len as u64 {
        return Err(AssetError::DanglingIndexReference {
            line: rec.line,
            attribute,
            index: raw,
            len,
        });
    }
    Ok((raw - 1) as usize)
}
