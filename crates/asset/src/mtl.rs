//! MTL material libraries: diffuse colour and diffuse texture only.

use std::{
    io::BufRead,
    path::{Path, PathBuf},
};

use crate::{
    error::AssetResult,
    obj::{open, read_records},
};

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    /// `Kd`, linear RGB.
    pub diffuse: [f32; 3],
    /// `map_Kd`, relative to the library file unless loaded via
    /// [`load_mtl_from_path`], which resolves it against the library's directory.
    pub diffuse_texture: Option<PathBuf>,
}

impl Material {
    /// White, untextured material.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            diffuse: [1.0, 1.0, 1.0],
            diffuse_texture: None,
        }
    }
}

/// Parse a material library from a file, resolving texture paths next to it.
pub fn load_mtl_from_path(path: impl AsRef<Path>) -> AssetResult<Vec<Material>> {
    let path = path.as_ref();
    let mut materials = parse_mtl(open(path)?)?;
    let base_dir = path.parent().unwrap_or(Path::new(""));
    for material in &mut materials {
        if let Some(tex) = material.diffuse_texture.take() {
            material.diffuse_texture = Some(base_dir.join(tex));
        }
    }
    log::debug!("Loaded {} materials from {:?}", materials.len(), path);
    Ok(materials)
}

const MTL_RECORDS: &[&str] = &["newmtl", "Kd", "map_Kd"];

pub fn parse_mtl<R: BufRead>(reader: R) -> AssetResult<Vec<Material>> {
    let mut materials: Vec<Material> = Vec::new();

    read_records(reader, MTL_RECORDS, |rec| {
        let mut parts = rec.text.split_whitespace();
        let Some(tag) = parts.next() else {
            return Ok(());
        };

        match tag {
            "newmtl" => {
                let name = parts
                    .next()
                    .ok_or_else(|| rec.malformed("missing material name"))?;
                materials.push(Material::named(name));
            }
            "Kd" => {
                let current = materials
                    .last_mut()
                    .ok_or_else(|| rec.malformed("Kd before newmtl"))?;
                current.diffuse = [
                    rec.f32(parts.next(), "red component")?,
                    rec.f32(parts.next(), "green component")?,
                    rec.f32(parts.next(), "blue component")?,
                ];
            }
            "map_Kd" => {
                let current = materials
                    .last_mut()
                    .ok_or_else(|| rec.malformed("map_Kd before newmtl"))?;
                // Options such as `-s 1 1 1` precede the file name.
                let file = parts
                    .last()
                    .ok_or_else(|| rec.malformed("missing texture path"))?;
                current.diffuse_texture = Some(PathBuf::from(file));
            }
            other => {
                log::trace!("Ignoring MTL statement '{}' on line {}", other, rec.line);
            }
        }
        Ok(())
    })?;

    Ok(materials)
}
