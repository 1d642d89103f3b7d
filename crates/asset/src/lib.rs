//! Asset loading/parsers (meshes, materials, textures).
//! OBJ text is parsed into an attribute pool + face list, then built into
//! an indexed, deduplicated triangle mesh ready for GPU upload.

pub mod builder;
pub mod error;
pub mod mesh;
pub mod mtl;
pub mod obj;
pub mod texture;

pub use error::{AssetError, AssetResult, AttributeKind};
pub use mesh::{MeshData, MeshVertex, SubMesh};
pub use obj::{LoadedModel, load_model};
