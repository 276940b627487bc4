//! Asset import
//!
//! Turns exported voxel meshes back into box placements.

pub mod ply_loader;

pub use ply_loader::{ImportedBox, MeshError, MeshImport, MeshVertex, PlyLoader};
