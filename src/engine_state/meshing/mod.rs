//! # Meshing
//!
//! Turns a chunk's voxel grid into a flat triangle mesh of its visible faces.
//!
//! - `face`: quad geometry and atlas coordinates of a single face
//! - `mesh`: the `ChunkMesh` buffers and the interleaved `Vertex` layout
//! - `face_culling`: the mesher itself
//! - `chunk_mesh_task`: the worker task that meshes a chunk off the world lock

pub mod chunk_mesh_task;
pub mod face;
pub mod face_culling;
pub mod mesh;

pub use chunk_mesh_task::{ChunkMeshGenerationTask, MeshSink};
pub use face_culling::{build_chunk_mesh, count_faces, CullingMode};
pub use mesh::{ChunkMesh, Vertex};
