//! Scene graph: the object model and the software rasterizer backend.

pub mod object;
pub mod raster;

pub use object::{ObjectId, SceneObject, ShapeKind};
pub use raster::RasterEngine;

/// A raster snapshot of the full composition at the moment of export
///
/// Created on demand by [`crate::CompositionSurface::export`]; ownership is
/// handed straight to the download mechanism, nothing is retained.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub width: u32,
    pub height: u32,
    /// Download filename, taken from the session configuration
    pub filename: String,
    pub png_data: Vec<u8>,
}

impl ExportArtifact {
    /// Hex SHA-256 of the encoded bytes. Useful for logging and for
    /// asserting export determinism in tests.
    pub fn digest(&self) -> String {
        use sha2::{Digest, Sha256};
        hex::encode(Sha256::digest(&self.png_data))
    }
}
