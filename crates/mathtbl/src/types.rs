//! Summary types computed from decoded scenes.

use glam::Vec3;
use mathtbl_decode::{FaceKind, SceneData, SubChunk};

/// Axis-aligned bounds of a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    /// Bounds containing only `point`.
    #[must_use]
    pub fn from_point(point: Vec3) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Grow to include `point`.
    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

fn extend_bounds(bounds: &mut Option<Bounds>, point: Vec3) {
    match bounds {
        Some(b) => b.extend(point),
        None => *bounds = Some(Bounds::from_point(point)),
    }
}

/// Counts of everything a scene decoded to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneStats {
    pub chunks: usize,
    /// Chunks dropped with a diagnostic.
    pub skipped_chunks: usize,
    pub environments: usize,
    pub sub_chunks: usize,
    /// Sub-chunks kept with a tag that has no known layout.
    pub unknown_sub_chunks: usize,
    pub matrices: usize,
    pub triangles: usize,
    pub quads: usize,
    pub mesh_sets: usize,
    pub vertices: usize,
    pub textures: usize,
    pub palette_entries: usize,
    pub diagnostics: usize,
    /// Bounds of every collision corner.
    pub collision_bounds: Option<Bounds>,
    /// Bounds of every mesh vertex position.
    pub mesh_bounds: Option<Bounds>,
}

impl SceneStats {
    #[must_use]
    pub fn from_scene(scene: &SceneData) -> Self {
        let mut stats = Self {
            chunks: scene.chunks.len(),
            skipped_chunks: scene.chunks.iter().filter(|c| c.body.is_none()).count(),
            diagnostics: scene.diagnostics.len(),
            ..Self::default()
        };

        for environment in scene.environments() {
            stats.environments += 1;
            stats.sub_chunks += environment.sub_chunks.len();
            stats.unknown_sub_chunks += environment
                .sub_chunks
                .iter()
                .filter(|s| matches!(s.variant, SubChunk::Unknown(_)))
                .count();
            stats.matrices += environment.matrices().count();

            for face in environment.collision_faces() {
                match face.kind() {
                    FaceKind::Triangle => stats.triangles += 1,
                    FaceKind::Quad => stats.quads += 1,
                }
                for corner in face.vertices() {
                    extend_bounds(&mut stats.collision_bounds, corner.truncate());
                }
            }

            for set in environment.mesh_sets() {
                stats.mesh_sets += 1;
                stats.vertices += set.vertices.len();
                for vertex in &set.vertices {
                    extend_bounds(&mut stats.mesh_bounds, vertex.position);
                }
            }
        }

        for set in scene.texture_sets() {
            stats.textures += set.textures.len();
            stats.palette_entries += set
                .textures
                .iter()
                .map(|t| t.palette_entries.len())
                .sum::<usize>();
        }

        stats
    }

    /// Collision faces of either kind.
    #[must_use]
    pub fn faces(&self) -> usize {
        self.triangles + self.quads
    }
}
