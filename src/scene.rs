use std::path::Path;

use nalgebra::Point3;
use russimp::scene::{PostProcess, Scene as AssimpScene};

/// Triangle geometry extracted from a loaded model file.
pub struct Scene {
    meshes: Vec<Mesh>,
    bounds: Aabb,
}

pub struct Mesh {
    pub vertices: Vec<Point3<f32>>,
    pub faces: Vec<[usize; 3]>,
}

/// Axis-aligned bounding box over every vertex in the scene.
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Default for Aabb {
    fn default() -> Self {
        Self {
            min: Point3::origin(),
            max: Point3::origin(),
        }
    }
}

impl Aabb {
    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Radius of the bounding sphere around [`Self::center`]
    pub fn radius(&self) -> f32 {
        (self.max - self.min).norm() / 2.0
    }
}

impl Scene {
    /// Loads a model from disk. Anything assimp reads (glTF, GLB, OBJ, ...)
    /// is accepted; faces are triangulated during import.
    pub fn load(path: &Path) -> anyhow::Result<Scene> {
        let path_str = path.to_str().ok_or_else(|| {
            anyhow::anyhow!(format!(
                "The model path [{}] is not valid UTF-8.",
                path.display()
            ))
        })?;
        let raw = AssimpScene::from_file(
            path_str,
            vec![
                PostProcess::CalculateTangentSpace,
                PostProcess::Triangulate,
                PostProcess::JoinIdenticalVertices,
                PostProcess::SortByPrimitiveType,
            ],
        )?;

        let meshes = raw
            .meshes
            .iter()
            .map(|mesh| {
                let vertices = mesh
                    .vertices
                    .iter()
                    .map(|v| Point3::new(v.x, v.y, v.z))
                    .collect();
                let faces = mesh
                    .faces
                    .iter()
                    .filter(|face| face.0.len() == 3)
                    .map(|face| {
                        [
                            face.0[0] as usize,
                            face.0[1] as usize,
                            face.0[2] as usize,
                        ]
                    })
                    .collect();
                Mesh { vertices, faces }
            })
            .collect();
        Ok(Scene::from_meshes(meshes))
    }

    /// Builds a scene from already-assembled meshes, bypassing the importer.
    pub fn from_meshes(meshes: Vec<Mesh>) -> Scene {
        let bounds = bounds_of(&meshes);
        Scene { meshes, bounds }
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.faces.len()).sum()
    }
}

fn bounds_of(meshes: &[Mesh]) -> Aabb {
    let mut min = Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY);
    let mut max = Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY);
    let mut seen = false;

    for mesh in meshes {
        for vertex in &mesh.vertices {
            min.x = min.x.min(vertex.x);
            min.y = min.y.min(vertex.y);
            min.z = min.z.min(vertex.z);
            max.x = max.x.max(vertex.x);
            max.y = max.y.max(vertex.y);
            max.z = max.z.max(vertex.z);
            seen = true;
        }
    }
    if seen { Aabb { min, max } } else { Aabb::default() }
}
