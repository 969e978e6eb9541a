use cgmath::{Point3, Vector3};
use cube_world::{build_chunk_mesh, CullingMode, TerrainGenerator, TerrainShape, VoxelGrid, VoxelType};

#[test]
fn solid_two_cube_has_twenty_four_faces() {
    let grid = VoxelGrid::from_fn(Vector3::new(2, 2, 2), |_| VoxelType::DIRT);
    let mesh = build_chunk_mesh(&grid, CullingMode::default());

    assert_eq!(mesh.face_count(), 24);
    assert_eq!(mesh.vertex_count(), 24 * 6);
}

#[test]
fn single_voxel_is_a_closed_cube() {
    let mut grid = VoxelGrid::new(Vector3::new(3, 3, 3));
    assert!(grid.set(Point3::new(1, 1, 1), VoxelType::STONE));
    let mesh = build_chunk_mesh(&grid, CullingMode::default());

    assert_eq!(mesh.vertex_count(), 36);
    assert_eq!(mesh.triangle_count(), 12);

    let mut normals: Vec<[f32; 3]> = mesh.normals().to_vec();
    normals.dedup();
    assert_eq!(normals.len(), 6);
}

#[test]
fn generated_terrain_meshes_within_bounds() {
    let generator = TerrainGenerator::new(2_510_586_073, TerrainShape::Perlin);
    for position in [Point3::new(0, 0, 0), Point3::new(1, -1, 2), Point3::new(-2, 1, -1)] {
        let grid = generator.generate(position);
        let mesh = build_chunk_mesh(&grid, CullingMode::Exact);

        assert!(mesh.face_count() <= 6 * grid.solid_count());
        assert_eq!(mesh.vertex_count() % 6, 0);
        assert!(mesh
            .positions()
            .iter()
            .all(|p| p.iter().all(|c| (0.0..=16.0).contains(c))));
        assert_eq!(mesh.vertices().len(), mesh.vertex_count());

        let heuristic = build_chunk_mesh(&grid, CullingMode::EnclosedSkip);
        assert!(heuristic.face_count() <= mesh.face_count());
    }
}
