use glam::Vec3;

use super::*;
use crate::config::DEFAULT_MAX_DEPTH;
use crate::demo::generate_seeded_splats;
use crate::splat::Splat;

fn point_splat(position: Vec3) -> Splat {
    Splat {
        position,
        color: [200, 200, 200],
        opacity: 1.0,
        scale: Vec3::splat(0.05),
        rotation: [1.0, 0.0, 0.0, 0.0],
    }
}

fn config(max_depth: u32, split_threshold: usize) -> IndexConfig {
    IndexConfig {
        max_depth,
        split_threshold,
    }
}

#[test]
fn leaves_partition_the_dataset() {
    let dataset = SplatDataset::from_splats(&generate_seeded_splats(5_000, 4.0, 11));
    let index = SpatialIndex::build(&dataset, config(6, 64)).unwrap();

    let mut seen = vec![0u32; dataset.vertex_count()];
    index.visit_leaves(|_, data| {
        for &i in data.indices.iter() {
            seen[i as usize] += 1;
        }
    });
    assert!(seen.iter().all(|&count| count == 1));
    assert!(index.count_leaves_with_vertices() > 1);
}

#[test]
fn splats_land_inside_their_leaf_bounds() {
    let dataset = SplatDataset::from_splats(&generate_seeded_splats(2_000, 3.0, 5));
    let index = SpatialIndex::build(&dataset, config(5, 32)).unwrap();

    for (node, data) in index.leaves() {
        for &i in data.indices.iter() {
            let p = dataset.position(i as usize);
            assert!(p.cmpge(node.bounds.min).all() && p.cmple(node.bounds.max).all());
        }
    }
}

#[test]
fn build_is_deterministic() {
    let dataset = SplatDataset::from_splats(&generate_seeded_splats(3_000, 2.0, 3));
    let a = SpatialIndex::build(&dataset, config(5, 50)).unwrap();
    let b = SpatialIndex::build(&dataset, config(5, 50)).unwrap();

    assert_eq!(a.node_count(), b.node_count());
    let leaves_a: Vec<_> = a.leaves().map(|(n, d)| (n.id, d.indices.clone())).collect();
    let leaves_b: Vec<_> = b.leaves().map(|(n, d)| (n.id, d.indices.clone())).collect();
    assert_eq!(leaves_a, leaves_b);
}

#[test]
fn ids_follow_preorder_with_parent_links() {
    let dataset = SplatDataset::from_splats(&generate_seeded_splats(1_000, 2.0, 9));
    let index = SpatialIndex::build(&dataset, config(3, 10)).unwrap();

    assert_eq!(index.root().id, 0);
    assert_eq!(index.root().parent, None);
    for id in 0..index.node_count() as NodeId {
        let node = index.node(id).unwrap();
        assert_eq!(node.id, id);
        if let Some(children) = node.children() {
            for &child in children {
                assert!(child > id);
                let child_node = index.node(child).unwrap();
                assert_eq!(child_node.parent, Some(id));
                assert_eq!(child_node.depth, node.depth + 1);
            }
        }
    }
}

#[test]
fn max_depth_bounds_the_tree() {
    let dataset = SplatDataset::from_splats(&generate_seeded_splats(4_000, 5.0, 21));
    let index = SpatialIndex::build(&dataset, config(2, 1)).unwrap();

    assert_eq!(index.depth(), 2);
    // A full split at every level: 1 + 8 + 64 nodes, 64 leaves.
    assert_eq!(index.node_count(), 73);
    assert_eq!(index.count_leaves(), 64);
}

#[test]
fn small_node_stays_a_leaf() {
    let splats: Vec<_> = (0..4)
        .map(|i| point_splat(Vec3::new(0.0, 0.0, -5.0 * i as f32)))
        .collect();
    let index = SpatialIndex::build(&SplatDataset::from_splats(&splats), config(8, 5)).unwrap();

    assert_eq!(index.node_count(), 1);
    assert_eq!(index.count_leaves(), 1);
    assert_eq!(index.max_leaf_vertex_count(), 4);
}

#[test]
fn empty_leaves_are_visited() {
    // Two opposite corners: six of the eight octants stay empty.
    let splats = [
        point_splat(Vec3::new(-1.0, -1.0, -1.0)),
        point_splat(Vec3::new(1.0, 1.0, 1.0)),
    ];
    let index = SpatialIndex::build(&SplatDataset::from_splats(&splats), config(1, 1)).unwrap();

    assert_eq!(index.count_leaves(), 8);
    assert_eq!(index.count_leaves_with_vertices(), 2);
    let mut empty = 0;
    index.visit_leaves(|_, data| {
        if data.vertex_count() == 0 {
            empty += 1;
        }
    });
    assert_eq!(empty, 6);
}

#[test]
fn identical_positions_build_a_single_point_leaf() {
    let splats = vec![point_splat(Vec3::new(2.0, -1.0, 3.0)); 100];
    let index = SpatialIndex::build(&SplatDataset::from_splats(&splats), config(8, 4)).unwrap();

    assert_eq!(index.count_leaves(), 1);
    let root = index.root();
    assert!(root.bounds.is_point());
    assert_eq!(root.bounds.center(), Vec3::new(2.0, -1.0, 3.0));
    assert_eq!(root.leaf().unwrap().vertex_count(), 100);
}

#[test]
fn empty_dataset_is_rejected() {
    let dataset = SplatDataset::from_splats(&[]);
    let err = SpatialIndex::build(&dataset, IndexConfig::default()).unwrap_err();
    assert_eq!(err, BuildError::EmptyDataset);
}

#[test]
fn zero_split_threshold_is_rejected() {
    let dataset = SplatDataset::from_splats(&[point_splat(Vec3::ZERO)]);
    let err = SpatialIndex::build(&dataset, config(4, 0)).unwrap_err();
    assert_eq!(err, BuildError::InvalidConfig);
}

#[test]
fn max_depth_above_supported_cap_is_rejected() {
    let dataset = SplatDataset::from_splats(&[point_splat(Vec3::ZERO), point_splat(Vec3::ONE)]);
    let err = SpatialIndex::build(&dataset, config(MAX_SUPPORTED_DEPTH + 1, 1)).unwrap_err();
    assert_eq!(err, BuildError::InvalidConfig);
    assert!(SpatialIndex::build(&dataset, config(200_000, 1)).is_err());
}

#[test]
fn single_splat_leaves_stop_at_supported_cap() {
    let dataset = SplatDataset::from_splats(&[point_splat(Vec3::ZERO), point_splat(Vec3::ONE)]);
    let index = SpatialIndex::build(&dataset, config(MAX_SUPPORTED_DEPTH, 1)).unwrap();

    assert!(index.depth() <= MAX_SUPPORTED_DEPTH);
    assert_eq!(index.count_leaves_with_vertices(), 2);
    assert_eq!(index.max_leaf_vertex_count(), 1);
}

#[test]
fn split_that_cannot_separate_splats_stops() {
    let a = Vec3::ONE;
    let b = Vec3::new(f32::from_bits(1.0f32.to_bits() + 1), 1.0, 1.0);
    let dataset = SplatDataset::from_splats(&[point_splat(a), point_splat(b)]);
    let index = SpatialIndex::build(&dataset, config(DEFAULT_MAX_DEPTH, 1)).unwrap();

    assert!(!index.root().bounds.is_point());
    assert_eq!(index.node_count(), 1);
    assert_eq!(index.root().leaf().unwrap().vertex_count(), 2);
}
