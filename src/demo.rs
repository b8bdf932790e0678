use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

use crate::splat::{Splat, SplatDataset};

pub const DEMO_TORUS_SPLATS: usize = 30_000;
pub const DEMO_CLUSTER_SPLATS: usize = 15_000;

fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> [u8; 3] {
    let c = value * saturation;
    let h = (hue.rem_euclid(360.0)) / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = value - c;
    [
        clamp_u8((r + m) * 255.0),
        clamp_u8((g + m) * 255.0),
        clamp_u8((b + m) * 255.0),
    ]
}

fn random_sphere_point(rng: &mut impl Rng) -> Vec3 {
    let z = rng.random_range(-1.0_f32..1.0_f32);
    let theta = rng.random_range(0.0_f32..TAU);
    let r = (1.0 - z * z).sqrt();
    Vec3::new(r * theta.cos(), z, r * theta.sin())
}

fn torus_knot_splats(rng: &mut impl Rng, count: usize) -> Vec<Splat> {
    let p = 2.0;
    let q = 3.0;
    let major = 1.4;
    let minor = 0.38;

    (0..count)
        .map(|i| {
            let t = i as f32 / count.max(1) as f32 * TAU * 2.0;
            // Knot lies in the XZ plane with Y up.
            let base = Vec3::new(
                (major + minor * (q * t).cos()) * (p * t).cos(),
                minor * (q * t).sin(),
                (major + minor * (q * t).cos()) * (p * t).sin(),
            );
            let jitter = Vec3::new(
                rng.random_range(-0.04_f32..0.04_f32),
                rng.random_range(-0.04_f32..0.04_f32),
                rng.random_range(-0.04_f32..0.04_f32),
            );
            let hue = ((q * t).sin() * 0.5 + 0.5) * 360.0;
            let scale = rng.random_range(0.018_f32..0.042_f32);
            Splat {
                position: base + jitter,
                color: hsv_to_rgb(hue, 0.80, 0.95),
                opacity: rng.random_range(0.68_f32..0.95_f32),
                scale: Vec3::new(scale, scale * rng.random_range(0.9..1.2), scale),
                rotation: [1.0, 0.0, 0.0, 0.0],
            }
        })
        .collect()
}

fn sphere_cluster_splats(rng: &mut impl Rng, count: usize) -> Vec<Splat> {
    let centers = [
        Vec3::new(1.8, 0.3, 0.4),
        Vec3::new(-1.6, -0.2, 0.8),
        Vec3::new(0.3, 1.2, -1.6),
        Vec3::new(-0.5, -1.0, -1.4),
    ];
    let palette = [
        [255, 120, 80],
        [100, 210, 255],
        [160, 255, 130],
        [255, 220, 90],
    ];

    (0..count)
        .map(|i| {
            let cluster = i % centers.len();
            let base_color: [u8; 3] = palette[cluster];
            let dir = random_sphere_point(rng);
            let radius = rng.random::<f32>().cbrt() * rng.random_range(0.5_f32..1.4_f32);
            let color =
                base_color.map(|c| clamp_u8(c as f32 + rng.random_range(-25.0_f32..25.0_f32)));
            let scale = rng.random_range(0.02_f32..0.06_f32);
            Splat {
                position: centers[cluster] + dir * radius,
                color,
                opacity: rng.random_range(0.60_f32..0.95_f32),
                scale: Vec3::new(scale, scale * rng.random_range(0.8..1.3), scale),
                rotation: [1.0, 0.0, 0.0, 0.0],
            }
        })
        .collect()
}

/// Torus knot plus four sphere clusters, reproducible for a given seed.
pub fn generate_demo_dataset(seed: u64) -> SplatDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut splats = torus_knot_splats(&mut rng, DEMO_TORUS_SPLATS);
    splats.extend(sphere_cluster_splats(&mut rng, DEMO_CLUSTER_SPLATS));
    SplatDataset::from_splats(&splats)
}

/// Uniformly scattered splats inside `[-extent, extent]^3`.
pub fn generate_seeded_splats(count: usize, extent: f32, seed: u64) -> Vec<Splat> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let scale = rng.random_range(0.01_f32..0.1_f32);
            Splat {
                position: Vec3::new(
                    rng.random_range(-extent..extent),
                    rng.random_range(-extent..extent),
                    rng.random_range(-extent..extent),
                ),
                color: [
                    rng.random_range(24_u8..=255_u8),
                    rng.random_range(24_u8..=255_u8),
                    rng.random_range(24_u8..=255_u8),
                ],
                opacity: rng.random_range(0.2_f32..1.0_f32),
                scale: Vec3::splat(scale),
                rotation: [1.0, 0.0, 0.0, 0.0],
            }
        })
        .collect()
}
