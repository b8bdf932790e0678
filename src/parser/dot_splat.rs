use std::fs;
use std::path::Path;

use glam::Vec3;

use crate::error::LoadError;
use crate::splat::{Splat, SplatDataset};

pub const RECORD_SIZE: usize = 32;

fn read_vec3_f32(bytes: &[u8]) -> Vec3 {
    let mut values = [0.0f32; 3];
    for (value, chunk) in values.iter_mut().zip(bytes.chunks_exact(4)) {
        *value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Vec3::from_array(values)
}

fn decode_scale_value(v: f32) -> f32 {
    if v > 0.0 {
        v
    } else {
        v.exp().max(1e-4)
    }
}

fn decode_rotation(bytes: &[u8]) -> [f32; 4] {
    let q = [
        bytes[0] as f32 / 127.5 - 1.0,
        bytes[1] as f32 / 127.5 - 1.0,
        bytes[2] as f32 / 127.5 - 1.0,
        bytes[3] as f32 / 127.5 - 1.0,
    ];
    let len = q.iter().map(|c| c * c).sum::<f32>().sqrt();
    if len < 1e-8 {
        [1.0, 0.0, 0.0, 0.0]
    } else {
        q.map(|c| c / len)
    }
}

/// Decodes packed 32-byte records: position f32x3, scale f32x3, rgba u8x4, rotation u8x4.
pub fn parse_splat_bytes(data: &[u8]) -> Result<Vec<Splat>, LoadError> {
    if data.len() % RECORD_SIZE != 0 {
        return Err(LoadError::TruncatedRecord {
            len: data.len(),
            record_size: RECORD_SIZE,
        });
    }
    if data.is_empty() {
        return Err(LoadError::Empty);
    }

    let splats = data
        .chunks_exact(RECORD_SIZE)
        .map(|chunk| {
            let position = read_vec3_f32(&chunk[0..12]);
            let scale = read_vec3_f32(&chunk[12..24]);
            Splat {
                position,
                color: [chunk[24], chunk[25], chunk[26]],
                opacity: (chunk[27] as f32 / 255.0).clamp(0.0, 1.0),
                scale: Vec3::new(
                    decode_scale_value(scale.x),
                    decode_scale_value(scale.y),
                    decode_scale_value(scale.z),
                ),
                rotation: decode_rotation(&chunk[28..32]),
            }
        })
        .collect();
    Ok(splats)
}

pub fn load_splat_file(path: &Path) -> Result<SplatDataset, LoadError> {
    let data = fs::read(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let splats = parse_splat_bytes(&data)?;
    tracing::info!("loaded {} splats from {}", splats.len(), path.display());
    Ok(SplatDataset::from_splats(&splats))
}
