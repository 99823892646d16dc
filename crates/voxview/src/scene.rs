//! Procedural voxel scene and its ambient-occlusion volume.
//!
//! Volumes are cubic, one byte per voxel, laid out x-fastest then y then z,
//! which is the order [`VolumeTexture::upload_r8`] expects.

use anyhow::{Context, Result};
use voxel_renderer::{GpuContext, VolumeTexture};

const SOLID: u8 = 255;
const EMPTY: u8 = 0;

/// Both volumes uploaded and ready to bind.
pub struct Scene {
    pub volume: VolumeTexture,
    pub occlusion: VolumeTexture,
}

impl Scene {
    /// Edge length of the cubic volume, in voxels.
    pub fn edge(&self) -> u32 {
        self.volume.size()[0]
    }

    pub fn upload(gpu: &GpuContext, size: u32, occlusion_radius: u32) -> Result<Self> {
        let voxels = generate_volume(size);
        let occlusion = generate_occlusion(&voxels, size, occlusion_radius);
        let solid = voxels.iter().filter(|&&v| v == SOLID).count();
        tracing::info!(size, solid, occlusion_radius, "generated voxel scene");

        let extent = [size, size, size];
        Ok(Self {
            volume: VolumeTexture::upload_r8(gpu, "voxel volume", extent, &voxels)
                .context("failed to upload voxel volume")?,
            occlusion: VolumeTexture::upload_r8(gpu, "occlusion volume", extent, &occlusion)
                .context("failed to upload occlusion volume")?,
        })
    }
}

fn index(size: u32, x: u32, y: u32, z: u32) -> usize {
    let n = size as usize;
    x as usize + n * (y as usize + n * z as usize)
}

/// Rolling terrain with a floating sphere above it.
pub fn generate_volume(size: u32) -> Vec<u8> {
    let n = size as usize;
    let mut voxels = vec![EMPTY; n * n * n];
    let scale = 2.0 / size as f32;
    for z in 0..size {
        for y in 0..size {
            for x in 0..size {
                // Voxel centre in [-1, 1]^3.
                let px = (x as f32 + 0.5) * scale - 1.0;
                let py = (y as f32 + 0.5) * scale - 1.0;
                let pz = (z as f32 + 0.5) * scale - 1.0;

                let ground = -0.55 + 0.15 * (px * 4.0).sin() * (pz * 3.0).cos();
                let sphere = (px * px + (py - 0.25) * (py - 0.25) + pz * pz).sqrt() < 0.4;
                if py < ground || sphere {
                    voxels[index(size, x, y, z)] = SOLID;
                }
            }
        }
    }
    voxels
}

/// Fraction of empty voxels in the `(2r + 1)^3` neighbourhood of each voxel,
/// clamped at the volume bounds, scaled to 0..=255.
pub fn generate_occlusion(voxels: &[u8], size: u32, radius: u32) -> Vec<u8> {
    let n = size as usize;
    let stride = n + 1;
    // Summed-volume table of empty voxels with a zero border on the low side.
    let mut table = vec![0u32; stride * stride * stride];
    let at = |x: usize, y: usize, z: usize| x + stride * (y + stride * z);
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                let open = u32::from(voxels[x + n * (y + n * z)] != SOLID);
                table[at(x + 1, y + 1, z + 1)] = open
                    + table[at(x, y + 1, z + 1)]
                    + table[at(x + 1, y, z + 1)]
                    + table[at(x + 1, y + 1, z)]
                    - table[at(x, y, z + 1)]
                    - table[at(x, y + 1, z)]
                    - table[at(x + 1, y, z)]
                    + table[at(x, y, z)];
            }
        }
    }

    let r = radius as usize;
    let mut occlusion = vec![0u8; n * n * n];
    for z in 0..n {
        let (z0, z1) = (z.saturating_sub(r), (z + r + 1).min(n));
        for y in 0..n {
            let (y0, y1) = (y.saturating_sub(r), (y + r + 1).min(n));
            for x in 0..n {
                let (x0, x1) = (x.saturating_sub(r), (x + r + 1).min(n));
                let open = i64::from(table[at(x1, y1, z1)])
                    - i64::from(table[at(x0, y1, z1)])
                    - i64::from(table[at(x1, y0, z1)])
                    - i64::from(table[at(x1, y1, z0)])
                    + i64::from(table[at(x0, y0, z1)])
                    + i64::from(table[at(x0, y1, z0)])
                    + i64::from(table[at(x1, y0, z0)])
                    - i64::from(table[at(x0, y0, z0)]);
                let total = ((x1 - x0) * (y1 - y0) * (z1 - z0)) as i64;
                occlusion[x + n * (y + n * z)] = ((open * 255) / total) as u8;
            }
        }
    }
    occlusion
}
