use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use half::f16;
use log::debug;
use mrc::{Header, MrcFile};

use crate::{
    error::{Error, Result},
    mode::Mode,
    read::Volume,
};

const LABEL_LEN: usize = 80;
const NUM_LABELS: usize = 10;

/// Write `volume` as a little-endian MRC2014 file, replacing any existing
/// file at `path`. Values are converted to the volume's storage mode, and the
/// header density statistics describe the stored values.
pub fn write_volume(path: &Path, volume: &Volume, labels: &[&str]) -> Result<()> {
    let (nz, ny, nx) = volume.shape();
    if nx == 0 || ny == 0 || nz == 0 {
        return Err(Error::Degenerate(format!(
            "cannot write an empty volume of shape {:?}",
            volume.shape()
        )));
    }
    let mode = volume.mode();

    let stored: Vec<f32> = volume.data().iter().map(|&v| stored_value(v, mode)).collect();
    let mut header = volume_header(volume)?;
    let stats = DensityStats::of(&stored);
    header.dmin = stats.min;
    header.dmax = stats.max;
    header.dmean = stats.mean;
    header.rms = stats.rms;
    set_labels(&mut header, labels);

    let mut voxels = Vec::with_capacity(stored.len() * mode.byte_size());
    encode_voxels(&mut voxels, &stored, mode).map_err(Error::io(path))?;

    let mut file = MrcFile::create(path, header).map_err(Error::mrc(path))?;
    file.write_data(&voxels).map_err(Error::mrc(path))?;

    debug!("wrote {path:?}: {nz}x{ny}x{nx}, mode {mode:?}");
    Ok(())
}

/// Header with the volume's dimensions, one cell per voxel and `cella` set
/// from the voxel size.
fn volume_header(volume: &Volume) -> Result<Header> {
    let (nz, ny, nx) = volume.shape();
    let dim = |n: usize| {
        i32::try_from(n).map_err(|_| {
            Error::InvalidParameter(format!("axis length {n} does not fit in an MRC header"))
        })
    };
    let voxel_size = volume.voxel_size();

    let mut header = Header::new();
    header.nx = dim(nx)?;
    header.ny = dim(ny)?;
    header.nz = dim(nz)?;
    header.mode = volume.mode().number();
    header.mx = header.nx;
    header.my = header.ny;
    header.mz = header.nz;
    header.xlen = voxel_size[0] * nx as f32;
    header.ylen = voxel_size[1] * ny as f32;
    header.zlen = voxel_size[2] * nz as f32;
    Ok(header)
}

/// Store up to ten labels, truncated to 80 bytes each.
fn set_labels(header: &mut Header, labels: &[&str]) {
    header.label = [0; LABEL_LEN * NUM_LABELS];
    let count = labels.len().min(NUM_LABELS);
    for (slot, text) in header.label.chunks_exact_mut(LABEL_LEN).zip(labels) {
        let bytes = text.as_bytes();
        let len = bytes.len().min(LABEL_LEN);
        slot[..len].copy_from_slice(&bytes[..len]);
    }
    header.nlabl = count as i32;
}

/// The value as it will read back after conversion to `mode`.
fn stored_value(v: f32, mode: Mode) -> f32 {
    match mode {
        Mode::Int8 => v.round() as i8 as f32,
        Mode::Int16 => v.round() as i16 as f32,
        Mode::Uint16 => v.round() as u16 as f32,
        Mode::Float16 => f16::from_f32(v).to_f32(),
        Mode::Float32 => v,
    }
}

fn encode_voxels<W: WriteBytesExt>(writer: &mut W, values: &[f32], mode: Mode) -> std::io::Result<()> {
    for &v in values {
        match mode {
            Mode::Int8 => writer.write_i8(v as i8)?,
            Mode::Int16 => writer.write_i16::<LittleEndian>(v as i16)?,
            Mode::Uint16 => writer.write_u16::<LittleEndian>(v as u16)?,
            Mode::Float16 => writer.write_u16::<LittleEndian>(f16::from_f32(v).to_bits())?,
            Mode::Float32 => writer.write_f32::<LittleEndian>(v)?,
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DensityStats {
    min: f32,
    max: f32,
    mean: f32,
    rms: f32,
}

impl DensityStats {
    fn of(values: &[f32]) -> Self {
        let n = values.len() as f64;
        let (min, max, sum) = values.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, sum), &v| {
                let v = v as f64;
                (min.min(v), max.max(v), sum + v)
            },
        );
        let mean = sum / n;
        let var = values
            .iter()
            .map(|&v| (v as f64 - mean).powi(2))
            .sum::<f64>()
            / n;
        Self {
            min: min as f32,
            max: max as f32,
            mean: mean as f32,
            rms: var.sqrt() as f32,
        }
    }
}
