use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use half::f16;
use log::{debug, warn};
use mrc::{Header, MrcView};
use ndarray::{Array3, ArrayView2, Axis};

use crate::{
    error::{Error, Result},
    mode::Mode,
};

pub const HEADER_SIZE: usize = 1024;
const MAP_ID: [u8; 4] = *b"MAP ";
const MODE_WORD: usize = 12;
const MACHST: usize = 212;

/// How strictly header irregularities are treated when opening a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    Strict,
    /// Wrong map ID, unknown machine stamp and trailing bytes are only logged.
    Permissive,
}

/// A stack of sections held in memory as `(nz, ny, nx)` floats.
#[derive(Debug, Clone)]
pub struct Volume {
    data: Array3<f32>,
    mode: Mode,
    voxel_size: [f32; 3],
}

impl Volume {
    pub fn new(data: Array3<f32>, mode: Mode, voxel_size: [f32; 3]) -> Self {
        Self {
            data,
            mode,
            voxel_size,
        }
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Voxel size along x, y, z.
    pub fn voxel_size(&self) -> [f32; 3] {
        self.voxel_size
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn num_sections(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// 0-based section, `None` when out of range.
    pub fn section(&self, z: usize) -> Option<ArrayView2<'_, f32>> {
        if z >= self.num_sections() {
            return None;
        }
        Some(self.data.index_axis(Axis(0), z))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endianness {
    Little,
    Big,
}

impl Endianness {
    /// Only the first byte is significant; some writers put 0x41 in the second.
    fn from_machst(machst: &[u8]) -> Option<Self> {
        match machst.first() {
            Some(0x44) => Some(Self::Little),
            Some(0x11) => Some(Self::Big),
            _ => None,
        }
    }

    fn machst(&self) -> [u8; 4] {
        match self {
            Self::Little => [0x44, 0x44, 0x00, 0x00],
            Self::Big => [0x11, 0x11, 0x00, 0x00],
        }
    }
}

pub fn open(path: impl AsRef<Path>, read_mode: ReadMode) -> Result<Volume> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(Error::io(path))?;
    let Some(raw_header) = bytes.first_chunk::<HEADER_SIZE>() else {
        return Err(Error::InvalidHeader(format!(
            "{path:?} is {} bytes, shorter than the {HEADER_SIZE} byte header",
            bytes.len()
        )));
    };

    let mut raw_header = *raw_header;
    let endianness = detect_endianness(&mut raw_header, read_mode)?;
    let mut header = Header::decode_from_bytes(&raw_header);
    let mode = check_header(&mut header, read_mode)?;

    let data_size = data_size(&header, mode)?;
    let expected = (HEADER_SIZE + header.nsymbt as usize)
        .checked_add(data_size)
        .ok_or_else(|| overflow(&header))?;
    if bytes.len() < expected {
        return Err(Error::Truncated {
            expected: expected as u64,
            actual: bytes.len() as u64,
        });
    }
    if bytes.len() > expected {
        warn!(
            "{path:?}: {} bytes after the end of the data block",
            bytes.len() - expected
        );
    }

    let view = MrcView::new(header, &bytes[HEADER_SIZE..]).map_err(Error::mrc(path))?;
    let (nx, ny, nz) = view.dimensions();
    let raw = view.data().get(..data_size).ok_or(Error::Truncated {
        expected: expected as u64,
        actual: bytes.len() as u64,
    })?;

    let values = match endianness {
        Endianness::Little => decode_voxels::<LittleEndian>(raw, mode),
        Endianness::Big => decode_voxels::<BigEndian>(raw, mode),
    };
    let data = Array3::from_shape_vec((nz, ny, nx), values)
        .map_err(|e| Error::InvalidHeader(e.to_string()))?;

    debug!("read {path:?}: {nz}x{ny}x{nx}, mode {mode:?}, {endianness:?} endian");

    Ok(Volume::new(data, mode, voxel_size(view.header())))
}

/// Byte order announced by the machine stamp. In permissive mode an unknown
/// stamp is replaced in `raw_header` by the guessed one, so the header decodes
/// in that order.
fn detect_endianness(raw_header: &mut [u8; HEADER_SIZE], read_mode: ReadMode) -> Result<Endianness> {
    let machst = &raw_header[MACHST..MACHST + 4];
    if let Some(endianness) = Endianness::from_machst(machst) {
        return Ok(endianness);
    }
    if read_mode == ReadMode::Strict {
        return Err(Error::InvalidHeader(format!(
            "unrecognised machine stamp {machst:02x?}"
        )));
    }

    // guess from whichever byte order yields a known mode
    let mode_bytes = &raw_header[MODE_WORD..MODE_WORD + 4];
    let guess = if Mode::from_i32(LittleEndian::read_i32(mode_bytes)).is_some() {
        Endianness::Little
    } else if Mode::from_i32(BigEndian::read_i32(mode_bytes)).is_some() {
        Endianness::Big
    } else {
        Endianness::Little
    };
    warn!("unrecognised machine stamp {machst:02x?}, assuming {guess:?} endian");
    raw_header[MACHST..MACHST + 4].copy_from_slice(&guess.machst());
    Ok(guess)
}

/// Checks what the comparison and scaling need from a header. A wrong map ID
/// is repaired in permissive mode.
fn check_header(header: &mut Header, read_mode: ReadMode) -> Result<Mode> {
    if header.map != MAP_ID {
        let found = String::from_utf8_lossy(&header.map).into_owned();
        match read_mode {
            ReadMode::Strict => {
                return Err(Error::InvalidHeader(format!(
                    "map ID is {found:?}, expected \"MAP \""
                )));
            }
            ReadMode::Permissive => {
                warn!("map ID is {found:?}, expected \"MAP \"");
                header.map = MAP_ID;
            }
        }
    }

    let mode = Mode::from_i32(header.mode).ok_or(Error::UnsupportedMode(header.mode))?;

    if header.nx <= 0 || header.ny <= 0 || header.nz <= 0 {
        return Err(Error::InvalidHeader(format!(
            "dimensions must be positive, got nx={} ny={} nz={}",
            header.nx, header.ny, header.nz
        )));
    }
    if header.nsymbt < 0 {
        return Err(Error::InvalidHeader(format!(
            "negative extended header size {}",
            header.nsymbt
        )));
    }

    Ok(mode)
}

/// Size of the voxel block in bytes. Dimensions must already be positive.
fn data_size(header: &Header, mode: Mode) -> Result<usize> {
    [header.ny, header.nz]
        .into_iter()
        .try_fold(header.nx as usize, |n, d| n.checked_mul(d as usize))
        .and_then(|n| n.checked_mul(mode.byte_size()))
        .ok_or_else(|| overflow(header))
}

fn overflow(header: &Header) -> Error {
    Error::InvalidHeader(format!(
        "data block of {}x{}x{} voxels does not fit in memory",
        header.nx, header.ny, header.nz
    ))
}

/// Cell length over sampling per axis, 0 where the sampling is unset.
fn voxel_size(header: &Header) -> [f32; 3] {
    let cella = [header.xlen, header.ylen, header.zlen];
    let sampling = [header.mx, header.my, header.mz];
    std::array::from_fn(|i| {
        if sampling[i] > 0 {
            cella[i] / sampling[i] as f32
        } else {
            0.0
        }
    })
}

fn decode_voxels<B: ByteOrder>(raw: &[u8], mode: Mode) -> Vec<f32> {
    match mode {
        Mode::Int8 => raw.iter().map(|&b| b as i8 as f32).collect(),
        Mode::Int16 => raw.chunks_exact(2).map(|c| B::read_i16(c) as f32).collect(),
        Mode::Uint16 => raw.chunks_exact(2).map(|c| B::read_u16(c) as f32).collect(),
        Mode::Float16 => raw
            .chunks_exact(2)
            .map(|c| f16::from_bits(B::read_u16(c)).to_f32())
            .collect(),
        Mode::Float32 => raw.chunks_exact(4).map(B::read_f32).collect(),
    }
}
