/// Voxel storage modes that are converted to and from `f32`, numbered as in
/// the header's `mode` word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Int8 = 0,
    Int16 = 1,
    Float32 = 2,
    Uint16 = 6,
    Float16 = 12,
}

impl Mode {
    pub fn from_i32(mode: i32) -> Option<Self> {
        match mode {
            0 => Some(Self::Int8),
            1 => Some(Self::Int16),
            2 => Some(Self::Float32),
            6 => Some(Self::Uint16),
            12 => Some(Self::Float16),
            _ => None,
        }
    }

    pub fn number(&self) -> i32 {
        *self as i32
    }

    pub fn byte_size(&self) -> usize {
        match self {
            Self::Int8 => 1,
            Self::Int16 | Self::Uint16 | Self::Float16 => 2,
            Self::Float32 => 4,
        }
    }
}
