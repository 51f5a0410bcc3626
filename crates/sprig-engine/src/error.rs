use thiserror::Error;

/// Failures reported by the batching renderer and its device resources.
///
/// Push operations on a render queue never surface these; they drop the
/// offending primitive instead. Creation, flush, reset and atlas appends
/// return them to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("allocation failed: {0}")]
    Allocation(String),

    #[error("atlas overflow: {width}x{height} does not fit in {atlas_width}x{atlas_height}")]
    Overflow {
        width: u32,
        height: u32,
        atlas_width: u32,
        atlas_height: u32,
    },

    #[error("device lost; resources must be reset before use")]
    DeviceLoss,

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;
