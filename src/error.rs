use derive_more::Display;

use crate::types::{Point, Value};

pub type Result<T> = core::result::Result<T, MetaballError>;

#[derive(Debug, Display, Clone, PartialEq)]
pub enum MetaballError {
    /// Lattice resolution must be at least 2 points per axis.
    #[display("lattice resolution must be at least 2, got {_0}")]
    InvalidResolution(usize),
    #[display("cell size must be positive and finite, got {_0}")]
    InvalidCellSize(Value),
    #[display("normal step must be positive and finite, got {_0}")]
    InvalidNormalStep(Value),
    #[display("centroid divisor must be positive and finite, got {_0}")]
    InvalidCentroidDivisor(Value),
    #[display("a metaball field needs at least one source")]
    NoSources,
    /// A selected cube edge has equal values at both corners, so it has no single zero crossing.
    #[display("edge {edge} of cell {cell:?} has equal corner values")]
    DegenerateEdge { cell: [usize; 3], edge: usize },
    /// The field gradient vanishes at a surface vertex; no normal direction exists.
    #[display("field gradient is zero at {position}")]
    CriticalPoint { position: Point },
    #[display("non-finite vertex or normal at {position}")]
    NonFinite { position: Point },
    #[display("vertex count exceeds the u32 index range")]
    IndexOverflow,
    #[display("triangle references a vertex that has not been appended")]
    InvalidIndex,
}

impl std::error::Error for MetaballError {}
