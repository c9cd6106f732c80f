mod highlevel;
mod lowlevel;

pub use highlevel::{
    detect_conflicts, Conflict, ConflictKind, ConstraintSet, EdgeConstraint, VertexConstraint,
};
pub(crate) use highlevel::HighLevelOpenNode;
pub(crate) use lowlevel::{LowLevelNode, LowLevelOpenEntry};
