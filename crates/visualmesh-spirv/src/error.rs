use rspirv::spirv::{Op, Word};
use thiserror::Error;

/// Errors raised while assembling a module.
///
/// Every one of them is a contract violation of the caller; the builder that produced it must be
/// discarded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Vectors must have 2, 3 or 4 components.
    #[error("Vector types must have 2, 3 or 4 components, got {0}")]
    InvalidVectorWidth(u32),

    /// A swizzle, extract or struct member index doesn't exist in its source.
    #[error("Component {index} is out of range for a source with {width} components")]
    ComponentOutOfRange {
        /// The requested index.
        index: u32,
        /// The number of components available.
        width: u32,
    },

    /// An operand doesn't have the type the operation requires.
    #[error("Type mismatch in {op:?}: expected {expected}, found {found}")]
    TypeMismatch {
        /// The operation being emitted.
        op: Op,
        /// Description of the accepted type.
        expected: String,
        /// The type that was provided.
        found: String,
    },

    /// The id was never defined, or belongs to a function that is not open.
    #[error("%{0} is referenced but not defined")]
    UndefinedId(Word),

    /// A decoration or debug name refers to a missing target.
    #[error("Annotation target %{0} does not exist")]
    MissingTarget(Word),

    /// An instruction was emitted while no function body was open.
    #[error("{0:?} must be emitted inside a function body")]
    NoOpenFunction(Op),

    /// A function was started before the previous one was closed.
    #[error("Function %{0} must be closed before another one begins")]
    NestedFunction(Word),

    /// A function was closed, or the module was built, without a return.
    #[error("Function %{0} has no return instruction")]
    MissingReturn(Word),

    /// Instructions were emitted after the block terminator.
    #[error("{0:?} emitted after the block was terminated")]
    BlockTerminated(Op),

    /// A descriptor set binding was assigned twice.
    #[error("Binding {binding} of descriptor set {set} is already used by %{existing}")]
    DuplicateBinding {
        /// Descriptor set.
        set: u32,
        /// Binding index within the set.
        binding: u32,
        /// The variable already bound there.
        existing: Word,
    },

    /// Entry points are invoked by the pipeline, never through a function call.
    #[error("Entry point %{0} can't be called")]
    EntryPointCall(Word),

    /// Two entry points share the same name.
    #[error("Entry point {0} is declared twice")]
    DuplicateEntryPoint(String),

    /// An id was defined a second time with a different structure.
    #[error("%{0} is already defined")]
    Redefinition(Word),
}

pub type BuildResult<T> = Result<T, BuildError>;
