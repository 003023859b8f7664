pub mod compiler;
pub mod engine;
pub mod error;
pub mod link;
pub mod staging;

pub use compiler::{CompileReport, ExternalCompiler, PackageCompiler};
pub use engine::{
    default_output_dir, AssembleOutcome, AssembleRequest, AssembleStatus, Assembler, OUTLINE_FILE,
};
pub use error::{AssembleError, AssembleResult};
pub use link::LinkStatus;
pub use staging::StagingDir;
