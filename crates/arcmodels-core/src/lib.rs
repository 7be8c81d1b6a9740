pub mod artifact;
pub mod error;
pub mod graph;
pub mod init;
pub mod model;
pub mod registry;
pub mod spec;
pub mod tensor;

pub use artifact::*;
pub use error::*;
pub use graph::*;
pub use init::*;
pub use model::*;
pub use registry::*;
pub use spec::*;
pub use tensor::*;
