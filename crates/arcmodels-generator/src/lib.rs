pub mod batch;
pub mod pipeline;
pub mod recipe;

pub use batch::*;
pub use pipeline::*;
pub use recipe::*;
