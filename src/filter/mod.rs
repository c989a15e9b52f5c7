pub mod batch;
pub mod stream;

pub use batch::*;
pub use stream::*;
