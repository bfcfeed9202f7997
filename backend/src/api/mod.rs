pub mod channel;
pub mod search;
pub mod video;

pub use channel::*;
pub use search::*;
pub use video::*;
