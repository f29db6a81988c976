pub mod ballot;
pub mod block;
pub mod message;
pub mod peers;
pub mod processor;
pub mod store;

pub use ballot::*;
pub use block::*;
pub use message::*;
pub use peers::*;
pub use processor::*;
pub use store::*;
