mod event_source;
mod handler;
mod store;
mod token_reader;

pub use event_source::*;
pub use handler::*;
pub use store::*;
pub use token_reader::*;
