pub mod achievement;
pub mod api;
pub mod rows;
pub mod token;

pub use achievement::*;
pub use api::*;
pub use token::*;
