pub mod errors;
pub mod messages;
pub mod records;
pub mod view;

// Re-export all types
pub use errors::*;
pub use messages::*;
pub use records::*;
pub use view::*;
