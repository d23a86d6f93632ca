pub mod errors;
pub mod identity;
pub mod problems;
pub mod queries;
pub mod records;
pub mod store;
pub mod view_model;

// Re-export main components
pub use errors::*;
pub use identity::*;
pub use problems::*;
pub use queries::*;
pub use records::*;
pub use store::*;
pub use view_model::*;
