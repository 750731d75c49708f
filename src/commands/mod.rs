/// Check command functionality
pub mod check;
/// List command functionality
pub mod list;
