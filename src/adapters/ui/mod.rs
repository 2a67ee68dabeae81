//! Terminal UI: banner and progress bars.

pub mod banner;
pub mod progress;

pub use banner::print_welcome;
pub use progress::page_bar;
