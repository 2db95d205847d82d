pub mod script_loader;
pub mod source_loader;

pub use script_loader::load_script_file;
pub use source_loader::{discover_groups, load_group};
