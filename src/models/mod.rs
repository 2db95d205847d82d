pub mod item;
pub mod loaders;
pub mod script;

pub use item::{Group, Item, RemotePaths};
pub use loaders::{discover_groups, load_script_file};
pub use script::{InputAction, InteractionScript, ScriptStep};
