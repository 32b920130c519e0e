pub mod grid;
pub mod mode_state;
pub mod node_config;
pub mod tab_group;

pub use grid::{GridItem, GridRect, LayoutMode, SizeOverride};
pub use mode_state::{LayoutSlot, ModeState};
pub use node_config::NodeConfig;
pub use tab_group::TabGroup;
