pub mod common;
pub mod layout_engine;
pub mod model;
pub mod presets;
pub mod registry;
pub mod storage;
