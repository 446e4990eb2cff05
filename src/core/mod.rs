//! Core types shared across the codebase.

mod mode;
mod state;

pub use mode::ExecutionMode;
pub use state::{
    begin_rebuild, end_rebuild, is_rebuilding, is_serving, is_shutdown, register_server,
    set_serving, setup_shutdown_handler,
};
