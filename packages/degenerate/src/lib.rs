pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod interpreter;
pub mod protocol;
pub mod rng;
pub mod scheduler;
pub mod widget;

// Scripting
pub mod scripting;
pub mod script_args;
pub mod script_diagnostics;
pub mod script_log;
pub mod filter_rhai;
pub mod frame_rhai;
pub mod host_rhai;
pub mod rng_rhai;
pub mod widget_rhai;

// Headless runs
pub mod headless;
pub mod run_job;

pub mod cli;

pub use interpreter::{Interpreter, InterpreterState};
pub use protocol::{HostMessage, WorkerMessage};
