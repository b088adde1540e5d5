mod bootstrap;
mod loop_runner;
mod overlay_log;
mod proc_memory;
mod tcp_link;
mod terminal_input;

pub(crate) use loop_runner::run;
