pub mod common;

mod atomic_file_propogation;
mod daemon_loop;
