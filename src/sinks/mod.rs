pub mod manager;
pub mod sink_file;
pub mod sink_secret;
