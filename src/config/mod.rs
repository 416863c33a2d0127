pub mod cli;
pub mod duration;
pub mod settings;
pub mod validator;
