pub mod remote_paths;
pub mod uploads;
