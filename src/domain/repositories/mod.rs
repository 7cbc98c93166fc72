pub mod remote_store;
