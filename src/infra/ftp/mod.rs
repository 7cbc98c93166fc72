pub mod ftp_client;
