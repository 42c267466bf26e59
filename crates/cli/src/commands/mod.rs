pub mod agent;
pub mod boot;
pub mod init;
pub mod status;
