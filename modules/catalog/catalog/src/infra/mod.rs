pub mod mapper;
pub mod storage;
