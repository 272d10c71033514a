pub mod bilibili;
pub mod dify;
