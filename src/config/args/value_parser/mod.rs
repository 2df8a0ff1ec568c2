pub mod file_exist;
pub mod path_rewrite;
pub mod url;
