pub mod demo;
pub mod directories;
pub mod objects;

pub use demo::run_demo;
pub use directories::{run_ls, run_mask, run_mkdir, run_rmdir};
pub use objects::{
    run_cp, run_get, run_mv, run_put, run_rm, run_rm_prefix, run_search, run_size, run_undelete,
    run_url,
};
