pub mod post;
pub mod scp;
pub mod user;

pub use post::run_post_list;
pub use scp::run_scp;
pub use user::run_user_add;
