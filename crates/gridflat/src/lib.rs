pub mod handlers;
pub mod locate;
pub mod rate_limit;

pub use handlers::{AppState, router};
pub use locate::{find_slab_month, locate_tables};
