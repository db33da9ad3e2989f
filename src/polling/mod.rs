pub mod baseline;

pub use baseline::{bootstrap_posts, load_user_account, BootstrapStats};
