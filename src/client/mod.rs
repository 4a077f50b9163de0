pub mod feed;
pub mod traits;
pub mod webdriver;

pub use feed::FeedClient;
pub use traits::{GroupClient, Post};
pub use webdriver::WebDriver;
