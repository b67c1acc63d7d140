//! Page scraping for crawl submissions.

mod error;
mod html;
mod traits;

pub use error::ScrapeError;
pub use html::HtmlPageScraper;
pub use traits::{PageScraper, ScrapedPage};
