pub mod cleaner;
pub mod fetcher;
pub mod llm;

pub use cleaner::HtmdCleaner;
pub use fetcher::ReqwestFetcher;
pub use llm::OpenAiExtractor;
