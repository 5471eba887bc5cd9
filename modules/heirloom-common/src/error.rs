use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeirloomError {
    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Scraping error: {0}")]
    Scraping(String),
}
