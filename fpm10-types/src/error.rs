pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The pixel data does not describe a full sensor image.
    #[error("Wrong scan size: expected {expected} pixels, got {actual}")]
    WrongScanSize {
        expected: usize,
        actual: usize,
    },
}
