use thiserror::Error;

/// Errors reading or writing local data files.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: cannot parse {column} from '{value}'")]
    Parse {
        row: usize,
        column: &'static str,
        value: String,
    },
}

impl DataError {
    pub(crate) fn parse(row: usize, column: &'static str, value: impl Into<String>) -> Self {
        Self::Parse {
            row,
            column,
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
