pub mod reqres;

use reqwest::StatusCode;

/// Result of a POST on the write path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    /// The server answered 201 and the body was read.
    Created { body: String },
    /// Any other status. The body is left unread.
    Rejected { status: StatusCode },
}

impl PostOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, PostOutcome::Created { .. })
    }

    /// Console line for this outcome.
    pub fn describe(&self) -> String {
        match self {
            PostOutcome::Created { body } => format!("Response: {body}"),
            PostOutcome::Rejected { status } => format!("Get failed with error: {status}"),
        }
    }
}
