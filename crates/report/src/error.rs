use std::fmt;

#[derive(Debug)]
pub enum ReportError {
    /// Body is not valid JSON.
    Json(String),
    /// Body is JSON but not an object.
    NotAnObject(&'static str),
    /// Unknown backend variant name.
    UnknownVariant(String),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "malformed report JSON: {msg}"),
            Self::NotAnObject(found) => write!(f, "report must be a JSON object, found {found}"),
            Self::UnknownVariant(name) => {
                write!(f, "unknown backend variant \"{name}\" (expected \"legacy\" or \"combined\")")
            }
        }
    }
}

impl std::error::Error for ReportError {}
