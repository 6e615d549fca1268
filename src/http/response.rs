//! Error annotations carried on responses.
//!
//! Handlers and middleware attach [`RequestError`]s to the response they
//! return. The access logger reads them back after the handler completes
//! and folds the private ones into its `errors` field.

use axum::response::Response;

/// Visibility of an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Server-side only; goes to logs, never to the client.
    Private,
    /// Safe to expose in a response body.
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Ordered error annotations for one exchange.
#[derive(Debug, Clone, Default)]
pub struct RequestErrors(Vec<RequestError>);

impl RequestErrors {
    pub fn push(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.0.push(RequestError {
            kind,
            message: message.into(),
        });
    }

    /// Append an annotation to `response`, creating the list if needed.
    pub fn attach(response: &mut Response, kind: ErrorKind, message: impl Into<String>) {
        response
            .extensions_mut()
            .get_or_insert_default::<RequestErrors>()
            .push(kind, message);
    }

    pub fn iter(&self) -> impl Iterator<Item = &RequestError> {
        self.0.iter()
    }

    pub fn by_kind(&self, kind: ErrorKind) -> impl Iterator<Item = &RequestError> {
        self.0.iter().filter(move |e| e.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// One `Error #NN: message` line per annotation of `kind`, numbered from 1.
    pub fn render(&self, kind: ErrorKind) -> String {
        self.by_kind(kind)
            .enumerate()
            .map(|(i, e)| format!("Error #{:02}: {}\n", i + 1, e.message))
            .collect()
    }
}
