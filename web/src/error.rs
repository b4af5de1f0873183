use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use identity::error::{Error as IdentityError, ErrorKind as IdentityErrorKind, HttpErrorKind};

extern crate log;
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Identity(IdentityError),
    Web(WebErrorKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebErrorKind {
    Input,
    Unauthorized,
    Forbidden,
    NotFound,
    Internal,
}

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Web(kind) => match kind {
                WebErrorKind::Input => StatusCode::BAD_REQUEST,
                WebErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
                WebErrorKind::Forbidden => StatusCode::FORBIDDEN,
                WebErrorKind::NotFound => StatusCode::NOT_FOUND,
                WebErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Identity(err) => match err.error_kind {
                IdentityErrorKind::Http(HttpErrorKind::BuilderFailed) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                IdentityErrorKind::Http(_)
                | IdentityErrorKind::OAuth(_)
                | IdentityErrorKind::Credential(_) => StatusCode::BAD_GATEWAY,
                IdentityErrorKind::Session(_) => StatusCode::UNAUTHORIZED,
            },
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Responding {status}: {self}");
        } else {
            debug!("Responding {status}: {self}");
        }
        let body = status
            .canonical_reason()
            .unwrap_or("ERROR")
            .to_ascii_uppercase();
        (status, body).into_response()
    }
}

impl From<IdentityError> for Error {
    fn from(err: IdentityError) -> Self {
        Error::Identity(err)
    }
}
