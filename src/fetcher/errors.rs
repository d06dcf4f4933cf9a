use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("page not found")]
    NotFound,

    #[error("http error {status}")]
    Http { status: StatusCode },

    #[error("dns failure: {0}")]
    Dns(String),

    #[error("tls error: {0}")]
    Tls(String),

    #[error("connect timeout")]
    ConnectTimeout,

    #[error("request timeout")]
    RequestTimeout,

    #[error("too many redirects")]
    RedirectLoop,

    #[error("body too large ({0} bytes)")]
    BodyTooLarge(u64),

    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),

    #[error("charset error: {0}")]
    Charset(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("unknown: {0}")]
    Unknown(String),
}

/// Coarse classification used by the scraper to decide how a failure is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The target page is absent. Never retried.
    NotFound,
    /// Timeouts, connection problems and non-2xx statuses. Retried.
    Transient,
    /// The request or the response can never succeed as-is. Never retried.
    Rejected,
}

impl FetchError {
    /// Non-success status to error. 404 gets its own variant because it is never retried.
    pub fn from_status(status: StatusCode) -> Self {
        if status == StatusCode::NOT_FOUND {
            Self::NotFound
        } else {
            Self::Http { status }
        }
    }

    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::NotFound => FetchErrorKind::NotFound,

            Self::InvalidUrl(_)
            | Self::BodyTooLarge(_)
            | Self::UnsupportedContentType(_)
            | Self::Charset(_) => FetchErrorKind::Rejected,

            Self::Http { .. }
            | Self::Dns(_)
            | Self::Tls(_)
            | Self::ConnectTimeout
            | Self::RequestTimeout
            | Self::RedirectLoop
            | Self::Io(_)
            | Self::Unknown(_) => FetchErrorKind::Transient,
        }
    }

    pub fn should_retry(&self) -> bool {
        self.kind() == FetchErrorKind::Transient
    }

    /// Status code carried by the error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::NotFound => Some(StatusCode::NOT_FOUND),
            Self::Http { status } => Some(*status),
            _ => None,
        }
    }

    pub fn from_reqwest_error(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            if err.is_connect() {
                Self::ConnectTimeout
            } else {
                Self::RequestTimeout
            }
        } else if err.is_redirect() {
            Self::RedirectLoop
        } else if let Some(status) = err.status() {
            Self::from_status(status)
        } else if err.is_connect() || err.is_request() {
            // DNS, refused connections
            Self::Dns(err.to_string())
        } else if err.is_body() || err.is_decode() {
            Self::Io(err.to_string())
        } else {
            Self::Unknown(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_terminal() {
        let err = FetchError::from_status(StatusCode::NOT_FOUND);
        assert!(matches!(err, FetchError::NotFound));
        assert_eq!(err.kind(), FetchErrorKind::NotFound);
        assert!(!err.should_retry());
    }

    #[test]
    fn test_other_statuses_retry() {
        for code in [400u16, 403, 429, 500, 502, 503] {
            let status = StatusCode::from_u16(code).unwrap();
            let err = FetchError::from_status(status);
            assert!(err.should_retry(), "{code} should be retried");
            assert_eq!(err.status(), Some(status));
        }
    }

    #[test]
    fn test_rejections_do_not_retry() {
        assert!(!FetchError::InvalidUrl(url::ParseError::EmptyHost).should_retry());
        assert!(!FetchError::BodyTooLarge(1000).should_retry());
        assert!(!FetchError::UnsupportedContentType("image/png".to_string()).should_retry());
        assert!(!FetchError::Charset("Invalid encoding".to_string()).should_retry());
        assert_eq!(
            FetchError::BodyTooLarge(1).kind(),
            FetchErrorKind::Rejected
        );
    }

    #[test]
    fn test_transport_failures_retry() {
        assert!(FetchError::Dns("DNS failure".to_string()).should_retry());
        assert!(FetchError::ConnectTimeout.should_retry());
        assert!(FetchError::RequestTimeout.should_retry());
        assert!(FetchError::Io("reset".to_string()).should_retry());
        assert_eq!(FetchError::RequestTimeout.status(), None);
    }
}
