use crate::error::LazyreqError;

/// Map an error to a curl-compatible process exit code.
pub fn exit_code_for_error(err: &LazyreqError) -> i32 {
    match err {
        LazyreqError::InvalidUrl(_) => 3,
        LazyreqError::Config(_) | LazyreqError::AlreadySent { .. } => 2,
        LazyreqError::Build { .. } => 3,
        LazyreqError::Timeout { .. } => 28,
        LazyreqError::Abandoned { .. } => 42,
        LazyreqError::Transport { source, .. } => transport_exit_code(source.as_ref()),
        LazyreqError::Read { .. } => 56,
        LazyreqError::Decode { .. } | LazyreqError::Json(_) => 26,
        LazyreqError::Io(_) => 23,
        LazyreqError::CookieStore(_) => 26,
    }
}

fn transport_exit_code(err: &(dyn std::error::Error + Send + Sync + 'static)) -> i32 {
    match err.downcast_ref::<reqwest::Error>() {
        Some(err) if err.is_connect() => 7,
        Some(err) if err.is_redirect() => 47,
        Some(err) if err.is_request() => 2,
        _ => 43,
    }
}
