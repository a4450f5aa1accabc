//! Translation of RPC status codes into transport (HTTP) status codes.

use http::StatusCode;
use tonic::Code;

use crate::error::GatewayError;

/// Map an RPC status code onto the HTTP status the proxy response carries.
///
/// `Cancelled`, `Unknown` and `DeadlineExceeded` have no counterpart and are
/// rejected with [`GatewayError::UnmappedStatus`].
pub fn to_transport_status(code: Code) -> Result<StatusCode, GatewayError> {
    let status = match code {
        Code::Ok => StatusCode::OK,
        Code::InvalidArgument => StatusCode::BAD_REQUEST,
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::AlreadyExists => StatusCode::CONFLICT,
        Code::PermissionDenied => StatusCode::FORBIDDEN,
        Code::Unauthenticated => StatusCode::UNAUTHORIZED,
        Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        Code::FailedPrecondition => StatusCode::PRECONDITION_FAILED,
        Code::Aborted => StatusCode::CONFLICT,
        Code::OutOfRange => StatusCode::BAD_REQUEST,
        Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        Code::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        Code::DataLoss => StatusCode::INTERNAL_SERVER_ERROR,
        other => return Err(GatewayError::UnmappedStatus(other)),
    };

    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_mapping() {
        let table = [
            (Code::Ok, 200),
            (Code::InvalidArgument, 400),
            (Code::NotFound, 404),
            (Code::AlreadyExists, 409),
            (Code::PermissionDenied, 403),
            (Code::Unauthenticated, 401),
            (Code::ResourceExhausted, 429),
            (Code::FailedPrecondition, 412),
            (Code::Aborted, 409),
            (Code::OutOfRange, 400),
            (Code::Unimplemented, 501),
            (Code::Internal, 500),
            (Code::Unavailable, 503),
            (Code::DataLoss, 500),
        ];

        for (code, expected) in table {
            let status = to_transport_status(code).unwrap();
            assert_eq!(status.as_u16(), expected, "mapping for {code:?}");
        }
    }

    #[test]
    fn test_unmapped_codes_fail() {
        for code in [Code::Cancelled, Code::Unknown, Code::DeadlineExceeded] {
            let result = to_transport_status(code);
            assert!(matches!(result, Err(GatewayError::UnmappedStatus(c)) if c == code));
        }
    }
}
