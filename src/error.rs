use thiserror::Error;

/// Failure to establish or keep a connection layer.
///
/// Both the tunnel and the framebuffer session report through this one
/// taxonomy; the supervisor treats every variant the same way (stay
/// disconnected, keep retrying), so callers never see a partially
/// connected state.
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("connection failed: {0}")]
    Network(String),
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<std::io::Error> for ConnectError {
    fn from(e: std::io::Error) -> Self {
        ConnectError::Network(e.to_string())
    }
}

impl From<vnc::Error> for ConnectError {
    fn from(e: vnc::Error) -> Self {
        match e {
            vnc::Error::AuthenticationFailure(msg) => ConnectError::Authentication(msg),
            vnc::Error::AuthenticationUnavailable => {
                ConnectError::Authentication("no usable VNC authentication method".to_string())
            }
            vnc::Error::Io(e) => ConnectError::Network(e.to_string()),
            vnc::Error::Disconnected => ConnectError::Network("server closed the connection".to_string()),
            other => ConnectError::Protocol(other.to_string()),
        }
    }
}

/// Failure to turn a captured frame into a renderable image.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("frame buffer holds {actual} bytes, expected {expected} for {width}x{height}")]
    Truncated {
        width: u16,
        height: u16,
        expected: usize,
        actual: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_vnc_password_maps_to_authentication() {
        let e = ConnectError::from(vnc::Error::AuthenticationFailure(
            "password rejected".to_string(),
        ));
        assert!(matches!(e, ConnectError::Authentication(_)));
    }

    #[test]
    fn test_io_failure_maps_to_network() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(matches!(
            ConnectError::from(vnc::Error::Io(io)),
            ConnectError::Network(_)
        ));
    }
}
