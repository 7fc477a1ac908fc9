/// Errors returned by the IPChat transport layer.
///
/// Per-send failures are not errors: they are reported as
/// [`DeliveryOutcome`](crate::DeliveryOutcome) values.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid peer address: {0:?}")]
    InvalidAddress(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_address() {
        let err = TransportError::InvalidAddress("".into());
        assert_eq!(err.to_string(), "invalid peer address: \"\"");
    }

    #[test]
    fn display_bind() {
        let err = TransportError::Bind {
            addr: "0.0.0.0:12345".into(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        assert_eq!(err.to_string(), "failed to bind 0.0.0.0:12345: in use");
    }
}
