//! Routing layer error types.

use hwmp_core::error::ElementError;
use hwmp_core::types::InterfaceId;

#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("malformed element: {0}")]
    Malformed(#[from] ElementError),

    #[error("no mesh interfaces configured")]
    NoInterfaces,

    #[error("interface already registered: {0}")]
    DuplicateInterface(InterfaceId),

    #[error("unknown interface: {0}")]
    UnknownInterface(InterfaceId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_error_display() {
        let err = RoutingError::NoInterfaces;
        assert_eq!(err.to_string(), "no mesh interfaces configured");

        let err = RoutingError::DuplicateInterface(InterfaceId(2));
        assert_eq!(err.to_string(), "interface already registered: if2");

        let err = RoutingError::InvalidConfig("max_ttl must be non-zero");
        assert_eq!(
            err.to_string(),
            "invalid configuration: max_ttl must be non-zero"
        );
    }

    #[test]
    fn test_routing_error_from_element_error() {
        let ee = ElementError::UnknownElement(9);
        let re: RoutingError = ee.into();
        assert!(matches!(re, RoutingError::Malformed(_)));
        assert_eq!(re.to_string(), "malformed element: unknown element id: 9");
    }
}
