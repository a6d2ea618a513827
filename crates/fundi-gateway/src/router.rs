//! # Provider Routing
//!
//! Selects the adapter for a recipient by phone-number prefix, and by
//! provider identifier for webhook dispatch. First matching adapter
//! wins, in registration order.

use std::sync::Arc;

use fundi_core::PhoneNumber;

use crate::adapter::{GatewayError, PaymentGatewayAdapter, ProviderKind};

/// Routes movements and webhooks to the right provider adapter.
#[derive(Clone)]
pub struct GatewayRouter {
    adapters: Vec<Arc<dyn PaymentGatewayAdapter>>,
}

impl GatewayRouter {
    /// A router over the given adapters, consulted in order.
    pub fn new(adapters: Vec<Arc<dyn PaymentGatewayAdapter>>) -> Self {
        Self { adapters }
    }

    /// The adapter serving this phone number.
    pub fn route(&self, phone: &PhoneNumber) -> Result<Arc<dyn PaymentGatewayAdapter>, GatewayError> {
        self.adapters
            .iter()
            .find(|a| a.supports_phone_number(phone))
            .cloned()
            .ok_or_else(|| GatewayError::Unroutable(phone.to_string()))
    }

    /// The adapter for a provider, for webhook dispatch.
    pub fn by_provider(&self, kind: ProviderKind) -> Result<Arc<dyn PaymentGatewayAdapter>, GatewayError> {
        self.adapters
            .iter()
            .find(|a| a.provider() == kind)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownProvider(kind.to_string()))
    }

    /// Registered providers, in routing order.
    pub fn providers(&self) -> Vec<ProviderKind> {
        self.adapters.iter().map(|a| a.provider()).collect()
    }
}
