//! DeliverySink trait - Dispatcher output interface
//!
//! Defines the abstract interface for Sinks.

use crate::{ContractError, DeliveryReceipt, Observation};

/// Delivery target trait
///
/// All sink implementations must implement this trait. The dispatcher turns
/// every `Err` into a failed `DeliveryOutcome`; nothing crosses the worker boundary.
#[trait_variant::make(DeliverySink: Send)]
pub trait LocalDeliverySink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Attempt one delivery
    ///
    /// # Errors
    /// Transport failures and non-accepting responses (should include context)
    async fn deliver(&mut self, observation: &Observation)
        -> Result<DeliveryReceipt, ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
