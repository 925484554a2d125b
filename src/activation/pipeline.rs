//! The activation pipeline.

use std::sync::Arc;

use crate::activation::{Context, InstanceReference};
use crate::caching::{ActivationCache, ActivationClaim};
use crate::error::ActivationResult;

/// One step run against every instance when it is activated and deactivated.
///
/// Both methods default to doing nothing, so strategies implement only the
/// side they care about.
pub trait ActivationStrategy: Send + Sync {
    fn activate(&self, _context: &Context, _reference: &InstanceReference) -> ActivationResult<()> {
        Ok(())
    }

    fn deactivate(&self, _context: &Context, _reference: &InstanceReference) -> ActivationResult<()> {
        Ok(())
    }
}

/// Runs the activation strategies, in order, against new instances and
/// again (same order) against instances leaving the cache.
///
/// The activation cache guards both directions: an instance that was
/// already activated (or deactivated) is skipped, and a caller reaching an
/// instance whose activation is running on another thread waits for it.
/// The first failing strategy stops the run and its error is returned; the
/// instance then counts as not activated.
pub struct Pipeline {
    strategies: Vec<Arc<dyn ActivationStrategy>>,
    activation_cache: Arc<ActivationCache>,
}

impl Pipeline {
    pub fn new(strategies: Vec<Arc<dyn ActivationStrategy>>, activation_cache: Arc<ActivationCache>) -> Self {
        Self {
            strategies,
            activation_cache,
        }
    }

    pub fn strategies(&self) -> &[Arc<dyn ActivationStrategy>] {
        &self.strategies
    }

    pub fn activation_cache(&self) -> &Arc<ActivationCache> {
        &self.activation_cache
    }

    pub fn activate(&self, context: &Context, reference: &InstanceReference) -> ActivationResult<()> {
        let ticket = match self.activation_cache.claim_activation(reference) {
            ActivationClaim::Granted(ticket) => ticket,
            ActivationClaim::Settled => return Ok(()),
        };
        for strategy in &self.strategies {
            strategy.activate(context, reference)?;
        }
        ticket.complete();
        Ok(())
    }

    pub fn deactivate(&self, context: &Context, reference: &InstanceReference) -> ActivationResult<()> {
        if !self.activation_cache.claim_deactivation(reference) {
            return Ok(());
        }
        for strategy in &self.strategies {
            strategy.deactivate(context, reference)?;
        }
        tracing::debug!(
            target: "ferrous_kernel",
            implementation = %reference.implementation(),
            "Deactivated instance"
        );
        Ok(())
    }
}
