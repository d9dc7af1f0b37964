//! Ordering units around a base transport.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::middleware::Middleware;
use crate::transport::BoxTransport;

/// Compose `units` around `base`; `units[0]` is outermost.
pub fn compose(base: BoxTransport, units: &[Arc<dyn Middleware>]) -> BoxTransport {
    units
        .iter()
        .rev()
        .fold(base, |transport, unit| unit.wrap(transport))
}

/// Incremental builder over [`compose`].
#[derive(Default, Clone)]
pub struct Chain {
    base: Option<BoxTransport>,
    units: Vec<Arc<dyn Middleware>>,
}

impl Chain {
    pub fn new(base: BoxTransport) -> Self {
        Self {
            base: Some(base),
            units: Vec::new(),
        }
    }

    pub fn transport(mut self, base: BoxTransport) -> Self {
        self.base = Some(base);
        self
    }

    /// Append a unit inside every unit added so far.
    pub fn with(mut self, unit: impl Middleware + 'static) -> Self {
        self.units.push(Arc::new(unit));
        self
    }

    pub fn with_shared(mut self, unit: Arc<dyn Middleware>) -> Self {
        self.units.push(unit);
        self
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn build(self) -> Result<BoxTransport> {
        let base = self
            .base
            .ok_or_else(|| Error::Config("no base transport configured".into()))?;
        Ok(compose(base, &self.units))
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("has_base", &self.base.is_some())
            .field("units", &self.units.len())
            .finish()
    }
}
