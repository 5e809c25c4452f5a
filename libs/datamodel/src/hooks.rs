use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ConvertError;
use crate::field::FieldValue;
use crate::schema::TypeSignature;
use crate::value::Value;

/// Structure hook: tree value → typed field value.
pub type InboundHook = Arc<dyn Fn(&Value) -> Result<FieldValue, ConvertError> + Send + Sync>;

/// Unstructure hook: typed field value → tree value.
pub type OutboundHook = Arc<dyn Fn(&FieldValue) -> Result<Value, ConvertError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Tree → record.
    Inbound,
    /// Record → tree.
    Outbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Inbound => f.write_str("structure"),
            Direction::Outbound => f.write_str("unstructure"),
        }
    }
}

/// Per-signature conversion functions, one table per direction.
///
/// At most one hook per signature and direction; registering again
/// replaces the previous hook. Plans copy the hooks they use at build time,
/// so later registrations never reach an already-built plan.
#[derive(Clone, Default)]
pub struct HookRegistry {
    inbound: HashMap<TypeSignature, InboundHook>,
    outbound: HashMap<TypeSignature, OutboundHook>,
}

impl HookRegistry {
    /// Empty registry, without the default primitive hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with hooks for every primitive, temporal and
    /// `Any` signature.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        crate::defaults::install(&mut registry);
        registry
    }

    pub fn register_inbound(&mut self, signature: impl Into<TypeSignature>, hook: InboundHook) {
        let signature = signature.into();
        if self.inbound.insert(signature.clone(), hook).is_some() {
            tracing::debug!(signature = %signature, direction = %Direction::Inbound, "hook overridden");
        } else {
            tracing::debug!(signature = %signature, direction = %Direction::Inbound, "hook registered");
        }
    }

    pub fn register_outbound(&mut self, signature: impl Into<TypeSignature>, hook: OutboundHook) {
        let signature = signature.into();
        if self.outbound.insert(signature.clone(), hook).is_some() {
            tracing::debug!(signature = %signature, direction = %Direction::Outbound, "hook overridden");
        } else {
            tracing::debug!(signature = %signature, direction = %Direction::Outbound, "hook registered");
        }
    }

    pub fn register(
        &mut self,
        signature: impl Into<TypeSignature>,
        inbound: InboundHook,
        outbound: OutboundHook,
    ) {
        let signature = signature.into();
        self.register_inbound(signature.clone(), inbound);
        self.register_outbound(signature, outbound);
    }

    pub fn lookup_inbound(&self, signature: &str) -> Option<InboundHook> {
        self.inbound.get(signature).cloned()
    }

    pub fn lookup_outbound(&self, signature: &str) -> Option<OutboundHook> {
        self.outbound.get(signature).cloned()
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut inbound: Vec<_> = self.inbound.keys().map(TypeSignature::as_str).collect();
        let mut outbound: Vec<_> = self.outbound.keys().map(TypeSignature::as_str).collect();
        inbound.sort_unstable();
        outbound.sort_unstable();
        f.debug_struct("HookRegistry")
            .field("inbound", &inbound)
            .field("outbound", &outbound)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_primitives_and_temporal_kinds() {
        let registry = HookRegistry::with_defaults();
        for signature in [
            "bool", "i8", "i64", "u64", "usize", "f32", "f64", "String", "Bytes", "NaiveDate",
            "DateTime<FixedOffset>", "DateTime<Utc>", "Any",
        ] {
            assert!(registry.lookup_inbound(signature).is_some(), "{signature}");
            assert!(registry.lookup_outbound(signature).is_some(), "{signature}");
        }
        assert!(registry.lookup_inbound("Vec<i64>").is_none());
    }

    #[test]
    fn registration_is_last_write_wins() {
        let mut registry = HookRegistry::new();
        registry.register_inbound("Point", Arc::new(|_: &Value| -> Result<FieldValue, ConvertError> { Ok(FieldValue::Int(1)) }));
        registry.register_inbound("Point", Arc::new(|_: &Value| -> Result<FieldValue, ConvertError> { Ok(FieldValue::Int(2)) }));
        let hook = registry.lookup_inbound("Point").unwrap();
        assert_eq!(hook(&Value::Null).unwrap(), FieldValue::Int(2));
        assert!(registry.lookup_outbound("Point").is_none());
    }
}
