//! Current-time capability

use async_trait::async_trait;
use chrono::Local;
use serde_json::{json, Value};

use crate::capability::{Capability, CapabilityError, StateSnapshot};

/// Reports the current system time as `HH:MM:SS`
pub struct ClockCapability;

#[async_trait]
impl Capability for ClockCapability {
    async fn invoke(
        &self,
        _request: &str,
        _state: StateSnapshot,
    ) -> Result<Value, CapabilityError> {
        Ok(json!(Local::now().format("%H:%M:%S").to_string()))
    }
}
