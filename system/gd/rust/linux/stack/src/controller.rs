//! Controller capabilities needed by the multi-advertising state.

use num_traits::clamp;

use crate::sysprop::{self, PropertyI32};

/// Capability queries answered by the local controller.
pub trait IController {
    /// Number of advertising instances the controller can run concurrently.
    /// Controllers without multi-advertising support report 0.
    fn get_ble_max_adv_instance_count(&self) -> u8;
}

/// Controller whose capabilities are fixed at construction.
#[derive(Debug, Clone)]
pub struct Controller {
    max_adv_instances: u8,
}

impl Controller {
    /// Reads the capabilities from system properties.
    pub fn new() -> Controller {
        let max = sysprop::get_i32(PropertyI32::LeMaxAdvInstances);
        Controller::with_max_adv_instances(clamp(max, 0, u8::MAX as i32) as u8)
    }

    pub fn with_max_adv_instances(max_adv_instances: u8) -> Controller {
        Controller { max_adv_instances }
    }
}

impl Default for Controller {
    fn default() -> Self {
        Controller::new()
    }
}

impl IController for Controller {
    fn get_ble_max_adv_instance_count(&self) -> u8 {
        self.max_adv_instances
    }
}
