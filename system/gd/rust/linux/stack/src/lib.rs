//! Multi-advertising instance state for a Bluetooth LE stack.
//!
//! Tracks, per advertising instance the controller supports, the AD fields to
//! advertise, the advertising parameters and a discoverability timer. See
//! `multi_adv::MultiAdvRegistry` for the entry point.

pub mod adv_data;
pub mod alarm;
pub mod controller;
pub mod multi_adv;
pub mod sysprop;
pub mod uuid;
