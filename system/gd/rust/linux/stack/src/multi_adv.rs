//! Per-instance control state for controllers running several advertising
//! sets at once.
//!
//! `MultiAdvRegistry` owns one `MultiAdvInstCb` per advertising instance the
//! controller supports. The table is allocated on first use and released once
//! the last registered client goes away. Releasing the table drops every
//! control block, which cancels any discoverability timer still pending.

use log::{debug, warn};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;
use std::cmp::max;
use std::convert::TryFrom;
use std::time::Duration;
use thiserror::Error;

use crate::adv_data::{
    AdField, AdMask, AdvData, AdvDataPackage, ProprietaryElem, AD_TYPE_SERVICE_DATA,
    ADV_FLAGS_GENERAL, ADV_FLAGS_LIMITED, MAX_SIZE_MANUFACTURER_DATA,
    MAX_SIZE_PROPRIETARY_ELEMENT,
};
use crate::alarm::{Alarm, AlarmCallback, AlarmQueue};
use crate::controller::IController;
use crate::uuid::UuidHelper;

pub type AdvertiserId = i32;

/// Name given to every discoverability timer.
pub const MULTI_ADV_TIMER_NAME: &str = "btif_gatt.multi_adv_timer";

/// Advertising event type of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum AdvType {
    ConnectUndirected = 0,
    ConnectDirected = 1,
    Discoverable = 2,
    NonConnect = 3,
    ConnectLoDutyDirected = 4,
}

impl Default for AdvType {
    fn default() -> Self {
        AdvType::ConnectUndirected
    }
}

impl AdvType {
    pub fn from_raw(raw: u8) -> Option<AdvType> {
        FromPrimitive::from_u8(raw)
    }
}

/// Advertising parameters stored for an instance.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MultiAdvParams {
    /// Advertising interval bounds, in 0.625 ms units.
    pub adv_int_min: u16,
    pub adv_int_max: u16,
    pub adv_type: AdvType,
    pub channel_map: u8,
    pub adv_filter_policy: u8,
    /// Transmit power in dBm.
    pub tx_power: i8,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MultiAdvError {
    #[error("multi-advertising control blocks are not allocated")]
    NotAllocated,
    #[error("invalid advertising instance {0}")]
    InvalidInstance(AdvertiserId),
}

/// Control block of one advertising instance.
#[derive(Debug, Default)]
pub struct MultiAdvInstCb {
    data: AdvData,
    param: MultiAdvParams,
    /// Discoverability timeout in seconds, 0 for none.
    timeout_s: u32,
    multi_adv_timer: Option<Alarm>,
}

impl MultiAdvInstCb {
    pub fn mask(&self) -> AdMask {
        self.data.mask()
    }

    pub fn data(&self) -> &AdvData {
        &self.data
    }

    pub fn params(&self) -> &MultiAdvParams {
        &self.param
    }

    pub fn set_params(&mut self, param: MultiAdvParams) {
        self.param = param;
    }

    pub fn timeout_s(&self) -> u32 {
        self.timeout_s
    }

    pub fn set_timeout_s(&mut self, timeout_s: u32) {
        self.timeout_s = timeout_s;
    }

    pub fn timer(&self) -> Option<&Alarm> {
        self.multi_adv_timer.as_ref()
    }

    /// Returns true while a discoverability timer is pending.
    pub fn is_timer_scheduled(&self) -> bool {
        self.multi_adv_timer.as_ref().map_or(false, Alarm::is_scheduled)
    }

    fn stop_timer(&mut self) {
        // Dropping the alarm cancels it.
        self.multi_adv_timer = None;
    }

    /// Clears the AD data, and the timer too if `stop_timer` is set.
    /// Parameters and timeout are kept.
    pub fn cleanup(&mut self, stop_timer: bool) {
        if stop_timer {
            self.stop_timer();
        }
        self.data.clear();
    }
}

/// The control block table, indexed by advertiser id.
#[derive(Debug)]
pub struct MultiAdvCommonData {
    inst_cb: Vec<MultiAdvInstCb>,
}

impl MultiAdvCommonData {
    fn new(count: usize) -> Self {
        MultiAdvCommonData { inst_cb: (0..count).map(|_| MultiAdvInstCb::default()).collect() }
    }

    fn slot(&self, id: AdvertiserId) -> Result<usize, MultiAdvError> {
        match usize::try_from(id) {
            Ok(slot) if slot < self.inst_cb.len() => Ok(slot),
            _ => Err(MultiAdvError::InvalidInstance(id)),
        }
    }

    pub fn len(&self) -> usize {
        self.inst_cb.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inst_cb.is_empty()
    }

    pub fn get(&self, id: AdvertiserId) -> Result<&MultiAdvInstCb, MultiAdvError> {
        let slot = self.slot(id)?;
        Ok(&self.inst_cb[slot])
    }

    pub fn get_mut(&mut self, id: AdvertiserId) -> Result<&mut MultiAdvInstCb, MultiAdvError> {
        let slot = self.slot(id)?;
        Ok(&mut self.inst_cb[slot])
    }

    pub fn iter(&self) -> impl Iterator<Item = &MultiAdvInstCb> {
        self.inst_cb.iter()
    }
}

fn is_valid_int_range(min_interval: u16, max_interval: u16) -> bool {
    min_interval > 0 && max_interval > min_interval
}

/// Interval bounds requested by a client. None if either does not fit the
/// 16-bit field.
fn to_int_range(min_interval: i32, max_interval: i32) -> Option<(u16, u16)> {
    Some((u16::try_from(min_interval).ok()?, u16::try_from(max_interval).ok()?))
}

/// Owns the multi-advertising control blocks of one stack instance.
pub struct MultiAdvRegistry {
    controller: Box<dyn IController + Send>,
    alarm_queue: AlarmQueue,
    user_app_count: u32,
    common: Option<MultiAdvCommonData>,
}

impl MultiAdvRegistry {
    pub fn new(controller: Box<dyn IController + Send>, alarm_queue: AlarmQueue) -> Self {
        MultiAdvRegistry { controller, alarm_queue, user_app_count: 0, common: None }
    }

    /// Number of control blocks the table holds. Controllers without
    /// multi-advertising support still get one.
    pub fn max_instances(&self) -> usize {
        max(1, self.controller.get_ble_max_adv_instance_count() as usize)
    }

    /// Returns the control block table, allocating it on first use.
    pub fn obtain(&mut self) -> &mut MultiAdvCommonData {
        let count = self.max_instances();
        if self.common.is_none() {
            debug!("Allocating multi-adv control blocks, count: {}", count);
        }
        self.common.get_or_insert_with(|| MultiAdvCommonData::new(count))
    }

    pub fn is_allocated(&self) -> bool {
        self.common.is_some()
    }

    pub fn common(&self) -> Option<&MultiAdvCommonData> {
        self.common.as_ref()
    }

    pub fn inst_cb(&self, id: AdvertiserId) -> Result<&MultiAdvInstCb, MultiAdvError> {
        self.common.as_ref().ok_or(MultiAdvError::NotAllocated)?.get(id)
    }

    pub fn inst_cb_mut(&mut self, id: AdvertiserId) -> Result<&mut MultiAdvInstCb, MultiAdvError> {
        self.common.as_mut().ok_or(MultiAdvError::NotAllocated)?.get_mut(id)
    }

    pub fn user_app_count(&self) -> u32 {
        self.user_app_count
    }

    pub fn incr_app_count(&mut self) {
        self.user_app_count += 1;
    }

    /// Releases the control block table when the last client goes away.
    pub fn decr_app_count(&mut self) {
        self.user_app_count = self.user_app_count.saturating_sub(1);

        if self.user_app_count == 0 && self.common.take().is_some() {
            debug!("Released multi-adv control blocks");
        }
    }

    /// Stores the advertising parameters of `id`. Returns false for an
    /// invalid instance.
    pub fn set_inst_params(&mut self, id: AdvertiserId, param: MultiAdvParams) -> bool {
        match self.obtain().get_mut(id) {
            Ok(inst) => {
                inst.set_params(param);
                true
            }
            Err(e) => {
                warn!("set_inst_params: {}", e);
                false
            }
        }
    }

    /// Stores the discoverability timeout of `id`. Returns false for an
    /// invalid instance.
    pub fn set_inst_timeout(&mut self, id: AdvertiserId, timeout_s: u32) -> bool {
        match self.obtain().get_mut(id) {
            Ok(inst) => {
                inst.set_timeout_s(timeout_s);
                true
            }
            Err(e) => {
                warn!("set_inst_timeout: {}", e);
                false
            }
        }
    }

    /// Replaces the AD data of instance `cbindex` with the fields described by
    /// `adv_data`.
    ///
    /// With `inst_data` set, the interval range and tx power come from the
    /// instance's stored parameters instead of the package. Oversized or
    /// surplus entries are dropped silently; only an invalid instance makes
    /// this return false.
    pub fn copy_datacb(
        &mut self,
        cbindex: AdvertiserId,
        adv_data: &AdvDataPackage,
        inst_data: bool,
    ) -> bool {
        let inst = match self.obtain().get_mut(cbindex) {
            Ok(inst) => inst,
            Err(e) => {
                warn!("copy_datacb: {}", e);
                return false;
            }
        };

        debug!("copy_datacb: instance {}, inst_data {}", cbindex, inst_data);
        inst.data.clear();

        if !adv_data.set_scan_rsp() {
            let mut flag = ADV_FLAGS_GENERAL;
            if inst.timeout_s != 0 {
                flag = ADV_FLAGS_LIMITED;
            }
            if inst.param.adv_type == AdvType::NonConnect {
                flag &= !(ADV_FLAGS_LIMITED | ADV_FLAGS_GENERAL);
            }
            // A zero flags field is never advertised.
            if flag != 0 {
                inst.data.insert(AdField::Flags(flag));
            }
        }

        if adv_data.include_name() {
            inst.data.insert(AdField::DeviceName);
        }

        if adv_data.include_txpower() {
            let tx_power = if inst_data { inst.param.tx_power } else { 0 };
            inst.data.insert(AdField::TxPower(tx_power));
        }

        let int_range = if inst_data {
            Some((inst.param.adv_int_min, inst.param.adv_int_max))
        } else {
            to_int_range(adv_data.min_interval(), adv_data.max_interval())
        };
        match int_range {
            Some((low, hi)) if is_valid_int_range(low, hi) => {
                inst.data.insert(AdField::IntRange { low, hi });
            }
            _ => debug!("copy_datacb: no interval range for instance {}", cbindex),
        }

        // Appearance is a 16-bit value on the air.
        match u16::try_from(adv_data.appearance()) {
            Ok(0) => (),
            Ok(appearance) => {
                inst.data.insert(AdField::Appearance(appearance));
            }
            Err(_) => warn!("copy_datacb: appearance {:#x} out of range", adv_data.appearance()),
        }

        let manufacturer_data = adv_data.manufacturer_data();
        if !manufacturer_data.is_empty() && manufacturer_data.len() < MAX_SIZE_MANUFACTURER_DATA {
            inst.data.insert(AdField::Manufacturer(manufacturer_data.to_vec()));
        }

        let service_data = adv_data.service_data();
        if !service_data.is_empty() && service_data.len() < MAX_SIZE_PROPRIETARY_ELEMENT {
            debug!("copy_datacb: service data, len {}", service_data.len());
            inst.data.insert(AdField::Proprietary(vec![ProprietaryElem {
                adv_type: AD_TYPE_SERVICE_DATA,
                val: service_data.to_vec(),
            }]));
        }

        for uuid in adv_data.service_uuids() {
            let canonical = UuidHelper::canonicalize(&uuid);
            if inst.data.add_service_uuid(canonical) {
                debug!("copy_datacb: added {}-bit service uuid {}", canonical.width() * 8, uuid);
            } else {
                debug!("copy_datacb: service list full, dropping {}", uuid);
            }
        }

        true
    }

    /// Cleans up the instance of a client that is going away.
    pub fn clear_client_if(&mut self, advertiser_id: AdvertiserId, stop_timer: bool) {
        debug!("clear_client_if: advertiser {}", advertiser_id);
        self.cleanup_inst_cb(advertiser_id, stop_timer);
    }

    /// Clears the AD data of instance `inst_id`, stopping its timer when
    /// `stop_timer` is set. An invalid instance is ignored.
    pub fn cleanup_inst_cb(&mut self, inst_id: AdvertiserId, stop_timer: bool) {
        if usize::try_from(inst_id).map_or(true, |slot| slot >= self.max_instances()) {
            debug!("cleanup_inst_cb: {}", MultiAdvError::InvalidInstance(inst_id));
            return;
        }

        match self.obtain().get_mut(inst_id) {
            Ok(inst) => {
                debug!("cleanup_inst_cb: instance {}", inst_id);
                inst.cleanup(stop_timer);
            }
            Err(e) => debug!("cleanup_inst_cb: {}", e),
        }
    }

    /// Arms or disarms the discoverability timer of `advertiser_id`.
    ///
    /// `None` cancels any pending timer. `Some(cb)` restarts the timer so that
    /// `cb(advertiser_id)` runs once the instance's timeout elapses, unless the
    /// instance has no timeout, in which case nothing changes.
    pub fn timer_ctrl(&mut self, advertiser_id: AdvertiserId, cb: Option<AlarmCallback>) {
        let queue = self.alarm_queue.clone();
        let inst = match self.obtain().get_mut(advertiser_id) {
            Ok(inst) => inst,
            Err(e) => {
                warn!("timer_ctrl: {}", e);
                return;
            }
        };

        let cb = match cb {
            Some(cb) => cb,
            None => {
                inst.stop_timer();
                return;
            }
        };

        if inst.timeout_s == 0 {
            debug!("timer_ctrl: no timeout for advertiser {}", advertiser_id);
            return;
        }

        inst.stop_timer();
        let mut alarm = Alarm::new(MULTI_ADV_TIMER_NAME);
        alarm.set_on_queue(Duration::from_secs(inst.timeout_s.into()), cb, advertiser_id, &queue);
        inst.multi_adv_timer = Some(alarm);
    }
}
