use crate::metrics::IdentitySink;
use crate::obis_utils::{self, OBIS_ACTUAL_POWER, OBIS_ACTUAL_POWER_PHASES, OBIS_SERIAL, OBIS_TOTAL_ENERGY, OBIS_VENDOR};
use log::debug;
use thiserror::Error;

pub mod structs;

use structs::*;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Value {value:?} of {obj_name} is not a number")]
    MalformedValue { obj_name: String, value: String },
    #[error("Extractor lock poisoned")]
    LockPoisoned,
}

/// Keeps the latest identity and usage figures announced by the meter.
///
/// Identity (vendor and serial) survives between records since a meter only
/// announces it from time to time. Usage figures are recomputed from every
/// record once the identity is known.
#[derive(Debug, Default, Clone)]
pub struct SmlMessageExtractor {
    vendor: String,
    serial: String,
    act_usage: f64,
    act_usage_details: [f64; 3],
    total_usage: f64,
}

impl SmlMessageExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        !self.vendor().is_empty() && !self.device().is_empty()
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// Device number, the last token of the announced server id.
    pub fn device(&self) -> &str {
        self.serial.split_whitespace().last().unwrap_or("")
    }

    /// Current power draw in W.
    pub fn instantaneous_usage(&self) -> f64 {
        if self.is_initialized() {
            return self.act_usage;
        }
        0.0
    }

    /// Current power draw per phase in W, ordered L1, L2, L3.
    pub fn instantaneous_usage_phases(&self) -> [f64; 3] {
        if self.is_initialized() {
            return self.act_usage_details;
        }
        [0.0; 3]
    }

    /// Energy counter in kWh.
    pub fn cumulative_usage(&self) -> f64 {
        if self.is_initialized() {
            return self.total_usage / 1000.0;
        }
        0.0
    }

    pub fn ingest(&mut self, record: &SmlRecord, identity: &dyn IdentitySink) -> Result<(), ExtractError> {
        for entry in &record.val_list {
            if entry.obj_name == OBIS_VENDOR {
                self.vendor = entry.value.to_string();
                continue;
            }

            if entry.obj_name == OBIS_SERIAL {
                self.serial = entry.value.to_string();
                continue;
            }
        }

        identity.publish(&[("Vendor", self.vendor()), ("Device", self.device())]);

        if !self.is_initialized() {
            debug!("Meter identity still unknown, skipping usage values");
            return Ok(());
        }

        // Parse everything first so a malformed value leaves the previous figures intact
        let act_usage = parse_data(record, OBIS_ACTUAL_POWER)?;
        let mut act_usage_details = [0.0; 3];
        for (detail, obj_name) in act_usage_details.iter_mut().zip(OBIS_ACTUAL_POWER_PHASES) {
            *detail = parse_data(record, obj_name)?;
        }
        let total_usage = parse_data(record, OBIS_TOTAL_ENERGY)?;

        self.act_usage = act_usage;
        self.act_usage_details = act_usage_details;
        self.total_usage = total_usage;

        debug!("Meter {} {}: {} W ({:?}), {} Wh",
            self.vendor(), self.device(), act_usage, act_usage_details, total_usage);
        Ok(())
    }
}

/// Numeric value of the first entry named `obj_name`, 0 if the record lacks it.
fn parse_data(record: &SmlRecord, obj_name: &str) -> Result<f64, ExtractError> {
    let Some(entry) = record.find(obj_name) else {
        return Ok(0.0);
    };

    let value = match &entry.value {
        SmlEntryValue::Number(n) => *n,
        SmlEntryValue::Text(s) => s.trim().parse::<f64>().map_err(|_| malformed(obj_name, &entry.value))?,
        other => return Err(malformed(obj_name, other)),
    };

    debug!("{} ({}): {} {}",
        obj_name,
        obis_utils::get_obis_description(obj_name).unwrap_or("unknown"),
        value,
        entry.unit.and_then(get_sml_unit_name).unwrap_or(""));
    Ok(value)
}

fn malformed(obj_name: &str, value: &SmlEntryValue) -> ExtractError {
    ExtractError::MalformedValue {
        obj_name: obj_name.to_string(),
        value: value.to_string(),
    }
}
