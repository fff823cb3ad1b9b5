use std::collections::HashMap;

// Object names as delivered by the SML decoder (A-B:C.D.E*F)
pub const OBIS_VENDOR: &str = "129-129:199.130.3*255";
pub const OBIS_SERIAL: &str = "1-0:0.0.9*255";
pub const OBIS_ACTUAL_POWER: &str = "1-0:16.7.0*255";
pub const OBIS_ACTUAL_POWER_L1: &str = "1-0:36.7.0*255";
pub const OBIS_ACTUAL_POWER_L2: &str = "1-0:56.7.0*255";
pub const OBIS_ACTUAL_POWER_L3: &str = "1-0:76.7.0*255";
pub const OBIS_TOTAL_ENERGY: &str = "1-0:1.8.0*255";

/// Phase power object names, in phase order L1, L2, L3.
pub const OBIS_ACTUAL_POWER_PHASES: [&str; 3] = [
    OBIS_ACTUAL_POWER_L1,
    OBIS_ACTUAL_POWER_L2,
    OBIS_ACTUAL_POWER_L3,
];

pub fn get_obis_description(obis_code: &str) -> Option<&'static str> {
    let descriptions = get_standard_obis_descriptions();
    descriptions.get(strip_storage(obis_code)).copied()
}

pub fn get_standard_obis_descriptions() -> HashMap<&'static str, &'static str> {
    let mut map = HashMap::new();

    // Identification
    map.insert("129-129:199.130.3", "Manufacturer");
    map.insert("1-0:0.0.9", "Server ID");

    // Energy values
    map.insert("1-0:1.8.0", "Active energy + (total)");
    map.insert("1-0:1.8.1", "Active energy + (tariff 1)");
    map.insert("1-0:1.8.2", "Active energy + (tariff 2)");
    map.insert("1-0:2.8.0", "Active energy - (total)");

    // Power values
    map.insert("1-0:16.7.0", "Sum active instantaneous power");
    map.insert("1-0:36.7.0", "Active instantaneous power (L1)");
    map.insert("1-0:56.7.0", "Active instantaneous power (L2)");
    map.insert("1-0:76.7.0", "Active instantaneous power (L3)");

    map
}

pub fn validate_obis_code(code: &str) -> bool {
    // OBIS code format: A-B:C.D.E*F
    // A: Medium (0=abstract, 1=electricity, 6=heat, 7=gas, 8=water)
    // B: Channel
    // C: Physical value
    // D: Processing method
    // E: Tariff/Time
    // F: Storage (optional)

    let parts: Vec<&str> = code.split(':').collect();
    if parts.len() != 2 {
        return false;
    }

    let ab_parts: Vec<&str> = parts[0].split('-').collect();
    if ab_parts.len() != 2 {
        return false;
    }

    let (cde_part, storage) = match parts[1].split_once('*') {
        Some((cde, f)) => (cde, Some(f)),
        None => (parts[1], None),
    };
    let cde_parts: Vec<&str> = cde_part.split('.').collect();
    if cde_parts.len() != 3 {
        return false;
    }

    for part in ab_parts.iter().chain(cde_parts.iter()).chain(storage.iter()) {
        if part.parse::<u8>().is_err() {
            return false;
        }
    }

    true
}

pub fn normalize_obis_code(code: &str) -> String {
    code.trim().to_string()
}

fn strip_storage(code: &str) -> &str {
    match code.split_once('*') {
        Some((base, _)) => base,
        None => code,
    }
}
