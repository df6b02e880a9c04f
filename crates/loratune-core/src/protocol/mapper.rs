//! Field mapping
//!
//! Converts decoded wire parameters into [`Action`] and [`State`].
//! Keys match case-insensitively and the last occurrence of a key wins.
//! Missing or non-numeric fields read as zero; integer fields truncate.

use std::collections::HashMap;

use super::Value;
use crate::radio::{Action, State};

/// Case-insensitive view over a parameter list
struct Fields<'a> {
    map: HashMap<String, &'a Value>,
}

impl<'a> Fields<'a> {
    fn new<K: AsRef<str>>(params: &'a [(K, Value)]) -> Self {
        let map = params
            .iter()
            .map(|(key, value)| (key.as_ref().to_ascii_uppercase(), value))
            .collect();
        Self { map }
    }

    fn float(&self, key: &str) -> f64 {
        self.map.get(key).and_then(|v| v.as_f64()).unwrap_or(0.0)
    }

    fn int(&self, key: &str) -> i64 {
        self.map.get(key).and_then(|v| v.as_i64()).unwrap_or(0)
    }
}

/// Build an [`Action`] from `CONFIG_GET` parameters
pub fn to_action<K: AsRef<str>>(params: &[(K, Value)]) -> Action {
    let fields = Fields::new(params);
    Action {
        fq: fields.int("FQ"),
        bw: fields.int("BW"),
        sf: fields.int("SF"),
        cr: fields.int("CR"),
        tp: fields.int("TP"),
        ih: fields.int("IH"),
        hs: fields.int("HS"),
        pl: fields.int("PL"),
        cl: fields.int("CL"),
        rt: fields.int("RT"),
    }
}

/// Build a [`State`] from `PING_ACK` / `CONFIG_SYNC_CHECK_ACK` parameters
pub fn to_state<K: AsRef<str>>(params: &[(K, Value)]) -> State {
    let fields = Fields::new(params);
    State {
        delay: fields.float("DELAY"),
        rssi: fields.float("RSSI"),
        snr: fields.float("SNR"),
        toa: fields.float("TOA"),
        rtoa: fields.float("RTOA"),
        bps: fields.float("BPS"),
        chc: fields.float("CHC"),
        att: fields.int("ATT"),
        etx: fields.int("ETX"),
    }
}
