//! Typed radio records
//!
//! [`Action`] is a tuning the host can read from or push to the radio,
//! [`State`] is a link measurement returned by the device. Both are built
//! from wire parameters by [`crate::protocol::mapper`]; any field the device
//! leaves out reads as zero.

use serde::{Deserialize, Serialize};

use crate::protocol::Value;

/// A radio tuning. Field names follow the firmware's wire keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", default)]
pub struct Action {
    /// Carrier frequency (`FQ`)
    pub fq: i64,
    /// Bandwidth (`BW`)
    pub bw: i64,
    /// Spreading factor (`SF`)
    pub sf: i64,
    /// Coding rate (`CR`)
    pub cr: i64,
    /// Transmit power (`TP`)
    pub tp: i64,
    /// Implicit header mode (`IH`)
    pub ih: i64,
    /// `HS`
    pub hs: i64,
    /// Payload length (`PL`)
    pub pl: i64,
    /// `CL`
    pub cl: i64,
    /// `RT`
    pub rt: i64,
}

impl Action {
    /// Wire keys in canonical order
    pub const KEYS: [&'static str; 10] = ["FQ", "BW", "SF", "CR", "TP", "IH", "HS", "PL", "CL", "RT"];

    /// Fields as wire parameters, in canonical order
    pub fn params(&self) -> Vec<(&'static str, Value)> {
        let values = [
            self.fq, self.bw, self.sf, self.cr, self.tp, self.ih, self.hs, self.pl, self.cl,
            self.rt,
        ];
        Self::KEYS
            .iter()
            .zip(values)
            .map(|(key, value)| (*key, Value::from(value)))
            .collect()
    }
}

/// A link measurement snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", default)]
pub struct State {
    /// Round-trip delay (`DELAY`)
    pub delay: f64,
    /// Received signal strength in dBm (`RSSI`)
    pub rssi: f64,
    /// Signal-to-noise ratio in dB (`SNR`)
    pub snr: f64,
    /// Time on air (`TOA`)
    pub toa: f64,
    /// Time on air of the reply (`RTOA`)
    pub rtoa: f64,
    /// Throughput in bits per second (`BPS`)
    pub bps: f64,
    /// `CHC`
    pub chc: f64,
    /// Attempts used (`ATT`)
    pub att: i64,
    /// `ETX`
    pub etx: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_action_params_order() {
        let action = Action {
            fq: 868,
            bw: 125,
            sf: 7,
            cr: 5,
            tp: 14,
            ih: 0,
            hs: 1,
            pl: 32,
            cl: 2,
            rt: 3,
        };
        let keys: Vec<&str> = action.params().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, Action::KEYS.to_vec());
        assert_eq!(action.params()[0].1, Value::Integer(868));
        assert_eq!(action.params()[9].1, Value::Integer(3));
    }

    #[test]
    fn test_defaults_are_zero() {
        assert!(Action::default()
            .params()
            .iter()
            .all(|(_, v)| *v == Value::Integer(0)));
        let state = State::default();
        assert_eq!(state.rssi, 0.0);
        assert_eq!(state.etx, 0);
    }
}
