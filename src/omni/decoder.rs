/// Omni multisensor payload decoding
///
/// A full Omni transmission is 10 bytes: `[fmt|id] 8*[data] [crc8]`.
/// The rtl_433 feed only publishes the 8 interior data bytes as the
/// `payload` hex string, so byte 0 here is wire byte 1.
///
/// Layout of the 8 data bytes (nibbles):
///
/// ```text
///     11 12 22 hh ll pp pp vv
/// ```
///
/// - 1: indoor temperature, °C * 10, 12-bit two's complement
/// - 2: outdoor temperature, °C * 10, 12-bit two's complement
/// - h: indoor humidity, %RH
/// - l: light intensity, %
/// - p: barometric pressure, hPa * 10, unsigned 16-bit big-endian
/// - v: (VCC - 3.00) * 100
use crate::error::{Error, Result};

/// Number of interior data bytes carried in the payload
pub const PAYLOAD_LEN: usize = 8;

/// The 8 interior data bytes of one transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payload([u8; PAYLOAD_LEN]);

impl Payload {
    pub fn new(bytes: [u8; PAYLOAD_LEN]) -> Self {
        Payload(bytes)
    }

    /// Parse the payload hex string from the JSON record.
    ///
    /// Extra trailing bytes are ignored; fewer than 8 bytes is rejected.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let raw = hex::decode(hex_str.trim())?;
        if raw.len() < PAYLOAD_LEN {
            return Err(Error::PayloadLength(raw.len()));
        }

        let mut bytes = [0u8; PAYLOAD_LEN];
        bytes.copy_from_slice(&raw[..PAYLOAD_LEN]);
        Ok(Payload(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; PAYLOAD_LEN] {
        &self.0
    }

    /// Upper-case hex rendering used on the output line
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

/// Physical quantities carried by one payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurements {
    pub indoor_temp_c: f64,
    pub outdoor_temp_c: f64,
    pub indoor_humidity_pct: u8,
    pub light_pct: u8,
    pub pressure_hpa: f64,
    pub supply_volts: f64,
}

/// Sign-extend the low `bits` bits of `raw`.
///
/// The field is shifted up so its sign bit lands on bit 31 of an `i32`,
/// then arithmetic-shifted back down, which replicates the sign bit.
pub fn sign_extend(raw: u32, bits: u32) -> i32 {
    debug_assert!(bits > 0 && bits <= 32);
    let shift = 32 - bits;
    ((raw << shift) as i32) >> shift
}

/// Decode the 8 data bytes. Never fails; garbage in gives garbage numbers out.
pub fn decode(payload: &Payload) -> Measurements {
    let b = payload.as_bytes();

    // byte0 is bits 11..4, high nibble of byte1 is bits 3..0
    let indoor_raw = (u32::from(b[0]) << 4) | (u32::from(b[1]) >> 4);
    // low nibble of byte1 is bits 11..8, byte2 is bits 7..0
    let outdoor_raw = (u32::from(b[1] & 0x0F) << 8) | u32::from(b[2]);

    let pressure_raw = u16::from_be_bytes([b[5], b[6]]);

    Measurements {
        indoor_temp_c: f64::from(sign_extend(indoor_raw, 12)) / 10.0,
        outdoor_temp_c: f64::from(sign_extend(outdoor_raw, 12)) / 10.0,
        indoor_humidity_pct: b[3],
        light_pct: b[4],
        pressure_hpa: f64::from(pressure_raw) / 10.0,
        supply_volts: f64::from(b[7]) / 100.0 + 3.00,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// Pack a tenths-of-a-degree value into the indoor temperature field
    fn with_indoor(tenths: i32) -> Payload {
        let raw = (tenths as u32) & 0x0FFF;
        Payload::new([(raw >> 4) as u8, ((raw & 0x0F) << 4) as u8, 0, 0, 0, 0, 0, 0])
    }

    /// Pack a tenths-of-a-degree value into the outdoor temperature field
    fn with_outdoor(tenths: i32) -> Payload {
        let raw = (tenths as u32) & 0x0FFF;
        Payload::new([0, (raw >> 8) as u8, (raw & 0xFF) as u8, 0, 0, 0, 0, 0])
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0x000, 12), 0);
        assert_eq!(sign_extend(0x7FF, 12), 2047);
        assert_eq!(sign_extend(0x800, 12), -2048);
        assert_eq!(sign_extend(0xFFF, 12), -1);
        assert_eq!(sign_extend(0xFF, 8), -1);
        assert_eq!(sign_extend(0x7F, 8), 127);
    }

    #[test]
    fn test_sign_extend_ignores_bits_above_field() {
        assert_eq!(sign_extend(0xF07F, 8), 127);
        assert_eq!(sign_extend(0x1FFF, 12), -1);
    }

    #[test]
    fn test_temperature_full_range() {
        for tenths in -2048..=2047 {
            let expected = f64::from(tenths) / 10.0;
            assert!(close(decode(&with_indoor(tenths)).indoor_temp_c, expected));
            assert!(close(decode(&with_outdoor(tenths)).outdoor_temp_c, expected));
        }
    }

    #[test]
    fn test_temperature_fields_do_not_bleed() {
        // Indoor all ones, outdoor zero
        let m = decode(&Payload::new([0xFF, 0xF0, 0x00, 0, 0, 0, 0, 0]));
        assert!(close(m.indoor_temp_c, -0.1));
        assert!(close(m.outdoor_temp_c, 0.0));

        // Indoor zero, outdoor all ones
        let m = decode(&Payload::new([0x00, 0x0F, 0xFF, 0, 0, 0, 0, 0]));
        assert!(close(m.indoor_temp_c, 0.0));
        assert!(close(m.outdoor_temp_c, -0.1));
    }

    #[test]
    fn test_decode_reference_packet() {
        let payload = Payload::from_hex("0C8A1E3201F43200").unwrap();
        let m = decode(&payload);

        assert!(close(m.indoor_temp_c, 20.0));
        // 0xA1E is negative in 12 bits: 2590 - 4096 = -1506
        assert!(close(m.outdoor_temp_c, -150.6));
        assert_eq!(m.indoor_humidity_pct, 50);
        assert_eq!(m.light_pct, 1);
        assert!(close(m.pressure_hpa, 6251.4));
        assert!(close(m.supply_volts, 3.00));
    }

    #[test]
    fn test_decode_typical_weather() {
        let m = decode(&Payload::from_hex("0D7FE02D5027941E").unwrap());

        assert!(close(m.indoor_temp_c, 21.5));
        assert!(close(m.outdoor_temp_c, -3.2));
        assert_eq!(m.indoor_humidity_pct, 45);
        assert_eq!(m.light_pct, 80);
        assert!(close(m.pressure_hpa, 1013.2));
        assert!(close(m.supply_volts, 3.30));
    }

    #[test]
    fn test_decode_extremes() {
        let m = decode(&Payload::new([0xFF; 8]));
        assert!(close(m.pressure_hpa, 6553.5));
        assert!(close(m.supply_volts, 5.55));
        assert_eq!(m.indoor_humidity_pct, 255);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let payload = Payload::from_hex("0D7FE02D5027941E").unwrap();
        assert_eq!(decode(&payload), decode(&payload));
    }

    #[test]
    fn test_payload_from_hex() {
        let p = Payload::from_hex("0c8a1e3201f43200").unwrap();
        assert_eq!(p.as_bytes(), &[0x0C, 0x8A, 0x1E, 0x32, 0x01, 0xF4, 0x32, 0x00]);
        assert_eq!(p.to_hex(), "0C8A1E3201F43200");

        // Trailing bytes beyond the data field are dropped
        let p = Payload::from_hex("0C8A1E3201F43200AB").unwrap();
        assert_eq!(p.to_hex(), "0C8A1E3201F43200");

        assert!(matches!(
            Payload::from_hex("0C8A1E3201F432"),
            Err(Error::PayloadLength(7))
        ));
        assert!(matches!(
            Payload::from_hex("not hex at all!!"),
            Err(Error::PayloadHex(_))
        ));
    }
}
