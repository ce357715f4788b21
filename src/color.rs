//! RGB555 hardware color conversion
//!
//! The hardware stores palette entries as 15-bit BGR values. One value,
//! `COLORKEY_15BIT`, is reserved as the "blank" color and round-trips to a
//! fully transparent magenta on the editing side.

use image::Rgba;

/// Transparent "blank color" on the editing side.
pub const COLORKEY: Rgba<u8> = Rgba([255, 0, 255, 0]);

/// The 15-bit value reserved for the blank color.
pub const COLORKEY_15BIT: u16 = 0x7C1F;

/// Convert a 15-bit hardware color to RGBA.
///
/// The 5-bit channels are rescaled to 8 bits. `COLORKEY_15BIT` decodes to
/// the transparent [`COLORKEY`]; everything else is opaque.
pub fn decode_15bit(value: u16) -> Rgba<u8> {
    if value == COLORKEY_15BIT {
        return COLORKEY;
    }

    let r = (value & 0x1f) as u32;
    let g = ((value >> 5) & 0x1f) as u32;
    let b = ((value >> 10) & 0x1f) as u32;
    // remap from 5 to 8 bit
    let r = (r * 0xff / 0x1f) as u8;
    let g = (g * 0xff / 0x1f) as u8;
    let b = (b * 0xff / 0x1f) as u8;
    Rgba([r, g, b, 0xff])
}

/// Convert an RGBA color to its 15-bit hardware form.
///
/// Any fully transparent color encodes as `COLORKEY_15BIT`; the low 3 bits
/// of each channel are dropped.
pub fn encode_15bit(color: Rgba<u8>) -> u16 {
    let Rgba([r, g, b, a]) = color;
    if a == 0 {
        return COLORKEY_15BIT;
    }

    let r = (r >> 3) as u16;
    let g = (g >> 3) as u16;
    let b = (b >> 3) as u16;
    r | (g << 5) | (b << 10)
}

/// Decode a whole palette of 15-bit values.
pub fn decode_palette(values: &[u16]) -> Vec<Rgba<u8>> {
    values.iter().map(|&v| decode_15bit(v)).collect()
}

/// Encode a whole palette to 15-bit values.
pub fn encode_palette(colors: &[Rgba<u8>]) -> Vec<u16> {
    colors.iter().map(|&c| encode_15bit(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colorkey_roundtrip() {
        assert_eq!(encode_15bit(COLORKEY), COLORKEY_15BIT);
        assert_eq!(decode_15bit(COLORKEY_15BIT), COLORKEY);
    }

    #[test]
    fn test_transparent_always_colorkey() {
        assert_eq!(encode_15bit(Rgba([10, 20, 30, 0])), COLORKEY_15BIT);
    }

    #[test]
    fn test_encode_drops_low_bits() {
        let a = encode_15bit(Rgba([0xf8, 0x00, 0x00, 0xff]));
        let b = encode_15bit(Rgba([0xff, 0x07, 0x07, 0xff]));
        assert_eq!(a, b);
        assert_eq!(a, 0x001f);
    }

    #[test]
    fn test_decode_scales_channels() {
        assert_eq!(decode_15bit(0x001f), Rgba([255, 0, 0, 255]));
        assert_eq!(decode_15bit(0x03e0), Rgba([0, 255, 0, 255]));
        assert_eq!(decode_15bit(0x7c00), Rgba([0, 0, 255, 255]));
        assert_eq!(decode_15bit(0x0000), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_all_15bit_values_stable() {
        // encode(decode(v)) must reproduce v for every 15-bit value
        for v in 0..0x8000u16 {
            assert_eq!(encode_15bit(decode_15bit(v)), v);
        }
    }
}
