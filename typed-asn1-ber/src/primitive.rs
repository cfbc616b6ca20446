//! Primitive types
//!
//! BOOLEAN, INTEGER (fixed width and [`Integer`]), OCTET STRING (byte
//! strings and UTF-8 `String`), OBJECT IDENTIFIER and NULL.

use crate::ber::RawValue;
use crate::context::Context;
use crate::element::Asn1;
use crate::options::FieldOptions;
use bytes::Bytes;
use typed_asn1_core::{tags, Asn1Error, Asn1Result, Integer, Null, Oid};

impl Asn1 for bool {
    const TAG: Option<u32> = Some(tags::BOOLEAN);

    fn decode_content(
        &mut self,
        ctx: &Context,
        raw: &RawValue,
        _opts: &FieldOptions,
    ) -> Asn1Result<()> {
        let content = raw.content.as_slice();
        *self = if ctx.der_decoding() {
            match content {
                [0x00] => false,
                [0xFF] => true,
                _ => {
                    return Err(Asn1Error::parse(format!(
                        "invalid DER boolean: {:02X?}",
                        content
                    )));
                }
            }
        } else {
            if content.is_empty() {
                return Err(Asn1Error::parse("empty boolean"));
            }
            content.iter().any(|&b| b != 0)
        };
        Ok(())
    }

    fn encode_content(&self, _ctx: &Context, _opts: &FieldOptions) -> Asn1Result<Vec<u8>> {
        Ok(vec![if *self { 0xFF } else { 0x00 }])
    }

    fn is_zero(&self) -> bool {
        !*self
    }
}

/// Checks shared by every INTEGER decoder: non-empty content, and in DER
/// no redundant leading `0x00`/`0xFF` octet
fn check_integer(ctx: &Context, content: &[u8]) -> Asn1Result<()> {
    if content.is_empty() {
        return Err(Asn1Error::parse("empty integer"));
    }
    if ctx.der_decoding()
        && content.len() > 1
        && ((content[0] == 0x00 && content[1] & 0x80 == 0)
            || (content[0] == 0xFF && content[1] & 0x80 != 0))
    {
        return Err(Asn1Error::parse("integer not minimally encoded"));
    }
    Ok(())
}

fn parse_signed(ctx: &Context, content: &[u8]) -> Asn1Result<i64> {
    check_integer(ctx, content)?;
    if content.len() > 8 {
        return Err(Asn1Error::parse("integer too large"));
    }
    let mut value: i64 = if content[0] & 0x80 != 0 { -1 } else { 0 };
    for &byte in content {
        value = (value << 8) | i64::from(byte);
    }
    Ok(value)
}

fn parse_unsigned(ctx: &Context, content: &[u8]) -> Asn1Result<u64> {
    check_integer(ctx, content)?;
    if content[0] & 0x80 != 0 {
        return Err(Asn1Error::parse("negative value for an unsigned integer"));
    }
    // a leading zero octet may be needed to keep the value positive
    let digits = if content[0] == 0x00 { &content[1..] } else { content };
    if digits.len() > 8 {
        return Err(Asn1Error::parse("integer too large"));
    }
    Ok(digits.iter().fold(0u64, |value, &byte| (value << 8) | u64::from(byte)))
}

macro_rules! impl_asn1_signed {
    ($($t:ident)*) => {
        $(
            impl Asn1 for $t {
                const TAG: Option<u32> = Some(tags::INTEGER);

                fn decode_content(
                    &mut self,
                    ctx: &Context,
                    raw: &RawValue,
                    _opts: &FieldOptions,
                ) -> Asn1Result<()> {
                    let value = parse_signed(ctx, &raw.content)?;
                    *self = <$t>::try_from(value).map_err(|_| {
                        Asn1Error::parse(format!(
                            "integer {} out of range for {}",
                            value,
                            stringify!($t)
                        ))
                    })?;
                    Ok(())
                }

                fn encode_content(
                    &self,
                    _ctx: &Context,
                    _opts: &FieldOptions,
                ) -> Asn1Result<Vec<u8>> {
                    Ok(Integer::from(i64::from(*self)).to_signed_bytes_be())
                }

                fn is_zero(&self) -> bool {
                    *self == 0
                }

                fn from_default(value: i64) -> Option<Self> {
                    <$t>::try_from(value).ok()
                }

                fn equals_default(&self, value: i64) -> bool {
                    i128::from(*self) == i128::from(value)
                }
            }
        )*
    };
}

macro_rules! impl_asn1_unsigned {
    ($($t:ident)*) => {
        $(
            impl Asn1 for $t {
                const TAG: Option<u32> = Some(tags::INTEGER);

                fn decode_content(
                    &mut self,
                    ctx: &Context,
                    raw: &RawValue,
                    _opts: &FieldOptions,
                ) -> Asn1Result<()> {
                    let value = parse_unsigned(ctx, &raw.content)?;
                    *self = <$t>::try_from(value).map_err(|_| {
                        Asn1Error::parse(format!(
                            "integer {} out of range for {}",
                            value,
                            stringify!($t)
                        ))
                    })?;
                    Ok(())
                }

                fn encode_content(
                    &self,
                    _ctx: &Context,
                    _opts: &FieldOptions,
                ) -> Asn1Result<Vec<u8>> {
                    Ok(Integer::from(u64::from(*self)).to_signed_bytes_be())
                }

                fn is_zero(&self) -> bool {
                    *self == 0
                }

                fn from_default(value: i64) -> Option<Self> {
                    <$t>::try_from(value).ok()
                }

                fn equals_default(&self, value: i64) -> bool {
                    i128::from(*self) == i128::from(value)
                }
            }
        )*
    };
}

// u8 is left out: Vec<u8> and [u8; N] are OCTET STRINGs
impl_asn1_signed!(i8 i16 i32 i64);
impl_asn1_unsigned!(u16 u32 u64);

impl Asn1 for Integer {
    const TAG: Option<u32> = Some(tags::INTEGER);

    fn decode_content(
        &mut self,
        ctx: &Context,
        raw: &RawValue,
        _opts: &FieldOptions,
    ) -> Asn1Result<()> {
        check_integer(ctx, &raw.content)?;
        *self = Integer::from_signed_bytes_be(&raw.content);
        Ok(())
    }

    fn encode_content(&self, _ctx: &Context, _opts: &FieldOptions) -> Asn1Result<Vec<u8>> {
        Ok(self.to_signed_bytes_be())
    }

    fn is_zero(&self) -> bool {
        Integer::is_zero(self)
    }

    fn from_default(value: i64) -> Option<Self> {
        Some(Integer::from(value))
    }

    fn equals_default(&self, value: i64) -> bool {
        self.to_i64() == Some(value)
    }
}

impl Asn1 for Vec<u8> {
    const TAG: Option<u32> = Some(tags::OCTET_STRING);

    fn decode_content(
        &mut self,
        _ctx: &Context,
        raw: &RawValue,
        _opts: &FieldOptions,
    ) -> Asn1Result<()> {
        *self = raw.content.clone();
        Ok(())
    }

    fn encode_content(&self, _ctx: &Context, _opts: &FieldOptions) -> Asn1Result<Vec<u8>> {
        Ok(self.clone())
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<const N: usize> Asn1 for [u8; N] {
    const TAG: Option<u32> = Some(tags::OCTET_STRING);

    fn decode_content(
        &mut self,
        _ctx: &Context,
        raw: &RawValue,
        _opts: &FieldOptions,
    ) -> Asn1Result<()> {
        if raw.content.len() != N {
            return Err(Asn1Error::parse(format!(
                "expected {} octets, found {}",
                N,
                raw.content.len()
            )));
        }
        self.copy_from_slice(&raw.content);
        Ok(())
    }

    fn encode_content(&self, _ctx: &Context, _opts: &FieldOptions) -> Asn1Result<Vec<u8>> {
        Ok(self.to_vec())
    }

    fn is_zero(&self) -> bool {
        self.iter().all(|&b| b == 0)
    }
}

impl Asn1 for Bytes {
    const TAG: Option<u32> = Some(tags::OCTET_STRING);

    fn decode_content(
        &mut self,
        _ctx: &Context,
        raw: &RawValue,
        _opts: &FieldOptions,
    ) -> Asn1Result<()> {
        *self = Bytes::copy_from_slice(&raw.content);
        Ok(())
    }

    fn encode_content(&self, _ctx: &Context, _opts: &FieldOptions) -> Asn1Result<Vec<u8>> {
        Ok(self.to_vec())
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl Asn1 for String {
    const TAG: Option<u32> = Some(tags::OCTET_STRING);

    fn decode_content(
        &mut self,
        _ctx: &Context,
        raw: &RawValue,
        _opts: &FieldOptions,
    ) -> Asn1Result<()> {
        *self = String::from_utf8(raw.content.clone())
            .map_err(|e| Asn1Error::parse(format!("invalid UTF-8 string: {}", e)))?;
        Ok(())
    }

    fn encode_content(&self, _ctx: &Context, _opts: &FieldOptions) -> Asn1Result<Vec<u8>> {
        Ok(self.as_bytes().to_vec())
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

/// Read one base-128 subidentifier, returning it and the octets used
fn read_subidentifier(ctx: &Context, data: &[u8]) -> Asn1Result<(u64, usize)> {
    if ctx.der_decoding() && data.first() == Some(&0x80) {
        return Err(Asn1Error::parse(
            "object identifier subidentifier not minimally encoded",
        ));
    }
    let mut value = 0u64;
    for (i, &byte) in data.iter().enumerate() {
        if value > (u64::MAX >> 7) {
            return Err(Asn1Error::parse("object identifier subidentifier too large"));
        }
        value = (value << 7) | u64::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(Asn1Error::parse("truncated object identifier"))
}

fn write_subidentifier(out: &mut Vec<u8>, mut value: u64) {
    let mut groups = [0u8; 10];
    let mut count = 0;
    loop {
        groups[count] = (value & 0x7F) as u8;
        count += 1;
        value >>= 7;
        if value == 0 {
            break;
        }
    }
    for i in (0..count).rev() {
        out.push(if i > 0 { groups[i] | 0x80 } else { groups[i] });
    }
}

impl Asn1 for Oid {
    const TAG: Option<u32> = Some(tags::OBJECT_IDENTIFIER);

    fn decode_content(
        &mut self,
        ctx: &Context,
        raw: &RawValue,
        _opts: &FieldOptions,
    ) -> Asn1Result<()> {
        let content = raw.content.as_slice();
        let mut arcs = Vec::new();
        let mut pos = 0;
        while pos < content.len() {
            let (value, used) = read_subidentifier(ctx, &content[pos..])?;
            if arcs.is_empty() {
                // the first subidentifier packs the first two arcs as 40 * x + y
                match value {
                    0..=39 => arcs.extend([0, value]),
                    40..=79 => arcs.extend([1, value - 40]),
                    _ => arcs.extend([2, value - 80]),
                }
            } else {
                arcs.push(value);
            }
            pos += used;
        }
        *self = Oid::new(arcs);
        Ok(())
    }

    fn encode_content(&self, _ctx: &Context, _opts: &FieldOptions) -> Asn1Result<Vec<u8>> {
        let arcs = self.arcs();
        match arcs {
            [] => Ok(Vec::new()),
            [_] => Err(Asn1Error::encode(format!(
                "object identifier {} needs at least two arcs",
                self
            ))),
            [first, second, rest @ ..] => {
                if *first > 2 || (*first < 2 && *second >= 40) {
                    return Err(Asn1Error::encode(format!("invalid object identifier {}", self)));
                }
                let head = (first * 40).checked_add(*second).ok_or_else(|| {
                    Asn1Error::encode(format!("object identifier {} arc too large", self))
                })?;

                let mut out = Vec::with_capacity(arcs.len() * 2);
                write_subidentifier(&mut out, head);
                for &arc in rest {
                    write_subidentifier(&mut out, arc);
                }
                Ok(out)
            }
        }
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl Asn1 for Null {
    const TAG: Option<u32> = Some(tags::NULL);

    fn decode_content(
        &mut self,
        _ctx: &Context,
        raw: &RawValue,
        _opts: &FieldOptions,
    ) -> Asn1Result<()> {
        if !raw.content.is_empty() {
            return Err(Asn1Error::parse("NULL with non-empty content"));
        }
        Ok(())
    }

    fn encode_content(&self, _ctx: &Context, _opts: &FieldOptions) -> Asn1Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn der() -> Context {
        Context::new()
    }

    fn ber() -> Context {
        let mut ctx = Context::new();
        ctx.set_der(false, false);
        ctx
    }

    #[test]
    fn test_boolean_der_and_ber() {
        assert_eq!(der().decode_value::<bool>(&[0x01, 0x01, 0xFF]).unwrap().0, true);
        assert_eq!(der().decode_value::<bool>(&[0x01, 0x01, 0x00]).unwrap().0, false);
        assert!(der().decode_value::<bool>(&[0x01, 0x01, 0x01]).unwrap_err().is_parse());
        assert!(der().decode_value::<bool>(&[0x01, 0x02, 0xFF, 0xFF]).is_err());

        assert_eq!(ber().decode_value::<bool>(&[0x01, 0x01, 0x01]).unwrap().0, true);
        assert_eq!(ber().decode_value::<bool>(&[0x01, 0x02, 0x00, 0x00]).unwrap().0, false);
        assert!(ber().decode_value::<bool>(&[0x01, 0x00]).is_err());

        assert_eq!(der().encode(&true).unwrap(), vec![0x01, 0x01, 0xFF]);
    }

    #[test]
    fn test_integer_canonical_form() {
        // 00 7F is a redundant leading octet
        assert!(der().decode_value::<i32>(&[0x02, 0x02, 0x00, 0x7F]).unwrap_err().is_parse());
        assert_eq!(ber().decode_value::<i32>(&[0x02, 0x02, 0x00, 0x7F]).unwrap().0, 127);
        // 00 80 is +128, too large for i8 in both modes
        assert_eq!(der().decode_value::<i16>(&[0x02, 0x02, 0x00, 0x80]).unwrap().0, 128);
        assert!(der().decode_value::<i8>(&[0x02, 0x02, 0x00, 0x80]).is_err());
        assert!(ber().decode_value::<i8>(&[0x02, 0x02, 0x00, 0x80]).is_err());
        assert!(der().decode_value::<i64>(&[0x02, 0x02, 0xFF, 0x80]).is_err());
        assert!(der().decode_value::<i64>(&[0x02, 0x00]).is_err());
    }

    #[test]
    fn test_signed_values() {
        let ctx = der();
        assert_eq!(ctx.decode_value::<i8>(&[0x02, 0x01, 0x80]).unwrap().0, -128);
        assert_eq!(ctx.decode_value::<i64>(&[0x02, 0x02, 0xFF, 0x7F]).unwrap().0, -129);
        assert_eq!(
            ctx.decode_value::<i64>(&[0x02, 0x08, 0x80, 0, 0, 0, 0, 0, 0, 0]).unwrap().0,
            i64::MIN
        );
        assert!(ctx.decode_value::<i64>(&[0x02, 0x09, 0x01, 0, 0, 0, 0, 0, 0, 0, 0]).is_err());

        assert_eq!(ctx.encode(&0i32).unwrap(), vec![0x02, 0x01, 0x00]);
        assert_eq!(ctx.encode(&128i32).unwrap(), vec![0x02, 0x02, 0x00, 0x80]);
        assert_eq!(ctx.encode(&-129i64).unwrap(), vec![0x02, 0x02, 0xFF, 0x7F]);
    }

    #[test]
    fn test_unsigned_values() {
        let ctx = der();
        let max = [0x02, 0x09, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        assert_eq!(ctx.decode_value::<u64>(&max).unwrap().0, u64::MAX);
        assert_eq!(ctx.encode(&u64::MAX).unwrap(), max.to_vec());
        assert!(ctx.decode_value::<u64>(&[0x02, 0x01, 0xFF]).unwrap_err().is_parse());
        assert!(ctx.decode_value::<u16>(&[0x02, 0x03, 0x01, 0x00, 0x00]).is_err());
        assert_eq!(ctx.decode_value::<u16>(&[0x02, 0x02, 0x01, 0x00]).unwrap().0, 256);
    }

    #[test]
    fn test_big_integer() {
        let ctx = der();
        let data = [0x02, 0x0A, 0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let (value, _) = ctx.decode_value::<Integer>(&data).unwrap();
        assert_eq!(value.to_i128(), Some(1 << 72));
        assert_eq!(ctx.encode(&value).unwrap(), data.to_vec());
        assert!(ctx.decode_value::<Integer>(&[0x02, 0x02, 0x00, 0x01]).is_err());
        assert!(ctx.decode_value::<Integer>(&[0x02, 0x00]).is_err());
    }

    #[test]
    fn test_octet_strings() {
        let ctx = der();
        let data = [0x04, 0x03, 0x01, 0x02, 0x03];
        assert_eq!(ctx.decode_value::<Vec<u8>>(&data).unwrap().0, vec![1, 2, 3]);
        assert_eq!(ctx.decode_value::<[u8; 3]>(&data).unwrap().0, [1, 2, 3]);
        assert!(ctx.decode_value::<[u8; 4]>(&data).unwrap_err().is_parse());
        assert_eq!(
            ctx.decode_value::<Bytes>(&data).unwrap().0,
            Bytes::from_static(&[1, 2, 3])
        );
        assert_eq!(ctx.encode(&[1u8, 2, 3]).unwrap(), data.to_vec());
    }

    #[test]
    fn test_string_utf8() {
        let ctx = der();
        let data = [0x04, 0x02, 0xC3, 0xA9];
        assert_eq!(ctx.decode_value::<String>(&data).unwrap().0, "é");
        assert!(ctx.decode_value::<String>(&[0x04, 0x01, 0xFF]).unwrap_err().is_parse());
        assert_eq!(ctx.encode(&String::from("é")).unwrap(), data.to_vec());
    }

    #[test]
    fn test_oid_decode() {
        let ctx = der();
        assert_eq!(
            ctx.decode_value::<Oid>(&[0x06, 0x02, 0x2A, 0x03]).unwrap().0,
            Oid::new(vec![1, 2, 3])
        );
        // 2.999.3
        assert_eq!(
            ctx.decode_value::<Oid>(&[0x06, 0x03, 0x88, 0x37, 0x03]).unwrap().0,
            Oid::new(vec![2, 999, 3])
        );
        assert!(ctx.decode_value::<Oid>(&[0x06, 0x00]).unwrap().0.is_empty());
        assert!(ctx.decode_value::<Oid>(&[0x06, 0x02, 0x2A, 0x83]).unwrap_err().is_parse());
        assert!(ctx.decode_value::<Oid>(&[0x06, 0x03, 0x2A, 0x80, 0x03]).is_err());
        assert_eq!(
            ber().decode_value::<Oid>(&[0x06, 0x03, 0x2A, 0x80, 0x03]).unwrap().0,
            Oid::new(vec![1, 2, 3])
        );
    }

    #[test]
    fn test_oid_encode() {
        let ctx = der();
        let rsa: Oid = "1.2.840.113549".parse().unwrap();
        assert_eq!(
            ctx.encode(&rsa).unwrap(),
            vec![0x06, 0x06, 0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D]
        );
        assert_eq!(ctx.encode(&Oid::default()).unwrap(), vec![0x06, 0x00]);
        assert!(ctx.encode(&Oid::new(vec![1])).unwrap_err().is_encode());
        assert!(ctx.encode(&Oid::new(vec![3, 1])).is_err());
        assert!(ctx.encode(&Oid::new(vec![1, 40])).is_err());
        assert!(ctx.encode(&Oid::new(vec![2, 40])).is_ok());
    }

    #[test]
    fn test_null() {
        let ctx = der();
        assert_eq!(ctx.decode_value::<Null>(&[0x05, 0x00]).unwrap().0, Null);
        assert!(ctx.decode_value::<Null>(&[0x05, 0x01, 0x00]).unwrap_err().is_parse());
        assert_eq!(ctx.encode(&Null).unwrap(), vec![0x05, 0x00]);
    }
}
