//! Tag resolution and single element decoding/encoding
//!
//! Every Rust type that can be carried in an ASN.1 element implements
//! [`Asn1`]. The trait names the type's default universal tag and knows
//! how to interpret content bytes; everything related to tags (implicit
//! and explicit tagging, SET, CHOICE lookup) is handled here, in one
//! place, from the type's tag and the field directives.

use crate::ber::raw::tag_label;
use crate::ber::{RawValue, TagClass};
use crate::choice::ChoiceValue;
use crate::context::{ChoiceEntry, Context};
use crate::options::FieldOptions;
use log::trace;
use std::any::{type_name, TypeId};
use std::collections::HashSet;
use typed_asn1_core::{tags, Asn1Error, Asn1Result};

/// A Rust type mapped onto an ASN.1 element
///
/// Implementations exist for `bool`, the signed and unsigned integer
/// types, [`Integer`](typed_asn1_core::Integer), `String`, byte strings
/// (`Vec<u8>`, `[u8; N]`, `Bytes`), [`Oid`](typed_asn1_core::Oid),
/// [`Null`](typed_asn1_core::Null), `Vec<T>` and `[T; N]` (SEQUENCE OF),
/// `Option<T>`, `Box<T>`, [`Choice`](crate::Choice) and every struct
/// declared through [`asn1_struct!`](crate::asn1_struct).
pub trait Asn1: Sized + 'static {
    /// Universal tag number of the type, `None` for types that can only
    /// be resolved through a choice group
    const TAG: Option<u32>;

    /// Whether the natural encoding of the type is constructed
    const CONSTRUCTED: bool = false;

    /// Interpret the content of an element whose tag was already checked
    fn decode_content(
        &mut self,
        ctx: &Context,
        raw: &RawValue,
        opts: &FieldOptions,
    ) -> Asn1Result<()>;

    /// Produce the content bytes of the element
    fn encode_content(&self, ctx: &Context, opts: &FieldOptions) -> Asn1Result<Vec<u8>>;

    /// Absent values are left out of an enclosing SEQUENCE or SET
    fn is_absent(&self) -> bool {
        false
    }

    /// Zero value test, `optional` members holding it are not encoded
    fn is_zero(&self) -> bool {
        false
    }

    /// Whether a missing element is acceptable without an `optional`
    /// directive
    fn optional_by_type() -> bool {
        false
    }

    /// Value for a `default:<n>` directive, `None` if the type does not
    /// take integer defaults or `value` is out of range
    fn from_default(_value: i64) -> Option<Self> {
        None
    }

    fn equals_default(&self, _value: i64) -> bool {
        false
    }

    /// Check the type definition under the given directives without
    /// looking at any input
    fn validate(_ctx: &Context, _opts: &FieldOptions, _visited: &mut Visited) -> Asn1Result<()> {
        Ok(())
    }

    /// Store a decoded choice alternative
    fn set_choice(&mut self, _value: Box<dyn ChoiceValue>) -> Asn1Result<()> {
        Err(Asn1Error::syntax(format!(
            "type {} can not hold a choice value",
            type_name::<Self>()
        )))
    }

    /// Currently held choice alternative
    fn choice_value(&self) -> Option<&dyn ChoiceValue> {
        None
    }
}

/// Struct definitions already checked in one validation pass
///
/// Keyed by type and SET/SEQUENCE form, so recursive types are checked
/// once.
#[derive(Debug, Default)]
pub struct Visited(HashSet<(TypeId, bool)>);

impl Visited {
    /// Record `T` under `set`, `false` if it was already checked
    pub fn insert<T: 'static>(&mut self, set: bool) -> bool {
        self.0.insert((TypeId::of::<T>(), set))
    }
}

/// Class, number and form of an expected element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementTag {
    pub class: TagClass,
    pub tag: u32,
    pub constructed: bool,
}

/// Outcome of resolving a type and its directives
#[derive(Debug, Clone, Copy)]
pub enum Resolved<'c> {
    /// A single expected tag
    Element(ElementTag),
    /// Any of the alternatives of a registered choice group
    Choice {
        name: &'c str,
        entries: &'c [ChoiceEntry],
    },
}

/// Resolve the expected tag of `T` under `opts`, ignoring `choice`
///
/// 1. the type's universal tag
/// 2. `set` turns SEQUENCE into SET
/// 3. `tag:<n>` overrides number and class
/// 4. `explicit` makes the element constructed
pub fn resolve_tag<T: Asn1>(opts: &FieldOptions) -> Asn1Result<ElementTag> {
    let mut class = TagClass::Universal;
    let mut constructed = T::CONSTRUCTED;

    let mut tag = match T::TAG {
        Some(tag) => tag,
        // the inner element resolves the choice, only the outer tag is needed
        None if opts.explicit && opts.choice.is_some() => 0,
        None => {
            return Err(Asn1Error::syntax(format!(
                "unsupported type: {}",
                type_name::<T>()
            )));
        }
    };

    if opts.set {
        if T::TAG != Some(tags::SEQUENCE) {
            return Err(Asn1Error::syntax(format!(
                "set is only valid on SEQUENCE types, not {}",
                type_name::<T>()
            )));
        }
        tag = tags::SET;
    }

    if let Some(number) = opts.tag {
        class = if opts.universal {
            TagClass::Universal
        } else if opts.application {
            TagClass::Application
        } else {
            TagClass::ContextSpecific
        };
        tag = number;
    }

    if opts.explicit {
        constructed = true;
    }

    if opts.indefinite && !constructed {
        return Err(Asn1Error::syntax(format!(
            "indefinite length is not valid on primitive type {}",
            type_name::<T>()
        )));
    }

    Ok(ElementTag {
        class,
        tag,
        constructed,
    })
}

/// Resolve the expected element(s) of `T` under `opts`
///
/// A `choice` directive selects the registered group, unless `explicit`
/// is set too: the explicit tag then takes precedence and the choice is
/// resolved on the inner element.
pub fn resolve<'c, T: Asn1>(ctx: &'c Context, opts: &FieldOptions) -> Asn1Result<Resolved<'c>> {
    if let Some(name) = opts.choice.as_deref() {
        let (name, entries) = ctx.choice_group(name)?;
        if !opts.explicit {
            return Ok(Resolved::Choice { name, entries });
        }
    }
    resolve_tag::<T>(opts).map(Resolved::Element)
}

/// Decode one raw value into `target`
///
/// # Error Handling
/// Returns a parse error if:
/// - The raw tag does not match the expected tag
/// - No alternative of a choice group matches the raw tag
/// - An explicit wrapper does not hold exactly one element
/// - The form (primitive/constructed) does not match the type
/// - The content is invalid for the type
pub fn decode_element<T: Asn1>(
    ctx: &Context,
    raw: &RawValue,
    opts: &FieldOptions,
    target: &mut T,
) -> Asn1Result<()> {
    match resolve::<T>(ctx, opts)? {
        Resolved::Choice { name, entries } => {
            let entry = entries
                .iter()
                .find(|entry| entry.matches(raw.class, raw.tag))
                .ok_or_else(|| {
                    Asn1Error::parse(format!(
                        "no alternative of choice {:?} matches {}",
                        name,
                        raw.label()
                    ))
                })?;
            trace!(
                "choice {:?}: {} resolved to {}",
                name,
                raw.label(),
                entry.type_name()
            );
            let value = entry.decode(ctx, raw)?;
            target.set_choice(value)
        }
        Resolved::Element(expected) => {
            if raw.class != expected.class || raw.tag != expected.tag {
                return Err(Asn1Error::parse(format!(
                    "expected {} but found {}",
                    tag_label(expected.class, expected.tag),
                    raw.label()
                )));
            }

            if opts.explicit {
                if !raw.constructed {
                    return Err(Asn1Error::parse(format!(
                        "explicit tag {} must be constructed",
                        raw.label()
                    )));
                }
                let mut nested = ctx.read_nested(raw)?;
                let (Some(inner), true) = (nested.pop(), nested.is_empty()) else {
                    return Err(Asn1Error::parse(format!(
                        "explicit tag {} must hold exactly one element",
                        raw.label()
                    )));
                };
                return decode_element(ctx, &inner, &opts.without_explicit(), target);
            }

            if raw.constructed != T::CONSTRUCTED {
                return Err(Asn1Error::parse(format!(
                    "{} has the wrong form for {}: constructed={}",
                    raw.label(),
                    type_name::<T>(),
                    raw.constructed
                )));
            }

            target.decode_content(ctx, raw, opts)
        }
    }
}

/// Encode `value` as one raw value
pub fn encode_element<T: Asn1>(
    ctx: &Context,
    value: &T,
    opts: &FieldOptions,
) -> Asn1Result<RawValue> {
    match resolve::<T>(ctx, opts)? {
        Resolved::Choice { name, entries } => {
            let held = value
                .choice_value()
                .ok_or_else(|| Asn1Error::encode(format!("choice {:?} holds no value", name)))?;
            let entry = entries
                .iter()
                .find(|entry| entry.value_type() == held.value_type_id())
                .ok_or_else(|| {
                    Asn1Error::encode(format!(
                        "{} is not an alternative of choice {:?}",
                        held.value_type_name(),
                        name
                    ))
                })?;
            entry.encode(ctx, held)
        }
        Resolved::Element(element) => {
            if opts.indefinite && ctx.der_encoding() {
                return Err(Asn1Error::syntax("indefinite length is not allowed in DER"));
            }

            let content = if opts.explicit {
                encode_element(ctx, value, &opts.without_explicit())?.to_bytes()
            } else {
                value.encode_content(ctx, opts)?
            };

            Ok(RawValue {
                class: element.class,
                tag: element.tag,
                constructed: element.constructed,
                indefinite: opts.indefinite,
                content,
                depth: 0,
            })
        }
    }
}

/// Encode a member of a SEQUENCE or SET, `None` if it is left out
///
/// Members are left out when absent, when `optional` and holding the
/// zero value, or when equal to their `default`.
pub fn encode_member<T: Asn1>(
    ctx: &Context,
    value: &T,
    opts: &FieldOptions,
) -> Asn1Result<Option<RawValue>> {
    if value.is_absent() {
        return Ok(None);
    }
    if opts.optional && value.is_zero() {
        return Ok(None);
    }
    if let Some(default) = opts.default_value {
        if value.equals_default(default) {
            return Ok(None);
        }
    }
    encode_element(ctx, value, opts).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use typed_asn1_core::Oid;

    fn opts(s: &str) -> FieldOptions {
        FieldOptions::parse(s).unwrap()
    }

    #[test]
    fn test_resolve_universal_tags() {
        let tag = resolve_tag::<bool>(&opts("")).unwrap();
        assert_eq!((tag.class, tag.tag, tag.constructed), (TagClass::Universal, 1, false));
        assert_eq!(resolve_tag::<i32>(&opts("")).unwrap().tag, tags::INTEGER);
        assert_eq!(resolve_tag::<String>(&opts("")).unwrap().tag, tags::OCTET_STRING);
        assert_eq!(resolve_tag::<Vec<u8>>(&opts("")).unwrap().tag, tags::OCTET_STRING);
        assert_eq!(resolve_tag::<Oid>(&opts("")).unwrap().tag, tags::OBJECT_IDENTIFIER);

        let seq = resolve_tag::<Vec<i64>>(&opts("")).unwrap();
        assert_eq!((seq.tag, seq.constructed), (tags::SEQUENCE, true));
    }

    #[test]
    fn test_resolve_overrides() {
        let tag = resolve_tag::<i64>(&opts("tag:5")).unwrap();
        assert_eq!((tag.class, tag.tag), (TagClass::ContextSpecific, 5));

        let tag = resolve_tag::<i64>(&opts("application,tag:5")).unwrap();
        assert_eq!(tag.class, TagClass::Application);

        let tag = resolve_tag::<i64>(&opts("universal,tag:10")).unwrap();
        assert_eq!((tag.class, tag.tag), (TagClass::Universal, 10));

        let tag = resolve_tag::<i64>(&opts("explicit,tag:0")).unwrap();
        assert!(tag.constructed);

        let tag = resolve_tag::<Vec<i64>>(&opts("set")).unwrap();
        assert_eq!(tag.tag, tags::SET);
    }

    #[test]
    fn test_resolve_invalid_combinations() {
        assert!(resolve_tag::<i64>(&opts("set")).unwrap_err().is_syntax());
        assert!(resolve_tag::<Vec<u8>>(&opts("set")).unwrap_err().is_syntax());
        assert!(resolve_tag::<bool>(&opts("indefinite")).unwrap_err().is_syntax());
        assert!(resolve_tag::<crate::Choice>(&opts("")).unwrap_err().is_syntax());
        assert!(resolve_tag::<Vec<i64>>(&opts("indefinite")).is_ok());
    }

    #[test]
    fn test_decode_element_tag_mismatch() {
        let ctx = Context::new();
        let raw = RawValue::new(TagClass::Universal, tags::BOOLEAN, false, vec![0xFF]);
        let mut value = 0i64;
        let err = decode_element(&ctx, &raw, &opts(""), &mut value).unwrap_err();
        assert!(err.is_parse());
        assert!(err.to_string().contains("expected [universal 2]"));
    }

    #[test]
    fn test_decode_element_explicit() {
        let ctx = Context::new();
        // [1] EXPLICIT INTEGER 7
        let raw = RawValue::new(TagClass::ContextSpecific, 1, true, vec![0x02, 0x01, 0x07]);
        let mut value = 0i32;
        decode_element(&ctx, &raw, &opts("explicit,tag:1"), &mut value).unwrap();
        assert_eq!(value, 7);

        let trailing =
            RawValue::new(TagClass::ContextSpecific, 1, true, vec![0x02, 0x01, 0x07, 0x05, 0x00]);
        assert!(decode_element(&ctx, &trailing, &opts("explicit,tag:1"), &mut value).is_err());
    }

    #[test]
    fn test_decode_element_wrong_form() {
        let ctx = Context::new();
        let raw = RawValue::new(TagClass::Universal, tags::INTEGER, true, vec![0x02, 0x01, 0x07]);
        let mut value = 0i32;
        assert!(decode_element(&ctx, &raw, &opts(""), &mut value).unwrap_err().is_parse());
    }

    #[test]
    fn test_encode_element_explicit_and_implicit() {
        let ctx = Context::new();
        let raw = encode_element(&ctx, &5i32, &opts("explicit,tag:2")).unwrap();
        assert_eq!(raw.to_bytes(), vec![0xA2, 0x03, 0x02, 0x01, 0x05]);

        let raw = encode_element(&ctx, &5i32, &opts("tag:2")).unwrap();
        assert_eq!(raw.to_bytes(), vec![0x82, 0x01, 0x05]);
    }

    #[test]
    fn test_encode_member_omissions() {
        let ctx = Context::new();
        assert!(encode_member(&ctx, &0i32, &opts("optional")).unwrap().is_none());
        assert!(encode_member(&ctx, &3i32, &opts("default:3")).unwrap().is_none());
        assert!(encode_member(&ctx, &None::<i32>, &opts("")).unwrap().is_none());
        assert!(encode_member(&ctx, &4i32, &opts("default:3")).unwrap().is_some());
    }

    #[test]
    fn test_encode_indefinite_requires_ber() {
        let mut ctx = Context::new();
        let values = vec![1i64];
        assert!(encode_element(&ctx, &values, &opts("indefinite")).unwrap_err().is_syntax());

        ctx.set_der(false, false);
        let raw = encode_element(&ctx, &values, &opts("indefinite")).unwrap();
        assert_eq!(raw.to_bytes(), vec![0x30, 0x80, 0x02, 0x01, 0x01, 0x00, 0x00]);
    }
}
