//! Decoding/encoding context
//!
//! The [`Context`] carries the encoding rules of each direction and the
//! registry of choice groups. Choices are registered up front; the first
//! decode or encode call seals the context and from then on it is only
//! read, so one context can be shared between threads.

use crate::ber::raw::{tag_label, MAX_NESTING_DEPTH};
use crate::ber::{RawValue, TagClass};
use crate::choice::{ChoiceAlternative, ChoiceValue};
use crate::config::ContextConfig;
use crate::element::{decode_element, encode_element, resolve, Asn1, Visited};
use crate::options::FieldOptions;
use log::debug;
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use typed_asn1_core::{Asn1Error, Asn1Result, EncodingRules};

type DecodeFn = fn(&Context, &RawValue, &FieldOptions) -> Asn1Result<Box<dyn ChoiceValue>>;
type EncodeFn = fn(&Context, &dyn ChoiceValue, &FieldOptions) -> Asn1Result<RawValue>;

/// A registered choice alternative with its resolved tag
pub struct ChoiceEntry {
    class: TagClass,
    tag: u32,
    options: FieldOptions,
    type_id: TypeId,
    type_name: &'static str,
    decode: DecodeFn,
    encode: EncodeFn,
}

impl ChoiceEntry {
    pub fn class(&self) -> TagClass {
        self.class
    }

    pub fn tag(&self) -> u32 {
        self.tag
    }

    pub fn options(&self) -> &FieldOptions {
        &self.options
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn value_type(&self) -> TypeId {
        self.type_id
    }

    pub(crate) fn matches(&self, class: TagClass, tag: u32) -> bool {
        self.class == class && self.tag == tag
    }

    pub(crate) fn decode(&self, ctx: &Context, raw: &RawValue) -> Asn1Result<Box<dyn ChoiceValue>> {
        (self.decode)(ctx, raw, &self.options)
    }

    pub(crate) fn encode(&self, ctx: &Context, value: &dyn ChoiceValue) -> Asn1Result<RawValue> {
        (self.encode)(ctx, value, &self.options)
    }
}

impl fmt::Debug for ChoiceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChoiceEntry")
            .field("tag", &tag_label(self.class, self.tag))
            .field("type", &self.type_name)
            .field("options", &self.options)
            .finish()
    }
}

/// Decoding/encoding context
///
/// # Usage Example
/// ```ignore
/// let mut ctx = Context::new();
/// ctx.add_choice("value", vec![
///     ChoiceAlternative::of::<i64>("tag:0"),
///     ChoiceAlternative::of::<String>("tag:1"),
/// ])?;
///
/// let mut message = Message::default();
/// let rest = ctx.decode(&data, &mut message)?;
/// let encoded = ctx.encode(&message)?;
/// ```
#[derive(Debug, Default)]
pub struct Context {
    config: ContextConfig,
    choices: HashMap<String, Vec<ChoiceEntry>>,
    sealed: AtomicBool,
}

impl Context {
    /// Create a context using DER in both directions
    pub fn new() -> Self {
        Self::with_config(ContextConfig::default())
    }

    pub fn with_config(config: ContextConfig) -> Self {
        Self {
            config,
            choices: HashMap::new(),
            sealed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Select DER (`true`) or BER (`false`) per direction
    pub fn set_der(&mut self, encoding: bool, decoding: bool) {
        self.config.encoding = EncodingRules::from_der(encoding);
        self.config.decoding = EncodingRules::from_der(decoding);
    }

    pub fn der_encoding(&self) -> bool {
        self.config.encoding.is_der()
    }

    pub fn der_decoding(&self) -> bool {
        self.config.decoding.is_der()
    }

    /// Whether a decode or encode call already happened
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    /// Register a choice group
    ///
    /// # Error Handling
    /// Returns `Asn1Error::Syntax` if:
    /// - The context is sealed
    /// - The name is empty or already registered
    /// - The group has no alternatives
    /// - An alternative has invalid directives or is itself a choice
    /// - Two alternatives share a tag or a type
    pub fn add_choice(
        &mut self,
        name: &str,
        alternatives: Vec<ChoiceAlternative>,
    ) -> Asn1Result<()> {
        if self.is_sealed() {
            return Err(Asn1Error::syntax(format!(
                "can not register choice {:?}: context already in use",
                name
            )));
        }
        if name.is_empty() {
            return Err(Asn1Error::syntax("choice name must not be empty"));
        }
        if self.choices.contains_key(name) {
            return Err(Asn1Error::syntax(format!("choice {:?} already registered", name)));
        }
        if alternatives.is_empty() {
            return Err(Asn1Error::syntax(format!("choice {:?} has no alternatives", name)));
        }

        let mut entries: Vec<ChoiceEntry> = Vec::with_capacity(alternatives.len());
        for alternative in alternatives {
            let options = FieldOptions::parse(&alternative.options).map_err(|e| {
                Asn1Error::syntax(format!(
                    "choice {:?}, alternative {}: {}",
                    name, alternative.type_name, e
                ))
            })?;
            if options.choice.is_some() {
                return Err(Asn1Error::syntax(format!(
                    "choice {:?}: nested choices are not supported",
                    name
                )));
            }
            let element = (alternative.tag_of)(&options).map_err(|e| {
                Asn1Error::syntax(format!(
                    "choice {:?}, alternative {}: {}",
                    name, alternative.type_name, e
                ))
            })?;

            if let Some(other) = entries.iter().find(|e| e.matches(element.class, element.tag)) {
                return Err(Asn1Error::syntax(format!(
                    "choice {:?}: {} and {} share the tag {}",
                    name,
                    other.type_name,
                    alternative.type_name,
                    tag_label(element.class, element.tag)
                )));
            }
            if entries.iter().any(|e| e.type_id == alternative.type_id) {
                return Err(Asn1Error::syntax(format!(
                    "choice {:?}: type {} used by more than one alternative",
                    name, alternative.type_name
                )));
            }

            entries.push(ChoiceEntry {
                class: element.class,
                tag: element.tag,
                options,
                type_id: alternative.type_id,
                type_name: alternative.type_name,
                decode: alternative.decode,
                encode: alternative.encode,
            });
        }

        debug!("registered choice {:?} with {} alternatives", name, entries.len());
        self.choices.insert(name.to_string(), entries);
        Ok(())
    }

    /// Look up a registered choice group
    pub fn choice_group(&self, name: &str) -> Asn1Result<(&str, &[ChoiceEntry])> {
        self.choices
            .get_key_value(name)
            .map(|(name, entries)| (name.as_str(), entries.as_slice()))
            .ok_or_else(|| Asn1Error::syntax(format!("choice {:?} is not registered", name)))
    }

    /// Read one raw value under the decoding rules
    pub fn read_raw(&self, data: &[u8]) -> Asn1Result<(RawValue, usize)> {
        let (raw, used) = RawValue::read(data)?;
        if raw.indefinite && self.der_decoding() {
            return Err(Asn1Error::parse(format!(
                "indefinite length of {} is not allowed in DER",
                raw.label()
            )));
        }
        Ok((raw, used))
    }

    /// Split `data` into raw values under the decoding rules
    pub fn read_all(&self, mut data: &[u8]) -> Asn1Result<Vec<RawValue>> {
        let mut values = Vec::new();
        while !data.is_empty() {
            let (raw, used) = self.read_raw(data)?;
            values.push(raw);
            data = &data[used..];
        }
        Ok(values)
    }

    /// Read the elements held in the content of a constructed value
    ///
    /// # Error Handling
    /// Returns a parse error if `parent` is nested too deep, or if its
    /// content does not split into whole elements.
    pub fn read_nested(&self, parent: &RawValue) -> Asn1Result<Vec<RawValue>> {
        let depth = parent.depth + 1;
        if depth > MAX_NESTING_DEPTH {
            return Err(Asn1Error::parse(format!(
                "nesting too deep at {} (max {})",
                parent.label(),
                MAX_NESTING_DEPTH
            )));
        }
        let mut values = self.read_all(&parent.content)?;
        for value in &mut values {
            value.depth = depth;
        }
        Ok(values)
    }

    /// Decode one element into `target`, returning the unread rest of `data`
    pub fn decode<'a, T: Asn1>(&self, data: &'a [u8], target: &mut T) -> Asn1Result<&'a [u8]> {
        self.decode_with_options(data, target, "")
    }

    /// Decode with directives applied to the top-level element
    ///
    /// Directives are parsed and the target's schema is checked before any
    /// byte is read.
    pub fn decode_with_options<'a, T: Asn1>(
        &self,
        data: &'a [u8],
        target: &mut T,
        options: &str,
    ) -> Asn1Result<&'a [u8]> {
        self.seal();
        debug!(
            "decoding {} ({}), options {:?}, {} bytes",
            type_name::<T>(),
            self.config.decoding,
            options,
            data.len()
        );

        let opts = FieldOptions::parse(options)?;
        resolve::<T>(self, &opts)?;
        T::validate(self, &opts, &mut Visited::default())?;

        let (raw, used) = self.read_raw(data)?;
        decode_element(self, &raw, &opts, target)?;
        Ok(&data[used..])
    }

    /// Decode into a fresh value
    pub fn decode_value<'a, T: Asn1 + Default>(&self, data: &'a [u8]) -> Asn1Result<(T, &'a [u8])> {
        let mut value = T::default();
        let rest = self.decode(data, &mut value)?;
        Ok((value, rest))
    }

    pub fn encode<T: Asn1>(&self, value: &T) -> Asn1Result<Vec<u8>> {
        self.encode_with_options(value, "")
    }

    /// Encode with directives applied to the top-level element
    pub fn encode_with_options<T: Asn1>(&self, value: &T, options: &str) -> Asn1Result<Vec<u8>> {
        self.seal();
        debug!(
            "encoding {} ({}), options {:?}",
            type_name::<T>(),
            self.config.encoding,
            options
        );

        let opts = FieldOptions::parse(options)?;
        T::validate(self, &opts, &mut Visited::default())?;
        let raw = encode_element(self, value, &opts)?;
        Ok(raw.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Choice;
    use typed_asn1_core::Null;

    fn value_choice() -> Vec<ChoiceAlternative> {
        vec![
            ChoiceAlternative::of::<i64>("tag:0"),
            ChoiceAlternative::of::<String>("tag:1"),
        ]
    }

    #[test]
    fn test_new_context_is_der() {
        let ctx = Context::new();
        assert!(ctx.der_encoding());
        assert!(ctx.der_decoding());
        assert!(!ctx.is_sealed());
    }

    #[test]
    fn test_set_der() {
        let mut ctx = Context::new();
        ctx.set_der(true, false);
        assert!(ctx.der_encoding());
        assert!(!ctx.der_decoding());
        assert_eq!(ctx.config().decoding, EncodingRules::Ber);
    }

    #[test]
    fn test_add_choice() {
        let mut ctx = Context::new();
        ctx.add_choice("value", value_choice()).unwrap();
        let (name, entries) = ctx.choice_group("value").unwrap();
        assert_eq!(name, "value");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].class(), TagClass::ContextSpecific);
        assert_eq!(entries[1].tag(), 1);
        assert!(ctx.choice_group("other").unwrap_err().is_syntax());
    }

    #[test]
    fn test_add_choice_errors() {
        let mut ctx = Context::new();
        ctx.add_choice("value", value_choice()).unwrap();

        let cases = vec![
            ("value", value_choice()),
            ("", value_choice()),
            ("empty", vec![]),
            (
                "same-tag",
                vec![
                    ChoiceAlternative::of::<i64>("tag:0"),
                    ChoiceAlternative::of::<bool>("tag:0"),
                ],
            ),
            (
                "universal-clash",
                vec![
                    ChoiceAlternative::of::<i64>(""),
                    ChoiceAlternative::of::<i32>(""),
                ],
            ),
            (
                "same-type",
                vec![
                    ChoiceAlternative::of::<i64>("tag:0"),
                    ChoiceAlternative::of::<i64>("tag:1"),
                ],
            ),
            ("nested-type", vec![ChoiceAlternative::of::<Choice>("tag:0")]),
            (
                "nested-directive",
                vec![ChoiceAlternative::of::<i64>("choice:value")],
            ),
            ("bad-options", vec![ChoiceAlternative::of::<i64>("tag:x")]),
        ];

        for (name, alternatives) in cases {
            let err = ctx.add_choice(name, alternatives).unwrap_err();
            assert!(err.is_syntax(), "{:?}: {}", name, err);
        }
    }

    #[test]
    fn test_sealed_after_use() {
        let mut ctx = Context::new();
        let mut null = Null;
        ctx.decode(&[0x05, 0x00], &mut null).unwrap();
        assert!(ctx.is_sealed());

        let err = ctx.add_choice("late", value_choice()).unwrap_err();
        assert!(err.is_syntax());
    }

    #[test]
    fn test_decode_returns_rest() {
        let ctx = Context::new();
        let data = [0x02, 0x01, 0x2A, 0x05, 0x00];
        let (value, rest) = ctx.decode_value::<i32>(&data).unwrap();
        assert_eq!(value, 42);
        assert_eq!(rest, &[0x05, 0x00]);
    }

    #[test]
    fn test_options_checked_before_input() {
        let ctx = Context::new();
        let mut value = 0i32;
        let err = ctx.decode_with_options(&[], &mut value, "bogus").unwrap_err();
        assert!(err.is_syntax());
        let err = ctx.decode_with_options(&[], &mut value, "set").unwrap_err();
        assert!(err.is_syntax());
        let err = ctx.decode(&[], &mut value).unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_der_rejects_indefinite_input() {
        let data = [0x30, 0x80, 0x02, 0x01, 0x01, 0x00, 0x00];

        let ctx = Context::new();
        let mut values: Vec<i64> = Vec::new();
        assert!(ctx.decode(&data, &mut values).unwrap_err().is_parse());

        let ctx = Context::with_config(ContextConfig::ber());
        let rest = ctx.decode(&data, &mut values).unwrap();
        assert!(rest.is_empty());
        assert_eq!(values, vec![1]);
    }

    #[test]
    fn test_read_nested_depth() {
        let ctx = Context::new();
        let (outer, _) = ctx.read_raw(&[0x30, 0x05, 0x30, 0x03, 0x02, 0x01, 0x01]).unwrap();
        assert_eq!(outer.depth(), 0);

        let inner = ctx.read_nested(&outer).unwrap();
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].depth(), 1);
        assert_eq!(ctx.read_nested(&inner[0]).unwrap()[0].depth(), 2);

        let mut deepest = outer.clone();
        deepest.depth = MAX_NESTING_DEPTH;
        let err = ctx.read_nested(&deepest).unwrap_err();
        assert!(err.is_parse());
        assert!(err.to_string().contains("nesting too deep"));
    }

    #[test]
    fn test_encode_with_options() {
        let ctx = Context::new();
        assert_eq!(
            ctx.encode_with_options(&true, "tag:3").unwrap(),
            vec![0x83, 0x01, 0xFF]
        );
        assert!(ctx.encode_with_options(&true, "explicit").unwrap_err().is_syntax());
    }

    #[test]
    fn test_context_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Context>();
    }
}
