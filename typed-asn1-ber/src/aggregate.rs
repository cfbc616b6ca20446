//! Constructed types
//!
//! SEQUENCE and SET structs, SEQUENCE OF / SET OF (`Vec<T>`, `[T; N]`) and
//! the `Option<T>`/`Box<T>` wrappers.
//!
//! # Matching struct members
//!
//! The members of a struct are turned into a list of expected elements;
//! a choice member contributes one entry per alternative. The list is then
//! walked alongside the received elements: an entry that matches the next
//! element consumes it, an entry that does not applies the missing-value
//! policy of its member. Once one alternative of a choice member matched,
//! its sibling entries are skipped.
//!
//! For SET the expected list is sorted by (class, tag) and must not contain
//! the same tag twice. Under BER the received elements are sorted the same
//! way; DER requires them to arrive in that order already.

use crate::ber::raw::tag_label;
use crate::ber::{RawValue, TagClass};
use crate::choice::ChoiceValue;
use crate::context::Context;
use crate::element::{decode_element, encode_element, Asn1, Resolved, Visited};
use crate::options::FieldOptions;
use crate::schema::{Asn1Struct, Schema};
use log::trace;
use std::any::type_name;
use typed_asn1_core::{tags, Asn1Error, Asn1Result};

/// One expected member element
#[derive(Debug, Clone, Copy)]
struct Expected {
    class: TagClass,
    tag: u32,
    field: usize,
}

/// Expected elements of a struct, and which members are choices
fn expected_elements<S: 'static>(
    schema: &Schema<S>,
    ctx: &Context,
    set: bool,
) -> Asn1Result<(Vec<Expected>, Vec<bool>)> {
    let mut expected = Vec::with_capacity(schema.len());
    let mut is_choice = vec![false; schema.len()];

    for (index, field) in schema.fields().iter().enumerate() {
        // an explicitly tagged choice is a single element, still left empty when missing
        is_choice[index] = field.options().choice.is_some();
        match field.resolve(ctx).map_err(|e| in_field::<S>(field.name(), e))? {
            Resolved::Element(element) => expected.push(Expected {
                class: element.class,
                tag: element.tag,
                field: index,
            }),
            Resolved::Choice { entries, .. } => {
                expected.extend(entries.iter().map(|entry| Expected {
                    class: entry.class(),
                    tag: entry.tag(),
                    field: index,
                }));
            }
        }
    }

    if set {
        expected.sort_by_key(|e| (e.class, e.tag));
        if let Some(pair) = expected
            .windows(2)
            .find(|pair| (pair[0].class, pair[0].tag) == (pair[1].class, pair[1].tag))
        {
            return Err(Asn1Error::syntax(format!(
                "SET {} has duplicate tag {}",
                type_name::<S>(),
                tag_label(pair[0].class, pair[0].tag)
            )));
        }
    }

    Ok((expected, is_choice))
}

fn in_field<S>(name: &str, err: Asn1Error) -> Asn1Error {
    match err {
        Asn1Error::Syntax(msg) => {
            Asn1Error::syntax(format!("{}.{}: {}", type_name::<S>(), name, msg))
        }
        other => other,
    }
}

/// Decode the members of a struct from the content of `raw`
#[doc(hidden)]
pub fn decode_struct<S: Asn1Struct>(
    target: &mut S,
    ctx: &Context,
    raw: &RawValue,
    opts: &FieldOptions,
) -> Asn1Result<()> {
    let schema = S::schema()?;
    let (expected, is_choice) = expected_elements(schema, ctx, opts.set)?;

    let mut values = ctx.read_nested(raw)?;
    if opts.set && !ctx.der_decoding() {
        values.sort_by_key(|v| (v.class, v.tag));
    }

    let fields = schema.fields();
    let mut matched = vec![false; fields.len()];
    let mut next = 0;

    for exp in &expected {
        if matched[exp.field] {
            continue;
        }
        let field = &fields[exp.field];

        match values.get(next) {
            Some(value) if value.class == exp.class && value.tag == exp.tag => {
                trace!(
                    "{}: {} matched field {}",
                    type_name::<S>(),
                    value.label(),
                    field.name()
                );
                field.decode(target, ctx, value)?;
                matched[exp.field] = true;
                next += 1;
            }
            _ if is_choice[exp.field] => {}
            _ => {
                if !field.fill_missing(target)? {
                    return Err(Asn1Error::parse(format!(
                        "missing value for {} in {}",
                        tag_label(exp.class, exp.tag),
                        type_name::<S>()
                    )));
                }
                trace!("{}: field {} absent", type_name::<S>(), field.name());
            }
        }
    }

    for (index, field) in fields.iter().enumerate() {
        if is_choice[index] && !matched[index] {
            field.reset(target);
        }
    }

    if let Some(value) = values.get(next) {
        return Err(Asn1Error::parse(format!(
            "unexpected element {} in {}",
            value.label(),
            type_name::<S>()
        )));
    }

    Ok(())
}

/// Encode the members of a struct
#[doc(hidden)]
pub fn encode_struct<S: Asn1Struct>(
    source: &S,
    ctx: &Context,
    opts: &FieldOptions,
) -> Asn1Result<Vec<u8>> {
    let schema = S::schema()?;
    if opts.set {
        expected_elements(schema, ctx, true)?;
    }

    let mut members = Vec::with_capacity(schema.len());
    for field in schema.fields() {
        if let Some(raw) = field.encode(source, ctx)? {
            members.push(raw);
        }
    }
    if opts.set {
        members.sort_by_key(|m| (m.class, m.tag));
    }

    let mut out = Vec::new();
    for member in &members {
        member.write_to(&mut out);
    }
    Ok(out)
}

/// Check a struct's members resolve and SET tags are distinct, then check
/// the member types under their own directives
#[doc(hidden)]
pub fn validate_struct<S: Asn1Struct>(
    ctx: &Context,
    opts: &FieldOptions,
    visited: &mut Visited,
) -> Asn1Result<()> {
    if !visited.insert::<S>(opts.set) {
        return Ok(());
    }
    let schema = S::schema()?;
    expected_elements(schema, ctx, opts.set)?;
    for field in schema.fields() {
        field
            .validate(ctx, visited)
            .map_err(|e| in_field::<S>(field.name(), e))?;
    }
    Ok(())
}

fn encode_elements<'a, T: Asn1>(
    ctx: &Context,
    items: impl Iterator<Item = &'a T>,
    sort: bool,
) -> Asn1Result<Vec<u8>> {
    let element_opts = FieldOptions::default();
    let mut encoded = items
        .map(|item| encode_element(ctx, item, &element_opts).map(|raw| raw.to_bytes()))
        .collect::<Asn1Result<Vec<_>>>()?;
    if sort {
        encoded.sort();
    }
    Ok(encoded.concat())
}

impl<T: Asn1 + Default> Asn1 for Vec<T> {
    const TAG: Option<u32> = Some(tags::SEQUENCE);
    const CONSTRUCTED: bool = true;

    fn decode_content(
        &mut self,
        ctx: &Context,
        raw: &RawValue,
        _opts: &FieldOptions,
    ) -> Asn1Result<()> {
        let element_opts = FieldOptions::default();
        let items = ctx
            .read_nested(raw)?
            .iter()
            .map(|element| {
                let mut item = T::default();
                decode_element(ctx, element, &element_opts, &mut item)?;
                Ok(item)
            })
            .collect::<Asn1Result<Vec<_>>>()?;
        trace!("decoded {} elements of {}", items.len(), type_name::<T>());
        *self = items;
        Ok(())
    }

    /// SET OF elements are sorted by their encoding under DER
    fn encode_content(&self, ctx: &Context, opts: &FieldOptions) -> Asn1Result<Vec<u8>> {
        encode_elements(ctx, self.iter(), opts.set && ctx.der_encoding())
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn validate(ctx: &Context, _opts: &FieldOptions, visited: &mut Visited) -> Asn1Result<()> {
        T::validate(ctx, &FieldOptions::default(), visited)
    }
}

impl<T: Asn1, const N: usize> Asn1 for [T; N] {
    const TAG: Option<u32> = Some(tags::SEQUENCE);
    const CONSTRUCTED: bool = true;

    fn decode_content(
        &mut self,
        ctx: &Context,
        raw: &RawValue,
        _opts: &FieldOptions,
    ) -> Asn1Result<()> {
        let elements = ctx.read_nested(raw)?;
        if elements.len() != N {
            return Err(Asn1Error::parse(format!(
                "expected {} elements in fixed size sequence, found {}",
                N,
                elements.len()
            )));
        }
        let element_opts = FieldOptions::default();
        for (slot, element) in self.iter_mut().zip(&elements) {
            decode_element(ctx, element, &element_opts, slot)?;
        }
        Ok(())
    }

    fn encode_content(&self, ctx: &Context, opts: &FieldOptions) -> Asn1Result<Vec<u8>> {
        encode_elements(ctx, self.iter(), opts.set && ctx.der_encoding())
    }

    fn validate(ctx: &Context, _opts: &FieldOptions, visited: &mut Visited) -> Asn1Result<()> {
        T::validate(ctx, &FieldOptions::default(), visited)
    }
}

impl<T: Asn1 + Default> Asn1 for Option<T> {
    const TAG: Option<u32> = T::TAG;
    const CONSTRUCTED: bool = T::CONSTRUCTED;

    fn decode_content(
        &mut self,
        ctx: &Context,
        raw: &RawValue,
        opts: &FieldOptions,
    ) -> Asn1Result<()> {
        let mut value = T::default();
        value.decode_content(ctx, raw, opts)?;
        *self = Some(value);
        Ok(())
    }

    fn encode_content(&self, ctx: &Context, opts: &FieldOptions) -> Asn1Result<Vec<u8>> {
        match self {
            Some(value) => value.encode_content(ctx, opts),
            None => Err(Asn1Error::encode(format!(
                "no value to encode for {}",
                type_name::<T>()
            ))),
        }
    }

    fn is_absent(&self) -> bool {
        self.as_ref().map_or(true, Asn1::is_absent)
    }

    fn is_zero(&self) -> bool {
        self.as_ref().map_or(true, Asn1::is_zero)
    }

    fn optional_by_type() -> bool {
        true
    }

    fn from_default(value: i64) -> Option<Self> {
        T::from_default(value).map(Some)
    }

    fn equals_default(&self, value: i64) -> bool {
        self.as_ref().is_some_and(|v| v.equals_default(value))
    }

    fn validate(ctx: &Context, opts: &FieldOptions, visited: &mut Visited) -> Asn1Result<()> {
        T::validate(ctx, opts, visited)
    }

    fn set_choice(&mut self, value: Box<dyn ChoiceValue>) -> Asn1Result<()> {
        let mut inner = T::default();
        inner.set_choice(value)?;
        *self = Some(inner);
        Ok(())
    }

    fn choice_value(&self) -> Option<&dyn ChoiceValue> {
        self.as_ref().and_then(Asn1::choice_value)
    }
}

impl<T: Asn1 + Default> Asn1 for Box<T> {
    const TAG: Option<u32> = T::TAG;
    const CONSTRUCTED: bool = T::CONSTRUCTED;

    fn decode_content(
        &mut self,
        ctx: &Context,
        raw: &RawValue,
        opts: &FieldOptions,
    ) -> Asn1Result<()> {
        (**self).decode_content(ctx, raw, opts)
    }

    fn encode_content(&self, ctx: &Context, opts: &FieldOptions) -> Asn1Result<Vec<u8>> {
        (**self).encode_content(ctx, opts)
    }

    fn is_absent(&self) -> bool {
        (**self).is_absent()
    }

    fn is_zero(&self) -> bool {
        (**self).is_zero()
    }

    fn optional_by_type() -> bool {
        T::optional_by_type()
    }

    fn from_default(value: i64) -> Option<Self> {
        T::from_default(value).map(Box::new)
    }

    fn equals_default(&self, value: i64) -> bool {
        (**self).equals_default(value)
    }

    fn validate(ctx: &Context, opts: &FieldOptions, visited: &mut Visited) -> Asn1Result<()> {
        T::validate(ctx, opts, visited)
    }

    fn set_choice(&mut self, value: Box<dyn ChoiceValue>) -> Asn1Result<()> {
        (**self).set_choice(value)
    }

    fn choice_value(&self) -> Option<&dyn ChoiceValue> {
        (**self).choice_value()
    }
}
