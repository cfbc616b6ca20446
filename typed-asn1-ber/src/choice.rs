//! CHOICE values
//!
//! A [`Choice`] holds one decoded alternative of a choice group registered
//! on the [`Context`](crate::Context). The concrete type of the alternative
//! is only known at run time, callers recover it with [`Choice::get`].

use crate::ber::RawValue;
use crate::context::Context;
use crate::element::{decode_element, encode_element, resolve_tag, Asn1, ElementTag};
use crate::options::FieldOptions;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use typed_asn1_core::{Asn1Error, Asn1Result};

/// Object-safe view of a choice alternative value
pub trait ChoiceValue: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn clone_box(&self) -> Box<dyn ChoiceValue>;
    fn eq_dyn(&self, other: &dyn ChoiceValue) -> bool;
    fn value_type_id(&self) -> TypeId;
    fn value_type_name(&self) -> &'static str;
}

impl<T> ChoiceValue for T
where
    T: Asn1 + Clone + PartialEq + fmt::Debug + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn ChoiceValue> {
        Box::new(self.clone())
    }

    fn eq_dyn(&self, other: &dyn ChoiceValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }

    fn value_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn value_type_name(&self) -> &'static str {
        type_name::<T>()
    }
}

/// Holder for a CHOICE field
///
/// The field must carry a `choice:<name>` directive naming a group
/// registered with [`Context::add_choice`]. An empty choice is the value
/// of a choice field that matched no element.
#[derive(Default)]
pub struct Choice(Option<Box<dyn ChoiceValue>>);

impl Choice {
    pub fn new<T: ChoiceValue>(value: T) -> Self {
        Self(Some(Box::new(value)))
    }

    /// The held alternative, if it is a `T`
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.0.as_deref()?.as_any().downcast_ref::<T>()
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.get::<T>().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn value(&self) -> Option<&dyn ChoiceValue> {
        self.0.as_deref()
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }
}

impl Clone for Choice {
    fn clone(&self) -> Self {
        Self(self.0.as_ref().map(|value| value.clone_box()))
    }
}

impl PartialEq for Choice {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (None, None) => true,
            (Some(a), Some(b)) => a.eq_dyn(b.as_ref()),
            _ => false,
        }
    }
}

impl fmt::Debug for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(value) => f.debug_tuple("Choice").field(value).finish(),
            None => f.write_str("Choice(<empty>)"),
        }
    }
}

impl Asn1 for Choice {
    const TAG: Option<u32> = None;

    fn decode_content(
        &mut self,
        _ctx: &Context,
        _raw: &RawValue,
        _opts: &FieldOptions,
    ) -> Asn1Result<()> {
        Err(Asn1Error::syntax("a choice value requires a choice directive"))
    }

    fn encode_content(&self, _ctx: &Context, _opts: &FieldOptions) -> Asn1Result<Vec<u8>> {
        Err(Asn1Error::syntax("a choice value requires a choice directive"))
    }

    fn is_absent(&self) -> bool {
        self.is_empty()
    }

    fn set_choice(&mut self, value: Box<dyn ChoiceValue>) -> Asn1Result<()> {
        self.0 = Some(value);
        Ok(())
    }

    fn choice_value(&self) -> Option<&dyn ChoiceValue> {
        self.value()
    }
}

type DecodeFn = fn(&Context, &RawValue, &FieldOptions) -> Asn1Result<Box<dyn ChoiceValue>>;
type EncodeFn = fn(&Context, &dyn ChoiceValue, &FieldOptions) -> Asn1Result<RawValue>;
type TagFn = fn(&FieldOptions) -> Asn1Result<ElementTag>;

/// One alternative handed to [`Context::add_choice`]
///
/// ```ignore
/// ctx.add_choice("value", vec![
///     ChoiceAlternative::of::<i64>("tag:0"),
///     ChoiceAlternative::of::<String>("tag:1"),
/// ])?;
/// ```
pub struct ChoiceAlternative {
    pub(crate) options: String,
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) tag_of: TagFn,
    pub(crate) decode: DecodeFn,
    pub(crate) encode: EncodeFn,
}

impl ChoiceAlternative {
    pub fn of<T>(options: &str) -> Self
    where
        T: Asn1 + Default + Clone + PartialEq + fmt::Debug + Send + Sync,
    {
        Self {
            options: options.to_string(),
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            tag_of: resolve_tag::<T>,
            decode: decode_alternative::<T>,
            encode: encode_alternative::<T>,
        }
    }
}

impl fmt::Debug for ChoiceAlternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChoiceAlternative")
            .field("type", &self.type_name)
            .field("options", &self.options)
            .finish()
    }
}

fn decode_alternative<T>(
    ctx: &Context,
    raw: &RawValue,
    opts: &FieldOptions,
) -> Asn1Result<Box<dyn ChoiceValue>>
where
    T: Asn1 + Default + Clone + PartialEq + fmt::Debug + Send + Sync,
{
    let mut value = T::default();
    decode_element(ctx, raw, opts, &mut value)?;
    Ok(Box::new(value))
}

fn encode_alternative<T>(
    ctx: &Context,
    value: &dyn ChoiceValue,
    opts: &FieldOptions,
) -> Asn1Result<RawValue>
where
    T: Asn1 + Default + Clone + PartialEq + fmt::Debug + Send + Sync,
{
    let value = value.as_any().downcast_ref::<T>().ok_or_else(|| {
        Asn1Error::encode(format!(
            "choice alternative is not a {}",
            type_name::<T>()
        ))
    })?;
    encode_element(ctx, value, opts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_get() {
        let choice = Choice::new(42i64);
        assert_eq!(choice.get::<i64>(), Some(&42));
        assert_eq!(choice.get::<String>(), None);
        assert!(choice.is::<i64>());
        assert!(!choice.is_empty());
        assert!(Choice::default().is_empty());
    }

    #[test]
    fn test_choice_clone_and_eq() {
        let a = Choice::new(String::from("abc"));
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a, Choice::new(String::from("abd")));
        assert_ne!(a, Choice::new(1i32));
        assert_ne!(a, Choice::default());
        assert_eq!(Choice::default(), Choice::default());
    }

    #[test]
    fn test_choice_debug() {
        assert_eq!(format!("{:?}", Choice::new(7i32)), "Choice(7)");
        assert_eq!(format!("{:?}", Choice::default()), "Choice(<empty>)");
    }

    #[test]
    fn test_choice_clear() {
        let mut choice = Choice::new(true);
        choice.clear();
        assert!(choice.is_empty());
    }
}
