//! Struct schemas
//!
//! A schema lists the members of a SEQUENCE/SET struct in declaration
//! order, each with its parsed directives and typed accessors. Schemas are
//! built once per type by [`asn1_struct!`](crate::asn1_struct) and cached
//! together with any directive error, so a bad definition fails the same
//! way on every call.

use crate::ber::RawValue;
use crate::context::Context;
use crate::element::{decode_element, encode_member, resolve, Asn1, Resolved, Visited};
use crate::options::FieldOptions;
use std::fmt;
use typed_asn1_core::{Asn1Error, Asn1Result};

/// A struct encoded as SEQUENCE (or SET with the `set` directive)
pub trait Asn1Struct: Asn1 + Default {
    fn schema() -> Asn1Result<&'static Schema<Self>>;
}

/// Members of a struct, in declaration order
pub struct Schema<S> {
    fields: Vec<Field<S>>,
}

impl<S: 'static> Schema<S> {
    /// Collect fields, failing on the first invalid one
    pub fn build(fields: Vec<Asn1Result<Field<S>>>) -> Asn1Result<Self> {
        let fields = fields.into_iter().collect::<Asn1Result<Vec<_>>>()?;
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[Field<S>] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<S> fmt::Debug for Schema<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.fields).finish()
    }
}

/// One struct member
pub struct Field<S> {
    name: &'static str,
    options: FieldOptions,
    access: Box<dyn FieldAccess<S>>,
}

impl<S: 'static> Field<S> {
    /// Describe a member of type `T`
    ///
    /// # Error Handling
    /// Returns `Asn1Error::Syntax` if the directives do not parse, or if a
    /// `default` is given for a type that does not take integer defaults
    /// (or is out of its range).
    pub fn new<T: Asn1 + Default>(
        name: &'static str,
        options: &str,
        get: fn(&S) -> &T,
        get_mut: fn(&mut S) -> &mut T,
    ) -> Asn1Result<Self> {
        let options = FieldOptions::parse(options)
            .map_err(|e| Asn1Error::syntax(format!("field {}: {}", name, e)))?;

        if let Some(default) = options.default_value {
            if T::from_default(default).is_none() {
                return Err(Asn1Error::syntax(format!(
                    "field {}: default value {} not valid for {}",
                    name,
                    default,
                    std::any::type_name::<T>()
                )));
            }
        }

        Ok(Self {
            name,
            options,
            access: Box::new(Accessor { get, get_mut }),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn options(&self) -> &FieldOptions {
        &self.options
    }

    pub(crate) fn resolve<'c>(&self, ctx: &'c Context) -> Asn1Result<Resolved<'c>> {
        self.access.resolve(ctx, &self.options)
    }

    pub(crate) fn decode(&self, target: &mut S, ctx: &Context, raw: &RawValue) -> Asn1Result<()> {
        self.access.decode(target, ctx, raw, &self.options)
    }

    /// Apply the missing-value policy, `false` if the member is required
    pub(crate) fn fill_missing(&self, target: &mut S) -> Asn1Result<bool> {
        self.access.fill_missing(target, &self.options)
    }

    pub(crate) fn reset(&self, target: &mut S) {
        self.access.reset(target)
    }

    pub(crate) fn encode(&self, source: &S, ctx: &Context) -> Asn1Result<Option<RawValue>> {
        self.access.encode(source, ctx, &self.options)
    }

    /// Check the member type under the member's directives
    pub(crate) fn validate(&self, ctx: &Context, visited: &mut Visited) -> Asn1Result<()> {
        self.access.validate(ctx, &self.options, visited)
    }
}

impl<S> fmt::Debug for Field<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish()
    }
}

trait FieldAccess<S>: Send + Sync {
    fn resolve<'c>(&self, ctx: &'c Context, opts: &FieldOptions) -> Asn1Result<Resolved<'c>>;
    fn decode(
        &self,
        target: &mut S,
        ctx: &Context,
        raw: &RawValue,
        opts: &FieldOptions,
    ) -> Asn1Result<()>;
    fn fill_missing(&self, target: &mut S, opts: &FieldOptions) -> Asn1Result<bool>;
    fn reset(&self, target: &mut S);
    fn encode(
        &self,
        source: &S,
        ctx: &Context,
        opts: &FieldOptions,
    ) -> Asn1Result<Option<RawValue>>;
    fn validate(
        &self,
        ctx: &Context,
        opts: &FieldOptions,
        visited: &mut Visited,
    ) -> Asn1Result<()>;
}

struct Accessor<S, T> {
    get: fn(&S) -> &T,
    get_mut: fn(&mut S) -> &mut T,
}

impl<S: 'static, T: Asn1 + Default> FieldAccess<S> for Accessor<S, T> {
    fn resolve<'c>(&self, ctx: &'c Context, opts: &FieldOptions) -> Asn1Result<Resolved<'c>> {
        resolve::<T>(ctx, opts)
    }

    fn decode(
        &self,
        target: &mut S,
        ctx: &Context,
        raw: &RawValue,
        opts: &FieldOptions,
    ) -> Asn1Result<()> {
        decode_element(ctx, raw, opts, (self.get_mut)(target))
    }

    fn fill_missing(&self, target: &mut S, opts: &FieldOptions) -> Asn1Result<bool> {
        let slot = (self.get_mut)(target);
        if let Some(default) = opts.default_value {
            *slot = T::from_default(default)
                .ok_or_else(|| Asn1Error::syntax(format!("invalid default value {}", default)))?;
            return Ok(true);
        }
        if opts.optional || T::optional_by_type() {
            *slot = T::default();
            return Ok(true);
        }
        Ok(false)
    }

    fn reset(&self, target: &mut S) {
        *(self.get_mut)(target) = T::default();
    }

    fn encode(
        &self,
        source: &S,
        ctx: &Context,
        opts: &FieldOptions,
    ) -> Asn1Result<Option<RawValue>> {
        encode_member(ctx, (self.get)(source), opts)
    }

    fn validate(
        &self,
        ctx: &Context,
        opts: &FieldOptions,
        visited: &mut Visited,
    ) -> Asn1Result<()> {
        T::validate(ctx, opts, visited)
    }
}

/// Declare a struct mapped onto a SEQUENCE
///
/// Members take their directives from an `#[asn1("...")]` attribute, in
/// any position among the member's other attributes. The struct must
/// implement `Default`.
///
/// ```ignore
/// asn1_struct! {
///     #[derive(Debug, Default, Clone, PartialEq)]
///     pub struct Certificate {
///         pub version: i64,
///         #[asn1("tag:0,optional")]
///         pub serial: Option<Integer>,
///         #[asn1("choice:name")]
///         pub subject: Choice,
///     }
/// }
/// ```
#[macro_export]
macro_rules! asn1_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$($fattr:tt)*])*
                $fvis:vis $field:ident : $fty:ty
            ),* $(,)?
        }
    ) => {
        $crate::__asn1_struct_decl! {
            { $(#[$meta])* $vis struct $name }
            []
            $( ([] [$(#[$($fattr)*])*] $fvis $field : $fty) )*
        }

        impl $crate::Asn1Struct for $name {
            fn schema() -> $crate::Asn1Result<&'static $crate::Schema<Self>> {
                static SCHEMA: $crate::__private::OnceCell<
                    $crate::Asn1Result<$crate::Schema<$name>>,
                > = $crate::__private::OnceCell::new();

                SCHEMA
                    .get_or_init(|| {
                        $crate::Schema::build(::std::vec![
                            $(
                                $crate::Field::<$name>::new::<$fty>(
                                    ::core::stringify!($field),
                                    $crate::__asn1_directives!($(#[$($fattr)*])*),
                                    |s: &$name| &s.$field,
                                    |s: &mut $name| &mut s.$field,
                                ),
                            )*
                        ])
                    })
                    .as_ref()
                    .map_err(::core::clone::Clone::clone)
            }
        }

        impl $crate::Asn1 for $name {
            const TAG: ::core::option::Option<u32> =
                ::core::option::Option::Some($crate::tags::SEQUENCE);
            const CONSTRUCTED: bool = true;

            fn decode_content(
                &mut self,
                ctx: &$crate::Context,
                raw: &$crate::RawValue,
                opts: &$crate::FieldOptions,
            ) -> $crate::Asn1Result<()> {
                $crate::aggregate::decode_struct(self, ctx, raw, opts)
            }

            fn encode_content(
                &self,
                ctx: &$crate::Context,
                opts: &$crate::FieldOptions,
            ) -> $crate::Asn1Result<::std::vec::Vec<u8>> {
                $crate::aggregate::encode_struct(self, ctx, opts)
            }

            fn validate(
                ctx: &$crate::Context,
                opts: &$crate::FieldOptions,
                visited: &mut $crate::element::Visited,
            ) -> $crate::Asn1Result<()> {
                $crate::aggregate::validate_struct::<Self>(ctx, opts, visited)
            }
        }
    };
}

/// Emit the struct declaration, dropping `#[asn1(..)]` from member
/// attributes and keeping everything else
#[doc(hidden)]
#[macro_export]
macro_rules! __asn1_struct_decl {
    ({ $($head:tt)* } [$($done:tt)*]) => {
        $($head)* { $($done)* }
    };
    (
        { $($head:tt)* } [$($done:tt)*]
        ([$($keep:tt)*] [] $fvis:vis $field:ident : $fty:ty)
        $($rest:tt)*
    ) => {
        $crate::__asn1_struct_decl! {
            { $($head)* } [$($done)* $($keep)* $fvis $field: $fty,]
            $($rest)*
        }
    };
    (
        { $($head:tt)* } [$($done:tt)*]
        (
            [$($keep:tt)*]
            [#[asn1 $($directive:tt)*] $($attrs:tt)*]
            $fvis:vis $field:ident : $fty:ty
        )
        $($rest:tt)*
    ) => {
        $crate::__asn1_struct_decl! {
            { $($head)* } [$($done)*]
            ([$($keep)*] [$($attrs)*] $fvis $field : $fty)
            $($rest)*
        }
    };
    (
        { $($head:tt)* } [$($done:tt)*]
        (
            [$($keep:tt)*]
            [#[$($attr:tt)*] $($attrs:tt)*]
            $fvis:vis $field:ident : $fty:ty
        )
        $($rest:tt)*
    ) => {
        $crate::__asn1_struct_decl! {
            { $($head)* } [$($done)*]
            ([$($keep)* #[$($attr)*]] [$($attrs)*] $fvis $field : $fty)
            $($rest)*
        }
    };
}

/// Directive string of a member, taken from its `#[asn1("...")]` attribute
#[doc(hidden)]
#[macro_export]
macro_rules! __asn1_directives {
    () => {
        ""
    };
    (#[asn1($directives:literal)] $($rest:tt)*) => {
        $directives
    };
    (#[asn1 $($bad:tt)*] $($rest:tt)*) => {
        ::core::compile_error!("expected #[asn1(\"<directives>\")]")
    };
    (#[$($attr:tt)*] $($rest:tt)*) => {
        $crate::__asn1_directives!($($rest)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Choice;

    crate::asn1_struct! {
        #[derive(Debug, Default, Clone, PartialEq)]
        struct Pair {
            /// first member
            first: i64,
            #[asn1("tag:1,optional")]
            second: Option<String>,
        }
    }

    crate::asn1_struct! {
        #[derive(Debug, Default)]
        struct BadDefault {
            #[asn1("default:1")]
            name: String,
        }
    }

    crate::asn1_struct! {
        #[derive(Debug, Default)]
        struct BadOptions {
            value: i64,
            #[asn1("tag:x")]
            other: i64,
        }
    }

    crate::asn1_struct! {
        #[derive(Debug, Default)]
        struct WithChoice {
            #[asn1("choice:value")]
            value: Choice,
        }
    }

    #[test]
    fn test_schema_fields() {
        let schema = Pair::schema().unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.fields()[0].name(), "first");
        assert_eq!(schema.fields()[1].options().tag, Some(1));
        assert!(schema.fields()[1].options().optional);
        // cached
        assert!(std::ptr::eq(schema, Pair::schema().unwrap()));

        let shown = format!("{:?}", schema);
        assert!(shown.contains("first"));
        assert!(shown.contains("tag: Some(1)"));
    }

    #[test]
    fn test_schema_errors_are_cached() {
        let err = BadDefault::schema().unwrap_err();
        assert!(err.is_syntax());
        assert!(err.to_string().contains("name"));
        assert_eq!(BadDefault::schema().unwrap_err(), err);

        assert!(BadOptions::schema().unwrap_err().to_string().contains("other"));
    }

    #[test]
    fn test_default_out_of_range() {
        let field =
            Field::<Pair>::new::<i64>("first", "default:300", |s| &s.first, |s| &mut s.first);
        assert!(field.is_ok());
        let field = Field::<(i8,)>::new::<i8>("x", "default:300", |s| &s.0, |s| &mut s.0);
        assert!(field.unwrap_err().is_syntax());
    }

    #[test]
    fn test_fill_missing() {
        let schema = Pair::schema().unwrap();
        let mut pair = Pair {
            first: 9,
            second: Some("x".to_string()),
        };
        assert!(schema.fields()[1].fill_missing(&mut pair).unwrap());
        assert_eq!(pair.second, None);
        assert!(!schema.fields()[0].fill_missing(&mut pair).unwrap());
    }

    #[test]
    fn test_choice_field_resolution_needs_group() {
        let schema = WithChoice::schema().unwrap();
        let ctx = Context::new();
        assert!(schema.fields()[0].resolve(&ctx).unwrap_err().is_syntax());
    }
}
