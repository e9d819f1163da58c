//! Helper macro for flat error enums with generated constructors.
//!
//! Each variant gets a snake_case constructor whose parameters accept
//! `impl Into<FieldType>`, so call sites can pass `&str` for `String` fields.

macro_rules! define_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        define_error!(@ctor_impl $variant () () $( $field : $ty, )*);
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*
        }
    };
}

pub(crate) use define_error;

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    define_error! {
        pub enum ExampleError {
            Missing => "missing",
            Rejected { reason: String } => "rejected: {reason}",
            Short { min: usize, actual: usize } => "needs {min}, got {actual}",
        }
    }

    #[test]
    fn unit_variants_get_nullary_constructors() {
        assert_eq!(ExampleError::missing(), ExampleError::Missing);
    }

    #[test]
    fn constructors_accept_str_for_string_fields() {
        let err = ExampleError::rejected("bad algorithm");
        assert_eq!(err.to_string(), "rejected: bad algorithm");
    }

    #[test]
    fn constructors_preserve_numeric_fields() {
        let err = ExampleError::short(32_usize, 7_usize);
        assert_eq!(err.to_string(), "needs 32, got 7");
    }
}
