#[macro_export]
macro_rules! make_smart_pointer {
    ($name:ident, $target:ty) => {
        impl std::ops::Deref for $name {
            type Target = $target;
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }
        impl std::ops::DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }
    };

    ($name:ident, $target:ty => $field:ident) => {
        impl std::ops::Deref for $name {
            type Target = $target;
            fn deref(&self) -> &Self::Target {
                &self.$field
            }
        }
        impl std::ops::DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.$field
            }
        }
    };
}

/// Builds a `QueryIO::Array` of bulk strings, the shape every request takes on the wire.
#[macro_export]
macro_rules! write_array {
    ($($x:expr),* $(,)?) => {
        $crate::domains::query_io::QueryIO::Array(
            vec![$($crate::domains::query_io::QueryIO::BulkString($x.into())),*]
        )
    };
}

/// Declares one local per setting, seeded from the variable of the same name looked up through
/// `$env` (falling back to its default), then overridden by `--name value` pairs found in `$args`.
///
/// Must be expanded inside a function returning `anyhow::Result<_>`.
#[macro_export]
macro_rules! env_var {
    (
        args: $args:expr,
        env: $env:expr,
        defaults: {
            $($name:ident : $type:ty = $default:expr),* $(,)?
        },
        optional: {
            $($opt_name:ident),* $(,)?
        }
    ) => {
        let lookup = $env;
        $(
            let mut $name: $type = match lookup(stringify!($name)) {
                Some(val) => val.parse::<$type>().map_err(|e| {
                    anyhow::anyhow!(
                        "invalid value {val:?} for environment variable {}: {e}",
                        stringify!($name)
                    )
                })?,
                None => $default,
            };
        )*

        $(
            let mut $opt_name: Option<String> = lookup(stringify!($opt_name));
        )*

        let mut args = $args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                $(
                    concat!("--", stringify!($name)) => {
                        let val = args.next().ok_or_else(|| {
                            anyhow::anyhow!("missing value for --{}", stringify!($name))
                        })?;
                        $name = val.parse::<$type>().map_err(|e| {
                            anyhow::anyhow!("invalid value {val:?} for --{}: {e}", stringify!($name))
                        })?;
                    }
                )*
                $(
                    concat!("--", stringify!($opt_name)) => {
                        if let Some(val) = args.next() {
                            $opt_name = Some(val);
                        }
                    }
                )*
                _ => eprintln!("Unexpected argument: {}", arg),
            }
        }
    };
}
