//! Dynamic call descriptions.
//!
//! A [`CallRequest`] names a pallet call and carries typed arguments. Arguments are turned into
//! dynamic SCALE values so calls can be encoded against whatever metadata the node serves,
//! without generated runtime bindings.

use core::fmt;
use std::str::FromStr;

use hex::FromHex;
use snafu::Snafu;
use subxt::dynamic::Value;
use subxt::utils::AccountId32;

/// A single call argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallArg {
    /// A boolean.
    Bool(bool),
    /// An unsigned integer; encoded to whatever width the metadata asks for.
    U128(u128),
    /// A signed integer.
    I128(i128),
    /// A UTF-8 string.
    Str(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// A plain account id.
    AccountId(AccountId32),
    /// An account id wrapped in `MultiAddress::Id`.
    MultiAddress(AccountId32),
}

/// Errors raised when parsing a `kind:value` call argument.
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub))]
pub enum CallArgError {
    /// The argument has no `kind:` prefix.
    #[snafu(display("Argument '{input}' must look like kind:value"))]
    MissingKind {
        /// The raw argument.
        input: String,
    },

    /// The `kind:` prefix is not supported.
    #[snafu(display("Unknown argument kind '{kind}', expected one of bool, u128, i128, str, bytes, id, addr"))]
    UnknownKind {
        /// The unsupported kind.
        kind: String,
    },

    /// The value does not parse as the requested kind.
    #[snafu(display("Invalid {kind} value '{value}': {message}"))]
    InvalidValue {
        /// The requested kind.
        kind: String,
        /// The raw value.
        value: String,
        /// Why parsing failed.
        message: String,
    },
}

impl CallArg {
    /// Converts the argument into a dynamic value for encoding.
    pub fn to_value(&self) -> Value {
        match self {
            CallArg::Bool(flag) => Value::bool(*flag),
            CallArg::U128(number) => Value::u128(*number),
            CallArg::I128(number) => Value::i128(*number),
            CallArg::Str(text) => Value::string(text.clone()),
            CallArg::Bytes(bytes) => Value::from_bytes(bytes),
            CallArg::AccountId(account) => Value::from_bytes(account.0),
            CallArg::MultiAddress(account) => {
                Value::unnamed_variant("Id", [Value::from_bytes(account.0)])
            }
        }
    }
}

impl FromStr for CallArg {
    type Err = CallArgError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (kind, value) = input.split_once(':').ok_or_else(|| CallArgError::MissingKind {
            input: input.to_string(),
        })?;

        let invalid = |message: String| CallArgError::InvalidValue {
            kind: kind.to_string(),
            value: value.to_string(),
            message,
        };

        match kind {
            "bool" => value.parse().map(CallArg::Bool).map_err(|e| invalid(e.to_string())),
            "u128" => value.parse().map(CallArg::U128).map_err(|e| invalid(e.to_string())),
            "i128" => value.parse().map(CallArg::I128).map_err(|e| invalid(e.to_string())),
            "str" => Ok(CallArg::Str(value.to_string())),
            "bytes" => Vec::from_hex(value.trim_start_matches("0x"))
                .map(CallArg::Bytes)
                .map_err(|e| invalid(e.to_string())),
            "id" => AccountId32::from_str(value)
                .map(CallArg::AccountId)
                .map_err(|e| invalid(e.to_string())),
            "addr" => AccountId32::from_str(value)
                .map(CallArg::MultiAddress)
                .map_err(|e| invalid(e.to_string())),
            _ => Err(CallArgError::UnknownKind {
                kind: kind.to_string(),
            }),
        }
    }
}

/// A pallet call with its arguments, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    /// Pallet name as it appears in the metadata, e.g. `Balances`.
    pub pallet: String,
    /// Call name, e.g. `transfer_keep_alive`.
    pub call: String,
    /// Ordered call arguments.
    pub args: Vec<CallArg>,
}

impl CallRequest {
    /// Creates a call request.
    pub fn new(pallet: impl Into<String>, call: impl Into<String>, args: Vec<CallArg>) -> Self {
        Self {
            pallet: pallet.into(),
            call: call.into(),
            args,
        }
    }

    /// The arguments as dynamic values.
    pub fn values(&self) -> Vec<Value> {
        self.args.iter().map(CallArg::to_value).collect()
    }
}

impl fmt::Display for CallRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.pallet, self.call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";

    #[test]
    fn we_can_parse_scalar_arguments() {
        assert_eq!("bool:true".parse::<CallArg>(), Ok(CallArg::Bool(true)));
        assert_eq!("u128:1000".parse::<CallArg>(), Ok(CallArg::U128(1000)));
        assert_eq!("i128:-5".parse::<CallArg>(), Ok(CallArg::I128(-5)));
        assert_eq!("str:a:b".parse::<CallArg>(), Ok(CallArg::Str("a:b".to_string())));
        assert_eq!("bytes:0x0102ff".parse::<CallArg>(), Ok(CallArg::Bytes(vec![1, 2, 255])));
    }

    #[test]
    fn we_can_parse_account_arguments() {
        let alice = AccountId32::from_str(ALICE).unwrap();

        assert_eq!(format!("id:{ALICE}").parse::<CallArg>(), Ok(CallArg::AccountId(alice.clone())));
        assert_eq!(format!("addr:{ALICE}").parse::<CallArg>(), Ok(CallArg::MultiAddress(alice)));
    }

    #[test]
    fn malformed_arguments_are_rejected() {
        assert_eq!(
            "1000".parse::<CallArg>(),
            Err(CallArgError::MissingKind {
                input: "1000".to_string()
            })
        );
        assert_eq!(
            "f64:1.5".parse::<CallArg>(),
            Err(CallArgError::UnknownKind {
                kind: "f64".to_string()
            })
        );
        assert!(matches!(
            "u128:lots".parse::<CallArg>(),
            Err(CallArgError::InvalidValue { .. })
        ));
        assert!(matches!(
            "bytes:0xzz".parse::<CallArg>(),
            Err(CallArgError::InvalidValue { .. })
        ));
    }

    #[test]
    fn call_requests_display_as_pallet_dot_call() {
        let call = CallRequest::new("Balances", "transfer_keep_alive", vec![CallArg::U128(1)]);

        assert_eq!(call.to_string(), "Balances.transfer_keep_alive");
        assert_eq!(call.values(), vec![Value::u128(1)]);
    }
}
