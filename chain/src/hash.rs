//! A macro for the two identically-shaped 32-byte hash newtypes
//! (`block::Hash`, `transaction::Hash`): fixed-size, big-endian-serialized,
//! displayed and parsed as plain lower-case hex with no byte reversal.

#[macro_export]
macro_rules! define_hash {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
        #[cfg_attr(any(test, feature = "proptest-impl"), derive(proptest_derive::Arbitrary))]
        pub struct $name(pub [u8; 32]);

        impl $name {
            pub const fn from_bytes(bytes: [u8; 32]) -> Self {
                $name(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }
        }

        impl $crate::codec::Encode for $name {
            fn encode<W: std::io::Write>(&self, writer: W) -> std::io::Result<()> {
                self.0.encode(writer)
            }
        }

        impl $crate::codec::Decode for $name {
            fn decode<R: std::io::Read>(reader: R) -> Result<Self, $crate::codec::CodecError> {
                Ok($name(<[u8; 32]>::decode(reader)?))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.to_string()).finish()
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::codec::CodecError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let mut bytes = [0u8; 32];
                hex::decode_to_slice(s, &mut bytes)
                    .map_err(|_| $crate::codec::CodecError::Parse("invalid hex hash"))?;
                Ok($name(bytes))
            }
        }
    };
}
