//! A `Locator` addresses one record inside a segmented append-only store:
//! which segment file, at what byte offset, how many bytes long.

/// The position of one record within a [`crate::block_store::SegmentedStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Locator {
    pub segment: u32,
    pub offset: u64,
    pub length: u32,
}

impl thunderbolt_chain::codec::Encode for Locator {
    fn encode<W: std::io::Write>(&self, mut writer: W) -> std::io::Result<()> {
        use thunderbolt_chain::codec::Encode;
        self.segment.encode(&mut writer)?;
        self.offset.encode(&mut writer)?;
        self.length.encode(&mut writer)
    }
}

impl thunderbolt_chain::codec::Decode for Locator {
    fn decode<R: std::io::Read>(mut reader: R) -> Result<Self, thunderbolt_chain::codec::CodecError> {
        use thunderbolt_chain::codec::Decode;
        Ok(Locator {
            segment: u32::decode(&mut reader)?,
            offset: u64::decode(&mut reader)?,
            length: u32::decode(&mut reader)?,
        })
    }
}
