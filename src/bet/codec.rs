//! TLV encode/decode for bet records
//!
//! Encoding writes the five fields in a fixed order. Decoding is
//! order-independent: whichever tags appear populate the matching fields,
//! and fields absent from the byte stream stay empty.

use super::{Bet, CodecError, FieldTag};
use byteorder::{BigEndian, ByteOrder};

impl Bet {
    /// Serialize this bet as five TLV entries in tag order.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::with_capacity(self.encoded_len_hint());
        write_field(&mut buf, FieldTag::FirstName, &self.first_name)?;
        write_field(&mut buf, FieldTag::LastName, &self.last_name)?;
        write_field(&mut buf, FieldTag::Document, &self.document)?;
        write_field(&mut buf, FieldTag::BirthDate, &self.birth_date)?;
        write_field(&mut buf, FieldTag::Number, &self.number)?;
        Ok(buf)
    }

    /// Deserialize a bet from a sequence of TLV entries.
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let mut bet = Bet::default();
        let mut offset = 0;

        while offset < data.len() {
            // Tag byte plus the two length bytes must fit before the value
            if offset + 3 > data.len() {
                return Err(CodecError::Truncated { offset });
            }
            let tag_byte = data[offset];
            let length = BigEndian::read_u16(&data[offset + 1..offset + 3]) as usize;
            offset += 3;

            if offset + length > data.len() {
                return Err(CodecError::LengthMismatch {
                    declared: length,
                    available: data.len() - offset,
                });
            }
            let value = std::str::from_utf8(&data[offset..offset + length])?.to_string();
            offset += length;

            let tag =
                FieldTag::try_from(tag_byte).map_err(|_| CodecError::UnknownTag(tag_byte))?;
            match tag {
                FieldTag::FirstName => bet.first_name = value,
                FieldTag::LastName => bet.last_name = value,
                FieldTag::Document => bet.document = value,
                FieldTag::BirthDate => bet.birth_date = value,
                FieldTag::Number => bet.number = value,
            }
        }

        Ok(bet)
    }

    fn encoded_len_hint(&self) -> usize {
        3 * 5
            + self.first_name.len()
            + self.last_name.len()
            + self.document.len()
            + self.birth_date.len()
            + self.number.len()
    }
}

fn write_field(buf: &mut Vec<u8>, tag: FieldTag, value: &str) -> Result<(), CodecError> {
    let data = value.as_bytes();
    if data.len() > u16::MAX as usize {
        return Err(CodecError::FieldTooLong {
            tag,
            len: data.len(),
        });
    }
    buf.push(tag as u8);
    let mut len_bytes = [0u8; 2];
    BigEndian::write_u16(&mut len_bytes, data.len() as u16);
    buf.extend_from_slice(&len_bytes);
    buf.extend_from_slice(data);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bet() -> Bet {
        Bet {
            first_name: "Santiago Lionel".to_string(),
            last_name: "Lorca".to_string(),
            document: "30904465".to_string(),
            birth_date: "1999-03-17".to_string(),
            number: "7574".to_string(),
        }
    }

    #[test]
    fn encode_decode_round_trip() {
        let bet = sample_bet();
        let encoded = bet.encode().unwrap();
        let decoded = Bet::decode(&encoded).unwrap();
        assert_eq!(decoded, bet);
    }

    #[test]
    fn encode_writes_fields_in_tag_order() {
        let encoded = sample_bet().encode().unwrap();
        // First entry: tag 1, length 15, "Santiago Lionel"
        assert_eq!(encoded[0], FieldTag::FirstName as u8);
        assert_eq!(BigEndian::read_u16(&encoded[1..3]), 15);
        assert_eq!(&encoded[3..18], b"Santiago Lionel");
        assert_eq!(encoded[18], FieldTag::LastName as u8);
    }

    #[test]
    fn decode_is_order_independent() {
        // Number first, then document; remaining fields stay empty
        let mut data = Vec::new();
        write_field(&mut data, FieldTag::Number, "1234").unwrap();
        write_field(&mut data, FieldTag::Document, "99").unwrap();

        let bet = Bet::decode(&data).unwrap();
        assert_eq!(bet.number, "1234");
        assert_eq!(bet.document, "99");
        assert_eq!(bet.first_name, "");
        assert_eq!(bet.birth_date, "");
    }

    #[test]
    fn decode_empty_buffer_yields_default_bet() {
        assert_eq!(Bet::decode(&[]).unwrap(), Bet::default());
    }

    #[test]
    fn oversized_field_fails_to_encode() {
        let bet = Bet {
            number: "9".repeat(70_000),
            ..sample_bet()
        };
        assert!(matches!(
            bet.encode(),
            Err(CodecError::FieldTooLong {
                tag: FieldTag::Number,
                ..
            })
        ));
    }

    #[test]
    fn truncated_header_fails() {
        // Tag byte with only one length byte behind it
        let err = Bet::decode(&[1, 0]).unwrap_err();
        assert!(matches!(err, CodecError::Truncated { offset: 0 }));
    }

    #[test]
    fn declared_length_beyond_buffer_fails() {
        // Tag 1, declared length 10, only 2 value bytes present
        let data = [1u8, 0, 10, b'a', b'b'];
        assert!(matches!(
            Bet::decode(&data),
            Err(CodecError::LengthMismatch {
                declared: 10,
                available: 2
            })
        ));
    }

    #[test]
    fn unknown_tag_fails() {
        let data = [9u8, 0, 1, b'x'];
        assert!(matches!(Bet::decode(&data), Err(CodecError::UnknownTag(9))));
    }
}
