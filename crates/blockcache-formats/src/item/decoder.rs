//! Item definition decoding

use binrw::{BinRead, BinReaderExt};
use std::io::Cursor;

use super::definition::{ItemDefinition, Recolor, StackVariant, WornModel};
use super::error::{ItemError, ItemResult};
use super::opcode::{self, ATTENUATION_SCALE, HIDDEN_OPTION, STRING_TERMINATOR};
use super::FemaleModelLayout;

/// Reads one record starting at the cursor position
pub(crate) struct RecordReader<'a> {
    cursor: Cursor<&'a [u8]>,
    record: usize,
    layout: FemaleModelLayout,
}

impl<'a> RecordReader<'a> {
    pub(crate) fn new(data: &'a [u8], offset: u64, record: usize, layout: FemaleModelLayout) -> Self {
        let mut cursor = Cursor::new(data);
        cursor.set_position(offset);
        Self {
            cursor,
            record,
            layout,
        }
    }

    fn read<T>(&mut self) -> ItemResult<T>
    where
        T: for<'b> BinRead<Args<'b> = ()>,
    {
        let record = self.record;
        self.cursor.read_be::<T>().map_err(|e| {
            if e.is_eof() {
                ItemError::Truncated { record }
            } else {
                ItemError::BinRw(e)
            }
        })
    }

    fn read_u16(&mut self) -> ItemResult<u16> {
        self.read::<u16>()
    }

    fn read_string(&mut self) -> ItemResult<String> {
        let mut text = String::new();
        loop {
            let byte = self.read::<u8>()?;
            if byte == STRING_TERMINATOR {
                return Ok(text);
            }
            text.push(char::from(byte));
        }
    }

    /// Decode opcodes until the terminator.
    pub(crate) fn decode(mut self) -> ItemResult<ItemDefinition> {
        let mut def = ItemDefinition::default();

        loop {
            let op = self.read::<u8>()?;
            match op {
                opcode::TERMINATOR => return Ok(def),
                opcode::MODEL_ID => def.model_id = self.read_u16()?,
                opcode::NAME => def.name = self.read_string()?,
                opcode::EXAMINE => def.examine = self.read_string()?,
                opcode::ICON_ZOOM => def.icon_zoom = self.read_u16()?,
                opcode::ICON_PITCH => def.icon_pitch = self.read_u16()?,
                opcode::ICON_YAW => def.icon_yaw = self.read_u16()?,
                opcode::ICON_OFFSET_X => def.icon_offset_x = self.read::<i16>()?,
                opcode::ICON_OFFSET_Y => def.icon_offset_y = self.read::<i16>()?,
                opcode::UNUSED_10 => def.unused_10 = self.read_u16()?,
                opcode::STACKABLE => def.stackable = true,
                opcode::COST => def.cost = self.read::<i32>()?,
                opcode::MEMBERS => def.members = true,
                opcode::MALE_MODEL_0 => {
                    def.male_model_0 = Some(WornModel {
                        model_id: self.read_u16()?,
                        offset_y: self.read::<i8>()?,
                    });
                }
                opcode::MALE_MODEL_1 => def.male_model_1 = Some(self.read_u16()?),
                opcode::FEMALE_MODEL_0 => {
                    def.female_model_0 = Some(WornModel {
                        model_id: self.read_u16()?,
                        offset_y: self.read::<i8>()?,
                    });
                }
                opcode::FEMALE_MODEL_1 => {
                    if self.layout == FemaleModelLayout::Prefixed {
                        self.read_u16()?;
                    }
                    def.female_model_1 = Some(self.read_u16()?);
                }
                30..=34 => {
                    let text = self.read_string()?;
                    let slot = usize::from(op - opcode::GROUND_OPTION_FIRST);
                    def.ground_options[slot] =
                        (!text.eq_ignore_ascii_case(HIDDEN_OPTION)).then_some(text);
                }
                35..=39 => {
                    let slot = usize::from(op - opcode::INVENTORY_OPTION_FIRST);
                    def.inventory_options[slot] = Some(self.read_string()?);
                }
                opcode::RECOLOR => {
                    let count = self.read::<u8>()?;
                    let mut recolors = Vec::with_capacity(usize::from(count));
                    for _ in 0..count {
                        recolors.push(Recolor {
                            source: self.read_u16()?,
                            destination: self.read_u16()?,
                        });
                    }
                    def.recolors = Some(recolors);
                }
                opcode::MALE_MODEL_2 => def.male_model_2 = Some(self.read_u16()?),
                opcode::FEMALE_MODEL_2 => def.female_model_2 = Some(self.read_u16()?),
                opcode::MALE_HEAD_MODEL_0 => def.male_head_model_0 = Some(self.read_u16()?),
                opcode::FEMALE_HEAD_MODEL_0 => def.female_head_model_0 = Some(self.read_u16()?),
                opcode::MALE_HEAD_MODEL_1 => def.male_head_model_1 = Some(self.read_u16()?),
                opcode::FEMALE_HEAD_MODEL_1 => def.female_head_model_1 = Some(self.read_u16()?),
                opcode::ICON_ROLL => def.icon_roll = self.read_u16()?,
                opcode::LINKED_ID => def.linked_id = Some(self.read_u16()?),
                opcode::CERTIFICATE_ID => def.certificate_id = Some(self.read_u16()?),
                100..=109 => {
                    let slot = usize::from(op - opcode::STACK_VARIANT_FIRST);
                    def.stack_variants[slot] = Some(StackVariant {
                        item_id: self.read_u16()?,
                        count: self.read_u16()?,
                    });
                }
                opcode::SCALE_X => def.scale_x = self.read_u16()?,
                opcode::SCALE_Z => def.scale_z = self.read_u16()?,
                opcode::SCALE_Y => def.scale_y = self.read_u16()?,
                opcode::LIGHT_AMBIENT => def.light_ambient = self.read::<i8>()?,
                opcode::LIGHT_ATTENUATION => {
                    def.light_attenuation = i32::from(self.read::<i8>()?) * ATTENUATION_SCALE;
                }
                opcode::TEAM => def.team = self.read::<u8>()?,
                _ => {
                    return Err(ItemError::UnknownOpcode {
                        opcode: op,
                        record: self.record,
                    });
                }
            }
        }
    }
}

/// Compute each record's start offset from the index buffer.
///
/// Offsets are a running sum of record lengths, starting after the 2-byte
/// count that leads the data buffer.
pub(crate) fn record_offsets(index: &[u8]) -> ItemResult<Vec<u64>> {
    let truncated = |declared| ItemError::IndexTruncated {
        declared,
        available: index.len(),
    };

    let mut cursor = Cursor::new(index);
    let count: u16 = cursor.read_be().map_err(|_| truncated(0))?;

    let mut offsets = Vec::with_capacity(usize::from(count));
    let mut offset = 2u64;
    for _ in 0..count {
        offsets.push(offset);
        let len: u16 = cursor.read_be().map_err(|_| truncated(count))?;
        offset += u64::from(len);
    }
    Ok(offsets)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> ItemResult<ItemDefinition> {
        RecordReader::new(bytes, 0, 0, FemaleModelLayout::Plain).decode()
    }

    #[test]
    fn test_terminator_only() {
        assert_eq!(decode(&[0]).expect("decode"), ItemDefinition::default());
    }

    #[test]
    fn test_strings_and_flags() {
        let bytes = b"\x02Bronze axe\n\x03A woodcutter's axe.\n\x0b\x10\x00";
        let def = decode(bytes).expect("decode");
        assert_eq!(def.name, "Bronze axe");
        assert_eq!(def.examine, "A woodcutter's axe.");
        assert!(def.stackable);
        assert!(def.members);
    }

    #[test]
    fn test_negative_offsets_wrap() {
        let def = decode(&[7, 0xFF, 0xF6, 8, 0x80, 0x00, 0]).expect("decode");
        assert_eq!(def.icon_offset_x, -10);
        assert_eq!(def.icon_offset_y, i16::MIN);
    }

    #[test]
    fn test_hidden_ground_option_collapses() {
        let def = decode(b"\x1eTake\n\x1fHIDDEN\n\x23Wield\n\x00").expect("decode");
        assert_eq!(def.ground_options[0].as_deref(), Some("Take"));
        assert_eq!(def.ground_options[1], None);
        assert_eq!(def.inventory_options[0].as_deref(), Some("Wield"));
    }

    #[test]
    fn test_inventory_option_keeps_hidden_text() {
        let def = decode(b"\x24hidden\n\x00").expect("decode");
        assert_eq!(def.inventory_options[1].as_deref(), Some("hidden"));
    }

    #[test]
    fn test_attenuation_is_scaled() {
        let def = decode(&[114, 0xFE, 113, 0x9C, 0]).expect("decode");
        assert_eq!(def.light_attenuation, -10);
        assert_eq!(def.light_ambient, -100);
    }

    #[test]
    fn test_prefixed_female_model_layout() {
        let bytes = [26, 0x12, 0x34, 0x01, 0x02, 0];
        let def = RecordReader::new(&bytes, 0, 0, FemaleModelLayout::Prefixed)
            .decode()
            .expect("decode");
        assert_eq!(def.female_model_1, Some(0x0102));

        // Under the plain layout the model id bytes are read as opcode 1
        // and the record runs out before its terminator
        assert!(matches!(
            decode(&bytes),
            Err(ItemError::Truncated { record: 0 })
        ));
    }

    #[test]
    fn test_unknown_opcode_names_record() {
        let err = RecordReader::new(&[1, 0, 5, 9, 0], 0, 42, FemaleModelLayout::Plain)
            .decode()
            .unwrap_err();
        assert!(matches!(
            err,
            ItemError::UnknownOpcode {
                opcode: 9,
                record: 42
            }
        ));
        assert_eq!(err.to_string(), "unknown opcode 9 in item definition 42");
    }

    #[test]
    fn test_missing_terminator_is_truncated() {
        assert!(matches!(
            decode(&[1, 0, 5]),
            Err(ItemError::Truncated { record: 0 })
        ));
        assert!(matches!(
            decode(b"\x02no terminator"),
            Err(ItemError::Truncated { record: 0 })
        ));
    }

    #[test]
    fn test_record_offsets() {
        let index = [0, 3, 0, 4, 0, 1, 0, 10];
        assert_eq!(record_offsets(&index).expect("offsets"), vec![2, 6, 7]);
        assert!(matches!(
            record_offsets(&index[..5]),
            Err(ItemError::IndexTruncated { declared: 3, .. })
        ));
    }
}
