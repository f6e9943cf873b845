//! Item definition encoding

use binrw::{BinWrite, BinWriterExt};
use std::io::Cursor;

use super::FemaleModelLayout;
use super::definition::ItemDefinition;
use super::error::{ItemError, ItemResult};
use super::opcode::{self, ATTENUATION_SCALE, STRING_TERMINATOR};

/// Writes one record as an opcode stream
pub(crate) struct RecordWriter {
    cursor: Cursor<Vec<u8>>,
    record: usize,
    layout: FemaleModelLayout,
}

impl RecordWriter {
    pub(crate) fn new(record: usize, layout: FemaleModelLayout) -> Self {
        Self {
            cursor: Cursor::new(Vec::new()),
            record,
            layout,
        }
    }

    fn write<T>(&mut self, value: &T) -> ItemResult<()>
    where
        T: for<'a> BinWrite<Args<'a> = ()>,
    {
        self.cursor.write_be(value)?;
        Ok(())
    }

    fn write_string(&mut self, text: &str) -> ItemResult<()> {
        let mut bytes = Vec::with_capacity(text.len() + 1);
        for c in text.chars() {
            match u8::try_from(u32::from(c)) {
                Ok(b) if b != STRING_TERMINATOR => bytes.push(b),
                _ => {
                    return Err(ItemError::InvalidText {
                        record: self.record,
                        text: text.to_string(),
                    });
                }
            }
        }
        bytes.push(STRING_TERMINATOR);
        self.write(&bytes)
    }

    fn out_of_range(&self, field: &'static str, value: i64) -> ItemError {
        ItemError::ValueOutOfRange {
            record: self.record,
            field,
            value,
        }
    }

    fn attenuation_operand(&self, value: i32) -> ItemResult<i8> {
        if value % ATTENUATION_SCALE != 0 {
            return Err(self.out_of_range("light_attenuation", i64::from(value)));
        }
        i8::try_from(value / ATTENUATION_SCALE)
            .map_err(|_| self.out_of_range("light_attenuation", i64::from(value)))
    }

    /// Encode every non-default attribute followed by the terminator.
    pub(crate) fn encode(mut self, def: &ItemDefinition) -> ItemResult<Vec<u8>> {
        for op in def.opcodes() {
            self.write(&op)?;
            match op {
                opcode::MODEL_ID => self.write(&def.model_id)?,
                opcode::NAME => self.write_string(&def.name)?,
                opcode::EXAMINE => self.write_string(&def.examine)?,
                opcode::ICON_ZOOM => self.write(&def.icon_zoom)?,
                opcode::ICON_PITCH => self.write(&def.icon_pitch)?,
                opcode::ICON_YAW => self.write(&def.icon_yaw)?,
                opcode::ICON_OFFSET_X => self.write(&def.icon_offset_x)?,
                opcode::ICON_OFFSET_Y => self.write(&def.icon_offset_y)?,
                opcode::UNUSED_10 => self.write(&def.unused_10)?,
                opcode::COST => self.write(&def.cost)?,
                opcode::MALE_MODEL_0 | opcode::FEMALE_MODEL_0 => {
                    let worn = if op == opcode::MALE_MODEL_0 {
                        def.male_model_0
                    } else {
                        def.female_model_0
                    };
                    if let Some(worn) = worn {
                        self.write(&worn.model_id)?;
                        self.write(&worn.offset_y)?;
                    }
                }
                opcode::FEMALE_MODEL_1 => {
                    if self.layout == FemaleModelLayout::Prefixed {
                        self.write(&0u16)?;
                    }
                    self.write_model(def.female_model_1)?;
                }
                30..=34 => {
                    let slot = usize::from(op - opcode::GROUND_OPTION_FIRST);
                    self.write_string(def.ground_options[slot].as_deref().unwrap_or_default())?;
                }
                35..=39 => {
                    let slot = usize::from(op - opcode::INVENTORY_OPTION_FIRST);
                    self.write_string(def.inventory_options[slot].as_deref().unwrap_or_default())?;
                }
                opcode::RECOLOR => {
                    let recolors = def.recolors.as_deref().unwrap_or_default();
                    let count =
                        u8::try_from(recolors.len()).map_err(|_| ItemError::RecolorTableTooLarge {
                            record: self.record,
                            len: recolors.len(),
                        })?;
                    self.write(&count)?;
                    for recolor in recolors {
                        self.write(&recolor.source)?;
                        self.write(&recolor.destination)?;
                    }
                }
                opcode::MALE_MODEL_1 => self.write_model(def.male_model_1)?,
                opcode::MALE_MODEL_2 => self.write_model(def.male_model_2)?,
                opcode::FEMALE_MODEL_2 => self.write_model(def.female_model_2)?,
                opcode::MALE_HEAD_MODEL_0 => self.write_model(def.male_head_model_0)?,
                opcode::FEMALE_HEAD_MODEL_0 => self.write_model(def.female_head_model_0)?,
                opcode::MALE_HEAD_MODEL_1 => self.write_model(def.male_head_model_1)?,
                opcode::FEMALE_HEAD_MODEL_1 => self.write_model(def.female_head_model_1)?,
                opcode::ICON_ROLL => self.write(&def.icon_roll)?,
                opcode::LINKED_ID => self.write_model(def.linked_id)?,
                opcode::CERTIFICATE_ID => self.write_model(def.certificate_id)?,
                100..=109 => {
                    let slot = usize::from(op - opcode::STACK_VARIANT_FIRST);
                    if let Some(variant) = def.stack_variants[slot] {
                        self.write(&variant.item_id)?;
                        self.write(&variant.count)?;
                    }
                }
                opcode::SCALE_X => self.write(&def.scale_x)?,
                opcode::SCALE_Z => self.write(&def.scale_z)?,
                opcode::SCALE_Y => self.write(&def.scale_y)?,
                opcode::LIGHT_AMBIENT => self.write(&def.light_ambient)?,
                opcode::LIGHT_ATTENUATION => {
                    let operand = self.attenuation_operand(def.light_attenuation)?;
                    self.write(&operand)?;
                }
                opcode::TEAM => self.write(&def.team)?,
                // stackable, members: flag only
                _ => {}
            }
        }

        self.write(&opcode::TERMINATOR)?;
        Ok(self.cursor.into_inner())
    }

    fn write_model(&mut self, value: Option<u16>) -> ItemResult<()> {
        match value {
            Some(id) => self.write(&id),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::item::definition::{Recolor, WornModel};
    use pretty_assertions::assert_eq;

    fn encode(def: &ItemDefinition) -> ItemResult<Vec<u8>> {
        RecordWriter::new(0, FemaleModelLayout::Plain).encode(def)
    }

    #[test]
    fn test_default_is_terminator_only() {
        assert_eq!(encode(&ItemDefinition::default()).expect("encode"), vec![0]);
    }

    #[test]
    fn test_operand_layout() {
        let def = ItemDefinition {
            model_id: 0x0102,
            name: "Axe".to_string(),
            stackable: true,
            cost: -2,
            male_model_0: Some(WornModel {
                model_id: 0x0A0B,
                offset_y: -1,
            }),
            recolors: Some(vec![Recolor {
                source: 1,
                destination: 2,
            }]),
            light_attenuation: 25,
            ..ItemDefinition::default()
        };

        let expected = [
            1, 0x01, 0x02, // model id
            2, b'A', b'x', b'e', 0x0A, // name
            11, // stackable
            12, 0xFF, 0xFF, 0xFF, 0xFE, // cost
            23, 0x0A, 0x0B, 0xFF, // male model 0
            40, 1, 0, 1, 0, 2, // recolors
            114, 5, // attenuation / 5
            0,
        ];
        assert_eq!(encode(&def).expect("encode"), expected.to_vec());
    }

    #[test]
    fn test_prefixed_female_model_writes_zero_prefix() {
        let def = ItemDefinition {
            female_model_1: Some(7),
            ..ItemDefinition::default()
        };
        let bytes = RecordWriter::new(0, FemaleModelLayout::Prefixed)
            .encode(&def)
            .expect("encode");
        assert_eq!(bytes, vec![26, 0, 0, 0, 7, 0]);
    }

    #[test]
    fn test_latin1_text() {
        let def = ItemDefinition::default().with_name("Caf\u{e9}");
        assert_eq!(
            encode(&def).expect("encode"),
            vec![2, b'C', b'a', b'f', 0xE9, 0x0A, 0]
        );
    }

    #[test]
    fn test_rejects_unencodable_text() {
        let newline = ItemDefinition::default().with_name("two\nlines");
        assert!(matches!(
            encode(&newline),
            Err(ItemError::InvalidText { .. })
        ));

        let wide = ItemDefinition::default().with_examine("\u{263A}");
        assert!(matches!(encode(&wide), Err(ItemError::InvalidText { .. })));
    }

    #[test]
    fn test_rejects_oversized_recolor_table() {
        let def = ItemDefinition {
            recolors: Some(vec![
                Recolor {
                    source: 0,
                    destination: 0,
                };
                256
            ]),
            ..ItemDefinition::default()
        };
        assert!(matches!(
            encode(&def),
            Err(ItemError::RecolorTableTooLarge { len: 256, .. })
        ));
    }

    #[test]
    fn test_attenuation_range() {
        for bad in [3, 640, -645] {
            let def = ItemDefinition {
                light_attenuation: bad,
                ..ItemDefinition::default()
            };
            assert!(
                matches!(encode(&def), Err(ItemError::ValueOutOfRange { .. })),
                "attenuation {bad} accepted"
            );
        }

        let def = ItemDefinition {
            light_attenuation: -640,
            ..ItemDefinition::default()
        };
        assert_eq!(encode(&def).expect("encode"), vec![114, 0x80, 0]);
    }

    #[test]
    fn test_empty_recolor_table_is_kept() {
        let def = ItemDefinition {
            recolors: Some(Vec::new()),
            ..ItemDefinition::default()
        };
        assert_eq!(encode(&def).expect("encode"), vec![40, 0, 0]);
    }
}
