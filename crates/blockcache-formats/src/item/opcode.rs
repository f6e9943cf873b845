//! Item definition opcodes
//!
//! | Opcode | Attribute | Operand |
//! |--------|-----------|---------|
//! | 0 | end of record | none |
//! | 1 | model id | u16 |
//! | 2, 3 | name, examine text | string |
//! | 4, 5, 6 | icon zoom, pitch, yaw | u16 |
//! | 7, 8 | icon offset x, y | i16 |
//! | 10 | unused | u16 |
//! | 11 | stackable | none |
//! | 12 | cost | i32 |
//! | 16 | members only | none |
//! | 23, 25 | male/female worn model 0 | u16 + i8 y-offset |
//! | 24 | male worn model 1 | u16 |
//! | 26 | female worn model 1 | u16, optionally after an unused u16 |
//! | 30-34 | ground options | string, "hidden" = no option |
//! | 35-39 | inventory options | string |
//! | 40 | recolor table | u8 count, count x (u16, u16) |
//! | 78, 79 | male/female worn model 2 | u16 |
//! | 90-93 | head models (male 0, female 0, male 1, female 1) | u16 |
//! | 95 | icon roll | u16 |
//! | 97 | linked template id | u16 |
//! | 98 | certificate id | u16 |
//! | 100-109 | stack variants | (u16 id, u16 count) |
//! | 110, 111, 112 | scale x, z, y | u16 |
//! | 113 | ambient light | i8 |
//! | 114 | light attenuation / 5 | i8 |
//! | 115 | team | u8 |
//!
//! Strings are Latin-1 bytes terminated by `0x0A`.

#![allow(missing_docs)]

pub const TERMINATOR: u8 = 0;
pub const MODEL_ID: u8 = 1;
pub const NAME: u8 = 2;
pub const EXAMINE: u8 = 3;
pub const ICON_ZOOM: u8 = 4;
pub const ICON_PITCH: u8 = 5;
pub const ICON_YAW: u8 = 6;
pub const ICON_OFFSET_X: u8 = 7;
pub const ICON_OFFSET_Y: u8 = 8;
pub const UNUSED_10: u8 = 10;
pub const STACKABLE: u8 = 11;
pub const COST: u8 = 12;
pub const MEMBERS: u8 = 16;
pub const MALE_MODEL_0: u8 = 23;
pub const MALE_MODEL_1: u8 = 24;
pub const FEMALE_MODEL_0: u8 = 25;
pub const FEMALE_MODEL_1: u8 = 26;
pub const GROUND_OPTION_FIRST: u8 = 30;
pub const INVENTORY_OPTION_FIRST: u8 = 35;
pub const RECOLOR: u8 = 40;
pub const MALE_MODEL_2: u8 = 78;
pub const FEMALE_MODEL_2: u8 = 79;
pub const MALE_HEAD_MODEL_0: u8 = 90;
pub const FEMALE_HEAD_MODEL_0: u8 = 91;
pub const MALE_HEAD_MODEL_1: u8 = 92;
pub const FEMALE_HEAD_MODEL_1: u8 = 93;
pub const ICON_ROLL: u8 = 95;
pub const LINKED_ID: u8 = 97;
pub const CERTIFICATE_ID: u8 = 98;
pub const STACK_VARIANT_FIRST: u8 = 100;
pub const SCALE_X: u8 = 110;
pub const SCALE_Z: u8 = 111;
pub const SCALE_Y: u8 = 112;
pub const LIGHT_AMBIENT: u8 = 113;
pub const LIGHT_ATTENUATION: u8 = 114;
pub const TEAM: u8 = 115;

/// Number of ground and inventory option slots.
pub const OPTION_SLOTS: usize = 5;

/// Number of stack variant slots.
pub const STACK_VARIANT_SLOTS: usize = 10;

/// Byte terminating every string operand.
pub const STRING_TERMINATOR: u8 = 0x0A;

/// Ground option text that means "no option".
pub const HIDDEN_OPTION: &str = "hidden";

/// Attenuation is stored divided by this factor.
pub const ATTENUATION_SCALE: i32 = 5;
