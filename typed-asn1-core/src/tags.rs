//! Universal class tag numbers (ITU-T X.680 §8.4)

pub const END_OF_CONTENTS: u32 = 0;
pub const BOOLEAN: u32 = 1;
pub const INTEGER: u32 = 2;
pub const BIT_STRING: u32 = 3;
pub const OCTET_STRING: u32 = 4;
pub const NULL: u32 = 5;
pub const OBJECT_IDENTIFIER: u32 = 6;
pub const ENUMERATED: u32 = 10;
pub const UTF8_STRING: u32 = 12;
pub const SEQUENCE: u32 = 16;
pub const SET: u32 = 17;
pub const PRINTABLE_STRING: u32 = 19;
pub const IA5_STRING: u32 = 22;
pub const UTC_TIME: u32 = 23;
pub const GENERALIZED_TIME: u32 = 24;

/// Human readable name of a universal tag, used in error messages
pub fn universal_name(number: u32) -> Option<&'static str> {
    let name = match number {
        END_OF_CONTENTS => "END-OF-CONTENTS",
        BOOLEAN => "BOOLEAN",
        INTEGER => "INTEGER",
        BIT_STRING => "BIT STRING",
        OCTET_STRING => "OCTET STRING",
        NULL => "NULL",
        OBJECT_IDENTIFIER => "OBJECT IDENTIFIER",
        ENUMERATED => "ENUMERATED",
        UTF8_STRING => "UTF8String",
        SEQUENCE => "SEQUENCE",
        SET => "SET",
        PRINTABLE_STRING => "PrintableString",
        IA5_STRING => "IA5String",
        UTC_TIME => "UTCTime",
        GENERALIZED_TIME => "GeneralizedTime",
        _ => return None,
    };
    Some(name)
}
