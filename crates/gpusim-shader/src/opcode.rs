use std::fmt;

macro_rules! opcodes {
    ($($variant:ident = $raw:literal => $name:literal,)*) => {
        /// Shader opcodes. Raw values that do not name an opcode decode to [`Opcode::Unknown`],
        /// which the engine logs and skips.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $($variant,)*
            Unknown(u8),
        }

        impl Opcode {
            pub fn from_raw(raw: u8) -> Self {
                match raw {
                    $($raw => Self::$variant,)*
                    other => Self::Unknown(other),
                }
            }

            #[deny(unreachable_patterns)]
            pub fn raw(&self) -> u8 {
                match self {
                    $(Self::$variant => $raw,)*
                    Self::Unknown(raw) => *raw,
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                    Self::Unknown(_) => "unknown",
                }
            }
        }
    };
}

opcodes! {
    // Unary vector.
    Abs = 0x00 => "ABS",
    Ceil = 0x01 => "CEIL",
    Flr = 0x02 => "FLR",
    Frc = 0x03 => "FRC",
    I2f = 0x04 => "I2F",
    Mov = 0x05 => "MOV",
    Round = 0x06 => "ROUND",
    Trunc = 0x07 => "TRUNC",
    // Unary scalar.
    Rcp = 0x10 => "RCP",
    Rsq = 0x11 => "RSQ",
    // Binary.
    Add = 0x20 => "ADD",
    And = 0x21 => "AND",
    Div = 0x22 => "DIV",
    Dp2 = 0x23 => "DP2",
    Dp3 = 0x24 => "DP3",
    Dp4 = 0x25 => "DP4",
    Dst = 0x26 => "DST",
    Max = 0x27 => "MAX",
    Min = 0x28 => "MIN",
    Mul = 0x29 => "MUL",
    Seq = 0x2a => "SEQ",
    Sge = 0x2b => "SGE",
    Sgt = 0x2c => "SGT",
    Sle = 0x2d => "SLE",
    Slt = 0x2e => "SLT",
    Sne = 0x2f => "SNE",
    Sub = 0x30 => "SUB",
    Pow = 0x31 => "POW",
    // Ternary.
    Dp2a = 0x40 => "DP2A",
    Mad = 0x41 => "MAD",
    // Texture.
    Tex = 0x50 => "TEX",
    Txd = 0x51 => "TXD",
    Txf = 0x52 => "TXF",
    Txl = 0x53 => "TXL",
    // Derivatives.
    Ddx = 0x60 => "DDX",
    Ddy = 0x61 => "DDY",
    // Flow control.
    If = 0x70 => "IF",
    Else = 0x71 => "ELSE",
    EndIf = 0x72 => "ENDIF",
    Rep = 0x73 => "REP",
    EndRep = 0x74 => "ENDREP",
    Kil = 0x75 => "KIL",
}

impl Opcode {
    pub fn is_texture(&self) -> bool {
        matches!(self, Self::Tex | Self::Txd | Self::Txf | Self::Txl)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(raw) => write!(f, "OP_{raw:#04x}"),
            other => f.write_str(other.name()),
        }
    }
}
