use std::{fmt, str::FromStr};

pub const ANSI_RESET: &str = "\u{1b}[0m";

/// Display value of a cell. Stored remotely as its upper-case ASCII name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    Reset,
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Purple,
    Cyan,
    /// The "empty" value of a cell that was never written.
    #[default]
    White,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown color {0:?}")]
pub struct UnknownColor(pub String);

impl Color {
    pub const ALL: [Color; 9] = [
        Color::Reset,
        Color::Black,
        Color::Red,
        Color::Green,
        Color::Yellow,
        Color::Blue,
        Color::Purple,
        Color::Cyan,
        Color::White,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Reset => "RESET",
            Color::Black => "BLACK",
            Color::Red => "RED",
            Color::Green => "GREEN",
            Color::Yellow => "YELLOW",
            Color::Blue => "BLUE",
            Color::Purple => "PURPLE",
            Color::Cyan => "CYAN",
            Color::White => "WHITE",
        }
    }

    pub fn ansi_code(&self) -> &'static str {
        match self {
            Color::Reset => ANSI_RESET,
            Color::Black => "\u{1b}[30m",
            Color::Red => "\u{1b}[31m",
            Color::Green => "\u{1b}[32m",
            Color::Yellow => "\u{1b}[33m",
            Color::Blue => "\u{1b}[34m",
            Color::Purple => "\u{1b}[35m",
            Color::Cyan => "\u{1b}[36m",
            Color::White => "\u{1b}[37m",
        }
    }

    pub fn paint(&self, content: &str) -> String {
        format!("{}{content}{ANSI_RESET}", self.ansi_code())
    }

    pub fn to_bytes(self) -> Vec<u8> {
        self.as_str().as_bytes().to_vec()
    }

    /// Decodes a cell payload. Absent or unrecognised payloads read as the empty color.
    pub fn from_payload(data: Option<&[u8]>) -> Color {
        let Some(data) = data else { return Color::default() };
        match std::str::from_utf8(data).map(str::parse::<Color>) {
            Ok(Ok(color)) => color,
            _ => {
                tracing::warn!(payload = %String::from_utf8_lossy(data), "unrecognised cell payload");
                Color::default()
            }
        }
    }
}

impl FromStr for Color {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_uppercase();
        Color::ALL.into_iter()
            .find(|color| color.as_str() == name)
            .ok_or(UnknownColor(s.trim().to_string()))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
