use serde::{Serialize, Serializer};

/// Display color for a detection box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#RRGGBB`.
    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn to_rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.hex())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex())
    }
}

pub const PRIMARY: Color = Color::rgb(0x00, 0x77, 0xB6);
pub const SECONDARY: Color = Color::rgb(0x00, 0xB4, 0xD8);
pub const SUCCESS: Color = Color::rgb(0x2F, 0xAD, 0x87);
pub const WARNING: Color = Color::rgb(0xFF, 0xC4, 0x3D);
pub const ERROR: Color = Color::rgb(0xEF, 0x47, 0x6F);

/// Color for any class missing from the table.
pub const DEFAULT_COLOR: Color = PRIMARY;

/// Sentinel class for predictions that arrive without a label.
pub const UNKNOWN_CLASS: &str = "Unknown";

/// Parasite species the screening model reports.
pub const PARASITE_CLASSES: [&str; 4] = ["P. falciparum", "P. vivax", "P. ovale", "P. malariae"];

const CLASS_COLORS: [(&str, Color); 4] = [
    ("P. falciparum", ERROR),
    ("P. vivax", WARNING),
    ("P. ovale", PRIMARY),
    ("P. malariae", SECONDARY),
];

/// Resolves a class label to its display color. Total: unmapped classes get
/// `DEFAULT_COLOR`.
pub fn color_for_class(class: &str) -> Color {
    CLASS_COLORS
        .iter()
        .find(|(name, _)| *name == class)
        .map(|(_, color)| *color)
        .unwrap_or(DEFAULT_COLOR)
}
