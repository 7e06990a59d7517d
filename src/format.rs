//! Genmon fragment rendering.
//!
//! The generic monitor plugin reads a handful of pseudo-XML tags from the
//! program's stdout:
//!
//! ```text
//! <img>ICON_PATH</img>
//! <txt>LINE1
//! LINE2</txt>
//! <tool>TOOLTIP</tool>
//! <bar>PERCENT</bar>
//! ```
//!
//! Everything here is pure: values in, text out.

use std::fmt;
use std::path::PathBuf;

/// Usage percentage breakpoints for the warning, elevated and critical tiers.
pub const PERCENT_BANDS: [f32; 3] = [50.0, 75.0, 90.0];

const GIB: f64 = 1_073_741_824.0;

/// One complete genmon output.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fragment {
    pub icon: Option<PathBuf>,
    pub text: String,
    pub tool: String,
    pub bar: Option<u8>,
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(icon) = &self.icon {
            writeln!(f, "<img>{}</img>", icon.display())?;
        }
        writeln!(f, "<txt>{}</txt>", self.text)?;
        writeln!(f, "<tool>{}</tool>", self.tool)?;
        if let Some(bar) = self.bar {
            writeln!(f, "<bar>{bar}</bar>")?;
        }
        Ok(())
    }
}

/// Temperature display unit; readings are always sampled in Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TempUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TempUnit {
    pub fn from_fahrenheit_flag(fahrenheit: bool) -> Self {
        if fahrenheit {
            TempUnit::Fahrenheit
        } else {
            TempUnit::Celsius
        }
    }

    pub fn convert(&self, celsius: f32) -> f32 {
        match self {
            TempUnit::Celsius => celsius,
            TempUnit::Fahrenheit => celsius * 1.8 + 32.0,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            TempUnit::Celsius => 'C',
            TempUnit::Fahrenheit => 'F',
        }
    }
}

/// Visual emphasis tier of a reading in rich-markup mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Normal,
    Warning,
    Elevated,
    Critical,
}

impl Severity {
    /// Tier of `value` given ascending breakpoints.
    pub fn classify(value: f32, bands: [f32; 3]) -> Self {
        if value >= bands[2] {
            Severity::Critical
        } else if value >= bands[1] {
            Severity::Elevated
        } else if value >= bands[0] {
            Severity::Warning
        } else {
            Severity::Normal
        }
    }

    /// Tier of a Celsius-banded temperature shown in `unit`.
    pub fn classify_temp(value: f32, celsius_bands: [f32; 3], unit: TempUnit) -> Self {
        Self::classify(value, celsius_bands.map(|b| unit.convert(b)))
    }

    /// Wraps `text` in Pango markup for this tier.
    pub fn render(&self, text: &str) -> String {
        match self {
            Severity::Normal => text.to_string(),
            Severity::Warning => format!("<span fgcolor='#E5C07B'>{text}</span>"),
            Severity::Elevated => format!("<span fgcolor='#D19A66' weight='bold'>{text}</span>"),
            Severity::Critical => {
                format!("<span fgcolor='#E06C75' weight='heavy'>{text}</span>")
            }
        }
    }
}

/// Percentage cell: `NN%` below 100, `100` at full load.
pub fn percent_cell(percent: u8) -> String {
    if percent < 100 {
        format!("{percent:2}%")
    } else {
        "100".to_string()
    }
}

/// Right-aligns `text` to `width` bytes rather than chars, as printf's `%8s`
/// does.
pub fn pad_bytes(text: &str, width: usize) -> String {
    format!("{}{text}", " ".repeat(width.saturating_sub(text.len())))
}

/// Bytes as GiB.
pub fn gib(bytes: u64) -> f64 {
    bytes as f64 / GIB
}

/// GiB figure with one decimal, or none once it no longer fits.
pub fn gib_compact(value: f64) -> String {
    if value > 100.0 {
        format!("{}", value as u64)
    } else {
        format!("{value:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_tags() {
        let frag = Fragment {
            icon: Some(PathBuf::from("/home/u/.genmon-icon/meminfo.png")),
            text: "a\nb".into(),
            tool: "tip".into(),
            bar: Some(42),
        };
        assert_eq!(
            frag.to_string(),
            "<img>/home/u/.genmon-icon/meminfo.png</img>\n<txt>a\nb</txt>\n<tool>tip</tool>\n<bar>42</bar>\n"
        );

        let bare = Fragment {
            text: "x".into(),
            tool: "y".into(),
            ..Fragment::default()
        };
        assert_eq!(bare.to_string(), "<txt>x</txt>\n<tool>y</tool>\n");
    }

    #[test]
    fn test_temperature_units() {
        let f = TempUnit::Fahrenheit;
        assert_eq!(f.convert(100.0), 212.0);
        assert_eq!(f.symbol(), 'F');
        assert_eq!(TempUnit::Celsius.convert(37.5), 37.5);
    }

    #[test]
    fn test_severity_tiers() {
        let bands = [55.0, 70.0, 85.0];
        assert_eq!(Severity::classify(20.0, bands), Severity::Normal);
        assert_eq!(Severity::classify(55.0, bands), Severity::Warning);
        assert_eq!(Severity::classify(84.9, bands), Severity::Elevated);
        assert_eq!(Severity::classify(99.0, bands), Severity::Critical);
    }

    #[test]
    fn test_fahrenheit_bands_follow_unit() {
        let bands = [55.0, 70.0, 85.0];
        // 60°C is a warning; 140°F is the same reading
        assert_eq!(
            Severity::classify_temp(140.0, bands, TempUnit::Fahrenheit),
            Severity::Warning
        );
        // 140 on a Celsius scale is critical
        assert_eq!(
            Severity::classify_temp(140.0, bands, TempUnit::Celsius),
            Severity::Critical
        );
    }

    #[test]
    fn test_render_markup() {
        assert_eq!(Severity::Normal.render("42%"), "42%");
        assert!(Severity::Critical.render("99%").starts_with("<span"));
        assert!(Severity::Critical.render("99%").contains(">99%</span>"));
    }

    #[test]
    fn test_cells() {
        assert_eq!(percent_cell(5), " 5%");
        assert_eq!(percent_cell(90), "90%");
        assert_eq!(percent_cell(100), "100");
        assert_eq!(gib_compact(12.345), "12.3");
        assert_eq!(gib_compact(1234.9), "1234");
        assert_eq!(gib(1_073_741_824 * 2), 2.0);
        assert_eq!(pad_bytes("45.5°C", 8), " 45.5°C");
        assert_eq!(pad_bytes("212.0°F", 8), "212.0°F");
        assert_eq!(pad_bytes("1234.5°C", 8), "1234.5°C");
    }
}
