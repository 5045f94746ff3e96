//! Document presentation vocabulary shared by company profiles and the renderer.
//!
//! Templates and paper sizes are closed enums rather than free-form strings:
//! unknown values fail at the parse boundary instead of silently defaulting.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Visual document template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    #[default]
    Classic,
    Modern,
    Minimal,
}

impl Template {
    pub fn as_str(&self) -> &'static str {
        match self {
            Template::Classic => "classic",
            Template::Modern => "modern",
            Template::Minimal => "minimal",
        }
    }

    pub const ALL: [Template; 3] = [Template::Classic, Template::Modern, Template::Minimal];
}

impl FromStr for Template {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classic" => Ok(Template::Classic),
            "modern" => Ok(Template::Modern),
            "minimal" => Ok(Template::Minimal),
            other => Err(DomainError::validation(
                "template",
                format!("unknown template '{other}' (expected classic, modern, or minimal)"),
            )),
        }
    }
}

impl core::fmt::Display for Template {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical paper size; drives page layout dimensions only, never content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperSize {
    #[default]
    UsLetter,
    A4,
}

impl PaperSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaperSize::UsLetter => "us_letter",
            PaperSize::A4 => "a4",
        }
    }

    /// Page dimensions as CSS lengths (width, height).
    pub fn css_dimensions(&self) -> (&'static str, &'static str) {
        match self {
            PaperSize::UsLetter => ("8.5in", "11in"),
            PaperSize::A4 => ("210mm", "297mm"),
        }
    }

    pub const ALL: [PaperSize; 2] = [PaperSize::UsLetter, PaperSize::A4];
}

impl FromStr for PaperSize {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "us_letter" => Ok(PaperSize::UsLetter),
            "a4" => Ok(PaperSize::A4),
            other => Err(DomainError::validation(
                "paper_size",
                format!("unknown paper size '{other}' (expected us_letter or a4)"),
            )),
        }
    }
}

impl core::fmt::Display for PaperSize {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_known_values_only() {
        assert_eq!("classic".parse::<Template>().unwrap(), Template::Classic);
        assert_eq!("modern".parse::<Template>().unwrap(), Template::Modern);
        assert_eq!("minimal".parse::<Template>().unwrap(), Template::Minimal);

        let err = "corporate".parse::<Template>().unwrap_err();
        match err {
            DomainError::Validation(fields) => assert!(fields.contains("template")),
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn paper_size_parses_known_values_only() {
        assert_eq!("us_letter".parse::<PaperSize>().unwrap(), PaperSize::UsLetter);
        assert_eq!("a4".parse::<PaperSize>().unwrap(), PaperSize::A4);
        assert!("letter".parse::<PaperSize>().is_err());
        // Case-sensitive on purpose: wire values are canonical lowercase.
        assert!("A4".parse::<PaperSize>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for t in Template::ALL {
            assert_eq!(t.as_str().parse::<Template>().unwrap(), t);
        }
        for p in PaperSize::ALL {
            assert_eq!(p.as_str().parse::<PaperSize>().unwrap(), p);
        }
    }
}
