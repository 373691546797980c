//! Structural validation and parsing of generated conclusions.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{FacilitatorError, FacilitatorResult};

/// Section headers every conclusion must contain, in prompt order.
pub const REQUIRED_SECTIONS: [&str; 4] = [
    "Key Points Summary",
    "Major Insights",
    "Agreements Reached",
    "Action Plan",
];

const HEADER_MARKER: &str = "## ";
const BULLET_MARKER: &str = "- ";

/// Required sections absent from `text`, in contract order.
#[must_use]
pub fn missing_sections(text: &str) -> Vec<&'static str> {
    REQUIRED_SECTIONS
        .iter()
        .copied()
        .filter(|name| !text.contains(&format!("{HEADER_MARKER}{name}")))
        .collect()
}

/// Check that every required `## <name>` header is present.
///
/// # Errors
/// Returns `FacilitatorError::StructuralValidationFailed` listing the missing
/// section names.
pub fn validate(text: &str) -> FacilitatorResult<()> {
    let missing = missing_sections(text);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(FacilitatorError::StructuralValidationFailed {
            missing: missing.into_iter().map(ToString::to_string).collect(),
        })
    }
}

/// Sections in the order first encountered, each with its bullets in order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConclusionSections {
    sections: Vec<(String, Vec<String>)>,
}

impl ConclusionSections {
    /// Bullets of a section, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.position(name).map(|i| self.sections[i].1.as_slice())
    }

    /// Section names in encounter order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(name, _)| name.as_str())
    }

    /// `(name, bullets)` pairs in encounter order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.sections
            .iter()
            .map(|(name, bullets)| (name.as_str(), bullets.as_slice()))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.sections.iter().position(|(n, _)| n == name)
    }

    /// Open `name`, reusing an earlier section with the same name.
    fn open(&mut self, name: String) -> usize {
        if let Some(index) = self.position(&name) {
            index
        } else {
            self.sections.push((name, Vec::new()));
            self.sections.len() - 1
        }
    }
}

impl Serialize for ConclusionSections {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.sections.len()))?;
        for (name, bullets) in &self.sections {
            map.serialize_entry(name, bullets)?;
        }
        map.end()
    }
}

/// Parser cursor.
enum ParseState {
    NoSection,
    InSection(usize),
}

/// Parse markdown into sections and bullets in a single forward pass.
///
/// Lines are trimmed first. `## name` opens a section; `- item` inside a
/// section appends a bullet; every other line is ignored, including bullets
/// that appear before the first header.
#[must_use]
pub fn parse(text: &str) -> ConclusionSections {
    let mut sections = ConclusionSections::default();
    let mut state = ParseState::NoSection;

    for line in text.lines().map(str::trim) {
        if let Some(name) = line.strip_prefix(HEADER_MARKER) {
            state = ParseState::InSection(sections.open(name.trim().to_string()));
        } else if let (ParseState::InSection(index), Some(item)) =
            (&state, line.strip_prefix(BULLET_MARKER))
        {
            sections.sections[*index].1.push(item.trim().to_string());
        }
    }

    sections
}
