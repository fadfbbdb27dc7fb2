//! Configuration snapshots and request shaping.
//!
//! A snapshot is the user-authored configuration text at a point in time,
//! plus an ordered list of named code injections. The text is opaque to the
//! pipeline except for two best-effort optimizations performed before
//! dispatch: stripping heavyweight sections when only points are wanted, and
//! scanning for a known-deprecated footprint pattern. Both re-parse the
//! snapshot independently and silently no-op when it does not parse.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level sections removed from the snapshot when `points_only` is set.
const HEAVYWEIGHT_SECTIONS: &[&str] = &["pcbs", "cases"];

/// Footprint family whose boards need an explicit template.
const LEGACY_FOOTPRINT_PREFIX: &str = "ceoloide/";

/// Warning raised when the legacy pattern is detected.
const LEGACY_TEMPLATE_WARNING: &str = "ceoloide footprints target the KiCad 8 template; \
     set `template: kicad8` on each pcb that uses them (the implicit legacy default is deprecated)";

/// A named, user-supplied code fragment applied during primary generation.
///
/// On the wire an injection is a `[kind, name, code]` triple. Uniqueness is
/// by position, not by name; duplicate names are allowed and last-applicable
/// wins inside the executor, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String, String)", into = "(String, String, String)")]
pub struct Injection {
    /// Injection kind, currently only `"footprint"`.
    pub kind: String,
    pub name: String,
    pub code: String,
}

impl Injection {
    pub fn footprint(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            kind: "footprint".to_string(),
            name: name.into(),
            code: code.into(),
        }
    }
}

impl From<(String, String, String)> for Injection {
    fn from((kind, name, code): (String, String, String)) -> Self {
        Self { kind, name, code }
    }
}

impl From<Injection> for (String, String, String) {
    fn from(injection: Injection) -> Self {
        (injection.kind, injection.name, injection.code)
    }
}

/// Options for one generation request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    /// Strip heavyweight sections before dispatch; only points (and the
    /// light categories) are wanted.
    #[serde(default)]
    pub points_only: bool,
    /// Ask the executor for debug output.
    #[serde(default)]
    pub debug: bool,
}

/// The user-authored configuration text at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub source: String,
}

impl ConfigSnapshot {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Parse the snapshot into its structured form, or `None` when it is not
    /// parseable. Callers degrade to treating the text as opaque.
    fn parse(&self) -> Option<Value> {
        serde_json::from_str(&self.source).ok()
    }

    /// Copy of this snapshot with heavyweight sections removed.
    ///
    /// Returns the snapshot unmodified when it does not parse to a
    /// recognizable top-level mapping.
    pub fn stripped_for_points(&self) -> ConfigSnapshot {
        let Some(Value::Object(mut sections)) = self.parse() else {
            return self.clone();
        };
        for section in HEAVYWEIGHT_SECTIONS {
            sections.remove(*section);
        }
        let source = serde_json::to_string(&Value::Object(sections))
            .unwrap_or_else(|_| self.source.clone());
        ConfigSnapshot { source }
    }

    /// Scan for the known-deprecated pattern: a pcb that leaves its template
    /// defaulted while using a legacy-family footprint.
    ///
    /// Runs over the unmodified snapshot, independent of the generation
    /// outcome. Not parseable means no warning.
    pub fn deprecation_warning(&self) -> Option<String> {
        let parsed = self.parse()?;
        let pcbs = parsed.get("pcbs")?.as_object()?;
        for pcb in pcbs.values() {
            let Some(pcb) = pcb.as_object() else { continue };
            if pcb.contains_key("template") {
                continue;
            }
            let Some(footprints) = pcb.get("footprints") else {
                continue;
            };
            if footprint_values(footprints).any(|footprint| {
                footprint
                    .get("what")
                    .and_then(Value::as_str)
                    .is_some_and(|what| what.starts_with(LEGACY_FOOTPRINT_PREFIX))
            }) {
                return Some(LEGACY_TEMPLATE_WARNING.to_string());
            }
        }
        None
    }
}

/// Footprints may be declared as a mapping or as a list.
fn footprint_values(footprints: &Value) -> Box<dyn Iterator<Item = &Value> + '_> {
    match footprints {
        Value::Object(map) => Box::new(map.values()),
        Value::Array(items) => Box::new(items.iter()),
        _ => Box::new(std::iter::empty()),
    }
}
