//! Result documents produced by the primary generation step.
//!
//! A [`ResultDocument`] maps artifact categories (points, outlines, cases,
//! pcbs) to their payloads. Case payloads may carry an intermediate
//! solid-geometry script and, once the secondary conversion step has run,
//! concrete mesh data. The mesh lifecycle is explicit: `Absent` means "not
//! applicable", `Pending` means "owed but not yet computed".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Concrete mesh data derived from a solid-geometry script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    /// Vertex positions.
    pub vertices: Vec<[f64; 3]>,
    /// Triangle faces as vertex indices.
    pub faces: Vec<[u32; 3]>,
}

/// Conversion state of a case's mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MeshState {
    /// No mesh applies (no script, or mesh preview disabled).
    #[default]
    Absent,
    /// A mesh is owed but has not been computed yet.
    Pending,
    /// Conversion succeeded.
    Ready { data: MeshData },
    /// Conversion failed for this entry only.
    Failed { message: String },
}

impl MeshState {
    pub fn is_absent(&self) -> bool {
        matches!(self, MeshState::Absent)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, MeshState::Pending)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, MeshState::Ready { .. })
    }

    /// Whether conversion has produced a final answer for this entry.
    pub fn is_settled(&self) -> bool {
        matches!(self, MeshState::Ready { .. } | MeshState::Failed { .. })
    }
}

/// Payload for one generated case.
///
/// Fields other than `script` and `mesh` are preserved verbatim; the mesh
/// merge never touches them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CasePayload {
    /// Intermediate solid-geometry script, if the case defines one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    /// Mesh conversion state.
    #[serde(default, skip_serializing_if = "MeshState::is_absent")]
    pub mesh: MeshState,

    /// Category-specific fields this core does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Artifact categories produced by one generation cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<Value>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub outlines: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub pcbs: Map<String, Value>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cases: BTreeMap<String, CasePayload>,
}

impl ResultDocument {
    /// Names of cases whose script is present but whose mesh has not been
    /// computed. Derived on demand, never stored.
    pub fn pending_cases(&self) -> Vec<&str> {
        self.cases
            .iter()
            .filter(|(_, case)| case.script.is_some() && !case.mesh.is_settled())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Mark every case that owes a mesh as explicitly `Pending`.
    ///
    /// Returns the number of cases marked. Cases without a script and cases
    /// whose mesh is already settled are left alone.
    pub fn mark_pending_meshes(&mut self) -> usize {
        let mut marked = 0;
        for case in self.cases.values_mut() {
            if case.script.is_some() && !case.mesh.is_settled() {
                case.mesh = MeshState::Pending;
                marked += 1;
            }
        }
        marked
    }

    /// Merge meshes from a converted document into this one, field by field.
    ///
    /// Only the `mesh` field of matching cases is copied, and only when the
    /// incoming entry is settled (`Ready` or `Failed`). Other categories and
    /// unrelated case fields computed meanwhile are never discarded.
    /// Returns the number of entries merged.
    pub fn merge_meshes(&mut self, incoming: &ResultDocument) -> usize {
        let mut merged = 0;
        for (name, case) in self.cases.iter_mut() {
            let Some(converted) = incoming.cases.get(name) else {
                continue;
            };
            if converted.mesh.is_settled() {
                case.mesh = converted.mesh.clone();
                merged += 1;
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scripted_case(script: &str) -> CasePayload {
        CasePayload {
            script: Some(script.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn pending_cases_requires_script_and_unsettled_mesh() {
        let mut doc = ResultDocument::default();
        doc.cases.insert("top".into(), scripted_case("cube()"));
        doc.cases.insert("no_script".into(), CasePayload::default());
        doc.cases.insert(
            "done".into(),
            CasePayload {
                script: Some("sphere()".into()),
                mesh: MeshState::Ready {
                    data: MeshData::default(),
                },
                ..Default::default()
            },
        );

        assert_eq!(doc.pending_cases(), vec!["top"]);
    }

    #[test]
    fn mark_pending_sets_explicit_placeholder() {
        let mut doc = ResultDocument::default();
        doc.cases.insert("top".into(), scripted_case("cube()"));
        doc.cases.insert("plain".into(), CasePayload::default());

        assert_eq!(doc.mark_pending_meshes(), 1);
        assert!(doc.cases["top"].mesh.is_pending());
        assert!(doc.cases["plain"].mesh.is_absent());
    }

    #[test]
    fn merge_copies_only_settled_meshes() {
        let mut doc = ResultDocument::default();
        let mut case = scripted_case("cube()");
        case.extra.insert("outline".into(), Value::from("top_outline"));
        doc.cases.insert("top".into(), case);
        doc.mark_pending_meshes();

        let mut converted = ResultDocument::default();
        converted.cases.insert(
            "top".into(),
            CasePayload {
                mesh: MeshState::Ready {
                    data: MeshData {
                        vertices: vec![[0.0, 0.0, 0.0]],
                        faces: vec![],
                    },
                },
                ..Default::default()
            },
        );
        // An entry the converter never saw stays pending.
        converted.cases.insert("other".into(), CasePayload::default());

        assert_eq!(doc.merge_meshes(&converted), 1);
        assert!(doc.cases["top"].mesh.is_ready());
        // Unrelated fields survive the merge.
        assert_eq!(doc.cases["top"].extra["outline"], Value::from("top_outline"));
    }

    #[test]
    fn merge_accepts_per_entry_failure() {
        let mut doc = ResultDocument::default();
        doc.cases.insert("top".into(), scripted_case("cube()"));
        doc.mark_pending_meshes();

        let mut converted = ResultDocument::default();
        converted.cases.insert(
            "top".into(),
            CasePayload {
                mesh: MeshState::Failed {
                    message: "bad script".into(),
                },
                ..Default::default()
            },
        );

        assert_eq!(doc.merge_meshes(&converted), 1);
        assert!(matches!(doc.cases["top"].mesh, MeshState::Failed { .. }));
    }
}
