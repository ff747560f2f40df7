//! Framework resolver plug-ins as a closed set of variants (spec §9:
//! "implement as a closed set of variants ... do not use inheritance"),
//! mirroring the teacher's `project_resolver::providers` per-language
//! module layout, generalized from project-config resolution to
//! framework-biased reference resolution.

use super::{ResolutionIndex, ResolvedMatch};
use crate::node::UnresolvedReference;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framework {
    /// PascalCase component references and `useX` hook calls.
    ReactLike,
    /// Route-file-path conventions (`pages/`, `routes/`).
    RouteConventions,
}

impl Framework {
    /// Detect which frameworks apply given the set of languages present
    /// in the project.
    pub fn detect(languages: &[String]) -> Vec<Framework> {
        let mut detected = Vec::new();
        if languages.iter().any(|l| l == "javascript" || l == "typescript") {
            detected.push(Framework::ReactLike);
            detected.push(Framework::RouteConventions);
        }
        detected
    }

    pub fn resolve(&self, reference: &UnresolvedReference, index: &ResolutionIndex) -> Option<ResolvedMatch> {
        match self {
            Framework::ReactLike => resolve_react_like(reference, index),
            Framework::RouteConventions => resolve_route(reference, index),
        }
    }
}

fn is_pascal_case(name: &str) -> bool {
    name.chars().next().map(|c| c.is_ascii_uppercase()).unwrap_or(false)
}

fn is_hook_name(name: &str) -> bool {
    name.starts_with("use") && name.chars().nth(3).map(|c| c.is_ascii_uppercase()).unwrap_or(false)
}

fn resolve_react_like(reference: &UnresolvedReference, index: &ResolutionIndex) -> Option<ResolvedMatch> {
    if !(is_pascal_case(&reference.reference_name) || is_hook_name(&reference.reference_name)) {
        return None;
    }
    let candidates = index.by_name.get(&reference.reference_name)?;
    let target = candidates
        .iter()
        .find(|id| {
            index
                .nodes
                .get(*id)
                .map(|n| matches!(n.kind, crate::types::NodeKind::Component | crate::types::NodeKind::Function))
                .unwrap_or(false)
        })
        .or_else(|| candidates.first())?;
    Some(ResolvedMatch { target: target.clone(), confidence: 0.85, resolved_by: "framework:react_like" })
}

fn resolve_route(reference: &UnresolvedReference, index: &ResolutionIndex) -> Option<ResolvedMatch> {
    if !reference.file_path.contains("pages/") && !reference.file_path.contains("routes/") {
        return None;
    }
    let target = index.by_qualified_name.get(&reference.reference_name)?;
    Some(ResolvedMatch { target: target.clone(), confidence: 0.8, resolved_by: "framework:route_conventions" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_picks_react_like_for_js_projects() {
        let frameworks = Framework::detect(&["javascript".to_string()]);
        assert!(frameworks.contains(&Framework::ReactLike));
    }

    #[test]
    fn detect_is_empty_for_rust_only_projects() {
        let frameworks = Framework::detect(&["rust".to_string()]);
        assert!(frameworks.is_empty());
    }

    #[test]
    fn pascal_case_and_hook_detection() {
        assert!(is_pascal_case("Header"));
        assert!(!is_pascal_case("header"));
        assert!(is_hook_name("useState"));
        assert!(!is_hook_name("user"));
    }
}
