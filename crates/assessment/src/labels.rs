/// Display labels for the eleven Birkman components, keyed by API component id.
const COMPONENT_LABELS: &[(&str, &str)] = &[
    ("social_energy", "Social Energy"),
    ("physical_energy", "Physical Energy"),
    ("emotional_energy", "Emotional Energy"),
    ("self_consciousness", "Self-Consciousness"),
    ("assertiveness", "Assertiveness"),
    ("insistence", "Insistence"),
    ("incentives", "Incentives"),
    ("restlessness", "Restlessness"),
    ("thought", "Thought"),
    ("esteem", "Esteem"),
    ("acceptance", "Acceptance"),
    ("structure", "Structure"),
    ("authority", "Authority"),
    ("advantage", "Advantage"),
    ("activity", "Activity"),
    ("empathy", "Empathy"),
    ("change", "Change"),
    ("freedom", "Freedom"),
];

/// Human label for a component id. Unknown ids are returned unchanged.
pub fn component_label(component: &str) -> String {
    let key = component.trim().to_ascii_lowercase().replace(['-', ' '], "_");
    COMPONENT_LABELS
        .iter()
        .find(|(id, _)| *id == key)
        .map(|(_, label)| (*label).to_owned())
        .unwrap_or_else(|| component.to_owned())
}
