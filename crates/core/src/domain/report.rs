use serde::{Deserialize, Serialize};
use serde_json::Number;

/// One trait component whose scores differ enough between two people to matter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalComponent {
    pub component: String,
    /// Scores keep the provider's number as sent, integer or fractional.
    pub diff: Number,
    pub your_usual: Number,
    pub their_need: Number,
    #[serde(default)]
    pub your_usual_explanation: String,
    #[serde(default)]
    pub their_need_explanation: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComparativeReport {
    /// Components in the order the provider ranked them.
    pub critical_components: Vec<CriticalComponent>,
    pub graph_png: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::CriticalComponent;

    #[test]
    fn fractional_scores_decode_and_print_unchanged() {
        let component: CriticalComponent = serde_json::from_str(
            r#"{"component":"esteem","diff":12.5,"yourUsual":10,"theirNeed":22.5}"#,
        )
        .expect("component");

        assert_eq!(component.diff.to_string(), "12.5");
        assert_eq!(component.your_usual.to_string(), "10");
        assert_eq!(component.their_need.to_string(), "22.5");
        assert!(component.your_usual_explanation.is_empty());
    }
}
