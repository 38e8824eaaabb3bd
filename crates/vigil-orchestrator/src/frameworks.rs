//! Static catalog of compliance frameworks used to enrich chat replies.

/// One known framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameworkSpec {
    /// Key used in requests, e.g. `"iso27001"`.
    pub key: &'static str,
    pub display_name: &'static str,
    /// Authoritative references attached to responses as `sources`.
    pub sources: &'static [&'static str],
    pub suggestions: &'static [&'static str],
    pub follow_up_questions: &'static [&'static str],
}

pub static FRAMEWORKS: &[FrameworkSpec] = &[
    FrameworkSpec {
        key: "iso27001",
        display_name: "ISO/IEC 27001:2022",
        sources: &[
            "ISO/IEC 27001:2022 Information security management systems",
            "ISO/IEC 27002:2022 Information security controls",
        ],
        suggestions: &[
            "Generate a Statement of Applicability",
            "Draft an information security policy",
            "Run a risk assessment for Annex A controls",
        ],
        follow_up_questions: &[
            "Which Annex A controls are in scope for your ISMS?",
            "Do you have a documented risk treatment plan?",
        ],
    },
    FrameworkSpec {
        key: "soc2",
        display_name: "SOC 2",
        sources: &["AICPA Trust Services Criteria (2017, revised 2022)"],
        suggestions: &[
            "Map existing controls to the Common Criteria",
            "Draft a change management policy",
        ],
        follow_up_questions: &[
            "Are you preparing for a Type I or Type II report?",
            "Which Trust Services Categories beyond Security are in scope?",
        ],
    },
    FrameworkSpec {
        key: "fedramp",
        display_name: "FedRAMP",
        sources: &[
            "FedRAMP Security Controls Baseline (Rev. 5)",
            "NIST SP 800-53 Rev. 5",
        ],
        suggestions: &[
            "Outline a System Security Plan",
            "Identify the applicable impact level",
        ],
        follow_up_questions: &[
            "Is the target authorization Low, Moderate, or High?",
            "Do you have a sponsoring agency?",
        ],
    },
    FrameworkSpec {
        key: "nist-csf",
        display_name: "NIST Cybersecurity Framework 2.0",
        sources: &["NIST Cybersecurity Framework (CSF) 2.0"],
        suggestions: &[
            "Build a current and target profile",
            "Summarize the Govern function outcomes",
        ],
        follow_up_questions: &["Which implementation tier describes your organization today?"],
    },
    FrameworkSpec {
        key: "nist-800-53",
        display_name: "NIST SP 800-53",
        sources: &["NIST SP 800-53 Rev. 5 Security and Privacy Controls"],
        suggestions: &[
            "Select a control baseline",
            "Draft control implementation statements",
        ],
        follow_up_questions: &["Which control families are you prioritizing first?"],
    },
];

/// Look up a framework by key. Case and separators (`-`, `_`, spaces)
/// are ignored, so `"ISO 27001"` and `"nist_csf"` resolve.
pub fn find_framework(key: &str) -> Option<&'static FrameworkSpec> {
    let wanted = canonical(key);
    if wanted.is_empty() {
        return None;
    }
    FRAMEWORKS.iter().find(|f| canonical(f.key) == wanted)
}

/// Sources for an optional framework hint; empty when unknown.
pub fn sources_for(framework: Option<&str>) -> Vec<String> {
    framework
        .and_then(find_framework)
        .map(|f| f.sources.iter().map(|s| s.to_string()).collect())
        .unwrap_or_default()
}

fn canonical(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' ' | '/'))
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_framework_forgiving() {
        assert_eq!(find_framework("iso27001").unwrap().key, "iso27001");
        assert_eq!(find_framework("ISO 27001").unwrap().key, "iso27001");
        assert_eq!(find_framework("nist_csf").unwrap().key, "nist-csf");
        assert_eq!(find_framework("NIST-800-53").unwrap().key, "nist-800-53");
        assert!(find_framework("hipaa").is_none());
        assert!(find_framework("").is_none());
    }

    #[test]
    fn test_sources_for() {
        assert!(!sources_for(Some("soc2")).is_empty());
        assert!(sources_for(Some("unknown")).is_empty());
        assert!(sources_for(None).is_empty());
    }

    #[test]
    fn test_every_framework_has_content() {
        for f in FRAMEWORKS {
            assert!(!f.sources.is_empty(), "{} has no sources", f.key);
            assert!(!f.suggestions.is_empty(), "{} has no suggestions", f.key);
            assert!(!f.follow_up_questions.is_empty(), "{} has no follow-ups", f.key);
        }
    }
}
