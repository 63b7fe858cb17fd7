// ─── OS Rules ───
// Mojang allow/disallow rules attached to libraries and arguments.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
    /// Launcher feature flags (`is_demo_user`, `has_custom_resolution`, ...).
    #[serde(default)]
    pub features: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
}

/// Host description the rules are evaluated against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    /// Mojang OS name: `windows`, `osx` or `linux`.
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    pub fn current() -> Self {
        let os = if cfg!(target_os = "windows") {
            "windows"
        } else if cfg!(target_os = "macos") {
            "osx"
        } else {
            "linux"
        };
        let arch = if cfg!(target_arch = "x86") {
            "x86"
        } else if cfg!(target_arch = "aarch64") {
            "arm64"
        } else {
            "x86_64"
        };
        Self::new(os, arch)
    }
}

impl Rule {
    fn applies_to(&self, platform: &Platform) -> bool {
        // Feature-gated rules describe optional launcher modes; none are enabled.
        if self.features.as_ref().is_some_and(|f| !f.is_empty()) {
            return false;
        }

        match &self.os {
            None => true,
            Some(os) => {
                let name_ok = os.name.as_deref().map_or(true, |n| n == platform.os);
                let arch_ok = os.arch.as_deref().map_or(true, |a| a == platform.arch);
                name_ok && arch_ok
            }
        }
    }
}

/// Evaluate a rule list top-to-bottom.
///
/// No rules means allowed. Otherwise the state starts as disallowed and every
/// matching rule overwrites it with its action.
pub fn rules_allow(rules: &[Rule], platform: &Platform) -> bool {
    if rules.is_empty() {
        return true;
    }

    let mut allowed = false;
    for rule in rules {
        if rule.applies_to(platform) {
            allowed = rule.action == RuleAction::Allow;
        }
    }
    allowed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os_rule(action: RuleAction, name: &str) -> Rule {
        Rule {
            action,
            os: Some(OsRule {
                name: Some(name.into()),
                arch: None,
            }),
            features: None,
        }
    }

    #[test]
    fn no_rules_means_allowed() {
        assert!(rules_allow(&[], &Platform::new("linux", "x86_64")));
    }

    #[test]
    fn allow_only_matching_os() {
        let rules = vec![os_rule(RuleAction::Allow, "osx")];
        assert!(rules_allow(&rules, &Platform::new("osx", "arm64")));
        assert!(!rules_allow(&rules, &Platform::new("linux", "x86_64")));
    }

    #[test]
    fn later_disallow_overrides_allow() {
        let rules = vec![
            Rule {
                action: RuleAction::Allow,
                os: None,
                features: None,
            },
            os_rule(RuleAction::Disallow, "windows"),
        ];
        assert!(!rules_allow(&rules, &Platform::new("windows", "x86_64")));
        assert!(rules_allow(&rules, &Platform::new("linux", "x86_64")));
    }

    #[test]
    fn feature_rules_never_match() {
        let rules: Vec<Rule> = serde_json::from_value(serde_json::json!([
            {"action": "allow", "features": {"has_custom_resolution": true}}
        ]))
        .unwrap();
        assert!(!rules_allow(&rules, &Platform::new("linux", "x86_64")));
    }

    #[test]
    fn arch_constraint_is_checked() {
        let rules: Vec<Rule> = serde_json::from_value(serde_json::json!([
            {"action": "allow", "os": {"arch": "x86"}}
        ]))
        .unwrap();
        assert!(rules_allow(&rules, &Platform::new("windows", "x86")));
        assert!(!rules_allow(&rules, &Platform::new("windows", "x86_64")));
    }
}
