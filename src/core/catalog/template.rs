// ─── Argument Templates ───
// Parses `${key}` placeholders out of version arguments into tokens.

use serde::{Deserialize, Serialize};

use super::rules::{rules_allow, Platform, Rule};

/// One argument of a runtime or application template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ArgumentToken {
    Literal(String),
    /// A whole argument bound to one substitution key.
    Placeholder(String),
    /// Literal text with embedded placeholders, e.g. `-Dpath=${natives_directory}`.
    Interpolated(Vec<TemplatePart>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TemplatePart {
    Text(String),
    Key(String),
}

impl ArgumentToken {
    pub fn parse(raw: &str) -> Self {
        let parts = split_parts(raw);
        match parts.as_slice() {
            [] => ArgumentToken::Literal(String::new()),
            [TemplatePart::Key(key)] => ArgumentToken::Placeholder(key.clone()),
            _ if parts.iter().all(|p| matches!(p, TemplatePart::Text(_))) => {
                ArgumentToken::Literal(raw.to_string())
            }
            _ => ArgumentToken::Interpolated(parts),
        }
    }

    /// Render the token in a single pass.
    ///
    /// Keys without a binding are emitted verbatim as `${key}`. This is a
    /// pass-through for keys introduced by newer metadata, not an error, and
    /// bound values are never re-scanned for placeholders.
    pub fn render<'a, F>(&self, lookup: F) -> String
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        match self {
            ArgumentToken::Literal(text) => text.clone(),
            ArgumentToken::Placeholder(key) => render_key(key, &lookup),
            ArgumentToken::Interpolated(parts) => parts
                .iter()
                .map(|part| match part {
                    TemplatePart::Text(text) => text.clone(),
                    TemplatePart::Key(key) => render_key(key, &lookup),
                })
                .collect(),
        }
    }

    pub fn is_literal(&self, value: &str) -> bool {
        matches!(self, ArgumentToken::Literal(text) if text == value)
    }

    pub fn references(&self, key: &str) -> bool {
        match self {
            ArgumentToken::Literal(_) => false,
            ArgumentToken::Placeholder(k) => k == key,
            ArgumentToken::Interpolated(parts) => parts
                .iter()
                .any(|p| matches!(p, TemplatePart::Key(k) if k == key)),
        }
    }
}

fn render_key<'a, F>(key: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<&'a str>,
{
    match lookup(key) {
        Some(value) => value.to_string(),
        None => format!("${{{}}}", key),
    }
}

fn split_parts(raw: &str) -> Vec<TemplatePart> {
    let mut parts = Vec::new();
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        if start > 0 {
            parts.push(TemplatePart::Text(rest[..start].to_string()));
        }
        parts.push(TemplatePart::Key(after[..end].to_string()));
        rest = &after[end + 1..];
    }

    if !rest.is_empty() {
        parts.push(TemplatePart::Text(rest.to_string()));
    }
    parts
}

/// Parse a modern `arguments.game` / `arguments.jvm` array.
///
/// Entries are either plain strings or `{rules, value}` objects whose value
/// is a string or an array of strings. Entries whose rules reject the
/// platform are dropped.
pub fn parse_template(values: &[serde_json::Value], platform: &Platform) -> Vec<ArgumentToken> {
    values
        .iter()
        .flat_map(|value| argument_values(value, platform))
        .map(|raw| ArgumentToken::parse(&raw))
        .collect()
}

/// Parse a pre-1.13 `minecraftArguments` string.
pub fn parse_legacy(arguments: &str) -> Vec<ArgumentToken> {
    arguments.split_whitespace().map(ArgumentToken::parse).collect()
}

pub fn parse_strings(values: &[String]) -> Vec<ArgumentToken> {
    values.iter().map(|v| ArgumentToken::parse(v)).collect()
}

fn argument_values(value: &serde_json::Value, platform: &Platform) -> Vec<String> {
    if let Some(arg) = value.as_str() {
        return vec![arg.to_string()];
    }

    let Some(obj) = value.as_object() else {
        return vec![];
    };

    if let Some(raw_rules) = obj.get("rules") {
        let rules: Vec<Rule> = serde_json::from_value(raw_rules.clone()).unwrap_or_default();
        if !rules_allow(&rules, platform) {
            return vec![];
        }
    }

    match obj.get("value") {
        Some(serde_json::Value::String(s)) => vec![s.clone()],
        Some(serde_json::Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| v.as_str().map(ToString::to_string))
            .collect(),
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_classifies_tokens() {
        assert_eq!(
            ArgumentToken::parse("--username"),
            ArgumentToken::Literal("--username".into())
        );
        assert_eq!(
            ArgumentToken::parse("${auth_player_name}"),
            ArgumentToken::Placeholder("auth_player_name".into())
        );
        assert_eq!(
            ArgumentToken::parse("-Djava.library.path=${natives_directory}"),
            ArgumentToken::Interpolated(vec![
                TemplatePart::Text("-Djava.library.path=".into()),
                TemplatePart::Key("natives_directory".into()),
            ])
        );
        // Unterminated placeholders stay literal.
        assert_eq!(
            ArgumentToken::parse("${broken"),
            ArgumentToken::Literal("${broken".into())
        );
    }

    #[test]
    fn render_leaves_unknown_keys_verbatim() {
        let token = ArgumentToken::parse("--quickPlay=${quickPlayPath}/${auth_uuid}");
        let rendered = token.render(|key| match key {
            "auth_uuid" => Some("u-1"),
            _ => None,
        });
        assert_eq!(rendered, "--quickPlay=${quickPlayPath}/u-1");
    }

    #[test]
    fn render_is_single_pass() {
        let token = ArgumentToken::parse("${auth_player_name}");
        let rendered = token.render(|key| match key {
            "auth_player_name" => Some("${auth_uuid}"),
            "auth_uuid" => Some("u-1"),
            _ => None,
        });
        assert_eq!(rendered, "${auth_uuid}");
    }

    #[test]
    fn parse_template_applies_rules() {
        let platform = Platform::new("linux", "x86_64");
        let values = serde_json::json!([
            "--username",
            "${auth_player_name}",
            {"rules": [{"action": "allow", "os": {"name": "linux"}}], "value": ["--linux-only"]},
            {"rules": [{"action": "allow", "os": {"name": "windows"}}], "value": "--windows-only"},
            {"rules": [{"action": "allow", "features": {"is_demo_user": true}}], "value": "--demo"}
        ]);
        let tokens = parse_template(values.as_array().unwrap(), &platform);
        assert_eq!(
            tokens,
            vec![
                ArgumentToken::Literal("--username".into()),
                ArgumentToken::Placeholder("auth_player_name".into()),
                ArgumentToken::Literal("--linux-only".into()),
            ]
        );
    }

    #[test]
    fn parse_legacy_splits_on_whitespace() {
        let tokens = parse_legacy("--username ${auth_player_name}  --version ${version_name}");
        assert_eq!(tokens.len(), 4);
        assert!(tokens[2].is_literal("--version"));
        assert!(tokens[3].references("version_name"));
    }
}
