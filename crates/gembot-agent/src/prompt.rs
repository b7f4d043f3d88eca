//! Prompt templates and assembly.
//!
//! The user template may reference `{sender_name}`, `{sender_mention}`,
//! `{user_prompt}` and `{history}`; `{{` and `}}` produce literal braces.
//! The system template is prepended verbatim, separated by a blank line.

use std::path::Path;

use tracing::info;

use gembot_core::config::PromptConfig;
use gembot_core::error::{GembotError, Result};

use crate::history::HistoryEntry;

const PLACEHOLDERS: &[&str] = &["sender_name", "sender_mention", "user_prompt", "history"];

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly, helpful assistant taking part in a Discord chat.\n\
Keep replies short and conversational, use Discord markdown only where it helps,\n\
and answer the person who addressed you. Use the recent conversation for context,\n\
but do not repeat it back.";

pub const DEFAULT_USER_PROMPT: &str = "Recent conversation:\n\
{history}\n\
\n\
{sender_name} ({sender_mention}) says:\n\
{user_prompt}";

/// Everything that varies per request.
#[derive(Debug, Clone)]
pub struct PromptContext {
    pub user_prompt: String,
    pub sender_name: String,
    pub sender_mention: String,
    /// Prior history, not including the message being answered.
    pub history: Vec<HistoryEntry>,
}

/// The two static templates, validated at construction.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    system: String,
    user: String,
}

impl PromptTemplates {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Result<Self> {
        let templates = Self {
            system: system.into(),
            user: user.into(),
        };
        templates.validate()?;
        Ok(templates)
    }

    /// Resolve templates from config: inline text, then file, then built-in.
    pub fn from_config(config: &PromptConfig) -> Result<Self> {
        let system = resolve_template(
            config.system.as_deref(),
            config.system_path.as_deref(),
            DEFAULT_SYSTEM_PROMPT,
        )?;
        let user = resolve_template(
            config.user.as_deref(),
            config.user_path.as_deref(),
            DEFAULT_USER_PROMPT,
        )?;
        Self::new(system, user)
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Reject unknown placeholders and unbalanced braces in the user template.
    pub fn validate(&self) -> Result<()> {
        check_template(&self.user).map_err(|reason| {
            GembotError::Config(format!("invalid user prompt template: {reason}"))
        })
    }

    /// Build the final prompt. Pure: identical inputs give identical output.
    pub fn assemble(&self, ctx: &PromptContext) -> String {
        let history = render_history(&ctx.history);
        let user = substitute(&self.user, |name| match name {
            "sender_name" => Some(ctx.sender_name.as_str()),
            "sender_mention" => Some(ctx.sender_mention.as_str()),
            "user_prompt" => Some(ctx.user_prompt.as_str()),
            "history" => Some(history.as_str()),
            _ => None,
        });
        format!("{}\n\n{}", self.system, user)
    }
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
            user: DEFAULT_USER_PROMPT.to_string(),
        }
    }
}

/// Newline-joined `Speaker: text` lines.
pub fn render_history(entries: &[HistoryEntry]) -> String {
    entries
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn resolve_template(inline: Option<&str>, path: Option<&str>, default: &str) -> Result<String> {
    if let Some(text) = inline {
        return Ok(text.to_string());
    }
    let Some(path) = path else {
        return Ok(default.to_string());
    };
    let text = std::fs::read_to_string(Path::new(path))
        .map_err(|e| GembotError::Config(format!("cannot read prompt template {path}: {e}")))?;
    info!(path = %path, chars = text.len(), "loaded prompt template");
    Ok(text.trim_end_matches('\n').to_string())
}

/// Single-pass substitution. Substituted values are never re-scanned, so a
/// user typing `{history}` gets exactly that text back.
fn substitute<'a, F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<&'a str>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(|c: char| c == '{' || c == '}') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }

        if tail.starts_with('{') {
            if let Some(end) = tail.find('}') {
                if let Some(value) = lookup(&tail[1..end]) {
                    out.push_str(value);
                    rest = &tail[end + 1..];
                    continue;
                }
            }
        }

        // Unknown field or stray brace: validated templates never get here.
        out.push_str(&tail[..1]);
        rest = &tail[1..];
    }

    out.push_str(rest);
    out
}

fn check_template(template: &str) -> std::result::Result<(), String> {
    let mut rest = template;

    while let Some(pos) = rest.find(|c: char| c == '{' || c == '}') {
        let tail = &rest[pos..];

        if tail.starts_with("{{") || tail.starts_with("}}") {
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with('}') {
            return Err("single '}' encountered".to_string());
        }

        let end = tail
            .find('}')
            .ok_or_else(|| "unterminated '{'".to_string())?;
        let name = &tail[1..end];
        if !PLACEHOLDERS.contains(&name) {
            return Err(format!("unknown placeholder {{{name}}}"));
        }
        rest = &tail[end + 1..];
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn ctx(user_prompt: &str, history: Vec<HistoryEntry>) -> PromptContext {
        PromptContext {
            user_prompt: user_prompt.to_string(),
            sender_name: "alice".to_string(),
            sender_mention: "<@42>".to_string(),
            history,
        }
    }

    #[test]
    fn substitutes_all_placeholders() {
        let templates = PromptTemplates::new(
            "SYSTEM",
            "{sender_name}|{sender_mention}|{user_prompt}|{history}",
        )
        .unwrap();

        let prompt = templates.assemble(&ctx(
            "what's up",
            vec![HistoryEntry::user("hi"), HistoryEntry::bot("hello")],
        ));

        assert_eq!(
            prompt,
            "SYSTEM\n\nalice|<@42>|what's up|User: hi\nBot: hello"
        );
    }

    #[test]
    fn empty_history_renders_empty_block() {
        let templates = PromptTemplates::new("S", "[{history}]").unwrap();
        assert_eq!(templates.assemble(&ctx("x", Vec::new())), "S\n\n[]");
    }

    #[test]
    fn assembly_is_deterministic() {
        let templates = PromptTemplates::default();
        let c = ctx("tell me a joke", vec![HistoryEntry::user("earlier")]);
        assert_eq!(templates.assemble(&c), templates.assemble(&c));
    }

    #[test]
    fn values_are_not_rescanned() {
        let templates = PromptTemplates::new("S", "{user_prompt}").unwrap();
        let prompt = templates.assemble(&ctx("{history} {{", vec![HistoryEntry::user("secret")]));
        assert_eq!(prompt, "S\n\n{history} {{");
    }

    #[test]
    fn doubled_braces_are_literal() {
        let templates = PromptTemplates::new("S", "{{json}} {user_prompt}").unwrap();
        assert_eq!(templates.assemble(&ctx("ok", Vec::new())), "S\n\n{json} ok");
    }

    #[test]
    fn system_template_is_verbatim() {
        let templates = PromptTemplates::new("Use {braces} freely", "{user_prompt}").unwrap();
        assert_eq!(
            templates.assemble(&ctx("hi", Vec::new())),
            "Use {braces} freely\n\nhi"
        );
    }

    #[test]
    fn unknown_placeholder_rejected() {
        let err = PromptTemplates::new("S", "{user_prompt} {mood}").unwrap_err();
        assert!(err.to_string().contains("{mood}"));
    }

    #[test]
    fn unbalanced_braces_rejected() {
        assert!(PromptTemplates::new("S", "{user_prompt").is_err());
        assert!(PromptTemplates::new("S", "oops } {user_prompt}").is_err());
    }

    #[test]
    fn default_templates_are_valid() {
        PromptTemplates::default().validate().unwrap();
        let prompt = PromptTemplates::default().assemble(&ctx("Hello!", Vec::new()));
        assert!(prompt.starts_with(DEFAULT_SYSTEM_PROMPT));
        assert!(prompt.contains("alice (<@42>) says:\nHello!"));
    }

    #[test]
    fn config_prefers_inline_then_file_then_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let user_path = dir.path().join("user.txt");
        fs::write(&user_path, "From file: {user_prompt}\n").expect("write");

        let config = PromptConfig {
            system: Some("Inline system".to_string()),
            user: None,
            system_path: Some("/definitely/not/read".to_string()),
            user_path: Some(user_path.to_string_lossy().into_owned()),
        };
        let templates = PromptTemplates::from_config(&config).unwrap();
        assert_eq!(templates.system(), "Inline system");
        assert_eq!(templates.user(), "From file: {user_prompt}");

        let defaults = PromptTemplates::from_config(&PromptConfig::default()).unwrap();
        assert_eq!(defaults.system(), DEFAULT_SYSTEM_PROMPT);
        assert_eq!(defaults.user(), DEFAULT_USER_PROMPT);
    }

    #[test]
    fn missing_template_file_is_config_error() {
        let config = PromptConfig {
            user_path: Some("/no/such/gembot/template.txt".to_string()),
            ..Default::default()
        };
        let err = PromptTemplates::from_config(&config).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
        assert!(err.to_string().contains("/no/such/gembot/template.txt"));
    }

    #[test]
    fn invalid_file_template_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("user.txt");
        fs::write(&path, "{who}").expect("write");

        let config = PromptConfig {
            user_path: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        };
        assert!(PromptTemplates::from_config(&config).is_err());
    }
}
