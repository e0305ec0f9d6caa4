//! Prompt builders and response cleanup

use crate::callgraph::CallGraphFacts;
use crate::config::SummaryConfig;
use crate::schema::{ParsedClass, ParsedMethod};
use crate::utils::{join_limited, truncate_to_char_boundary};

/// System message sent with every request
pub const SYSTEM_MESSAGE: &str = "You are a professional Java code interpreter.";

/// What a cluster prompt knows about one member class
#[derive(Debug, Clone, Copy)]
pub struct ClusterMember<'a> {
    pub name: &'a str,
    pub summary: Option<&'a str>,
    pub facts: Option<&'a CallGraphFacts>,
    pub code: Option<&'a str>,
}

/// Prompt for a single method
pub fn method_prompt(method: &ParsedMethod, config: &SummaryConfig) -> String {
    let code = truncate_to_char_boundary(&method.code, config.max_method_chars);
    format!(
        "Summarize the following Java method in ONE precise and concise sentence.\n\
         File: {}\n\
         Class: {}\n\
         Signature: {}\n\n\
         Code:\n```java\n{}\n```",
        method.file,
        method.class,
        method.signature(),
        code
    )
}

/// Prompt for a class, enriched with its call-graph facts
pub fn class_prompt(class: &ParsedClass, facts: &CallGraphFacts, config: &SummaryConfig) -> String {
    let code = truncate_to_char_boundary(&class.code, config.max_class_chars);
    format!(
        "Analyze this class and provide ONE precise, concise sentence describing its PURPOSE and FUNCTIONALITY.\n\
         Context: {}\n\n\
         Class name: {}\n\n\
         Code:\n```java\n{}\n```",
        facts_context(facts, config.max_context_names),
        class.name,
        code
    )
}

/// Prompt for a cluster built from its members' summaries
///
/// Members without a usable summary are described by their call-graph facts
/// instead. The code sample covers the first members that have code.
pub fn cluster_prompt(members: &[ClusterMember<'_>], config: &SummaryConfig) -> String {
    let names: Vec<String> = members.iter().map(|m| m.name.to_string()).collect();

    let mut descriptions = Vec::with_capacity(members.len());
    for member in members {
        let line = match (member.summary, member.facts) {
            (Some(summary), _) => format!("- {}: {}", member.name, summary),
            (None, Some(facts)) => format!(
                "- {}: {}",
                member.name,
                facts_context(facts, config.max_context_names)
            ),
            (None, None) => format!("- {}", member.name),
        };
        descriptions.push(line);
    }

    let sample: Vec<String> = members
        .iter()
        .filter_map(|m| m.code.map(|code| (m.name, code)))
        .take(config.cluster_sample_classes)
        .map(|(name, code)| {
            format!(
                "// Class: {}\n{}",
                name,
                truncate_to_char_boundary(code, config.cluster_sample_chars)
            )
        })
        .collect();

    let mut prompt = format!(
        "These classes are semantically clustered together. \
         Provide ONE concise sentence describing the COMMON PURPOSE or FUNCTIONALITY of this cluster.\n\
         Contains {} classes: {}\n\n\
         Class summaries:\n{}",
        members.len(),
        join_limited(&names, config.max_context_names),
        descriptions.join("\n")
    );
    if !sample.is_empty() {
        prompt.push_str(&format!("\n\nCluster code sample:\n```java\n{}\n```", sample.join("\n\n")));
    }
    prompt
}

/// `Calls methods: ...; Uses classes: ...; Defines methods: ...`
fn facts_context(facts: &CallGraphFacts, limit: usize) -> String {
    let mut parts = Vec::new();
    if !facts.called_methods.is_empty() {
        parts.push(format!("Calls methods: {}", join_limited(&facts.called_methods, limit)));
    }
    if !facts.referenced_classes.is_empty() {
        parts.push(format!("Uses classes: {}", join_limited(&facts.referenced_classes, limit)));
    }
    if !facts.defined_methods.is_empty() {
        parts.push(format!("Defines methods: {}", join_limited(&facts.defined_methods, limit)));
    }
    if parts.is_empty() {
        "No additional context".to_string()
    } else {
        parts.join("; ")
    }
}

/// Strip code fences and a leading `Summary:` label from model output
pub fn clean_response(text: &str) -> String {
    let mut cleaned = text.trim();

    if let Some(rest) = cleaned.strip_prefix("```") {
        // drop the fence line, which may carry a language tag
        cleaned = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    }
    if let Some(rest) = cleaned.trim_end().strip_suffix("```") {
        cleaned = rest;
    }
    cleaned = cleaned.trim();

    for label in ["Summary:", "summary:", "SUMMARY:"] {
        if let Some(rest) = cleaned.strip_prefix(label) {
            cleaned = rest.trim_start();
            break;
        }
    }

    cleaned.trim().to_string()
}
