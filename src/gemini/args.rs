//! Argument builders for the Gemini CLI.
//!
//! Pure functions from validated parameters to argument lists. The
//! executor appends these after the resolved command's base arguments.

use crate::service::params::{ChatParams, SearchParams};

/// Builds the prompt that turns a query into a structured web search.
#[must_use]
pub fn search_prompt(query: &str, limit: u32) -> String {
    format!(
        "Use the google_web_search tool to search the web for: {query}\n\n\
         Respond with a JSON array only, without any other text. Include at most \
         {limit} results. Each element must be an object with the string fields \
         \"title\", \"url\" and \"snippet\"."
    )
}

/// Arguments for a search request.
///
/// `default_model` applies when the request names no model.
#[must_use]
pub fn build_search_args(params: &SearchParams, default_model: Option<&str>) -> Vec<String> {
    let mut args = vec![
        "--prompt".to_string(),
        search_prompt(params.query.trim(), params.effective_limit()),
    ];
    push_common(
        &mut args,
        params.model.as_deref().or(default_model),
        params.sandbox,
    );
    args
}

/// Arguments for a chat request.
///
/// `default_model` applies when the request names no model.
#[must_use]
pub fn build_chat_args(params: &ChatParams, default_model: Option<&str>) -> Vec<String> {
    let mut args = vec!["--prompt".to_string(), params.prompt.clone()];
    push_common(
        &mut args,
        params.model.as_deref().or(default_model),
        params.sandbox,
    );
    if params.yolo {
        args.push("--yolo".to_string());
    }
    args
}

fn push_common(args: &mut Vec<String>, model: Option<&str>, sandbox: bool) {
    if let Some(model) = model {
        args.push("--model".to_string());
        args.push(model.to_string());
    }
    if sandbox {
        args.push("--sandbox".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_chat_args() {
        let args = build_chat_args(&ChatParams::new("hello"), None);
        assert_eq!(args, vec!["--prompt", "hello"]);
    }

    #[test]
    fn test_chat_args_with_flags() {
        let mut params = ChatParams::new("hello");
        params.model = Some("gemini-2.5-flash".to_string());
        params.sandbox = true;
        params.yolo = true;
        let args = build_chat_args(&params, Some("ignored"));
        assert_eq!(
            args,
            vec![
                "--prompt",
                "hello",
                "--model",
                "gemini-2.5-flash",
                "--sandbox",
                "--yolo"
            ]
        );
    }

    #[test]
    fn test_default_model_applies() {
        let args = build_chat_args(&ChatParams::new("hello"), Some("gemini-2.5-pro"));
        assert_eq!(args, vec!["--prompt", "hello", "--model", "gemini-2.5-pro"]);
    }

    #[test]
    fn test_prompt_is_a_single_argument() {
        let args = build_chat_args(&ChatParams::new("a b; rm -rf /"), None);
        assert_eq!(args[1], "a b; rm -rf /");
    }

    #[test]
    fn test_search_args() {
        let mut params = SearchParams::new("  rust async  ");
        params.limit = Some(3);
        params.sandbox = true;
        let args = build_search_args(&params, None);
        assert_eq!(args.len(), 3);
        assert_eq!(args[0], "--prompt");
        assert!(args[1].contains("search the web for: rust async\n"));
        assert!(args[1].contains("at most 3 results"));
        assert_eq!(args[2], "--sandbox");
    }
}
