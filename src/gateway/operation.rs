//! Recognition of the operation a request body asks for.
//!
//! Requests carry a GraphQL-shaped `query` string plus optional `variables`.
//! The query is lexed into tokens so keywords and field names are compared
//! as whole tokens; string literals are single opaque tokens and never take
//! part in recognition. Only a single `chat` mutation or `health` query root
//! field is understood. Fragments, multiple root fields and inline
//! conversation history are not supported. The inline `message:` fallback
//! only reads plain string literals; a block string (`"""..."""`) lexes as an
//! empty literal and is reported as a missing message.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::models::{ConversationHistory, Turn};

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r##"#[^\n]*|"(?:[^"\\]|\\.)*"|[_A-Za-z][_0-9A-Za-z]*|\.\.\.|-?[0-9][0-9.eE+-]*|[!$&()\[\]{}:=@|]"##)
        .expect("token pattern is valid")
});

/// A validated request for one gateway operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationRequest {
    Health,
    Chat(ChatArgs),
}

/// Arguments of the `chat` operation. The message is never blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatArgs {
    message: String,
    history: ConversationHistory,
}

impl ChatArgs {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }
}

impl OperationRequest {
    pub fn chat(message: impl Into<String>, history: ConversationHistory) -> Result<Self> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(Error::validation("Message is required"));
        }
        Ok(OperationRequest::Chat(ChatArgs { message, history }))
    }

    /// Name of the response field the result is reported under.
    pub fn field_name(&self) -> &'static str {
        match self {
            OperationRequest::Health => "health",
            OperationRequest::Chat(_) => "chat",
        }
    }

    /// Builds a request from a query string and its variables.
    ///
    /// Chat arguments come from `variables.input` when that binding exists.
    /// Only without it is the inline `message:` argument of the `chat` field
    /// consulted.
    pub fn parse(query: &str, variables: Option<&Value>) -> Result<Self> {
        let tokens = tokenize(query);
        let selection = root_selection(&tokens)
            .ok_or_else(|| Error::validation("Query not supported"))?;

        match (selection.kind, selection.field) {
            (OperationKind::Query, "health") => Ok(OperationRequest::Health),
            (OperationKind::Mutation, "chat") => {
                let input = variables
                    .and_then(|vars| vars.get("input"))
                    .filter(|input| !input.is_null());

                match input {
                    Some(input) => {
                        let input = ChatInput::deserialize(input)
                            .map_err(|e| Error::validation(format!("Invalid chat input: {}", e)))?;
                        Self::chat(
                            input.message.unwrap_or_default(),
                            input.conversation_history.unwrap_or_default(),
                        )
                    }
                    None => {
                        let message = inline_message(selection.arguments, variables)
                            .unwrap_or_default();
                        Self::chat(message, Vec::new())
                    }
                }
            }
            _ => Err(Error::validation("Query not supported")),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatInput {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    conversation_history: Option<Vec<Turn>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Name(&'a str),
    /// Raw string literal, quotes included.
    Str(&'a str),
    Punct(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

#[derive(Debug)]
struct RootSelection<'t, 'a> {
    kind: OperationKind,
    field: &'a str,
    /// Tokens between the field's argument parentheses.
    arguments: &'t [Token<'a>],
}

fn tokenize(query: &str) -> Vec<Token<'_>> {
    TOKEN_PATTERN
        .find_iter(query)
        .filter_map(|m| {
            let text = m.as_str();
            match text.as_bytes()[0] {
                b'#' => None,
                b'"' => Some(Token::Str(text)),
                b'_' | b'a'..=b'z' | b'A'..=b'Z' => Some(Token::Name(text)),
                _ => Some(Token::Punct(text)),
            }
        })
        .collect()
}

fn root_selection<'t, 'a>(tokens: &'t [Token<'a>]) -> Option<RootSelection<'t, 'a>> {
    let (kind, open) = match tokens.first()? {
        Token::Punct("{") => (OperationKind::Query, 0),
        Token::Name(keyword) => {
            let kind = match *keyword {
                "query" => OperationKind::Query,
                "mutation" => OperationKind::Mutation,
                "subscription" => OperationKind::Subscription,
                _ => return None,
            };
            // Skip the operation name, variable definitions and directives.
            let mut depth = 0usize;
            let open = tokens.iter().enumerate().skip(1).find_map(|(i, token)| {
                match token {
                    Token::Punct("(") => depth += 1,
                    Token::Punct(")") => depth = depth.saturating_sub(1),
                    Token::Punct("{") if depth == 0 => return Some(i),
                    _ => {}
                }
                None
            })?;
            (kind, open)
        }
        _ => return None,
    };

    let mut cursor = open + 1;
    let mut field = match tokens.get(cursor)? {
        Token::Name(name) => *name,
        _ => return None,
    };
    // `alias: field`
    if tokens.get(cursor + 1) == Some(&Token::Punct(":")) {
        field = match tokens.get(cursor + 2)? {
            Token::Name(name) => *name,
            _ => return None,
        };
        cursor += 2;
    }

    let arguments = match tokens.get(cursor + 1) {
        Some(Token::Punct("(")) => {
            let start = cursor + 2;
            let mut depth = 1usize;
            let mut end = start;
            while depth > 0 {
                match tokens.get(end)? {
                    Token::Punct("(") => depth += 1,
                    Token::Punct(")") => depth -= 1,
                    _ => {}
                }
                end += 1;
            }
            &tokens[start..end - 1]
        }
        _ => &tokens[0..0],
    };

    Some(RootSelection { kind, field, arguments })
}

/// Finds `message: "<literal>"` or `message: $var` among the arguments.
fn inline_message(arguments: &[Token<'_>], variables: Option<&Value>) -> Option<String> {
    let literal = arguments.windows(3).find_map(|window| match window {
        [Token::Name("message"), Token::Punct(":"), Token::Str(raw)] => {
            serde_json::from_str::<String>(raw).ok()
        }
        _ => None,
    });

    literal.or_else(|| {
        arguments.windows(4).find_map(|window| match window {
            [Token::Name("message"), Token::Punct(":"), Token::Punct("$"), Token::Name(var)] => {
                variables?.get(*var)?.as_str().map(str::to_string)
            }
            _ => None,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageRole;
    use serde_json::json;

    const CHAT_MUTATION: &str =
        "mutation Chat($input: ChatInput!) { chat(input: $input) { message success error } }";

    #[test]
    fn test_health_query() {
        assert_eq!(OperationRequest::parse("query { health }", None).unwrap(), OperationRequest::Health);
        assert_eq!(OperationRequest::parse("  { health }", None).unwrap(), OperationRequest::Health);
        assert_eq!(
            OperationRequest::parse("query Ping { status: health }", None).unwrap(),
            OperationRequest::Health
        );
    }

    #[test]
    fn test_chat_from_variables() {
        let variables = json!({
            "input": {
                "message": "how are you",
                "conversationHistory": [
                    {"role": "USER", "content": "hi"},
                    {"role": "ASSISTANT", "content": "hello"}
                ]
            }
        });

        let request = OperationRequest::parse(CHAT_MUTATION, Some(&variables)).unwrap();
        let OperationRequest::Chat(args) = request else {
            panic!("expected chat");
        };
        assert_eq!(args.message(), "how are you");
        assert_eq!(args.history().len(), 2);
        assert_eq!(args.history()[0].role, MessageRole::User);
        assert_eq!(args.history()[1].role, MessageRole::Assistant);
        assert_eq!(args.history()[1].content, "hello");
    }

    #[test]
    fn test_message_mentioning_health_stays_chat() {
        let variables = json!({"input": {"message": "query { health } mutation"}});
        let request = OperationRequest::parse(CHAT_MUTATION, Some(&variables)).unwrap();
        assert_eq!(request.field_name(), "chat");

        let inline = r#"mutation { chat(input: {message: "is my health query ok?"}) { message } }"#;
        let request = OperationRequest::parse(inline, None).unwrap();
        let OperationRequest::Chat(args) = request else {
            panic!("expected chat");
        };
        assert_eq!(args.message(), "is my health query ok?");
    }

    #[test]
    fn test_string_literal_does_not_select_operation() {
        // "health" only appears inside a literal; the root field is `chat`.
        let query = r#"query { chat(input: {message: "health"}) { message } }"#;
        assert!(OperationRequest::parse(query, None).is_err());

        let query = r#"mutation { echo(text: "chat") }"#;
        assert!(OperationRequest::parse(query, None).is_err());
    }

    #[test]
    fn test_inline_message_with_escapes() {
        let query = r#"mutation { chat(input: {message: "say \"hi\"\nplease"}) { message } }"#;
        let OperationRequest::Chat(args) = OperationRequest::parse(query, None).unwrap() else {
            panic!("expected chat");
        };
        assert_eq!(args.message(), "say \"hi\"\nplease");
    }

    #[test]
    fn test_inline_message_from_variable_reference() {
        let query = "mutation Send($text: String!) { chat(input: {message: $text}) { message } }";
        let variables = json!({"text": "hello"});
        let OperationRequest::Chat(args) = OperationRequest::parse(query, Some(&variables)).unwrap() else {
            panic!("expected chat");
        };
        assert_eq!(args.message(), "hello");
    }

    #[test]
    fn test_variables_binding_wins_over_inline_text() {
        let query = r#"mutation { chat(input: {message: "inline"}) { message } }"#;
        let variables = json!({"input": {"message": "bound"}});
        let OperationRequest::Chat(args) = OperationRequest::parse(query, Some(&variables)).unwrap() else {
            panic!("expected chat");
        };
        assert_eq!(args.message(), "bound");
    }

    #[test]
    fn test_blank_message_is_rejected() {
        let variables = json!({"input": {"message": "   \n\t"}});
        let err = OperationRequest::parse(CHAT_MUTATION, Some(&variables)).unwrap_err();
        assert_eq!(err.to_string(), "Message is required");

        let err = OperationRequest::parse(CHAT_MUTATION, None).unwrap_err();
        assert_eq!(err.to_string(), "Message is required");

        assert!(OperationRequest::chat("", Vec::new()).is_err());
    }

    #[test]
    fn test_inline_block_string_is_not_read() {
        let query = r#"mutation { chat(input: {message: """hello there"""}) { message } }"#;
        let err = OperationRequest::parse(query, None).unwrap_err();
        assert_eq!(err.to_string(), "Message is required");
    }

    #[test]
    fn test_invalid_history_role() {
        let variables = json!({
            "input": {"message": "hi", "conversationHistory": [{"role": "ROBOT", "content": "x"}]}
        });
        let err = OperationRequest::parse(CHAT_MUTATION, Some(&variables)).unwrap_err();
        assert!(err.to_string().starts_with("Invalid chat input"));
    }

    #[test]
    fn test_unsupported_queries() {
        for query in [
            "query { models }",
            "mutation { health }",
            "query { chat }",
            "subscription { chat }",
            "healthcheck",
            "",
            "# query { health }",
        ] {
            let err = OperationRequest::parse(query, None).unwrap_err();
            assert_eq!(err.to_string(), "Query not supported", "query: {:?}", query);
        }
    }
}
