//! Conversion of stored messages into model input.

use crate::message::{Message, MessageRole, Part, ToolCallState};
use alma_llm::{Message as ModelMessage, ToolCall};

/// Convert a thread's stored history into model messages.
///
/// Assistant tool calls are emitted as an AI message carrying the calls,
/// followed by one tool message per call. A call that never reached a
/// terminal state is reported back as failed so the model does not wait
/// on it.
pub fn to_model_messages(history: &[Message], system_prompt: Option<&str>) -> Vec<ModelMessage> {
    let mut out = Vec::with_capacity(history.len() + 1);

    if let Some(prompt) = system_prompt {
        out.push(ModelMessage::system(prompt));
    }

    for message in history {
        match message.role {
            MessageRole::User => out.push(ModelMessage::human(message.text())),
            MessageRole::System => out.push(ModelMessage::system(message.text())),
            MessageRole::Assistant => push_assistant(&mut out, &message.parts),
        }
    }

    out
}

fn push_assistant(out: &mut Vec<ModelMessage>, parts: &[Part]) {
    let mut text = String::new();
    let mut calls: Vec<ToolCall> = Vec::new();
    let mut results: Vec<ModelMessage> = Vec::new();

    for part in parts {
        match part {
            Part::Text { content } => {
                if !calls.is_empty() {
                    flush(out, &mut text, &mut calls, &mut results);
                }
                text.push_str(content);
            }
            Part::ToolCall {
                call_id,
                tool_name,
                args,
                state,
                result,
                error_text,
            } => {
                calls.push(ToolCall::new(call_id.clone(), tool_name.clone(), args.clone()));
                results.push(ModelMessage::tool_result(
                    call_id.clone(),
                    tool_result_content(*state, result.as_ref(), error_text.as_deref()),
                ));
            }
        }
    }

    if !calls.is_empty() {
        flush(out, &mut text, &mut calls, &mut results);
    } else if !text.is_empty() {
        out.push(ModelMessage::ai(text));
    }
}

fn flush(
    out: &mut Vec<ModelMessage>,
    text: &mut String,
    calls: &mut Vec<ToolCall>,
    results: &mut Vec<ModelMessage>,
) {
    let content = std::mem::take(text);
    out.push(ModelMessage::ai_with_tools(Some(content), std::mem::take(calls)));
    out.append(results);
}

fn tool_result_content(
    state: ToolCallState,
    result: Option<&serde_json::Value>,
    error_text: Option<&str>,
) -> String {
    if let Some(value) = result {
        return value.to_string();
    }
    match (state, error_text) {
        (_, Some(err)) => format!("Error: {}", err),
        (ToolCallState::Denied, None) => "Error: permission denied".to_string(),
        _ => "Error: tool call did not complete".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn done_call(id: &str, result: serde_json::Value) -> Part {
        Part::ToolCall {
            call_id: id.to_string(),
            tool_name: "read_file".to_string(),
            args: json!({"file_path": "a.txt"}),
            state: ToolCallState::Done,
            result: Some(result),
            error_text: None,
        }
    }

    #[test]
    fn test_plain_conversation() {
        let history = vec![
            Message::user("t1", "hi"),
            Message::assistant("t1", vec![Part::text("hel"), Part::text("lo")]),
        ];
        let out = to_model_messages(&history, Some("be brief"));

        assert_eq!(out.len(), 3);
        assert_eq!(out[0], ModelMessage::system("be brief"));
        assert_eq!(out[1], ModelMessage::human("hi"));
        assert_eq!(out[2], ModelMessage::ai("hello"));
    }

    #[test]
    fn test_tool_calls_paired_with_results() {
        let history = vec![Message::assistant(
            "t1",
            vec![
                Part::text("checking"),
                done_call("c1", json!({"success": true})),
                Part::text("done"),
            ],
        )];
        let out = to_model_messages(&history, None);

        assert_eq!(out.len(), 3);
        match &out[0] {
            ModelMessage::AI { content, tool_calls } => {
                assert_eq!(content.as_deref(), Some("checking"));
                assert_eq!(tool_calls.as_ref().map(|c| c.len()), Some(1));
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(out[1], ModelMessage::tool_result("c1", r#"{"success":true}"#));
        assert_eq!(out[2], ModelMessage::ai("done"));
    }

    #[test]
    fn test_incomplete_call_reported_as_failed() {
        let history = vec![Message::assistant(
            "t1",
            vec![Part::tool_call("c9", "bash", json!({"command": "ls"}))],
        )];
        let out = to_model_messages(&history, None);

        assert_eq!(out.len(), 2);
        assert_eq!(
            out[1],
            ModelMessage::tool_result("c9", "Error: tool call did not complete")
        );
    }
}
