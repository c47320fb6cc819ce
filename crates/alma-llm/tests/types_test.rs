use alma_llm::{Message, StreamEvent, Tool, ToolCall};
use serde_json::json;

#[test]
fn test_message_serialization_roles() {
    let human = serde_json::to_value(Message::human("Hello")).unwrap();
    assert_eq!(human["role"], "user");
    assert_eq!(human["content"], "Hello");

    let ai = serde_json::to_value(Message::ai("Hi")).unwrap();
    assert_eq!(ai["role"], "assistant");
    assert!(ai.get("tool_calls").is_none());
}

#[test]
fn test_ai_with_tools_drops_empty_text() {
    let call = ToolCall::new("call_1", "read_file", json!({"file_path": "a.txt"}));
    let msg = Message::ai_with_tools(Some(String::new()), vec![call.clone()]);

    match msg {
        Message::AI { content, tool_calls } => {
            assert!(content.is_none());
            assert_eq!(tool_calls, Some(vec![call]));
        }
        other => panic!("unexpected message: {:?}", other),
    }
}

#[test]
fn test_tool_result_role() {
    let msg = Message::tool_result("call_1", "ok");
    assert_eq!(msg.role(), "tool");
}

#[test]
fn test_tool_definition_shape() {
    let tool = Tool::new("bash", "Run a command", json!({"type": "object"}));
    let value = serde_json::to_value(&tool).unwrap();

    assert_eq!(value["type"], "function");
    assert_eq!(value["function"]["name"], "bash");
    assert_eq!(tool.name(), "bash");
}

#[test]
fn test_tool_call_parse_arguments() {
    #[derive(serde::Deserialize)]
    struct Args {
        command: String,
    }

    let call = ToolCall::new("c", "bash", json!({"command": "ls"}));
    let args: Args = call.parse_arguments().unwrap();
    assert_eq!(args.command, "ls");
}

#[test]
fn test_stream_event_tagging() {
    let event = StreamEvent::tool_call("c1", "glob", json!({"pattern": "*.rs"}));
    let value = serde_json::to_value(&event).unwrap();

    assert_eq!(value["type"], "tool_call");
    assert_eq!(value["name"], "glob");

    let parsed: StreamEvent = serde_json::from_value(json!({"type": "text", "content": "x"})).unwrap();
    assert_eq!(parsed, StreamEvent::text("x"));
}
