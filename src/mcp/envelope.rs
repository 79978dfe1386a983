use crate::services::tool_executor::ToolOutput;
use serde_json::{json, Value};

/// The `tools/call` result: the resource as pretty-printed JSON text, plus
/// an image block when a screenshot was attached.
pub fn build_tool_result(output: &ToolOutput) -> Value {
    let text = serde_json::to_string_pretty(output.resource()).unwrap_or_else(|_| "null".to_string());
    let mut content = vec![json!({ "type": "text", "text": text })];
    if let Some(image) = output.image() {
        content.push(json!({
            "type": "image",
            "data": image.data_base64,
            "mimeType": image.mime_type,
        }));
    }
    json!({ "content": content })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::screenshot::InlineImage;

    #[test]
    fn plain_results_carry_a_single_text_block() {
        let result = build_tool_result(&ToolOutput::Json(json!({"data": []})));
        let content = result["content"].as_array().unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[0]["text"], "{\n  \"data\": []\n}");
    }

    #[test]
    fn attached_screenshot_adds_an_image_block() {
        let output = ToolOutput::WithImage {
            resource: json!({"data": {"id": "fb-1"}}),
            image: InlineImage {
                data_base64: "iVBORw0KGgo=".to_string(),
                mime_type: "image/png".to_string(),
                bytes: 8,
            },
        };
        let result = build_tool_result(&output);
        assert_eq!(result["content"][1]["type"], "image");
        assert_eq!(result["content"][1]["data"], "iVBORw0KGgo=");
        assert_eq!(result["content"][1]["mimeType"], "image/png");
    }
}
