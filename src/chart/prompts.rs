use crate::ai::message::{ChatMessage, ContentPart};
use crate::chart::image::ImagePart;

pub const SYSTEM_PROMPT: &str = r#"You are a data visualization expert. Your task is to analyze charts critically ("roast" them), provide constructive feedback, and generate code for an improved version using Observable Plot (JavaScript).

Respond ONLY with a valid JSON object containing exactly these keys:
- "strengths": an array of short strings, what the chart does well
- "weaknesses": an array of short strings, what the chart does poorly
- "suggestions": an array of short strings, concrete improvements
- "roast": a single string, a short witty roast of the chart
- "plotCode": a single string of JavaScript using Observable Plot

Do not include any other text, explanations, or markdown formatting outside the JSON structure. Escape every newline and double quote inside "plotCode" so the object stays valid JSON. Assume the data is implicitly available or part of the chart context; focus on the plotting code itself."#;

pub const USER_INSTRUCTION: &str = "Analyze this chart. Provide feedback (strengths, weaknesses, suggestions), a roast, and generate JavaScript code for an improved version using Observable Plot. Respond strictly in the JSON format specified in the system prompt.";

/// The fixed two-message conversation for one chart analysis.
pub fn build_analysis_messages(image: ImagePart) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(vec![
            ContentPart::Image(image),
            ContentPart::Text(USER_INSTRUCTION.to_string()),
        ]),
    ]
}
