//! Fixed instructions sent to the vision model by each analysis stage.
//!
//! Every system instruction asks for a single JSON object with string
//! values. Replies that ignore this are still kept, as raw text.

/// Stage 1 system instruction.
pub const DIFFERENCE_SYSTEM: &str = concat!(
    "You are a helpful visual assistant. ",
    "When given two images, analyze and describe their differences according to categories ",
    "like object, style, color, motion, 2D & 3D spatial, texture, and shape. ",
    "If a category has no obvious difference, omit it. ",
    "Answer without preamble or additional explanation. ",
    "Output your answer as a single valid JSON object: each key is a stringified number ",
    "('1','2','3',...) and each value is a string describing one difference. ",
    "Do not include Markdown formatting, code blocks, or any text outside the JSON. ",
    "Ensure the JSON is valid and parsable."
);

/// Stage 1 user text. Images follow in the order source, target.
pub const DIFFERENCE_PROMPT: &str = concat!(
    "I have two similar images: the first is the source image, the second is the target image. ",
    "Please describe the differences between them in the required format, ",
    "one paragraph per category, numbered sequentially. ",
    "Each paragraph should be a single sentence starting with ",
    "\"<sequence number>: There is a difference at <category>, ...\"."
);

/// Stage 2 system instruction.
pub const INSTRUCTION_SYSTEM: &str = concat!(
    "You are a helpful visual assistant and image editor. ",
    "When provided with a source image and an ideal difference description, ",
    "organize and output the specific editing actions needed to reach the target image. ",
    "Each action should be concise, start with an editing verb, ",
    "and omit any preamble or extra explanation. ",
    "Output must be valid JSON where each key is a stringified number ('1','2','3',...) ",
    "and each value is a string describing one editing action. ",
    "Answer without preamble or additional explanation."
);

/// Stage 4 system instruction. Images follow in the order source, step image.
pub const CRITIQUE_SYSTEM: &str = concat!(
    "You are a helpful assistant for visual thinking, design, and editing. ",
    "When given a source image (the first image), a desired editing instruction in JSON, ",
    "and the first-step edited image (the second image), perform two tasks: ",
    "1) Provide a step-by-step chain of thought assessing ",
    "(a) instruction compliance and subject integrity, ",
    "(b) visual realism (geometry, lighting consistency, physical logic), ",
    "(c) contextual consistency (scene-element matching, cross-attribute logic), ",
    "(d) ethics and safety. ",
    "Only note unusual issues if not explicitly instructed, concisely and without preamble. ",
    "2) Generate re-editing instructions to refine the first-step result, ",
    "concisely and without preamble. ",
    "Answer without preamble or additional explanation. ",
    "Output a JSON object whose keys are 'CoT_1', 'CoT_2', ... and 'Re_Edit_1', 'Re_Edit_2', ... ",
    "and whose values are the corresponding chain-of-thought or re-editing text."
);

/// Stage 2 user text for a serialized difference description.
pub fn instruction_prompt(difference: &str) -> String {
    format!(
        "<difference_description>{}</difference_description>\
         Please list the editing actions one by one in JSON format, numbered sequentially.",
        difference
    )
}

/// Stage 4 user text for a serialized edit plan.
pub fn critique_prompt(edit: &str) -> String {
    format!(
        "<desired_editing_instruction>{}</desired_editing_instruction>\
         Please output a step-by-step chain of thought and re-editing instructions as required.",
        edit
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_prompt_wraps_difference() {
        let p = instruction_prompt("{\"1\":\"sky\"}");
        assert!(p.starts_with("<difference_description>{\"1\":\"sky\"}</difference_description>"));
        assert!(p.ends_with("numbered sequentially."));
    }

    #[test]
    fn test_critique_prompt_wraps_edit() {
        let p = critique_prompt("oops");
        assert!(p.starts_with("<desired_editing_instruction>oops</desired_editing_instruction>"));
    }

    #[test]
    fn test_system_instructions_request_json() {
        for system in [DIFFERENCE_SYSTEM, INSTRUCTION_SYSTEM, CRITIQUE_SYSTEM] {
            assert!(system.contains("JSON"));
        }
    }
}
