use crate::model::story_segment::StorySegment;

/// Opening line of every conclusion request.
pub const CONCLUSION_HEADER: &str =
    "You are a creative storyteller crafting the conclusion to an engaging interactive story.";

/// Builds the instruction text sent to the model.
/// Only formats text: no parsing, no networking, no engine logic.
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn build(prompt: &str, history: &[StorySegment], conclude: bool) -> String {
        let mut instruction = String::new();

        push_history_section(&mut instruction, history);

        if conclude {
            push_conclusion_request(&mut instruction, prompt);
        } else {
            push_continuation_request(&mut instruction, prompt);
        }

        instruction
    }
}

fn push_history_section(instruction: &mut String, history: &[StorySegment]) {
    if history.is_empty() {
        return;
    }

    let blocks: Vec<String> = history
        .iter()
        .map(|segment| format!("Prompt: {}\nStory: {}", segment.prompt, segment.text))
        .collect();

    instruction.push_str("STORY SO FAR:\n");
    instruction.push_str(&blocks.join("\n\n"));
    instruction.push_str("\n\n");
}

fn push_continuation_request(instruction: &mut String, prompt: &str) {
    instruction.push_str(
        "You are a creative storyteller crafting an engaging interactive story.\n\n",
    );
    instruction.push_str(&format!("Based on this prompt: \"{}\",\n\n", prompt));
    instruction.push_str(
        "Generate a vivid, descriptive story snippet (2-3 paragraphs) that ends at a point \
where the reader would need to make a choice.\n\
The story should be simple to read and understand, and suitable for readers aged 16 and up.\n\n\
Also provide exactly 3 distinct and interesting possible continuations for the story.\n\
Make sure the choices are varied and lead to different potential outcomes.\n\n\
Respond in JSON format with the following structure:\n\
{\n  \"story\": \"The story text here...\",\n  \"choices\": [\"First choice\", \"Second choice\", \"Third choice\"]\n}\n\n\
Do not add explanations, markdown, or extra fields.\n",
    );
}

fn push_conclusion_request(instruction: &mut String, prompt: &str) {
    instruction.push_str(CONCLUSION_HEADER);
    instruction.push_str("\n\n");
    instruction.push_str(&format!(
        "Based on this prompt: \"{}\" and the story so far,\n\n",
        prompt
    ));
    instruction.push_str(
        "Generate a satisfying, meaningful conclusion to the story (2-3 paragraphs).\n\
Wrap up the main themes, resolve conflicts, and provide a sense of closure.\n\
Make the ending emotionally resonant and memorable.\n\n\
Respond in JSON format with the following structure:\n\
{\n  \"story\": \"The conclusion text here...\"\n}\n\n\
Do not include any choices, as this is the end of the story.\n",
    );
}
