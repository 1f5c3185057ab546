//! Instruction templates sent to the optimize and evaluate models.

const OPTIMIZE_TEMPLATE: &str = r#"You are building a prompt to address user requirement. Based on the given prompt, please reconstruct and optimize it. You can add, modify, or delete prompts. Please include a single modification in XML tags in your reply. During the optimization, you can incorporate any thinking models.
This is a prompt that performed excellently in a previous iteration. You must make further optimizations and improvements based on this prompt. The modified prompt must differ from the provided example.

requirements:
```
{requirements}
```

reference prompt:
```
{prompt}
```

The execution result of this reference prompt is(some cases):
{answers}

The best answer we expect(some cases):
{golden_answers}

Provide your analysis, optimization points, and the complete optimized prompt using the following XML format:

<analyse>Analyze what drawbacks exist in the results produced by the reference prompt and how to improve them.</analyse>
<modification>Summarize the key points for improvement in one sentence</modification>
<prompt>Provide the complete optimized prompt{count}</prompt>"#;

const EVALUATE_TEMPLATE: &str = r#"Based on the original requirements, evaluate the two responses, A and B, and determine which one better meets the requirements. If a reference answer is provided, strictly follow the format/content of the reference answer.

# Requirement
{requirement}

# A
{sample}

# B
{new_sample}

# Reference answers
{answers}

Provide your analysis and the choice you believe is better, using XML tags to encapsulate your response.

<analyse>Some analysis</analyse>
<choose>A/B (the better answer in your opinion)</choose>"#;

/// Build the generator request.
///
/// `answers` and `golden_answers` are already rendered as markdown;
/// `length_clause` is empty or `", within N words"`.
pub fn optimize_prompt(
    requirements: &str,
    prompt: &str,
    answers: &str,
    golden_answers: &str,
    length_clause: &str,
) -> String {
    OPTIMIZE_TEMPLATE
        .replace("{requirements}", requirements)
        .replace("{prompt}", prompt)
        .replace("{answers}", answers)
        .replace("{golden_answers}", golden_answers)
        .replace("{count}", length_clause)
}

/// Build one judged-trial request. `sample_a`, `sample_b` and `reference` are JSON.
pub fn evaluate_prompt(requirement: &str, sample_a: &str, sample_b: &str, reference: &str) -> String {
    EVALUATE_TEMPLATE
        .replace("{requirement}", requirement)
        .replace("{sample}", sample_a)
        .replace("{new_sample}", sample_b)
        .replace("{answers}", reference)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optimize_fills_every_slot() {
        let out = optimize_prompt("be brief", "Write a poem.", "ANS", "GOLD", ", within 50 words");
        assert!(out.contains("be brief"));
        assert!(out.contains("Write a poem."));
        assert!(out.contains("ANS"));
        assert!(out.contains("GOLD"));
        assert!(out.contains("<prompt>Provide the complete optimized prompt, within 50 words</prompt>"));
        assert!(!out.contains('{'));
    }

    #[test]
    fn optimize_without_length() {
        let out = optimize_prompt("r", "p", "a", "g", "");
        assert!(out.contains("<prompt>Provide the complete optimized prompt</prompt>"));
    }

    #[test]
    fn evaluate_places_samples_in_slots() {
        let out = evaluate_prompt("req", "[\"left\"]", "[\"right\"]", "[\"gold\"]");
        let a = out.find("# A\n[\"left\"]").unwrap();
        let b = out.find("# B\n[\"right\"]").unwrap();
        assert!(a < b);
        assert!(out.contains("# Reference answers\n[\"gold\"]"));
    }
}
